use super::super::args::{AddTagArgs, AlgorithmChangeArgs};
use crate::exit_codes;
use anyhow::Context;
use bagit_core::{Bag, BagOptions};

fn load(path: &std::path::Path, options: BagOptions) -> anyhow::Result<Bag> {
    Bag::load_with(path, options).with_context(|| format!("failed to load bag: {}", path.display()))
}

pub fn cmd_add_tag(args: AddTagArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = load(&args.path, options)?;
    bag.add_bag_info_tag(&args.name, &args.value)?;
    bag.update()?;
    eprintln!("added tag {}: {}", args.name, args.value);
    Ok(exit_codes::EXIT_SUCCESS)
}

pub fn cmd_algorithm_add(args: AlgorithmChangeArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = load(&args.path, options)?;
    bag.add_algorithm(&args.name)?;
    bag.update()?;
    eprintln!("algorithms: {:?}", bag.algorithms());
    Ok(exit_codes::EXIT_SUCCESS)
}

pub fn cmd_algorithm_remove(args: AlgorithmChangeArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = load(&args.path, options)?;
    bag.remove_algorithm(&args.name)?;
    bag.update()?;
    eprintln!("algorithms: {:?}", bag.algorithms());
    Ok(exit_codes::EXIT_SUCCESS)
}
