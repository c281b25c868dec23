use super::super::args::BagPathArgs;
use super::print_report;
use crate::exit_codes;
use anyhow::Context;
use bagit_core::{Bag, BagOptions};

pub fn run(args: BagPathArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = Bag::load_with(&args.path, options)
        .with_context(|| format!("failed to load bag: {}", args.path.display()))?;
    let valid = bag.validate()?;
    print_report(bag.report());
    if !valid {
        eprintln!(
            "bag validate: INVALID ({} errors, {} warnings)",
            bag.errors().len(),
            bag.warnings().len()
        );
        return Ok(exit_codes::EXIT_INVALID);
    }
    eprintln!("bag validate: OK ({})", args.path.display());
    Ok(exit_codes::EXIT_SUCCESS)
}

pub fn cmd_update(args: BagPathArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = Bag::load_with(&args.path, options)
        .with_context(|| format!("failed to load bag: {}", args.path.display()))?;
    print_report(bag.report());
    bag.update()
        .with_context(|| format!("failed to update bag: {}", args.path.display()))?;
    eprintln!("bag update: OK ({})", args.path.display());
    Ok(exit_codes::EXIT_SUCCESS)
}
