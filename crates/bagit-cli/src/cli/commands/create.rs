use super::super::args::CreateArgs;
use crate::exit_codes;
use anyhow::Context;
use bagit_core::{Algorithm, Bag, BagOptions, Version};

pub fn run(args: CreateArgs, mut options: BagOptions) -> anyhow::Result<i32> {
    if !args.algorithms.is_empty() {
        let mut algorithms = Vec::new();
        for name in &args.algorithms {
            let alg = Algorithm::parse(name)?;
            if !algorithms.contains(&alg) {
                algorithms.push(alg);
            }
        }
        options.algorithms = algorithms;
    }
    if let Some(v) = &args.bagit_version {
        options.version = Version::parse_supported(v)?;
    }
    if args.minimal {
        options.extended = false;
    }

    let mut tags = Vec::with_capacity(args.tags.len());
    for raw in &args.tags {
        let (name, value) = raw
            .split_once('=')
            .with_context(|| format!("tag '{}' must be NAME=VALUE", raw))?;
        tags.push((name.trim().to_string(), value.trim().to_string()));
    }

    let mut bag = Bag::create_with(&args.path, options)
        .with_context(|| format!("failed to create bag at {}", args.path.display()))?;
    for file in &args.files {
        let name = file
            .file_name()
            .with_context(|| format!("{} has no file name", file.display()))?
            .to_string_lossy()
            .into_owned();
        bag.add_file(file, &name)
            .with_context(|| format!("failed to add {}", file.display()))?;
    }
    for (name, value) in &tags {
        bag.add_bag_info_tag(name, value)?;
    }
    if bag.is_dirty() {
        bag.update()?;
    }

    eprintln!(
        "created bag: {} ({} payload files, {})",
        args.path.display(),
        args.files.len(),
        bag.algorithms()
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(exit_codes::EXIT_SUCCESS)
}
