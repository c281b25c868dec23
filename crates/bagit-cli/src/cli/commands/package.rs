use super::super::args::{ExtractArgs, PackageArgs};
use crate::exit_codes;
use anyhow::Context;
use bagit_core::{archive, get_directory, Bag, BagOptions, StdFilesystem};

pub fn cmd_package(args: PackageArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = Bag::load_with(&args.path, options)
        .with_context(|| format!("failed to load bag: {}", args.path.display()))?;
    bag.package(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    eprintln!("bag package: {}", args.output.display());
    Ok(exit_codes::EXIT_SUCCESS)
}

pub fn cmd_extract(args: ExtractArgs) -> anyhow::Result<i32> {
    std::fs::create_dir_all(&args.dest)
        .with_context(|| format!("failed to create {}", args.dest.display()))?;
    archive::extract_tar_gz(&StdFilesystem, &args.archive, &args.dest)
        .with_context(|| format!("failed to extract {}", args.archive.display()))?;
    let root = get_directory(&StdFilesystem, &args.dest)?;
    println!("{}", root.display());
    Ok(exit_codes::EXIT_SUCCESS)
}
