use super::args::*;
use anyhow::Context;
use bagit_core::{BagOptions, Report};
use std::path::Path;

pub mod bag_info;
pub mod create;
#[cfg(feature = "http-fetch")]
pub mod fetch;
pub mod info;
pub mod package;
pub mod validate;

use crate::exit_codes::EXIT_SUCCESS;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let options = load_options(cli.config.as_deref())?;
    match cli.cmd {
        Command::Create(args) => create::run(args, options),
        Command::Validate(args) => validate::run(args, options),
        Command::Update(args) => validate::cmd_update(args, options),
        Command::Info(args) => info::run(args, options),
        Command::AddTag(args) => bag_info::cmd_add_tag(args, options),
        Command::Algorithm(args) => match args.cmd {
            AlgorithmSub::Add(change) => bag_info::cmd_algorithm_add(change, options),
            AlgorithmSub::Remove(change) => bag_info::cmd_algorithm_remove(change, options),
        },
        Command::Package(args) => package::cmd_package(args, options),
        Command::Extract(args) => package::cmd_extract(args),
        #[cfg(feature = "http-fetch")]
        Command::Fetch(args) => fetch::run(args, options),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(EXIT_SUCCESS)
        }
    }
}

pub(crate) fn load_options(config: Option<&Path>) -> anyhow::Result<BagOptions> {
    match config {
        Some(path) => BagOptions::from_json_file(path)
            .with_context(|| format!("failed to load options from {}", path.display())),
        None => Ok(BagOptions::default()),
    }
}

/// Print findings to stderr, warnings first.
pub(crate) fn print_report(report: &Report) {
    for w in report.warnings() {
        eprintln!("warning: {}", w);
    }
    for e in report.errors() {
        eprintln!("error: {}", e);
    }
}
