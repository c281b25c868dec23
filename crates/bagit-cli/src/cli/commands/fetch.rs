use super::super::args::FetchArgs;
use crate::exit_codes;
use anyhow::Context;
use bagit_core::{Bag, BagOptions, HttpDownloader};

pub fn run(args: FetchArgs, options: BagOptions) -> anyhow::Result<i32> {
    let mut bag = Bag::load_with(&args.path, options)
        .with_context(|| format!("failed to load bag: {}", args.path.display()))?;
    let downloader = HttpDownloader::with_timeout(args.timeout)?;
    let fetched = bag.fetch(&downloader)?;
    if args.update {
        bag.update()?;
    }
    eprintln!(
        "bag fetch: {} of {} entries downloaded",
        fetched,
        bag.fetch_entries().len()
    );
    Ok(exit_codes::EXIT_SUCCESS)
}
