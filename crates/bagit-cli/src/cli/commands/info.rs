use super::super::args::InfoArgs;
use super::print_report;
use crate::exit_codes;
use anyhow::Context;
use bagit_core::{Bag, BagOptions};
use serde_json::{json, Value};

pub fn run(args: InfoArgs, options: BagOptions) -> anyhow::Result<i32> {
    let bag = Bag::load_with(&args.path, options)
        .with_context(|| format!("failed to load bag: {}", args.path.display()))?;
    let oxum = bag.payload_oxum()?;

    if args.json {
        let tags: Vec<Value> = bag
            .bag_info_tags()
            .iter()
            .map(|t| json!({ "name": t.name, "values": t.values }))
            .collect();
        let summary = json!({
            "root": bag.bag_root().display().to_string(),
            "version": bag.version().to_string(),
            "extended": bag.is_extended(),
            "algorithms": bag.algorithms().iter().map(|a| a.name()).collect::<Vec<_>>(),
            "payload_oxum": oxum.to_string(),
            "fetch_entries": bag.fetch_entries().len(),
            "tags": tags,
            "errors": bag.errors().iter().map(|f| f.to_string()).collect::<Vec<_>>(),
            "warnings": bag.warnings().iter().map(|f| f.to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(exit_codes::EXIT_SUCCESS);
    }

    println!("Bag:          {}", bag.bag_root().display());
    println!("Version:      {}", bag.version());
    println!(
        "Algorithms:   {}",
        bag.algorithms()
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Payload-Oxum: {}", oxum);
    println!("Fetch:        {} entries", bag.fetch_entries().len());
    for tag in bag.bag_info_tags() {
        for value in &tag.values {
            println!("  {}: {}", tag.name, value);
        }
    }
    print_report(bag.report());
    Ok(exit_codes::EXIT_SUCCESS)
}
