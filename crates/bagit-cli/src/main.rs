use clap::Parser;

mod cli;
pub mod exit_codes;

use cli::args::Cli;
use cli::commands::dispatch;

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    let cli = Cli::parse();
    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal: {e:?}");
            match e.downcast_ref::<bagit_core::BagError>() {
                Some(err) if err.is_not_found() => exit_codes::EXIT_NOT_FOUND,
                Some(err) if err.exit_code() == exit_codes::EXIT_STRUCTURE => {
                    exit_codes::EXIT_STRUCTURE
                }
                _ => exit_codes::EXIT_CONFIG_ERROR,
            }
        }
    };
    std::process::exit(code);
}
