use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bagit",
    version,
    about = "Create, update, validate and package BagIt bags"
)]
pub struct Cli {
    /// JSON file with option overrides (algorithms, version, extended, warn_on_weak_algorithms)
    #[arg(long, global = true, env = "BAGIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new bag, optionally adding payload files
    Create(CreateArgs),
    /// Validate a bag directory or .tar.gz archive
    Validate(BagPathArgs),
    /// Rewrite manifests and tag files from the payload on disk
    Update(BagPathArgs),
    /// Show a bag's version, algorithms, tags and load findings
    Info(InfoArgs),
    /// Append a bag-info tag value
    AddTag(AddTagArgs),
    /// Add or remove payload algorithms
    Algorithm(AlgorithmArgs),
    /// Write a bag as a deterministic .tar.gz
    Package(PackageArgs),
    /// Unpack a bag archive and print the bag directory
    Extract(ExtractArgs),
    /// Download fetch.txt entries that are not on disk yet
    #[cfg(feature = "http-fetch")]
    Fetch(FetchArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct BagPathArgs {
    /// Bag directory (or archive, for validate)
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Directory for the new bag (must not exist or be empty)
    pub path: PathBuf,

    /// Payload files to copy into data/
    #[arg(long = "add")]
    pub files: Vec<PathBuf>,

    /// Payload algorithm; repeat for several (default: sha512)
    #[arg(long = "algorithm")]
    pub algorithms: Vec<String>,

    /// BagIt version to write
    #[arg(long)]
    pub bagit_version: Option<String>,

    /// Do not write bag-info.txt or tag manifests
    #[arg(long)]
    pub minimal: bool,

    /// bag-info tag as NAME=VALUE; repeatable
    #[arg(long = "tag", value_name = "NAME=VALUE")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    pub path: PathBuf,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddTagArgs {
    pub path: PathBuf,
    pub name: String,
    pub value: String,
}

#[derive(Parser, Debug)]
pub struct AlgorithmArgs {
    #[command(subcommand)]
    pub cmd: AlgorithmSub,
}

#[derive(Subcommand, Debug)]
pub enum AlgorithmSub {
    /// Register an algorithm and write its manifests
    Add(AlgorithmChangeArgs),
    /// Drop an algorithm and its manifests
    Remove(AlgorithmChangeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AlgorithmChangeArgs {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct PackageArgs {
    pub path: PathBuf,

    /// Output archive (.tar.gz or .tgz)
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Bag archive (.tar.gz or .tgz)
    pub archive: PathBuf,

    /// Directory to unpack into
    #[arg(long)]
    pub dest: PathBuf,
}

#[cfg(feature = "http-fetch")]
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    pub path: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Run update after downloading
    #[arg(long)]
    pub update: bool,
}
