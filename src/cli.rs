use clap::Parser;
use std::path::PathBuf;

use crate::model::{BuildType, IndentationType};

#[derive(Parser, Debug)]
#[command(author, version, about = "Bundle and transpile GreyScript sources")]
pub struct Cli {
    /// Entry script
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,

    #[arg(short, long, value_enum)]
    pub build_type: Option<BuildType>,
    /// JSON file with the same options; flags given here win
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Environment variable for `#envar` and `#ifdef`, as KEY=VALUE
    #[arg(short, long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
    /// Identifier that must never be renamed
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Echo directives and emit every file on its own
    #[arg(long)]
    pub dev_mode: bool,
    #[arg(long)]
    pub keep_parentheses: bool,
    #[arg(long, value_enum)]
    pub indentation: Option<IndentationType>,
    #[arg(long)]
    pub indentation_spaces: Option<usize>,
    #[arg(long)]
    pub disable_literals_optimization: bool,
    #[arg(long)]
    pub disable_namespaces_optimization: bool,
    /// Generate names from a non-ASCII charset
    #[arg(long)]
    pub obfuscation: bool,
    /// Prefix for every emitted `import_code` path, relative to the entry directory
    #[arg(long)]
    pub import_root: Option<String>,

    /// More log output; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
