pub mod build_map;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod processor;
pub mod writer;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use processor::resource::{FsResourceHandler, ResourceHandler};

pub use error::{BuildError, ErrorKind};
pub use model::{BuildOptions, BuildType, CompileOptions, CompileOutput};
pub use processor::{compile, transpile_source};

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    // 1. ── Configure ──────────────────────────────────────────────────
    let file = match &args.config {
        Some(path) => config::load(path)?,
        None => config::ConfigFile::default(),
    };
    let handler = FsResourceHandler;
    let entry = handler.resolve(&args.input.to_string_lossy());
    let entry_dir = Path::new(&entry)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let options = config::compile_options(&args, file, &entry_dir.to_string_lossy());

    // 2. ── Compile ────────────────────────────────────────────────────
    let outputs = processor::compile(&entry, &handler, &options)
        .with_context(|| format!("Compiling {}", args.input.display()))?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;
    writer::scripts::emit(&outputs, &entry_dir, &args.output)
        .with_context(|| format!("Writing scripts to {}", args.output.display()))?;

    Ok(())
}
