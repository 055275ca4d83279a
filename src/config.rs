//! Options from an optional JSON file, merged with the command line.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;
use crate::model::{BuildOptions, BuildType, CompileOptions, ImportPathCallback};

/// On-disk form of the compile options.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
    pub build_type: Option<BuildType>,
    pub build_options: BuildOptions,
    pub environment_variables: HashMap<String, String>,
    pub excluded_namespaces: Vec<String>,
    pub import_root: Option<String>,
}

pub fn load(path: &Path) -> Result<ConfigFile> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Reading {}", path.display()))?;
    load_from_json(&json).with_context(|| format!("Parsing {}", path.display()))
}

pub fn load_from_json(json: &str) -> Result<ConfigFile> {
    Ok(serde_json::from_str(json)?)
}

/// Final options: file values first, then every flag the user gave.
/// `entry_dir` is the resolved directory of the entry script.
pub fn compile_options(cli: &Cli, file: ConfigFile, entry_dir: &str) -> CompileOptions {
    let mut build_options = file.build_options;
    build_options.is_dev_mode |= cli.dev_mode;
    build_options.keep_parentheses |= cli.keep_parentheses;
    build_options.disable_literals_optimization |= cli.disable_literals_optimization;
    build_options.disable_namespaces_optimization |= cli.disable_namespaces_optimization;
    build_options.obfuscation |= cli.obfuscation;
    if let Some(indentation) = cli.indentation {
        build_options.indentation = indentation;
    }
    if let Some(spaces) = cli.indentation_spaces {
        build_options.indentation_spaces = spaces;
    }

    let mut environment_variables = file.environment_variables;
    environment_variables.extend(cli.env.iter().cloned());

    let mut excluded_namespaces = file.excluded_namespaces;
    excluded_namespaces.extend(cli.exclude.iter().cloned());

    let import_root = cli.import_root.clone().or(file.import_root);

    CompileOptions {
        build_type: cli.build_type.or(file.build_type).unwrap_or_default(),
        build_options,
        environment_variables,
        excluded_namespaces,
        process_import_path: import_root.map(|root| import_path_rewriter(entry_dir, root)),
    }
}

/// Rebase absolute script paths from `entry_dir` onto `root`.
pub fn import_path_rewriter(entry_dir: &str, root: String) -> ImportPathCallback {
    let entry_dir = entry_dir.trim_end_matches('/').to_string();
    let root = root.trim_end_matches('/').to_string();
    Box::new(move |path| match path.strip_prefix(&entry_dir) {
        Some(relative) if relative.starts_with('/') => format!("{root}{relative}"),
        _ => path.to_string(),
    })
}
