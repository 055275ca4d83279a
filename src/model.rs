use std::collections::HashMap;

use clap::ValueEnum;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which renderer produces the output text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Faithful, whitespace-minimal output.
    #[default]
    Default,
    /// Renamed identifiers, shared literals, no comments.
    Uglify,
    /// Indented output with comments kept.
    Beautify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndentationType {
    #[default]
    Tab,
    Whitespace,
}

/// Formatting and optimization switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Echo directives instead of resolving them.
    pub is_dev_mode: bool,
    pub keep_parentheses: bool,
    pub indentation: IndentationType,
    pub indentation_spaces: usize,
    pub disable_literals_optimization: bool,
    pub disable_namespaces_optimization: bool,
    /// Use a non-ASCII charset for generated names.
    pub obfuscation: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            is_dev_mode: false,
            keep_parentheses: false,
            indentation: IndentationType::Tab,
            indentation_spaces: 2,
            disable_literals_optimization: false,
            disable_namespaces_optimization: false,
            obfuscation: false,
        }
    }
}

/// Rewrites every path emitted in an `import_code` call.
pub type ImportPathCallback = Box<dyn Fn(&str) -> String>;

#[derive(Default)]
pub struct CompileOptions {
    pub build_type: BuildType,
    pub build_options: BuildOptions,
    /// Values for `#envar` and names defined for `#ifdef`.
    pub environment_variables: HashMap<String, String>,
    /// Identifiers that must keep their name.
    pub excluded_namespaces: Vec<String>,
    pub process_import_path: Option<ImportPathCallback>,
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("build_type", &self.build_type)
            .field("build_options", &self.build_options)
            .field("environment_variables", &self.environment_variables)
            .field("excluded_namespaces", &self.excluded_namespaces)
            .field("process_import_path", &self.process_import_path.is_some())
            .finish()
    }
}

/// Output path → output text, main bundle first.
pub type CompileOutput = IndexMap<String, String>;
