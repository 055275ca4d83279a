//! Renderers that turn a parsed chunk back into MiniScript text.
//!
//! A [`BuildMap`] renders one node and recurses through the
//! [`Transformer`], which owns the run state (current dependency,
//! indentation depth, visited native imports, comment pools). Because the
//! recursion always goes back through the transformer, a strategy can
//! handle the node kinds it cares about and hand everything else to
//! [`DefaultMap`].

mod beautify;
mod default;
mod transformer;
mod uglify;

pub use beautify::BeautifyMap;
pub use default::DefaultMap;
pub use transformer::Transformer;
pub use uglify::UglifyMap;

use crate::error::BuildError;
use crate::model::{BuildOptions, BuildType};
use crate::processor::ast::{BinaryOp, Expr, Stmt};

/// Per-call flags passed down while rendering expressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderData {
    /// Rendering a parameter default; shared literal names are not
    /// allowed here, the value has to stay a literal.
    pub is_argument: bool,
}

impl RenderData {
    pub fn argument() -> Self {
        Self { is_argument: true }
    }
}

pub trait BuildMap {
    fn expr(&self, t: &Transformer<'_>, expr: &Expr, data: RenderData) -> Result<String, BuildError>;

    /// Render a statement. The first line carries no indentation, every
    /// following line carries its full indentation.
    fn stmt(&self, t: &Transformer<'_>, stmt: &Stmt) -> Result<String, BuildError>;

    fn indent(&self, _depth: usize) -> String {
        String::new()
    }

    /// Whether source parentheses are dropped where precedence allows.
    fn strips_parens(&self) -> bool {
        false
    }

    fn separator(&self) -> &'static str {
        ","
    }

    fn assignment(&self, variable: &str, init: &str) -> String {
        format!("{variable}={init}")
    }

    fn key_value(&self, key: &str, value: &str) -> String {
        format!("{key}:{value}")
    }

    fn binary_operator(&self, op: BinaryOp, left: &str, right: &str) -> String {
        if op.is_keyword() {
            format!("{left} {} {right}", op.symbol())
        } else if right.starts_with('-') {
            format!("{left}{} {right}", op.symbol())
        } else {
            format!("{left}{}{right}", op.symbol())
        }
    }
}

/// The renderer for `build_type`.
pub fn for_type(build_type: BuildType, options: &BuildOptions) -> Box<dyn BuildMap> {
    match build_type {
        BuildType::Default => Box::new(DefaultMap),
        BuildType::Uglify => Box::new(UglifyMap::new()),
        BuildType::Beautify => Box::new(BeautifyMap::new(options)),
    }
}
