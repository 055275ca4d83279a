use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use indexmap::IndexSet;

use super::{BuildMap, RenderData};
use crate::error::BuildError;
use crate::model::{BuildOptions, CompileOptions};
use crate::processor::ast::{BinaryOp, Chunk, Comment, Expr, Literal, PREC_COMPARE, Range, Stmt, quote};
use crate::processor::context::SymbolContext;
use crate::processor::dependency::{DependencyGraph, DependencyId, DependencyType};

/// Drives a [`BuildMap`] over a chunk and answers the lookups it needs.
///
/// Without a graph (direct transpilation) file directives cannot be
/// resolved and are echoed as written.
pub struct Transformer<'a> {
    map: Box<dyn BuildMap>,
    context: &'a SymbolContext,
    graph: Option<&'a DependencyGraph>,
    options: &'a BuildOptions,
    environment: &'a HashMap<String, String>,
    process_import_path: Option<&'a dyn Fn(&str) -> String>,
    current: Cell<Option<DependencyId>>,
    depth: Cell<usize>,
    literal_sharing: Cell<bool>,
    /// Rendering a wrapped module body; its native imports are hoisted.
    in_module: Cell<bool>,
    /// Targets already emitted through `import_code` in the current bundle.
    visited_natives: RefCell<IndexSet<String>>,
    /// Trailing comments still unclaimed, one pool per chunk being rendered.
    comments: RefCell<Vec<Vec<Comment>>>,
}

impl<'a> Transformer<'a> {
    pub fn new(
        map: Box<dyn BuildMap>,
        context: &'a SymbolContext,
        graph: Option<&'a DependencyGraph>,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            map,
            context,
            graph,
            options: &options.build_options,
            environment: &options.environment_variables,
            process_import_path: options.process_import_path.as_deref(),
            current: Cell::new(None),
            depth: Cell::new(0),
            literal_sharing: Cell::new(true),
            in_module: Cell::new(false),
            visited_natives: RefCell::new(IndexSet::new()),
            comments: RefCell::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &SymbolContext {
        self.context
    }

    pub fn options(&self) -> &BuildOptions {
        self.options
    }

    pub fn is_dev_mode(&self) -> bool {
        self.options.is_dev_mode
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Render a whole chunk at depth zero.
    pub fn transform(&self, chunk: &Chunk, dependency: Option<DependencyId>) -> Result<String, BuildError> {
        self.transform_at(chunk, dependency, 0)
    }

    /// Render a chunk whose continuation lines sit at `depth`.
    pub fn transform_at(
        &self,
        chunk: &Chunk,
        dependency: Option<DependencyId>,
        depth: usize,
    ) -> Result<String, BuildError> {
        self.scoped(chunk, dependency, depth, |t| t.body(&chunk.body))
            .map_err(|e| e.in_target(chunk.filename.as_str()))
    }

    /// Render the body of a wrapped module. `import_code` inside renders
    /// as nothing; the bundle emits those at its top level.
    pub fn transform_module(
        &self,
        chunk: &Chunk,
        dependency: DependencyId,
        depth: usize,
    ) -> Result<String, BuildError> {
        let saved = self.in_module.replace(true);
        let result = self.transform_at(chunk, Some(dependency), depth);
        self.in_module.set(saved);
        result
    }

    /// Start a new output bundle: nothing has been emitted through
    /// `import_code` yet.
    pub fn begin_bundle(&self) {
        self.visited_natives.borrow_mut().clear();
    }

    fn scoped<R>(
        &self,
        chunk: &Chunk,
        dependency: Option<DependencyId>,
        depth: usize,
        f: impl FnOnce(&Self) -> R,
    ) -> R {
        let saved_current = self.current.replace(dependency);
        let saved_depth = self.depth.replace(depth);
        self.comments.borrow_mut().push(chunk.comments.clone());

        let result = f(self);

        self.comments.borrow_mut().pop();
        self.depth.set(saved_depth);
        self.current.set(saved_current);
        result
    }

    /// Run `f` with shared literal names switched off.
    pub fn without_literal_sharing<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let saved = self.literal_sharing.replace(false);
        let result = f(self);
        self.literal_sharing.set(saved);
        result
    }

    // ── Dispatch ───────────────────────────────────────────────────

    pub fn expr(&self, expr: &Expr, data: RenderData) -> Result<String, BuildError> {
        self.map.expr(self, expr, data)
    }

    pub fn stmt(&self, stmt: &Stmt) -> Result<String, BuildError> {
        self.map.stmt(self, stmt)
    }

    /// Statements joined at the current depth; empty renderings vanish.
    pub fn body(&self, stmts: &[Stmt]) -> Result<String, BuildError> {
        let mut lines = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let text = self.stmt(stmt)?;
            if !text.is_empty() {
                lines.push(text);
            }
        }
        Ok(lines.join(&self.line_break()))
    }

    /// A nested body: a line break plus the statements, or nothing at all.
    /// Call inside [`Transformer::nested`].
    pub fn block(&self, stmts: &[Stmt]) -> Result<String, BuildError> {
        let body = self.body(stmts)?;
        if body.is_empty() {
            Ok(body)
        } else {
            Ok(format!("{}{}", self.line_break(), body))
        }
    }

    pub fn nested<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let depth = self.depth.get();
        self.depth.set(depth + 1);
        let result = f(self);
        self.depth.set(depth);
        result
    }

    pub fn indent(&self) -> String {
        self.map.indent(self.depth.get())
    }

    pub fn line_break(&self) -> String {
        format!("\n{}", self.indent())
    }

    // ── Formatting hooks of the active map ─────────────────────────

    pub fn separator(&self) -> &'static str {
        self.map.separator()
    }

    pub fn assign(&self, variable: &str, init: &str) -> String {
        self.map.assignment(variable, init)
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        self.map.key_value(key, value)
    }

    pub fn binary_operator(&self, op: BinaryOp, left: &str, right: &str) -> String {
        self.map.binary_operator(op, left, right)
    }

    pub fn strips_parens(&self) -> bool {
        self.map.strips_parens()
    }

    /// Render `expr` where the parent binds with strength `min`, adding
    /// parentheses when the child binds looser.
    pub fn operand(&self, expr: &Expr, min: u8, data: RenderData) -> Result<String, BuildError> {
        let text = self.expr(expr, data)?;
        let shown = if self.strips_parens() {
            expr.unwrap_parens()
        } else {
            expr
        };
        if shown.precedence() < min {
            Ok(format!("({text})"))
        } else {
            Ok(text)
        }
    }

    /// Left operand of a comparison. Since comparisons chain,
    /// `(a<b)==c` must keep its parentheses.
    pub fn comparison_operand(&self, expr: &Expr, data: RenderData) -> Result<String, BuildError> {
        let inner = expr.unwrap_parens();
        match inner {
            Expr::Binary { op, .. } if op.is_comparison() && matches!(expr, Expr::Paren(_)) => {
                if self.strips_parens() {
                    Ok(format!("({})", self.expr(inner, data)?))
                } else {
                    self.expr(expr, data)
                }
            }
            _ => self.operand(expr, PREC_COMPARE, data),
        }
    }

    pub fn identifier(&self, name: &str) -> Result<String, BuildError> {
        self.expr(&Expr::Identifier(name.to_string()), RenderData::default())
    }

    pub fn literal(&self, literal: &Literal, data: RenderData) -> String {
        if self.literal_sharing.get() && !data.is_argument {
            if let Some(name) = self.context.shared_literal(&literal.raw) {
                return name.to_string();
            }
        }
        literal.raw.clone()
    }

    /// Trailing comments of the current chunk written within `range`.
    /// Each comment is handed out once.
    pub fn take_comments(&self, range: Range) -> Vec<Comment> {
        let mut pools = self.comments.borrow_mut();
        let Some(pool) = pools.last_mut() else {
            return Vec::new();
        };
        let (taken, kept): (Vec<Comment>, Vec<Comment>) = std::mem::take(pool)
            .into_iter()
            .partition(|c| c.line >= range.start.line && c.line <= range.end.line);
        *pool = kept;
        taken
    }

    // ── Lowering shared by every strategy ──────────────────────────

    /// The target has no bitwise syntax; emit a runtime call instead.
    pub fn bitwise(&self, op: BinaryOp, left: &Expr, right: &Expr, data: RenderData) -> Result<String, BuildError> {
        let sep = self.separator();
        let left = self.expr(left, data)?;
        let right = self.expr(right, data)?;
        Ok(format!("bitwise({}{sep}{left}{sep}{right})", quote(op.symbol())))
    }

    pub fn envar(&self, name: &str) -> String {
        if self.is_dev_mode() {
            return format!("#envar {name}");
        }
        self.environment
            .get(name)
            .map_or_else(|| "null".to_string(), |value| quote(value))
    }

    pub fn inject(&self, path: &str) -> String {
        match (self.graph, self.current.get()) {
            (Some(graph), Some(current)) if !self.is_dev_mode() => graph[current]
                .injections
                .get(path)
                .map_or_else(|| "null".to_string(), |content| quote(content)),
            _ => format!("#inject {}", quote(path)),
        }
    }

    fn import_path(&self, path: &str) -> String {
        let path = self
            .process_import_path
            .map_or_else(|| path.to_string(), |f| f(path));
        format!("import_code({})", quote(&path))
    }

    /// `import_code` for `path` preceded by every native import it pulls
    /// in; anything already emitted in this bundle is skipped.
    pub fn native_import(&self, path: &str) -> Result<String, BuildError> {
        let (Some(graph), Some(current)) = (self.graph, self.current.get()) else {
            return Ok(self.import_path(path));
        };
        if self.is_dev_mode() {
            return Ok(self.import_path(path));
        }

        let entry = graph.native_entry(current, path).ok_or_else(|| {
            BuildError::internal(format!("import_code({path}) was never resolved"))
                .in_target(graph[current].target.as_str())
        })?;
        if self.in_module.get() {
            return Ok(String::new());
        }
        Ok(self.natives(entry.imports.into_iter().chain([entry.main])))
    }

    /// `import_code` lines for `ids` not yet emitted in this bundle.
    pub fn natives(&self, ids: impl IntoIterator<Item = DependencyId>) -> String {
        let Some(graph) = self.graph else {
            return String::new();
        };
        let mut visited = self.visited_natives.borrow_mut();
        let mut lines = Vec::new();
        for id in ids {
            let target = &graph[id].target;
            if visited.insert(target.clone()) {
                lines.push(self.import_path(target));
            }
        }
        lines.join(&self.line_break())
    }

    fn linked(&self, path: &str, kind: DependencyType) -> Result<Option<DependencyId>, BuildError> {
        let (Some(graph), Some(current)) = (self.graph, self.current.get()) else {
            return Ok(None);
        };
        if self.is_dev_mode() {
            return Ok(None);
        }
        graph.edge(current, path, kind).map(Some).ok_or_else(|| {
            BuildError::internal(format!("{path} was never resolved"))
                .in_target(graph[current].target.as_str())
        })
    }

    /// `name = __REQUIRE("NS")`, or the directive itself when unresolved.
    pub fn import_stmt(&self, name: &str, path: &str) -> Result<String, BuildError> {
        match (self.graph, self.linked(path, DependencyType::Import)?) {
            (Some(graph), Some(child)) => {
                let namespace = &graph[child].namespace;
                Ok(self.assign(&self.identifier(name)?, &format!("__REQUIRE({})", quote(namespace))))
            }
            _ => Ok(format!("#import {name} from {}", quote(path))),
        }
    }

    /// The included file's statements, inlined at the current depth.
    pub fn include_stmt(&self, path: &str) -> Result<String, BuildError> {
        match (self.graph, self.linked(path, DependencyType::Include)?) {
            (Some(graph), Some(child)) => {
                let chunk = &graph[child].chunk;
                self.scoped(chunk, Some(child), self.depth.get(), |t| t.body(&chunk.body))
            }
            _ => Ok(format!("#include {}", quote(path))),
        }
    }

    pub fn conditional_stmt(
        &self,
        name: &str,
        negated: bool,
        body: &[Stmt],
        else_body: Option<&[Stmt]>,
    ) -> Result<String, BuildError> {
        if !self.is_dev_mode() {
            let defined = self.environment.contains_key(name);
            let branch = if defined != negated {
                body
            } else {
                else_body.unwrap_or(&[])
            };
            return self.body(branch);
        }

        let lb = self.line_break();
        let keyword = if negated { "#ifndef" } else { "#ifdef" };
        let mut out = format!("{keyword} {name}");
        let text = self.body(body)?;
        if !text.is_empty() {
            out.push_str(&lb);
            out.push_str(&text);
        }
        if let Some(else_body) = else_body {
            out.push_str(&lb);
            out.push_str("#else");
            let text = self.body(else_body)?;
            if !text.is_empty() {
                out.push_str(&lb);
                out.push_str(&text);
            }
        }
        out.push_str(&lb);
        out.push_str("#endif");
        Ok(out)
    }

    pub fn debugger_stmt(&self) -> String {
        if self.is_dev_mode() {
            "debugger".to_string()
        } else {
            "//debugger".to_string()
        }
    }
}
