//! The compilation pipeline.
//!
//! Resources are loaded and parsed, the dependency graph is built and the
//! symbol context seeded from it, then every bundle is rendered through
//! the selected build map and assembled.
pub mod ast;
pub mod builtins;
pub mod chunk_cache;
pub mod context;
pub mod dependency;
pub mod lexer;
pub mod namespaces;
pub mod output_builder;
pub mod resource;
pub mod script_parser;

use tracing::info;

use crate::build_map::{self, Transformer};
use crate::error::BuildError;
use crate::model::{BuildType, CompileOptions, CompileOutput};
use context::{ContextOptions, SymbolContext};
use dependency::DependencyGraph;
use namespaces::fetch_namespaces;
use output_builder::{OutputBuilder, OutputProcessor};
use resource::{ResourceHandler, ResourceManager};

fn symbol_context(options: &CompileOptions) -> SymbolContext {
    let build = &options.build_options;
    let optimize = options.build_type == BuildType::Uglify && !build.is_dev_mode;
    SymbolContext::new(ContextOptions {
        obfuscation: build.obfuscation,
        rename: optimize && !build.disable_namespaces_optimization,
        share_literals: optimize && !build.disable_literals_optimization,
        excluded: options.excluded_namespaces.clone(),
    })
}

/// Compile `entry` and everything it references into one text per bundle,
/// keyed by resolved path. The main bundle comes first.
pub fn compile(
    entry: &str,
    handler: &dyn ResourceHandler,
    options: &CompileOptions,
) -> Result<CompileOutput, BuildError> {
    let mut context = symbol_context(options);

    // 1. ── Load ──
    let mut resources = ResourceManager::new(handler);
    resources.load(entry)?;

    // 2. ── Resolve ──
    let (graph, found) = DependencyGraph::build(&resources, &mut context)?;
    info!(
        dependencies = graph.len(),
        namespaces = found.namespaces.len(),
        "dependency graph built"
    );

    // 3. ── Seed the context ──
    for name in &found.namespaces {
        context.create_namespace(name);
    }
    for literal in found.literals() {
        context.add_literal(literal);
    }
    context.seal();

    // 4. ── Render and assemble ──
    let map = build_map::for_type(options.build_type, &options.build_options);
    let transformer = Transformer::new(map, &context, Some(&graph), options);
    let builder = OutputBuilder::new(&transformer, &graph)?;
    let output = if options.build_options.is_dev_mode {
        builder.build_standalone()?
    } else {
        builder.build()?
    };
    info!(outputs = output.len(), build_type = ?options.build_type, "compilation finished");
    Ok(output)
}

/// Compile a single source text. Nothing is resolved, so file directives
/// stay as written.
pub fn transpile_source(code: &str, options: &CompileOptions) -> Result<String, BuildError> {
    let chunk = script_parser::parse(code, "unknown")?;

    let mut context = symbol_context(options);
    for name in fetch_namespaces(&chunk) {
        context.create_namespace(&name);
    }
    for literal in &chunk.literals {
        context.add_literal(literal);
    }
    context.seal();

    let map = build_map::for_type(options.build_type, &options.build_options);
    let transformer = Transformer::new(map, &context, None, options);
    let mut output = OutputProcessor::new();
    output.add_literal_declarations(&transformer);
    output.add_code(transformer.transform(&chunk, None)?);
    Ok(output.build())
}
