//! Final assembly: one output per bundle, modules wrapped in their
//! registration boilerplate and the bootstrap header where it is needed.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info};

use super::ast::quote;
use super::dependency::{DependencyGraph, DependencyId, DependencyType};
use super::script_parser::parse;
use crate::build_map::Transformer;
use crate::error::BuildError;
use crate::model::CompileOutput;

/// Module registry and loader, emitted once at the top of the main bundle.
pub const HEADER_BOILERPLATE: &str = r#"MODULES={}
EXPORTED={}
__REQUIRE=function(r)
if (not MODULES.hasIndex(r)) then
exit("Module "+r+" cannot be found...")
end if
module=@MODULES[r]
return @module(r).exports
end function"#;

/// Registers one module. `"$0"` becomes the namespace, `"$1"` the code.
pub const MODULE_BOILERPLATE: &str = r#"MODULES["$0"]=function(r)
module={}
if (EXPORTED.hasIndex(r)) then
module=EXPORTED[r]
end if
if (not module.hasIndex("exports")) then
"$1"
end if
EXPORTED[r]=module
return EXPORTED[r]
end function"#;

/// Nesting of `"$1"` inside [`MODULE_BOILERPLATE`].
const MODULE_BODY_DEPTH: usize = 2;

/// Ordered blocks of one output file.
#[derive(Debug, Default)]
pub struct OutputProcessor {
    blocks: Vec<String>,
}

impl OutputProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// One `name=literal` line per shared literal.
    pub fn add_literal_declarations(&mut self, transformer: &Transformer<'_>) {
        for (name, raw) in transformer.context().literal_declarations() {
            self.blocks.push(transformer.assign(name, raw));
        }
    }

    pub fn add_header(&mut self, header: &str) {
        self.blocks.push(header.to_string());
    }

    pub fn add_code(&mut self, code: impl Into<String>) {
        let code = code.into();
        if !code.is_empty() {
            self.blocks.push(code);
        }
    }

    pub fn build(self) -> String {
        self.blocks.join("\n")
    }
}

pub struct OutputBuilder<'t, 'a> {
    transformer: &'t Transformer<'a>,
    graph: &'a DependencyGraph,
    header: String,
    module_boilerplate: String,
}

impl<'t, 'a> OutputBuilder<'t, 'a> {
    pub fn new(transformer: &'t Transformer<'a>, graph: &'a DependencyGraph) -> Result<Self, BuildError> {
        Ok(Self {
            header: render_boilerplate(transformer, HEADER_BOILERPLATE, "header")?,
            module_boilerplate: render_boilerplate(transformer, MODULE_BOILERPLATE, "module")?,
            transformer,
            graph,
        })
    }

    /// The main bundle followed by one bundle per native import.
    pub fn build(&self) -> Result<CompileOutput, BuildError> {
        let graph = self.graph;
        let bundles: Vec<(DependencyId, Vec<DependencyId>)> = std::iter::once(graph.root())
            .chain(graph.native_bundles())
            .map(|id| (id, self.collect_modules(id)))
            .collect();
        let wrapped: usize = bundles.iter().map(|(_, modules)| modules.len()).sum();
        info!(bundles = bundles.len(), modules = wrapped, "assembling output");

        let mut output = CompileOutput::new();
        for (i, (id, modules)) in bundles.iter().enumerate() {
            let is_main = i == 0;
            let code = self.bundle(*id, modules, is_main, is_main && wrapped > 0)?;
            output.insert(graph[*id].target.clone(), code);
        }
        Ok(output)
    }

    /// Dev-mode output: every reachable file on its own, directives as written.
    pub fn build_standalone(&self) -> Result<CompileOutput, BuildError> {
        let mut output = CompileOutput::new();
        for id in self.graph.ids() {
            let dependency = &self.graph[id];
            if output.contains_key(&dependency.target) {
                continue;
            }
            let code = self.transformer.transform(&dependency.chunk, Some(id))?;
            output.insert(dependency.target.clone(), code);
        }
        info!(files = output.len(), "assembled standalone output");
        Ok(output)
    }

    fn bundle(
        &self,
        root: DependencyId,
        modules: &[DependencyId],
        is_main: bool,
        with_header: bool,
    ) -> Result<String, BuildError> {
        let graph = self.graph;
        self.transformer.begin_bundle();

        let mut output = OutputProcessor::new();
        if is_main {
            output.add_literal_declarations(self.transformer);
            if with_header {
                output.add_header(&self.header);
            }
        }

        // native imports never run inside a module wrapper
        let hoisted = modules
            .iter()
            .flat_map(|&module| graph.fetch_native_imports(module));
        output.add_code(self.transformer.natives(hoisted));

        for &module in modules {
            let dependency = &graph[module];
            let code = self
                .transformer
                .transform_module(&dependency.chunk, module, MODULE_BODY_DEPTH)?;
            let wrapped = self
                .module_boilerplate
                .replacen("\"$0\"", &quote(&dependency.namespace), 1)
                .replacen("\"$1\"", &code, 1);
            debug!(target = %dependency.target, namespace = %dependency.namespace, "wrapped module");
            output.add_code(wrapped);
        }

        let code = self.transformer.transform(&graph[root].chunk, Some(root))?;
        output.add_code(code);
        Ok(output.build())
    }

    /// Import-type dependencies below `root` that get wrapped, one per
    /// namespace, in depth-first order. Native imports are not entered.
    fn collect_modules(&self, root: DependencyId) -> Vec<DependencyId> {
        let mut modules = IndexMap::new();
        let mut visited = HashSet::new();
        self.walk(root, &self.graph[root].namespace, &mut visited, &mut modules);
        modules.into_values().collect()
    }

    fn walk(
        &self,
        id: DependencyId,
        root_namespace: &str,
        visited: &mut HashSet<DependencyId>,
        modules: &mut IndexMap<String, DependencyId>,
    ) {
        let dependency = &self.graph[id];
        if !visited.insert(id) || modules.contains_key(&dependency.namespace) {
            return;
        }
        if dependency.kind == DependencyType::Import && dependency.namespace != root_namespace {
            modules.insert(dependency.namespace.clone(), id);
        }
        for &child in &dependency.dependencies {
            if self.graph[child].kind != DependencyType::NativeImport {
                self.walk(child, root_namespace, visited, modules);
            }
        }
    }
}

fn render_boilerplate(transformer: &Transformer<'_>, source: &str, name: &str) -> Result<String, BuildError> {
    let chunk = parse(source, name)
        .map_err(|e| BuildError::internal(format!("{name} boilerplate does not parse: {e}")))?;
    transformer.without_literal_sharing(|t| t.transform(&chunk, None))
}

#[cfg(test)]
mod tests {
    use super::OutputProcessor;
    use crate::model::{BuildOptions, BuildType, CompileOptions, IndentationType};
    use crate::processor::compile;
    use crate::processor::resource::MemoryResourceHandler;

    fn library() -> MemoryResourceHandler {
        MemoryResourceHandler::new()
            .with_file("/main.src", "#import lib from \"lib.src\"\nprint lib.x")
            .with_file("/lib.src", "x = 1\ny = 2")
    }

    #[test]
    fn test_output_processor_skips_empty_blocks() {
        let mut output = OutputProcessor::new();
        output.add_code("a=1");
        output.add_code("");
        output.add_code("b=2");
        assert_eq!(output.build(), "a=1\nb=2");
    }

    #[test]
    fn test_main_bundle_with_module() {
        let output = compile("/main.src", &library(), &CompileOptions::default()).expect("compiles");
        assert_eq!(output.len(), 1);
        let expected = [
            "MODULES={}",
            "EXPORTED={}",
            "__REQUIRE=function(r)",
            "if (not MODULES.hasIndex(r)) then",
            "exit(\"Module \"+r+\" cannot be found...\")",
            "end if",
            "module=@MODULES[r]",
            "return @module(r).exports",
            "end function",
            "MODULES[\"B\"]=function(r)",
            "module={}",
            "if (EXPORTED.hasIndex(r)) then",
            "module=EXPORTED[r]",
            "end if",
            "if (not module.hasIndex(\"exports\")) then",
            "x=1",
            "y=2",
            "end if",
            "EXPORTED[r]=module",
            "return EXPORTED[r]",
            "end function",
            "lib=__REQUIRE(\"B\")",
            "print(lib.x)",
        ]
        .join("\n");
        assert_eq!(output["/main.src"], expected);
    }

    #[test]
    fn test_module_body_is_indented_in_place() {
        let options = CompileOptions {
            build_type: BuildType::Beautify,
            build_options: BuildOptions {
                indentation: IndentationType::Whitespace,
                indentation_spaces: 2,
                ..BuildOptions::default()
            },
            ..CompileOptions::default()
        };
        let output = compile("/main.src", &library(), &options).expect("compiles");
        let main = &output["/main.src"];
        assert!(
            main.contains("  if not module.hasIndex(\"exports\") then\n    x = 1\n    y = 2\n  end if"),
            "{main}"
        );
    }

    #[test]
    fn test_no_header_without_modules() {
        let handler = MemoryResourceHandler::new()
            .with_file("/main.src", "#include \"part.src\"\nprint x")
            .with_file("/part.src", "x = 1");
        let output = compile("/main.src", &handler, &CompileOptions::default()).expect("compiles");
        assert_eq!(output["/main.src"], "x=1\nprint(x)");
    }

    #[test]
    fn test_native_imports_become_bundles() {
        let handler = MemoryResourceHandler::new()
            .with_file("/main.src", "import_code(\"n.src\")\nprint 1")
            .with_file("/n.src", "#import lib from \"lib.src\"\nlib.go")
            .with_file("/lib.src", "go = function()\nend function");
        let output = compile("/main.src", &handler, &CompileOptions::default()).expect("compiles");

        let targets: Vec<&str> = output.keys().map(String::as_str).collect();
        assert_eq!(targets, ["/main.src", "/n.src"]);

        let main = &output["/main.src"];
        assert!(main.starts_with("MODULES={}"), "{main}");
        assert!(!main.contains("MODULES[\""), "{main}");
        assert!(main.ends_with("import_code(\"/n.src\")\nprint(1)"), "{main}");

        let native = &output["/n.src"];
        assert!(native.starts_with("MODULES[\""), "{native}");
        assert!(native.ends_with("lib.go"), "{native}");
    }

    #[test]
    fn test_module_native_imports_are_hoisted() {
        let handler = MemoryResourceHandler::new()
            .with_file("/main.src", "#import lib from \"lib.src\"\nprint lib.x")
            .with_file("/lib.src", "import_code(\"d.src\")\nx = 1")
            .with_file("/d.src", "print 3");
        let output = compile("/main.src", &handler, &CompileOptions::default()).expect("compiles");

        let targets: Vec<&str> = output.keys().map(String::as_str).collect();
        assert_eq!(targets, ["/main.src", "/d.src"]);

        let main = &output["/main.src"];
        assert_eq!(main.matches("import_code(").count(), 1, "{main}");
        let native = main.find("import_code(\"/d.src\")").expect("hoisted import");
        let module = main.find("MODULES[\"").expect("wrapped module");
        assert!(main.starts_with("MODULES={}"), "{main}");
        assert!(native < module, "{main}");
        assert!(main.contains("then\nx=1\nend if"), "{main}");
        assert_eq!(output["/d.src"], "print(3)");
    }

    #[test]
    fn test_native_bundles_track_imports_separately() {
        let handler = MemoryResourceHandler::new()
            .with_file("/main.src", "import_code(\"n.src\")\nimport_code(\"d.src\")")
            .with_file("/n.src", "#import lib from \"lib.src\"\nprint lib.x")
            .with_file("/lib.src", "import_code(\"d.src\")\nx = 1")
            .with_file("/d.src", "print 3");
        let output = compile("/main.src", &handler, &CompileOptions::default()).expect("compiles");

        let targets: Vec<&str> = output.keys().map(String::as_str).collect();
        assert_eq!(targets, ["/main.src", "/d.src", "/n.src"]);

        let main = &output["/main.src"];
        assert!(main.starts_with("MODULES={}"), "{main}");
        assert!(main.ends_with("end function\nimport_code(\"/d.src\")\nimport_code(\"/n.src\")"), "{main}");

        let native = &output["/n.src"];
        assert!(native.starts_with("import_code(\"/d.src\")\nMODULES[\""), "{native}");
        assert_eq!(native.matches("import_code(").count(), 1, "{native}");
        assert!(native.contains("then\nx=1\nend if"), "{native}");
        assert!(native.ends_with("print(lib.x)"), "{native}");
    }

    #[test]
    fn test_dev_mode_emits_every_file() {
        let handler = MemoryResourceHandler::new()
            .with_file("/main.src", "import_code(\"n.src\")\n#import lib from \"lib.src\"")
            .with_file("/n.src", "print 1")
            .with_file("/lib.src", "x = 1");
        let options = CompileOptions {
            build_options: BuildOptions {
                is_dev_mode: true,
                ..BuildOptions::default()
            },
            ..CompileOptions::default()
        };
        let output = compile("/main.src", &handler, &options).expect("compiles");

        assert_eq!(output.len(), 3);
        assert_eq!(
            output["/main.src"],
            "import_code(\"n.src\")\n#import lib from \"lib.src\""
        );
        assert_eq!(output["/lib.src"], "x=1");
        assert_eq!(output["/n.src"], "print(1)");
    }
}
