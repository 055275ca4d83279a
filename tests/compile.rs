use greyscript_transpiler::model::{BuildOptions, BuildType, CompileOptions, IndentationType};
use greyscript_transpiler::processor::resource::{FsResourceHandler, MemoryResourceHandler, ResourceHandler};
use greyscript_transpiler::{ErrorKind, compile, transpile_source};

fn options(build_type: BuildType) -> CompileOptions {
    CompileOptions {
        build_type,
        build_options: BuildOptions {
            indentation: IndentationType::Whitespace,
            indentation_spaces: 2,
            ..BuildOptions::default()
        },
        ..CompileOptions::default()
    }
}

fn single(files: &[(&str, &str)], build_type: BuildType) -> String {
    let mut handler = MemoryResourceHandler::new();
    for (path, content) in files {
        handler.insert(path, content);
    }
    let output = compile("/main.src", &handler, &options(build_type)).expect("compiles");
    output["/main.src"].clone()
}

#[test]
fn test_circular_imports_fail() {
    let err = compile("tests/scripts/cycle/a.src", &FsResourceHandler, &CompileOptions::default())
        .expect_err("cycle");
    assert_eq!(err.kind, ErrorKind::Circular);
    assert!(err.message.contains("a.src"), "{err}");
    assert!(err.message.contains("b.src"), "{err}");
}

#[test]
fn test_repeated_literal_is_declared_once() {
    let main = single(&[("/main.src", "x = 42\ny = 42 + 1\nprint 42")], BuildType::Uglify);
    assert_eq!(main, "c=42\na=c\nb=c+1\nprint(c)");
    assert_eq!(main.matches("42").count(), 1);
}

#[test]
fn test_bitwise_becomes_a_call_in_every_strategy() {
    let src = [("/main.src", "a = 1\nb = 2\nx = a << b")];
    assert!(single(&src, BuildType::Default).ends_with("x=bitwise(\"<<\",a,b)"));
    assert!(single(&src, BuildType::Uglify).ends_with("c=bitwise(\"<<\",a,b)"));
    assert!(single(&src, BuildType::Beautify).ends_with("x = bitwise(\"<<\", a, b)"));
}

#[test]
fn test_import_code_is_emitted_once() {
    let mut handler = MemoryResourceHandler::new()
        .with_file("/main.src", "import_code(\"n.src\")\nimport_code(\"n.src\")\nprint 1")
        .with_file("/n.src", "import_code(\"deep.src\")\nprint 2");
    handler.insert("/deep.src", "print 3");

    let output = compile("/main.src", &handler, &CompileOptions::default()).expect("compiles");

    let targets: Vec<&str> = output.keys().map(String::as_str).collect();
    assert_eq!(targets, ["/main.src", "/deep.src", "/n.src"]);
    assert_eq!(
        output["/main.src"],
        "import_code(\"/deep.src\")\nimport_code(\"/n.src\")\nprint(1)"
    );
    assert_eq!(output["/n.src"], "import_code(\"/deep.src\")\nprint(2)");
    assert_eq!(output["/deep.src"], "print(3)");
}

#[test]
fn test_import_paths_are_rewritten() {
    let handler = MemoryResourceHandler::new()
        .with_file("/project/main.src", "import_code(\"tools/n.src\")")
        .with_file("/project/tools/n.src", "print 1");
    let options = CompileOptions {
        process_import_path: Some(Box::new(|path: &str| path.replacen("/project", "/home/me", 1))),
        ..CompileOptions::default()
    };
    let output = compile("/project/main.src", &handler, &options).expect("compiles");
    assert_eq!(output["/project/main.src"], "import_code(\"/home/me/tools/n.src\")");
}

#[test]
fn test_modules_are_wrapped_behind_the_header() {
    let handler = FsResourceHandler;
    let entry = handler.resolve("tests/scripts/app/main.src");
    let output = compile(&entry, &handler, &CompileOptions::default()).expect("compiles");
    assert_eq!(output.len(), 2);

    let main = &output[&entry];
    assert!(main.starts_with("MODULES={}\nEXPORTED={}\n__REQUIRE=function(r)"), "{main}");

    let require = main
        .lines()
        .find_map(|line| line.strip_prefix("math=__REQUIRE("))
        .expect("import assignment");
    let namespace = require.trim_end_matches(')');
    assert!(main.contains(&format!("MODULES[{namespace}]=function(r)")), "{main}");
    assert!(main.contains("double=function(n)\nreturn n*2\nend function"), "{main}");
    assert_eq!(main.matches("__REQUIRE=function").count(), 1);

    let tool = output
        .keys()
        .find(|k| k.ends_with("native/tool.src"))
        .expect("native bundle");
    assert!(main.contains(&format!("import_code(\"{tool}\")")), "{main}");
    assert!(main.contains(&format!("// entry point\nmath=__REQUIRE({namespace})\n")), "{main}");
    assert!(main.ends_with("result=math.square(4)\nprint(\"result: \"+result)"), "{main}");
    assert_eq!(output[tool], "tool_version=\"1.0\"\nprint(tool_version)");
}

#[test]
fn test_uglify_renames_across_modules() {
    let main = single(
        &[
            ("/main.src", "#import lib from \"lib.src\"\nprint lib.value"),
            ("/lib.src", "value = 10"),
        ],
        BuildType::Uglify,
    );
    assert!(main.contains("if not MODULES.hasIndex(r) then"), "{main}");
    assert!(main.contains("then\nb=10\nend if"), "{main}");
    assert!(main.ends_with("a=__REQUIRE(\"B\")\nprint(a.b)"), "{main}");
}

#[test]
fn test_excluded_names_survive_uglify() {
    let options = CompileOptions {
        build_type: BuildType::Uglify,
        excluded_namespaces: vec!["counter".to_string()],
        ..CompileOptions::default()
    };
    let code = transpile_source("counter = 1\ntotal = counter + 2\nprint total", &options).expect("transpiles");
    assert_eq!(code, "counter=1\na=counter+2\nprint(a)");
}

#[test]
fn test_beautify_keeps_comments_once() {
    let src = "x = 1 // first\n// standalone\nif x then // check\n  print x // inner\nend if";
    let main = single(&[("/main.src", src)], BuildType::Beautify);
    assert_eq!(
        main,
        "x = 1 // first\n// standalone\nif x then // check\n  print(x) // inner\nend if"
    );
}

#[test]
fn test_injections_and_environment() {
    let handler = MemoryResourceHandler::new()
        .with_file("/main.src", "data = #inject \"data.txt\"\nhost = #envar HOST")
        .with_file("/data.txt", "say \"hi\"");
    let mut options = CompileOptions::default();
    options
        .environment_variables
        .insert("HOST".to_string(), "10.0.0.1".to_string());
    let output = compile("/main.src", &handler, &options).expect("compiles");
    assert_eq!(output["/main.src"], "data=\"say \"\"hi\"\"\"\nhost=\"10.0.0.1\"");
}

#[test]
fn test_transpile_source_shares_literals() {
    let options = CompileOptions {
        build_type: BuildType::Uglify,
        ..CompileOptions::default()
    };
    let code = transpile_source("msg = \"hello\"\nprint \"hello\"\nprint msg", &options).expect("transpiles");
    assert_eq!(code, "b=\"hello\"\na=b\nprint(b)\nprint(a)");
}

#[test]
fn test_errors_carry_file_and_position() {
    let err = transpile_source("x = = 1", &CompileOptions::default()).expect_err("invalid");
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(err.target.as_deref(), Some("unknown"));
    assert_eq!(err.range.map(|r| r.start.line), Some(1));

    let handler = MemoryResourceHandler::new().with_file("/main.src", "print 1\n#include \"missing.src\"");
    let err = compile("/main.src", &handler, &CompileOptions::default()).expect_err("missing");
    assert_eq!(err.kind, ErrorKind::Resolution);
    assert!(err.message.contains("/missing.src"), "{err}");
    assert_eq!(err.target.as_deref(), Some("/main.src"));
    assert_eq!(err.range.map(|r| r.start.line), Some(2));
}
