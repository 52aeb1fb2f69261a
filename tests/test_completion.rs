//! End-to-end completion tests
//!
//! Each test writes a small Go tree into a temporary directory and asks the
//! engine for candidates at a `‸` marker.

use std::fs;
use std::path::{Path, PathBuf};

use gocomplete::hir::DeclKind;
use gocomplete::{Completion, Config, Engine};
use rstest::rstest;

fn engine(lib_paths: &[PathBuf]) -> Engine {
    let config = Config {
        worker_threads: 2,
        ..Config::default()
    }
    .with_lib_paths(lib_paths.iter().cloned());
    Engine::new(config).expect("engine")
}

fn write(root: &Path, rel: &str, src: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).expect("mkdir");
    }
    fs::write(&path, src).expect("write");
    path
}

fn complete(engine: &Engine, path: &Path, marked: &str) -> Completion {
    let cursor = marked.find('‸').expect("cursor marker");
    let src = marked.replace('‸', "");
    engine.complete(src.as_bytes(), &path.to_string_lossy(), cursor)
}

fn names(completion: &Completion) -> Vec<&str> {
    completion.candidates.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn test_struct_member_excludes_package_names() {
    let engine = engine(&[]);
    let got = complete(
        &engine,
        Path::new("p.go"),
        "package p\ntype T struct{ X int }\nfunc f(){ var t T; t.‸ }",
    );

    let x = got.candidates.iter().find(|c| c.name == "X").expect("X");
    assert_eq!(x.kind, DeclKind::Var);
    assert_eq!(x.to_string(), "var X int");
    assert!(!names(&got).contains(&"T"));
    assert!(!names(&got).contains(&"f"));
}

#[test]
fn test_import_path_completion() {
    let lib = tempfile::tempdir().expect("tempdir");
    write(lib.path(), "strings/strings.go", "package strings\n");
    write(lib.path(), "strconv/atoi.go", "package strconv\n");
    let engine = engine(&[lib.path().to_path_buf()]);

    let got = complete(&engine, Path::new("p.go"), "package p\nimport \"strin‸");
    assert!(names(&got).contains(&"strings"));
    assert!(!names(&got).contains(&"strconv"));
    assert_eq!(got.candidates[0].kind, DeclKind::Import);
    assert_eq!(got.replace_len, 5);

    // Nothing matches case-sensitively, so the engine retries.
    let got = complete(&engine, Path::new("p.go"), "package p\nimport \"STRIN‸");
    assert_eq!(names(&got), ["strings"]);
}

#[test]
fn test_embedding_cycle_terminates() {
    let engine = engine(&[]);
    let got = complete(
        &engine,
        Path::new("p.go"),
        "package p\n\
         type S struct{ E; Shared int; OnlyS bool }\n\
         type E struct{ *S; Shared string; OnlyE bool }\n\
         func f(s S) { s.‸ }",
    );
    assert_eq!(names(&got), ["E", "OnlyE", "OnlyS", "S", "Shared"]);
    let shared = got.candidates.iter().find(|c| c.name == "Shared").expect("Shared");
    assert_eq!(shared.type_sig, "int");
}

#[rstest]
#[case::unbalanced_brace("func broken() {\n\tif x {\n}\n")]
#[case::unbalanced_paren("func broken() {\n\tif (\n}\n")]
#[case::garbage_decl("var = = }}\n")]
fn test_broken_code_before_cursor(#[case] broken: &str) {
    let engine = engine(&[]);
    let src = format!(
        "package p\ntype T struct{{ X int }}\n{broken}func f() {{\n\tvar t T\n\tt.‸\n}}\n"
    );
    let got = complete(&engine, Path::new("p.go"), &src);
    assert_eq!(names(&got), ["X"]);
}

#[rstest]
#[case::type_decl("type T struct{ X int }\n", "var t T")]
#[case::var_decl("type T struct{ X int }\nvar t T\n", "")]
#[case::const_then_type("const (\n\tA = 1\n)\ntype T struct{ X int }\n", "var t T")]
fn test_decl_after_unclosed_body(#[case] decls: &str, #[case] local: &str) {
    let engine = engine(&[]);
    let src = format!(
        "package p\nfunc broken() {{\n\tif x {{\n}}\n{decls}func f() {{\n\t{local}\n\tt.‸\n}}\n"
    );
    let got = complete(&engine, Path::new("p.go"), &src);
    assert_eq!(names(&got), ["X"]);
}

#[rstest]
#[case::selector_chain(format!("x{}", ".a".repeat(20_000)))]
#[case::call_chain(format!("f{}", "()".repeat(5_000)))]
#[case::binary_chain(format!("{}1", "1 + ".repeat(20_000)))]
#[case::nested_parens(format!("{}1{}", "(".repeat(3_000), ")".repeat(3_000)))]
#[case::unclosed_parens(format!("{}1", "(".repeat(3_000)))]
fn test_deeply_nested_source(#[case] deep: String) {
    let engine = engine(&[]);
    let src = format!(
        "package p\ntype T struct{{ X int }}\nvar y = {deep}\nfunc f() {{\n\tvar t T\n\tt.‸\n}}\n"
    );
    let got = complete(&engine, Path::new("p.go"), &src);
    assert_eq!(names(&got), ["X"]);

    // Completing on the deep expression itself.
    for body in ["y.‸".to_string(), format!("_ = {deep}.‸")] {
        let src = format!("package p\nvar y = {deep}\nfunc f() {{\n\t{body}\n}}\n");
        let got = complete(&engine, Path::new("q.go"), &src);
        assert!(got.candidates.iter().all(|c| !c.name.is_empty()));
    }
}

#[test]
fn test_package_members_and_qualified_types() {
    let lib = tempfile::tempdir().expect("tempdir");
    write(
        lib.path(),
        "geo/geo.go",
        "package geo\n\
         type Point struct{ X, Y float64 }\n\
         func Origin() Point { return Point{} }\n\
         func (p Point) Add(q Point) Point { return p }\n\
         var internalCount int\n",
    );
    let engine = engine(&[lib.path().to_path_buf()]);
    let main = lib.path().join("app/main.go");

    let got = complete(
        &engine,
        &main,
        "package main\nimport \"geo\"\nfunc main() { geo.‸ }",
    );
    assert_eq!(names(&got), ["Point", "Origin"]);
    assert_eq!(got.candidates[1].to_string(), "func Origin() geo.Point");

    let got = complete(
        &engine,
        &main,
        "package main\nimport g \"geo\"\nfunc main() { p := g.Origin(); p.‸ }",
    );
    assert_eq!(names(&got), ["X", "Y", "Add"]);
    assert_eq!(got.candidates[2].type_sig, "func(q geo.Point) geo.Point");
}

#[test]
fn test_dot_import() {
    let lib = tempfile::tempdir().expect("tempdir");
    write(lib.path(), "mathx/mathx.go", "package mathx\nfunc Sqrt(x float64) float64 { return x }\n");
    let engine = engine(&[lib.path().to_path_buf()]);
    let got = complete(
        &engine,
        &lib.path().join("app/main.go"),
        "package main\nimport . \"mathx\"\nfunc main() { Sq‸ }",
    );
    assert_eq!(names(&got), ["Sqrt"]);
}

#[test]
fn test_keyword_partial_filters_kind() {
    let engine = engine(&[]);
    let got = complete(
        &engine,
        Path::new("p.go"),
        "package p\nvar v int\ntype T int\nfunc A() {}\nfunc B() {}\nfunc f() { func‸ }",
    );
    assert_eq!(names(&got), ["A", "B", "f"]);
    assert_eq!(got.replace_len, 4);
}

#[test]
fn test_builtins_on_request() {
    let engine = engine(&[]);
    let src = "package p\nfunc f() { le‸ }";
    assert!(complete(&engine, Path::new("p.go"), src).is_empty());

    let config = engine.config().with_propose_builtins(true);
    engine.set_config(config).expect("config");
    let got = complete(&engine, Path::new("p.go"), src);
    assert_eq!(names(&got), ["len"]);
    assert_eq!(got.candidates[0].to_string(), "func len(v Type) int");
}

#[test]
fn test_error_method_without_builtins() {
    let engine = engine(&[]);
    let got = complete(
        &engine,
        Path::new("p.go"),
        "package p\nfunc f(err error) { err.‸ }",
    );
    assert_eq!(names(&got), ["Error"]);
}

#[test]
fn test_no_candidates_in_comments_and_strings() {
    let engine = engine(&[]);
    for src in [
        "package p\nvar abc int\n// ab‸",
        "package p\nvar abc int\nvar s = \"ab‸",
        "package p\nvar abc int\n/* ab‸",
    ] {
        assert!(complete(&engine, Path::new("p.go"), src).is_empty(), "{src:?}");
    }
}

#[rstest]
#[case(b"".as_slice(), 0)]
#[case(b"".as_slice(), 10)]
#[case(b"package".as_slice(), 3)]
#[case(b"}}}{{{((".as_slice(), 4)]
#[case(b"\xff\xff.".as_slice(), 3)]
#[case("package p\nvar é = 1\nfunc f() { é }".as_bytes(), 33)]
fn test_malformed_input_is_empty_not_fatal(#[case] buffer: &[u8], #[case] cursor: usize) {
    let engine = engine(&[]);
    let got = engine.complete(buffer, "", cursor);
    assert!(got.candidates.iter().all(|c| !c.name.is_empty()));
    if buffer.is_empty() {
        assert!(got.is_empty());
    }
}
