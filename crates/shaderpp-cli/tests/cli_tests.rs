use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// Helper to create shaderpp command using the non-deprecated macro approach
fn shaderpp_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("shaderpp"))
}

/// Helper to write a tree of files under a temp directory
fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = temp_dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }
    temp_dir
}

// ============================================================================
// FLATTENING
// ============================================================================

#[test]
fn test_flattens_to_stdout() {
    let temp_dir = write_tree(&[
        (
            "main.frag",
            indoc! {r#"
                #version 330
                #include "common.glsl"
                void main() {}
            "#},
        ),
        ("common.glsl", "const float PI = 3.14159;\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .assert()
        .success()
        .stdout(indoc! {"
            #version 330
            const float PI = 3.14159;
            #line 3
            void main() {}
        "});
}

#[test]
fn test_include_dir_flag() {
    let temp_dir = write_tree(&[
        ("src/main.frag", "#include <noise.glsl>\n"),
        ("lib/noise.glsl", "float noise(vec2 p);\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("src/main.frag")
        .arg("-I")
        .arg("lib")
        .assert()
        .success()
        .stdout("float noise(vec2 p);\n#line 2\n");
}

#[test]
fn test_out_file() {
    let temp_dir = write_tree(&[
        ("main.frag", "#include \"a.glsl\"\n"),
        ("a.glsl", "float a;\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .arg("--out")
        .arg("flat.frag")
        .assert()
        .success()
        .stdout("");

    let written = fs::read_to_string(temp_dir.path().join("flat.frag")).unwrap();
    assert_eq!(written, "float a;\n#line 2\n");
}

#[test]
fn test_print_includes() {
    let temp_dir = write_tree(&[
        ("main.frag", "#include \"a.glsl\"\n"),
        ("a.glsl", "float a;\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .arg("--print-includes")
        .assert()
        .success()
        .stderr(predicate::str::contains("a.glsl -> a.glsl"));
}

#[test]
fn test_no_cache_flag() {
    let temp_dir = write_tree(&[("main.frag", "void main() {}\n")]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .arg("--no-cache")
        .arg("--max-cache-entries")
        .arg("4")
        .assert()
        .success()
        .stdout("void main() {}\n");
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_in_working_directory_is_used() {
    let temp_dir = write_tree(&[
        ("shaderpp.yaml", "searchPaths:\n  - shared\n"),
        ("main.frag", "#include \"util.glsl\"\n"),
        ("shared/util.glsl", "float util;\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .assert()
        .success()
        .stdout("float util;\n#line 2\n");
}

#[test]
fn test_explicit_config_flag() {
    let temp_dir = write_tree(&[
        ("conf/pp.json", r#"{ "searchPaths": ["shared"] }"#),
        ("main.frag", "#include \"util.glsl\"\n"),
        ("shared/util.glsl", "float util;\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .arg("--config")
        .arg("conf/pp.json")
        .assert()
        .success()
        .stdout("float util;\n#line 2\n");
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = write_tree(&[
        ("shaderpp.yaml", "enableCache: [1, 2]\n"),
        ("main.frag", "void main() {}\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("shaderpp.yaml"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created shaderpp.yaml"));

    let written = fs::read_to_string(temp_dir.path().join("shaderpp.yaml")).unwrap();
    assert!(written.contains("searchPaths"));

    // A second init refuses to overwrite
    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("--init")
        .assert()
        .failure();
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_missing_include_fails() {
    let temp_dir = write_tree(&[("main.frag", "#include \"nope.glsl\"\n")]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("main.frag")
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("nope.glsl"));
}

#[test]
fn test_circular_include_fails() {
    let temp_dir = write_tree(&[
        ("a.glsl", "#include \"b.glsl\"\n"),
        ("b.glsl", "#include \"a.glsl\"\n"),
    ]);

    shaderpp_cmd()
        .current_dir(temp_dir.path())
        .arg("a.glsl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular include"));
}

#[test]
fn test_missing_file_argument_fails() {
    shaderpp_cmd().assert().failure();
}
