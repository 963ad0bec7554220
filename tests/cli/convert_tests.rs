//! Tests for the `loop-convert` command line
//!
//! - `loop-convert <paths>...` rewrites files in place and prints counters
//! - `--count-only` prints counters without touching files
//! - `--format json` prints the full run summary

use crate::common::{assert_contains, assert_counts, assert_valid_json, TestRepo};

const SIMPLE: &str = "int arr[6];\nint sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n  for (int i = 0; i < 5; ++i) sum += arr[i];\n}\n";

// ============================================================================
// TEXT OUTPUT
// ============================================================================

#[test]
fn test_rewrites_file_in_place() {
    let repo = TestRepo::new();
    repo.add_file("src/a.cpp", SIMPLE);

    let output = repo.run_cli_success(&["src/a.cpp"]);
    assert_counts(&output, 1, 0, 1);
    assert_contains(
        &repo.read_file("src/a.cpp"),
        "for (auto & elem : arr) sum += elem;",
    );
}

#[test]
fn test_count_only_leaves_files_alone() {
    let repo = TestRepo::new();
    repo.add_file("src/a.cpp", SIMPLE);

    let output = repo.run_cli_success(&["--count-only", "src/a.cpp"]);
    assert_counts(&output, 1, 0, 1);
    assert_eq!(repo.read_file("src/a.cpp"), SIMPLE);
}

#[test]
fn test_directory_walk_sums_counts() {
    let repo = TestRepo::new();
    repo.add_file("src/a.cpp", SIMPLE);
    repo.add_file("src/nested/b.cc", SIMPLE);
    repo.add_file("src/readme.txt", "for (int i = 0; i < 6; ++i)");

    let output = repo.run_cli_success(&["--count-only", "src"]);
    assert_counts(&output, 2, 0, 2);

    let shallow = repo.run_cli_success(&["--count-only", "--max-depth", "1", "src"]);
    assert_counts(&shallow, 1, 0, 1);
}

#[test]
fn test_include_dir_flag_and_config_file() {
    let repo = TestRepo::new();
    repo.add_file("headers/size.h", "const int Size = 4;\n");
    repo.add_file(
        "a.cpp",
        "#include \"size.h\"\nint arr[Size];\nint sum;\nvoid f() {\n  for (int i = 0; i < Size; ++i) sum += arr[i];\n}\n",
    );

    let without = repo.run_cli_success(&["--count-only", "a.cpp"]);
    assert_counts(&without, 0, 0, 0);

    let with = repo.run_cli_success(&["--count-only", "-I", "headers", "a.cpp"]);
    assert_counts(&with, 1, 0, 0);

    repo.add_file(
        "loop-convert.toml",
        "[rewrite]\nelement_type = \"const auto &\"\n\n[frontend]\ninclude_dirs = [\"headers\"]\n",
    );
    let output = repo.run_cli_success(&["a.cpp"]);
    assert_counts(&output, 1, 0, 0);
    assert_contains(
        &repo.read_file("a.cpp"),
        "for (const auto & elem : arr) sum += elem;",
    );
}

// ============================================================================
// JSON OUTPUT
// ============================================================================

#[test]
fn test_json_report() {
    let repo = TestRepo::new();
    repo.add_file("a.cpp", SIMPLE);

    let output = repo.run_cli_success(&["--count-only", "--format", "json", "a.cpp"]);
    let json = assert_valid_json(&output, "json report");
    assert_eq!(json["stats"]["converted"], 1);
    assert_eq!(json["stats"]["rejected"], 1);
    assert_eq!(json["stats"]["reasons"]["bound_mismatch"], 1);

    let loops = json["files"][0]["loops"].as_array().expect("loops array");
    assert_eq!(loops.len(), 2);
    assert_eq!(loops[0]["line"], 4);
    assert_eq!(loops[0]["status"], "converted");
    assert_eq!(loops[0]["container"], "arr");
    assert_eq!(loops[1]["status"], "rejected");
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_missing_path_fails() {
    let repo = TestRepo::new();
    let (code, stderr) = repo.run_cli_failure(&["missing.cpp"]);
    assert_eq!(code, Some(1));
    assert_contains(&stderr, "File not found");
}

#[test]
fn test_unsupported_extension_fails() {
    let repo = TestRepo::new();
    repo.add_file("main.c", "int main(void) { return 0; }\n");
    let (code, stderr) = repo.run_cli_failure(&["main.c"]);
    assert_eq!(code, Some(2));
    assert_contains(&stderr, "Unsupported language");
}

#[test]
fn test_bad_config_fails() {
    let repo = TestRepo::new();
    repo.add_file("a.cpp", SIMPLE);
    repo.add_file("loop-convert.toml", "[rewrite\n");
    let (code, stderr) = repo.run_cli_failure(&["a.cpp"]);
    assert_eq!(code, Some(4));
    assert_contains(&stderr, "Configuration error");
}
