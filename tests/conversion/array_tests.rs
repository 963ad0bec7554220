//! Loops over global, local and member arrays, with the bound spelled through
//! named constants

use crate::common::{assert_contains, assert_lines, assert_not_contains, TestRepo};
use loop_convert::{ConversionOptions, LoopOutcome};

const STRUCTURES_H: &str = r#"struct Val {
  int x;
  void g();
};
"#;

const ARRAY_CPP: &str = r#"const int N = 6;
const int NMinusOne = N - 1;
int arr[N] = {1, 2, 3, 4, 5, 6};
int (*pArr)[N] = &arr;
#include "structures.h"
void f() {
  int sum = 0;

  for (int i = 0; i < N; ++i) {
    sum += arr[i];
  }

  for (int i = 0; i < N; ++i) {
    printf("Fibonacci number is %d\n", arr[i]);
    sum += arr[i] + 2;
  }

  for (int i = 0; i < N; ++i) {
    int x = arr[i];
    int y = arr[i] + 2;
  }

  for (int i = 0; i < N; ++i) {
    int x = N;
    x = arr[i];
  }

  for (int i = 0; i < N; ++i) {
    arr[i] += 1;
  }

  for (int i = 0; i < N; ++i) {
    int x = arr[i] + 2;
    arr[i] ++;
  }

  for (int i = 0; i < N; ++i) {
    arr[i] = 4 + arr[i];
  }

  for (int i = 0; i < NMinusOne + 1; ++i) {
    sum += arr[i];
  }

  for (int i = 0; i < N; ++i) {
    printf("Fibonacci number %d has address %p\n", arr[i], &arr[i]);
    sum += arr[i] + 2;
  }

  Val teas[N];
  for (int i = 0; i < N; ++i) {
    teas[i].g();
  }
}

struct HasArr {
  int Arr[N];
  Val ValArr[N];
  void implicitThis() {
    for (int i = 0; i < N; ++i) {
      printf("%d", Arr[i]);
    }

    for (int i = 0; i < N; ++i) {
      printf("%d", ValArr[i].x);
    }
  }

  void explicitThis() {
    for (int i = 0; i < N; ++i) {
      printf("%d", this->Arr[i]);
    }

    for (int i = 0; i < N; ++i) {
      printf("%d", this->ValArr[i].x);
    }
  }
};
"#;

fn array_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.add_file("structures.h", STRUCTURES_H);
    repo.add_file("array.cpp", ARRAY_CPP);
    repo
}

#[test]
fn test_array_file_counts() {
    let repo = array_repo();
    let report = repo.convert("array.cpp");
    assert_eq!(report.stats.converted, 14, "{:#?}", report.loops);
    assert_eq!(report.stats.conflicting, 0);
    assert_eq!(report.stats.rejected, 0);
    assert_eq!(report.stats.skipped, 0);
}

#[test]
fn test_array_file_rewrites() {
    let repo = array_repo();
    repo.convert("array.cpp");
    let output = repo.read_file("array.cpp");

    assert_not_contains(&output, "[i]");
    assert_not_contains(&output, "int i = 0");

    assert_lines(&output, &["for (auto & elem : arr) {", "sum += elem;", "}"]);
    assert_lines(
        &output,
        &[
            "for (auto & elem : arr) {",
            "printf(\"Fibonacci number is %d\\n\", elem);",
            "sum += elem + 2;",
        ],
    );
    assert_lines(
        &output,
        &["for (auto & elem : arr) {", "int x = elem;", "int y = elem + 2;"],
    );
    assert_lines(&output, &["for (auto & elem : arr) {", "int x = N;", "x = elem;"]);
    assert_lines(&output, &["for (auto & elem : arr) {", "elem += 1;", "}"]);
    assert_lines(
        &output,
        &["for (auto & elem : arr) {", "int x = elem + 2;", "elem ++;"],
    );
    assert_lines(&output, &["for (auto & elem : arr) {", "elem = 4 + elem;"]);
    assert_lines(
        &output,
        &[
            "for (auto & elem : arr) {",
            "printf(\"Fibonacci number %d has address %p\\n\", elem, &elem);",
        ],
    );
    assert_lines(&output, &["for (auto & tea : teas) {", "tea.g();", "}"]);
}

#[test]
fn test_member_arrays_keep_their_spelling() {
    let repo = array_repo();
    repo.convert("array.cpp");
    let output = repo.read_file("array.cpp");

    assert_lines(&output, &["for (auto & elem : Arr) {", "printf(\"%d\", elem);"]);
    assert_lines(&output, &["for (auto & elem : ValArr) {", "printf(\"%d\", elem.x);"]);
    assert_lines(&output, &["for (auto & elem : this->Arr) {", "printf(\"%d\", elem);"]);
    assert_lines(
        &output,
        &["for (auto & elem : this->ValArr) {", "printf(\"%d\", elem.x);"],
    );
}

#[test]
fn test_count_only_reports_without_rewriting() {
    let repo = array_repo();
    let report = repo.convert_with(
        "array.cpp",
        ConversionOptions {
            count_only: true,
            ..ConversionOptions::default()
        },
    );
    assert_eq!(report.stats.converted, 14);
    assert_eq!(repo.read_file("array.cpp"), ARRAY_CPP);
}

#[test]
fn test_included_header_untouched() {
    let repo = TestRepo::new();
    repo.add_file(
        "inc/table.h",
        "const int Size = 3;\nint table[Size];\ninline void fill() {\n  for (int i = 0; i < Size; ++i) table[i] = 0;\n}\n",
    );
    repo.add_file(
        "main.cpp",
        "#include \"table.h\"\nint total;\nvoid sum() {\n  for (int i = 0; i < Size; ++i) total += table[i];\n}\n",
    );

    let mut options = ConversionOptions::default();
    options.frontend.include_dirs.push(repo.file_path("inc"));
    let report = repo.convert_with("main.cpp", options);

    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.skipped, 1);
    assert_contains(&repo.read_file("inc/table.h"), "table[i] = 0;");
    assert_contains(
        &repo.read_file("main.cpp"),
        "for (auto & elem : table) total += elem;",
    );
}

#[test]
fn test_unresolvable_bound_without_includes() {
    let repo = TestRepo::new();
    repo.add_file("inc/size.h", "const int Size = 3;\n");
    repo.add_file(
        "main.cpp",
        "#include \"inc/size.h\"\nint table[3];\nint total;\nvoid sum() {\n  for (int i = 0; i < Size; ++i) total += table[i];\n}\n",
    );

    let mut options = ConversionOptions::default();
    options.frontend.follow_includes = false;
    options.count_only = true;
    let without = repo.convert_with("main.cpp", options);
    assert_eq!(without.stats.converted, 0);

    let with = repo.convert("main.cpp");
    assert_eq!(with.stats.converted, 1);
    assert!(matches!(
        &with.loops[0].outcome,
        LoopOutcome::Converted { name, .. } if name == "elem"
    ));
}
