//! Accept and reject decisions on small files, one concern per test

use crate::common::{assert_contains, assert_lines, TestRepo};
use loop_convert::{LoopOutcome, RejectReason};

fn convert_one(source: &str) -> (loop_convert::FileReport, String) {
    let repo = TestRepo::new();
    repo.add_file("loops.cpp", source);
    let report = repo.convert("loops.cpp");
    let output = repo.read_file("loops.cpp");
    (report, output)
}

fn reasons(report: &loop_convert::FileReport) -> Vec<RejectReason> {
    report
        .loops
        .iter()
        .filter_map(|l| match &l.outcome {
            LoopOutcome::Rejected { reason } => Some(*reason),
            _ => None,
        })
        .collect()
}

// ============================================================================
// ACCEPTED
// ============================================================================

#[test]
fn test_single_statement_body() {
    let (report, output) = convert_one(
        "int arr[6];\nint sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n}\n",
    );
    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.conflicting, 0);
    assert_contains(&output, "for (auto & elem : arr) sum += elem;");
}

#[test]
fn test_nested_loops_avoid_outer_name() {
    let (report, output) = convert_one(
        r#"int outer[6];
int elems[6];
int sum;
void f() {
  for (int i = 0; i < 6; ++i) {
    sum += outer[i];
    for (int i = 0; i < 6; ++i) {
      sum += elems[i];
    }
  }
}
"#,
    );
    assert_eq!(report.stats.converted, 2);
    assert_lines(
        &output,
        &[
            "for (auto & elem : outer) {",
            "sum += elem;",
            "for (auto & elems_i : elems) {",
            "sum += elems_i;",
        ],
    );
}

#[test]
fn test_existing_local_forces_next_name() {
    let (_, output) = convert_one(
        "int items[4];\nint sum;\nvoid f() {\n  int item = 0;\n  for (int i = 0; i < 4; ++i) sum += items[i] + item;\n}\n",
    );
    assert_contains(&output, "for (auto & items_i : items) sum += items_i + item;");
}

#[test]
fn test_parameter_array_member_and_sizeof_bound() {
    let (report, output) = convert_one(
        r#"struct Grid {
  static const int Width = 4;
  int cells[Width];
};
int total;
void f(Grid &g) {
  for (int i = 0; i < Grid::Width; ++i) total += g.cells[i];
  int local[] = {1, 2, 3};
  for (int i = 0; i < sizeof(local) / sizeof(local[0]); ++i) total += local[i];
}
"#,
    );
    assert_eq!(report.stats.converted, 2, "{:#?}", report.loops);
    assert_contains(&output, "for (auto & elem : g.cells) total += elem;");
    assert_contains(&output, "for (auto & elem : local) total += elem;");
}

// ============================================================================
// REJECTED
// ============================================================================

#[test]
fn test_index_escapes() {
    let (report, output) = convert_one(
        "int arr[6];\nint sum;\nint x;\nvoid f() {\n  for (int i = 0; i < 6; ++i) { x = i; sum += arr[i]; }\n}\n",
    );
    assert_eq!(reasons(&report), vec![RejectReason::UsageEscape]);
    assert_eq!(report.stats.rejected, 1);
    assert_contains(&output, "for (int i = 0; i < 6; ++i)");
}

#[test]
fn test_two_containers() {
    let (report, _) = convert_one(
        "int arr[6];\nint other[6];\nint sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i] + other[i];\n}\n",
    );
    assert_eq!(reasons(&report), vec![RejectReason::AmbiguousContainer]);
}

#[test]
fn test_bound_differs_from_length() {
    let (report, _) = convert_one(
        "int arr[6];\nint sum;\nvoid f() {\n  for (int i = 0; i < 5; ++i) sum += arr[i];\n}\n",
    );
    assert_eq!(reasons(&report), vec![RejectReason::BoundMismatch]);
}

#[test]
fn test_pointer_parameter_has_no_length() {
    let (report, _) = convert_one(
        "int total;\nvoid f(int values[6]) {\n  for (int i = 0; i < 6; ++i) total += values[i];\n}\n",
    );
    assert_eq!(reasons(&report), vec![RejectReason::BoundMismatch]);
}

#[test]
fn test_member_with_default_initializer_is_not_a_constant_bound() {
    let source = r#"struct S {
  const int n = 6;
  int arr[6];
  int sum;
  S() : n(3) {}
  void f() { for (int i = 0; i < n; ++i) sum += arr[i]; }
};
"#;
    let (report, output) = convert_one(source);
    assert_eq!(reasons(&report), vec![RejectReason::BoundMismatch]);
    assert_eq!(output, source);
}

#[test]
fn test_container_with_side_effects_stays() {
    let source = "int m[4][6];\nint k;\nint sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += m[k++][i];\n}\n";
    let (report, output) = convert_one(source);
    assert_eq!(reasons(&report), vec![RejectReason::AmbiguousContainer]);
    assert_eq!(report.stats.converted, 0);
    assert_eq!(output, source);
}

#[test]
fn test_index_used_through_macro_stays() {
    let source = "int arr[6];\nint sum;\n#define AT arr[i]\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i] + AT;\n}\n";
    let (report, output) = convert_one(source);
    assert_eq!(reasons(&report), vec![RejectReason::UsageEscape]);
    assert_eq!(output, source);
}

#[test]
fn test_non_matching_shapes_are_not_counted() {
    let (report, output) = convert_one(
        r#"int arr[6];
int sum;
void f() {
  for (int i = 1; i < 6; ++i) sum += arr[i];
  for (int i = 0; i <= 5; ++i) sum += arr[i];
  for (int i = 0; i < 6; i++) sum += arr[i];
  for (int i = 5; i >= 0; --i) sum += arr[i];
}
"#,
    );
    assert_eq!(report.stats.total(), 0);
    assert!(report.output.is_none());
    assert_contains(&output, "for (int i = 1; i < 6; ++i)");
}

#[test]
fn test_overlapping_nested_rewrite_is_conflicting() {
    let (report, output) = convert_one(
        "int m[3][3];\nint sum;\nvoid f() {\n  for (int i = 0; i < 3; ++i)\n    for (int j = 0; j < 3; ++j)\n      sum += m[i][j];\n}\n",
    );
    assert_eq!(report.stats.converted, 1);
    assert_eq!(report.stats.conflicting, 1);
    assert_eq!(report.stats.rejected, 0);
    assert_contains(&output, "for (auto & elem : m)");
    assert_contains(&output, "for (int j = 0; j < 3; ++j)");
    assert_contains(&output, "sum += elem[j];");
}

#[test]
fn test_second_run_finds_nothing() {
    let repo = TestRepo::new();
    repo.add_file(
        "loops.cpp",
        "int arr[6];\nint sum;\nvoid f() {\n  for (int i = 0; i < 6; ++i) sum += arr[i];\n}\n",
    );
    assert_eq!(repo.convert("loops.cpp").stats.converted, 1);
    let again = repo.convert("loops.cpp");
    assert_eq!(again.stats.total(), 0);
}
