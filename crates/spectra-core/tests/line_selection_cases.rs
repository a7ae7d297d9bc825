use serde::Deserialize;
use spectra_core::lines::LineDatabase;
use spectra_core::synthesis::{Parallelism, plan_partition};
use std::fs;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseFile {
    selection_cases: Vec<SelectionCase>,
    partition_cases: Vec<PartitionCase>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionCase {
    id: String,
    request: Option<Vec<String>>,
    #[serde(default)]
    expected: Vec<String>,
    #[serde(default)]
    error_placeholder: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionCase {
    id: String,
    policy: String,
    workers: usize,
    lines: usize,
    workers_per_group: usize,
    group_sizes: Vec<usize>,
}

fn load_cases() -> CaseFile {
    let source = fs::read_to_string(fixture_path("selection_cases.json"))
        .expect("selection cases should be readable");
    serde_json::from_str(&source).expect("selection cases should parse")
}

fn load_catalog() -> LineDatabase {
    LineDatabase::load(&fixture_path("lines.txt")).expect("fixture catalog should load")
}

#[test]
fn fixture_catalog_loads_every_line() {
    let database = load_catalog();
    assert_eq!(database.len(), 9);

    let weak = database.get("Mg II 2803 weak").expect("custom identifier");
    assert_eq!(weak.field, "Mg_p1_number_density");
    assert_eq!(weak.ion_state, 2);
}

#[test]
fn selection_cases_match_expected_identifiers() {
    let database = load_catalog();

    for case in load_cases().selection_cases {
        let result = database.select(case.request.as_deref());
        match &case.error_placeholder {
            Some(placeholder) => {
                let error = result.expect_err(&format!("{} should fail", case.id));
                assert_eq!(error.placeholder(), placeholder, "case {}", case.id);
            }
            None => {
                let selected = result.unwrap_or_else(|error| {
                    panic!("{} should select lines: {}", case.id, error)
                });
                let identifiers: Vec<&str> = selected
                    .iter()
                    .map(|line| line.identifier.as_str())
                    .collect();
                assert_eq!(identifiers, case.expected, "case {}", case.id);
            }
        }
    }
}

#[test]
fn partition_cases_cover_every_line_once() {
    for case in load_cases().partition_cases {
        let policy = Parallelism::parse(&case.policy)
            .unwrap_or_else(|error| panic!("{} policy should parse: {}", case.id, error));
        let plan = plan_partition(policy, case.workers, case.lines);

        assert_eq!(plan.workers_per_group(), case.workers_per_group, "case {}", case.id);
        let sizes: Vec<usize> = plan.line_ranges().iter().map(|range| range.len()).collect();
        assert_eq!(sizes, case.group_sizes, "case {}", case.id);

        for line in 0..case.lines {
            assert!(plan.group_of(line).is_some(), "case {} line {}", case.id, line);
        }
        assert!(plan.total_workers() <= case.workers.max(1), "case {}", case.id);
    }
}
