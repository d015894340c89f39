use std::path::Path;
use template_test_support::render_cases::{load_render_cases, run_render_case};

#[test]
fn render_cases_match_snapshots() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/render_cases.toml");
    let cases = load_render_cases(&path);
    let failures: Vec<String> = cases
        .iter()
        .filter_map(|case| run_render_case(case).err())
        .collect();
    assert!(
        failures.is_empty(),
        "{} of {} render cases failed:\n{}",
        failures.len(),
        cases.len(),
        failures.join("\n")
    );
}
