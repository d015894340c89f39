//! TOML render scenarios: markup, a JSON context, the expected snapshot
//! lines, and optional follow-up updates.
use crate::diff_lines;
use html::dom_snapshot::{DomSnapshot, DomSnapshotOptions};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use template::{Template, TemplateConfig, Value};

pub const RENDER_CASES_FORMAT_V1: &str = "render-cases-v1";

#[derive(Clone, Debug)]
pub struct RenderCase {
    pub id: String,
    pub markup: String,
    pub config: TemplateConfig,
    pub context: Value,
    pub expected: Vec<String>,
    pub updates: Vec<UpdateStep>,
}

#[derive(Clone, Debug)]
pub struct UpdateStep {
    pub context: Value,
    pub expected: Vec<String>,
    /// The top-level element keys must survive this update.
    pub keep_keys: bool,
}

#[derive(Debug, Deserialize)]
struct RenderCaseManifest {
    format: String,
    #[serde(rename = "case", default)]
    cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
struct RawCase {
    id: String,
    markup: String,
    context: String,
    expected: Vec<String>,
    #[serde(default)]
    separator: Option<char>,
    #[serde(default)]
    equals: Option<char>,
    #[serde(default)]
    self_token: Option<String>,
    #[serde(rename = "update", default)]
    updates: Vec<RawUpdate>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    context: String,
    expected: Vec<String>,
    #[serde(default)]
    keep_keys: bool,
}

/// Load and validate every case in `path`. Panics on malformed files.
pub fn load_render_cases(path: &Path) -> Vec<RenderCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read render cases {path:?}: {err}"));
    let manifest: RenderCaseManifest = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse render cases {path:?}: {err}"));
    assert_eq!(
        manifest.format, RENDER_CASES_FORMAT_V1,
        "unsupported render case format in {path:?}"
    );
    assert!(!manifest.cases.is_empty(), "no cases in {path:?}");

    let mut seen = BTreeSet::new();
    manifest
        .cases
        .into_iter()
        .map(|raw| {
            assert!(!raw.id.trim().is_empty(), "empty case id in {path:?}");
            assert!(seen.insert(raw.id.clone()), "duplicate case id '{}' in {path:?}", raw.id);
            let mut config = TemplateConfig::default();
            if let Some(separator) = raw.separator {
                config = config.with_separator(separator);
            }
            if let Some(equals) = raw.equals {
                config = config.with_equals(equals);
            }
            if let Some(token) = raw.self_token {
                config = config.with_self_token(token);
            }
            let context = parse_context(&raw.context, &raw.id, path);
            let updates = raw
                .updates
                .into_iter()
                .map(|step| UpdateStep {
                    context: parse_context(&step.context, &raw.id, path),
                    expected: step.expected,
                    keep_keys: step.keep_keys,
                })
                .collect();
            RenderCase {
                id: raw.id,
                markup: raw.markup,
                config,
                context,
                expected: raw.expected,
                updates,
            }
        })
        .collect()
}

fn parse_context(raw: &str, id: &str, path: &Path) -> Value {
    let json: serde_json::Value = serde_json::from_str(raw)
        .unwrap_or_else(|err| panic!("bad context JSON in case '{id}' of {path:?}: {err}"));
    Value::from(json)
}

/// Render `case` and apply its updates, comparing snapshots after each step.
pub fn run_render_case(case: &RenderCase) -> Result<(), String> {
    let mut template = Template::parse(&case.markup)
        .with_config(case.config.clone())
        .map_err(|err| format!("{}: {err}", case.id))?;
    template
        .render(&case.context)
        .map_err(|err| format!("{}: render failed: {err}", case.id))?;
    compare(&template, &case.expected, &format!("{} (render)", case.id))?;

    for (n, step) in case.updates.iter().enumerate() {
        let label = format!("{} (update {})", case.id, n + 1);
        let before = top_level(&template);
        let after = template
            .update(&step.context)
            .map_err(|err| format!("{label}: update failed: {err}"))?;
        if step.keep_keys && before != after {
            return Err(format!("{label}: top-level keys changed: {before:?} -> {after:?}"));
        }
        compare(&template, &step.expected, &label)?;
    }
    Ok(())
}

fn top_level(template: &Template) -> Vec<html::NodeKey> {
    match (template.dom(), template.container()) {
        (Some(dom), Some(container)) => dom.element_children(container),
        _ => Vec::new(),
    }
}

fn compare(template: &Template, expected: &[String], label: &str) -> Result<(), String> {
    let (Some(dom), Some(container)) = (template.dom(), template.container()) else {
        return Err(format!("{label}: nothing rendered"));
    };
    let actual = DomSnapshot::new(dom, container, DomSnapshotOptions::default())
        .as_lines()
        .to_vec();
    if actual == expected {
        Ok(())
    } else {
        Err(format!("{label}\n{}", diff_lines(expected, &actual)))
    }
}
