use crate::dom::{Dom, NodeKind};
use crate::form::{ControlType, control_type, form_value};
use crate::types::NodeKey;
use std::fmt::{self, Write};

/// Deterministic line rendering of a subtree for golden comparisons.
/// Not a stable format; intended for test assertions only.
///
/// Equivalence rules:
/// - Node kinds, element names and text must match exactly.
/// - Attribute order is significant.
/// - Node keys are ignored unless `include_keys` is set.
/// - Live form values are shown only when they differ from the attribute.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomSnapshotOptions {
    pub include_keys: bool,
}

#[derive(Debug)]
pub struct DomSnapshot {
    lines: Vec<String>,
}

impl DomSnapshot {
    pub fn new(dom: &Dom, root: NodeKey, options: DomSnapshotOptions) -> Self {
        let mut lines = Vec::new();
        let mut stack = vec![(root, 0usize)];
        while let Some((key, depth)) = stack.pop() {
            let mut line = " ".repeat(depth * 2);
            write_node_line(&mut line, dom, key, &options);
            lines.push(line);
            for &child in dom.children(key).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for DomSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug)]
pub struct DomMismatch {
    line: usize,
    expected: Option<String>,
    actual: Option<String>,
    expected_tree: String,
    actual_tree: String,
}

impl fmt::Display for DomMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |line: &Option<String>| line.clone().unwrap_or_else(|| "<none>".to_string());
        writeln!(f, "DOM mismatch at line {}", self.line + 1)?;
        writeln!(f, "expected: {}", show(&self.expected))?;
        writeln!(f, "actual:   {}", show(&self.actual))?;
        writeln!(f, "expected subtree:\n{}", self.expected_tree)?;
        writeln!(f, "actual subtree:\n{}", self.actual_tree)?;
        Ok(())
    }
}

impl std::error::Error for DomMismatch {}

pub fn compare_dom(
    expected: (&Dom, NodeKey),
    actual: (&Dom, NodeKey),
    options: DomSnapshotOptions,
) -> Result<(), Box<DomMismatch>> {
    let expected = DomSnapshot::new(expected.0, expected.1, options);
    let actual = DomSnapshot::new(actual.0, actual.1, options);
    let (e, a) = (expected.as_lines(), actual.as_lines());
    let Some(line) = (0..e.len().max(a.len())).find(|&i| e.get(i) != a.get(i)) else {
        return Ok(());
    };
    Err(Box::new(DomMismatch {
        line,
        expected: e.get(line).cloned(),
        actual: a.get(line).cloned(),
        expected_tree: expected.render(),
        actual_tree: actual.render(),
    }))
}

pub fn assert_dom_eq(expected: (&Dom, NodeKey), actual: (&Dom, NodeKey)) {
    if let Err(mismatch) = compare_dom(expected, actual, DomSnapshotOptions::default()) {
        panic!("{mismatch}");
    }
}

fn write_node_line(out: &mut String, dom: &Dom, key: NodeKey, options: &DomSnapshotOptions) {
    match dom.kind(key) {
        None => out.push_str("#missing"),
        Some(NodeKind::Fragment) => out.push_str("#fragment"),
        Some(NodeKind::Element { name, attributes }) => {
            out.push('<');
            out.push_str(name);
            for (attr, value) in attributes {
                out.push(' ');
                out.push_str(attr);
                if let Some(value) = value {
                    out.push_str("=\"");
                    write_escaped(out, value);
                    out.push('"');
                }
            }
            write_live_state(out, dom, key);
            out.push('>');
        }
        Some(NodeKind::Text { text }) => {
            out.push('"');
            write_escaped(out, text);
            out.push('"');
        }
        Some(NodeKind::Comment { text }) => {
            out.push_str("<!-- ");
            write_escaped(out, text);
            out.push_str(" -->");
        }
    }
    if options.include_keys {
        let _ = write!(out, " key={key}");
    }
}

fn write_live_state(out: &mut String, dom: &Dom, key: NodeKey) {
    let ty = control_type(dom, key);
    if ty.is_checkable() {
        let live = form_value(dom, key).is_some();
        if live != dom.has_attr(key, "checked") {
            let _ = write!(out, " :checked={live}");
        }
    } else if matches!(ty, ControlType::Text)
        && let Some(value) = form_value(dom, key)
        && Some(value.as_str()) != dom.attr(key, "value")
    {
        out.push_str(" :value=\"");
        write_escaped(out, &value);
        out.push('"');
    }
}

fn write_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ if ch.is_ascii() => out.push(ch),
            _ => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::set_form_value;
    use crate::parse_fragment;

    #[test]
    fn renders_indented_lines() {
        let (dom, root) = parse_fragment("<ul class=a><li>x\ny</li><!--c--></ul>");
        let snap = DomSnapshot::new(&dom, root, DomSnapshotOptions::default());
        assert_eq!(
            snap.as_lines(),
            &[
                "#fragment",
                "  <ul class=\"a\">",
                "    <li>",
                "      \"x\\ny\"",
                "    <!-- c -->",
            ]
        );
    }

    #[test]
    fn shows_live_values_that_diverge() {
        let (mut dom, root) = parse_fragment("<input value=a>");
        let input = dom.children(root)[0];
        set_form_value(&mut dom, input, "b").unwrap();
        let snap = DomSnapshot::new(&dom, input, DomSnapshotOptions::default());
        assert_eq!(snap.render(), "<input value=\"a\" :value=\"b\">");
    }

    #[test]
    fn mismatch_points_at_first_differing_line() {
        let (a, ra) = parse_fragment("<p>a</p>");
        let (b, rb) = parse_fragment("<p>b</p>");
        let err = compare_dom((&a, ra), (&b, rb), DomSnapshotOptions::default())
            .expect_err("expected mismatch");
        let text = err.to_string();
        assert!(text.contains("line 3"));
        assert!(text.contains("\"b\""));
        assert_dom_eq((&a, ra), (&a, ra));
    }
}
