use crate::dom::{Dom, DomError};
use crate::types::{NodeKey, Token, TokenStream};

/// Build a detached fragment in `dom` from a token stream.
///
/// End tags close the nearest open element with the same name; unmatched end
/// tags are ignored and elements left open at the end are closed implicitly.
/// Doctype tokens have no place in a fragment and are dropped.
pub fn build_fragment(dom: &mut Dom, stream: &TokenStream) -> Result<NodeKey, DomError> {
    let atoms = stream.atoms();
    let root = dom.create_fragment();
    let mut open_elements: Vec<NodeKey> = Vec::new();

    for token in stream.iter() {
        let parent = open_elements.last().copied().unwrap_or(root);
        match token {
            Token::Doctype(_) => {}
            Token::Comment(text) => {
                let node = dom.create_comment(text);
                dom.append_child(parent, node)?;
            }
            Token::Text(text) => {
                if !text.is_empty() {
                    let node = dom.create_text(text);
                    dom.append_child(parent, node)?;
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let node = dom.create_element(atoms.resolve(*name));
                for (attr, value) in attributes {
                    match value {
                        Some(value) => dom.set_attr(node, atoms.resolve(*attr), value)?,
                        None => dom.set_boolean_attr(node, atoms.resolve(*attr))?,
                    }
                }
                dom.append_child(parent, node)?;
                if !*self_closing {
                    open_elements.push(node);
                }
            }
            Token::EndTag(name) => {
                let target = atoms.resolve(*name);
                if let Some(depth) = open_elements
                    .iter()
                    .rposition(|k| dom.element_name(*k) == Some(target))
                {
                    open_elements.truncate(depth);
                }
            }
        }
    }

    log::trace!(
        target: "html.dom",
        "built fragment {root} from {} tokens",
        stream.tokens().len()
    );
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::types::AtomTable;

    #[test]
    fn builds_nested_elements() {
        let mut dom = Dom::new();
        let stream = tokenize("<div id=a><p>hi</p><br><span disabled></span></div>");
        let root = build_fragment(&mut dom, &stream).unwrap();
        let div = dom.children(root)[0];
        assert_eq!(dom.attr(div, "id"), Some("a"));
        let names: Vec<_> = dom
            .children(div)
            .iter()
            .map(|k| dom.element_name(*k).unwrap())
            .collect();
        assert_eq!(names, vec!["p", "br", "span"]);
        let span = dom.children(div)[2];
        assert!(dom.has_attr(span, "disabled"));
        assert_eq!(dom.attributes(span)[0].1, None);
    }

    #[test]
    fn unmatched_end_tags_are_ignored() {
        let mut dom = Dom::new();
        let stream = tokenize("<ul><li>a</b></li><li>b</ul>tail");
        let root = build_fragment(&mut dom, &stream).unwrap();
        let kids = dom.children(root).to_vec();
        assert_eq!(kids.len(), 2);
        assert_eq!(dom.element_children(kids[0]).len(), 2);
        assert_eq!(dom.text(kids[1]), Some("tail"));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let depth: usize = 10_000;
        let mut tokens = Vec::with_capacity(depth * 2);
        let mut atoms = AtomTable::new();
        let div = atoms.intern_ascii_lowercase("div");
        for _ in 0..depth {
            tokens.push(Token::StartTag {
                name: div,
                attributes: Vec::new(),
                self_closing: false,
            });
        }
        for _ in 0..depth {
            tokens.push(Token::EndTag(div));
        }

        let mut dom = Dom::new();
        let root = build_fragment(&mut dom, &TokenStream::new(tokens, atoms)).unwrap();
        let mut current = root;
        let mut seen = 0usize;
        while let [only] = dom.children(current) {
            current = *only;
            seen += 1;
        }
        assert_eq!(seen, depth);
    }
}
