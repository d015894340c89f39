//! Dotted-path resolution and scope labels.
use crate::value::Value;

/// Resolve a dotted `path` against `context`.
///
/// Segments equal to `self_token` keep the current value. Any other segment
/// is looked up on the current value; a falsy intermediate ends the walk
/// with `None`. Accessors met along the way are invoked, and the result is
/// always a settled value.
pub fn resolve(context: &Value, path: &str, self_token: &str) -> Option<Value> {
    let mut current = context.clone();
    for segment in path.split('.') {
        if segment == self_token {
            continue;
        }
        if !current.truthy() {
            return None;
        }
        current = current.get(segment)?;
    }
    Some(current.settle())
}

/// Append the segments of `path` to `scope`, dropping self tokens and empty
/// segments. Labels only; no values are looked up.
pub fn extend_scope(scope: &str, path: &str, self_token: &str) -> String {
    scope
        .split('.')
        .chain(path.split('.'))
        .filter(|segment| !segment.is_empty() && *segment != self_token)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a multi-pair attribute such as `src:photo.url;alt:photo.title`.
///
/// Empty pieces are skipped. Names and values are trimmed; a piece without
/// `equals` yields `None` for its value. Text after a second `equals` is
/// ignored.
pub fn split_pairs(raw: &str, separator: char, equals: char) -> Vec<(String, Option<String>)> {
    raw.split(separator)
        .filter_map(|piece| {
            let mut parts = piece.split(equals);
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().map(|v| v.trim().to_string());
            Some((name.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_dotted_paths() {
        let ctx = Value::from(json!({"person": {"name": "Tobi"}}));
        assert_eq!(resolve(&ctx, "person.name", "@"), Some(Value::from("Tobi")));
        assert_eq!(resolve(&Value::from(json!({})), "a.b.c", "@"), None);
        assert_eq!(resolve(&ctx, "@", "@"), Some(ctx.clone()));
        assert_eq!(resolve(&ctx, "person.@.name", "@"), Some(Value::from("Tobi")));
    }

    #[test]
    fn invokes_accessors_along_the_path() {
        let ctx = Value::map([("x", Value::accessor(|| Value::map([("y", 1)])))]);
        assert_eq!(resolve(&ctx, "x.y", "@"), Some(Value::from(1)));
        let lazy = Value::accessor(|| Value::from("late"));
        assert_eq!(resolve(&lazy, "@", "@"), Some(Value::from("late")));
    }

    #[test]
    fn falsy_intermediates_end_resolution() {
        let ctx = Value::from(json!({"zero": 0, "empty": "", "names": []}));
        assert_eq!(resolve(&ctx, "zero.x", "@"), None);
        assert_eq!(resolve(&ctx, "empty.length", "@"), None);
        assert_eq!(resolve(&ctx, "names.length", "@"), Some(Value::from(0)));
        assert_eq!(resolve(&Value::Null, "anything", "@"), None);
    }

    #[test]
    fn custom_self_token() {
        let ctx = Value::from("me");
        assert_eq!(resolve(&ctx, "this", "this"), Some(Value::from("me")));
        assert_eq!(extend_scope("a", "this.b", "this"), "a.b");
    }

    #[test]
    fn extends_scope_labels() {
        assert_eq!(extend_scope("", "person.name", "@"), "person.name");
        assert_eq!(extend_scope("person", "@", "@"), "person");
        assert_eq!(extend_scope("people", "@.0", "@"), "people.0");
        assert_eq!(extend_scope("", "@", "@"), "");
    }

    #[test]
    fn splits_pairs_leniently() {
        assert_eq!(
            split_pairs(" src : photo.url ;; alt:title; bare ; :x; a:b:c", ';', ':'),
            vec![
                ("src".to_string(), Some("photo.url".to_string())),
                ("alt".to_string(), Some("title".to_string())),
                ("bare".to_string(), None),
                ("a".to_string(), Some("b".to_string())),
            ]
        );
        assert_eq!(
            split_pairs("click=save|keyup=save", '|', '='),
            vec![
                ("click".to_string(), Some("save".to_string())),
                ("keyup".to_string(), Some("save".to_string())),
            ]
        );
    }
}
