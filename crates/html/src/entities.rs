/// Named entities understood by the template markup reader.
///
/// The set is deliberately small: templates are authored by hand and the
/// remaining HTML5 names are left in the text unchanged.
const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
];

const MAX_ENTITY_LEN: usize = 10;

/// Decode named and semicolon-terminated numeric entities.
///
/// Unknown names, missing semicolons and invalid scalar values pass through
/// unchanged, so decoding is idempotent on its own output for the inputs the
/// tokenizer produces.
pub(crate) fn decode_entities(s: &str) -> String {
    let Some(first) = memchr::memchr(b'&', s.as_bytes()) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut rest = &s[first..];

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_one(rest) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// `input` starts with '&'. Returns the decoded char and the bytes consumed.
fn decode_one(input: &str) -> Option<(char, usize)> {
    let window = &input[1..];
    let semi = window
        .bytes()
        .take(MAX_ENTITY_LEN)
        .position(|b| b == b';')?;
    let body = &window[..semi];
    let consumed = semi + 2;

    if let Some(numeric) = body.strip_prefix('#') {
        let scalar = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                u32::from_str_radix(hex, 16).ok()?
            }
            Some(_) => return None,
            None if !numeric.is_empty() && numeric.bytes().all(|b| b.is_ascii_digit()) => {
                numeric.parse::<u32>().ok()?
            }
            None => return None,
        };
        return char::from_u32(scalar).map(|ch| (ch, consumed));
    }

    NAMED
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, ch)| (*ch, consumed))
}

/// Escape text content for serialization.
pub fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Escape a double-quoted attribute value for serialization.
pub fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
