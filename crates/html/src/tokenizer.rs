//! Template markup tokenizer.
//!
//! A forgiving reader for hand-written template fragments, not an HTML5 state
//! machine. Supported: doctype, comments, start/end tags, quoted, unquoted and
//! boolean attributes, void elements, and raw text inside `script`/`style`.
//!
//! Tag and attribute names use the ASCII class `[A-Za-z0-9:_-]` and are
//! lowercased on interning. Malformed input never fails; unreadable bytes are
//! skipped and unterminated constructs run to the end of input.
use crate::entities::decode_entities;
use crate::types::{AtomId, AtomTable, Token, TokenStream};
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_rawtext_element(name: &str) -> bool {
    name == "script" || name == "style"
}

/// Tokenize a whole markup string.
pub fn tokenize(input: &str) -> TokenStream {
    let mut tokenizer = Tokenizer::new(input);
    tokenizer.run();
    tokenizer.finish()
}

pub struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Vec<Token>,
    atoms: AtomTable,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            out: Vec::new(),
            atoms: AtomTable::new(),
        }
    }

    pub fn finish(self) -> TokenStream {
        TokenStream::new(self.out, self.atoms)
    }

    pub fn run(&mut self) {
        // Slice endpoints are only ever placed at ASCII structural bytes, which
        // keeps every cut on a UTF-8 boundary.
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.text();
                continue;
            }
            let rest = &self.input[self.pos..];
            if rest.starts_with(COMMENT_START) {
                self.comment();
            } else if rest.len() >= 9 && rest.as_bytes()[..9].eq_ignore_ascii_case(b"<!doctype") {
                self.doctype();
            } else if rest.len() >= 2 && rest.as_bytes()[1] == b'/' {
                self.end_tag();
            } else if rest.len() >= 2 && rest.as_bytes()[1].is_ascii_alphabetic() {
                self.start_tag();
            } else {
                // A lone '<' is text.
                self.push_text(self.pos, self.pos + 1);
                self.pos += 1;
            }
        }
    }

    fn text(&mut self) {
        let start = self.pos;
        let end = memchr(b'<', &self.bytes[start..])
            .map(|rel| start + rel)
            .unwrap_or(self.bytes.len());
        self.push_text(start, end);
        self.pos = end;
    }

    fn push_text(&mut self, start: usize, end: usize) {
        debug_assert!(self.input.is_char_boundary(start));
        debug_assert!(self.input.is_char_boundary(end));
        let decoded = decode_entities(&self.input[start..end]);
        if decoded.is_empty() {
            return;
        }
        // Merge with a preceding text token so "a < b" stays one text node.
        if let Some(Token::Text(prev)) = self.out.last_mut() {
            prev.push_str(&decoded);
        } else {
            self.out.push(Token::Text(decoded));
        }
    }

    fn comment(&mut self) {
        let body_start = self.pos + COMMENT_START.len();
        match self.input[body_start..].find(COMMENT_END) {
            Some(rel) => {
                let body = &self.input[body_start..body_start + rel];
                self.out.push(Token::Comment(body.to_string()));
                self.pos = body_start + rel + COMMENT_END.len();
            }
            None => {
                self.out
                    .push(Token::Comment(self.input[body_start..].to_string()));
                self.pos = self.bytes.len();
            }
        }
    }

    fn doctype(&mut self) {
        let body_start = self.pos + 2;
        match memchr(b'>', &self.bytes[body_start..]) {
            Some(rel) => {
                let body = self.input[body_start..body_start + rel].trim();
                self.out.push(Token::Doctype(body.to_string()));
                self.pos = body_start + rel + 1;
            }
            None => self.pos = self.bytes.len(),
        }
    }

    fn read_name(&mut self) -> Option<AtomId> {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        Some(self.atoms.intern_ascii_lowercase(&self.input[start..self.pos]))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn skip_past_gt(&mut self) {
        match memchr(b'>', &self.bytes[self.pos..]) {
            Some(rel) => self.pos += rel + 1,
            None => self.pos = self.bytes.len(),
        }
    }

    fn end_tag(&mut self) {
        self.pos += 2;
        let name = self.read_name();
        self.skip_past_gt();
        if let Some(name) = name {
            self.out.push(Token::EndTag(name));
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let Some(name) = self.read_name() else {
            return;
        };
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let Some(&b) = self.bytes.get(self.pos) else {
                break;
            };
            match b {
                b'>' => {
                    self.pos += 1;
                    break;
                }
                b'/' => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self_closing = true;
                        self.pos += 1;
                        break;
                    }
                }
                _ => match self.read_name() {
                    Some(attribute) => {
                        let value = self.attribute_value();
                        // First occurrence wins, as in browsers.
                        if !attributes.iter().any(|(a, _)| *a == attribute) {
                            attributes.push((attribute, value));
                        }
                    }
                    None => self.pos += 1,
                },
            }
        }

        let tag = self.atoms.resolve(name).to_string();
        if is_void_element(&tag) {
            self_closing = true;
        }
        self.out.push(Token::StartTag {
            name,
            attributes,
            self_closing,
        });

        if is_rawtext_element(&tag) && !self_closing {
            self.rawtext(name, &tag);
        }
    }

    fn attribute_value(&mut self) -> Option<String> {
        let save = self.pos;
        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'=') {
            self.pos = save;
            return None;
        }
        self.pos += 1;
        self.skip_whitespace();
        match self.bytes.get(self.pos) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let start = self.pos + 1;
                let end = memchr(quote, &self.bytes[start..])
                    .map(|rel| start + rel)
                    .unwrap_or(self.bytes.len());
                let raw = &self.input[start..end];
                self.pos = (end + 1).min(self.bytes.len());
                Some(decode_entities(raw))
            }
            _ => {
                let start = self.pos;
                while self.pos < self.bytes.len() {
                    let b = self.bytes[self.pos];
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    if b == b'/' && self.bytes.get(self.pos + 1) == Some(&b'>') {
                        break;
                    }
                    self.pos += 1;
                }
                Some(decode_entities(&self.input[start..self.pos]))
            }
        }
    }

    fn rawtext(&mut self, name: AtomId, tag: &str) {
        let start = self.pos;
        let (body_end, resume) = find_close_tag(&self.bytes[start..], tag.as_bytes())
            .map(|(s, e)| (start + s, start + e))
            .unwrap_or((self.bytes.len(), self.bytes.len()));
        if body_end > start {
            self.out
                .push(Token::Text(self.input[start..body_end].to_string()));
        }
        self.out.push(Token::EndTag(name));
        self.pos = resume;
    }
}

// Finds `</name` followed by optional ASCII whitespace and `>`, case-insensitively.
fn find_close_tag(hay: &[u8], name: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while let Some(rel) = memchr(b'<', &hay[i..]) {
        let at = i + rel;
        let name_start = at + 2;
        let name_end = name_start + name.len();
        if hay.get(at + 1) == Some(&b'/')
            && hay.len() >= name_end
            && hay[name_start..name_end].eq_ignore_ascii_case(name)
        {
            let mut k = name_end;
            while k < hay.len() && hay[k].is_ascii_whitespace() {
                k += 1;
            }
            if hay.get(k) == Some(&b'>') {
                return Some((at, k + 1));
            }
        }
        i = at + 1;
    }
    None
}
