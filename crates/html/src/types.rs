use std::collections::HashMap;
use std::fmt;

/// Stable identifier of a node inside one [`crate::Dom`].
///
/// Keys are generated by the owning `Dom` when a node is created, cloned or
/// imported. A slot freed by `remove` may be handed out again, but under a
/// newer generation, so a key to a removed node never aliases a live one.
/// `NodeKey::INVALID` is never handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    slot: u32,
    generation: u32,
}

impl NodeKey {
    pub const INVALID: NodeKey = NodeKey::new(0, 0);

    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.slot)
        } else {
            write!(f, "#{}.{}", self.slot, self.generation)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtomId(u32);

/// Interned, ASCII-lowercased tag and attribute names.
#[derive(Debug, Default)]
pub struct AtomTable {
    names: Vec<String>,
    index: HashMap<String, AtomId>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_ascii_lowercase(&mut self, name: &str) -> AtomId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let lowered = name.to_ascii_lowercase();
        if let Some(id) = self.index.get(&lowered) {
            return *id;
        }
        let id = AtomId(self.names.len() as u32);
        self.names.push(lowered.clone());
        self.index.insert(lowered, id);
        id
    }

    pub fn resolve(&self, id: AtomId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: AtomId,
        attributes: Vec<(AtomId, Option<String>)>,
        self_closing: bool,
    },
    EndTag(AtomId),
    Comment(String),
    Text(String),
}

#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
    atoms: AtomTable,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>, atoms: AtomTable) -> Self {
        Self { tokens, atoms }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}
