//! Rich-text document model.
//!
//! A document is a flat sequence of atoms: characters, paragraph breaks and
//! parameter tags. Every atom occupies exactly one position, so a tag is a
//! single atomic unit that the cursor can step over but never into.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Placeholder used for a tag when a document is read as text.
pub const LEAF_PLACEHOLDER: char = '\u{fffc}';

/// An inline parameter tag: the parameter's key and its value at insertion
/// time (or at the last resync).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterTag {
    pub key: String,
    pub value: String,
}

impl ParameterTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Visible text of the tag.
    pub fn label(&self) -> String {
        format!("\"{}\":\"{}\"", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Char(char),
    Break,
    Tag(ParameterTag),
}

/// A run of inline content, as used for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Tag(ParameterTag),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    atoms: Vec<Atom>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    /// Number of positions in the document.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    /// Insert text at `pos`. Newlines become paragraph breaks.
    /// Returns the number of positions inserted.
    pub fn insert_text(&mut self, pos: usize, text: &str) -> usize {
        let pos = pos.min(self.atoms.len());
        let atoms: Vec<Atom> = text
            .chars()
            .filter(|c| *c != '\r')
            .map(|c| if c == '\n' { Atom::Break } else { Atom::Char(c) })
            .collect();
        let inserted = atoms.len();
        self.atoms.splice(pos..pos, atoms);
        inserted
    }

    pub fn insert_atom(&mut self, pos: usize, atom: Atom) {
        let pos = pos.min(self.atoms.len());
        self.atoms.insert(pos, atom);
    }

    pub fn delete_range(&mut self, range: Range<usize>) {
        let end = range.end.min(self.atoms.len());
        let start = range.start.min(end);
        self.atoms.drain(start..end);
    }

    /// Replace a range with a single tag node.
    pub fn replace_range_with_tag(&mut self, range: Range<usize>, tag: ParameterTag) {
        let end = range.end.min(self.atoms.len());
        let start = range.start.min(end);
        self.atoms.splice(start..end, [Atom::Tag(tag)]);
    }

    /// Position where the text block containing `pos` starts.
    pub fn block_start(&self, pos: usize) -> usize {
        let pos = pos.min(self.atoms.len());
        self.atoms[..pos]
            .iter()
            .rposition(|a| matches!(a, Atom::Break))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Text of the current block between `from` and `to`, tags read as
    /// [`LEAF_PLACEHOLDER`].
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let to = to.min(self.atoms.len());
        let from = from.min(to);
        self.atoms[from..to]
            .iter()
            .map(|a| match a {
                Atom::Char(c) => *c,
                Atom::Break => '\n',
                Atom::Tag(_) => LEAF_PLACEHOLDER,
            })
            .collect()
    }

    /// All tags with their positions, in document order.
    pub fn tags(&self) -> impl Iterator<Item = (usize, &ParameterTag)> {
        self.atoms.iter().enumerate().filter_map(|(pos, a)| match a {
            Atom::Tag(tag) => Some((pos, tag)),
            _ => None,
        })
    }

    /// Update the value of the tag at `pos`. Returns false if there is no
    /// tag there.
    pub fn set_tag_value(&mut self, pos: usize, value: &str) -> bool {
        match self.atoms.get_mut(pos) {
            Some(Atom::Tag(tag)) => {
                tag.value = value.to_string();
                true
            }
            _ => false,
        }
    }

    /// Paragraphs as runs of inline content.
    pub fn paragraphs(&self) -> Vec<Vec<Inline>> {
        let mut paragraphs = Vec::new();
        let mut current = Vec::new();
        let mut text = String::new();

        for atom in &self.atoms {
            match atom {
                Atom::Char(c) => text.push(*c),
                Atom::Tag(tag) => {
                    if !text.is_empty() {
                        current.push(Inline::Text(std::mem::take(&mut text)));
                    }
                    current.push(Inline::Tag(tag.clone()));
                }
                Atom::Break => {
                    if !text.is_empty() {
                        current.push(Inline::Text(std::mem::take(&mut text)));
                    }
                    paragraphs.push(std::mem::take(&mut current));
                }
            }
        }
        if !text.is_empty() {
            current.push(Inline::Text(text));
        }
        paragraphs.push(current);
        paragraphs
    }

    /// Plain-text rendition: paragraphs separated by newlines, tags shown
    /// with their label.
    pub fn plain_text(&self) -> String {
        self.paragraphs()
            .iter()
            .map(|inlines| {
                inlines
                    .iter()
                    .map(|inline| match inline {
                        Inline::Text(text) => text.clone(),
                        Inline::Tag(tag) => tag.label(),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
