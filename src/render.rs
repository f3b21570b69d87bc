//! Presentation tree built from a token stream.
//!
//! Mirrors what a highlighting host renders into an editable
//! surface: plain tokens become bare text nodes, every other token
//! an element tagged with its kind. Only the text-bearing leaves
//! matter for caret math.

use crate::token::{Token, TokenKind};

/// A node of the presentation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element { kind: TokenKind, children: Vec<Self> },
}

/// Ordered presentation of a surface's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    nodes: Vec<Node>,
}

impl Presentation {
    /// A presentation with no nodes at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Unhighlighted content as a single text node.
    #[must_use]
    pub fn plain(text: &str) -> Self {
        if text.is_empty() {
            return Self::empty();
        }
        Self {
            nodes: vec![Node::Text(text.to_string())],
        }
    }

    #[must_use]
    pub fn from_tokens(tokens: &[Token]) -> Self {
        Self {
            nodes: build_nodes(tokens),
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves().iter().all(|leaf| leaf.is_empty())
    }

    /// Concatenated text of every leaf, in document order.
    #[must_use]
    pub fn text(&self) -> String {
        self.leaves().concat()
    }

    /// Length of the content in chars.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.leaves().iter().map(|leaf| leaf.chars().count()).sum()
    }

    /// Text-bearing nodes in document order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_leaves(&self.nodes, &mut out);
        out
    }

    pub(crate) fn leaves_mut(&mut self) -> Vec<&mut String> {
        let mut out = Vec::new();
        collect_leaves_mut(&mut self.nodes, &mut out);
        out
    }

    /// Append a bare text node, used when typing into an empty surface.
    pub(crate) fn push_text(&mut self, text: &str) {
        self.nodes.push(Node::Text(text.to_string()));
    }
}

fn build_nodes(tokens: &[Token]) -> Vec<Node> {
    tokens
        .iter()
        .map(|token| match token.kind {
            TokenKind::Plain => Node::Text(token.text.clone()),
            kind if token.has_children() => Node::Element {
                kind,
                children: build_nodes(&token.children),
            },
            kind => Node::Element {
                kind,
                children: vec![Node::Text(token.text.clone())],
            },
        })
        .collect()
}

fn collect_leaves<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(text),
            Node::Element { children, .. } => collect_leaves(children, out),
        }
    }
}

fn collect_leaves_mut<'a>(nodes: &'a mut [Node], out: &mut Vec<&'a mut String>) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push(text),
            Node::Element { children, .. } => collect_leaves_mut(children, out),
        }
    }
}
