use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::document::{
    BlockFormat, Document, ElementKind, ElementNode, Marks, Node, Path, TextNode,
    clamp_to_char_boundary,
};
use crate::error::DocumentError;
use crate::normalize;

pub const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;

/// Structural primitives over the tree. Paths address nodes from the root;
/// `parent` paths may be empty to address the root's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
    },
    ReplaceNode {
        path: Path,
        node: Node,
    },
    SplitText {
        path: Path,
        offset: usize,
    },
    Wrap {
        #[serde(default)]
        parent: Path,
        range: Range<usize>,
        kind: ElementKind,
    },
    Unwrap {
        path: Path,
    },
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        range: Range<usize>,
    },
    SetTextMarks {
        path: Path,
        marks: Marks,
    },
    SetBlockFormat {
        path: Path,
        format: BlockFormat,
    },
}

/// A working copy that accepts ops without normalizing between them.
/// Intermediate states may break invariants; `finish` restores and checks
/// them.
#[derive(Debug, Clone)]
pub struct Draft {
    doc: Document,
}

impl Draft {
    pub fn new(doc: &Document) -> Self {
        Self { doc: doc.clone() }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn apply(&mut self, op: Op) -> Result<(), DocumentError> {
        apply_op_to(&mut self.doc, op)
    }

    pub fn apply_all(&mut self, ops: impl IntoIterator<Item = Op>) -> Result<(), DocumentError> {
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }

    pub fn finish(mut self, max_iterations: usize) -> Result<Document, DocumentError> {
        normalize::normalize(&mut self.doc, max_iterations)?;
        normalize::validate(&self.doc)?;
        Ok(self.doc)
    }
}

impl Document {
    /// Applies `ops` atomically: either every op commits and the result is
    /// normalized and valid, or the document is left untouched.
    pub fn transact(&mut self, ops: impl IntoIterator<Item = Op>) -> Result<(), DocumentError> {
        self.transact_with(ops, DEFAULT_MAX_NORMALIZE_ITERATIONS)
    }

    pub fn transact_with(
        &mut self,
        ops: impl IntoIterator<Item = Op>,
        max_iterations: usize,
    ) -> Result<(), DocumentError> {
        let mut draft = Draft::new(self);
        draft.apply_all(ops)?;
        *self = draft.finish(max_iterations)?;
        Ok(())
    }

    pub fn insert(&mut self, at: &[usize], node: Node) -> Result<(), DocumentError> {
        self.transact([Op::InsertNode {
            path: at.to_vec(),
            node,
        }])
    }

    pub fn remove(&mut self, path: &[usize]) -> Result<(), DocumentError> {
        self.transact([Op::RemoveNode {
            path: path.to_vec(),
        }])
    }

    pub fn replace(&mut self, path: &[usize], node: Node) -> Result<(), DocumentError> {
        self.transact([Op::ReplaceNode {
            path: path.to_vec(),
            node,
        }])
    }

    /// Splits a text leaf in two. Standalone, the halves merge back during
    /// normalization; combine with other ops in one transaction.
    pub fn split_text(&mut self, path: &[usize], offset: usize) -> Result<(), DocumentError> {
        self.transact([Op::SplitText {
            path: path.to_vec(),
            offset,
        }])
    }

    pub fn wrap(
        &mut self,
        parent: &[usize],
        range: Range<usize>,
        kind: ElementKind,
    ) -> Result<(), DocumentError> {
        self.transact([Op::Wrap {
            parent: parent.to_vec(),
            range,
            kind,
        }])
    }

    pub fn unwrap(&mut self, path: &[usize]) -> Result<(), DocumentError> {
        self.transact([Op::Unwrap {
            path: path.to_vec(),
        }])
    }
}

fn split_path(path: &[usize]) -> Result<(&[usize], usize), DocumentError> {
    match path.split_last() {
        Some((&ix, parent)) => Ok((parent, ix)),
        None => Err(DocumentError::invalid(path, "the root cannot be addressed as a node")),
    }
}

fn text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, DocumentError> {
    match doc.node_mut(path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(DocumentError::invalid(path, "expected a text node")),
    }
}

pub(crate) fn apply_op_to(doc: &mut Document, op: Op) -> Result<(), DocumentError> {
    match op {
        Op::InsertNode { path, node } => {
            let (parent, ix) = split_path(&path)?;
            let children = doc.children_mut(parent)?;
            if ix > children.len() {
                return Err(DocumentError::detached(&path));
            }
            children.insert(ix, node);
        }
        Op::RemoveNode { path } => {
            let (parent, ix) = split_path(&path)?;
            let children = doc.children_mut(parent)?;
            if ix >= children.len() {
                return Err(DocumentError::detached(&path));
            }
            children.remove(ix);
        }
        Op::ReplaceNode { path, node } => {
            *doc.node_mut(&path)? = node;
        }
        Op::SplitText { path, offset } => {
            let (parent, ix) = split_path(&path)?;
            let children = doc.children_mut(parent)?;
            let Some(node) = children.get_mut(ix) else {
                return Err(DocumentError::detached(&path));
            };
            let Node::Text(t) = node else {
                return Err(DocumentError::invalid(&path, "only text nodes can be split"));
            };
            let offset = clamp_to_char_boundary(&t.text, offset);
            if offset == 0 || offset == t.text.len() {
                return Ok(());
            }
            let tail = TextNode {
                text: t.text.split_off(offset),
                marks: t.marks,
            };
            children.insert(ix + 1, Node::Text(tail));
        }
        Op::Wrap {
            parent,
            range,
            kind,
        } => {
            let children = doc.children_mut(&parent)?;
            if range.start >= range.end {
                return Err(DocumentError::invalid(&parent, "cannot wrap an empty range"));
            }
            if range.end > children.len() {
                let mut path = parent.clone();
                path.push(range.end - 1);
                return Err(DocumentError::detached(&path));
            }
            let start = range.start;
            let wrapped: Vec<Node> = children.drain(range).collect();
            children.insert(
                start,
                Node::Element(ElementNode {
                    kind,
                    format: BlockFormat::default(),
                    children: wrapped,
                }),
            );
        }
        Op::Unwrap { path } => {
            let (parent, ix) = split_path(&path)?;
            let children = doc.children_mut(parent)?;
            if ix >= children.len() {
                return Err(DocumentError::detached(&path));
            }
            let Node::Element(el) = children.remove(ix) else {
                return Err(DocumentError::invalid(&path, "text nodes cannot be unwrapped"));
            };
            for (offset, child) in el.children.into_iter().enumerate() {
                children.insert(ix + offset, child);
            }
        }
        Op::InsertText { path, offset, text } => {
            let t = text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&t.text, offset);
            t.text.insert_str(offset, &text);
        }
        Op::RemoveText { path, range } => {
            let t = text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&t.text, range.start);
            let end = clamp_to_char_boundary(&t.text, range.end);
            if start < end {
                t.text.replace_range(start..end, "");
            }
        }
        Op::SetTextMarks { path, marks } => {
            text_mut(doc, &path)?.marks = marks;
        }
        Op::SetBlockFormat { path, format } => match doc.node_mut(&path)? {
            Node::Element(el) if el.kind.is_block() => el.format = format,
            _ => return Err(DocumentError::invalid(&path, "format applies to blocks only")),
        },
    }
    Ok(())
}
