use crate::document::{Document, ElementKind, ElementNode, Node, Path, TextNode};
use crate::error::DocumentError;
use crate::ops::{Op, apply_op_to};

/// One canonicalization rule. A pass inspects the tree and returns the ops
/// that fix it, ordered so they can be applied one after another (later
/// siblings first).
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

pub const STANDARD_PASSES: &[&dyn NormalizePass] = &[
    &EnsureNonEmptyDocument,
    &RemoveEmptyLists,
    &ListItemInlineFirst,
    &RemoveEmptyLinks,
    &DropEmptyTextLeaves,
    &EnsureTextBlockHasLeaf,
    &MergeAdjacentTextLeaves,
];

/// Runs passes until none of them reports work. Each round applies the
/// first pass with pending ops and starts over.
pub fn normalize(doc: &mut Document, max_iterations: usize) -> Result<(), DocumentError> {
    for _ in 0..max_iterations {
        let pending = STANDARD_PASSES.iter().find_map(|pass| {
            let ops = pass.run(doc);
            (!ops.is_empty()).then_some((pass.id(), ops))
        });
        let Some((id, ops)) = pending else {
            return Ok(());
        };
        tracing::trace!(pass = id, ops = ops.len(), "normalize");
        for op in ops {
            apply_op_to(doc, op)?;
        }
    }
    Err(DocumentError::NormalizeDidNotConverge)
}

/// Checks every tree invariant. Called after each committed transaction.
pub fn validate(doc: &Document) -> Result<(), DocumentError> {
    if doc.children.is_empty() {
        return Err(DocumentError::invalid(&[], "the root must hold at least one block"));
    }
    for (ix, node) in doc.children.iter().enumerate() {
        let path = vec![ix];
        match node {
            Node::Element(el) if el.kind.allows_root() => validate_element(el, &path)?,
            Node::Element(el) => {
                return Err(DocumentError::invalid(
                    &path,
                    format!("{} cannot be a top-level block", el.kind.name()),
                ));
            }
            Node::Text(_) => {
                return Err(DocumentError::invalid(&path, "text must live inside a block"));
            }
        }
    }
    Ok(())
}

fn validate_element(el: &ElementNode, path: &Path) -> Result<(), DocumentError> {
    if matches!(el.kind, ElementKind::List { .. }) && el.children.is_empty() {
        return Err(DocumentError::invalid(path, "lists need at least one item"));
    }
    if el.kind.is_text_block() && el.inline_children().is_empty() {
        return Err(DocumentError::invalid(path, "text blocks need a text leaf"));
    }

    let mut seen_list = false;
    let mut prev_text: Option<&TextNode> = None;
    for (ix, child) in el.children.iter().enumerate() {
        let mut child_path = path.clone();
        child_path.push(ix);
        if !el.kind.allows_child(child) {
            let child_name = child.as_element().map_or("text", |c| c.kind.name());
            return Err(DocumentError::invalid(
                &child_path,
                format!("{} cannot contain {}", el.kind.name(), child_name),
            ));
        }
        match child {
            Node::Text(t) => {
                if seen_list {
                    return Err(DocumentError::invalid(
                        &child_path,
                        "inline content must precede nested lists",
                    ));
                }
                if prev_text.is_some_and(|prev| prev.marks == t.marks) {
                    return Err(DocumentError::invalid(&child_path, "unmerged text siblings"));
                }
                prev_text = Some(t);
            }
            Node::Element(child_el) => {
                prev_text = None;
                if matches!(child_el.kind, ElementKind::List { .. }) {
                    seen_list = true;
                } else if seen_list {
                    return Err(DocumentError::invalid(
                        &child_path,
                        "inline content must precede nested lists",
                    ));
                }
                validate_element(child_el, &child_path)?;
            }
        }
    }
    Ok(())
}

/// Visits elements depth-first, later siblings first, children before their
/// parent, so ops emitted by `visit` never shift a path yet to be visited.
fn visit_reverse(
    doc: &Document,
    mut visit: impl FnMut(&ElementNode, &Path, &mut Vec<Op>),
) -> Vec<Op> {
    fn walk(
        nodes: &[Node],
        path: &mut Path,
        visit: &mut dyn FnMut(&ElementNode, &Path, &mut Vec<Op>),
        ops: &mut Vec<Op>,
    ) {
        for (ix, node) in nodes.iter().enumerate().rev() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            walk(&el.children, path, visit, ops);
            visit(el, path, ops);
            path.pop();
        }
    }

    let mut ops = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut visit, &mut ops);
    ops
}

fn child_path(parent: &Path, ix: usize) -> Path {
    let mut path = parent.clone();
    path.push(ix);
    path
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct RemoveEmptyLists;

impl NormalizePass for RemoveEmptyLists {
    fn id(&self) -> &'static str {
        "list.remove_empty"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        visit_reverse(doc, |el, path, ops| {
            if matches!(el.kind, ElementKind::List { .. }) && el.children.is_empty() {
                ops.push(Op::RemoveNode { path: path.clone() });
            }
        })
    }
}

struct ListItemInlineFirst;

impl NormalizePass for ListItemInlineFirst {
    fn id(&self) -> &'static str {
        "list.item_inline_first"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        visit_reverse(doc, |el, path, ops| {
            if el.kind != ElementKind::ListItem {
                return;
            }
            let is_list = |n: &Node| {
                matches!(n, Node::Element(child) if matches!(child.kind, ElementKind::List { .. }))
            };
            let first_list = el.children.iter().position(is_list);
            let out_of_order = first_list
                .is_some_and(|ix| el.children[ix..].iter().any(|n| !is_list(n)));
            if !out_of_order {
                return;
            }
            let (lists, inline): (Vec<Node>, Vec<Node>) =
                el.children.iter().cloned().partition(|n| is_list(n));
            let mut next = el.clone();
            next.children = inline.into_iter().chain(lists).collect();
            ops.push(Op::ReplaceNode {
                path: path.clone(),
                node: Node::Element(next),
            });
        })
    }
}

struct RemoveEmptyLinks;

impl NormalizePass for RemoveEmptyLinks {
    fn id(&self) -> &'static str {
        "link.remove_empty"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        visit_reverse(doc, |el, path, ops| {
            if el.kind.is_inline() && el.children.iter().all(|n| n.text_content().is_empty()) {
                ops.push(Op::RemoveNode { path: path.clone() });
            }
        })
    }
}

struct DropEmptyTextLeaves;

impl NormalizePass for DropEmptyTextLeaves {
    fn id(&self) -> &'static str {
        "core.drop_empty_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        visit_reverse(doc, |el, path, ops| {
            let inline = if el.kind.is_text_block() {
                el.inline_children()
            } else if el.kind.is_inline() {
                el.children.as_slice()
            } else {
                return;
            };
            if inline.len() < 2 {
                return;
            }
            let empty: Vec<usize> = inline
                .iter()
                .enumerate()
                .filter(|(_, n)| matches!(n, Node::Text(t) if t.text.is_empty()))
                .map(|(ix, _)| ix)
                .collect();
            // Keep one leaf when every inline child is empty text.
            let keep_one = empty.len() == inline.len();
            for &ix in empty.iter().rev().skip(usize::from(keep_one)) {
                ops.push(Op::RemoveNode {
                    path: child_path(path, ix),
                });
            }
        })
    }
}

struct EnsureTextBlockHasLeaf;

impl NormalizePass for EnsureTextBlockHasLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_leaf"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        visit_reverse(doc, |el, path, ops| {
            if el.kind.is_text_block() && el.inline_children().is_empty() {
                ops.push(Op::InsertNode {
                    path: child_path(path, 0),
                    node: Node::text(""),
                });
            }
        })
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        visit_reverse(doc, |el, path, ops| {
            if el.children.len() < 2 {
                return;
            }
            let mut ix = el.children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &el.children[ix] else {
                    continue;
                };

                let mut start = ix;
                while start > 0 {
                    let Some(Node::Text(left)) = el.children.get(start - 1) else {
                        break;
                    };
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }

                if start == ix {
                    continue;
                }

                let Some(Node::Text(first)) = el.children.get(start) else {
                    continue;
                };
                let appended: String = el.children[start + 1..=ix]
                    .iter()
                    .filter_map(Node::as_text)
                    .map(|t| t.text.as_str())
                    .collect();

                if !appended.is_empty() {
                    ops.push(Op::InsertText {
                        path: child_path(path, start),
                        offset: first.text.len(),
                        text: appended,
                    });
                }
                for remove_ix in (start + 1..=ix).rev() {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, remove_ix),
                    });
                }

                ix = start;
            }
        })
    }
}
