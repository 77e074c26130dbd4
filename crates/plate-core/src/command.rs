//! The closed command set and the rules that turn a command into a new
//! editor state.
//!
//! Every rule reads the current snapshot, stages ops on a [`Draft`] and
//! commits through normalization. Selections are carried as
//! [`TextPosition`]s, which survive leaf splits and merges.

use std::ops::Range;

use crate::document::{
    Alignment, BlockFormat, Document, ElementKind, ElementNode, HeadingLevel, MAX_INDENT_LEVEL,
    Mark, Marks, Node, Path, Point, Selection, TextPosition,
};
use crate::error::DocumentError;
use crate::history::{EditKind, Snapshot};
use crate::inline::InlineRuns;
use crate::ops::{Draft, Op};
use crate::shortcut::{ShortcutMatch, ShortcutTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Toggles a mark over the selection, or the typing marks at a caret.
    FormatText(Mark),
    FormatBlock(Alignment),
    SetHeading(HeadingLevel),
    SetBlockType(BlockKind),
    ToggleList { ordered: bool },
    Indent,
    Outdent,
    /// `Some(url)` links the selection, `None` removes links.
    ToggleLink(Option<String>),
    InsertLink(String),
    RemoveLink,
    InsertText(String),
    DeleteBackward,
    DeleteForward,
    InsertParagraph,
    InsertLineBreak,
    Undo,
    Redo,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::FormatText(_) => "format_text",
            Command::FormatBlock(_) => "format_block",
            Command::SetHeading(_) => "set_heading",
            Command::SetBlockType(_) => "set_block_type",
            Command::ToggleList { .. } => "toggle_list",
            Command::Indent => "indent",
            Command::Outdent => "outdent",
            Command::ToggleLink(_) => "toggle_link",
            Command::InsertLink(_) => "insert_link",
            Command::RemoveLink => "remove_link",
            Command::InsertText(_) => "insert_text",
            Command::DeleteBackward => "delete_backward",
            Command::DeleteForward => "delete_forward",
            Command::InsertParagraph => "insert_paragraph",
            Command::InsertLineBreak => "insert_line_break",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }
}

/// Text block kinds a block can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(HeadingLevel),
    Quote,
    Code,
}

impl BlockKind {
    pub fn element_kind(self) -> ElementKind {
        match self {
            BlockKind::Paragraph => ElementKind::Paragraph,
            BlockKind::Heading(level) => ElementKind::Heading { level },
            BlockKind::Quote => ElementKind::Quote,
            BlockKind::Code => ElementKind::CodeBlock,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing to do. Also returned for edits that leave the tree as it was.
    Unchanged,
    /// Only the pending typing marks changed.
    TypingMarks(Marks),
    Edit { snapshot: Snapshot, kind: EditKind },
}

/// Applies one command to `state`. `Undo` and `Redo` need the history and
/// are resolved by the editor; here they are no-ops.
pub fn apply(
    state: &Snapshot,
    typing_marks: Option<Marks>,
    command: &Command,
    max_iterations: usize,
) -> Result<Transition, DocumentError> {
    let Some(ctx) = Ctx::resolve(state, typing_marks) else {
        return Ok(Transition::Unchanged);
    };
    let staged = match command {
        Command::FormatText(mark) => return ctx.format_text(*mark, max_iterations),
        Command::FormatBlock(align) => ctx.format_block(*align)?,
        Command::SetHeading(level) => ctx.set_block_type(BlockKind::Heading(*level))?,
        Command::SetBlockType(kind) => ctx.set_block_type(*kind)?,
        Command::ToggleList { ordered } => ctx.toggle_list(*ordered)?,
        Command::Indent => ctx.indent(true)?,
        Command::Outdent => ctx.indent(false)?,
        Command::ToggleLink(url) => match url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => ctx.set_link(url, false)?,
            None => ctx.remove_link()?,
        },
        Command::InsertLink(url) => match Some(url.trim()).filter(|u| !u.is_empty()) {
            Some(url) => ctx.set_link(url, true)?,
            None => None,
        },
        Command::RemoveLink => ctx.remove_link()?,
        Command::InsertText(text) => ctx.insert_text(text)?,
        Command::InsertLineBreak => ctx.insert_text("\n")?,
        Command::DeleteBackward => ctx.delete_backward()?,
        Command::DeleteForward => ctx.delete_forward()?,
        Command::InsertParagraph => ctx.insert_paragraph()?,
        Command::Undo | Command::Redo => None,
    };
    match staged {
        Some(staged) => staged.commit(&state.doc, max_iterations),
        None => Ok(Transition::Unchanged),
    }
}

/// Applies a matched markdown shortcut at the caret: the trigger text goes
/// and the paragraph becomes the target block.
pub fn apply_shortcut(
    state: &Snapshot,
    found: &ShortcutMatch,
    max_iterations: usize,
) -> Result<Transition, DocumentError> {
    let doc = &state.doc;
    let Some(caret) = doc.position_of(&state.selection.focus) else {
        return Ok(Transition::Unchanged);
    };
    let el = element(doc, &caret.block)?;
    if el.kind != ElementKind::Paragraph || caret.offset < found.trigger_len {
        return Ok(Transition::Unchanged);
    }

    let mut draft = Draft::new(doc);
    let mut runs = InlineRuns::from_nodes(el.inline_children());
    runs.delete(0..found.trigger_len);
    write_runs(&mut draft, &caret.block, runs)?;

    let block = match found.target {
        ShortcutTarget::Heading(level) => {
            set_block_kind(&mut draft, &caret.block, BlockKind::Heading(level))?
        }
        ShortcutTarget::Quote => set_block_kind(&mut draft, &caret.block, BlockKind::Quote)?,
        ShortcutTarget::CodeBlock => set_block_kind(&mut draft, &caret.block, BlockKind::Code)?,
        ShortcutTarget::BulletList => wrap_in_list(&mut draft, &caret.block, false)?,
        ShortcutTarget::NumberedList => wrap_in_list(&mut draft, &caret.block, true)?,
    };
    let at = TextPosition::new(block, caret.offset - found.trigger_len);
    Staged::collapsed(draft, at, EditKind::Discrete).commit(doc, max_iterations)
}

/// Ops staged by a rule, with where the selection lands afterwards.
struct Staged {
    draft: Draft,
    anchor: TextPosition,
    focus: TextPosition,
    kind: EditKind,
}

impl Staged {
    fn collapsed(draft: Draft, at: TextPosition, kind: EditKind) -> Self {
        Self {
            draft,
            anchor: at.clone(),
            focus: at,
            kind,
        }
    }

    fn commit(self, before: &Document, max_iterations: usize) -> Result<Transition, DocumentError> {
        let doc = self.draft.finish(max_iterations)?;
        if doc == *before {
            return Ok(Transition::Unchanged);
        }
        let selection = resolve_selection(&doc, &self.anchor, &self.focus);
        Ok(Transition::Edit {
            snapshot: Snapshot { doc, selection },
            kind: self.kind,
        })
    }
}

fn resolve_selection(doc: &Document, anchor: &TextPosition, focus: &TextPosition) -> Selection {
    if let Some(selection) = doc.selection_between(anchor, focus) {
        return selection;
    }
    doc.point_at(anchor)
        .or_else(|| doc.first_point())
        .map(Selection::collapsed)
        .unwrap_or_else(|| Selection::collapsed(Point::new(vec![0, 0], 0)))
}

struct Ctx<'a> {
    doc: &'a Document,
    anchor: TextPosition,
    focus: TextPosition,
    start: TextPosition,
    end: TextPosition,
    typing_marks: Option<Marks>,
}

impl<'a> Ctx<'a> {
    fn resolve(state: &'a Snapshot, typing_marks: Option<Marks>) -> Option<Self> {
        let doc = &state.doc;
        let selection = doc.clamp_selection(&state.selection)?;
        let anchor = doc.position_of(&selection.anchor)?;
        let focus = doc.position_of(&selection.focus)?;
        let (start, end) = if focus < anchor {
            (focus.clone(), anchor.clone())
        } else {
            (anchor.clone(), focus.clone())
        };
        Some(Self {
            doc,
            anchor,
            focus,
            start,
            end,
            typing_marks,
        })
    }

    fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    fn draft(&self) -> Draft {
        Draft::new(self.doc)
    }

    /// Keeps the selection where it was.
    fn stay(&self, draft: Draft) -> Staged {
        Staged {
            draft,
            anchor: self.anchor.clone(),
            focus: self.focus.clone(),
            kind: EditKind::Discrete,
        }
    }

    /// Keeps offsets but moves the anchor's block to `block`. A focus in
    /// another block collapses onto the anchor.
    fn moved_to(&self, draft: Draft, block: Path) -> Staged {
        let anchor = TextPosition::new(block.clone(), self.anchor.offset);
        let focus = if self.focus.block == self.anchor.block {
            TextPosition::new(block, self.focus.offset)
        } else {
            anchor.clone()
        };
        Staged {
            draft,
            anchor,
            focus,
            kind: EditKind::Discrete,
        }
    }

    fn format_text(&self, mark: Mark, max_iterations: usize) -> Result<Transition, DocumentError> {
        if self.is_collapsed() {
            let base = self
                .typing_marks
                .unwrap_or_else(|| caret_marks(self.doc, &self.start));
            return Ok(Transition::TypingMarks(base.with(mark, !base.has(mark))));
        }

        let blocks = selected_blocks(self.doc, &self.start, &self.end);
        let mut covered = Vec::new();
        for (path, range) in &blocks {
            covered.extend(runs_of(self.doc, path)?.marks_in(range.clone()));
        }
        if covered.is_empty() {
            return Ok(Transition::Unchanged);
        }
        let on = !covered.iter().all(|marks| marks.has(mark));

        let mut draft = self.draft();
        for (path, range) in blocks {
            let mut runs = runs_of(self.doc, &path)?;
            runs.map_marks(range, |marks| marks.with(mark, on));
            write_runs(&mut draft, &path, runs)?;
        }
        self.stay(draft).commit(self.doc, max_iterations)
    }

    fn format_block(&self, align: Alignment) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        for (path, _) in selected_blocks(self.doc, &self.start, &self.end) {
            let el = element(self.doc, &path)?;
            if el.format.align != align {
                draft.apply(Op::SetBlockFormat {
                    path,
                    format: BlockFormat {
                        align,
                        ..el.format
                    },
                })?;
            }
        }
        Ok(Some(self.stay(draft)))
    }

    fn set_block_type(&self, kind: BlockKind) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        let block = set_block_kind(&mut draft, &self.anchor.block, kind)?;
        Ok(Some(self.moved_to(draft, block)))
    }

    fn toggle_list(&self, ordered: bool) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        let block = &self.anchor.block;
        let el = element(self.doc, block)?;
        let moved = if el.kind == ElementKind::ListItem {
            let list_path = parent_of(block)?;
            let list = element(self.doc, list_path)?;
            match list.kind {
                ElementKind::List { ordered: current } if current == ordered => {
                    lift_to_root(&mut draft, block)?
                }
                _ => {
                    let mut next = list.clone();
                    next.kind = ElementKind::List { ordered };
                    draft.apply(Op::ReplaceNode {
                        path: list_path.to_vec(),
                        node: Node::Element(next),
                    })?;
                    block.clone()
                }
            }
        } else {
            wrap_in_list(&mut draft, block, ordered)?
        };
        Ok(Some(self.moved_to(draft, moved)))
    }

    fn indent(&self, deeper: bool) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        let anchor_el = element(self.doc, &self.anchor.block)?;
        if anchor_el.kind == ElementKind::ListItem {
            let moved = if deeper {
                nest_item(&mut draft, &self.anchor.block)?
            } else if self.anchor.block.len() > 2 {
                Some(outdent_item(&mut draft, &self.anchor.block)?)
            } else {
                None
            };
            return Ok(moved.map(|block| self.moved_to(draft, block)));
        }

        for (path, _) in selected_blocks(self.doc, &self.start, &self.end) {
            let el = element(self.doc, &path)?;
            if el.kind == ElementKind::ListItem {
                continue;
            }
            let indent = if deeper {
                (el.format.indent + 1).min(MAX_INDENT_LEVEL)
            } else {
                el.format.indent.saturating_sub(1)
            };
            if indent != el.format.indent {
                draft.apply(Op::SetBlockFormat {
                    path,
                    format: BlockFormat {
                        indent,
                        ..el.format
                    },
                })?;
            }
        }
        Ok(Some(self.stay(draft)))
    }

    /// Wraps the selection. A caret inside a link retargets it; a bare
    /// caret gets the url as new link text only when `insert_at_caret`.
    fn set_link(&self, url: &str, insert_at_caret: bool) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        if self.is_collapsed() {
            let mut runs = runs_of(self.doc, &self.start.block)?;
            if runs.set_link_url_at(self.start.offset, url) {
                write_runs(&mut draft, &self.start.block, runs)?;
                return Ok(Some(self.stay(draft)));
            }
            if !insert_at_caret {
                return Ok(None);
            }
            runs.insert_link(self.start.offset, url, url);
            write_runs(&mut draft, &self.start.block, runs)?;
            let at = TextPosition::new(self.start.block.clone(), self.start.offset + url.len());
            return Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)));
        }

        for (path, range) in selected_blocks(self.doc, &self.start, &self.end) {
            if range.is_empty() {
                continue;
            }
            let mut runs = runs_of(self.doc, &path)?;
            runs.wrap_link(range, url);
            write_runs(&mut draft, &path, runs)?;
        }
        Ok(Some(self.stay(draft)))
    }

    fn remove_link(&self) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        let mut changed = false;
        for (path, range) in selected_blocks(self.doc, &self.start, &self.end) {
            let mut runs = runs_of(self.doc, &path)?;
            if runs.unlink(range) {
                write_runs(&mut draft, &path, runs)?;
                changed = true;
            }
        }
        Ok(changed.then(|| self.stay(draft)))
    }

    fn insert_text(&self, text: &str) -> Result<Option<Staged>, DocumentError> {
        if text.is_empty() {
            return Ok(None);
        }
        let mut draft = self.draft();
        let caret = if self.is_collapsed() {
            self.start.clone()
        } else {
            delete_range(&mut draft, &self.start, &self.end)?
        };

        let mut runs = runs_of(draft.doc(), &caret.block)?;
        let marks = self
            .typing_marks
            .unwrap_or_else(|| runs.marks_before(caret.offset));
        runs.insert(caret.offset, text, marks);
        write_runs(&mut draft, &caret.block, runs)?;

        let kind = if self.is_collapsed() {
            EditKind::Typing {
                block: caret.block.clone(),
            }
        } else {
            EditKind::Discrete
        };
        let at = TextPosition::new(caret.block, caret.offset + text.len());
        Ok(Some(Staged::collapsed(draft, at, kind)))
    }

    fn delete_backward(&self) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        if !self.is_collapsed() {
            let at = delete_range(&mut draft, &self.start, &self.end)?;
            return Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)));
        }

        let pos = &self.start;
        let mut runs = runs_of(self.doc, &pos.block)?;
        if pos.offset > 0 {
            let len = runs.char_before(pos.offset);
            runs.delete(pos.offset - len..pos.offset);
            write_runs(&mut draft, &pos.block, runs)?;
            let at = TextPosition::new(pos.block.clone(), pos.offset - len);
            let kind = EditKind::Typing {
                block: pos.block.clone(),
            };
            return Ok(Some(Staged::collapsed(draft, at, kind)));
        }

        let el = element(self.doc, &pos.block)?;
        let block = if el.kind == ElementKind::ListItem {
            if pos.block.len() > 2 {
                outdent_item(&mut draft, &pos.block)?
            } else {
                lift_top_level(&mut draft, &pos.block)?
            }
        } else if el.format.indent > 0 {
            draft.apply(Op::SetBlockFormat {
                path: pos.block.clone(),
                format: BlockFormat {
                    indent: el.format.indent - 1,
                    ..el.format
                },
            })?;
            pos.block.clone()
        } else if let Some(prev) = neighbour_block(self.doc, &pos.block, -1) {
            let prev_len = runs_of(self.doc, &prev)?.len();
            let prev_end = TextPosition::new(prev, prev_len);
            let at = delete_range(&mut draft, &prev_end, pos)?;
            return Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)));
        } else if el.kind != ElementKind::Paragraph {
            set_block_kind(&mut draft, &pos.block, BlockKind::Paragraph)?
        } else {
            return Ok(None);
        };
        let at = TextPosition::new(block, 0);
        Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)))
    }

    fn delete_forward(&self) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        if !self.is_collapsed() {
            let at = delete_range(&mut draft, &self.start, &self.end)?;
            return Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)));
        }

        let pos = &self.start;
        let mut runs = runs_of(self.doc, &pos.block)?;
        if pos.offset < runs.len() {
            let len = runs.char_after(pos.offset);
            runs.delete(pos.offset..pos.offset + len);
            write_runs(&mut draft, &pos.block, runs)?;
            let kind = EditKind::Typing {
                block: pos.block.clone(),
            };
            return Ok(Some(Staged::collapsed(draft, pos.clone(), kind)));
        }

        let Some(next) = neighbour_block(self.doc, &pos.block, 1) else {
            return Ok(None);
        };
        let at = delete_range(&mut draft, pos, &TextPosition::new(next, 0))?;
        Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)))
    }

    fn insert_paragraph(&self) -> Result<Option<Staged>, DocumentError> {
        let mut draft = self.draft();
        let caret = if self.is_collapsed() {
            self.start.clone()
        } else {
            delete_range(&mut draft, &self.start, &self.end)?
        };
        let el = element(draft.doc(), &caret.block)?.clone();
        let mut head = InlineRuns::from_nodes(el.inline_children());

        if el.kind == ElementKind::CodeBlock {
            head.insert(caret.offset, "\n", Marks::default());
            write_runs(&mut draft, &caret.block, head)?;
            let at = TextPosition::new(caret.block, caret.offset + 1);
            return Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)));
        }

        if el.kind == ElementKind::ListItem && head.is_empty() {
            let block = if caret.block.len() > 2 {
                outdent_item(&mut draft, &caret.block)?
            } else {
                lift_top_level(&mut draft, &caret.block)?
            };
            let at = TextPosition::new(block, 0);
            return Ok(Some(Staged::collapsed(draft, at, EditKind::Discrete)));
        }

        let tail = head.split_off(caret.offset);
        let kind = match &el.kind {
            ElementKind::Heading { .. } | ElementKind::Quote if tail.is_empty() => {
                ElementKind::Paragraph
            }
            kind => kind.clone(),
        };
        let mut tail_children = tail.into_nodes();
        tail_children.extend(el.nested_lists().iter().cloned());

        let head_el = ElementNode {
            kind: el.kind.clone(),
            format: el.format,
            children: head.into_nodes(),
        };
        let tail_el = ElementNode {
            kind,
            format: el.format,
            children: tail_children,
        };
        let next = sibling(&caret.block, 1)?;
        draft.apply(Op::ReplaceNode {
            path: caret.block.clone(),
            node: Node::Element(head_el),
        })?;
        draft.apply(Op::InsertNode {
            path: next.clone(),
            node: Node::Element(tail_el),
        })?;
        Ok(Some(Staged::collapsed(
            draft,
            TextPosition::new(next, 0),
            EditKind::Discrete,
        )))
    }
}

fn element<'d>(doc: &'d Document, path: &[usize]) -> Result<&'d ElementNode, DocumentError> {
    doc.element(path).ok_or_else(|| DocumentError::detached(path))
}

fn parent_of(path: &[usize]) -> Result<&[usize], DocumentError> {
    path.split_last()
        .map(|(_, parent)| parent)
        .ok_or_else(|| DocumentError::invalid(path, "the root has no parent"))
}

fn sibling(path: &[usize], delta: usize) -> Result<Path, DocumentError> {
    let mut next = path.to_vec();
    match next.last_mut() {
        Some(last) => *last += delta,
        None => return Err(DocumentError::invalid(path, "the root has no siblings")),
    }
    Ok(next)
}

fn child(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

fn runs_of(doc: &Document, block: &[usize]) -> Result<InlineRuns, DocumentError> {
    Ok(InlineRuns::from_nodes(element(doc, block)?.inline_children()))
}

/// Replaces a text block's inline content, keeping its nested lists.
fn write_runs(draft: &mut Draft, block: &[usize], runs: InlineRuns) -> Result<(), DocumentError> {
    let el = element(draft.doc(), block)?;
    let mut children = runs.into_nodes();
    children.extend(el.nested_lists().iter().cloned());
    let next = ElementNode {
        kind: el.kind.clone(),
        format: el.format,
        children,
    };
    draft.apply(Op::ReplaceNode {
        path: block.to_vec(),
        node: Node::Element(next),
    })
}

fn caret_marks(doc: &Document, pos: &TextPosition) -> Marks {
    runs_of(doc, &pos.block)
        .map(|runs| runs.marks_before(pos.offset))
        .unwrap_or_default()
}

/// Text blocks between `start` and `end` in document order, each with the
/// byte range of it that the selection covers.
fn selected_blocks(
    doc: &Document,
    start: &TextPosition,
    end: &TextPosition,
) -> Vec<(Path, Range<usize>)> {
    doc.text_blocks()
        .into_iter()
        .filter(|b| b.path >= start.block && b.path <= end.block)
        .map(|b| {
            let len = InlineRuns::from_nodes(b.el.inline_children()).len();
            let from = if b.path == start.block { start.offset.min(len) } else { 0 };
            let to = if b.path == end.block { end.offset.min(len) } else { len };
            (b.path, from..to.max(from))
        })
        .collect()
}

/// The text block before (`-1`) or after (`1`) `block` in document order.
fn neighbour_block(doc: &Document, block: &[usize], step: isize) -> Option<Path> {
    let blocks = doc.text_blocks();
    let ix = blocks.iter().position(|b| b.path == block)?;
    let target = ix.checked_add_signed(step)?;
    blocks.get(target).map(|b| b.path.clone())
}

/// Deletes from `start` to `end`, joining the two end blocks. Blocks in
/// between are removed; items nested below a removed list item move up
/// into its place.
fn delete_range(
    draft: &mut Draft,
    start: &TextPosition,
    end: &TextPosition,
) -> Result<TextPosition, DocumentError> {
    if start.block == end.block {
        let mut runs = runs_of(draft.doc(), &start.block)?;
        runs.delete(start.offset..end.offset);
        write_runs(draft, &start.block, runs)?;
        return Ok(start.clone());
    }

    let doc = draft.doc().clone();
    let mut head = runs_of(&doc, &start.block)?;
    head.split_off(start.offset);
    let tail = runs_of(&doc, &end.block)?.split_off(end.offset);

    let doomed: Vec<Path> = doc
        .text_blocks()
        .into_iter()
        .map(|b| b.path)
        .filter(|p| *p > start.block && *p <= end.block)
        .collect();
    for path in doomed.iter().rev() {
        remove_text_block(draft, path)?;
    }

    head.append(tail);
    write_runs(draft, &start.block, head)?;
    Ok(start.clone())
}

fn remove_text_block(draft: &mut Draft, path: &[usize]) -> Result<(), DocumentError> {
    let el = element(draft.doc(), path)?;
    let promoted: Vec<Node> = el
        .nested_lists()
        .iter()
        .filter_map(Node::as_element)
        .flat_map(|list| list.children.iter().cloned())
        .collect();
    draft.apply(Op::RemoveNode {
        path: path.to_vec(),
    })?;
    for (k, node) in promoted.into_iter().enumerate() {
        draft.apply(Op::InsertNode {
            path: sibling(path, k)?,
            node,
        })?;
    }
    Ok(())
}

/// Switches a text block's kind. List items leave their list first.
fn set_block_kind(
    draft: &mut Draft,
    block: &[usize],
    kind: BlockKind,
) -> Result<Path, DocumentError> {
    let block = if element(draft.doc(), block)?.kind == ElementKind::ListItem {
        lift_to_root(draft, block)?
    } else {
        block.to_vec()
    };
    let el = element(draft.doc(), &block)?;
    let target = kind.element_kind();
    if el.kind != target {
        let mut next = el.clone();
        next.kind = target;
        draft.apply(Op::ReplaceNode {
            path: block.clone(),
            node: Node::Element(next),
        })?;
    }
    Ok(block)
}

/// Turns a top-level text block into a list item, joining a neighbouring
/// list of the same kind.
fn wrap_in_list(draft: &mut Draft, block: &[usize], ordered: bool) -> Result<Path, DocumentError> {
    let &[r] = block else {
        return Err(DocumentError::invalid(block, "only top-level blocks become lists"));
    };
    let el = element(draft.doc(), block)?;
    let item = ElementNode {
        kind: ElementKind::ListItem,
        format: el.format,
        children: el.inline_children().to_vec(),
    };
    draft.apply(Op::ReplaceNode {
        path: block.to_vec(),
        node: Node::Element(item),
    })?;
    draft.apply(Op::Wrap {
        parent: Vec::new(),
        range: r..r + 1,
        kind: ElementKind::List { ordered },
    })?;

    merge_root_lists(draft, r + 1)?;
    Ok(match merge_root_lists(draft, r)? {
        Some(prev_len) => vec![r - 1, prev_len],
        None => vec![r, 0],
    })
}

/// Joins root lists `ix - 1` and `ix` when they are the same kind.
/// Returns the item count of the first list before the join.
fn merge_root_lists(draft: &mut Draft, ix: usize) -> Result<Option<usize>, DocumentError> {
    if ix == 0 {
        return Ok(None);
    }
    let doc = draft.doc();
    let (Some(prev), Some(next)) = (doc.element(&[ix - 1]), doc.element(&[ix])) else {
        return Ok(None);
    };
    let same_kind = matches!(
        (&prev.kind, &next.kind),
        (ElementKind::List { ordered: a }, ElementKind::List { ordered: b }) if a == b
    );
    if !same_kind {
        return Ok(None);
    }
    let prev_len = prev.children.len();
    let mut joined = prev.clone();
    joined.children.extend(next.children.iter().cloned());
    draft.apply(Op::ReplaceNode {
        path: vec![ix - 1],
        node: Node::Element(joined),
    })?;
    draft.apply(Op::RemoveNode { path: vec![ix] })?;
    Ok(Some(prev_len))
}

fn list_ordered(el: &ElementNode, path: &[usize]) -> Result<bool, DocumentError> {
    match el.kind {
        ElementKind::List { ordered } => Ok(ordered),
        _ => Err(DocumentError::invalid(path, "expected a list")),
    }
}

fn push_into_trailing_list(
    el: &mut ElementNode,
    ordered: bool,
    items: Vec<Node>,
) -> (usize, usize) {
    if let Some(last_ix) = el.children.len().checked_sub(1) {
        if let Node::Element(last) = &mut el.children[last_ix] {
            if last.kind == (ElementKind::List { ordered }) {
                last.children.extend(items);
                return (last_ix, last.children.len().saturating_sub(1));
            }
        }
    }
    let count = items.len();
    el.children.push(Node::list(ordered, items));
    (el.children.len() - 1, count.saturating_sub(1))
}

/// Nests a list item under its previous sibling. The first item of a list
/// has nowhere to go.
fn nest_item(draft: &mut Draft, item: &[usize]) -> Result<Option<Path>, DocumentError> {
    let (&ix, list_path) = item
        .split_last()
        .ok_or_else(|| DocumentError::invalid(item, "expected a list item"))?;
    if ix == 0 {
        return Ok(None);
    }
    let doc = draft.doc();
    let ordered = list_ordered(element(doc, list_path)?, list_path)?;
    let prev_path = child(list_path, ix - 1);
    let mut prev = element(doc, &prev_path)?.clone();
    let moved = element(doc, item)?.clone();
    let (list_ix, item_ix) =
        push_into_trailing_list(&mut prev, ordered, vec![Node::Element(moved)]);

    draft.apply(Op::RemoveNode {
        path: item.to_vec(),
    })?;
    draft.apply(Op::ReplaceNode {
        path: prev_path.clone(),
        node: Node::Element(prev),
    })?;
    let mut nested = prev_path;
    nested.extend([list_ix, item_ix]);
    Ok(Some(nested))
}

/// Moves a nested list item up one level, right after its parent item.
/// Siblings that followed it become its children.
fn outdent_item(draft: &mut Draft, item: &[usize]) -> Result<Path, DocumentError> {
    if item.len() < 4 {
        return Err(DocumentError::invalid(item, "expected a nested list item"));
    }
    let ix = item[item.len() - 1];
    let list_path = &item[..item.len() - 1];
    let parent_item = &item[..item.len() - 2];

    let doc = draft.doc();
    let list = element(doc, list_path)?;
    let ordered = list_ordered(list, list_path)?;
    let count = list.children.len();
    let followers: Vec<Node> = list.children[ix + 1..].to_vec();
    let mut moved = element(doc, item)?.clone();
    if !followers.is_empty() {
        push_into_trailing_list(&mut moved, ordered, followers);
    }

    for remove_ix in (ix..count).rev() {
        draft.apply(Op::RemoveNode {
            path: child(list_path, remove_ix),
        })?;
    }
    let target = sibling(parent_item, 1)?;
    draft.apply(Op::InsertNode {
        path: target.clone(),
        node: Node::Element(moved),
    })?;
    Ok(target)
}

/// Takes a top-level list item out of its list as a paragraph. The list
/// splits around it; the item's own children move up into the second half.
fn lift_top_level(draft: &mut Draft, item: &[usize]) -> Result<Path, DocumentError> {
    let &[r, ix] = item else {
        return Err(DocumentError::invalid(item, "expected a top-level list item"));
    };
    let doc = draft.doc();
    let list = element(doc, &[r])?.clone();
    let ordered = list_ordered(&list, &[r])?;
    let el = element(doc, item)?.clone();

    let before: Vec<Node> = list.children[..ix].to_vec();
    let mut after: Vec<Node> = el
        .nested_lists()
        .iter()
        .filter_map(Node::as_element)
        .flat_map(|nested| nested.children.iter().cloned())
        .collect();
    after.extend(list.children[ix + 1..].iter().cloned());

    let half = |items: Vec<Node>| {
        Node::Element(ElementNode {
            kind: ElementKind::List { ordered },
            format: list.format,
            children: items,
        })
    };
    let paragraph = ElementNode {
        kind: ElementKind::Paragraph,
        format: el.format,
        children: el.inline_children().to_vec(),
    };

    draft.apply(Op::RemoveNode { path: vec![r] })?;
    let mut at = r;
    if !before.is_empty() {
        draft.apply(Op::InsertNode {
            path: vec![at],
            node: half(before),
        })?;
        at += 1;
    }
    draft.apply(Op::InsertNode {
        path: vec![at],
        node: Node::Element(paragraph),
    })?;
    if !after.is_empty() {
        draft.apply(Op::InsertNode {
            path: vec![at + 1],
            node: half(after),
        })?;
    }
    Ok(vec![at])
}

/// Outdents a list item until it leaves list structure entirely.
fn lift_to_root(draft: &mut Draft, item: &[usize]) -> Result<Path, DocumentError> {
    let mut item = item.to_vec();
    while item.len() > 2 {
        item = outdent_item(draft, &item)?;
    }
    lift_top_level(draft, &item)
}
