use crate::command::{BlockKind, Command};
use crate::document::{Alignment, Document, ElementKind, HeadingLevel, Mark, Marks, Selection};
use crate::inline::InlineRuns;

/// Block type reported for the anchor's text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBlock {
    Paragraph,
    Heading(HeadingLevel),
    Quote,
    Code,
    BulletList,
    NumberedList,
}

impl ActiveBlock {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveBlock::Paragraph => "paragraph",
            ActiveBlock::Heading(level) => match level.get() {
                1 => "h1",
                2 => "h2",
                3 => "h3",
                4 => "h4",
                _ => "h5",
            },
            ActiveBlock::Quote => "quote",
            ActiveBlock::Code => "code",
            ActiveBlock::BulletList => "bullet",
            ActiveBlock::NumberedList => "number",
        }
    }
}

/// Button state derived from the tree and selection. Never mutates either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarState {
    pub is_bold: bool,
    pub is_italic: bool,
    pub is_underline: bool,
    pub is_strikethrough: bool,
    pub is_code: bool,
    pub is_link: bool,
    pub link_url: Option<String>,
    pub block_type: ActiveBlock,
    pub alignment: Alignment,
    pub can_undo: bool,
    pub can_redo: bool,
    /// Commands are ignored without a selection, so every button is off.
    pub has_selection: bool,
}

impl Default for ToolbarState {
    fn default() -> Self {
        Self {
            is_bold: false,
            is_italic: false,
            is_underline: false,
            is_strikethrough: false,
            is_code: false,
            is_link: false,
            link_url: None,
            block_type: ActiveBlock::Paragraph,
            alignment: Alignment::Start,
            can_undo: false,
            can_redo: false,
            has_selection: false,
        }
    }
}

impl ToolbarState {
    /// Projects `(doc, selection)`. A collapsed selection reports the pending
    /// typing marks, or those of the leaf left of the caret. A range reports a
    /// mark only when every selected character carries it.
    pub fn project(
        doc: &Document,
        selection: Option<&Selection>,
        typing_marks: Option<Marks>,
        can_undo: bool,
        can_redo: bool,
    ) -> Self {
        let mut state = Self {
            can_undo,
            can_redo,
            ..Self::default()
        };
        let Some((start, end)) = selection.and_then(|sel| doc.ordered_positions(sel)) else {
            return state;
        };
        state.has_selection = true;

        let marks = if start == end {
            let runs = block_runs(doc, &start.block);
            typing_marks.unwrap_or_else(|| runs.marks_before(start.offset))
        } else {
            let mut covered: Option<Marks> = None;
            for block in doc.text_blocks() {
                if block.path < start.block || block.path > end.block {
                    continue;
                }
                let runs = InlineRuns::from_nodes(block.el.inline_children());
                let from = if block.path == start.block { start.offset } else { 0 };
                let to = if block.path == end.block { end.offset } else { runs.len() };
                for marks in runs.marks_in(from..to) {
                    covered = Some(match covered {
                        None => marks,
                        Some(acc) => intersect(acc, marks),
                    });
                }
            }
            covered.unwrap_or_default()
        };
        state.is_bold = marks.has(Mark::Bold);
        state.is_italic = marks.has(Mark::Italic);
        state.is_underline = marks.has(Mark::Underline);
        state.is_strikethrough = marks.has(Mark::Strikethrough);
        state.is_code = marks.has(Mark::Code);

        let runs = block_runs(doc, &start.block);
        state.link_url = if start == end {
            runs.link_at(start.offset).map(str::to_owned)
        } else if start.block == end.block {
            runs.links_in(start.offset..end.offset)
                .first()
                .map(|url| (*url).to_owned())
        } else {
            None
        };
        state.is_link = state.link_url.is_some();

        if let Some(el) = doc.element(&start.block) {
            state.alignment = el.format.align;
            state.block_type = match &el.kind {
                ElementKind::Heading { level } => ActiveBlock::Heading(*level),
                ElementKind::Quote => ActiveBlock::Quote,
                ElementKind::CodeBlock => ActiveBlock::Code,
                ElementKind::ListItem => {
                    let parent = &start.block[..start.block.len().saturating_sub(1)];
                    match doc.element(parent).map(|list| &list.kind) {
                        Some(ElementKind::List { ordered: true }) => ActiveBlock::NumberedList,
                        _ => ActiveBlock::BulletList,
                    }
                }
                _ => ActiveBlock::Paragraph,
            };
        }
        state
    }

    pub fn is_active(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.is_bold,
            Mark::Italic => self.is_italic,
            Mark::Underline => self.is_underline,
            Mark::Strikethrough => self.is_strikethrough,
            Mark::Code => self.is_code,
        }
    }

    pub fn is_enabled(&self, action: &ToolbarAction) -> bool {
        if !self.has_selection {
            return false;
        }
        match action {
            ToolbarAction::Undo => self.can_undo,
            ToolbarAction::Redo => self.can_redo,
            ToolbarAction::Unlink => self.is_link,
            _ => true,
        }
    }
}

fn block_runs(doc: &Document, block: &[usize]) -> InlineRuns {
    doc.element(block)
        .map(|el| InlineRuns::from_nodes(el.inline_children()))
        .unwrap_or_default()
}

fn intersect(a: Marks, b: Marks) -> Marks {
    Mark::ALL
        .into_iter()
        .fold(Marks::default(), |acc, mark| acc.with(mark, a.has(mark) && b.has(mark)))
}

/// Memoized projection. Recomputes only when the revision, selection or
/// typing marks move.
#[derive(Debug, Default)]
pub struct Toolbar {
    key: Option<(u64, Option<Selection>, Option<Marks>, bool, bool)>,
    state: ToolbarState,
}

impl Toolbar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(
        &mut self,
        revision: u64,
        doc: &Document,
        selection: Option<&Selection>,
        typing_marks: Option<Marks>,
        can_undo: bool,
        can_redo: bool,
    ) -> &ToolbarState {
        let key = (revision, selection.cloned(), typing_marks, can_undo, can_redo);
        if self.key.as_ref() != Some(&key) {
            self.state = ToolbarState::project(doc, selection, typing_marks, can_undo, can_redo);
            self.key = Some(key);
        }
        &self.state
    }

    pub fn state(&self) -> &ToolbarState {
        &self.state
    }
}

/// A toolbar button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Mark(Mark),
    Align(Alignment),
    Heading(HeadingLevel),
    Paragraph,
    Quote,
    CodeBlock,
    BulletList,
    NumberedList,
    Indent,
    Outdent,
    Link(String),
    Unlink,
    Undo,
    Redo,
}

impl ToolbarAction {
    /// The command a press issues given the current button state. Pressing
    /// an active block button turns the block back into a paragraph.
    pub fn command(&self, state: &ToolbarState) -> Command {
        match self {
            ToolbarAction::Mark(mark) => Command::FormatText(*mark),
            ToolbarAction::Align(align) => Command::FormatBlock(*align),
            ToolbarAction::Heading(level) => {
                if state.block_type == ActiveBlock::Heading(*level) {
                    Command::SetBlockType(BlockKind::Paragraph)
                } else {
                    Command::SetHeading(*level)
                }
            }
            ToolbarAction::Paragraph => Command::SetBlockType(BlockKind::Paragraph),
            ToolbarAction::Quote => toggle_block(state, ActiveBlock::Quote, BlockKind::Quote),
            ToolbarAction::CodeBlock => toggle_block(state, ActiveBlock::Code, BlockKind::Code),
            ToolbarAction::BulletList => Command::ToggleList { ordered: false },
            ToolbarAction::NumberedList => Command::ToggleList { ordered: true },
            ToolbarAction::Indent => Command::Indent,
            ToolbarAction::Outdent => Command::Outdent,
            ToolbarAction::Link(url) => Command::InsertLink(url.clone()),
            ToolbarAction::Unlink => Command::RemoveLink,
            ToolbarAction::Undo => Command::Undo,
            ToolbarAction::Redo => Command::Redo,
        }
    }
}

fn toggle_block(state: &ToolbarState, active: ActiveBlock, kind: BlockKind) -> Command {
    if state.block_type == active {
        Command::SetBlockType(BlockKind::Paragraph)
    } else {
        Command::SetBlockType(kind)
    }
}
