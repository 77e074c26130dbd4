use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

pub type Path = Vec<usize>;

/// The root of the tree. Its children are top-level blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind,
            format: BlockFormat::default(),
            children,
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element(ElementKind::Paragraph, vec![Self::text(text)])
    }

    pub fn heading(level: HeadingLevel, text: impl Into<String>) -> Self {
        Self::element(ElementKind::Heading { level }, vec![Self::text(text)])
    }

    pub fn link(url: impl Into<String>, children: Vec<Node>) -> Self {
        Self::element(ElementKind::Link { url: url.into() }, children)
    }

    pub fn list(ordered: bool, items: Vec<Node>) -> Self {
        Self::element(ElementKind::List { ordered }, items)
    }

    pub fn list_item(children: Vec<Node>) -> Self {
        Self::element(ElementKind::ListItem, children)
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    /// Concatenated text of every leaf below this node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(&t.text),
        Node::Element(el) => {
            for child in &el.children {
                collect_text(child, out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "BlockFormat::is_plain")]
    pub format: BlockFormat,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    /// Inline children of a text block. List items keep nested lists after
    /// their inline run, so the run ends at the first nested list.
    pub fn inline_children(&self) -> &[Node] {
        let end = self
            .children
            .iter()
            .position(|n| {
                matches!(n, Node::Element(el) if matches!(el.kind, ElementKind::List { .. }))
            })
            .unwrap_or(self.children.len());
        &self.children[..end]
    }

    pub fn nested_lists(&self) -> &[Node] {
        let start = self.inline_children().len();
        &self.children[start..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Paragraph,
    Heading { level: HeadingLevel },
    Quote,
    CodeBlock,
    List { ordered: bool },
    ListItem,
    Link { url: String },
}

impl ElementKind {
    pub fn is_inline(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// Blocks whose children are (or start with) inline content.
    pub fn is_text_block(&self) -> bool {
        matches!(
            self,
            ElementKind::Paragraph
                | ElementKind::Heading { .. }
                | ElementKind::Quote
                | ElementKind::CodeBlock
                | ElementKind::ListItem
        )
    }

    pub fn allows_root(&self) -> bool {
        matches!(
            self,
            ElementKind::Paragraph
                | ElementKind::Heading { .. }
                | ElementKind::Quote
                | ElementKind::CodeBlock
                | ElementKind::List { .. }
        )
    }

    pub fn allows_child(&self, child: &Node) -> bool {
        let child_kind = match child {
            Node::Text(_) => None,
            Node::Element(el) => Some(&el.kind),
        };
        match self {
            ElementKind::Paragraph
            | ElementKind::Heading { .. }
            | ElementKind::Quote
            | ElementKind::CodeBlock => child_kind.is_none_or(ElementKind::is_inline),
            ElementKind::List { .. } => matches!(child_kind, Some(ElementKind::ListItem)),
            ElementKind::ListItem => match child_kind {
                None => true,
                Some(kind) => kind.is_inline() || matches!(kind, ElementKind::List { .. }),
            },
            ElementKind::Link { .. } => child_kind.is_none(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Heading { .. } => "heading",
            ElementKind::Quote => "quote",
            ElementKind::CodeBlock => "code_block",
            ElementKind::List { .. } => "list",
            ElementKind::ListItem => "list_item",
            ElementKind::Link { .. } => "link",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn clamped(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("heading level out of range: {value}"))
    }
}

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Natural alignment for the field's direction.
    #[default]
    Start,
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_css(self) -> Option<&'static str> {
        match self {
            Alignment::Start => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
            Alignment::Justify => Some("justify"),
        }
    }

    pub fn from_css(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            "justify" => Alignment::Justify,
            _ => Alignment::Start,
        }
    }
}

pub const MAX_INDENT_LEVEL: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockFormat {
    #[serde(default)]
    pub align: Alignment,
    #[serde(default)]
    pub indent: u8,
}

impl BlockFormat {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl Mark {
    /// Nesting order used by the serializer, outermost first.
    pub const ALL: [Mark; 5] = [
        Mark::Bold,
        Mark::Italic,
        Mark::Underline,
        Mark::Strikethrough,
        Mark::Code,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
}

impl Marks {
    pub fn has(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Strikethrough => self.strikethrough,
            Mark::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Bold => self.bold = on,
            Mark::Italic => self.italic = on,
            Mark::Underline => self.underline = on,
            Mark::Strikethrough => self.strikethrough = on,
            Mark::Code => self.code = on,
        }
    }

    pub fn with(mut self, mark: Mark, on: bool) -> Self {
        self.set(mark, on);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Anchor/focus pair. Both points address `Text` leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// A caret location expressed as a byte offset into a text block's
/// flattened inline text. Stable across leaf splits and merges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPosition {
    pub block: Path,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(block: Path, offset: usize) -> Self {
        Self { block, offset }
    }
}

pub struct TextBlockRef<'a> {
    pub path: Path,
    pub el: &'a ElementNode,
}

/// A text leaf inside a text block, addressed relative to the block.
#[derive(Debug, Clone)]
pub(crate) struct InlineLeaf<'a> {
    pub rel_path: Vec<usize>,
    pub text: &'a TextNode,
    pub start: usize,
    pub in_link: bool,
}

impl InlineLeaf<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.text.len()
    }
}

pub(crate) fn inline_leaves(inline: &[Node]) -> Vec<InlineLeaf<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for (ix, node) in inline.iter().enumerate() {
        match node {
            Node::Text(t) => {
                out.push(InlineLeaf {
                    rel_path: vec![ix],
                    text: t,
                    start: cursor,
                    in_link: false,
                });
                cursor += t.text.len();
            }
            Node::Element(el) => {
                for (jx, child) in el.children.iter().enumerate() {
                    if let Node::Text(t) = child {
                        out.push(InlineLeaf {
                            rel_path: vec![ix, jx],
                            text: t,
                            start: cursor,
                            in_link: true,
                        });
                        cursor += t.text.len();
                    }
                }
            }
        }
    }
    out
}

pub(crate) fn inline_text(inline: &[Node]) -> String {
    let mut out = String::new();
    for node in inline {
        collect_text(node, &mut out);
    }
    out
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

impl Document {
    /// A fresh document: one empty paragraph.
    pub fn new() -> Self {
        Self {
            children: vec![Node::paragraph("")],
        }
    }

    pub fn from_blocks(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// True for the canonical empty document.
    pub fn is_empty(&self) -> bool {
        match self.children.as_slice() {
            [Node::Element(el)] => {
                el.kind == ElementKind::Paragraph
                    && el.children.iter().all(|n| n.text_content().is_empty())
            }
            [] => true,
            _ => false,
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn children(&self, parent: &[usize]) -> Option<&[Node]> {
        if parent.is_empty() {
            return Some(&self.children);
        }
        self.element(parent).map(|el| el.children.as_slice())
    }

    pub(crate) fn children_mut(
        &mut self,
        parent: &[usize],
    ) -> Result<&mut Vec<Node>, DocumentError> {
        fn walk<'a>(
            children: &'a mut Vec<Node>,
            rest: &[usize],
            full: &[usize],
        ) -> Result<&'a mut Vec<Node>, DocumentError> {
            let Some((&first, rest)) = rest.split_first() else {
                return Ok(children);
            };
            match children.get_mut(first) {
                Some(Node::Element(el)) => walk(&mut el.children, rest, full),
                Some(Node::Text(_)) => Err(DocumentError::invalid(full, "text nodes are leaves")),
                None => Err(DocumentError::detached(full)),
            }
        }
        walk(&mut self.children, parent, parent)
    }

    pub(crate) fn node_mut(&mut self, path: &[usize]) -> Result<&mut Node, DocumentError> {
        let Some((&last, parent)) = path.split_last() else {
            return Err(DocumentError::invalid(path, "the root cannot be addressed as a node"));
        };
        self.children_mut(parent)?
            .get_mut(last)
            .ok_or_else(|| DocumentError::detached(path))
    }

    pub fn leaf(&self, point: &Point) -> Option<&TextNode> {
        self.node(&point.path).and_then(Node::as_text)
    }

    /// Text blocks in document order. A list item precedes the items of its
    /// nested lists.
    pub fn text_blocks(&self) -> Vec<TextBlockRef<'_>> {
        fn walk<'a>(nodes: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<TextBlockRef<'a>>) {
            for (ix, node) in nodes.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.is_text_block() {
                    out.push(TextBlockRef {
                        path: path.clone(),
                        el,
                    });
                }
                if matches!(el.kind, ElementKind::List { .. } | ElementKind::ListItem) {
                    walk(&el.children, path, out);
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    /// The deepest text block on `path`.
    pub fn text_block_path_of(&self, path: &[usize]) -> Option<Path> {
        let mut found = None;
        let mut children: &[Node] = &self.children;
        for (depth, &ix) in path.iter().enumerate() {
            let Node::Element(el) = children.get(ix)? else {
                break;
            };
            if el.kind.is_text_block() {
                found = Some(path[..=depth].to_vec());
            }
            children = &el.children;
        }
        found
    }

    pub fn block_text(&self, block: &[usize]) -> Option<String> {
        self.element(block).map(|el| inline_text(el.inline_children()))
    }

    pub fn position_of(&self, point: &Point) -> Option<TextPosition> {
        let block = self.text_block_path_of(&point.path)?;
        let el = self.element(&block)?;
        let rel = &point.path[block.len()..];
        inline_leaves(el.inline_children())
            .into_iter()
            .find(|leaf| leaf.rel_path == rel)
            .map(|leaf| {
                let offset = clamp_to_char_boundary(&leaf.text.text, point.offset);
                TextPosition::new(block, leaf.start + offset)
            })
    }

    /// Resolves a block offset to a leaf point. Boundaries resolve to the
    /// leaf on the left, except at the trailing edge of a link.
    pub fn point_at(&self, pos: &TextPosition) -> Option<Point> {
        let el = self.element(&pos.block)?;
        if !el.kind.is_text_block() {
            return None;
        }
        let leaves = inline_leaves(el.inline_children());
        let last = leaves.last()?;
        let offset = pos.offset.min(last.end());

        let ix = leaves.iter().position(|leaf| offset <= leaf.end())?;
        let mut chosen = ix;
        let leaf = &leaves[ix];
        if leaf.in_link && offset == leaf.end() && offset > leaf.start {
            if let Some(next) = leaves.get(ix + 1) {
                if next.rel_path[0] != leaf.rel_path[0] {
                    chosen = ix + 1;
                }
            }
        }

        let leaf = &leaves[chosen];
        let local = clamp_to_char_boundary(&leaf.text.text, offset.saturating_sub(leaf.start));
        let mut path = pos.block.clone();
        path.extend_from_slice(&leaf.rel_path);
        Some(Point::new(path, local))
    }

    pub fn start_of(&self, block: &[usize]) -> Option<Point> {
        self.point_at(&TextPosition::new(block.to_vec(), 0))
    }

    pub fn end_of(&self, block: &[usize]) -> Option<Point> {
        let len = self.block_text(block)?.len();
        self.point_at(&TextPosition::new(block.to_vec(), len))
    }

    pub fn first_point(&self) -> Option<Point> {
        self.text_blocks()
            .iter()
            .find_map(|block| self.start_of(&block.path))
    }

    pub fn last_point(&self) -> Option<Point> {
        self.text_blocks()
            .iter()
            .rev()
            .find_map(|block| self.end_of(&block.path))
    }

    /// Maps a possibly stale point onto the nearest existing leaf.
    pub fn clamp_point(&self, point: &Point) -> Option<Point> {
        if let Some(leaf) = self.leaf(point) {
            return Some(Point::new(
                point.path.clone(),
                clamp_to_char_boundary(&leaf.text, point.offset),
            ));
        }

        let mut resolved: Path = Vec::new();
        let mut children: &[Node] = &self.children;
        for &wanted in &point.path {
            if children.is_empty() {
                break;
            }
            let ix = wanted.min(children.len() - 1);
            resolved.push(ix);
            match &children[ix] {
                Node::Text(t) => {
                    return Some(Point::new(resolved, point.offset.min(t.text.len())));
                }
                Node::Element(el) => children = &el.children,
            }
        }

        self.text_blocks()
            .into_iter()
            .find(|block| block.path.starts_with(&resolved) || resolved.starts_with(&block.path))
            .and_then(|block| self.start_of(&block.path))
            .or_else(|| self.first_point())
    }

    pub fn clamp_selection(&self, selection: &Selection) -> Option<Selection> {
        let anchor = self.clamp_point(&selection.anchor)?;
        let focus = self.clamp_point(&selection.focus).unwrap_or_else(|| anchor.clone());
        Some(Selection { anchor, focus })
    }

    /// Start and end of the selection in document order.
    pub fn ordered_positions(&self, selection: &Selection) -> Option<(TextPosition, TextPosition)> {
        let a = self.position_of(&selection.anchor)?;
        let b = self.position_of(&selection.focus)?;
        Some(if b < a { (b, a) } else { (a, b) })
    }

    pub fn selection_between(
        &self,
        anchor: &TextPosition,
        focus: &TextPosition,
    ) -> Option<Selection> {
        Some(Selection::new(self.point_at(anchor)?, self.point_at(focus)?))
    }
}
