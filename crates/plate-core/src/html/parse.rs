//! HTML reading on top of `scraper`'s html5ever tree.
//!
//! The html5ever tree is first flattened into a small DOM, then mapped onto
//! the document model. Tags the model has no counterpart for are unwrapped
//! so their text survives.

use scraper::Html;

use crate::document::{
    Alignment, BlockFormat, Document, ElementKind, ElementNode, HeadingLevel, MAX_INDENT_LEVEL,
    Mark, Marks, Node,
};
use crate::error::ParseFailure;
use crate::inline::InlineRuns;
use crate::ops::{DEFAULT_MAX_NORMALIZE_ITERATIONS, Draft};

/// Elements nested deeper than this are unwrapped into their ancestor at
/// this depth. Keeps the recursive mapping below off the end of the stack.
const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum DomNode {
    Element(DomElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
struct DomElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<DomNode>,
    /// Some descendant is a block tag.
    has_block: bool,
}

impl DomElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn style(&self) -> Vec<(String, String)> {
        let Some(style) = self.attr("style") else {
            return Vec::new();
        };
        style
            .split(';')
            .filter_map(|decl| {
                let (k, v) = decl.split_once(':')?;
                Some((k.trim().to_ascii_lowercase(), v.trim().to_ascii_lowercase()))
            })
            .collect()
    }
}

/// Content of these is never text of the document.
const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "textarea", "title", "noscript"];

/// Generic containers: they separate blocks but map to nothing themselves.
const CONTAINER_TAGS: &[&str] = &[
    "address", "article", "aside", "body", "center", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "header", "hgroup", "html", "main",
    "nav", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
];

fn is_heading(name: &str) -> Option<u8> {
    match name.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

fn is_text_block_tag(name: &str) -> bool {
    matches!(name, "p" | "blockquote" | "pre" | "li") || is_heading(name).is_some()
}

fn is_list_tag(name: &str) -> bool {
    matches!(name, "ul" | "ol")
}

fn is_block_tag(name: &str) -> bool {
    is_text_block_tag(name) || is_list_tag(name) || CONTAINER_TAGS.contains(&name)
}

/// Parses markup into a normalized document. html5ever recovers from any
/// malformed markup, so this only fails on input that yields no block at
/// all or a tree the model rejects.
pub fn parse(html: &str) -> Result<Document, ParseFailure> {
    let dom = build_dom(html);
    let mut builder = Builder::default();
    let blocks = builder.blocks_of(&dom);
    if blocks.is_empty() {
        return Err(ParseFailure {
            offset: html.len(),
            reason: "no usable content",
        });
    }
    Draft::new(&Document::from_blocks(blocks))
        .finish(DEFAULT_MAX_NORMALIZE_ITERATIONS)
        .map_err(|_| ParseFailure {
            offset: 0,
            reason: "content does not fit the document model",
        })
}

/// Walks the html5ever tree without recursion, by sibling and parent links.
fn build_dom(input: &str) -> Vec<DomNode> {
    let fragment = Html::parse_fragment(input);
    let top = fragment.tree.root();
    let mut tree = TreeBuilder::default();
    let Some(mut node) = top.first_child() else {
        return tree.finish();
    };

    loop {
        let mut opened = false;
        match node.value() {
            scraper::Node::Text(text) => tree.text(&text.text),
            scraper::Node::Element(el) if !SKIPPED_TAGS.contains(&el.name()) => {
                tree.open(el.name(), el.attrs());
                opened = true;
            }
            _ => {}
        }
        if opened {
            if let Some(child) = node.first_child() {
                node = child;
                continue;
            }
            tree.close();
        }
        loop {
            if let Some(next) = node.next_sibling() {
                node = next;
                break;
            }
            match node.parent() {
                Some(parent) if parent.id() != top.id() => {
                    node = parent;
                    tree.close();
                }
                _ => return tree.finish(),
            }
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<DomNode>,
    open: Vec<DomElement>,
    /// Opened past `MAX_NESTING` and unwrapped.
    flattened: usize,
}

impl TreeBuilder {
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = DomNode::Text(text.to_string());
        match self.open.last_mut() {
            Some(el) => el.children.push(text),
            None => self.root.push(text),
        }
    }

    fn open<'a>(&mut self, name: &str, attrs: impl Iterator<Item = (&'a str, &'a str)>) {
        if self.open.len() >= MAX_NESTING {
            self.flattened += 1;
            return;
        }
        self.open.push(DomElement {
            name: name.to_string(),
            attrs: attrs
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            children: Vec::new(),
            has_block: false,
        });
    }

    fn close(&mut self) {
        if self.flattened > 0 {
            self.flattened -= 1;
            return;
        }
        if let Some(el) = self.open.pop() {
            self.attach(el);
        }
    }

    fn attach(&mut self, el: DomElement) {
        let block = el.has_block || is_block_tag(&el.name);
        match self.open.last_mut() {
            Some(parent) => {
                parent.has_block |= block;
                parent.children.push(DomNode::Element(el));
            }
            None => self.root.push(DomNode::Element(el)),
        }
    }

    fn finish(mut self) -> Vec<DomNode> {
        while let Some(el) = self.open.pop() {
            self.attach(el);
        }
        self.root
    }
}

#[derive(Debug, Clone, Default)]
struct Ctx {
    marks: Marks,
    link: Option<(usize, String)>,
    pre: bool,
}

/// Inline content gathered for one text block.
#[derive(Default)]
struct Gather {
    runs: InlineRuns,
    break_pending: bool,
    lists: Option<Vec<Node>>,
}

impl Gather {
    fn for_list_item() -> Self {
        Self {
            lists: Some(Vec::new()),
            ..Self::default()
        }
    }

    fn push(&mut self, text: &str, ctx: &Ctx) {
        if self.break_pending {
            if !ctx.pre && text.trim_matches(' ').is_empty() {
                return;
            }
            self.runs.push_text("\n", ctx.marks, None);
            self.break_pending = false;
        }
        let link = ctx.link.as_ref().map(|(id, url)| (*id, url.as_str()));
        self.runs.push_text(text, ctx.marks, link);
    }

    fn block_boundary(&mut self) {
        if !self.runs.is_empty() && !self.runs.ends_with_break() {
            self.break_pending = true;
        }
    }
}

#[derive(Default)]
struct Builder {
    next_link: usize,
}

impl Builder {
    fn blocks_of(&mut self, nodes: &[DomNode]) -> Vec<Node> {
        let mut out = Vec::new();
        let mut pending = Gather::default();
        self.blocks(nodes, &Ctx::default(), &mut out, &mut pending);
        flush(&mut pending, &mut out);
        out
    }

    fn blocks(&mut self, nodes: &[DomNode], ctx: &Ctx, out: &mut Vec<Node>, pending: &mut Gather) {
        for node in nodes {
            let el = match node {
                DomNode::Text(text) => {
                    gather_text(text, ctx, pending);
                    continue;
                }
                DomNode::Element(el) => el,
            };
            let name = el.name.as_str();
            if is_text_block_tag(name) {
                flush(pending, out);
                out.push(self.text_block(el, ctx));
            } else if is_list_tag(name) {
                flush(pending, out);
                out.extend(self.list(el, ctx));
            } else if CONTAINER_TAGS.contains(&name) {
                flush(pending, out);
                self.blocks(&el.children, ctx, out, pending);
                flush(pending, out);
            } else if name == "br" {
                if !pending.runs.is_empty() {
                    pending.push("\n", ctx);
                }
            } else if el.has_block {
                let inner = self.inline_ctx(el, ctx);
                self.blocks(&el.children, &inner, out, pending);
            } else {
                self.gather(std::slice::from_ref(node), ctx, pending);
            }
        }
    }

    fn text_block(&mut self, el: &DomElement, ctx: &Ctx) -> Node {
        let kind = match el.name.as_str() {
            "blockquote" => ElementKind::Quote,
            "pre" => ElementKind::CodeBlock,
            "li" => ElementKind::ListItem,
            name => match is_heading(name) {
                Some(level) => ElementKind::Heading {
                    level: HeadingLevel::clamped(level),
                },
                None => ElementKind::Paragraph,
            },
        };
        let pre = kind == ElementKind::CodeBlock;
        let inner = Ctx {
            pre: ctx.pre || pre,
            ..ctx.clone()
        };
        let mut gather = if kind == ElementKind::ListItem {
            Gather::for_list_item()
        } else {
            Gather::default()
        };
        self.gather(&el.children, &inner, &mut gather);

        let only_break = matches!(
            el.children.as_slice(),
            [DomNode::Element(br)] if br.name == "br"
        );
        let mut runs = gather.runs;
        if !pre {
            runs.collapse_whitespace();
        }
        if only_break || (!pre && runs.text() == "\n") {
            runs.clear();
        }

        let mut children = runs.into_nodes();
        children.extend(gather.lists.unwrap_or_default());
        Node::Element(ElementNode {
            kind,
            format: block_format(el),
            children,
        })
    }

    fn list(&mut self, el: &DomElement, ctx: &Ctx) -> Option<Node> {
        let ordered = el.name == "ol";
        let mut items: Vec<Node> = Vec::new();
        let mut stray = Gather::for_list_item();

        for child in &el.children {
            match child {
                DomNode::Element(item) if item.name == "li" => {
                    flush_item(&mut stray, &mut items);
                    items.push(self.text_block(item, ctx));
                }
                DomNode::Element(nested) if is_list_tag(&nested.name) => {
                    flush_item(&mut stray, &mut items);
                    let Some(list) = self.list(nested, ctx) else {
                        continue;
                    };
                    match items.last_mut() {
                        Some(Node::Element(prev)) => prev.children.push(list),
                        _ => items.push(Node::list_item(vec![Node::text(""), list])),
                    }
                }
                DomNode::Text(text) if text.trim().is_empty() => {}
                other => self.gather(std::slice::from_ref(other), ctx, &mut stray),
            }
        }
        flush_item(&mut stray, &mut items);

        (!items.is_empty()).then(|| Node::list(ordered, items))
    }

    fn gather(&mut self, nodes: &[DomNode], ctx: &Ctx, acc: &mut Gather) {
        for node in nodes {
            let el = match node {
                DomNode::Text(text) => {
                    gather_text(text, ctx, acc);
                    continue;
                }
                DomNode::Element(el) => el,
            };
            let name = el.name.as_str();
            if name == "br" {
                acc.break_pending = false;
                acc.push("\n", ctx);
            } else if is_list_tag(name) && acc.lists.is_some() {
                if let Some(list) = self.list(el, ctx) {
                    acc.lists.get_or_insert_with(Vec::new).push(list);
                }
            } else if is_block_tag(name) {
                acc.block_boundary();
                let inner = Ctx {
                    pre: ctx.pre || name == "pre",
                    ..ctx.clone()
                };
                self.gather(&el.children, &inner, acc);
                acc.block_boundary();
            } else {
                let inner = self.inline_ctx(el, ctx);
                self.gather(&el.children, &inner, acc);
            }
        }
    }

    fn inline_ctx(&mut self, el: &DomElement, ctx: &Ctx) -> Ctx {
        let mut next = ctx.clone();
        match el.name.as_str() {
            "strong" | "b" => next.marks.set(Mark::Bold, true),
            "em" | "i" => next.marks.set(Mark::Italic, true),
            "u" | "ins" => next.marks.set(Mark::Underline, true),
            "s" | "strike" | "del" => next.marks.set(Mark::Strikethrough, true),
            "code" | "kbd" | "samp" | "tt" if !ctx.pre => next.marks.set(Mark::Code, true),
            "a" => {
                if let Some(href) = el.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
                    self.next_link += 1;
                    next.link = Some((self.next_link, href.to_string()));
                }
            }
            _ => {}
        }
        for (key, value) in el.style() {
            match key.as_str() {
                "font-weight" => {
                    let bold = value == "bold"
                        || value == "bolder"
                        || value.parse::<u16>().is_ok_and(|w| w >= 600);
                    if bold {
                        next.marks.set(Mark::Bold, true);
                    }
                }
                "font-style" if value == "italic" => next.marks.set(Mark::Italic, true),
                "text-decoration" | "text-decoration-line" => {
                    if value.contains("underline") {
                        next.marks.set(Mark::Underline, true);
                    }
                    if value.contains("line-through") {
                        next.marks.set(Mark::Strikethrough, true);
                    }
                }
                _ => {}
            }
        }
        next
    }
}

fn gather_text(text: &str, ctx: &Ctx, acc: &mut Gather) {
    if ctx.pre {
        acc.push(text, ctx);
        return;
    }
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    acc.push(&collapsed, ctx);
}

/// Stray inline content between blocks becomes a paragraph unless it is
/// only whitespace.
fn flush(pending: &mut Gather, out: &mut Vec<Node>) {
    let mut runs = std::mem::take(&mut pending.runs);
    pending.break_pending = false;
    runs.collapse_whitespace();
    if runs.text().trim().is_empty() {
        return;
    }
    out.push(Node::element(ElementKind::Paragraph, runs.into_nodes()));
}

fn flush_item(stray: &mut Gather, items: &mut Vec<Node>) {
    let mut runs = std::mem::take(&mut stray.runs);
    stray.break_pending = false;
    runs.collapse_whitespace();
    if runs.text().trim().is_empty() {
        return;
    }
    items.push(Node::list_item(runs.into_nodes()));
}

fn block_format(el: &DomElement) -> BlockFormat {
    let mut format = BlockFormat::default();
    for (key, value) in el.style() {
        match key.as_str() {
            "text-align" => format.align = Alignment::from_css(&value),
            "padding-inline-start" => {
                let px = value.trim_end_matches("px").trim().parse::<f32>().unwrap_or(0.0);
                let level = (px / 40.0).round().clamp(0.0, f32::from(MAX_INDENT_LEVEL));
                format.indent = level as u8;
            }
            _ => {}
        }
    }
    format
}

pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            decode_entity(entity).map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
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

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code).filter(|c| *c != '\0')
        }
    }
}
