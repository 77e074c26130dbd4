use crate::config::{Direction, Theme};
use crate::document::{Document, ElementKind, ElementNode, Mark, Marks, Node};

/// Renders the document as HTML. Output is canonical: marks nest in
/// `Mark::ALL` order and consecutive leaves share wrappers.
pub fn serialize(doc: &Document, theme: &Theme) -> String {
    let mut out = String::new();
    for node in &doc.children {
        if let Node::Element(el) = node {
            block(el, theme, &mut out);
        }
    }
    out
}

/// Wraps serialized content in the field's directional container.
pub fn wrap_direction(inner: &str, direction: Direction, theme: &Theme) -> String {
    let mut out = String::with_capacity(inner.len() + 32);
    out.push_str("<div dir=\"");
    out.push_str(direction.as_str());
    out.push('"');
    push_class(&mut out, theme.root.as_deref());
    out.push('>');
    out.push_str(inner);
    out.push_str("</div>");
    out
}

fn block(el: &ElementNode, theme: &Theme, out: &mut String) {
    let (tag, class): (String, Option<&str>) = match &el.kind {
        ElementKind::Paragraph => ("p".into(), theme.paragraph.as_deref()),
        ElementKind::Heading { level } => (format!("h{}", level.get()), theme.heading(*level)),
        ElementKind::Quote => ("blockquote".into(), theme.quote.as_deref()),
        ElementKind::CodeBlock => ("pre".into(), theme.code.as_deref()),
        ElementKind::List { ordered } => {
            let tag = if *ordered { "ol" } else { "ul" };
            (tag.into(), theme.list(*ordered))
        }
        ElementKind::ListItem => ("li".into(), theme.list_item.as_deref()),
        ElementKind::Link { .. } => return,
    };

    out.push('<');
    out.push_str(&tag);
    push_class(out, class);
    push_format(out, el);
    out.push('>');

    match &el.kind {
        ElementKind::List { .. } => {
            for item in &el.children {
                if let Node::Element(item) = item {
                    block(item, theme, out);
                }
            }
        }
        ElementKind::CodeBlock => {
            let text: String = el.children.iter().map(Node::text_content).collect();
            if text.is_empty() {
                out.push_str("<br>");
            } else {
                // A newline right after `<pre>` is dropped by parsers.
                if text.starts_with('\n') {
                    out.push('\n');
                }
                inline(el.inline_children(), theme, true, out);
            }
        }
        _ => {
            let inline_nodes = el.inline_children();
            let empty = inline_nodes.iter().all(|n| n.text_content().is_empty());
            if empty {
                if el.nested_lists().is_empty() {
                    out.push_str("<br>");
                }
            } else {
                inline(inline_nodes, theme, false, out);
            }
            for list in el.nested_lists() {
                if let Node::Element(list) = list {
                    block(list, theme, out);
                }
            }
        }
    }

    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

fn push_format(out: &mut String, el: &ElementNode) {
    let mut decls = Vec::new();
    if let Some(align) = el.format.align.as_css() {
        decls.push(format!("text-align: {align}"));
    }
    if el.format.indent > 0 {
        decls.push(format!(
            "padding-inline-start: {}px",
            u32::from(el.format.indent) * 40
        ));
    }
    if !decls.is_empty() {
        out.push_str(" style=\"");
        out.push_str(&decls.join("; "));
        out.push('"');
    }
}

fn push_class(out: &mut String, class: Option<&str>) {
    if let Some(class) = class.filter(|c| !c.is_empty()) {
        out.push_str(" class=\"");
        escape_attr(class, out);
        out.push('"');
    }
}

/// Per-character flags over a block's inline text marking the spaces a
/// parser would collapse away: at either end of the block, after another
/// space, or next to a line break. Those are written as `&nbsp;`.
struct Spaces {
    keep: Vec<bool>,
    at: usize,
}

impl Spaces {
    fn of(nodes: &[Node], pre: bool) -> Self {
        if pre {
            return Self {
                keep: Vec::new(),
                at: 0,
            };
        }
        let chars: Vec<char> = leaf_texts(nodes).flat_map(str::chars).collect();
        let last = chars.len().saturating_sub(1);
        let keep = chars
            .iter()
            .enumerate()
            .map(|(ix, &c)| {
                c == ' '
                    && (ix == 0
                        || ix == last
                        || matches!(chars[ix - 1], ' ' | '\n')
                        || chars.get(ix + 1) == Some(&'\n'))
            })
            .collect();
        Self { keep, at: 0 }
    }

    fn next_is_kept(&mut self) -> bool {
        let kept = self.keep.get(self.at).copied().unwrap_or(false);
        self.at += 1;
        kept
    }
}

/// Text leaves in output order, link children included.
fn leaf_texts(nodes: &[Node]) -> impl Iterator<Item = &str> {
    nodes.iter().flat_map(|node| {
        let leaves: Vec<&str> = match node {
            Node::Text(t) => vec![t.text.as_str()],
            Node::Element(el) if matches!(el.kind, ElementKind::Link { .. }) => el
                .children
                .iter()
                .filter_map(Node::as_text)
                .map(|t| t.text.as_str())
                .collect(),
            Node::Element(_) => Vec::new(),
        };
        leaves
    })
}

fn inline(nodes: &[Node], theme: &Theme, pre: bool, out: &mut String) {
    let mut open: Vec<Mark> = Vec::new();
    let mut spaces = Spaces::of(nodes, pre);
    for node in nodes {
        match node {
            Node::Text(t) => leaf(&t.text, t.marks, pre, &mut open, &mut spaces, out),
            Node::Element(el) => {
                let ElementKind::Link { url } = &el.kind else {
                    continue;
                };
                close_marks(&mut open, 0, out);
                out.push_str("<a href=\"");
                escape_attr(url, out);
                out.push('"');
                push_class(out, theme.link.as_deref());
                out.push('>');
                let mut inner: Vec<Mark> = Vec::new();
                for child in &el.children {
                    if let Node::Text(t) = child {
                        leaf(&t.text, t.marks, pre, &mut inner, &mut spaces, out);
                    }
                }
                close_marks(&mut inner, 0, out);
                out.push_str("</a>");
            }
        }
    }
    close_marks(&mut open, 0, out);
}

fn leaf(
    text: &str,
    marks: Marks,
    pre: bool,
    open: &mut Vec<Mark>,
    spaces: &mut Spaces,
    out: &mut String,
) {
    if text.is_empty() {
        return;
    }
    let wanted: Vec<Mark> = Mark::ALL
        .into_iter()
        .filter(|m| marks.has(*m) && !(pre && *m == Mark::Code))
        .collect();
    let shared = open
        .iter()
        .zip(&wanted)
        .take_while(|(a, b)| a == b)
        .count();
    close_marks(open, shared, out);
    for mark in &wanted[shared..] {
        out.push('<');
        out.push_str(mark_tag(*mark));
        out.push('>');
        open.push(*mark);
    }
    escape_text(text, pre, spaces, out);
}

fn close_marks(open: &mut Vec<Mark>, keep: usize, out: &mut String) {
    while open.len() > keep {
        if let Some(mark) = open.pop() {
            out.push_str("</");
            out.push_str(mark_tag(mark));
            out.push('>');
        }
    }
}

fn mark_tag(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Underline => "u",
        Mark::Strikethrough => "s",
        Mark::Code => "code",
    }
}

fn escape_text(text: &str, pre: bool, spaces: &mut Spaces, out: &mut String) {
    for c in text.chars() {
        let kept = spaces.next_is_kept();
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' if !pre => out.push_str("<br>"),
            ' ' if kept => out.push_str("&nbsp;"),
            '\u{a0}' if !pre => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

pub(crate) fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
