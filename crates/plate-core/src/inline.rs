use std::collections::BTreeSet;
use std::ops::Range;

use crate::document::{ElementKind, Marks, Node, clamp_to_char_boundary};

/// Flattened inline content of one text block: a run per text leaf, each
/// tagged with the link it sits in. Commands edit runs and write the block
/// back with a single `ReplaceNode`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct InlineRuns {
    runs: Vec<Run>,
    next_link: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    marks: Marks,
    link: Option<LinkRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkRef {
    id: usize,
    url: String,
}

impl InlineRuns {
    pub fn from_nodes(inline: &[Node]) -> Self {
        let mut out = Self::default();
        for node in inline {
            match node {
                Node::Text(t) => out.push(t.text.clone(), t.marks, None),
                Node::Element(el) => {
                    let ElementKind::Link { url } = &el.kind else {
                        continue;
                    };
                    let link = LinkRef {
                        id: out.fresh_link_id(),
                        url: url.clone(),
                    };
                    for child in &el.children {
                        if let Node::Text(t) = child {
                            out.push(t.text.clone(), t.marks, Some(link.clone()));
                        }
                    }
                }
            }
        }
        out
    }

    /// Rebuilds inline nodes. Consecutive runs of the same link share one
    /// `Link` element; an empty block keeps a single empty leaf.
    pub fn into_nodes(self) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        let mut open: Option<(LinkRef, Vec<Node>)> = None;
        for run in self.runs {
            let leaf = Node::marked(run.text, run.marks);
            match (run.link, open.as_mut()) {
                (Some(link), Some((current, children))) if current.id == link.id => {
                    children.push(leaf);
                }
                (Some(link), _) => {
                    if let Some((prev, children)) = open.take() {
                        out.push(Node::link(prev.url, children));
                    }
                    open = Some((link, vec![leaf]));
                }
                (None, _) => {
                    if let Some((prev, children)) = open.take() {
                        out.push(Node::link(prev.url, children));
                    }
                    out.push(leaf);
                }
            }
        }
        if let Some((prev, children)) = open {
            out.push(Node::link(prev.url, children));
        }
        if out.is_empty() {
            out.push(Node::text(""));
        }
        out
    }

    fn fresh_link_id(&mut self) -> usize {
        self.next_link += 1;
        self.next_link
    }

    fn push(&mut self, text: String, marks: Marks, link: Option<LinkRef>) {
        if !text.is_empty() {
            self.runs.push(Run { text, marks, link });
        }
    }

    /// Appends a leaf. `link` carries a caller-chosen id so separate links
    /// with the same url stay separate.
    pub fn push_text(&mut self, text: &str, marks: Marks, link: Option<(usize, &str)>) {
        let link = link.map(|(id, url)| {
            self.next_link = self.next_link.max(id);
            LinkRef {
                id,
                url: url.to_string(),
            }
        });
        self.push(text.to_string(), marks, link);
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn ends_with_break(&self) -> bool {
        self.runs.last().is_some_and(|r| r.text.ends_with('\n'))
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Collapses space runs the way HTML renders them: no leading or
    /// trailing spaces, one space between words, none around a break. A
    /// no-break space survives collapsing and is stored as a plain space.
    pub fn collapse_whitespace(&mut self) {
        let mut prev_space = true;
        for run in &mut self.runs {
            let mut out = String::with_capacity(run.text.len());
            for c in run.text.chars() {
                match c {
                    ' ' if prev_space => {}
                    ' ' => {
                        prev_space = true;
                        out.push(' ');
                    }
                    '\n' => {
                        if out.ends_with(' ') {
                            out.pop();
                        }
                        prev_space = true;
                        out.push('\n');
                    }
                    _ => {
                        prev_space = false;
                        out.push(c);
                    }
                }
            }
            run.text = out;
        }
        for run in self.runs.iter_mut().rev() {
            let trimmed = run.text.trim_end_matches(' ').len();
            run.text.truncate(trimmed);
            if !run.text.is_empty() {
                break;
            }
        }
        self.runs.retain(|r| !r.text.is_empty());
        for run in &mut self.runs {
            if run.text.contains('\u{a0}') {
                run.text = run.text.replace('\u{a0}', " ");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(|r| r.text.len()).sum()
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    fn bounds(&self) -> Vec<Range<usize>> {
        let mut cursor = 0;
        self.runs
            .iter()
            .map(|run| {
                let start = cursor;
                cursor += run.text.len();
                start..cursor
            })
            .collect()
    }

    fn clamp(&self, offset: usize) -> usize {
        let text = self.text();
        clamp_to_char_boundary(&text, offset)
    }

    /// Ensures a run boundary at `offset` and returns the index of the first
    /// run starting there.
    fn split_at(&mut self, offset: usize) -> usize {
        let offset = self.clamp(offset);
        let mut cursor = 0;
        for ix in 0..self.runs.len() {
            let len = self.runs[ix].text.len();
            if offset == cursor {
                return ix;
            }
            if offset < cursor + len {
                let tail = self.runs[ix].text.split_off(offset - cursor);
                let run = Run {
                    text: tail,
                    marks: self.runs[ix].marks,
                    link: self.runs[ix].link.clone(),
                };
                self.runs.insert(ix + 1, run);
                return ix + 1;
            }
            cursor += len;
        }
        self.runs.len()
    }

    fn split_range(&mut self, range: Range<usize>) -> Range<usize> {
        let end = self.split_at(range.end);
        let start = self.split_at(range.start);
        // Splitting at `start` may have shifted the end index by one.
        let end = if self.bounds().get(end).is_some_and(|b| b.start < range.end) {
            end + 1
        } else {
            end
        };
        start..end.min(self.runs.len())
    }

    /// Marks of every non-empty run overlapping `range`.
    pub fn marks_in(&self, range: Range<usize>) -> Vec<Marks> {
        self.bounds()
            .into_iter()
            .zip(&self.runs)
            .filter(|(b, _)| b.start < range.end && range.start < b.end)
            .map(|(_, run)| run.marks)
            .collect()
    }

    /// Marks a caret at `offset` types with: the leaf on its left, or the
    /// first leaf at the start of the block.
    pub fn marks_before(&self, offset: usize) -> Marks {
        let bounds = self.bounds();
        bounds
            .iter()
            .zip(&self.runs)
            .rev()
            .find(|(b, _)| b.start < offset && offset <= b.end)
            .or_else(|| bounds.iter().zip(&self.runs).next())
            .map(|(_, run)| run.marks)
            .unwrap_or_default()
    }

    pub fn map_marks(&mut self, range: Range<usize>, f: impl Fn(Marks) -> Marks) {
        if range.start >= range.end {
            return;
        }
        let ixs = self.split_range(range);
        for run in &mut self.runs[ixs] {
            run.marks = f(run.marks);
        }
    }

    /// Url of the link touching a caret at `offset`, preferring the left side.
    pub fn link_at(&self, offset: usize) -> Option<&str> {
        self.link_id_at(offset).and_then(|id| self.url_of(id))
    }

    fn link_id_at(&self, offset: usize) -> Option<usize> {
        let bounds = self.bounds();
        let left = bounds
            .iter()
            .zip(&self.runs)
            .find(|(b, _)| b.start < offset && offset <= b.end);
        let right = bounds
            .iter()
            .zip(&self.runs)
            .find(|(b, _)| b.start <= offset && offset < b.end);
        left.and_then(|(_, r)| r.link.as_ref())
            .or_else(|| right.and_then(|(_, r)| r.link.as_ref()))
            .map(|link| link.id)
    }

    fn url_of(&self, id: usize) -> Option<&str> {
        self.runs
            .iter()
            .filter_map(|r| r.link.as_ref())
            .find(|link| link.id == id)
            .map(|link| link.url.as_str())
    }

    /// Urls of links overlapping `range`, in order.
    pub fn links_in(&self, range: Range<usize>) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.bounds()
            .into_iter()
            .zip(&self.runs)
            .filter(|(b, _)| b.start < range.end && range.start < b.end)
            .filter_map(|(_, run)| run.link.as_ref())
            .filter(|link| seen.insert(link.id))
            .map(|link| link.url.as_str())
            .collect()
    }

    fn links_touching(&self, range: Range<usize>) -> BTreeSet<usize> {
        if range.start == range.end {
            return self.link_id_at(range.start).into_iter().collect();
        }
        self.bounds()
            .into_iter()
            .zip(&self.runs)
            .filter(|(b, _)| b.start < range.end && range.start < b.end)
            .filter_map(|(_, run)| run.link.as_ref().map(|l| l.id))
            .collect()
    }

    /// Removes every link touched by `range` (or by a caret at its start).
    pub fn unlink(&mut self, range: Range<usize>) -> bool {
        let ids = self.links_touching(range);
        if ids.is_empty() {
            return false;
        }
        for run in &mut self.runs {
            if run.link.as_ref().is_some_and(|l| ids.contains(&l.id)) {
                run.link = None;
            }
        }
        true
    }

    /// Points the link touching a caret at `offset` to `url`.
    pub fn set_link_url_at(&mut self, offset: usize, url: &str) -> bool {
        let Some(id) = self.link_id_at(offset) else {
            return false;
        };
        for run in &mut self.runs {
            if let Some(link) = run.link.as_mut().filter(|l| l.id == id) {
                link.url = url.to_string();
            }
        }
        true
    }

    /// Wraps `range` in a fresh link. Links overlapping the range are
    /// removed first so links never nest or interleave.
    pub fn wrap_link(&mut self, range: Range<usize>, url: &str) {
        if range.start >= range.end {
            return;
        }
        self.unlink(range.clone());
        let link = LinkRef {
            id: self.fresh_link_id(),
            url: url.to_string(),
        };
        let ixs = self.split_range(range);
        for run in &mut self.runs[ixs] {
            run.link = Some(link.clone());
        }
    }

    /// Inserts text at `offset`. It joins a link only when the caret sits
    /// strictly inside that link.
    pub fn insert(&mut self, offset: usize, text: &str, marks: Marks) {
        let offset = self.clamp(offset);
        let ix = self.split_at(offset);
        let left = ix.checked_sub(1).and_then(|i| self.runs[i].link.clone());
        let right = self.runs.get(ix).and_then(|r| r.link.clone());
        let link = match (left, right) {
            (Some(l), Some(r)) if l.id == r.id => Some(l),
            _ => None,
        };
        if !text.is_empty() {
            self.runs.insert(
                ix,
                Run {
                    text: text.to_string(),
                    marks,
                    link,
                },
            );
        }
    }

    /// Inserts text carrying a new link of its own.
    pub fn insert_link(&mut self, offset: usize, text: &str, url: &str) {
        let offset = self.clamp(offset);
        let marks = self.marks_before(offset);
        self.insert(offset, text, marks);
        self.wrap_link(offset..offset + text.len(), url);
    }

    pub fn delete(&mut self, range: Range<usize>) {
        if range.start >= range.end {
            return;
        }
        let ixs = self.split_range(range);
        self.runs.drain(ixs);
    }

    /// Splits off everything from `offset` on.
    pub fn split_off(&mut self, offset: usize) -> InlineRuns {
        let ix = self.split_at(offset);
        let tail = self.runs.split_off(ix);
        InlineRuns {
            runs: tail,
            next_link: self.next_link,
        }
    }

    /// Appends `other`, keeping its links distinct from ours.
    pub fn append(&mut self, other: InlineRuns) {
        let base = self.next_link;
        let mut max = base;
        for mut run in other.runs {
            if let Some(link) = run.link.as_mut() {
                link.id += base;
                max = max.max(link.id);
            }
            self.runs.push(run);
        }
        self.next_link = max;
    }

    /// Byte length of the character ending at `offset`.
    pub fn char_before(&self, offset: usize) -> usize {
        let text = self.text();
        let offset = clamp_to_char_boundary(&text, offset);
        text[..offset].chars().next_back().map_or(0, char::len_utf8)
    }

    /// Byte length of the character starting at `offset`.
    pub fn char_after(&self, offset: usize) -> usize {
        let text = self.text();
        let offset = clamp_to_char_boundary(&text, offset);
        text[offset..].chars().next().map_or(0, char::len_utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Mark;

    fn bold() -> Marks {
        Marks::default().with(Mark::Bold, true)
    }

    #[test]
    fn mapping_marks_splits_runs_at_range_edges() {
        let mut runs = InlineRuns::from_nodes(&[Node::text("abcde")]);
        runs.map_marks(1..3, |m| m.with(Mark::Bold, true));
        assert_eq!(
            runs.into_nodes(),
            vec![Node::text("a"), Node::marked("bc", bold()), Node::text("de")]
        );
    }

    #[test]
    fn wrapping_a_link_over_an_existing_one_replaces_it() {
        let mut runs = InlineRuns::from_nodes(&[
            Node::text("ab"),
            Node::link("https://old.example", vec![Node::text("cd")]),
            Node::text("ef"),
        ]);
        runs.wrap_link(3..5, "https://new.example");
        assert_eq!(
            runs.into_nodes(),
            vec![
                Node::text("ab"),
                Node::text("c"),
                Node::link("https://new.example", vec![Node::text("d"), Node::text("e")]),
                Node::text("f"),
            ]
        );
    }

    #[test]
    fn insertion_joins_a_link_only_from_inside() {
        let source = [Node::link("u", vec![Node::text("ab")]), Node::text("c")];

        let mut inside = InlineRuns::from_nodes(&source);
        inside.insert(1, "x", Marks::default());
        assert_eq!(inside.links_in(0..3), vec!["u"]);
        assert_eq!(inside.text(), "axbc");
        assert_eq!(inside.into_nodes()[0].text_content(), "axb");

        let mut edge = InlineRuns::from_nodes(&source);
        edge.insert(2, "x", Marks::default());
        assert_eq!(edge.into_nodes()[0].text_content(), "ab");
    }

    #[test]
    fn split_off_and_append_round_trip_text() {
        let mut runs = InlineRuns::from_nodes(&[Node::text("hello world")]);
        let tail = runs.split_off(5);
        assert_eq!(runs.text(), "hello");
        assert_eq!(tail.text(), " world");
        runs.append(tail);
        assert_eq!(runs.text(), "hello world");
    }

    #[test]
    fn char_lengths_respect_multibyte_text() {
        let runs = InlineRuns::from_nodes(&[Node::text("مرحبا")]);
        assert_eq!(runs.char_before(4), 2);
        assert_eq!(runs.char_after(0), 2);
        assert_eq!(runs.char_before(0), 0);
    }
}
