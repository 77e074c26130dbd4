use bilingual_plate_core::html::{self, HtmlBridge};
use bilingual_plate_core::{
    Alignment, Document, ElementKind, HeadingLevel, Mark, Marks, Node, Theme,
};

fn round_trip(input: &str) -> String {
    html::serialize(&html::deserialize(input), &Theme::default())
}

#[test]
fn canonical_fragments_round_trip_exactly() {
    let corpus = [
        "<p>hello world</p>",
        "<h1>One</h1><h2>Two</h2><h3>Three</h3><h4>Four</h4><h5>Five</h5>",
        "<p><strong>b</strong><em>i</em><u>u</u><s>s</s><code>c</code></p>",
        "<p><strong><em>both</em></strong> plain</p>",
        "<ul><li>one</li><li>two</li></ul>",
        "<ol><li>first<ul><li>nested</li></ul></li><li>second</li></ol>",
        "<p>see <a href=\"https://example.com\">the site</a> now</p>",
        "<p><a href=\"https://example.com\"><strong>bold</strong> link</a></p>",
        "<blockquote>quoted</blockquote>",
        "<pre>let x = 1;\nlet y = 2;</pre>",
        "<p>a<br>b</p>",
        "<h2>Title</h2><p><br></p><p>after</p>",
        "<p>a &amp; b &lt;c&gt;</p>",
        "<p style=\"text-align: center\">mid</p>",
        "<p style=\"padding-inline-start: 80px\">indented</p>",
        "<h3 style=\"text-align: right; padding-inline-start: 40px\">both</h3>",
    ];
    for input in corpus {
        assert_eq!(round_trip(input), input, "round trip of {input}");
    }
}

#[test]
fn insignificant_whitespace_and_aliases_canonicalize() {
    assert_eq!(
        round_trip("<P>  hello\n   <B>big</B>  </P>\n\n<p><i>x</i><strike>y</strike></p>"),
        "<p>hello <strong>big</strong></p><p><em>x</em><s>y</s></p>"
    );
    assert_eq!(round_trip("<h6>deep</h6>"), "<h5>deep</h5>");
    assert_eq!(
        round_trip("<pre><code>fn main() {}</code></pre>"),
        "<pre>fn main() {}</pre>"
    );
    assert_eq!(
        round_trip("<p><span style=\"font-weight: 700; font-style: italic\">styled</span></p>"),
        "<p><strong><em>styled</em></strong></p>"
    );
}

#[test]
fn unknown_tags_are_unwrapped_not_dropped() {
    assert_eq!(
        round_trip("<p>keep <span class=\"x\"><mark>marked</mark></span> text</p>"),
        "<p>keep marked text</p>"
    );
    assert_eq!(
        round_trip("<div><section><p>inside</p></section>loose</div>"),
        "<p>inside</p><p>loose</p>"
    );
}

#[test]
fn scripts_styles_and_comments_are_skipped() {
    assert_eq!(
        round_trip("<!DOCTYPE html><style>p{}</style><p>a<!-- note -->b</p><script>x()</script>"),
        "<p>ab</p>"
    );
}

#[test]
fn parsed_tree_has_expected_shape() {
    let doc = html::deserialize(
        "<h2 style=\"text-align: center\">T</h2><ul><li><strong>x</strong></li></ul>",
    );
    let heading = doc.element(&[0]).unwrap();
    assert_eq!(
        heading.kind,
        ElementKind::Heading {
            level: HeadingLevel::new(2).unwrap()
        }
    );
    assert_eq!(heading.format.align, Alignment::Center);

    let item = doc.element(&[1, 0]).unwrap();
    assert_eq!(item.kind, ElementKind::ListItem);
    assert_eq!(
        item.children,
        vec![Node::marked("x", Marks::default().with(Mark::Bold, true))]
    );
}

#[test]
fn empty_text_blocks_serialize_with_a_break() {
    let doc = Document::from_blocks(vec![
        Node::heading(HeadingLevel::clamped(1), ""),
        Node::element(ElementKind::CodeBlock, vec![Node::text("")]),
        Node::paragraph(""),
    ]);
    assert_eq!(
        html::serialize(&doc, &Theme::default()),
        "<h1><br></h1><pre><br></pre><p><br></p>"
    );
}

#[test]
fn code_blocks_keep_leading_newlines() {
    let doc = Document::from_blocks(vec![Node::element(
        ElementKind::CodeBlock,
        vec![Node::text("\nindented <tag>")],
    )]);
    let out = html::serialize(&doc, &Theme::default());
    assert_eq!(out, "<pre>\n\nindented &lt;tag&gt;</pre>");
    assert_eq!(html::deserialize(&out), doc);
}

#[test]
fn theme_classes_are_emitted_and_ignored_on_parse() {
    let theme = Theme {
        paragraph: Some("editor-paragraph".into()),
        h1: Some("editor-h1".into()),
        link: Some("editor-link".into()),
        list_unordered: Some("editor-ul".into()),
        list_item: Some("editor-li".into()),
        ..Theme::default()
    };
    let bridge = HtmlBridge::new(&theme);
    let doc = bridge.deserialize(
        "<h1>T</h1><p>go <a href=\"/x\">here</a></p><ul><li>i</li></ul>",
    );
    let out = bridge.serialize(&doc);
    assert_eq!(
        out,
        "<h1 class=\"editor-h1\">T</h1>\
         <p class=\"editor-paragraph\">go <a href=\"/x\" class=\"editor-link\">here</a></p>\
         <ul class=\"editor-ul\"><li class=\"editor-li\">i</li></ul>"
    );
    assert_eq!(bridge.deserialize(&out), doc);
}

#[test]
fn named_and_numeric_entities_decode() {
    let doc = html::deserialize("<p>a&nbsp;b &apos;c&#39; &quot;d&quot; &#x263A;</p>");

    assert_eq!(
        doc.block_text(&[0]).as_deref(),
        Some("a b 'c' \"d\" \u{263a}")
    );
}

#[test]
fn significant_spaces_are_written_as_nbsp() {
    let cases = [
        (" lead", "<p>&nbsp;lead</p>"),
        ("trail ", "<p>trail&nbsp;</p>"),
        ("a  b", "<p>a &nbsp;b</p>"),
        ("a   b", "<p>a &nbsp;&nbsp;b</p>"),
        ("x \ny", "<p>x&nbsp;<br>y</p>"),
        ("x\n y", "<p>x<br>&nbsp;y</p>"),
        ("plain words", "<p>plain words</p>"),
    ];
    for (text, expected) in cases {
        let doc = Document::from_blocks(vec![Node::paragraph(text)]);
        let out = html::serialize(&doc, &Theme::default());
        assert_eq!(out, expected, "{text:?}");
        assert_eq!(html::deserialize(&out), doc, "{text:?}");
    }
}

#[test]
fn spaces_across_marks_count_as_one_run() {
    let doc = Document::from_blocks(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("a "),
            Node::marked(" b", Marks::default().with(Mark::Bold, true)),
        ],
    )]);
    let out = html::serialize(&doc, &Theme::default());
    assert_eq!(out, "<p>a <strong>&nbsp;b</strong></p>");
    assert_eq!(html::deserialize(&out), doc);
}

#[test]
fn code_blocks_keep_spaces_verbatim() {
    let doc = Document::from_blocks(vec![Node::element(
        ElementKind::CodeBlock,
        vec![Node::text("  x  ")],
    )]);
    let out = html::serialize(&doc, &Theme::default());
    assert_eq!(out, "<pre>  x  </pre>");
    assert_eq!(html::deserialize(&out), doc);
}

#[test]
fn attribute_values_are_escaped() {
    let doc = Document::from_blocks(vec![Node::element(
        ElementKind::Paragraph,
        vec![Node::link("/q?a=1&b=\"2\"", vec![Node::text("q")])],
    )]);
    let out = html::serialize(&doc, &Theme::default());
    assert_eq!(out, "<p><a href=\"/q?a=1&amp;b=&quot;2&quot;\">q</a></p>");
    assert_eq!(html::deserialize(&out), doc);
}
