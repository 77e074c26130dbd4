use bilingual_plate_core::{
    Document, DocumentError, ElementKind, Mark, Marks, Node, Op, Point, Selection, TextPosition,
    normalize,
};

fn bold() -> Marks {
    Marks::default().with(Mark::Bold, true)
}

#[test]
fn new_document_is_one_empty_paragraph() {
    let doc = Document::new();
    assert!(doc.is_empty());
    assert_eq!(doc.children, vec![Node::paragraph("")]);
    normalize::validate(&doc).unwrap();
}

#[test]
fn inserting_into_a_text_leaf_is_invalid_structure() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    let err = doc.insert(&[0, 0, 0], Node::text("x")).unwrap_err();
    assert!(matches!(err, DocumentError::InvalidStructure { .. }));
    assert_eq!(doc.children, vec![Node::paragraph("abc")]);
}

#[test]
fn block_inside_paragraph_is_rejected_atomically() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    let before = doc.clone();
    let err = doc
        .transact([
            Op::InsertText {
                path: vec![0, 0],
                offset: 3,
                text: "def".into(),
            },
            Op::InsertNode {
                path: vec![0, 1],
                node: Node::paragraph("nested"),
            },
        ])
        .unwrap_err();
    assert!(matches!(err, DocumentError::InvalidStructure { .. }));
    assert_eq!(doc, before);
}

#[test]
fn stale_paths_are_detached() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    let err = doc.remove(&[5]).unwrap_err();
    assert_eq!(err, DocumentError::DetachedNode { path: vec![5] });
}

#[test]
fn removing_the_last_block_leaves_an_empty_paragraph() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("only")]);
    doc.remove(&[0]).unwrap();
    assert!(doc.is_empty());
    assert_eq!(doc, Document::new());
}

#[test]
fn adjacent_same_mark_leaves_merge() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    doc.insert(&[0, 1], Node::text("def")).unwrap();
    assert_eq!(doc.children, vec![Node::paragraph("abcdef")]);

    doc.insert(&[0, 1], Node::marked("!", bold())).unwrap();
    let Some(el) = doc.element(&[0]) else {
        panic!("expected paragraph");
    };
    assert_eq!(el.children.len(), 2);
}

#[test]
fn split_text_only_survives_with_differing_marks() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    doc.split_text(&[0, 0], 1).unwrap();
    assert_eq!(doc.children, vec![Node::paragraph("abc")]);

    doc.transact([
        Op::SplitText {
            path: vec![0, 0],
            offset: 1,
        },
        Op::SetTextMarks {
            path: vec![0, 1],
            marks: bold(),
        },
    ])
    .unwrap();
    let Some(el) = doc.element(&[0]) else {
        panic!("expected paragraph");
    };
    assert_eq!(el.children, vec![Node::text("a"), Node::marked("bc", bold())]);
}

#[test]
fn wrap_and_unwrap_a_link() {
    let mut doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    doc.wrap(
        &[0],
        0..1,
        ElementKind::Link {
            url: "https://example.com".into(),
        },
    )
    .unwrap();
    assert_eq!(
        doc.children,
        vec![Node::element(
            ElementKind::Paragraph,
            vec![Node::link("https://example.com", vec![Node::text("abc")])]
        )]
    );

    doc.unwrap(&[0, 0]).unwrap();
    assert_eq!(doc.children, vec![Node::paragraph("abc")]);
}

#[test]
fn lists_may_only_hold_items() {
    let mut doc = Document::from_blocks(vec![Node::list(
        false,
        vec![Node::list_item(vec![Node::text("one")])],
    )]);
    let err = doc.insert(&[0, 1], Node::paragraph("two")).unwrap_err();
    assert!(matches!(err, DocumentError::InvalidStructure { .. }));

    doc.insert(&[0, 1], Node::list_item(vec![Node::text("two")]))
        .unwrap();
    assert_eq!(doc.text_blocks().len(), 2);
}

#[test]
fn emptied_lists_are_dropped() {
    let mut doc = Document::from_blocks(vec![
        Node::paragraph("before"),
        Node::list(false, vec![Node::list_item(vec![Node::text("one")])]),
    ]);
    doc.remove(&[1, 0]).unwrap();
    assert_eq!(doc.children, vec![Node::paragraph("before")]);
}

#[test]
fn text_blocks_follow_document_order() {
    let doc = Document::from_blocks(vec![
        Node::paragraph("a"),
        Node::list(
            false,
            vec![
                Node::list_item(vec![
                    Node::text("b"),
                    Node::list(true, vec![Node::list_item(vec![Node::text("c")])]),
                ]),
                Node::list_item(vec![Node::text("d")]),
            ],
        ),
    ]);
    let paths: Vec<_> = doc.text_blocks().into_iter().map(|b| b.path).collect();
    assert_eq!(
        paths,
        vec![vec![0], vec![1, 0], vec![1, 0, 1, 0], vec![1, 1]]
    );
    let texts: Vec<_> = paths.iter().filter_map(|p| doc.block_text(p)).collect();
    assert_eq!(texts, vec!["a", "b", "c", "d"]);
}

#[test]
fn positions_are_block_offsets_across_leaves() {
    let doc = Document::from_blocks(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("ab"),
            Node::link("https://x.test", vec![Node::text("cd")]),
            Node::text("ef"),
        ],
    )]);
    let pos = doc.position_of(&Point::new(vec![0, 1, 0], 1)).unwrap();
    assert_eq!(pos, TextPosition::new(vec![0], 3));

    // The trailing edge of a link resolves outside it.
    let edge = doc.point_at(&TextPosition::new(vec![0], 4)).unwrap();
    assert_eq!(edge, Point::new(vec![0, 2], 0));
    let inside = doc.point_at(&TextPosition::new(vec![0], 2)).unwrap();
    assert_eq!(inside, Point::new(vec![0, 0], 2));
}

#[test]
fn stale_selections_clamp_onto_the_tree() {
    let doc = Document::from_blocks(vec![Node::paragraph("abc")]);
    let stale = Selection::collapsed(Point::new(vec![3, 2], 10));
    let clamped = doc.clamp_selection(&stale).unwrap();
    assert_eq!(clamped.anchor, Point::new(vec![0, 0], 3));

    let multibyte = Document::from_blocks(vec![Node::paragraph("مرحبا")]);
    let point = multibyte.clamp_point(&Point::new(vec![0, 0], 1)).unwrap();
    assert_eq!(point.offset, 0);
}
