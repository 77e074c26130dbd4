use std::sync::Arc;

use bilingual_plate_core::{
    ActiveBlock, Alignment, BlockKind, Command, Direction, Editor, EditorConfig, FieldOptions,
    HeadingLevel, TextPosition,
};

fn editor(html: &str) -> Editor {
    let mut editor = Editor::create(
        Arc::new(EditorConfig::new()),
        FieldOptions::new(Direction::Ltr).initial_html(html),
    );
    editor.focus();
    editor
}

fn h(level: u8) -> HeadingLevel {
    HeadingLevel::new(level).unwrap()
}

fn select(editor: &mut Editor, anchor: (&[usize], usize), focus: (&[usize], usize)) {
    let selection = editor
        .doc()
        .selection_between(
            &TextPosition::new(anchor.0.to_vec(), anchor.1),
            &TextPosition::new(focus.0.to_vec(), focus.1),
        )
        .unwrap();
    editor.set_selection(Some(selection));
}

#[test]
fn set_heading_and_back_to_paragraph() {
    let mut editor = editor("<p>title</p>");

    assert!(editor.dispatch(Command::SetHeading(h(2))).unwrap());
    assert_eq!(editor.document_html(), "<h2>title</h2>");
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Heading(h(2)));
    assert_eq!(editor.toolbar_state().block_type.as_str(), "h2");

    editor
        .dispatch(Command::SetBlockType(BlockKind::Paragraph))
        .unwrap();
    assert_eq!(editor.document_html(), "<p>title</p>");
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Paragraph);
}

#[test]
fn block_type_switches_keep_inline_content() {
    let mut editor = editor("<h1>a <strong>b</strong></h1>");

    editor.dispatch(Command::SetBlockType(BlockKind::Quote)).unwrap();
    assert_eq!(
        editor.document_html(),
        "<blockquote>a <strong>b</strong></blockquote>"
    );
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Quote);

    editor.dispatch(Command::SetBlockType(BlockKind::Code)).unwrap();
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Code);
}

#[test]
fn setting_the_current_type_is_not_an_edit() {
    let mut editor = editor("<p>x</p>");

    assert!(
        !editor
            .dispatch(Command::SetBlockType(BlockKind::Paragraph))
            .unwrap()
    );
    assert!(!editor.can_undo());
    assert_eq!(editor.revision(), 0);
}

#[test]
fn alignment_applies_to_every_selected_block() {
    let mut editor = editor("<p>a</p><h1>b</h1>");
    editor.select_all();

    assert!(editor.dispatch(Command::FormatBlock(Alignment::Center)).unwrap());

    assert_eq!(
        editor.document_html(),
        "<p style=\"text-align: center\">a</p><h1 style=\"text-align: center\">b</h1>"
    );
    assert_eq!(editor.toolbar_state().alignment, Alignment::Center);
    assert!(!editor.dispatch(Command::FormatBlock(Alignment::Center)).unwrap());
}

#[test]
fn start_alignment_clears_the_style() {
    let mut editor = editor("<p>a</p>");

    assert!(editor.dispatch(Command::FormatBlock(Alignment::Justify)).unwrap());
    assert_eq!(editor.document_html(), "<p style=\"text-align: justify\">a</p>");

    assert!(editor.dispatch(Command::FormatBlock(Alignment::Start)).unwrap());
    assert_eq!(editor.document_html(), "<p>a</p>");
    assert_eq!(editor.toolbar_state().alignment, Alignment::Start);
}

#[test]
fn paragraph_indent_steps_and_stops_at_the_limit() {
    let mut editor = editor("<p>x</p>");

    editor.dispatch(Command::Indent).unwrap();
    editor.dispatch(Command::Indent).unwrap();
    assert_eq!(
        editor.document_html(),
        "<p style=\"padding-inline-start: 80px\">x</p>"
    );

    editor.dispatch(Command::Outdent).unwrap();
    assert_eq!(
        editor.document_html(),
        "<p style=\"padding-inline-start: 40px\">x</p>"
    );
    editor.dispatch(Command::Outdent).unwrap();
    assert!(!editor.dispatch(Command::Outdent).unwrap());
    assert_eq!(editor.document_html(), "<p>x</p>");

    for _ in 0..6 {
        assert!(editor.dispatch(Command::Indent).unwrap());
    }
    assert!(!editor.dispatch(Command::Indent).unwrap());
    assert_eq!(
        editor.document_html(),
        "<p style=\"padding-inline-start: 240px\">x</p>"
    );
}

#[test]
fn enter_splits_a_paragraph_at_the_caret() {
    let mut editor = editor("<p>hello world</p>");
    editor.select_offsets(&[0], 5, 5);

    editor.dispatch(Command::InsertParagraph).unwrap();
    assert_eq!(editor.document_html(), "<p>hello</p><p> world</p>");

    editor.type_text("X").unwrap();
    assert_eq!(editor.document_html(), "<p>hello</p><p>X world</p>");
}

#[test]
fn enter_at_the_end_of_a_heading_starts_a_paragraph() {
    let mut editor = editor("<h1>title</h1>");

    editor.dispatch(Command::InsertParagraph).unwrap();

    assert_eq!(editor.document_html(), "<h1>title</h1><p><br></p>");
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Paragraph);
}

#[test]
fn enter_inside_a_heading_keeps_both_halves_headings() {
    let mut editor = editor("<h1>ab</h1>");
    editor.select_offsets(&[0], 1, 1);

    editor.dispatch(Command::InsertParagraph).unwrap();

    assert_eq!(editor.document_html(), "<h1>a</h1><h1>b</h1>");
}

#[test]
fn enter_in_a_code_block_inserts_a_newline() {
    let mut editor = editor("<pre>ab</pre>");
    editor.select_offsets(&[0], 1, 1);

    editor.dispatch(Command::InsertParagraph).unwrap();

    assert_eq!(editor.document_html(), "<pre>a\nb</pre>");
}

#[test]
fn line_break_stays_inside_the_block() {
    let mut editor = editor("<p>ab</p>");
    editor.select_offsets(&[0], 1, 1);

    editor.dispatch(Command::InsertLineBreak).unwrap();

    assert_eq!(editor.document_html(), "<p>a<br>b</p>");
}

#[test]
fn backspace_at_block_start_merges_into_the_previous_block() {
    let mut editor = editor("<p>ab</p><p>cd</p>");
    editor.select_offsets(&[1], 0, 0);

    editor.dispatch(Command::DeleteBackward).unwrap();
    assert_eq!(editor.document_html(), "<p>abcd</p>");

    editor.type_text("X").unwrap();
    assert_eq!(editor.document_html(), "<p>abXcd</p>");
}

#[test]
fn backspace_at_the_start_of_the_document() {
    let mut editor = editor("<h2>t</h2>");
    editor.select_offsets(&[0], 0, 0);

    assert!(editor.dispatch(Command::DeleteBackward).unwrap());
    assert_eq!(editor.document_html(), "<p>t</p>");

    assert!(!editor.dispatch(Command::DeleteBackward).unwrap());
}

#[test]
fn backspace_at_block_start_removes_indent_first() {
    let mut editor = editor("<p>a</p><p style=\"padding-inline-start: 40px\">b</p>");
    editor.select_offsets(&[1], 0, 0);

    editor.dispatch(Command::DeleteBackward).unwrap();
    assert_eq!(editor.document_html(), "<p>a</p><p>b</p>");

    editor.dispatch(Command::DeleteBackward).unwrap();
    assert_eq!(editor.document_html(), "<p>ab</p>");
}

#[test]
fn backspace_removes_whole_characters() {
    let mut editor = editor("<p>سلام</p>");

    editor.dispatch(Command::DeleteBackward).unwrap();

    assert_eq!(editor.document_html(), "<p>سلا</p>");
}

#[test]
fn delete_forward_joins_the_next_block() {
    let mut editor = editor("<p>ab</p><p>cd</p>");
    editor.select_offsets(&[0], 2, 2);

    editor.dispatch(Command::DeleteForward).unwrap();
    assert_eq!(editor.document_html(), "<p>abcd</p>");

    editor.dispatch(Command::DeleteForward).unwrap();
    assert_eq!(editor.document_html(), "<p>abd</p>");

    editor.select_offsets(&[0], 3, 3);
    assert!(!editor.dispatch(Command::DeleteForward).unwrap());
}

#[test]
fn deleting_a_range_joins_its_end_blocks() {
    let mut editor = editor("<p>abc</p><h1>mid</h1><p>def</p>");
    select(&mut editor, (&[0], 1), (&[2], 1));

    editor.dispatch(Command::DeleteBackward).unwrap();

    assert_eq!(editor.document_html(), "<p>aef</p>");
}

#[test]
fn typing_over_a_range_replaces_it() {
    let mut editor = editor("<p>hello world</p>");
    editor.select_offsets(&[0], 0, 5);

    editor.type_text("bye").unwrap();

    assert_eq!(editor.document_html(), "<p>bye world</p>");
    assert!(editor.selection().is_some_and(|s| s.is_collapsed()));
}
