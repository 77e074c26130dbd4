use std::sync::Arc;

use bilingual_plate_core::html;
use bilingual_plate_core::{
    ActiveBlock, Alignment, BlockKind, Command, Direction, Editor, EditorConfig, FieldOptions,
    HeadingLevel, Mark, Point, Selection, TextPosition, Toolbar, ToolbarAction, ToolbarState,
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

#[test]
fn no_selection_projects_the_defaults() {
    let doc = html::deserialize("<h1><strong>x</strong></h1>");

    let state = ToolbarState::project(&doc, None, None, true, false);

    assert_eq!(
        state,
        ToolbarState {
            can_undo: true,
            ..ToolbarState::default()
        }
    );
}

#[test]
fn range_marks_need_full_coverage_across_blocks() {
    let doc = html::deserialize("<p><em>ab</em></p><p><em>c</em>d</p>");
    let whole = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 1], 1));
    let italic_only = Selection::new(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 1));

    let state = ToolbarState::project(&doc, Some(&whole), None, false, false);
    assert!(!state.is_italic);

    let state = ToolbarState::project(&doc, Some(&italic_only), None, false, false);
    assert!(state.is_italic);
}

#[test]
fn backward_selections_project_like_forward_ones() {
    let doc = html::deserialize("<p><u>under</u> plain</p>");
    let forward = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 5));
    let backward = Selection::new(forward.focus.clone(), forward.anchor.clone());

    let a = ToolbarState::project(&doc, Some(&forward), None, false, false);
    let b = ToolbarState::project(&doc, Some(&backward), None, false, false);

    assert!(a.is_underline);
    assert_eq!(a, b);
}

#[test]
fn block_type_and_alignment_follow_the_anchor_block() {
    let doc = html::deserialize(
        "<h4 style=\"text-align: right\">a</h4><blockquote>b</blockquote><pre>c</pre><ol><li>d</li></ol>",
    );
    let at = |block: Vec<usize>| {
        let point = doc.point_at(&TextPosition::new(block, 0)).unwrap();
        ToolbarState::project(&doc, Some(&Selection::collapsed(point)), None, false, false)
    };

    let heading = at(vec![0]);
    assert_eq!(heading.block_type, ActiveBlock::Heading(h(4)));
    assert_eq!(heading.alignment, Alignment::Right);
    assert_eq!(at(vec![1]).block_type, ActiveBlock::Quote);
    assert_eq!(at(vec![2]).block_type.as_str(), "code");
    assert_eq!(at(vec![3, 0]).block_type, ActiveBlock::NumberedList);
    assert_eq!(at(vec![3, 0]).alignment, Alignment::Start);
}

#[test]
fn link_state_at_caret_and_over_a_range() {
    let mut editor = editor("<p>go <a href=\"https://a.com\">there</a> now</p>");

    editor.select_offsets(&[0], 0, 2);
    assert!(!editor.toolbar_state().is_link);

    editor.select_offsets(&[0], 1, 5);
    assert_eq!(
        editor.toolbar_state().link_url.as_deref(),
        Some("https://a.com")
    );

    editor.select_offsets(&[0], 8, 8);
    assert!(editor.toolbar_state().is_link);
    assert!(editor.toolbar_state().is_enabled(&ToolbarAction::Unlink));
}

#[test]
fn toolbar_memo_recomputes_only_when_its_inputs_move() {
    let bold = html::deserialize("<p><strong>x</strong></p>");
    let plain = html::deserialize("<p>x</p>");
    let selection = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 1));
    let mut toolbar = Toolbar::new();

    assert!(toolbar.refresh(1, &bold, Some(&selection), None, false, false).is_bold);
    assert!(toolbar.refresh(1, &plain, Some(&selection), None, false, false).is_bold);
    assert!(!toolbar.refresh(2, &plain, Some(&selection), None, false, false).is_bold);
    assert!(!toolbar.state().is_bold);
}

#[test]
fn active_block_buttons_toggle_back_to_paragraph() {
    let heading = ToolbarState {
        block_type: ActiveBlock::Heading(h(2)),
        ..ToolbarState::default()
    };
    assert_eq!(
        ToolbarAction::Heading(h(2)).command(&heading),
        Command::SetBlockType(BlockKind::Paragraph)
    );
    assert_eq!(
        ToolbarAction::Heading(h(3)).command(&heading),
        Command::SetHeading(h(3))
    );

    let quote = ToolbarState {
        block_type: ActiveBlock::Quote,
        ..ToolbarState::default()
    };
    assert_eq!(
        ToolbarAction::Quote.command(&quote),
        Command::SetBlockType(BlockKind::Paragraph)
    );
    assert_eq!(
        ToolbarAction::CodeBlock.command(&quote),
        Command::SetBlockType(BlockKind::Code)
    );
    assert_eq!(
        ToolbarAction::NumberedList.command(&quote),
        Command::ToggleList { ordered: true }
    );
    assert_eq!(
        ToolbarAction::Mark(Mark::Strikethrough).command(&quote),
        Command::FormatText(Mark::Strikethrough)
    );
}

#[test]
fn pressing_buttons_drives_the_editor() {
    let mut editor = editor("<p>title</p>");

    editor.press(&ToolbarAction::Heading(h(1))).unwrap();
    assert_eq!(editor.document_html(), "<h1>title</h1>");
    editor.press(&ToolbarAction::Heading(h(1))).unwrap();
    assert_eq!(editor.document_html(), "<p>title</p>");

    editor.press(&ToolbarAction::BulletList).unwrap();
    assert_eq!(editor.document_html(), "<ul><li>title</li></ul>");
    editor.press(&ToolbarAction::BulletList).unwrap();
    assert_eq!(editor.document_html(), "<p>title</p>");

    editor.select_offsets(&[0], 0, 5);
    editor.press(&ToolbarAction::Link("https://t.io".into())).unwrap();
    assert!(editor.toolbar_state().is_link);
    editor.press(&ToolbarAction::Unlink).unwrap();
    assert_eq!(editor.document_html(), "<p>title</p>");
    assert!(!editor.press(&ToolbarAction::Unlink).unwrap());
}

#[test]
fn selection_changes_refresh_the_projection() {
    let mut editor = editor("<h2>a</h2><p>b</p>");
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Paragraph);

    editor.select_offsets(&[0], 0, 0);
    assert_eq!(editor.toolbar_state().block_type, ActiveBlock::Heading(h(2)));
}
