use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use bilingual_plate_core::{
    BilingualField, Command, Direction, EditorConfig, FieldOptions, Language, Mark,
};

fn field() -> BilingualField {
    BilingualField::new(
        Arc::new(EditorConfig::new()),
        FieldOptions::new(Direction::Ltr).initial_html("<p>مرحبا</p>"),
        FieldOptions::new(Direction::Rtl).initial_html("<p>hello</p>"),
    )
}

#[test]
fn each_language_gets_its_own_direction() {
    let field = field();

    assert_eq!(field.field(Language::Arabic).direction(), Direction::Rtl);
    assert_eq!(field.field(Language::English).direction(), Direction::Ltr);
    assert_eq!(
        field.values(),
        (
            "<div dir=\"rtl\"><p>مرحبا</p></div>".to_string(),
            "<div dir=\"ltr\"><p>hello</p></div>".to_string(),
        )
    );
    assert_eq!(Language::Arabic.code(), "ar");
    assert_eq!(Language::English.direction(), Direction::Ltr);
}

#[test]
fn editing_one_field_leaves_the_other_untouched() {
    let mut field = field();
    let english_before = field.field(Language::English).html();

    let arabic = field.field_mut(Language::Arabic);
    arabic.focus();
    arabic.type_text(" بكم").unwrap();
    arabic.select_all();
    arabic.dispatch(Command::FormatText(Mark::Bold)).unwrap();
    arabic.dispatch(Command::ToggleList { ordered: true }).unwrap();
    arabic.dispatch(Command::InsertParagraph).unwrap();
    arabic.dispatch(Command::Indent).unwrap();
    arabic.dispatch(Command::Undo).unwrap();

    let english = field.field(Language::English);
    assert_eq!(english.html(), english_before);
    assert!(!english.can_undo());
    assert!(english.selection().is_none());
    assert_eq!(english.revision(), 0);
    assert!(field.field(Language::Arabic).can_undo());
}

#[test]
fn history_is_per_field() {
    let mut field = field();
    field.field_mut(Language::English).focus();
    field
        .field_mut(Language::English)
        .type_text("!")
        .unwrap();

    let arabic = field.field_mut(Language::Arabic);
    arabic.focus();
    assert!(!arabic.dispatch(Command::Undo).unwrap());

    assert_eq!(
        field.field(Language::English).document_html(),
        "<p>hello!</p>"
    );
}

#[test]
fn callbacks_fire_for_their_own_field_only() {
    let arabic_calls = Rc::new(RefCell::new(0));
    let english_calls = Rc::new(RefCell::new(0));
    let (a, e) = (Rc::clone(&arabic_calls), Rc::clone(&english_calls));
    let mut field = BilingualField::new(
        Arc::new(EditorConfig::new()),
        FieldOptions::default().on_change(move |_| *a.borrow_mut() += 1),
        FieldOptions::default().on_change(move |_| *e.borrow_mut() += 1),
    );

    let english = field.field_mut(Language::English);
    english.focus();
    english.type_text("hi").unwrap();

    assert_eq!(*english_calls.borrow(), 1);
    assert_eq!(*arabic_calls.borrow(), 0);
}

#[test]
fn both_fields_share_one_config() {
    let field = field();

    assert!(std::ptr::eq(
        field.field(Language::Arabic).config(),
        field.field(Language::English).config()
    ));
}
