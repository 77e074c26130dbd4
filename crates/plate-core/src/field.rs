use std::sync::Arc;

use crate::config::{Direction, EditorConfig, FieldOptions};
use crate::editor::Editor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Arabic,
    English,
}

impl Language {
    pub fn direction(self) -> Direction {
        match self {
            Language::Arabic => Direction::Rtl,
            Language::English => Direction::Ltr,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }
}

/// The two editors behind one bilingual form field. They share the config
/// and nothing else.
#[derive(Debug)]
pub struct BilingualField {
    arabic: Editor,
    english: Editor,
}

impl BilingualField {
    /// The direction in each options value is overridden by its language.
    pub fn new(
        config: Arc<EditorConfig>,
        mut arabic: FieldOptions,
        mut english: FieldOptions,
    ) -> Self {
        arabic.direction = Language::Arabic.direction();
        english.direction = Language::English.direction();
        Self {
            arabic: Editor::create(Arc::clone(&config), arabic),
            english: Editor::create(config, english),
        }
    }

    pub fn field(&self, language: Language) -> &Editor {
        match language {
            Language::Arabic => &self.arabic,
            Language::English => &self.english,
        }
    }

    pub fn field_mut(&mut self, language: Language) -> &mut Editor {
        match language {
            Language::Arabic => &mut self.arabic,
            Language::English => &mut self.english,
        }
    }

    /// Both serialized values, Arabic first.
    pub fn values(&self) -> (String, String) {
        (self.arabic.html(), self.english.html())
    }
}
