use serde::{Deserialize, Serialize};

use crate::document::HeadingLevel;
use crate::error::EditorError;

pub const DEFAULT_MAX_UNDO: usize = 200;
pub const DEFAULT_TYPING_COALESCE_MS: u64 = 500;

/// Immutable settings shared by every field of a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo entries kept per field; the oldest are dropped past this.
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
    /// Typing pauses longer than this start a new undo entry.
    pub typing_coalesce_ms: u64,
    pub theme: Theme,
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default().with_defaults()
    }

    /// Replaces zero values with the built-in defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = DEFAULT_MAX_UNDO;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = crate::ops::DEFAULT_MAX_NORMALIZE_ITERATIONS;
        }
        if self.typing_coalesce_ms == 0 {
            self.typing_coalesce_ms = DEFAULT_TYPING_COALESCE_MS;
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, EditorError> {
        let config: Self = serde_json::from_str(s)?;
        Ok(config.with_defaults())
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

/// CSS class names emitted by the serializer. Unset entries emit no class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub root: Option<String>,
    pub paragraph: Option<String>,
    pub quote: Option<String>,
    pub code: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub h3: Option<String>,
    pub h4: Option<String>,
    pub h5: Option<String>,
    pub list_ordered: Option<String>,
    pub list_unordered: Option<String>,
    pub list_item: Option<String>,
    pub link: Option<String>,
    pub placeholder: Option<String>,
}

impl Theme {
    pub fn heading(&self, level: HeadingLevel) -> Option<&str> {
        let class = match level.get() {
            1 => &self.h1,
            2 => &self.h2,
            3 => &self.h3,
            4 => &self.h4,
            _ => &self.h5,
        };
        class.as_deref()
    }

    pub fn list(&self, ordered: bool) -> Option<&str> {
        if ordered {
            self.list_ordered.as_deref()
        } else {
            self.list_unordered.as_deref()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

pub type OnChange = Box<dyn FnMut(&str)>;

/// Per-field construction parameters.
pub struct FieldOptions {
    pub initial_html: String,
    pub direction: Direction,
    pub placeholder: String,
    pub on_change: Option<OnChange>,
}

impl FieldOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            initial_html: String::new(),
            direction,
            placeholder: String::new(),
            on_change: None,
        }
    }

    pub fn initial_html(mut self, html: impl Into<String>) -> Self {
        self.initial_html = html.into();
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn on_change(mut self, on_change: impl FnMut(&str) + 'static) -> Self {
        self.on_change = Some(Box::new(on_change));
        self
    }
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self::new(Direction::Ltr)
    }
}

impl std::fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldOptions")
            .field("initial_html", &self.initial_html)
            .field("direction", &self.direction)
            .field("placeholder", &self.placeholder)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
