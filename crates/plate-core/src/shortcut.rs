use regex::Regex;

use crate::document::HeadingLevel;

/// Block a shortcut turns the paragraph into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutTarget {
    Heading(HeadingLevel),
    BulletList,
    NumberedList,
    Quote,
    CodeBlock,
}

#[derive(Debug, Clone)]
pub struct Shortcut {
    pub id: &'static str,
    pattern: Regex,
    pub target: ShortcutTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutMatch {
    pub id: &'static str,
    pub target: ShortcutTarget,
    /// Bytes of trigger text at the start of the block.
    pub trigger_len: usize,
}

/// Markdown-style block triggers, tested against a paragraph's text up to
/// the caret. A trigger must cover that text exactly.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRegistry {
    shortcuts: Vec<Shortcut>,
}

impl ShortcutRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for level in HeadingLevel::MIN..=HeadingLevel::MAX {
            let pattern = format!("^#{{{level}}} $");
            let target = ShortcutTarget::Heading(HeadingLevel::clamped(level));
            registry
                .register("heading", &pattern, target)
                .expect("heading shortcut pattern must be valid");
        }
        let fixed = [
            ("list.bulleted", r"^[-*+] $", ShortcutTarget::BulletList),
            ("list.numbered", r"^\d+[.)] $", ShortcutTarget::NumberedList),
            ("blockquote", r"^> $", ShortcutTarget::Quote),
            ("code_block", r"^``` ?$", ShortcutTarget::CodeBlock),
        ];
        for (id, pattern, target) in fixed {
            registry
                .register(id, pattern, target)
                .expect("standard shortcut pattern must be valid");
        }
        registry
    }

    pub fn register(
        &mut self,
        id: &'static str,
        pattern: &str,
        target: ShortcutTarget,
    ) -> Result<(), regex::Error> {
        self.shortcuts.push(Shortcut {
            id,
            pattern: Regex::new(pattern)?,
            target,
        });
        Ok(())
    }

    pub fn shortcuts(&self) -> &[Shortcut] {
        &self.shortcuts
    }

    /// Lazily tries each shortcut. Callers take the first match.
    pub fn matches<'a>(
        &'a self,
        text_before_caret: &'a str,
    ) -> impl Iterator<Item = ShortcutMatch> + 'a {
        self.shortcuts.iter().filter_map(move |shortcut| {
            let found = shortcut.pattern.find(text_before_caret)?;
            (found.start() == 0 && found.end() == text_before_caret.len()).then(|| ShortcutMatch {
                id: shortcut.id,
                target: shortcut.target,
                trigger_len: found.end(),
            })
        })
    }
}
