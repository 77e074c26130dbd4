//! One editable field: tree, selection, history and toolbar state, wired to
//! the host through the `on_change` callback.

use std::sync::Arc;

use crate::command::{self, Command, Transition};
use crate::config::{Direction, EditorConfig, FieldOptions, OnChange, Theme};
use crate::document::{Document, ElementKind, Marks, Point, Selection, TextPosition};
use crate::error::{DocumentError, EditorError};
use crate::history::{Clock, EditKind, History, Snapshot, SystemClock};
use crate::html;
use crate::keymap::{KeyChord, Keymap};
use crate::shortcut::ShortcutRegistry;
use crate::snapshot::DocumentValue;
use crate::toolbar::{Toolbar, ToolbarAction, ToolbarState};

pub struct Editor {
    config: Arc<EditorConfig>,
    doc: Document,
    selection: Option<Selection>,
    typing_marks: Option<Marks>,
    history: History,
    direction: Direction,
    placeholder: String,
    on_change: Option<OnChange>,
    shortcuts: ShortcutRegistry,
    keymap: Keymap,
    toolbar: Toolbar,
    clock: Box<dyn Clock>,
    revision: u64,
    /// Non-empty initial content has been loaded.
    loaded: bool,
    /// A user edit has been committed.
    edited: bool,
    html: String,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("direction", &self.direction)
            .field("revision", &self.revision)
            .field("selection", &self.selection)
            .field("html", &self.html)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Builds a field from its options. Initial content is parsed here, once,
    /// and the callback is not invoked for it.
    pub fn create(config: Arc<EditorConfig>, options: FieldOptions) -> Self {
        let FieldOptions {
            initial_html,
            direction,
            placeholder,
            on_change,
        } = options;
        let doc = html::deserialize(&initial_html);
        let history = History::new(config.max_undo, config.typing_coalesce_ms);
        let mut editor = Self {
            config,
            doc,
            selection: None,
            typing_marks: None,
            history,
            direction,
            placeholder,
            on_change,
            shortcuts: ShortcutRegistry::standard(),
            keymap: Keymap::standard(),
            toolbar: Toolbar::new(),
            clock: Box::new(SystemClock::new()),
            revision: 0,
            loaded: !html::is_empty_marker(&initial_html),
            edited: false,
            html: String::new(),
        };
        editor.reserialize();
        editor.refresh_toolbar();
        editor
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_shortcuts(mut self, shortcuts: ShortcutRegistry) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn theme(&self) -> &Theme {
        &self.config.theme
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn typing_marks(&self) -> Option<Marks> {
        self.typing_marks
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Bumped by every committed edit, undo, redo and content load.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The value handed to `on_change`: the document inside its directional
    /// container.
    pub fn html(&self) -> String {
        html::wrap_direction(&self.html, self.direction, &self.config.theme)
    }

    /// The serialized document without the directional container.
    pub fn document_html(&self) -> &str {
        &self.html
    }

    pub fn document_value(&self) -> DocumentValue {
        DocumentValue::new(self.doc.clone())
    }

    pub fn toolbar_state(&self) -> &ToolbarState {
        self.toolbar.state()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Loads content that arrives after construction. Ignored once non-empty
    /// content has been loaded or the user has edited.
    pub fn sync_initial_html(&mut self, html: &str) -> bool {
        if self.loaded || self.edited {
            tracing::debug!(revision = self.revision, "ignoring late initial content");
            return false;
        }
        if html::is_empty_marker(html) {
            return false;
        }
        self.doc = html::deserialize(html);
        self.loaded = true;
        self.selection = self
            .selection
            .as_ref()
            .and_then(|sel| self.doc.clamp_selection(sel));
        self.typing_marks = None;
        self.history.clear();
        self.revision += 1;
        self.reserialize();
        self.refresh_toolbar();
        true
    }

    /// Moves the selection. Stale points are clamped onto the tree. Typing
    /// after a caret move starts a new undo step.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection.and_then(|sel| self.doc.clamp_selection(&sel));
        self.typing_marks = None;
        self.history.break_coalescing();
        self.refresh_toolbar();
    }

    /// Selects `start..end` of one text block, in block-level byte offsets.
    pub fn select_offsets(&mut self, block: &[usize], start: usize, end: usize) -> bool {
        let anchor = TextPosition::new(block.to_vec(), start);
        let focus = TextPosition::new(block.to_vec(), end);
        match self.doc.selection_between(&anchor, &focus) {
            Some(selection) => {
                self.set_selection(Some(selection));
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self) {
        let range = self.doc.first_point().zip(self.doc.last_point());
        self.set_selection(range.map(|(anchor, focus)| Selection::new(anchor, focus)));
    }

    /// Gives the field a caret at the end of the document if it has none.
    pub fn focus(&mut self) {
        if self.selection.is_none() {
            self.set_selection(self.doc.last_point().map(Selection::collapsed));
        }
    }

    pub fn blur(&mut self) {
        self.set_selection(None);
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        (self.doc.is_empty() && !self.placeholder.is_empty()).then(|| Placeholder {
            text: self.placeholder.clone(),
            direction: self.direction,
        })
    }

    /// Runs one command. Returns whether it took effect. Commands without a
    /// selection and commands that change nothing return `Ok(false)`.
    pub fn dispatch(&mut self, command: Command) -> Result<bool, EditorError> {
        let Some(selection) = self.selection.clone() else {
            tracing::debug!(command = command.name(), "no selection, ignoring command");
            return Ok(false);
        };
        match command {
            Command::Undo => return Ok(self.undo(selection)),
            Command::Redo => return Ok(self.redo(selection)),
            _ => {}
        }

        let state = Snapshot {
            doc: self.doc.clone(),
            selection,
        };
        let transition = checked(
            command.name(),
            command::apply(
                &state,
                self.typing_marks,
                &command,
                self.config.max_normalize_iterations,
            ),
        )?;
        match transition {
            Transition::Unchanged => {
                tracing::debug!(command = command.name(), "command changed nothing");
                Ok(false)
            }
            Transition::TypingMarks(marks) => {
                self.typing_marks = Some(marks);
                self.refresh_toolbar();
                Ok(true)
            }
            Transition::Edit { snapshot, kind } => {
                self.commit(command.name(), state, snapshot, kind);
                if matches!(command, Command::InsertText(_)) {
                    self.run_shortcuts()?;
                }
                Ok(true)
            }
        }
    }

    /// Types `text` at the selection.
    pub fn type_text(&mut self, text: &str) -> Result<bool, EditorError> {
        self.dispatch(Command::InsertText(text.to_owned()))
    }

    pub fn handle_key(&mut self, chord: &KeyChord) -> Result<bool, EditorError> {
        match self.keymap.lookup(chord).cloned() {
            Some(command) => self.dispatch(command),
            None => Ok(false),
        }
    }

    /// Runs a toolbar button. Disabled buttons do nothing.
    pub fn press(&mut self, action: &ToolbarAction) -> Result<bool, EditorError> {
        let state = self.toolbar.state();
        if !state.is_enabled(action) {
            return Ok(false);
        }
        let command = action.command(state);
        self.dispatch(command)
    }

    fn run_shortcuts(&mut self) -> Result<(), EditorError> {
        let Some(selection) = self.selection.clone().filter(Selection::is_collapsed) else {
            return Ok(());
        };
        let Some(caret) = self.doc.position_of(&selection.focus) else {
            return Ok(());
        };
        if self.doc.element(&caret.block).map(|el| &el.kind) != Some(&ElementKind::Paragraph) {
            return Ok(());
        }
        let Some(text) = self.doc.block_text(&caret.block) else {
            return Ok(());
        };
        let Some(before) = text.get(..caret.offset) else {
            return Ok(());
        };
        let Some(found) = self.shortcuts.matches(before).next() else {
            return Ok(());
        };

        let state = Snapshot {
            doc: self.doc.clone(),
            selection,
        };
        let transition = checked(
            found.id,
            command::apply_shortcut(&state, &found, self.config.max_normalize_iterations),
        )?;
        if let Transition::Edit { snapshot, kind } = transition {
            self.commit(found.id, state, snapshot, kind);
        }
        Ok(())
    }

    fn commit(&mut self, name: &str, before: Snapshot, after: Snapshot, kind: EditKind) {
        self.history.record(before, kind, self.clock.now_ms());
        self.install(after);
        tracing::debug!(
            command = name,
            revision = self.revision,
            html_len = self.html.len(),
            "committed edit"
        );
        self.notify();
    }

    fn undo(&mut self, selection: Selection) -> bool {
        let current = Snapshot {
            doc: self.doc.clone(),
            selection,
        };
        let Some(previous) = self.history.undo(current) else {
            tracing::debug!("nothing to undo");
            return false;
        };
        self.install(previous);
        tracing::debug!(revision = self.revision, "undo");
        self.notify();
        true
    }

    fn redo(&mut self, selection: Selection) -> bool {
        let current = Snapshot {
            doc: self.doc.clone(),
            selection,
        };
        let Some(next) = self.history.redo(current) else {
            tracing::debug!("nothing to redo");
            return false;
        };
        self.install(next);
        tracing::debug!(revision = self.revision, "redo");
        self.notify();
        true
    }

    fn install(&mut self, snapshot: Snapshot) {
        let Snapshot { doc, selection } = snapshot;
        self.doc = doc;
        self.selection = self
            .doc
            .clamp_selection(&selection)
            .or_else(|| Some(Selection::collapsed(Point::new(vec![0, 0], 0))));
        self.typing_marks = None;
        self.edited = true;
        self.revision += 1;
        self.reserialize();
        self.refresh_toolbar();
    }

    fn notify(&mut self) {
        let html = self.html();
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&html);
        }
    }

    fn reserialize(&mut self) {
        self.html = html::serialize(&self.doc, &self.config.theme);
    }

    fn refresh_toolbar(&mut self) {
        let can_undo = self.history.can_undo();
        let can_redo = self.history.can_redo();
        self.toolbar.refresh(
            self.revision,
            &self.doc,
            self.selection.as_ref(),
            self.typing_marks,
            can_undo,
            can_redo,
        );
    }
}

/// Internal document errors are bugs: logged, fatal in debug builds.
fn checked(
    name: &str,
    result: Result<Transition, DocumentError>,
) -> Result<Transition, EditorError> {
    result.map_err(|err| {
        tracing::error!(command = name, error = %err, "command failed");
        if cfg!(debug_assertions) {
            panic!("command {name} failed: {err}");
        }
        EditorError::from(err)
    })
}

/// Hint text shown while a field is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub text: String,
    pub direction: Direction,
}

impl Placeholder {
    pub fn to_html(&self, theme: &Theme) -> String {
        let mut out = String::from("<p dir=\"");
        out.push_str(self.direction.as_str());
        out.push('"');
        if let Some(class) = theme.placeholder.as_deref().filter(|c| !c.is_empty()) {
            out.push_str(" class=\"");
            html::escape_attr(class, &mut out);
            out.push('"');
        }
        out.push('>');
        html::escape_attr(&self.text, &mut out);
        out.push_str("</p>");
        out
    }
}
