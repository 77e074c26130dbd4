use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use crate::document::{Document, Path, Selection};

/// A complete editor state: the tree plus the selection over it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub doc: Document,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    /// Character-level typing inside one text block. Coalescible.
    Typing { block: Path },
    /// Any other command. Always its own undo entry.
    Discrete,
}

/// Millisecond time source for typing coalescing.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock moved by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug, Clone)]
struct OpenTyping {
    block: Path,
    last_ms: u64,
}

/// Undo and redo stacks of whole snapshots. Each undo entry holds the state
/// from before the edit it reverts.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    max_undo: usize,
    coalesce_ms: u64,
    typing: Option<OpenTyping>,
}

impl History {
    pub fn new(max_undo: usize, coalesce_ms: u64) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_undo: max_undo.max(1),
            coalesce_ms,
            typing: None,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Records a committed edit. `before` is the state the edit started
    /// from. Typing in the same block within the pause window extends the
    /// open entry instead of pushing a new one.
    pub fn record(&mut self, before: Snapshot, kind: EditKind, now_ms: u64) {
        self.redo.clear();

        if let EditKind::Typing { block } = &kind {
            let extends = self.typing.as_ref().is_some_and(|open| {
                open.block == *block && now_ms.saturating_sub(open.last_ms) <= self.coalesce_ms
            });
            if extends && !self.undo.is_empty() {
                tracing::trace!(block = ?block, "coalescing typing edit");
                if let Some(open) = self.typing.as_mut() {
                    open.last_ms = now_ms;
                }
                return;
            }
        }

        self.undo.push_back(before);
        while self.undo.len() > self.max_undo {
            self.undo.pop_front();
        }
        self.typing = match kind {
            EditKind::Typing { block } => Some(OpenTyping {
                block,
                last_ms: now_ms,
            }),
            EditKind::Discrete => None,
        };
    }

    /// Pops the latest entry and files `current` for redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        self.typing = None;
        Some(previous)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        while self.undo.len() > self.max_undo {
            self.undo.pop_front();
        }
        self.typing = None;
        Some(next)
    }

    /// Ends the open typing entry so the next keystroke starts a new one.
    pub fn break_coalescing(&mut self) {
        self.typing = None;
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.typing = None;
    }
}
