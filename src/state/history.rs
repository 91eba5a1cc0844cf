use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::state::command::Command;

/// Command recorded on the undo or redo stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Uuid,
    /// User that issued the command.
    pub author: Uuid,
    pub command: Command,
    pub recorded_at: SystemTime,
}

impl HistoryEntry {
    pub fn new(author: Uuid, command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            command,
            recorded_at: SystemTime::now(),
        }
    }
}

/// Reasons an undo or redo request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("only the host or the author `{author}` may revert the latest entry")]
    NotAuthor { author: Uuid },
}

/// Linear undo/redo history of a game.
///
/// An entry lives on exactly one of the two stacks. Callers check permission
/// with `authorize_*`, persist the reverted state, then move the entry with
/// `commit_*`; the per-game gate keeps the stacks untouched in between.
#[derive(Debug, Default, Clone)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new command; any redo branch is discarded.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        self.redo.clear();
    }

    /// Entry that undo would revert, if `actor` may revert it.
    pub fn authorize_undo(&self, actor: Uuid, is_host: bool) -> Result<&HistoryEntry, HistoryError> {
        let entry = self.undo.last().ok_or(HistoryError::NothingToUndo)?;
        authorize(entry, actor, is_host)
    }

    /// Move the top undo entry onto the redo stack.
    pub fn commit_undo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.undo.pop()?;
        self.redo.push(entry);
        self.redo.last()
    }

    /// Entry that redo would replay, if `actor` may replay it.
    pub fn authorize_redo(&self, actor: Uuid, is_host: bool) -> Result<&HistoryEntry, HistoryError> {
        let entry = self.redo.last().ok_or(HistoryError::NothingToRedo)?;
        authorize(entry, actor, is_host)
    }

    /// Move the top redo entry back onto the undo stack.
    pub fn commit_redo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.redo.pop()?;
        self.undo.push(entry);
        self.undo.last()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Undo stack, oldest first.
    pub fn undo_entries(&self) -> &[HistoryEntry] {
        &self.undo
    }

    /// Redo stack, oldest first.
    pub fn redo_entries(&self) -> &[HistoryEntry] {
        &self.redo
    }

    /// Whether `actor` could undo right now.
    pub fn can_undo(&self, actor: Uuid, is_host: bool) -> bool {
        self.authorize_undo(actor, is_host).is_ok()
    }

    /// Whether `actor` could redo right now.
    pub fn can_redo(&self, actor: Uuid, is_host: bool) -> bool {
        self.authorize_redo(actor, is_host).is_ok()
    }
}

fn authorize(entry: &HistoryEntry, actor: Uuid, is_host: bool) -> Result<&HistoryEntry, HistoryError> {
    if is_host || entry.author == actor {
        Ok(entry)
    } else {
        Err(HistoryError::NotAuthor {
            author: entry.author,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::command::Change;

    fn entry(author: Uuid) -> HistoryEntry {
        HistoryEntry::new(
            author,
            Command::ChangeSpeaker {
                speaker: Change::new(None, Some(author)),
            },
        )
    }

    #[test]
    fn push_clears_redo() {
        let author = Uuid::new_v4();
        let mut history = History::new();
        history.push(entry(author));
        history.commit_undo();
        assert_eq!(history.redo_entries().len(), 1);

        history.push(entry(author));
        assert!(history.redo_entries().is_empty());
        assert_eq!(history.undo_entries().len(), 1);
    }

    #[test]
    fn entries_live_on_exactly_one_stack() {
        let author = Uuid::new_v4();
        let mut history = History::new();
        let first = entry(author);
        let id = first.id;
        history.push(first);

        history.commit_undo();
        assert!(history.undo_entries().iter().all(|e| e.id != id));
        assert!(history.redo_entries().iter().any(|e| e.id == id));

        history.commit_redo();
        assert!(history.undo_entries().iter().any(|e| e.id == id));
        assert!(history.redo_entries().iter().all(|e| e.id != id));
    }

    #[test]
    fn non_host_may_only_undo_own_top_entry() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut history = History::new();
        history.push(entry(alice));
        history.push(entry(bob));

        assert_eq!(
            history.authorize_undo(alice, false).unwrap_err(),
            HistoryError::NotAuthor { author: bob }
        );
        assert!(history.can_undo(bob, false));
        assert!(history.can_undo(alice, true));
    }

    #[test]
    fn empty_history_refuses_even_the_host() {
        let history = History::new();
        let host = Uuid::new_v4();
        assert_eq!(
            history.authorize_undo(host, true).unwrap_err(),
            HistoryError::NothingToUndo
        );
        assert_eq!(
            history.authorize_redo(host, true).unwrap_err(),
            HistoryError::NothingToRedo
        );
    }

    #[test]
    fn redo_permission_follows_redo_top_author() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut history = History::new();
        history.push(entry(alice));
        history.commit_undo();

        assert!(!history.can_redo(bob, false));
        assert!(history.can_redo(alice, false));
        assert!(history.can_redo(bob, true));
    }
}
