//! Undo/Redo history for reconciliation commands

use crate::command::{ReconCommand, UndoLog};

pub struct History {
    undo_stack: Vec<ReconCommand>,
    redo_stack: Vec<ReconCommand>,
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    fn push_entry(&mut self, command: ReconCommand) {
        self.undo_stack.push(command);
        self.redo_stack.clear();

        // Limit history size
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the last command for undo; the caller applies it
    pub fn undo(&mut self) -> Option<ReconCommand> {
        let command = self.undo_stack.pop()?;
        self.redo_stack.push(command.clone());
        Some(command)
    }

    /// Pop from redo stack; the caller re-applies it
    pub fn redo(&mut self) -> Option<ReconCommand> {
        let command = self.redo_stack.pop()?;
        self.undo_stack.push(command.clone());
        Some(command)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    /// Descriptions of the undoable commands, oldest first.
    pub fn descriptions(&self) -> Vec<String> {
        self.undo_stack.iter().map(ReconCommand::description).collect()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoLog for History {
    fn record(&mut self, command: ReconCommand) {
        self.push_entry(command);
    }
}
