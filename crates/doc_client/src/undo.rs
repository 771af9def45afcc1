//! Undo/redo history of this session's own action groups.

use std::collections::VecDeque;

use shared::{action::ActionGroup, cursor::CursorPos, domain::ActionNum};

/// What the controller must ask the server to re-apply or revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayTarget {
    pub action_nums: Vec<ActionNum>,
    pub action_hashes: Vec<String>,
    pub cursor_pos: Option<CursorPos>,
}

impl ReplayTarget {
    fn from_group(group: &ActionGroup) -> Self {
        Self {
            action_nums: vec![group.action_num],
            action_hashes: vec![group.action_hash.clone()],
            cursor_pos: group.cursor_pos,
        }
    }
}

/// Groups before `pointer` can be undone; groups from `pointer` on can be redone.
pub struct UndoStack {
    groups: VecDeque<ActionGroup>,
    pointer: usize,
    max_entries: usize,
}

impl UndoStack {
    pub fn new(max_entries: usize) -> Self {
        Self {
            groups: VecDeque::new(),
            pointer: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Records an own action group. Groups produced by undo/redo are not recorded again.
    pub fn push_action(&mut self, group: ActionGroup) {
        if group.is_undo || group.internal || !group.from_self {
            return;
        }
        self.groups.truncate(self.pointer);
        self.groups.push_back(group);
        if self.groups.len() > self.max_entries {
            self.groups.pop_front();
        }
        self.pointer = self.groups.len();
    }

    /// Stores the cursor to return to when `action_num` is undone or redone.
    pub fn attach_cursor(&mut self, action_num: ActionNum, cursor_pos: CursorPos) -> bool {
        match self
            .groups
            .iter_mut()
            .rev()
            .find(|group| group.action_num == action_num)
        {
            Some(group) => {
                group.cursor_pos = Some(cursor_pos);
                true
            }
            None => false,
        }
    }

    pub fn undo_target(&self) -> Option<ReplayTarget> {
        self.pointer
            .checked_sub(1)
            .and_then(|index| self.groups.get(index))
            .map(ReplayTarget::from_group)
    }

    pub fn redo_target(&self) -> Option<ReplayTarget> {
        self.groups.get(self.pointer).map(ReplayTarget::from_group)
    }

    /// Moves the pointer back after the server accepted an undo.
    pub fn mark_undone(&mut self) {
        self.pointer = self.pointer.saturating_sub(1);
    }

    /// Moves the pointer forward after the server accepted a redo.
    pub fn mark_redone(&mut self) {
        self.pointer = (self.pointer + 1).min(self.groups.len());
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer < self.groups.len()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, action_num: ActionNum) -> Option<&ActionGroup> {
        self.groups.iter().find(|group| group.action_num == action_num)
    }
}

#[cfg(test)]
#[path = "tests/undo_tests.rs"]
mod tests;
