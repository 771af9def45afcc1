//! Visible log of action groups, backing the document history panel.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use shared::{action::ActionGroup, cursor::CursorPos, domain::ActionNum};

#[derive(Debug, Clone, PartialEq)]
pub struct ActionLogEntry {
    pub action_num: ActionNum,
    pub desc: String,
    pub user: String,
    pub time: DateTime<Utc>,
    pub is_undo: bool,
    pub cursor_pos: Option<CursorPos>,
}

impl From<&ActionGroup> for ActionLogEntry {
    fn from(group: &ActionGroup) -> Self {
        let desc = group
            .desc
            .clone()
            .filter(|desc| !desc.is_empty())
            .unwrap_or_else(|| group.actions.join("; "));
        Self {
            action_num: group.action_num,
            desc,
            user: group.user.clone(),
            time: group.time,
            is_undo: group.is_undo,
            cursor_pos: group.cursor_pos,
        }
    }
}

pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    max_entries: usize,
}

impl ActionLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push_action(&mut self, group: &ActionGroup) {
        if group.internal {
            return;
        }
        self.entries.push_back(ActionLogEntry::from(group));
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn attach_cursor(&mut self, action_num: ActionNum, cursor_pos: CursorPos) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.action_num == action_num)
        {
            entry.cursor_pos = Some(cursor_pos);
        }
    }

    /// Newest first, as the history panel shows them.
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
