//! Seam to the remote document server.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{action::UserAction, domain::ActionNum};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Label of the bundle the actions belong to; bundled actions undo as one step.
    pub bundle: Option<String>,
    pub desc: Option<String>,
}

#[async_trait]
pub trait DocChannel: Send + Sync {
    /// File descriptor of the open document; broadcasts for other docs carry another one.
    fn doc_fd(&self) -> i64;
    /// Sends user actions and returns one result value per action.
    ///
    /// The server broadcasts the resulting action group before it acknowledges.
    async fn send_actions(&self, actions: Vec<UserAction>, options: SendOptions)
        -> Result<Vec<Value>>;
    /// Re-applies (`undo == false`) or reverts (`undo == true`) earlier action groups.
    async fn apply_user_actions_by_id(
        &self,
        action_nums: Vec<ActionNum>,
        action_hashes: Vec<String>,
        undo: bool,
    ) -> Result<()>;
}

pub struct MissingDocChannel;

#[async_trait]
impl DocChannel for MissingDocChannel {
    fn doc_fd(&self) -> i64 {
        -1
    }

    async fn send_actions(
        &self,
        actions: Vec<UserAction>,
        _options: SendOptions,
    ) -> Result<Vec<Value>> {
        let names: Vec<&str> = actions.iter().map(UserAction::name).collect();
        Err(anyhow!(
            "document channel unavailable; dropped {}",
            names.join(", ")
        ))
    }

    async fn apply_user_actions_by_id(
        &self,
        _action_nums: Vec<ActionNum>,
        _action_hashes: Vec<String>,
        _undo: bool,
    ) -> Result<()> {
        Err(anyhow!("document channel unavailable"))
    }
}
