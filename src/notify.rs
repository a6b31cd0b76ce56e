use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::Scope;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Updated => "updated",
            ChangeAction::Deleted => "deleted",
            ChangeAction::Restored => "restored",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row changed. `company_id` is `None` for global lookup rows; `owner_id`
/// is set when plain users other than the owner cannot read the row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub entity: &'static str,
    pub action: ChangeAction,
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    #[serde(skip)]
    pub owner_id: Option<Uuid>,
}

impl ChangeEvent {
    /// Whether a subscriber reading through `scope` could see the changed row.
    pub fn visible_to(&self, scope: Scope) -> bool {
        let company = match (scope.company_id, self.company_id) {
            (None, _) | (_, None) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
        };
        let owner = match (scope.owner_id, self.owner_id) {
            (None, _) | (_, None) => true,
            (Some(me), Some(owner)) => me == owner,
        };
        company && owner
    }
}

/// Fan-out of change events to every open notification stream.
pub struct Notifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No open streams is the common case.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
