//! User confirmation at the edges of the core (never inside a merge).

use crate::tree::NodeKind;
use crate::types::ItemId;
use std::path::PathBuf;

/// What the user is being asked to confirm.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub item: ItemId,
    pub path: PathBuf,
    pub kind: NodeKind,
    /// Nodes under `item` that go with it.
    pub descendants: usize,
}

impl ConfirmRequest {
    pub fn message(&self) -> String {
        match (self.kind, self.descendants) {
            (NodeKind::Folder, 0) => format!("Delete folder '{}' from disk?", self.path.display()),
            (NodeKind::Folder, n) => format!(
                "Delete folder '{}' and {} item(s) below it from disk?",
                self.path.display(),
                n
            ),
            _ => format!("Delete '{}' from disk?", self.path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResponse {
    Confirmed,
    Declined,
}

pub trait ConfirmPrompt {
    fn confirm(&self, request: &ConfirmRequest) -> ConfirmResponse;
}

/// Answers every request the same way; for scripted use and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedResponse(pub ConfirmResponse);

impl ConfirmPrompt for FixedResponse {
    fn confirm(&self, _request: &ConfirmRequest) -> ConfirmResponse {
        self.0
    }
}
