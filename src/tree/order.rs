//! Sibling ordering.
//!
//! Children of a node are kept in one total order: sort-priority class
//! descending, then caption compared case-insensitively, descending. The
//! descending caption tie-break is a fixed display contract. Captions that fold
//! to the same text (`A.txt` / `a.txt` on a case-sensitive disk) are separated by
//! their exact text, also descending, so the order stays total.

use serde::Serialize;
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

/// Precomputed ordering key of a node or a live directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    priority: i32,
    #[serde(skip)]
    folded: String,
    caption: String,
}

impl SortKey {
    pub fn new(priority: i32, caption: String) -> Self {
        let folded = fold_caption(&caption);
        Self {
            priority,
            folded,
            caption,
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Position of `self` relative to `other` among siblings.
    ///
    /// `Less` means `self` is displayed before `other`.
    pub fn display_cmp(&self, other: &SortKey) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.folded.cmp(&self.folded))
            .then_with(|| other.caption.cmp(&self.caption))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_cmp(other)
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn fold_caption(caption: &str) -> String {
    caption.nfc().collect::<String>().to_lowercase()
}
