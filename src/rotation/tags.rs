//! Tag filter seam
//!
//! Which items are eligible for rotation is restricted by an externally
//! supplied predicate over the item's tag set. The filter grammar is not a
//! concern of the rotation core: it only needs a match test and an equality
//! test so a redundant filter update can be ignored.

use std::fmt;
use std::sync::Arc;

/// Predicate deciding which media objects are currently eligible.
pub trait TagFilter: Send + Sync + fmt::Debug {
    /// Whether an item carrying `tags` passes the filter.
    fn matches(&self, tags: &[String]) -> bool;

    /// Canonical representation of the filter, the basis for equality.
    fn key(&self) -> String;

    fn equals(&self, other: &dyn TagFilter) -> bool {
        self.key() == other.key()
    }
}

/// The filter in effect before any was set: everything passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl TagFilter for MatchAll {
    fn matches(&self, _tags: &[String]) -> bool {
        true
    }

    fn key(&self) -> String {
        "*".to_string()
    }
}

/// Any-of filter over a plain tag list, the form the wire protocol carries.
///
/// An item matches when it shares at least one tag with the list; an empty
/// list behaves like [`MatchAll`]. Tags are compared case-insensitively.
#[derive(Debug, Clone)]
pub struct TagList {
    tags: Vec<String>,
}

impl TagList {
    pub fn new(tags: Vec<String>) -> Self {
        let mut tags: Vec<String> = tags
            .into_iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        Self { tags }
    }
}

impl TagFilter for TagList {
    fn matches(&self, tags: &[String]) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        tags.iter()
            .any(|tag| self.tags.binary_search(&tag.trim().to_lowercase()).is_ok())
    }

    fn key(&self) -> String {
        if self.tags.is_empty() {
            "*".to_string()
        } else {
            self.tags.join(",")
        }
    }
}

/// The default filter of a fresh queue.
pub fn match_all() -> Arc<dyn TagFilter> {
    Arc::new(MatchAll)
}
