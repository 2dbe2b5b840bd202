use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::ProgramKey;

/// How the user relates to a program. Client-local only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    InProgress,
    Interested,
    Applied,
    Uninterested,
    Completed,
}

impl StatusTag {
    pub const ALL: [StatusTag; 5] = [
        StatusTag::InProgress,
        StatusTag::Interested,
        StatusTag::Applied,
        StatusTag::Uninterested,
        StatusTag::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatusTag::InProgress => "In progress",
            StatusTag::Interested => "Interested",
            StatusTag::Applied => "Applied",
            StatusTag::Uninterested => "Uninterested",
            StatusTag::Completed => "Completed",
        }
    }
}

/// Tags keyed by program content hash, so they follow a program when the feed
/// reorders. Lives for one session only.
#[derive(Debug, Default, Clone)]
pub struct StatusMap {
    tags: HashMap<ProgramKey, StatusTag>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ProgramKey) -> Option<StatusTag> {
        self.tags.get(key).copied()
    }

    pub fn set(&mut self, key: ProgramKey, tag: StatusTag) {
        self.tags.insert(key, tag);
    }

    pub fn clear(&mut self, key: &ProgramKey) -> Option<StatusTag> {
        self.tags.remove(key)
    }

    /// Steps untagged → each tag in order → untagged, returning the new value.
    pub fn cycle(&mut self, key: &ProgramKey) -> Option<StatusTag> {
        let next = match self.get(key) {
            None => Some(StatusTag::ALL[0]),
            Some(current) => StatusTag::ALL
                .iter()
                .position(|t| *t == current)
                .and_then(|i| StatusTag::ALL.get(i + 1))
                .copied(),
        };
        match next {
            Some(tag) => self.set(key.clone(), tag),
            None => {
                self.clear(key);
            }
        }
        next
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
