//! Console titles as reported by `/title/list`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An installed application (or pseudo-application) on the console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Title {
    pub id: String,
    pub name: String,
}

impl Title {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Title id → display name, in the order the device (or cache file) listed them.
///
/// This is also the on-disk cache format: a single flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleList(IndexMap<String, String>);

impl TitleList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, title: Title) {
        self.0.insert(title.id, title.name);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Titles in listing order, skipping malformed entries with an empty id.
    pub fn iter(&self) -> impl Iterator<Item = Title> + '_ {
        self.0
            .iter()
            .filter(|(id, _)| !id.trim().is_empty())
            .map(|(id, name)| Title::new(id.as_str(), name.as_str()))
    }
}

impl FromIterator<Title> for TitleList {
    fn from_iter<I: IntoIterator<Item = Title>>(iter: I) -> Self {
        let mut list = Self::new();
        for title in iter {
            list.insert(title);
        }
        list
    }
}
