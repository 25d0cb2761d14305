//! The static catalog: shipped topics plus their pre-authored details.
//!
//! Read-only once built. Share it behind an `Arc`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use apeiron_core::error::CatalogError;
use apeiron_core::topic::{Topic, TopicDetail};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::debug;

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    topics: Vec<Topic>,
    #[serde(default)]
    details: HashMap<String, TopicDetail>,
}

/// Topics in display order, and details keyed by topic id.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    topics: Vec<Topic>,
    details: HashMap<String, TopicDetail>,
}

impl StaticCatalog {
    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load a catalog document from disk.
    pub fn load_from(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Parse `{ "topics": [...], "details": { id: detail } }`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::from_parts(document.topics, document.details)
    }

    pub fn from_parts(
        topics: Vec<Topic>,
        details: HashMap<String, TopicDetail>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for topic in &topics {
            if !seen.insert(topic.id.as_str()) {
                return Err(CatalogError::DuplicateTopic(topic.id.clone()));
            }
        }

        debug!(topics = topics.len(), details = details.len(), "Catalog loaded");
        Ok(Self { topics, details })
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn detail(&self, id: &str) -> Option<&TopicDetail> {
        self.details.get(id)
    }

    /// Best-effort lookup of a detail by display title.
    ///
    /// "Quantum Computing" is tried as `quantum-computing`. Titles whose
    /// normalized form differs from the id simply miss.
    pub fn detail_for_title(&self, title: &str) -> Option<&TopicDetail> {
        self.details.get(&title_key(title))
    }

    /// Case-insensitive substring match on title, short description or id.
    /// An empty query returns every topic.
    pub fn search(&self, query: &str) -> Vec<&Topic> {
        if query.is_empty() {
            return self.topics.iter().collect();
        }
        let needle = query.to_lowercase();
        self.topics
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.short_description.to_lowercase().contains(&needle)
                    || t.id.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Pick any topic at random.
    pub fn random_topic(&self) -> Option<&Topic> {
        self.topics.choose(&mut rand::rng())
    }

    /// Up to `count` random topics other than `id`, in random order.
    pub fn related(&self, id: &str, count: usize) -> Vec<&Topic> {
        let others: Vec<&Topic> = self.topics.iter().filter(|t| t.id != id).collect();
        others
            .choose_multiple(&mut rand::rng(), count)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Lower-case the title and replace each whitespace run with a single `-`.
pub fn title_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for c in title.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                key.push('-');
            }
            in_whitespace = true;
        } else {
            key.push(c);
            in_whitespace = false;
        }
    }
    key
}
