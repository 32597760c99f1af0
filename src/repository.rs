use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

use crate::segment::Segment;
use crate::store::Store;
use crate::toggle::Toggle;

/// One immutable snapshot of toggles and segments.
///
/// A snapshot is never modified once it is visible to evaluations; a newer configuration is
/// built as a new Repository and swapped in through a [RepositoryHandle].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "RepositoryRepr")]
pub struct Repository {
    toggles: HashMap<String, Toggle>,
    segments: HashMap<String, Segment>,
    initialized: bool,
    updated_at: Option<DateTime<Utc>>,
}

/// Wire form of a snapshot. Absent or null maps read as empty.
#[serde_as]
#[derive(Deserialize)]
struct RepositoryRepr {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    toggles: HashMap<String, Toggle>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    segments: HashMap<String, Segment>,
}

impl From<RepositoryRepr> for Repository {
    fn from(repr: RepositoryRepr) -> Self {
        let mut toggles = repr.toggles;
        for (key, toggle) in toggles.iter_mut() {
            if toggle.key.is_empty() {
                toggle.key = key.clone();
            }
        }
        let mut segments = repr.segments;
        for (key, segment) in segments.iter_mut() {
            if segment.key.is_empty() {
                segment.key = key.clone();
            }
        }

        Repository {
            toggles,
            segments,
            initialized: false,
            updated_at: None,
        }
    }
}

impl Repository {
    /// Build a snapshot from the JSON document served to SDKs. The result is not yet marked as
    /// initialized; see [Repository::initialized_at].
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_json_value(json: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(json)
    }

    /// Mark this snapshot as a complete configuration received at `updated_at`.
    pub fn initialized_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.initialized = true;
        self.updated_at = Some(updated_at);
        self
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn toggles(&self) -> &HashMap<String, Toggle> {
        &self.toggles
    }

    pub fn segments(&self) -> &HashMap<String, Segment> {
        &self.segments
    }
}

impl Store for Repository {
    fn toggle(&self, toggle_key: &str) -> Option<&Toggle> {
        self.toggles.get(toggle_key)
    }

    fn segment(&self, segment_key: &str) -> Option<&Segment> {
        self.segments.get(segment_key)
    }
}

/// Shared slot holding the current [Repository].
///
/// Readers take a reference-counted snapshot with [RepositoryHandle::load] and evaluate against
/// it for as long as they need; a concurrent [RepositoryHandle::store] only replaces the pointer,
/// so a reader never sees toggles of one snapshot next to segments of another.
#[derive(Debug, Default)]
pub struct RepositoryHandle {
    current: ArcSwap<Repository>,
}

impl RepositoryHandle {
    pub fn new(repository: Repository) -> Self {
        Self {
            current: ArcSwap::from_pointee(repository),
        }
    }

    pub fn load(&self) -> Arc<Repository> {
        self.current.load_full()
    }

    /// Publish a new snapshot, returning the previous one.
    pub fn store(&self, repository: Repository) -> Arc<Repository> {
        debug!(
            "swapping repository snapshot: {} toggles, {} segments",
            repository.toggles.len(),
            repository.segments.len()
        );
        self.current.swap(Arc::new(repository))
    }

    /// Replace the current snapshot with an empty, uninitialized one.
    pub fn clear(&self) -> Arc<Repository> {
        self.current.swap(Arc::new(Repository::default()))
    }
}
