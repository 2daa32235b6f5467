//! Mapping from external player identities to session-local ids.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{team::Player, types::PlayerId};

/// Assigns small, stable [`PlayerId`]s to external identities.
///
/// New identities get one more than the highest id handed out so far, so ids
/// stay unique for the whole session even across reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, PlayerId>", into = "BTreeMap<String, PlayerId>")]
pub struct PlayerRegistry {
    by_external: HashMap<String, PlayerId>,
    by_id: HashMap<PlayerId, String>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `external`, assigning the next free one if it is new.
    pub fn ensure(&mut self, external: &str) -> PlayerId {
        if let Some(id) = self.by_external.get(external) {
            return *id;
        }
        let id = self.next_id();
        self.by_external.insert(external.to_string(), id);
        self.by_id.insert(id, external.to_string());
        id
    }

    /// Builds a [`Player`] for `external`, assigning an id when needed.
    pub fn player(&mut self, external: &str, name: impl Into<String>) -> Player {
        Player::new(self.ensure(external), name)
    }

    pub fn player_id(&self, external: &str) -> Option<PlayerId> {
        self.by_external.get(external).copied()
    }

    pub fn external_id(&self, id: PlayerId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Id the next new identity will receive.
    pub fn next_id(&self) -> PlayerId {
        self.by_id.keys().max().map_or(1, |max| max + 1)
    }

    pub fn len(&self) -> usize {
        self.by_external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_external.is_empty()
    }
}

impl From<BTreeMap<String, PlayerId>> for PlayerRegistry {
    fn from(map: BTreeMap<String, PlayerId>) -> Self {
        let mut registry = Self::new();
        for (external, id) in map {
            registry.by_id.insert(id, external.clone());
            registry.by_external.insert(external, id);
        }
        registry
    }
}

impl From<PlayerRegistry> for BTreeMap<String, PlayerId> {
    fn from(registry: PlayerRegistry) -> Self {
        registry.by_external.into_iter().collect()
    }
}
