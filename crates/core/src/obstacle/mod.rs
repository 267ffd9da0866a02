use std::fmt;

use serde::{Deserialize, Serialize};

use crate::zone::ZoneBounds;

/// Stable identity of one trigger volume.
///
/// Distinct volumes belonging to the same visual obstacle must use distinct
/// identities so overlapping volumes are tracked independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleId(String);

impl ObstacleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObstacleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObstacleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Zone definition of a currently overlapping obstacle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObstacleEntry {
    pub id: ObstacleId,
    pub bounds: ZoneBounds,
    pub priority: u32,
}

/// Notification emitted when the resolved active obstacle changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveObstacleChange {
    Changed(ObstacleEntry),
    Cleared,
}

/// Set of obstacle zones the player currently overlaps.
///
/// Entries are kept in insertion order, which is what breaks priority ties:
/// the earliest still-registered entry holding the highest priority wins.
/// Re-entering an identity updates it in place and keeps its position.
#[derive(Debug, Default, Clone)]
pub struct ObstacleRegistry {
    entries: Vec<ObstacleEntry>,
    active: Option<(ObstacleId, u32)>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &ObstacleId) -> bool {
        self.position(id).is_some()
    }

    pub fn entries(&self) -> &[ObstacleEntry] {
        &self.entries
    }

    /// Inserts or replaces the entry for `id` and re-resolves the winner.
    pub fn enter(
        &mut self,
        id: ObstacleId,
        bounds: ZoneBounds,
        priority: u32,
    ) -> Option<ActiveObstacleChange> {
        match self.position(&id) {
            Some(index) => {
                tracing::debug!(%id, priority, "obstacle re-entered, replacing entry");
                let entry = &mut self.entries[index];
                entry.bounds = bounds;
                entry.priority = priority;
            }
            None => {
                tracing::debug!(%id, priority, "obstacle entered");
                self.entries.push(ObstacleEntry {
                    id,
                    bounds,
                    priority,
                });
            }
        }
        self.resolve()
    }

    /// Removes the entry for `id`. Unknown identities are tolerated.
    pub fn exit(&mut self, id: &ObstacleId) -> Option<ActiveObstacleChange> {
        match self.position(id) {
            Some(index) => {
                self.entries.remove(index);
                tracing::debug!(%id, remaining = self.entries.len(), "obstacle exited");
            }
            None => {
                tracing::warn!(%id, "exit without a matching enter ignored");
            }
        }
        self.resolve()
    }

    /// Highest priority entry, or `None` when nothing overlaps.
    pub fn active(&self) -> Option<&ObstacleEntry> {
        let (id, _) = self.active.as_ref()?;
        self.position(id).map(|index| &self.entries[index])
    }

    fn position(&self, id: &ObstacleId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.id == id)
    }

    fn winner(&self) -> Option<&ObstacleEntry> {
        let mut best: Option<&ObstacleEntry> = None;
        for entry in &self.entries {
            if best.map_or(true, |current| entry.priority > current.priority) {
                best = Some(entry);
            }
        }
        best
    }

    fn resolve(&mut self) -> Option<ActiveObstacleChange> {
        let winner = self.winner().cloned();
        match winner {
            None => self.active.take().map(|_| ActiveObstacleChange::Cleared),
            Some(entry) => {
                let key = (entry.id.clone(), entry.priority);
                if self.active.as_ref() == Some(&key) {
                    return None;
                }
                self.active = Some(key);
                Some(ActiveObstacleChange::Changed(entry))
            }
        }
    }
}
