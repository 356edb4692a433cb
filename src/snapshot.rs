//! Serializable concept memory.
//!
//! A [`PatternSnapshot`] is the configuration of a [`PatternSpace`] plus every
//! remembered identifier with its active bit indices. Restoring it yields a
//! space whose `get(id)` is bit-identical to the original, including composed
//! patterns bound with `remember`. The format is plain serde data; pick any
//! serde format (JSON, bincode, ...) at the call site.

use serde::{Deserialize, Serialize};

use crate::error::{ResonanceError, ResonanceResult};
use crate::pattern::{Pattern, PatternSpace, PatternSpaceConfig};

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One remembered concept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord {
    /// Identifier.
    pub id: String,
    /// Active bit indices, ascending.
    pub indices: Vec<u32>,
}

/// Persisted form of a [`PatternSpace`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSnapshot {
    /// Layout version, see [`SNAPSHOT_VERSION`].
    pub version: u32,
    /// Pattern width.
    pub dim: usize,
    /// Encoder sparsity.
    pub sparsity: f64,
    /// Encoder seed.
    pub seed: u64,
    /// Remembered concepts sorted by id.
    pub concepts: Vec<ConceptRecord>,
}

impl PatternSnapshot {
    /// Capture the configuration and concept memory of `space`.
    pub fn from_space(space: &PatternSpace) -> Self {
        let config = space.config();
        let mut concepts: Vec<ConceptRecord> = space
            .iter()
            .map(|(id, p)| ConceptRecord {
                id: id.to_owned(),
                // dim is validated to fit in u32
                indices: p.active_indices().map(|i| i as u32).collect(),
            })
            .collect();
        concepts.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            version: SNAPSHOT_VERSION,
            dim: config.dim,
            sparsity: config.sparsity,
            seed: config.seed,
            concepts,
        }
    }

    /// Rebuild the space. Fails on an unknown version, an invalid
    /// configuration, duplicate ids or out-of-range indices.
    pub fn restore(&self) -> ResonanceResult<PatternSpace> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ResonanceError::Snapshot(format!(
                "unsupported version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        let mut space = PatternSpace::new(PatternSpaceConfig {
            dim: self.dim,
            sparsity: self.sparsity,
            seed: self.seed,
        })
        .map_err(|e| ResonanceError::Snapshot(e.to_string()))?;

        for record in &self.concepts {
            if space.contains(&record.id) {
                return Err(ResonanceError::Snapshot(format!(
                    "duplicate concept '{}'",
                    record.id
                )));
            }
            let pattern = Pattern::from_indices(self.dim, record.indices.iter().map(|&i| i as usize))
                .map_err(|e| ResonanceError::Snapshot(format!("concept '{}': {}", record.id, e)))?;
            space.remember(&record.id, pattern)?;
        }
        Ok(space)
    }
}
