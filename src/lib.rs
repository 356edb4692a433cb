//! # resonance-core
//!
//! Sparse distributed concept patterns, skip-trace search and dual-energy
//! stability monitoring.
//!
//! ---
//!
//! ## Three engines, one concept record
//!
//! **Sparse patterns**: every identifier hashes deterministically onto a few
//! thousand active bits of a 100 000-bit space. Overlap is meaning: the
//! Jaccard resonance of two patterns is their similarity, and superposition,
//! interference and phase rotation compose them.
//!
//! **Skip traces**: instead of reading a token sequence left to right, the
//! search jumps between concepts that resonate causally, emotionally,
//! semantically or temporally, under an energy budget. Traces are ranked by
//! how well their members hang together.
//!
//! **Dual energy**: each concept has a coherence energy H1 and a structural
//! energy H2. When they drift apart the concept is splitting into a ghost
//! state; the monitor differentiates the drift up to fourth order and can
//! nudge the concept back.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! words ─► Classifier ─► ConceptState ◄── PatternSpace.encode
//!                             │
//!              ┌──────────────┴──────────────┐
//!              ▼                             ▼
//!       SkipTraceEngine              StabilityMonitor
//!              │                             │
//!              ▼                             ▼
//!        RankedTraces ─► Generator     StabilityReport ─► stabilize()
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`pattern`] | [`Pattern`], [`PatternSpace`] | Deterministic sparse encoding and composition |
//! | [`shared`] | [`SharedPatternSpace`] | Lock-protected concept memory for many threads |
//! | [`concept`] | [`ConceptState`], [`AffectiveComponent`] | Features, affect and connections of one concept |
//! | [`trace`] | [`SkipTraceEngine`], [`RankedTraces`] | Bounded branching search and coherence ranking |
//! | [`stability`] | [`StabilityMonitor`], [`StabilityReport`] | H1/H2 history, derivatives, classification, correction |
//! | [`config`] | [`EngineConfig`], [`StabilityConfig`] | Every tunable with its default |
//! | [`lexicon`] | [`Lexicon`], [`Classifier`] | Reference word classifier |
//! | [`generation`] | [`Generator`] | Seam to an external text generator |
//! | `snapshot` | `PatternSnapshot` | Serialisable concept memory (requires `serde` feature) |
//!
//! ## Features
//!
//! - `serde`: serialisation for configs, concepts, reports and snapshots.
//! - `parallel`: search anchors concurrently with rayon. Results are merged in
//!   anchor order, so output is identical to the sequential search.
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod concept;
pub mod config;
pub mod error;
pub mod generation;
pub mod lexicon;
pub mod pattern;
pub mod shared;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod stability;
pub mod trace;

// ─── Re-exports ─────────────────────────────────────────────────────────────

pub use concept::{
    AffectiveComponent, AffectiveInterference, Category, ConceptState, Connection, Dim, Features,
    InterferenceKind, Normalization,
};
pub use config::{EngineConfig, SkipWeights, StabilityConfig};
pub use error::{ResonanceError, ResonanceResult};
pub use generation::{continue_trace, trace_prompt, Generator};
pub use lexicon::{Classification, Classifier, Lexicon};
pub use pattern::{Interference, Pattern, PatternSpace, PatternSpaceConfig, SkipJump, SkipPath};
pub use shared::SharedPatternSpace;
#[cfg(feature = "serde")]
pub use snapshot::{ConceptRecord, PatternSnapshot};
pub use stability::{
    Derivatives, EnergyHistory, EnergySample, GentleOutcome, InstabilityWarning,
    StabilityField, StabilityMonitor, StabilityReport, StabilityStatus, StabilizeIntensity,
};
pub use trace::{RankedTraces, SkipTraceEngine, Trace};
