/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Per-concept state: eight named features, an optional sparse pattern,
//! optional phased affective components and directed connections.
//!
//! One record covers plain, affective and dual-energy concepts. Capabilities
//! are present or absent fields, not subtypes:
//!
//! ```text
//! ConceptState
//!   ├── features: Features          (always)
//!   ├── pattern:  Option<Arc<Pattern>>
//!   ├── affect:   Vec<AffectiveComponent>   (empty = no affective state)
//!   └── connections: Vec<Connection>
//! ```
//!
//! # Normalisation
//!
//! Each concept declares one [`Normalization`] and [`ConceptState::normalize`]
//! re-establishes exactly that invariant. `UnitL2` (Σ f² = 1) is the default
//! and is what the dual energies assume: a balanced concept then starts with
//! H1 and H2 both near 1. `Simplex` (features sum to 1) stays available for
//! callers that want probability-like features. An all-zero vector is valid
//! and stays all-zero under both invariants.

use std::f64::consts::{PI, TAU};
use std::sync::Arc;

use rand::Rng;

use crate::error::{ResonanceError, ResonanceResult};
use crate::pattern::Pattern;

/// Number of named features per concept.
pub const FEATURE_COUNT: usize = 8;

/// Affective components whose phase difference is within this many radians
/// of π count as opposed.
pub const OPPOSITION_TOLERANCE: f64 = 0.1;

/// Normalised interference coherence above which components reinforce.
pub const CONSTRUCTIVE_THRESHOLD: f64 = 0.7;

/// Normalised interference coherence below which components cancel.
pub const DESTRUCTIVE_THRESHOLD: f64 = 0.3;

const NORM_EPSILON: f64 = 1e-12;

// ─── Dim / Features ─────────────────────────────────────────────────────────

/// The eight named feature dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dim {
    /// Position on the meaning axis.
    Semantic,
    /// Position in time.
    Temporal,
    /// Causal charge.
    Causal,
    /// Emotional charge.
    Emotional,
    /// Relational weight.
    Relational,
    /// Likelihood.
    Probability,
    /// Activation energy.
    Energy,
    /// Internal coherence.
    Coherence,
}

impl Dim {
    /// All dimensions in storage order.
    pub const ALL: [Dim; FEATURE_COUNT] = [
        Dim::Semantic,
        Dim::Temporal,
        Dim::Causal,
        Dim::Emotional,
        Dim::Relational,
        Dim::Probability,
        Dim::Energy,
        Dim::Coherence,
    ];

    /// Storage index of this dimension.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Dim::Semantic => "semantic",
            Dim::Temporal => "temporal",
            Dim::Causal => "causal",
            Dim::Emotional => "emotional",
            Dim::Relational => "relational",
            Dim::Probability => "probability",
            Dim::Energy => "energy",
            Dim::Coherence => "coherence",
        }
    }
}

/// Dense feature vector indexed by [`Dim`].
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Features(pub [f64; FEATURE_COUNT]);

impl Features {
    /// Raw values in storage order.
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Sum of all features.
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Arithmetic mean.
    pub fn mean(&self) -> f64 {
        self.sum() / FEATURE_COUNT as f64
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.0.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / FEATURE_COUNT as f64
    }

    /// Sum of squares.
    pub fn sum_of_squares(&self) -> f64 {
        self.0.iter().map(|x| x * x).sum()
    }

    /// Euclidean norm.
    pub fn l2_norm(&self) -> f64 {
        self.sum_of_squares().sqrt()
    }

    /// Largest dimension (first on ties).
    pub fn dominant(&self) -> Dim {
        let mut best = 0;
        for i in 1..FEATURE_COUNT {
            if self.0[i] > self.0[best] {
                best = i;
            }
        }
        Dim::ALL[best]
    }

    /// Re-establish `invariant` in place. Zero vectors are left untouched.
    pub fn normalize(&mut self, invariant: Normalization) {
        let scale = match invariant {
            Normalization::Simplex => self.sum(),
            Normalization::UnitL2 => self.l2_norm(),
        };
        if scale > NORM_EPSILON {
            for x in self.0.iter_mut() {
                *x /= scale;
            }
        }
    }
}

impl core::ops::Index<Dim> for Features {
    type Output = f64;

    fn index(&self, dim: Dim) -> &f64 {
        &self.0[dim.index()]
    }
}

impl core::ops::IndexMut<Dim> for Features {
    fn index_mut(&mut self, dim: Dim) -> &mut f64 {
        &mut self.0[dim.index()]
    }
}

/// Normalisation invariant declared by a concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Normalization {
    /// Features sum to 1 (probability simplex).
    Simplex,
    /// Features have unit Euclidean norm.
    #[default]
    UnitL2,
}

// ─── Category ───────────────────────────────────────────────────────────────

/// Coarse word category assigned by a classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Things and abstractions.
    Noun,
    /// Actions and processes.
    Verb,
    /// Qualities.
    Adjective,
    /// Manner and degree.
    Adverb,
    /// Feelings.
    Emotion,
    /// Time markers.
    Temporal,
    /// Causal connectives.
    Causal,
    /// Grammatical glue.
    Function,
    /// Nothing better known.
    Unknown,
}

impl Category {
    /// Baseline feature profile for seeding new concepts of this category.
    ///
    /// Order: semantic, temporal, causal, emotional, relational, probability,
    /// energy, coherence.
    pub fn profile(self) -> [f64; FEATURE_COUNT] {
        match self {
            Category::Noun => [0.7, 0.3, 0.3, 0.3, 0.5, 0.5, 0.5, 0.6],
            Category::Verb => [0.5, 0.5, 0.7, 0.3, 0.4, 0.5, 0.8, 0.5],
            Category::Adjective => [0.6, 0.2, 0.2, 0.5, 0.4, 0.5, 0.4, 0.5],
            Category::Adverb => [0.4, 0.4, 0.3, 0.4, 0.3, 0.5, 0.5, 0.4],
            Category::Emotion => [0.5, 0.3, 0.3, 0.9, 0.5, 0.5, 0.7, 0.4],
            Category::Temporal => [0.3, 0.9, 0.4, 0.2, 0.3, 0.5, 0.4, 0.5],
            Category::Causal => [0.3, 0.5, 0.9, 0.2, 0.6, 0.5, 0.5, 0.6],
            Category::Function => [0.2, 0.3, 0.3, 0.1, 0.7, 0.8, 0.2, 0.7],
            Category::Unknown => [0.5; FEATURE_COUNT],
        }
    }
}

// ─── Affective components ───────────────────────────────────────────────────

/// One weighted, phased affective component.
///
/// Fields are private so every component, including deserialised ones, has
/// passed [`AffectiveComponent::new`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawComponent"))]
pub struct AffectiveComponent {
    label: String,
    weight: f64,
    phase: f64,
}

/// Unchecked wire form of an [`AffectiveComponent`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawComponent {
    label: String,
    weight: f64,
    phase: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawComponent> for AffectiveComponent {
    type Error = ResonanceError;

    fn try_from(raw: RawComponent) -> ResonanceResult<Self> {
        AffectiveComponent::new(raw.label, raw.weight, raw.phase)
    }
}

impl AffectiveComponent {
    /// Validate and build a component. The phase is wrapped into [0, 2π).
    pub fn new(label: impl Into<String>, weight: f64, phase: f64) -> ResonanceResult<Self> {
        let label = label.into();
        if !(weight.is_finite() && (0.0..=1.0).contains(&weight)) || !phase.is_finite() {
            return Err(ResonanceError::InvalidComponent { label, weight, phase });
        }
        Ok(Self {
            label,
            weight,
            phase: wrap_phase(phase),
        })
    }

    /// Component label, e.g. `"joy"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Weight in [0, 1].
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Phase in [0, 2π).
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Scale the signed phase offset by `factor` (in [0, 1]) toward zero.
    pub(crate) fn damp_phase(&mut self, factor: f64) {
        self.phase = wrap_phase(self.signed_phase() * factor);
    }

    /// Phase mapped into (−π, π], the signed offset from phase zero.
    pub fn signed_phase(&self) -> f64 {
        if self.phase > PI {
            self.phase - TAU
        } else {
            self.phase
        }
    }
}

/// Wrap any finite angle into [0, 2π).
fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Whether the interference of a component set reinforces or cancels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterferenceKind {
    /// Normalised coherence above [`CONSTRUCTIVE_THRESHOLD`].
    Constructive,
    /// Normalised coherence below [`DESTRUCTIVE_THRESHOLD`].
    Destructive,
    /// Anything in between, or no components at all.
    Mixed,
}

/// Phase-weighted vector sum of a concept's affective components.
///
/// ```text
/// real = Σ w·cos(φ)    imag = Σ w·sin(φ)    magnitude = √(real² + imag²)
/// coherence = magnitude / Σ w
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffectiveInterference {
    /// Real part of the sum.
    pub real: f64,
    /// Imaginary part of the sum.
    pub imag: f64,
    /// Length of the summed vector.
    pub magnitude: f64,
    /// Magnitude relative to the total weight, in [0, 1]. 0 with no weight.
    pub coherence: f64,
    /// Classification of `coherence`.
    pub kind: InterferenceKind,
}

impl AffectiveInterference {
    /// Sum a component set.
    pub fn of(components: &[AffectiveComponent]) -> Self {
        let (real, imag) = components.iter().fold((0.0, 0.0), |(re, im), c| {
            (re + c.weight * c.phase.cos(), im + c.weight * c.phase.sin())
        });
        let magnitude = (real * real + imag * imag).sqrt();
        let total: f64 = components.iter().map(|c| c.weight).sum();
        let coherence = if total > NORM_EPSILON {
            (magnitude / total).min(1.0)
        } else {
            0.0
        };
        let kind = if total <= NORM_EPSILON {
            InterferenceKind::Mixed
        } else if coherence > CONSTRUCTIVE_THRESHOLD {
            InterferenceKind::Constructive
        } else if coherence < DESTRUCTIVE_THRESHOLD {
            InterferenceKind::Destructive
        } else {
            InterferenceKind::Mixed
        };
        Self {
            real,
            imag,
            magnitude,
            coherence,
            kind,
        }
    }
}

// ─── Connections ────────────────────────────────────────────────────────────

/// Directed, weighted link to another concept.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    /// Surface identifier of the target concept.
    pub target: String,
    /// Link strength in [0, 1].
    pub strength: f64,
    /// Tick at which the link was made.
    pub timestamp: u64,
}

// ─── ConceptState ───────────────────────────────────────────────────────────

/// State of one concept / token.
///
/// Not safe for concurrent writers: clone before mutating a concept that a
/// trace search may be reading.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptState {
    /// Surface identifier.
    pub surface: String,
    /// Coarse category tag.
    pub category: Category,
    /// Feature vector, kept under `normalization`.
    pub features: Features,
    /// Declared normalisation invariant.
    pub normalization: Normalization,
    /// Sparse pattern from a [`crate::pattern::PatternSpace`], if encoded.
    pub pattern: Option<Arc<Pattern>>,
    /// Affective components in insertion order. Each one is validated on
    /// construction, so pushing directly is as safe as [`Self::add_affect`].
    pub affect: Vec<AffectiveComponent>,
    /// Outgoing connections in insertion order.
    pub connections: Vec<Connection>,
}

impl ConceptState {
    /// Build a concept from raw feature values, normalised to unit Euclidean
    /// norm.
    ///
    /// Fails on negative or non-finite values.
    pub fn new(
        surface: impl Into<String>,
        category: Category,
        features: [f64; FEATURE_COUNT],
    ) -> ResonanceResult<Self> {
        Self::with_normalization(surface, category, features, Normalization::UnitL2)
    }

    /// Build a concept under an explicit normalisation invariant.
    pub fn with_normalization(
        surface: impl Into<String>,
        category: Category,
        features: [f64; FEATURE_COUNT],
        normalization: Normalization,
    ) -> ResonanceResult<Self> {
        for dim in Dim::ALL {
            let value = features[dim.index()];
            if !(value.is_finite() && value >= 0.0) {
                return Err(ResonanceError::InvalidFeature {
                    dim: dim.name(),
                    value,
                });
            }
        }
        let mut state = Self {
            surface: surface.into(),
            category,
            features: Features(features),
            normalization,
            pattern: None,
            affect: Vec::new(),
            connections: Vec::new(),
        };
        state.normalize();
        Ok(state)
    }

    /// Seed a concept from its category profile with ±0.1 jitter drawn from
    /// `rng`, normalised to unit Euclidean norm.
    pub fn seeded<R: Rng>(
        surface: impl Into<String>,
        category: Category,
        rng: &mut R,
    ) -> Self {
        let mut raw = category.profile();
        for x in raw.iter_mut() {
            *x = (*x + rng.gen_range(-0.1..0.1)).clamp(0.0, 1.0);
        }
        let mut state = Self {
            surface: surface.into(),
            category,
            features: Features(raw),
            normalization: Normalization::UnitL2,
            pattern: None,
            affect: Vec::new(),
            connections: Vec::new(),
        };
        state.normalize();
        state
    }

    /// Attach a sparse pattern.
    pub fn with_pattern(mut self, pattern: Arc<Pattern>) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Feature value for `dim`.
    pub fn feature(&self, dim: Dim) -> f64 {
        self.features[dim]
    }

    /// Re-establish the declared normalisation invariant.
    pub fn normalize(&mut self) {
        self.features.normalize(self.normalization);
    }

    /// Add a validated affective component.
    pub fn add_affect(&mut self, component: AffectiveComponent) {
        self.affect.push(component);
    }

    /// Add a directed connection; strength is clamped to [0, 1].
    pub fn connect(&mut self, target: impl Into<String>, strength: f64, timestamp: u64) {
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        self.connections.push(Connection {
            target: target.into(),
            strength,
            timestamp,
        });
    }

    /// Phase-weighted sum of the affective components.
    pub fn interference(&self) -> AffectiveInterference {
        AffectiveInterference::of(&self.affect)
    }

    /// Number of affective component pairs in antiphase (within
    /// [`OPPOSITION_TOLERANCE`] of π).
    pub fn opposition_count(&self) -> usize {
        let mut count = 0;
        for (i, a) in self.affect.iter().enumerate() {
            for b in &self.affect[i + 1..] {
                let mut d = (a.phase - b.phase).abs() % TAU;
                if d > PI {
                    d = TAU - d;
                }
                if (d - PI).abs() < OPPOSITION_TOLERANCE {
                    count += 1;
                }
            }
        }
        count
    }

    /// Collapse the affective state onto its dominant component.
    ///
    /// Keeps the heaviest component (first on ties) at phase zero, drops the
    /// rest and returns its label. `None` when there is no affective state.
    pub fn collapse(&mut self) -> Option<String> {
        let mut best: Option<usize> = None;
        for (i, c) in self.affect.iter().enumerate() {
            match best {
                Some(b) if self.affect[b].weight >= c.weight => {}
                _ => best = Some(i),
            }
        }
        let mut kept = self.affect.swap_remove(best?);
        kept.phase = 0.0;
        let label = kept.label.clone();
        self.affect.clear();
        self.affect.push(kept);
        Some(label)
    }
}
