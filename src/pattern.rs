/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Sparse distributed concept patterns and their composition operators.
//!
//! A [`PatternSpace`] projects arbitrary identifiers into a fixed-width bit
//! space with a small fraction of bits set, remembers every projection, and
//! composes patterns with set operations:
//!
//! | Operation | Set algebra | Meaning |
//! |-----------|-------------|---------|
//! | [`PatternSpace::superpose`] | OR | hold several concepts at once |
//! | [`PatternSpace::interfere`] | AND | what two concepts share |
//! | [`Pattern::resonance`] | \|AND\| / \|OR\| | Jaccard similarity |
//! | [`PatternSpace::apply_phase`] | index rotation | phase-shifted copy |
//! | [`PatternSpace::weighted_superpose`] | weighted vote | phase-aware blending |
//! | [`PatternSpace::decode`] | linear scan | associative recall |
//!
//! # Invariants
//!
//! - Encoding the same identifier twice in one space returns the same pattern.
//! - Stored patterns are shared immutably (`Arc<Pattern>`); composition always
//!   builds a new pattern.
//! - Operands of different widths are rejected, never truncated.
//! - Resonance over empty patterns is 0, never NaN.

use std::f64::consts::TAU;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::{ResonanceError, ResonanceResult};

/// Default pattern width in bits.
pub const DEFAULT_DIM: usize = 100_000;

/// Default fraction of active bits.
pub const DEFAULT_SPARSITY: f64 = 0.02;

/// Default hash seed.
pub const DEFAULT_SEED: u64 = 0x5eed_c0de_0f5d_2026;

/// Minimum resonance for an intermediate to join a skip path.
pub const SKIP_INCLUDE_THRESHOLD: f64 = 0.1;

/// Minimum resonance for the end concept to close a skip path.
pub const SKIP_END_THRESHOLD: f64 = 0.05;

const WORD_BITS: usize = 64;

const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

// Weighted sums are compared strictly above one half; this absorbs rounding
// so that exactly-half sums never leak through.
const VOTE_EPSILON: f64 = 1e-9;

// ─── Pattern ────────────────────────────────────────────────────────────────

/// Fixed-width bit pattern, stored packed in 64-bit words.
///
/// Deserialisation re-checks the packing: exactly `⌈dim / 64⌉` words and no
/// bit set at or beyond `dim`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "PackedPattern"))]
pub struct Pattern {
    dim: usize,
    words: Vec<u64>,
}

/// Unchecked wire form of a [`Pattern`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PackedPattern {
    dim: usize,
    words: Vec<u64>,
}

#[cfg(feature = "serde")]
impl TryFrom<PackedPattern> for Pattern {
    type Error = ResonanceError;

    fn try_from(packed: PackedPattern) -> ResonanceResult<Self> {
        Pattern::from_words(packed.dim, packed.words)
    }
}

impl Pattern {
    /// Rebuild a pattern from packed 64-bit words, least significant bit first.
    ///
    /// Fails with [`ResonanceError::InvalidPattern`] unless there are exactly
    /// `⌈dim / 64⌉` words and no bit at or beyond `dim` is set.
    pub fn from_words(dim: usize, words: Vec<u64>) -> ResonanceResult<Self> {
        let expected = dim.div_ceil(WORD_BITS);
        if words.len() != expected {
            return Err(ResonanceError::InvalidPattern(format!(
                "{} words for dimension {}, expected {}",
                words.len(),
                dim,
                expected
            )));
        }
        let tail = dim % WORD_BITS;
        if let Some(&last) = words.last() {
            if tail != 0 && last >> tail != 0 {
                return Err(ResonanceError::InvalidPattern(format!(
                    "bits set beyond dimension {}",
                    dim
                )));
            }
        }
        Ok(Self { dim, words })
    }

    /// Packed 64-bit words, least significant bit first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// All-zero pattern of width `dim`.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            words: vec![0; dim.div_ceil(WORD_BITS)],
        }
    }

    /// Build a pattern from explicit active-bit indices.
    ///
    /// Fails with [`ResonanceError::IndexOutOfRange`] if any index is `>= dim`.
    /// Duplicate indices are harmless.
    pub fn from_indices<I>(dim: usize, indices: I) -> ResonanceResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut p = Self::empty(dim);
        for index in indices {
            if index >= dim {
                return Err(ResonanceError::IndexOutOfRange { index, dim });
            }
            p.set(index);
        }
        Ok(p)
    }

    /// Width in bits.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of set bits.
    pub fn active_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Fraction of set bits (0.0 for a zero-width pattern).
    pub fn density(&self) -> f64 {
        if self.dim == 0 {
            0.0
        } else {
            self.active_count() as f64 / self.dim as f64
        }
    }

    /// Whether bit `index` is set. Out-of-range indices read as unset.
    pub fn is_active(&self, index: usize) -> bool {
        index < self.dim && (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    /// Active-bit indices in ascending order.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut bits = word;
            core::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(wi * WORD_BITS + tz)
            })
        })
    }

    /// Jaccard similarity `|a ∧ b| / |a ∨ b|` in [0.0, 1.0].
    ///
    /// Two empty patterns resonate at 0.0.
    pub fn resonance(&self, other: &Pattern) -> ResonanceResult<f64> {
        self.ensure_same_dim(other)?;
        Ok(jaccard(self, other))
    }

    /// Bitwise AND of two patterns.
    pub fn overlap(&self, other: &Pattern) -> ResonanceResult<Pattern> {
        self.ensure_same_dim(other)?;
        Ok(Pattern {
            dim: self.dim,
            words: self.words.iter().zip(&other.words).map(|(a, b)| a & b).collect(),
        })
    }

    /// Number of bits set in both patterns.
    pub fn overlap_count(&self, other: &Pattern) -> ResonanceResult<usize> {
        self.ensure_same_dim(other)?;
        Ok(set_counts(self, other).0)
    }

    fn set(&mut self, index: usize) {
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    fn ensure_same_dim(&self, other: &Pattern) -> ResonanceResult<()> {
        if self.dim != other.dim {
            return Err(ResonanceError::DimensionMismatch {
                expected: self.dim,
                found: other.dim,
            });
        }
        Ok(())
    }
}

impl AsRef<Pattern> for Pattern {
    fn as_ref(&self) -> &Pattern {
        self
    }
}

/// `(|a ∧ b|, |a ∨ b|)` for patterns already known to share a width.
fn set_counts(a: &Pattern, b: &Pattern) -> (usize, usize) {
    a.words.iter().zip(&b.words).fold((0, 0), |(and, or), (x, y)| {
        (
            and + (x & y).count_ones() as usize,
            or + (x | y).count_ones() as usize,
        )
    })
}

pub(crate) fn jaccard(a: &Pattern, b: &Pattern) -> f64 {
    let (and, or) = set_counts(a, b);
    if or == 0 {
        0.0
    } else {
        and as f64 / or as f64
    }
}

// ─── Hashing ────────────────────────────────────────────────────────────────

/// SplitMix64 finaliser: full avalanche over 64 bits.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seeded FNV-1a over the identifier, one independent hash per `channel`.
fn channel_hash(seed: u64, channel: u64, id: &str) -> u64 {
    let mut h = FNV_OFFSET ^ mix64(seed ^ channel.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    for &b in id.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    mix64(h)
}

// ─── PatternSpaceConfig ─────────────────────────────────────────────────────

/// Width, sparsity and hash seed of a [`PatternSpace`].
///
/// Two spaces with equal configs project every identifier identically.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct PatternSpaceConfig {
    /// Pattern width in bits. Default 100 000.
    pub dim: usize,
    /// Fraction of active bits per encoded concept. Default 0.02.
    pub sparsity: f64,
    /// Hash seed. Default [`DEFAULT_SEED`].
    pub seed: u64,
}

impl PatternSpaceConfig {
    /// Nominal number of active bits: `floor(dim · sparsity)`.
    pub fn active_bits(&self) -> usize {
        (self.dim as f64 * self.sparsity).floor() as usize
    }

    /// Validate width and sparsity.
    pub fn validate(&self) -> ResonanceResult<()> {
        if self.dim == 0 || self.dim > u32::MAX as usize {
            return Err(ResonanceError::Config(format!(
                "dim must be in [1, {}], got {}",
                u32::MAX,
                self.dim
            )));
        }
        if !(self.sparsity > 0.0 && self.sparsity <= 1.0) {
            return Err(ResonanceError::Config(format!(
                "sparsity must be in (0, 1], got {}",
                self.sparsity
            )));
        }
        if self.active_bits() == 0 {
            return Err(ResonanceError::Config(format!(
                "dim {} with sparsity {} activates no bits",
                self.dim, self.sparsity
            )));
        }
        Ok(())
    }
}

impl Default for PatternSpaceConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            sparsity: DEFAULT_SPARSITY,
            seed: DEFAULT_SEED,
        }
    }
}

// ─── Results ────────────────────────────────────────────────────────────────

/// Result of [`PatternSpace::interfere`].
#[derive(Clone, Debug, PartialEq)]
pub struct Interference {
    /// Bits set in both operands.
    pub overlap: Pattern,
    /// Overlap relative to the nominal active count, in [0.0, 1.0].
    pub strength: f64,
}

/// One accepted hop of a [`SkipPath`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkipJump {
    /// Concept the hop leaves.
    pub from: String,
    /// Concept the hop reaches.
    pub to: String,
    /// Pattern resonance between the two.
    pub resonance: f64,
}

/// Greedy resonance walk produced by [`PatternSpace::skip_trace`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkipPath {
    /// Visited concepts, starting with the start concept.
    pub path: Vec<String>,
    /// Accepted hops, in order.
    pub jumps: Vec<SkipJump>,
    /// Sum of hop resonances.
    pub total_resonance: f64,
    /// True when at least one concept was skipped.
    pub is_non_linear: bool,
}

// ─── PatternSpace ───────────────────────────────────────────────────────────

/// Deterministic sparse encoder with a concept memory.
pub struct PatternSpace {
    config: PatternSpaceConfig,
    active: usize,
    memory: HashMap<String, Arc<Pattern>>,
}

impl PatternSpace {
    /// Construct an empty space after validating `config`.
    pub fn new(config: PatternSpaceConfig) -> ResonanceResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: PatternSpaceConfig) -> Self {
        let active = config.active_bits();
        Self {
            config,
            active,
            memory: HashMap::new(),
        }
    }

    /// Configuration of this space.
    pub fn config(&self) -> &PatternSpaceConfig {
        &self.config
    }

    /// Pattern width in bits.
    pub fn dim(&self) -> usize {
        self.config.dim
    }

    /// Nominal active bits per encoded concept.
    pub fn active_bits(&self) -> usize {
        self.active
    }

    /// Number of remembered concepts.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// True when no concept has been encoded yet.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Whether `id` is in concept memory.
    pub fn contains(&self, id: &str) -> bool {
        self.memory.contains_key(id)
    }

    /// Stored pattern for `id`, without encoding.
    pub fn get(&self, id: &str) -> Option<Arc<Pattern>> {
        self.memory.get(id).cloned()
    }

    /// Iterate over remembered `(id, pattern)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Pattern>)> {
        self.memory.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Deterministic projection of `id`, without touching memory.
    ///
    /// Bit `i` of the projection is `channel_hash(seed, i, id) mod dim` for
    /// `i` in `0..active_bits`. Colliding channels leave the pattern slightly
    /// below the nominal active count.
    pub fn project(&self, id: &str) -> Pattern {
        let dim = self.config.dim;
        let mut p = Pattern::empty(dim);
        for channel in 0..self.active as u64 {
            let index = (channel_hash(self.config.seed, channel, id) % dim as u64) as usize;
            p.set(index);
        }
        p
    }

    /// Encode `id`, returning the remembered pattern if it was seen before.
    pub fn encode(&mut self, id: &str) -> Arc<Pattern> {
        if let Some(p) = self.memory.get(id) {
            return Arc::clone(p);
        }
        let pattern = Arc::new(self.project(id));
        log::trace!(
            "projected concept '{}' onto {} active bits",
            id,
            pattern.active_count()
        );
        self.memory.insert(id.to_owned(), Arc::clone(&pattern));
        pattern
    }

    /// Bind a composed pattern to `id` in concept memory.
    ///
    /// The first binding wins: if `id` is already remembered the stored pattern
    /// is returned unchanged, so an identifier never changes meaning.
    pub fn remember(&mut self, id: &str, pattern: Pattern) -> ResonanceResult<Arc<Pattern>> {
        self.ensure_dim(&pattern)?;
        let stored = self
            .memory
            .entry(id.to_owned())
            .or_insert_with(|| Arc::new(pattern));
        Ok(Arc::clone(stored))
    }

    /// Bitwise OR of all inputs. An empty input yields the empty pattern.
    ///
    /// The active count of the result lies between the largest input count
    /// and the sum of input counts.
    pub fn superpose<P: AsRef<Pattern>>(&self, patterns: &[P]) -> ResonanceResult<Pattern> {
        let mut out = Pattern::empty(self.config.dim);
        for p in patterns {
            let p = p.as_ref();
            self.ensure_dim(p)?;
            for (o, w) in out.words.iter_mut().zip(&p.words) {
                *o |= *w;
            }
        }
        Ok(out)
    }

    /// Bitwise AND of `a` and `b` with its strength.
    ///
    /// `strength = |a ∧ b| / reference` where `reference` is the nominal
    /// active count, lowered to `max(|a|, |b|)` when hash collisions left both
    /// operands below it. Identical patterns score exactly 1.0, disjoint 0.0.
    pub fn interfere(&self, a: &Pattern, b: &Pattern) -> ResonanceResult<Interference> {
        self.ensure_dim(a)?;
        self.ensure_dim(b)?;
        let overlap = a.overlap(b)?;
        let shared = overlap.active_count();
        let reference = self.active.min(a.active_count().max(b.active_count()));
        let strength = if reference == 0 {
            0.0
        } else {
            (shared as f64 / reference as f64).min(1.0)
        };
        Ok(Interference { overlap, strength })
    }

    /// Rotate the active-bit indices by `phase / 2π · active_bits` positions.
    ///
    /// The phase is wrapped into [0, 2π) first; the active count is preserved
    /// exactly.
    pub fn apply_phase(&self, pattern: &Pattern, phase: f64) -> ResonanceResult<Pattern> {
        self.ensure_dim(pattern)?;
        if !phase.is_finite() {
            return Err(ResonanceError::InvalidPhase(phase));
        }
        let dim = self.config.dim;
        let turn = phase.rem_euclid(TAU) / TAU;
        let shift = ((turn * self.active as f64).floor() as usize) % dim;
        let mut out = Pattern::empty(dim);
        for i in pattern.active_indices() {
            out.set((i + shift) % dim);
        }
        Ok(out)
    }

    /// Phase-aware weighted vote over `(pattern, weight, phase)` triples.
    ///
    /// Each pattern is rotated by its phase, weights are normalised to sum to
    /// 1, and a bit is kept only where the summed weight is strictly above 0.5.
    /// Two equal-weight components in antiphase therefore cancel everywhere
    /// they do not coincide: a bit carried by only one of them sums to exactly
    /// 0.5 and is dropped.
    pub fn weighted_superpose<P: AsRef<Pattern>>(
        &self,
        components: &[(P, f64, f64)],
    ) -> ResonanceResult<Pattern> {
        for (i, (p, weight, phase)) in components.iter().enumerate() {
            if !(weight.is_finite() && (0.0..=1.0).contains(weight)) || !phase.is_finite() {
                return Err(ResonanceError::InvalidComponent {
                    label: format!("#{}", i),
                    weight: *weight,
                    phase: *phase,
                });
            }
            self.ensure_dim(p.as_ref())?;
        }

        let total: f64 = components.iter().map(|(_, w, _)| *w).sum();
        let mut out = Pattern::empty(self.config.dim);
        if total <= 0.0 {
            return Ok(out);
        }

        let mut votes: HashMap<usize, f64> = HashMap::new();
        for (p, weight, phase) in components {
            let rotated = self.apply_phase(p.as_ref(), *phase)?;
            let share = weight / total;
            for i in rotated.active_indices() {
                *votes.entry(i).or_insert(0.0) += share;
            }
        }
        for (i, sum) in votes {
            if sum > 0.5 + VOTE_EPSILON {
                out.set(i);
            }
        }
        Ok(out)
    }

    /// Associative recall: every remembered concept whose resonance with
    /// `pattern` is strictly above `threshold`, strongest first.
    ///
    /// Ties are ordered by identifier. Empty memory yields an empty list.
    pub fn decode(&self, pattern: &Pattern, threshold: f64) -> ResonanceResult<Vec<(String, f64)>> {
        self.ensure_dim(pattern)?;
        let mut hits: Vec<(String, f64)> = self
            .memory
            .iter()
            .filter_map(|(id, stored)| {
                let r = jaccard(pattern, stored);
                (r > threshold).then(|| (id.clone(), r))
            })
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(hits)
    }

    /// Greedy resonance walk from `start` to `end`.
    ///
    /// Each intermediate joins the path only if it resonates above
    /// [`SKIP_INCLUDE_THRESHOLD`] with the current concept; `end` closes the
    /// path if it resonates above [`SKIP_END_THRESHOLD`]. All concepts are
    /// encoded on the way.
    pub fn skip_trace(&mut self, start: &str, end: &str, intermediates: &[&str]) -> SkipPath {
        let mut current_id = start.to_owned();
        let mut current = self.encode(start);
        let mut path = vec![current_id.clone()];
        let mut jumps = Vec::new();
        let mut total_resonance = 0.0;

        for &next_id in intermediates {
            let next = self.encode(next_id);
            let r = jaccard(&current, &next);
            if r > SKIP_INCLUDE_THRESHOLD {
                jumps.push(SkipJump {
                    from: current_id.clone(),
                    to: next_id.to_owned(),
                    resonance: r,
                });
                total_resonance += r;
                path.push(next_id.to_owned());
                current_id = next_id.to_owned();
                current = next;
            }
        }

        let last = self.encode(end);
        let r = jaccard(&current, &last);
        if r > SKIP_END_THRESHOLD {
            jumps.push(SkipJump {
                from: current_id,
                to: end.to_owned(),
                resonance: r,
            });
            total_resonance += r;
            path.push(end.to_owned());
        }

        let is_non_linear = path.len() < intermediates.len() + 2;
        SkipPath {
            path,
            jumps,
            total_resonance,
            is_non_linear,
        }
    }

    fn ensure_dim(&self, p: &Pattern) -> ResonanceResult<()> {
        if p.dim != self.config.dim {
            return Err(ResonanceError::DimensionMismatch {
                expected: self.config.dim,
                found: p.dim,
            });
        }
        Ok(())
    }
}

impl Default for PatternSpace {
    fn default() -> Self {
        Self::from_validated(PatternSpaceConfig::default())
    }
}

impl core::fmt::Debug for PatternSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PatternSpace")
            .field("dim", &self.config.dim)
            .field("active_bits", &self.active)
            .field("concepts", &self.memory.len())
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
