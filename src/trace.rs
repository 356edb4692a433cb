/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Skip-trace search: bounded branching walks through a set of concepts.
//!
//! Each call to [`SkipTraceEngine::generate_traces`] is a fresh search over a
//! read-only token slice:
//!
//! ```text
//! tokens ──► anchors (top 30% by energy)
//!               │
//!               ▼
//!         trace_from(anchor)  ── score every unvisited token
//!               │                keep skip score > threshold
//!               │                recurse into the best `branching_factor`
//!               ▼
//!         leaf traces ──► prune (category signature, length < 3)
//!                     ──► coherence ──► ranked
//! ```
//!
//! # Skip score
//!
//! ```text
//! S(a,b) = w_c·causal(a,b) + w_e·emotional(a,b) + w_s·(1 − |a.sem − b.sem|) + w_t·temporal(a,b)
//! ```
//!
//! # Invariants
//!
//! - Every returned trace is non-empty, acyclic and at most `max_trace_length` long.
//! - Ranking is a stable sort by coherence, so exact ties keep discovery order.
//! - The node budget only removes work; it never adds or reorders results.

use hashbrown::HashSet;

use crate::concept::{Category, ConceptState, Dim};
use crate::config::EngineConfig;
use crate::error::{ResonanceError, ResonanceResult};
use crate::pattern::jaccard;

/// Weight of energy efficiency in trace coherence; mean resonance takes the rest.
const EFFICIENCY_WEIGHT: f64 = 0.2;

// ─── Sub-scores ─────────────────────────────────────────────────────────────

/// Causal flow `min(1, a.causal · b.causal · flow)`.
///
/// `flow` is 1.2 when causal charge rises from `a` to `b`, 0.8 otherwise.
pub fn causal_flow(a: &ConceptState, b: &ConceptState) -> f64 {
    let (ca, cb) = (a.feature(Dim::Causal), b.feature(Dim::Causal));
    let flow = if cb > ca { 1.2 } else { 0.8 };
    (ca * cb * flow).min(1.0)
}

/// Emotional alignment: closeness scaled by average charge.
pub fn emotional_alignment(a: &ConceptState, b: &ConceptState) -> f64 {
    let (ea, eb) = (a.feature(Dim::Emotional), b.feature(Dim::Emotional));
    (1.0 - (ea - eb).abs()) * (0.5 + 0.5 * (ea + eb) / 2.0)
}

/// One-dimensional semantic distance in [0, 1].
pub fn semantic_distance(a: &ConceptState, b: &ConceptState) -> f64 {
    (a.feature(Dim::Semantic) - b.feature(Dim::Semantic)).abs().min(1.0)
}

/// Temporal flow: forward steps score `min(1, 2Δ)`, backward steps are
/// penalised to `max(0, 1 + Δ/2)`.
pub fn temporal_flow(a: &ConceptState, b: &ConceptState) -> f64 {
    let delta = b.feature(Dim::Temporal) - a.feature(Dim::Temporal);
    if delta > 0.0 {
        (2.0 * delta).min(1.0)
    } else {
        (1.0 + 0.5 * delta).max(0.0)
    }
}

/// Energy spent moving from `a` to `b`; energetic tokens make hops cheaper.
pub fn energy_cost(a: &ConceptState, b: &ConceptState) -> f64 {
    let avg_energy = (a.feature(Dim::Energy) + b.feature(Dim::Energy)) / 2.0;
    semantic_distance(a, b) * (1.0 - 0.5 * avg_energy)
}

// ─── Trace ──────────────────────────────────────────────────────────────────

/// One ranked skip trace. Steps are indices into the token slice the trace
/// was generated from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    steps: Vec<usize>,
    energy_spent: f64,
    coherence: f64,
    complete: bool,
}

impl Trace {
    /// Token indices in visiting order.
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Number of tokens in the trace.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for traces returned by the engine.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Cumulative transition cost.
    pub fn energy_spent(&self) -> f64 {
        self.energy_spent
    }

    /// Coherence score in [0, 1].
    pub fn coherence(&self) -> f64 {
        self.coherence
    }

    /// False when the walk stopped because no candidate cleared the threshold.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Map the steps back onto the token slice.
    pub fn resolve<'t>(&self, tokens: &'t [ConceptState]) -> Vec<&'t ConceptState> {
        self.steps.iter().filter_map(|&i| tokens.get(i)).collect()
    }

    /// Surface strings of the visited tokens.
    pub fn surfaces<'t>(&self, tokens: &'t [ConceptState]) -> Vec<&'t str> {
        self.resolve(tokens).into_iter().map(|t| t.surface.as_str()).collect()
    }
}

/// Traces ranked by descending coherence.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedTraces {
    traces: Vec<Trace>,
}

impl RankedTraces {
    /// The most coherent trace, if any survived pruning.
    pub fn best(&self) -> Option<&Trace> {
        self.traces.first()
    }

    /// Traces with coherence at or above `min_coherence`, in rank order.
    pub fn coherent(&self, min_coherence: f64) -> Vec<&Trace> {
        self.traces
            .iter()
            .filter(|t| t.coherence >= min_coherence)
            .collect()
    }

    /// Iterate in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter()
    }

    /// Ranked traces as a slice.
    pub fn as_slice(&self) -> &[Trace] {
        &self.traces
    }

    /// Number of traces.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// True when nothing survived pruning.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Take ownership of the ranked list.
    pub fn into_vec(self) -> Vec<Trace> {
        self.traces
    }
}

// ─── Search state ───────────────────────────────────────────────────────────

struct RawTrace {
    steps: Vec<usize>,
    spent: f64,
    complete: bool,
}

struct Search<'a> {
    tokens: &'a [ConceptState],
    expansions: usize,
    exhausted: bool,
    found: Vec<RawTrace>,
}

impl Search<'_> {
    fn record(&mut self, path: &[usize], spent: f64, complete: bool) {
        self.found.push(RawTrace {
            steps: path.to_vec(),
            spent,
            complete,
        });
    }
}

// ─── SkipTraceEngine ────────────────────────────────────────────────────────

/// Bounded branching search over concept states.
#[derive(Clone, Debug, Default)]
pub struct SkipTraceEngine {
    config: EngineConfig,
}

impl SkipTraceEngine {
    /// Construct an engine after validating `config`.
    pub fn new(config: EngineConfig) -> ResonanceResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Weighted skip score from `a` to `b`.
    pub fn skip_score(&self, a: &ConceptState, b: &ConceptState) -> f64 {
        let w = &self.config.weights;
        w.causal * causal_flow(a, b)
            + w.emotional * emotional_alignment(a, b)
            + w.semantic * (1.0 - semantic_distance(a, b))
            + w.temporal * temporal_flow(a, b)
    }

    /// Resonance between two concepts in [0, 1].
    ///
    /// Feature resonance is `Σ_d (1 − |a_d − b_d|) · dim_weight_d`. When both
    /// concepts carry patterns of equal width, their Jaccard resonance is
    /// blended in with weight `resonance_strength`.
    pub fn resonance(&self, a: &ConceptState, b: &ConceptState) -> f64 {
        let fa = a.features.as_array();
        let fb = b.features.as_array();
        let feature: f64 = fa
            .iter()
            .zip(fb)
            .zip(&self.config.dim_weights)
            .map(|((x, y), w)| (1.0 - (x - y).abs()).max(0.0) * w)
            .sum();
        match (&a.pattern, &b.pattern) {
            (Some(pa), Some(pb)) if pa.dim() == pb.dim() => {
                let s = self.config.resonance_strength;
                (1.0 - s) * feature + s * jaccard(pa, pb)
            }
            _ => feature,
        }
    }

    /// Anchor indices: the `max(1, ⌈anchor_fraction · N⌉)` most energetic tokens.
    ///
    /// Ties keep input order.
    pub fn anchors(&self, tokens: &[ConceptState]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..tokens.len()).collect();
        order.sort_by(|&a, &b| {
            tokens[b]
                .feature(Dim::Energy)
                .total_cmp(&tokens[a].feature(Dim::Energy))
        });
        let count = ((tokens.len() as f64 * self.config.anchor_fraction).ceil() as usize)
            .max(1)
            .min(tokens.len());
        order.truncate(count);
        order
    }

    /// Coherence of a visiting order in [0, 1]. Paths shorter than two score 0.
    ///
    /// ```text
    /// coherence = 0.8 · mean pairwise resonance + 0.2 · max(0, 1 − spent / budget)
    /// ```
    ///
    /// Both terms lie in [0, 1] and are blended rather than added, so distinct
    /// traces keep distinct scores instead of piling up at a cap.
    pub fn path_coherence(&self, tokens: &[ConceptState], steps: &[usize], spent: f64) -> f64 {
        let n = steps.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                total += self.resonance(&tokens[steps[i]], &tokens[steps[j]]);
                pairs += 1;
            }
        }
        let mean = total / pairs as f64;
        let efficiency = (1.0 - spent / self.config.energy_budget).clamp(0.0, 1.0);
        (1.0 - EFFICIENCY_WEIGHT) * mean + EFFICIENCY_WEIGHT * efficiency
    }

    /// Search the token set and return the surviving traces ranked by coherence.
    ///
    /// An empty token slice yields an empty result. Tokens carrying patterns of
    /// different widths are rejected before any search starts.
    pub fn generate_traces(&self, tokens: &[ConceptState]) -> ResonanceResult<RankedTraces> {
        if tokens.is_empty() {
            return Ok(RankedTraces::default());
        }
        check_pattern_widths(tokens)?;

        let anchors = self.anchors(tokens);

        #[cfg(feature = "parallel")]
        let per_anchor: Vec<Vec<RawTrace>> = {
            use rayon::prelude::*;
            anchors
                .par_iter()
                .map(|&a| self.search_anchor(tokens, a))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let per_anchor: Vec<Vec<RawTrace>> = anchors
            .iter()
            .map(|&a| self.search_anchor(tokens, a))
            .collect();

        let raw_count: usize = per_anchor.iter().map(Vec::len).sum();
        let mut seen: HashSet<Vec<Category>> = HashSet::new();
        let mut traces = Vec::new();
        for raw in per_anchor.into_iter().flatten() {
            if raw.steps.len() < self.config.min_trace_length {
                continue;
            }
            let signature: Vec<Category> = raw.steps.iter().map(|&i| tokens[i].category).collect();
            if !seen.insert(signature) {
                continue;
            }
            let coherence = self.path_coherence(tokens, &raw.steps, raw.spent);
            traces.push(Trace {
                steps: raw.steps,
                energy_spent: raw.spent,
                coherence,
                complete: raw.complete,
            });
        }
        traces.sort_by(|a, b| b.coherence.total_cmp(&a.coherence));

        log::debug!(
            "skip-trace search: {} tokens, {} anchors, {} raw traces, {} ranked",
            tokens.len(),
            anchors.len(),
            raw_count,
            traces.len()
        );
        Ok(RankedTraces { traces })
    }

    fn search_anchor(&self, tokens: &[ConceptState], anchor: usize) -> Vec<RawTrace> {
        let mut search = Search {
            tokens,
            expansions: 0,
            exhausted: false,
            found: Vec::new(),
        };
        let mut path = vec![anchor];
        self.trace_from(&mut search, &mut path, self.config.energy_budget, 0.0);
        if search.exhausted {
            log::debug!(
                "anchor '{}' hit the node budget of {}",
                tokens[anchor].surface,
                self.config.node_budget
            );
        }
        search.found
    }

    fn trace_from(&self, search: &mut Search<'_>, path: &mut Vec<usize>, remaining: f64, spent: f64) {
        if path.len() >= self.config.max_trace_length || remaining < self.config.min_energy {
            search.record(path, spent, true);
            return;
        }
        if search.expansions >= self.config.node_budget {
            search.exhausted = true;
            return;
        }
        search.expansions += 1;

        let tokens = search.tokens;
        let current = &tokens[path[path.len() - 1]];
        let mut candidates: Vec<(usize, f64)> = (0..tokens.len())
            .filter(|j| !path.contains(j))
            .map(|j| (j, self.skip_score(current, &tokens[j])))
            .filter(|&(_, score)| score > self.config.skip_threshold)
            .collect();

        if candidates.is_empty() {
            search.record(path, spent, false);
            return;
        }
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(self.config.branching_factor);

        for (next, _) in candidates {
            let cost = energy_cost(current, &tokens[next]);
            path.push(next);
            self.trace_from(search, path, remaining - cost, spent + cost);
            path.pop();
        }
    }
}

fn check_pattern_widths(tokens: &[ConceptState]) -> ResonanceResult<()> {
    let mut widths = tokens.iter().filter_map(|t| t.pattern.as_ref().map(|p| p.dim()));
    if let Some(expected) = widths.next() {
        if let Some(found) = widths.find(|&w| w != expected) {
            return Err(ResonanceError::DimensionMismatch { expected, found });
        }
    }
    Ok(())
}
