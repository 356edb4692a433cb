//! Explicit configuration for the skip-trace engine and the stability monitor.
//!
//! Every recognised field is enumerated here with its default. With the
//! `serde` feature enabled, partial documents are filled from the defaults
//! and unknown fields are rejected.

use crate::concept::FEATURE_COUNT;
use crate::error::{ResonanceError, ResonanceResult};

// ─── SkipWeights ─────────────────────────────────────────────────────────────

/// Weights of the four sub-scores in the skip score. Must sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct SkipWeights {
    /// Causal flow weight. Default 0.3.
    pub causal: f64,
    /// Emotional alignment weight. Default 0.25.
    pub emotional: f64,
    /// Semantic proximity weight. Default 0.25.
    pub semantic: f64,
    /// Temporal flow weight. Default 0.2.
    pub temporal: f64,
}

impl SkipWeights {
    /// Sum of all four weights.
    pub fn total(&self) -> f64 {
        self.causal + self.emotional + self.semantic + self.temporal
    }
}

impl Default for SkipWeights {
    fn default() -> Self {
        Self {
            causal: 0.3,
            emotional: 0.25,
            semantic: 0.25,
            temporal: 0.2,
        }
    }
}

// ─── StabilityConfig ─────────────────────────────────────────────────────────

/// Thresholds for the dual-energy stability monitor.
///
/// ```text
/// divergence = |H1 − H2|
/// risk       = divergence · (1 + risk_jerk_weight·|jerk| + risk_snap_weight·|snap|)
/// STABLE     ⇔ divergence < warning_divergence ∧ |jerk| < jerk_limit ∧ |snap| < snap_limit
/// CRITICAL   ⇔ risk > critical_risk
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct StabilityConfig {
    /// Divergence above which a ghost state is emerging. Default 0.3.
    pub warning_divergence: f64,
    /// Risk above which the state is critical. Default 0.5.
    pub critical_risk: f64,
    /// Jerk magnitude limit. Default 1.0.
    pub jerk_limit: f64,
    /// Snap magnitude limit. Default 2.0.
    pub snap_limit: f64,
    /// Synthetic time step between samples. Default 0.1.
    pub dt: f64,
    /// Jerk coefficient in the risk function. Default 0.3.
    pub risk_jerk_weight: f64,
    /// Snap coefficient in the risk function. Default 0.1.
    pub risk_snap_weight: f64,
    /// H1 drop across the last samples that counts as rapid coherence loss. Default 0.3.
    pub coherence_loss_delta: f64,
    /// H2 below this is a structural collapse. Default 0.1.
    pub structural_collapse: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            warning_divergence: 0.3,
            critical_risk: 0.5,
            jerk_limit: 1.0,
            snap_limit: 2.0,
            dt: 0.1,
            risk_jerk_weight: 0.3,
            risk_snap_weight: 0.1,
            coherence_loss_delta: 0.3,
            structural_collapse: 0.1,
        }
    }
}

impl StabilityConfig {
    /// Validate the thresholds.
    pub fn validate(&self) -> ResonanceResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ResonanceError::Config(format!(
                "dt must be finite and > 0, got {}",
                self.dt
            )));
        }
        if !(0.0..=1.0).contains(&self.warning_divergence) {
            return Err(ResonanceError::Config(format!(
                "warning_divergence must be in [0, 1], got {}",
                self.warning_divergence
            )));
        }
        if !(self.critical_risk.is_finite() && self.critical_risk > 0.0) {
            return Err(ResonanceError::Config(format!(
                "critical_risk must be finite and > 0, got {}",
                self.critical_risk
            )));
        }
        for (name, value) in [
            ("jerk_limit", self.jerk_limit),
            ("snap_limit", self.snap_limit),
            ("risk_jerk_weight", self.risk_jerk_weight),
            ("risk_snap_weight", self.risk_snap_weight),
            ("coherence_loss_delta", self.coherence_loss_delta),
            ("structural_collapse", self.structural_collapse),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ResonanceError::Config(format!(
                    "{} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// ─── EngineConfig ────────────────────────────────────────────────────────────

/// Configuration of the skip-trace engine, carrying the stability thresholds
/// alongside so one document configures the whole pipeline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct EngineConfig {
    /// Minimum skip score for a transition to be explored. Default 0.3.
    pub skip_threshold: f64,
    /// Maximum number of tokens in a trace. Default 10.
    pub max_trace_length: usize,
    /// Maximum number of candidates explored from one token. Default 3.
    pub branching_factor: usize,
    /// Blend weight of pattern (Jaccard) resonance into feature resonance
    /// when both tokens carry a pattern. Default 0.5.
    pub resonance_strength: f64,
    /// Energy each anchor starts with. Default 1.0.
    pub energy_budget: f64,
    /// Search stops once remaining energy falls below this. Default 0.1.
    pub min_energy: f64,
    /// Fraction of tokens (by energy feature) used as anchors. Default 0.3.
    pub anchor_fraction: f64,
    /// Traces shorter than this are discarded. Default 3.
    pub min_trace_length: usize,
    /// Cap on node expansions per anchor. Default 50 000.
    pub node_budget: usize,
    /// Sub-score weights of the skip score.
    pub weights: SkipWeights,
    /// Per-dimension weights of feature resonance. Must sum to 1.0.
    pub dim_weights: [f64; FEATURE_COUNT],
    /// Stability monitor thresholds.
    pub stability: StabilityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skip_threshold: 0.3,
            max_trace_length: 10,
            branching_factor: 3,
            resonance_strength: 0.5,
            energy_budget: 1.0,
            min_energy: 0.1,
            anchor_fraction: 0.3,
            min_trace_length: 3,
            node_budget: 50_000,
            weights: SkipWeights::default(),
            dim_weights: [1.0 / FEATURE_COUNT as f64; FEATURE_COUNT],
            stability: StabilityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate every parameter, including the nested stability thresholds.
    pub fn validate(&self) -> ResonanceResult<()> {
        if !(0.0..=1.0).contains(&self.skip_threshold) {
            return Err(ResonanceError::Config(format!(
                "skip_threshold must be in [0, 1], got {}",
                self.skip_threshold
            )));
        }
        if self.max_trace_length < 1 {
            return Err(ResonanceError::Config(format!(
                "max_trace_length must be >= 1, got {}",
                self.max_trace_length
            )));
        }
        if self.branching_factor < 1 {
            return Err(ResonanceError::Config(format!(
                "branching_factor must be >= 1, got {}",
                self.branching_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.resonance_strength) {
            return Err(ResonanceError::Config(format!(
                "resonance_strength must be in [0, 1], got {}",
                self.resonance_strength
            )));
        }
        if !(self.energy_budget.is_finite() && self.energy_budget > 0.0) {
            return Err(ResonanceError::Config(format!(
                "energy_budget must be finite and > 0, got {}",
                self.energy_budget
            )));
        }
        if !(self.min_energy.is_finite() && self.min_energy >= 0.0) {
            return Err(ResonanceError::Config(format!(
                "min_energy must be finite and >= 0, got {}",
                self.min_energy
            )));
        }
        if !(self.anchor_fraction > 0.0 && self.anchor_fraction <= 1.0) {
            return Err(ResonanceError::Config(format!(
                "anchor_fraction must be in (0, 1], got {}",
                self.anchor_fraction
            )));
        }
        if self.node_budget < 1 {
            return Err(ResonanceError::Config(
                "node_budget must be >= 1".to_string(),
            ));
        }
        let w = &self.weights;
        if [w.causal, w.emotional, w.semantic, w.temporal]
            .iter()
            .any(|x| !(x.is_finite() && *x >= 0.0))
        {
            return Err(ResonanceError::Config(format!(
                "skip weights must be finite and >= 0, got {:?}",
                w
            )));
        }
        if (w.total() - 1.0).abs() > 1e-9 {
            return Err(ResonanceError::Config(format!(
                "skip weights must sum to 1.0, got {}",
                w.total()
            )));
        }
        if self.dim_weights.iter().any(|x| !(x.is_finite() && *x >= 0.0)) {
            return Err(ResonanceError::Config(format!(
                "dim_weights must be finite and >= 0, got {:?}",
                self.dim_weights
            )));
        }
        let dim_total: f64 = self.dim_weights.iter().sum();
        if (dim_total - 1.0).abs() > 1e-9 {
            return Err(ResonanceError::Config(format!(
                "dim_weights must sum to 1.0, got {}",
                dim_total
            )));
        }
        self.stability.validate()
    }
}
