/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Dual-energy stability monitor.
//!
//! Each concept carries two energies:
//!
//! ```text
//! H1 (coherence)  = √(Σ f² + |Σ w·e^{iφ}|)
//! H2 (structure)  = 1 / (1 + var(f))            ⟵ averaged with 1/(1 + oppositions)
//!                                                  when the concept has affect
//! ```
//!
//! Concepts are kept under unit Euclidean norm, so `Σ f² = 1` and H1 starts
//! at its clamp of 1. A concept without affect has divergence `1 − H2`, which
//! stays below 0.1 for any non-negative unit vector; divergence worth flagging
//! comes from affective oppositions or from energies fed in directly through
//! [`StabilityMonitor::update_energies`].
//!
//! The monitor keeps a bounded history of `(H1, H2, tick)` samples and
//! differentiates the averaged position `(H1 + H2) / 2` up to fourth order.
//! Classification is derived fresh on every report, never stored:
//!
//! | Status   | Condition                                                      |
//! |----------|----------------------------------------------------------------|
//! | STABLE   | divergence < 0.3, \|jerk\| < 1.0, \|snap\| < 2.0               |
//! | CRITICAL | risk > 0.5                                                     |
//! | WARNING  | otherwise                                                      |
//!
//! Divergence is a classified state, not an error. Nothing is corrected unless
//! the caller asks for [`StabilityMonitor::stabilize`].

use core::fmt;

use hashbrown::HashMap;
use heapless::Deque;

use crate::concept::ConceptState;
use crate::config::StabilityConfig;
use crate::error::ResonanceResult;

/// Samples kept per monitor before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 100;

/// Positions used for the finite differences (enough for snap).
const DERIVATIVE_WINDOW: usize = 5;

/// Jerk floor in the time-to-collapse estimate.
const COLLAPSE_JERK_FLOOR: f64 = 0.1;

// ─── Energies ───────────────────────────────────────────────────────────────

/// Coherence energy H1, before clamping.
pub fn coherence_energy(state: &ConceptState) -> f64 {
    (state.features.sum_of_squares() + state.interference().magnitude).sqrt()
}

/// Structural energy H2 in (0, 1].
pub fn structural_energy(state: &ConceptState) -> f64 {
    let feature_structure = 1.0 / (1.0 + state.features.variance());
    if state.affect.is_empty() {
        feature_structure
    } else {
        let affective_structure = 1.0 / (1.0 + state.opposition_count() as f64);
        (feature_structure + affective_structure) / 2.0
    }
}

// ─── History ────────────────────────────────────────────────────────────────

/// One clamped energy observation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnergySample {
    /// Coherence energy in [0, 1].
    pub h1: f64,
    /// Structural energy in [0, 1].
    pub h2: f64,
    /// Monotonic sample counter of the owning monitor.
    pub tick: u64,
}

impl EnergySample {
    /// Averaged energy position that gets differentiated.
    pub fn position(&self) -> f64 {
        (self.h1 + self.h2) / 2.0
    }

    /// `|H1 − H2|`.
    pub fn divergence(&self) -> f64 {
        (self.h1 - self.h2).abs()
    }
}

/// Bounded, append-only sample history. The oldest sample is evicted first.
#[derive(Clone, Debug, Default)]
pub struct EnergyHistory {
    samples: Deque<EnergySample, HISTORY_CAPACITY>,
}

impl EnergyHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: EnergySample) {
        let mut pending = sample;
        while let Err(rejected) = self.samples.push_back(pending) {
            self.samples.pop_front();
            pending = rejected;
        }
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&EnergySample> {
        self.samples.back()
    }

    /// Samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &EnergySample> {
        self.samples.iter()
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True before the first observation.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The last `n` samples, oldest first.
    fn tail(&self, n: usize) -> impl Iterator<Item = &EnergySample> {
        self.samples.iter().skip(self.len().saturating_sub(n))
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Backward finite differences of the energy position. Orders without enough
/// samples are 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Derivatives {
    /// First derivative (needs 2 samples).
    pub velocity: f64,
    /// Second derivative (needs 3 samples).
    pub acceleration: f64,
    /// Third derivative (needs 4 samples).
    pub jerk: f64,
    /// Fourth derivative (needs 5 samples).
    pub snap: f64,
}

impl Derivatives {
    fn from_positions(p: &[f64], dt: f64) -> Self {
        let n = p.len();
        let at = |k: usize| p[n - 1 - k];
        let mut d = Self::default();
        if n >= 2 {
            d.velocity = (at(0) - at(1)) / dt;
        }
        if n >= 3 {
            d.acceleration = (at(0) - 2.0 * at(1) + at(2)) / dt.powi(2);
        }
        if n >= 4 {
            d.jerk = (at(0) - 3.0 * at(1) + 3.0 * at(2) - at(3)) / dt.powi(3);
        }
        if n >= 5 {
            d.snap = (at(0) - 4.0 * at(1) + 6.0 * at(2) - 4.0 * at(3) + at(4)) / dt.powi(4);
        }
        d
    }
}

/// Three-level stability classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StabilityStatus {
    /// Energies agree and the trajectory is smooth.
    Stable,
    /// Diverging or jerky, but below the critical risk.
    Warning,
    /// Risk above the critical threshold.
    Critical,
}

impl StabilityStatus {
    /// Upper-case tag.
    pub fn as_str(self) -> &'static str {
        match self {
            StabilityStatus::Stable => "STABLE",
            StabilityStatus::Warning => "WARNING",
            StabilityStatus::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for StabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named instability conditions. Several may hold at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstabilityWarning {
    /// Divergence above the warning threshold.
    GhostStateEmerging,
    /// H1 fell by more than the loss delta over the last samples.
    RapidCoherenceLoss,
    /// `|jerk|` above its limit.
    HighJerk,
    /// `|snap|` above its limit.
    HighSnap,
    /// H2 below the collapse floor.
    StructuralCollapse,
}

impl InstabilityWarning {
    /// Stable upper-case tag, e.g. `GHOST_STATE_EMERGING`.
    pub fn as_str(self) -> &'static str {
        match self {
            InstabilityWarning::GhostStateEmerging => "GHOST_STATE_EMERGING",
            InstabilityWarning::RapidCoherenceLoss => "RAPID_COHERENCE_LOSS",
            InstabilityWarning::HighJerk => "HIGH_JERK",
            InstabilityWarning::HighSnap => "HIGH_SNAP",
            InstabilityWarning::StructuralCollapse => "STRUCTURAL_COLLAPSE",
        }
    }
}

impl fmt::Display for InstabilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one monitor after its latest sample.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StabilityReport {
    /// Coherence energy.
    pub h1: f64,
    /// Structural energy.
    pub h2: f64,
    /// `|h1 − h2|`.
    pub divergence: f64,
    /// Derivatives of the averaged position.
    pub derivatives: Derivatives,
    /// `divergence · (1 + a·|jerk| + b·|snap|)`.
    pub risk: f64,
    /// Derived classification.
    pub status: StabilityStatus,
    /// Every applicable warning, in declaration order.
    pub warnings: Vec<InstabilityWarning>,
    /// Suggested corrective action; `None` when stable.
    pub recommendation: Option<String>,
    /// Estimated steps until risk reaches the critical threshold, only while
    /// a ghost state is emerging.
    pub time_to_collapse: Option<f64>,
}

impl StabilityReport {
    /// Whether `warning` is present.
    pub fn has_warning(&self, warning: InstabilityWarning) -> bool {
        self.warnings.contains(&warning)
    }
}

// ─── Stabilisation ──────────────────────────────────────────────────────────

/// Strength tier of a corrective step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StabilizeIntensity {
    /// Pull 0.1, damping ×0.95, amplification ×1.05.
    Gentle,
    /// Pull 0.3, damping ×0.9, amplification ×1.1.
    #[default]
    Standard,
    /// Pull 0.5, damping ×0.8, amplification ×1.2.
    Aggressive,
}

impl StabilizeIntensity {
    /// Fraction of the distance to the feature mean covered per step.
    pub fn pull(self) -> f64 {
        match self {
            StabilizeIntensity::Gentle => 0.1,
            StabilizeIntensity::Standard => 0.3,
            StabilizeIntensity::Aggressive => 0.5,
        }
    }

    /// Factor applied to signed affective phase offsets.
    pub fn damping(self) -> f64 {
        match self {
            StabilizeIntensity::Gentle => 0.95,
            StabilizeIntensity::Standard => 0.9,
            StabilizeIntensity::Aggressive => 0.8,
        }
    }

    /// Factor applied to the dominant feature.
    pub fn amplification(self) -> f64 {
        match self {
            StabilizeIntensity::Gentle => 1.05,
            StabilizeIntensity::Standard => 1.1,
            StabilizeIntensity::Aggressive => 1.2,
        }
    }
}

/// Pull features toward their mean and damp affective phase offsets.
fn strengthen_structure(state: &mut ConceptState, intensity: StabilizeIntensity) {
    let mean = state.features.mean();
    let pull = intensity.pull();
    for x in state.features.0.iter_mut() {
        *x += pull * (mean - *x);
    }
    let damping = intensity.damping();
    for c in state.affect.iter_mut() {
        c.damp_phase(damping);
    }
}

/// Amplify the single largest feature.
fn amplify_coherence(state: &mut ConceptState, intensity: StabilizeIntensity) {
    let dominant = state.features.dominant();
    state.features[dominant] *= intensity.amplification();
}

/// Result of [`StabilityMonitor::gentle_stabilize`].
///
/// When `improved` is false the caller decides how to escalate.
#[derive(Clone, Debug, PartialEq)]
pub struct GentleOutcome {
    /// Report taken just before the step.
    pub before: StabilityReport,
    /// Report taken just after the step.
    pub after: StabilityReport,
    /// Divergence fell and neither energy decreased.
    pub improved: bool,
}

// ─── StabilityMonitor ───────────────────────────────────────────────────────

/// Energy history and classifier for one concept.
#[derive(Clone, Debug, Default)]
pub struct StabilityMonitor {
    config: StabilityConfig,
    history: EnergyHistory,
    tick: u64,
}

impl StabilityMonitor {
    /// Monitor with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor with validated custom thresholds.
    pub fn with_config(config: StabilityConfig) -> ResonanceResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: StabilityConfig) -> Self {
        Self {
            config,
            history: EnergyHistory::new(),
            tick: 0,
        }
    }

    /// Active thresholds.
    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Recorded samples.
    pub fn history(&self) -> &EnergyHistory {
        &self.history
    }

    /// Record a pair of energies. Out-of-range values are clamped to [0, 1];
    /// NaN is treated as 0.
    pub fn update_energies(&mut self, h1: f64, h2: f64) -> StabilityReport {
        let sample = EnergySample {
            h1: clamp_unit(h1),
            h2: clamp_unit(h2),
            tick: self.tick,
        };
        self.tick += 1;
        self.history.push(sample);
        let report = self.build_report(&sample);
        if report.status == StabilityStatus::Critical {
            log::warn!(
                "critical instability: divergence={:.3} risk={:.3} warnings={:?}",
                report.divergence,
                report.risk,
                report.warnings
            );
        }
        report
    }

    /// Compute both energies from `state` and record them.
    pub fn observe(&mut self, state: &ConceptState) -> StabilityReport {
        self.update_energies(coherence_energy(state), structural_energy(state))
    }

    /// Report for the latest sample, `None` before the first observation.
    pub fn report(&self) -> Option<StabilityReport> {
        self.history.latest().map(|s| self.build_report(s))
    }

    /// Apply one corrective step to `state` and re-observe it.
    ///
    /// With `H1 > H2` (judged on the latest sample) the features are pulled
    /// toward their mean and affective phases are damped; otherwise the
    /// dominant feature is amplified. The concept is re-normalised afterwards.
    pub fn stabilize(&mut self, state: &mut ConceptState, intensity: StabilizeIntensity) -> StabilityReport {
        let (h1, h2) = match self.history.latest() {
            Some(s) => (s.h1, s.h2),
            None => {
                let r = self.observe(state);
                (r.h1, r.h2)
            }
        };
        if h1 > h2 {
            strengthen_structure(state, intensity);
        } else {
            amplify_coherence(state, intensity);
        }
        state.normalize();
        let report = self.observe(state);
        log::debug!(
            "stabilize '{}' ({:?}): divergence {:.3} -> {:.3}",
            state.surface,
            intensity,
            (h1 - h2).abs(),
            report.divergence
        );
        report
    }

    /// Blend structure balancing and coherence amplification in one gentle
    /// step, then check whether it helped.
    pub fn gentle_stabilize(&mut self, state: &mut ConceptState) -> GentleOutcome {
        let before = self.observe(state);
        strengthen_structure(state, StabilizeIntensity::Gentle);
        amplify_coherence(state, StabilizeIntensity::Gentle);
        state.normalize();
        let after = self.observe(state);
        let improved =
            after.divergence < before.divergence && after.h1 >= before.h1 && after.h2 >= before.h2;
        GentleOutcome { before, after, improved }
    }

    fn build_report(&self, latest: &EnergySample) -> StabilityReport {
        let cfg = &self.config;
        let window: Vec<EnergySample> = self.history.tail(DERIVATIVE_WINDOW).copied().collect();
        let positions: Vec<f64> = window.iter().map(EnergySample::position).collect();
        let derivatives = Derivatives::from_positions(&positions, cfg.dt);

        let divergence = latest.divergence();
        let risk = divergence
            * (1.0
                + cfg.risk_jerk_weight * derivatives.jerk.abs()
                + cfg.risk_snap_weight * derivatives.snap.abs());

        let stable = divergence < cfg.warning_divergence
            && derivatives.jerk.abs() < cfg.jerk_limit
            && derivatives.snap.abs() < cfg.snap_limit;
        let status = if risk > cfg.critical_risk {
            StabilityStatus::Critical
        } else if stable {
            StabilityStatus::Stable
        } else {
            StabilityStatus::Warning
        };

        let mut warnings = Vec::new();
        let ghost = divergence > cfg.warning_divergence;
        if ghost {
            warnings.push(InstabilityWarning::GhostStateEmerging);
        }
        if rapid_coherence_loss(&window, cfg.coherence_loss_delta) {
            warnings.push(InstabilityWarning::RapidCoherenceLoss);
        }
        if derivatives.jerk.abs() > cfg.jerk_limit {
            warnings.push(InstabilityWarning::HighJerk);
        }
        if derivatives.snap.abs() > cfg.snap_limit {
            warnings.push(InstabilityWarning::HighSnap);
        }
        if latest.h2 < cfg.structural_collapse {
            warnings.push(InstabilityWarning::StructuralCollapse);
        }

        let time_to_collapse = ghost.then(|| {
            ((cfg.critical_risk - risk) / (derivatives.jerk.abs() + COLLAPSE_JERK_FLOOR)).max(0.0)
        });

        StabilityReport {
            h1: latest.h1,
            h2: latest.h2,
            divergence,
            derivatives,
            risk,
            status,
            warnings,
            recommendation: recommend(status, latest),
            time_to_collapse,
        }
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Compares the newest H1 against the sample two back (or one back when only
/// two exist).
fn rapid_coherence_loss(window: &[EnergySample], delta: f64) -> bool {
    let n = window.len();
    if n < 2 {
        return false;
    }
    let reference = if n >= 3 { window[n - 3] } else { window[n - 2] };
    reference.h1 - window[n - 1].h1 > delta
}

fn recommend(status: StabilityStatus, latest: &EnergySample) -> Option<String> {
    let action = if latest.h1 > latest.h2 {
        "strengthen structure (pull features toward their mean)"
    } else {
        "amplify coherence (boost the dominant feature)"
    };
    match status {
        StabilityStatus::Stable => None,
        StabilityStatus::Warning => Some(format!("gentle stabilize: {}", action)),
        StabilityStatus::Critical => Some(format!("aggressive stabilize now: {}", action)),
    }
}

// ─── StabilityField ─────────────────────────────────────────────────────────

/// Monitors for many concepts, keyed by surface.
#[derive(Clone, Debug, Default)]
pub struct StabilityField {
    config: StabilityConfig,
    monitors: HashMap<String, StabilityMonitor>,
}

impl StabilityField {
    /// Field whose monitors share validated thresholds.
    pub fn new(config: StabilityConfig) -> ResonanceResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            monitors: HashMap::new(),
        })
    }

    /// Observe `state` on its own monitor, creating it on first sight.
    pub fn observe(&mut self, state: &ConceptState) -> StabilityReport {
        if let Some(monitor) = self.monitors.get_mut(state.surface.as_str()) {
            return monitor.observe(state);
        }
        let mut monitor = StabilityMonitor::from_validated(self.config.clone());
        let report = monitor.observe(state);
        self.monitors.insert(state.surface.clone(), monitor);
        report
    }

    /// Monitor for `surface`, if it has been observed.
    pub fn monitor(&self, surface: &str) -> Option<&StabilityMonitor> {
        self.monitors.get(surface)
    }

    /// Mutable monitor for `surface`, e.g. to stabilise it.
    pub fn monitor_mut(&mut self, surface: &str) -> Option<&mut StabilityMonitor> {
        self.monitors.get_mut(surface)
    }

    /// Drop the monitor for `surface`.
    pub fn remove(&mut self, surface: &str) -> Option<StabilityMonitor> {
        self.monitors.remove(surface)
    }

    /// Non-stable concepts with their latest reports, highest risk first
    /// (ties by surface).
    pub fn unstable(&self) -> Vec<(&str, StabilityReport)> {
        let mut out: Vec<(&str, StabilityReport)> = self
            .monitors
            .iter()
            .filter_map(|(surface, m)| m.report().map(|r| (surface.as_str(), r)))
            .filter(|(_, r)| r.status != StabilityStatus::Stable)
            .collect();
        out.sort_by(|a, b| b.1.risk.total_cmp(&a.1.risk).then_with(|| a.0.cmp(b.0)));
        out
    }

    /// Number of tracked concepts.
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// True when nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{AffectiveComponent, Category, Dim};
    use crate::lexicon::Lexicon;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::PI;

    fn torn_state() -> ConceptState {
        let mut s = ConceptState::new(
            "torn",
            Category::Emotion,
            [0.5, 0.1, 0.1, 0.1, 0.05, 0.05, 0.05, 0.05],
        )
        .unwrap();
        s.add_affect(AffectiveComponent::new("joy", 1.0, 0.0).unwrap());
        s.add_affect(AffectiveComponent::new("hope", 0.8, 0.05).unwrap());
        s.add_affect(AffectiveComponent::new("dread", 0.3, PI).unwrap());
        s
    }

    #[test]
    fn test_first_sample_is_stable_when_close() {
        let mut m = StabilityMonitor::new();
        let r = m.update_energies(0.8, 0.82);
        assert_eq!(r.status, StabilityStatus::Stable);
        assert!((r.divergence - 0.02).abs() < 1e-9);
        assert!(r.warnings.is_empty());
        assert!(r.recommendation.is_none());
        assert!(r.time_to_collapse.is_none());
    }

    #[test]
    fn test_ghost_state_emerging() {
        let mut m = StabilityMonitor::new();
        m.update_energies(0.8, 0.82);
        let r = m.update_energies(0.9, 0.5);
        assert_eq!(r.status, StabilityStatus::Warning);
        assert!((r.divergence - 0.4).abs() < 1e-9);
        assert!(r.has_warning(InstabilityWarning::GhostStateEmerging));
        assert!(r.recommendation.is_some());
        assert!(r.time_to_collapse.unwrap() >= 0.0);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let mut m = StabilityMonitor::new();
        let r = m.update_energies(1.5, -0.2);
        assert_eq!((r.h1, r.h2), (1.0, 0.0));
        assert_eq!(r.status, StabilityStatus::Critical);
        assert!(r.has_warning(InstabilityWarning::StructuralCollapse));
        assert_eq!(r.time_to_collapse, Some(0.0));
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut m = StabilityMonitor::new();
        for _ in 0..(HISTORY_CAPACITY + 50) {
            m.update_energies(0.5, 0.5);
        }
        assert_eq!(m.history().len(), HISTORY_CAPACITY);
        assert_eq!(m.history().iter().next().unwrap().tick, 50);
        assert_eq!(m.history().latest().unwrap().tick, 149);
    }

    #[test]
    fn test_derivatives_need_samples() {
        let d = Derivatives::from_positions(&[0.5], 0.1);
        assert_eq!(d, Derivatives::default());
        let d = Derivatives::from_positions(&[0.5, 0.6], 0.1);
        assert!((d.velocity - 1.0).abs() < 1e-9);
        assert_eq!(d.acceleration, 0.0);
        let d = Derivatives::from_positions(&[0.5, 0.5, 0.5, 0.6], 0.1);
        assert!((d.jerk - 100.0).abs() < 1e-6, "jerk={}", d.jerk);
        assert_eq!(d.snap, 0.0);
    }

    #[test]
    fn test_high_jerk_warns_without_divergence() {
        let mut m = StabilityMonitor::new();
        for _ in 0..3 {
            m.update_energies(0.5, 0.5);
        }
        let r = m.update_energies(0.6, 0.6);
        assert!(r.has_warning(InstabilityWarning::HighJerk));
        assert!(!r.has_warning(InstabilityWarning::GhostStateEmerging));
        assert_eq!(r.status, StabilityStatus::Warning);
    }

    #[test]
    fn test_high_snap_after_five_samples() {
        let mut m = StabilityMonitor::new();
        for _ in 0..4 {
            m.update_energies(0.5, 0.5);
        }
        let r = m.update_energies(0.51, 0.51);
        assert!(r.has_warning(InstabilityWarning::HighSnap));
    }

    #[test]
    fn test_rapid_coherence_loss() {
        let mut m = StabilityMonitor::new();
        m.update_energies(0.9, 0.9);
        m.update_energies(0.9, 0.9);
        let r = m.update_energies(0.5, 0.9);
        assert!(r.has_warning(InstabilityWarning::RapidCoherenceLoss));
    }

    #[test]
    fn test_energies_of_torn_state() {
        let s = torn_state();
        assert_eq!(s.opposition_count(), 2);
        assert!(coherence_energy(&s) > 1.0);
        let h2 = structural_energy(&s);
        assert!((h2 - 0.6335).abs() < 1e-3, "h2={}", h2);
    }

    #[test]
    fn test_stabilize_converges() {
        let mut m = StabilityMonitor::new();
        let mut s = torn_state();
        let mut divergence = m.update_energies(0.9, 0.3).divergence;
        let mut calls = 0;
        while divergence >= 0.3 {
            let next = m.stabilize(&mut s, StabilizeIntensity::Standard).divergence;
            assert!(next < divergence, "{} !< {}", next, divergence);
            divergence = next;
            calls += 1;
            assert!(calls <= 10, "did not converge");
        }
        assert_eq!(s.opposition_count(), 0);
        assert!((s.features.l2_norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_plain_concept_is_stable() {
        let plain = ConceptState::new("stone", Category::Noun, [1.0; 8]).unwrap();
        let r = StabilityMonitor::new().observe(&plain);
        assert!((r.h1 - 1.0).abs() < 1e-9, "h1={}", r.h1);
        assert!(r.divergence < 1e-9, "divergence={}", r.divergence);
        assert_eq!(r.status, StabilityStatus::Stable);
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_seeded_concepts_are_stable() {
        let lexicon = Lexicon::new();
        let concepts = lexicon.concepts(
            "yesterday the storm broke because fear grew quickly",
            &mut StdRng::seed_from_u64(11),
        );
        assert_eq!(concepts.len(), 8);
        for c in &concepts {
            let r = StabilityMonitor::new().observe(c);
            assert_eq!(r.status, StabilityStatus::Stable, "{}: {:?}", c.surface, r);
            assert!(r.divergence < 0.1, "{}: divergence={}", c.surface, r.divergence);
        }
    }

    #[test]
    fn test_stabilize_converges_for_plain_and_seeded_concepts() {
        let mut rng = StdRng::seed_from_u64(5);
        let seeded = Lexicon::new().concept("harbour", &mut rng);
        let plain = ConceptState::new(
            "lamp",
            Category::Noun,
            [0.6, 0.2, 0.3, 0.1, 0.4, 0.5, 0.3, 0.2],
        )
        .unwrap();
        for mut state in [plain, seeded] {
            let mut m = StabilityMonitor::new();
            let mut divergence = m.update_energies(0.9, 0.3).divergence;
            let mut calls = 0;
            while divergence >= 0.3 {
                let next = m.stabilize(&mut state, StabilizeIntensity::Standard).divergence;
                assert!(next < divergence, "{}: {} !< {}", state.surface, next, divergence);
                divergence = next;
                calls += 1;
                assert!(calls <= 10, "{} did not converge", state.surface);
            }
            assert!((state.features.l2_norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_stabilize_amplifies_when_structure_leads() {
        let mut m = StabilityMonitor::new();
        let mut s = ConceptState::new("flat", Category::Noun, [0.2, 0.1, 0.1, 0.1, 0.1, 0.1, 0.2, 0.1]).unwrap();
        m.update_energies(0.3, 0.9);
        let before = s.feature(Dim::Semantic);
        m.stabilize(&mut s, StabilizeIntensity::Aggressive);
        assert!(s.feature(Dim::Semantic) > before);
        assert!((s.features.l2_norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gentle_outcome_is_consistent() {
        let mut m = StabilityMonitor::new();
        let mut s = torn_state();
        let out = m.gentle_stabilize(&mut s);
        let expected = out.after.divergence < out.before.divergence
            && out.after.h1 >= out.before.h1
            && out.after.h2 >= out.before.h2;
        assert_eq!(out.improved, expected);
        assert_eq!(m.history().len(), 2);
    }

    #[test]
    fn test_field_tracks_and_ranks() {
        let mut field = StabilityField::default();
        let calm = ConceptState::new("calm", Category::Noun, [0.125; 8]).unwrap();
        let torn = torn_state();
        field.observe(&calm);
        field.observe(&torn);
        field.observe(&torn);
        assert_eq!(field.len(), 2);
        assert_eq!(field.monitor("torn").unwrap().history().len(), 2);
        for (_, r) in field.unstable() {
            assert_ne!(r.status, StabilityStatus::Stable);
        }
        let risks: Vec<f64> = field.unstable().iter().map(|(_, r)| r.risk).collect();
        assert!(risks.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_warning_tags() {
        assert_eq!(InstabilityWarning::GhostStateEmerging.to_string(), "GHOST_STATE_EMERGING");
        assert_eq!(InstabilityWarning::StructuralCollapse.as_str(), "STRUCTURAL_COLLAPSE");
        assert_eq!(StabilityStatus::Critical.to_string(), "CRITICAL");
    }
}
