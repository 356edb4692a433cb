//! Dual-energy monitor scenarios: classification, correction and many-concept
//! tracking.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::SeedableRng;
use resonance_core::concept::{AffectiveComponent, Category, ConceptState};
use resonance_core::config::StabilityConfig;
use resonance_core::lexicon::Lexicon;
use resonance_core::stability::{
    coherence_energy, structural_energy, InstabilityWarning, StabilityField, StabilityMonitor,
    StabilityStatus, StabilizeIntensity,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

fn conflicted() -> ConceptState {
    let mut s = ConceptState::new(
        "bittersweet",
        Category::Emotion,
        [0.5, 0.1, 0.1, 0.1, 0.05, 0.05, 0.05, 0.05],
    )
    .unwrap();
    s.add_affect(AffectiveComponent::new("joy", 1.0, 0.0).unwrap());
    s.add_affect(AffectiveComponent::new("hope", 0.8, 0.05).unwrap());
    s.add_affect(AffectiveComponent::new("dread", 0.3, PI).unwrap());
    s
}

// ─── classification ──────────────────────────────────────────────────────────

#[test]
fn test_classification_sequence() {
    let mut monitor = StabilityMonitor::new();

    let calm = monitor.update_energies(0.8, 0.82);
    assert_eq!(calm.status, StabilityStatus::Stable);
    assert!((calm.divergence - 0.02).abs() < 1e-9);

    let ghost = monitor.update_energies(0.9, 0.5);
    assert_ne!(ghost.status, StabilityStatus::Stable);
    assert!((ghost.divergence - 0.4).abs() < 1e-9);
    assert!(ghost.has_warning(InstabilityWarning::GhostStateEmerging));
    assert_eq!(monitor.report(), Some(ghost));
}

#[test]
fn test_report_before_any_sample() {
    assert!(StabilityMonitor::new().report().is_none());
}

#[test]
fn test_custom_thresholds() {
    let strict = StabilityConfig {
        warning_divergence: 0.01,
        ..StabilityConfig::default()
    };
    let mut monitor = StabilityMonitor::with_config(strict).unwrap();
    let r = monitor.update_energies(0.8, 0.82);
    assert_eq!(r.status, StabilityStatus::Warning);

    let broken = StabilityConfig {
        dt: -1.0,
        ..StabilityConfig::default()
    };
    assert!(StabilityMonitor::with_config(broken).is_err());
}

#[test]
fn test_steady_energies_stay_stable() {
    let mut monitor = StabilityMonitor::new();
    for _ in 0..20 {
        let r = monitor.update_energies(0.7, 0.72);
        assert_eq!(r.status, StabilityStatus::Stable, "{:?}", r);
        assert!(r.derivatives.jerk.abs() < 1e-6);
    }
}

// ─── correction ──────────────────────────────────────────────────────────────

#[test]
fn test_stabilize_reconverges_within_budget() {
    let mut monitor = StabilityMonitor::new();
    let mut state = conflicted();
    let mut divergence = monitor.update_energies(0.9, 0.3).divergence;
    let mut history = vec![divergence];
    for _ in 0..10 {
        if divergence < 0.3 {
            break;
        }
        divergence = monitor
            .stabilize(&mut state, StabilizeIntensity::Standard)
            .divergence;
        history.push(divergence);
    }
    assert!(divergence < 0.3, "divergence history {:?}", history);
    assert!(history.windows(2).all(|w| w[1] < w[0]), "{:?}", history);
    // Nothing is discarded: every affective component survives.
    assert_eq!(state.affect.len(), 3);
}

#[test]
fn test_energies_follow_state() {
    let state = conflicted();
    let mut monitor = StabilityMonitor::new();
    let r = monitor.observe(&state);
    assert_eq!(r.h1, coherence_energy(&state).min(1.0));
    assert!((r.h2 - structural_energy(&state)).abs() < 1e-12);
}

#[test]
fn test_gentle_step_reports_outcome() {
    let mut monitor = StabilityMonitor::new();
    let mut state = conflicted();
    let outcome = monitor.gentle_stabilize(&mut state);
    assert_eq!(outcome.before.h1, 1.0);
    assert!(outcome.after.divergence.is_finite());
    if !outcome.improved {
        // Escalation is the caller's call.
        let r = monitor.stabilize(&mut state, StabilizeIntensity::Aggressive);
        assert!(r.divergence.is_finite());
    }
}

// ─── field ───────────────────────────────────────────────────────────────────

#[test]
fn test_field_lists_unstable_concepts() {
    let mut field = StabilityField::new(StabilityConfig::default()).unwrap();
    let conflicted = conflicted();
    field.observe(&conflicted);
    assert_eq!(field.len(), 1);

    let unstable = field.unstable();
    assert_eq!(unstable.len(), 1);
    assert_eq!(unstable[0].0, "bittersweet");

    let mut state = conflicted.clone();
    let monitor = field.monitor_mut("bittersweet").unwrap();
    let r = monitor.stabilize(&mut state, StabilizeIntensity::Standard);
    assert!(r.divergence < 0.3);
    assert!(field.unstable().is_empty());
    assert!(field.remove("bittersweet").is_some());
    assert!(field.is_empty());
}

#[test]
fn test_field_of_seeded_sentence_is_calm() {
    let concepts = Lexicon::new().concepts(
        "the river floods slowly after rain",
        &mut StdRng::seed_from_u64(21),
    );
    let mut field = StabilityField::new(StabilityConfig::default()).unwrap();
    for c in &concepts {
        let r = field.observe(c);
        assert_eq!(r.status, StabilityStatus::Stable, "{}: {:?}", c.surface, r);
    }
    assert_eq!(field.len(), concepts.len());
    assert!(field.unstable().is_empty());
}
