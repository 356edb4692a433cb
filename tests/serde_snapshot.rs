//! Snapshot and configuration serialisation tests.
//!
//! Run with: `cargo test --features serde`

#![cfg(feature = "serde")]

use resonance_core::config::{EngineConfig, StabilityConfig};
use resonance_core::concept::AffectiveComponent;
use resonance_core::pattern::{Pattern, PatternSpace, PatternSpaceConfig};
use resonance_core::snapshot::{PatternSnapshot, SNAPSHOT_VERSION};
use resonance_core::stability::StabilityMonitor;
use resonance_core::{Category, ConceptState};

// ─── helpers ─────────────────────────────────────────────────────────────────

fn populated() -> PatternSpace {
    let mut space = PatternSpace::new(PatternSpaceConfig {
        dim: 8192,
        sparsity: 0.02,
        seed: 42,
    })
    .unwrap();
    let red = space.encode("red");
    let apple = space.encode("apple");
    let blend = space.superpose(&[red, apple]).unwrap();
    space.remember("red apple", blend).unwrap();
    space.encode("bicycle");
    space
}

// ─── snapshot ────────────────────────────────────────────────────────────────

#[test]
fn test_snapshot_json_roundtrip_preserves_every_pattern() {
    let space = populated();
    let snap = PatternSnapshot::from_space(&space);
    assert_eq!(snap.version, SNAPSHOT_VERSION);

    let json = serde_json::to_string(&snap).unwrap();
    let back: PatternSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);

    let mut restored = back.restore().unwrap();
    assert_eq!(restored.len(), space.len());
    for (id, p) in space.iter() {
        assert_eq!(restored.get(id).unwrap().as_ref(), p.as_ref(), "id={}", id);
    }
    // Same seed, so fresh encodings agree with the original space too.
    assert_eq!(restored.encode("pear").as_ref(), &space.project("pear"));
}

#[test]
fn test_snapshot_rejects_unknown_fields() {
    let json = r#"{"version":1,"dim":64,"sparsity":0.1,"seed":1,"concepts":[],"extra":true}"#;
    assert!(serde_json::from_str::<PatternSnapshot>(json).is_err());
}

#[test]
fn test_snapshot_with_invalid_config_fails_restore() {
    let json = r#"{"version":1,"dim":0,"sparsity":0.1,"seed":1,"concepts":[]}"#;
    let snap: PatternSnapshot = serde_json::from_str(json).unwrap();
    assert!(snap.restore().is_err());
}

// ─── config ──────────────────────────────────────────────────────────────────

#[test]
fn test_partial_config_fills_defaults() {
    let cfg: EngineConfig =
        serde_json::from_str(r#"{"skip_threshold":0.4,"stability":{"jerk_limit":0.5}}"#).unwrap();
    assert_eq!(cfg.skip_threshold, 0.4);
    assert_eq!(cfg.max_trace_length, 10);
    assert_eq!(cfg.stability.jerk_limit, 0.5);
    assert_eq!(cfg.stability.snap_limit, 2.0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_unknown_config_field_rejected() {
    assert!(serde_json::from_str::<EngineConfig>(r#"{"skipThreshold":0.4}"#).is_err());
    assert!(serde_json::from_str::<StabilityConfig>(r#"{"bogus":1}"#).is_err());
}

#[test]
fn test_config_roundtrip() {
    let cfg = EngineConfig::default();
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(serde_json::from_str::<EngineConfig>(&json).unwrap(), cfg);
}

// ─── reports and concepts ────────────────────────────────────────────────────

#[test]
fn test_report_and_concept_serialise() {
    let concept = ConceptState::new("dusk", Category::Temporal, [0.3, 0.9, 0.4, 0.2, 0.3, 0.5, 0.4, 0.5])
        .unwrap();
    let json = serde_json::to_string(&concept).unwrap();
    let back: ConceptState = serde_json::from_str(&json).unwrap();
    assert_eq!(back.surface, "dusk");
    assert_eq!(back.category, Category::Temporal);

    let mut monitor = StabilityMonitor::new();
    let report = monitor.observe(&concept);
    let value = serde_json::to_value(&report).unwrap();
    assert!(value.get("divergence").is_some());
    assert!(value.get("warnings").unwrap().is_array());
}

// ─── validated wire forms ────────────────────────────────────────────────────

#[test]
fn test_pattern_with_stray_high_bits_rejected() {
    let err = serde_json::from_str::<Pattern>(r#"{"dim":10,"words":[18446744073709551615]}"#)
        .unwrap_err();
    assert!(err.to_string().contains("invalid pattern"), "{}", err);
}

#[test]
fn test_pattern_with_missing_words_rejected() {
    assert!(serde_json::from_str::<Pattern>(r#"{"dim":100000,"words":[]}"#).is_err());
    assert!(serde_json::from_str::<Pattern>(r#"{"dim":64,"words":[0,0]}"#).is_err());
}

#[test]
fn test_pattern_json_roundtrip() {
    let p = Pattern::from_indices(130, [0, 64, 129]).unwrap();
    let json = serde_json::to_string(&p).unwrap();
    let back: Pattern = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
    assert_eq!(back.active_count(), 3);
}

#[test]
fn test_concept_carrying_bad_pattern_rejected() {
    let mut space = PatternSpace::new(PatternSpaceConfig {
        dim: 256,
        sparsity: 0.05,
        seed: 3,
    })
    .unwrap();
    let concept = ConceptState::new("tide", Category::Noun, [0.5; 8])
        .unwrap()
        .with_pattern(space.encode("tide"));
    let mut value = serde_json::to_value(&concept).unwrap();
    let back: ConceptState = serde_json::from_value(value.clone()).unwrap();
    assert_eq!(back, concept);

    value["pattern"]["dim"] = serde_json::json!(100_000);
    assert!(serde_json::from_value::<ConceptState>(value).is_err());
}

#[test]
fn test_affective_component_validated_on_load() {
    let ok: AffectiveComponent =
        serde_json::from_str(r#"{"label":"joy","weight":0.5,"phase":-1.5707963267948966}"#).unwrap();
    assert_eq!(ok.label(), "joy");
    assert!(ok.phase() >= 0.0 && ok.phase() < std::f64::consts::TAU);

    for bad in [
        r#"{"label":"joy","weight":1.5,"phase":0.0}"#,
        r#"{"label":"joy","weight":-0.1,"phase":0.0}"#,
    ] {
        let err = serde_json::from_str::<AffectiveComponent>(bad).unwrap_err();
        assert!(err.to_string().contains("invalid affective component"), "{}", err);
    }

    let mut concept = ConceptState::new("ache", Category::Emotion, [0.5; 8]).unwrap();
    concept.add_affect(AffectiveComponent::new("grief", 0.7, 1.0).unwrap());
    let mut value = serde_json::to_value(&concept).unwrap();
    value["affect"][0]["weight"] = serde_json::json!(3.0);
    assert!(serde_json::from_value::<ConceptState>(value).is_err());
}
