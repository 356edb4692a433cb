//! Seam to an external text generator.
//!
//! The core never talks to a language model itself. A caller supplies any
//! [`Generator`] (closures qualify) and [`continue_trace`] hands it a prompt
//! built from a ranked trace. Failures propagate unchanged; there is no retry.

use crate::concept::ConceptState;
use crate::error::{ResonanceError, ResonanceResult};
use crate::trace::Trace;

/// Capability `generate(prompt) -> text`.
pub trait Generator {
    /// Produce a continuation of `prompt`.
    fn generate(&self, prompt: &str) -> ResonanceResult<String>;
}

impl<F> Generator for F
where
    F: Fn(&str) -> ResonanceResult<String>,
{
    fn generate(&self, prompt: &str) -> ResonanceResult<String> {
        self(prompt)
    }
}

/// Render a trace as a prompt: the visited surfaces joined by `→`, plus the
/// coherence score.
pub fn trace_prompt(trace: &Trace, tokens: &[ConceptState]) -> String {
    format!(
        "Continue the thought that follows this path: {} (coherence {:.2}).",
        trace.surfaces(tokens).join(" → "),
        trace.coherence()
    )
}

/// Ask `generator` to continue `trace`. Called exactly once.
///
/// An empty reply is reported as [`ResonanceError::Generation`].
pub fn continue_trace<G: Generator + ?Sized>(
    generator: &G,
    trace: &Trace,
    tokens: &[ConceptState],
) -> ResonanceResult<String> {
    let prompt = trace_prompt(trace, tokens);
    log::debug!("generation prompt: {}", prompt);
    let text = generator.generate(&prompt)?;
    if text.trim().is_empty() {
        return Err(ResonanceError::Generation("generator returned no text".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Category;
    use crate::trace::SkipTraceEngine;
    use std::cell::Cell;

    fn ranked_tokens() -> Vec<ConceptState> {
        [
            ("storm", Category::Noun, [0.2, 0.1, 0.1, 0.1, 0.1, 0.1, 0.2, 0.1]),
            ("breaks", Category::Verb, [0.2, 0.15, 0.1, 0.1, 0.1, 0.1, 0.15, 0.1]),
            ("loudly", Category::Adverb, [0.2, 0.2, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]),
        ]
        .into_iter()
        .map(|(s, c, f)| ConceptState::new(s, c, f).unwrap())
        .collect()
    }

    #[test]
    fn test_prompt_lists_surfaces() {
        let tokens = ranked_tokens();
        let ranked = SkipTraceEngine::default().generate_traces(&tokens).unwrap();
        let best = ranked.best().unwrap();
        let prompt = trace_prompt(best, &tokens);
        for s in best.surfaces(&tokens) {
            assert!(prompt.contains(s));
        }
    }

    #[test]
    fn test_generator_error_propagates_without_retry() {
        let tokens = ranked_tokens();
        let ranked = SkipTraceEngine::default().generate_traces(&tokens).unwrap();
        let calls = Cell::new(0);
        let failing = |_: &str| -> ResonanceResult<String> {
            calls.set(calls.get() + 1);
            Err(ResonanceError::Generation("offline".to_string()))
        };
        let err = continue_trace(&failing, ranked.best().unwrap(), &tokens).unwrap_err();
        assert_eq!(err, ResonanceError::Generation("offline".to_string()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_closure_generator_echoes() {
        let tokens = ranked_tokens();
        let ranked = SkipTraceEngine::default().generate_traces(&tokens).unwrap();
        let echo = |p: &str| -> ResonanceResult<String> { Ok(format!("echo: {}", p)) };
        let text = continue_trace(&echo, ranked.best().unwrap(), &tokens).unwrap();
        assert!(text.starts_with("echo: Continue"));
        let silent = |_: &str| -> ResonanceResult<String> { Ok("  ".to_string()) };
        assert!(continue_trace(&silent, ranked.best().unwrap(), &tokens).is_err());
    }
}
