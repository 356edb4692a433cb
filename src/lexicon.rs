//! Reference word classifier.
//!
//! Turning free text into categorised concepts is a collaborator concern; the
//! engine only needs a [`Classifier`]. [`Lexicon`] is a small deterministic
//! implementation: dictionary first, then suffix heuristics, then `Noun`.

use hashbrown::HashMap;
use rand::Rng;

use crate::concept::{Category, ConceptState};

/// Category plus a finer-grained tag explaining the decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Coarse category.
    pub category: Category,
    /// Subtype, e.g. `"article"`, `"manner"` or `"common"`.
    pub subtype: &'static str,
}

/// Maps a word to a [`Classification`]. Must be deterministic and total.
pub trait Classifier {
    /// Classify one word.
    fn classify(&self, word: &str) -> Classification;
}

const FUNCTION_WORDS: &[(&str, &str)] = &[
    ("the", "article"),
    ("a", "article"),
    ("an", "article"),
    ("of", "preposition"),
    ("in", "preposition"),
    ("on", "preposition"),
    ("at", "preposition"),
    ("to", "preposition"),
    ("with", "preposition"),
    ("from", "preposition"),
    ("and", "conjunction"),
    ("or", "conjunction"),
    ("but", "conjunction"),
    ("i", "pronoun"),
    ("you", "pronoun"),
    ("he", "pronoun"),
    ("she", "pronoun"),
    ("it", "pronoun"),
    ("we", "pronoun"),
    ("they", "pronoun"),
    ("is", "auxiliary"),
    ("are", "auxiliary"),
    ("was", "auxiliary"),
    ("were", "auxiliary"),
    ("be", "auxiliary"),
];

const EMOTION_WORDS: &[(&str, &str)] = &[
    ("joy", "positive"),
    ("love", "positive"),
    ("hope", "positive"),
    ("happy", "positive"),
    ("calm", "positive"),
    ("fear", "negative"),
    ("anger", "negative"),
    ("sad", "negative"),
    ("grief", "negative"),
    ("dread", "negative"),
    ("surprise", "neutral"),
];

const TEMPORAL_WORDS: &[(&str, &str)] = &[
    ("before", "sequence"),
    ("after", "sequence"),
    ("then", "sequence"),
    ("when", "sequence"),
    ("while", "sequence"),
    ("now", "deictic"),
    ("today", "deictic"),
    ("yesterday", "deictic"),
    ("tomorrow", "deictic"),
    ("always", "frequency"),
    ("never", "frequency"),
];

const CAUSAL_WORDS: &[(&str, &str)] = &[
    ("because", "reason"),
    ("since", "reason"),
    ("so", "consequence"),
    ("therefore", "consequence"),
    ("thus", "consequence"),
    ("if", "condition"),
    ("unless", "condition"),
];

/// Suffix rules, checked in order; the first match decides.
const SUFFIX_RULES: &[(&str, Category, &str)] = &[
    ("ly", Category::Adverb, "manner"),
    ("ing", Category::Verb, "progressive"),
    ("ed", Category::Verb, "past"),
    ("tion", Category::Noun, "abstract"),
    ("ness", Category::Noun, "abstract"),
    ("ment", Category::Noun, "abstract"),
    ("ity", Category::Noun, "abstract"),
    ("ous", Category::Adjective, "quality"),
    ("ful", Category::Adjective, "quality"),
    ("ive", Category::Adjective, "quality"),
    ("able", Category::Adjective, "quality"),
    ("al", Category::Adjective, "quality"),
    ("ize", Category::Verb, "process"),
    ("ise", Category::Verb, "process"),
    ("ate", Category::Verb, "process"),
    ("ify", Category::Verb, "process"),
];

/// Stems shorter than this never trigger a suffix rule ("red", "bed").
const MIN_STEM: usize = 2;

/// Dictionary plus suffix heuristics.
#[derive(Clone, Debug)]
pub struct Lexicon {
    entries: HashMap<String, Classification>,
}

impl Lexicon {
    /// Lexicon preloaded with function, emotion, temporal and causal words.
    pub fn new() -> Self {
        let mut lexicon = Self {
            entries: HashMap::new(),
        };
        for (table, category) in [
            (FUNCTION_WORDS, Category::Function),
            (EMOTION_WORDS, Category::Emotion),
            (TEMPORAL_WORDS, Category::Temporal),
            (CAUSAL_WORDS, Category::Causal),
        ] {
            for &(word, subtype) in table {
                lexicon.insert(word, category, subtype);
            }
        }
        lexicon
    }

    /// Add or replace a dictionary entry.
    pub fn insert(&mut self, word: &str, category: Category, subtype: &'static str) {
        self.entries
            .insert(word.to_lowercase(), Classification { category, subtype });
    }

    /// Number of dictionary entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify `word` and seed a concept from its category profile.
    pub fn concept<R: Rng>(&self, word: &str, rng: &mut R) -> ConceptState {
        let class = self.classify(word);
        ConceptState::seeded(word, class.category, rng)
    }

    /// Split `text` on non-alphabetic characters and seed one concept per word.
    pub fn concepts<R: Rng>(&self, text: &str, rng: &mut R) -> Vec<ConceptState> {
        text.split(|c: char| !c.is_alphabetic() && c != '\'')
            .filter(|w| !w.is_empty())
            .map(|w| self.concept(w, rng))
            .collect()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for Lexicon {
    fn classify(&self, word: &str) -> Classification {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Classification {
                category: Category::Unknown,
                subtype: "empty",
            };
        }
        if let Some(hit) = self.entries.get(word.as_str()) {
            return *hit;
        }
        for &(suffix, category, subtype) in SUFFIX_RULES {
            if word.len() >= suffix.len() + MIN_STEM && word.ends_with(suffix) {
                return Classification { category, subtype };
            }
        }
        Classification {
            category: Category::Noun,
            subtype: "common",
        }
    }
}
