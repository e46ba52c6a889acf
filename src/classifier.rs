//! Tiered query classifier
//!
//! Maps raw query text to an intent with zero external calls, so routing is
//! deterministic and effectively free. Three tiers, first match wins:
//!
//! 1. Navigation/policy phrases (app usage, account, privacy) route to the
//!    knowledge base. Checked first because these phrases can contain domain
//!    words ("delete my account" has "my") that would otherwise misroute.
//! 2. Personal-data phrases route to the structured-log lookup.
//! 3. Fallback scoring over two disjoint word sets; the strictly higher count
//!    wins, a tie or zero-zero resolves to general reasoning.
//!
//! Ambiguity is never an error. A query the tiers cannot place is answered by
//! direct generation, which degrades quality but never availability.

use serde::Serialize;

/// Intent domain for a single query
///
/// Produced once per query and never revised mid-turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// App usage, account, or policy question; answer from the document index
    KnowledgeLookup,
    /// Personal nutrition/exercise log question; answer from the user's rows
    StructuredLookup,
    /// Everything else; answer by direct generation
    General,
}

impl Intent {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::KnowledgeLookup => "knowledge_lookup",
            Intent::StructuredLookup => "structured_lookup",
            Intent::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier 1: app navigation and policy phrases
const NAVIGATION_PHRASES: &[&str] = &[
    "how to change",
    "how do i change",
    "how to use",
    "how do i use",
    "how to update",
    "how do i update",
    "how to delete",
    "how do i delete",
    "how to reset",
    "how do i reset",
    "where is the",
    "where can i find",
    "change my password",
    "reset my password",
    "forgot my password",
    "delete my account",
    "privacy policy",
    "terms of service",
    "contact support",
    "log out",
    "sign out",
    "notification settings",
    "app settings",
];

/// Tier 2: personal-log phrases
const PERSONAL_DATA_PHRASES: &[&str] = &[
    "what did i eat",
    "what have i eaten",
    "did i eat",
    "what did i log",
    "what have i logged",
    "my calories",
    "my protein",
    "my carbs",
    "my fat",
    "my intake",
    "my meals",
    "my logs",
    "my workout",
    "my exercise",
    "total calories",
    "total protein",
    "total carbs",
    "total fat",
    "how much protein",
    "how many calories",
    "today",
    "yesterday",
    "this week",
    "last week",
    "this month",
    "for breakfast",
    "for lunch",
    "for dinner",
];

/// Tier 3 scoring: navigation-associated words
const NAVIGATION_WORDS: &[&str] = &[
    "password", "account", "settings", "profile", "notification", "privacy", "app", "screen",
    "button", "page", "login", "subscription", "support",
];

/// Tier 3 scoring: nutrition-associated words
const NUTRITION_WORDS: &[&str] = &[
    "eat",
    "ate",
    "eaten",
    "food",
    "meal",
    "calorie",
    "calories",
    "protein",
    "carb",
    "carbs",
    "carbohydrate",
    "fat",
    "breakfast",
    "lunch",
    "dinner",
    "snack",
    "log",
    "logged",
    "exercise",
    "workout",
    "weight",
];

/// Classify a query into an intent domain
///
/// Case-insensitive, deterministic, no external calls.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();

    if NAVIGATION_PHRASES.iter().any(|p| lower.contains(p)) {
        return Intent::KnowledgeLookup;
    }

    if PERSONAL_DATA_PHRASES.iter().any(|p| lower.contains(p)) {
        return Intent::StructuredLookup;
    }

    let navigation_score = word_score(&lower, NAVIGATION_WORDS);
    let nutrition_score = word_score(&lower, NUTRITION_WORDS);

    if navigation_score > nutrition_score {
        Intent::KnowledgeLookup
    } else if nutrition_score > navigation_score {
        Intent::StructuredLookup
    } else {
        Intent::General
    }
}

/// Count whole-word occurrences of any word in `words`
fn word_score(lower: &str, words: &[&str]) -> usize {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .filter(|token| words.contains(token))
        .count()
}
