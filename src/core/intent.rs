//! Intent classification for incoming chat messages.
//!
//! The classifier is a pure keyword matcher: no state, no I/O, and it never
//! fails. Keyword families are tested in a fixed priority order and the first
//! family with a match wins.

use serde::{Deserialize, Serialize};

/// Closed set of routing categories a message can fall under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Registry statistics, SQL, charts.
    Data,
    /// Clinical reasoning questions.
    Medical,
    /// Search over free-text clinical notes.
    Rag,
    /// Building a filtered patient subset.
    Cohort,
    /// Navigating the application.
    Ui,
    /// Anything else.
    General,
}

impl Intent {
    /// Every intent, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Data,
        Self::Medical,
        Self::Rag,
        Self::Cohort,
        Self::Ui,
        Self::General,
    ];

    /// Parses an intent label, accepting the `sql` and `coding` synonyms for
    /// [`Intent::Data`]. Returns `None` for anything unrecognized.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "data" | "sql" | "coding" => Some(Self::Data),
            "medical" => Some(Self::Medical),
            "rag" => Some(Self::Rag),
            "cohort" => Some(Self::Cohort),
            "ui" => Some(Self::Ui),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Medical => "medical",
            Self::Rag => "rag",
            Self::Cohort => "cohort",
            Self::Ui => "ui",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword and how strictly it must match.
///
/// Plain keywords match anywhere, so `patient` fires inside `outpatient`.
/// Whole-word keywords must start and end at a word boundary, which keeps
/// short tokens like `ef` or `min` from firing inside `before` or `admin`.
#[derive(Debug, Clone, Copy)]
struct Keyword {
    text: &'static str,
    whole_word: bool,
}

const fn p(text: &'static str) -> Keyword {
    Keyword {
        text,
        whole_word: false,
    }
}

const fn w(text: &'static str) -> Keyword {
    Keyword {
        text,
        whole_word: true,
    }
}

const RAG_KEYWORDS: &[Keyword] = &[
    w("rag"),
    p("note"),
    p("document"),
    p("free text"),
    p("narrative"),
    p("mention"),
];

const COHORT_KEYWORDS: &[Keyword] = &[
    p("cohort"),
    p("eligib"),
    p("inclusion"),
    p("exclusion"),
    p("filter"),
    p("criteria"),
    p("group"),
];

const UI_KEYWORDS: &[Keyword] = &[
    p("open"),
    p("navigate"),
    p("go to"),
    p("dashboard"),
    p("registry"),
    p("analytics"),
    p("chart builder"),
    p("timeline"),
    p("dictionary"),
];

const DATA_KEYWORDS: &[Keyword] = &[
    p("patient"),
    w("count"),
    w("counts"),
    p("how many"),
    p("average"),
    w("mean"),
    w("median"),
    w("min"),
    w("minimum"),
    w("max"),
    w("maximum"),
    w("list"),
    w("show"),
    w("query"),
    w("sql"),
    w("age"),
    w("ages"),
    w("gender"),
    w("ef"),
    p("ejection fraction"),
    p("hypertension"),
    p("diabetes"),
];

const MEDICAL_KEYWORDS: &[Keyword] = &[
    p("symptom"),
    p("diagnos"),
    p("treat"),
    p("therap"),
    p("medication"),
    p("medicine"),
    p("drug"),
    p("dose"),
    p("dosage"),
    p("side effect"),
    p("prognos"),
    p("guideline"),
    p("risk factor"),
    p("clinical"),
    p("disease"),
    p("cardiomyopath"),
    p("heart failure"),
    p("arrhythmi"),
    p("syndrome"),
    p("contraindicat"),
];

/// Family priority. The structural SQL check runs before all of these.
const FAMILIES: [(Intent, &[Keyword]); 5] = [
    (Intent::Rag, RAG_KEYWORDS),
    (Intent::Cohort, COHORT_KEYWORDS),
    (Intent::Ui, UI_KEYWORDS),
    (Intent::Data, DATA_KEYWORDS),
    (Intent::Medical, MEDICAL_KEYWORDS),
];

/// Deterministic keyword classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    /// Creates a classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Maps a message to an intent. Empty or whitespace-only input is
    /// [`Intent::General`].
    #[must_use]
    pub fn classify(&self, message: &str) -> Intent {
        let text = message.trim().to_lowercase();
        if text.is_empty() {
            return Intent::General;
        }

        if starts_with_sql(&text) {
            return Intent::Data;
        }

        FAMILIES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| contains_keyword(&text, *kw)))
            .map_or(Intent::General, |(intent, _)| *intent)
    }
}

/// Returns `true` when the message is literally a `SELECT`/`WITH` statement.
fn starts_with_sql(text: &str) -> bool {
    let mut words = text.split_whitespace();
    matches!(words.next(), Some("select" | "with")) && words.next().is_some()
}

fn contains_keyword(text: &str, kw: Keyword) -> bool {
    if !kw.whole_word {
        return text.contains(kw.text);
    }
    text.match_indices(kw.text).any(|(start, matched)| {
        let before_ok = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = text[start + matched.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Build a cohort of females with diabetes", Intent::Cohort; "cohort request")]
    #[test_case("Find mention of hypertension in notes", Intent::Rag; "notes search")]
    #[test_case("Open the registry view", Intent::Ui; "navigation")]
    #[test_case("Hello there", Intent::General; "greeting")]
    #[test_case("How many patients are there?", Intent::Data; "count question")]
    #[test_case("SELECT age FROM patients", Intent::Data; "literal select")]
    #[test_case("with t as (select 1) select * from t", Intent::Data; "literal cte")]
    #[test_case("What are the symptoms of heart failure?", Intent::Medical; "clinical question")]
    #[test_case("", Intent::General; "empty")]
    #[test_case("   \t\n", Intent::General; "whitespace")]
    fn test_classify_routing_table(message: &str, expected: Intent) {
        assert_eq!(IntentClassifier::new().classify(message), expected);
    }

    #[test]
    fn test_priority_rag_beats_data_and_medical() {
        // "patients" (data) and "diagnosis" (medical) also match.
        let intent = IntentClassifier::new().classify("Search notes of patients with a diagnosis");
        assert_eq!(intent, Intent::Rag);
    }

    #[test]
    fn test_priority_data_beats_medical() {
        let intent = IntentClassifier::new().classify("Treatment options for diabetes");
        assert_eq!(intent, Intent::Data);
    }

    #[test]
    fn test_sql_prefix_beats_keyword_families() {
        let intent = IntentClassifier::new().classify("select * from notes");
        assert_eq!(intent, Intent::Data);
    }

    #[test]
    fn test_short_keywords_need_word_boundaries() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("Define it before lunch"), Intent::General);
        assert_eq!(classifier.classify("Average EF please"), Intent::Data);
        assert_eq!(classifier.classify("ef below 40"), Intent::Data);
    }

    #[test_case("Outpatient visits last year", Intent::Data; "patient inside a word")]
    #[test_case("Reopen the dashboard", Intent::Ui; "open inside a word")]
    #[test_case("Subgroup by nationality", Intent::Cohort; "group inside a word")]
    #[test_case("Maxwell's admin list", Intent::Data; "list still whole word")]
    #[test_case("Admin settings for Maxwell", Intent::General; "min and max need whole words")]
    fn test_plain_keywords_match_inside_words(message: &str, expected: Intent) {
        assert_eq!(IntentClassifier::new().classify(message), expected);
    }

    #[test]
    fn test_case_insensitive() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("OPEN ANALYTICS"), Intent::Ui);
        assert_eq!(classifier.classify("Cohort Builder"), Intent::Cohort);
    }

    #[test]
    fn test_intent_parse_synonyms() {
        assert_eq!(Intent::parse("sql"), Some(Intent::Data));
        assert_eq!(Intent::parse("Coding"), Some(Intent::Data));
        assert_eq!(Intent::parse(" medical "), Some(Intent::Medical));
        assert_eq!(Intent::parse("weather"), None);
    }

    #[test]
    fn test_intent_round_trip_labels() {
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn test_intent_serialization() {
        let json = serde_json::to_string(&Intent::Rag).unwrap_or_default();
        assert_eq!(json, "\"rag\"");
    }

    proptest::proptest! {
        #[test]
        fn prop_classify_is_deterministic(message in ".{0,80}") {
            let classifier = IntentClassifier::new();
            proptest::prop_assert_eq!(classifier.classify(&message), classifier.classify(&message));
        }
    }
}
