use crate::plan::{Classification, Resource, ResourceKind, ResourcePhase};
use crate::rng::PlanRng;

struct ClassifierRule {
    keywords: &'static [&'static str],
    kind: ResourceKind,
    phase: ResourcePhase,
    description: &'static str,
}

// Ordered: first matching category wins. Practice keywords are checked
// before review/reference/learning so "practice test" never classifies as
// reference material.
const CLASSIFIER_RULES: &[ClassifierRule] = &[
    ClassifierRule {
        keywords: &[
            "practice", "problem", "exercise", "quiz", "worksheet", "drill", "past paper", "mock",
        ],
        kind: ResourceKind::Practice,
        phase: ResourcePhase::Late,
        description: "work problems under exam-like conditions",
    },
    ClassifierRule {
        keywords: &["flashcard", "review", "summary", "notes", "anki", "cheat sheet"],
        kind: ResourceKind::Review,
        phase: ResourcePhase::Mid,
        description: "reinforce material already studied",
    },
    ClassifierRule {
        keywords: &["reference", "manual", "documentation", "glossary", "formula", "handbook"],
        kind: ResourceKind::Reference,
        phase: ResourcePhase::Early,
        description: "look up definitions and formulas while studying",
    },
    ClassifierRule {
        keywords: &["textbook", "book", "video", "lecture", "course", "tutorial", "podcast"],
        kind: ResourceKind::Learning,
        phase: ResourcePhase::Early,
        description: "build first understanding of new topics",
    },
];

/// Classify a resource by name. Pure; ordered keyword matching with a
/// learning/mid default for names no rule recognizes.
pub fn classify_resource(name: &str) -> Classification {
    let lowered = name.to_lowercase();
    for rule in CLASSIFIER_RULES {
        if rule.keywords.iter().any(|k| lowered.contains(k)) {
            return Classification {
                kind: rule.kind,
                phase: rule.phase,
                description: rule.description.to_string(),
            };
        }
    }
    Classification {
        kind: ResourceKind::Learning,
        phase: ResourcePhase::Mid,
        description: "general study material".to_string(),
    }
}

/// Build classified Resource records from raw names, minting ids from the
/// injected randomness source.
pub fn build_resources(names: &[String], rng: &PlanRng) -> Vec<Resource> {
    names
        .iter()
        .map(|name| Resource {
            id: rng.next_id("res"),
            name: name.clone(),
            classification: classify_resource(name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn practice_wins_over_later_categories() {
        // "practice test" also contains no review/reference keywords, but
        // order still matters for names like "practice notes".
        let c = classify_resource("Practice Notes");
        assert_eq!(c.kind, ResourceKind::Practice);
        assert_eq!(c.phase, ResourcePhase::Late);
    }

    #[test]
    fn flashcards_are_review_mid() {
        let c = classify_resource("Biology Flashcards");
        assert_eq!(c.kind, ResourceKind::Review);
        assert_eq!(c.phase, ResourcePhase::Mid);
    }

    #[test]
    fn formula_sheet_is_reference_early() {
        let c = classify_resource("Formula sheet");
        assert_eq!(c.kind, ResourceKind::Reference);
        assert_eq!(c.phase, ResourcePhase::Early);
    }

    #[test]
    fn textbook_is_learning_early() {
        let c = classify_resource("Campbell Textbook");
        assert_eq!(c.kind, ResourceKind::Learning);
        assert_eq!(c.phase, ResourcePhase::Early);
    }

    #[test]
    fn unknown_names_default_to_learning_mid() {
        let c = classify_resource("Mr. Harris handouts");
        assert_eq!(c.kind, ResourceKind::Learning);
        assert_eq!(c.phase, ResourcePhase::Mid);
    }
}
