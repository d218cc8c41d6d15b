//! Conversation intent classification by keyword matching.
//!
//! Deterministic and case-insensitive: education keywords win over quiz
//! keywords by evaluation order, everything else is client support.

use serde::{Deserialize, Serialize};

/// Closed set of conversation intents. Selects the responder persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Client support — the default when nothing else matches.
    Client,
    Education,
    Quiz,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Education => "education",
            Self::Quiz => "quiz",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Self::Client),
            "education" => Some(Self::Education),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

/// Tutoring vocabulary, French then English.
pub const EDUCATION_KW: &[&str] = &[
    "apprendre", "étudier", "etudier", "cours", "leçon", "lecon", "devoir",
    "exercice", "expliquer", "comprendre", "mathématiques", "mathematiques",
    "algèbre", "algebre", "grammaire", "enseigner", "réviser", "reviser",
    "learn", "study", "course", "lesson", "homework", "exercise", "explain",
    "understand", "math", "algebra", "grammar", "teach", "revise",
];

/// Quiz vocabulary, French then English.
pub const QUIZ_KW: &[&str] = &[
    "quiz", "devinette", "jouer", "jeu", "défi", "defi", "questionnaire",
    "play", "game", "trivia", "challenge",
];

/// True when any keyword occurs as a substring of the lowercased text.
fn kw_match(text_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text_lower.contains(kw))
}

/// Classify a message. Ties resolve to education by evaluation order.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    if kw_match(&lower, EDUCATION_KW) {
        Intent::Education
    } else if kw_match(&lower, QUIZ_KW) {
        Intent::Quiz
    } else {
        Intent::Client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_education_message() {
        assert_eq!(classify("I want to learn algebra"), Intent::Education);
        assert_eq!(classify("Peux-tu m'expliquer ce cours ?"), Intent::Education);
    }

    #[test]
    fn test_quiz_message() {
        assert_eq!(classify("let's play a quiz game"), Intent::Quiz);
        assert_eq!(classify("On fait une devinette ?"), Intent::Quiz);
    }

    #[test]
    fn test_client_default() {
        assert_eq!(classify("my bill is wrong"), Intent::Client);
        assert_eq!(classify("bonjour"), Intent::Client);
        assert_eq!(classify(""), Intent::Client);
    }

    #[test]
    fn test_tie_resolves_to_education() {
        // Both lists match; education is evaluated first.
        assert_eq!(classify("quiz about what I learn"), Intent::Education);
        assert_eq!(classify("un jeu pour réviser"), Intent::Education);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("LEARN FRACTIONS"), Intent::Education);
        assert_eq!(classify("QUIZ TIME"), Intent::Quiz);
    }

    #[test]
    fn test_every_education_keyword_labels_education() {
        for kw in EDUCATION_KW {
            assert_eq!(
                classify(kw),
                Intent::Education,
                "keyword {kw:?} should classify as education"
            );
        }
    }

    #[test]
    fn test_every_quiz_keyword_labels_quiz() {
        for kw in QUIZ_KW {
            // Skip keywords shadowed by the education list's precedence.
            let lower = kw.to_lowercase();
            if EDUCATION_KW.iter().any(|e| lower.contains(e)) {
                continue;
            }
            assert_eq!(
                classify(kw),
                Intent::Quiz,
                "keyword {kw:?} should classify as quiz"
            );
        }
    }

    #[test]
    fn test_intent_roundtrip() {
        for i in [Intent::Client, Intent::Education, Intent::Quiz] {
            assert_eq!(Intent::parse(i.as_str()), Some(i));
        }
        assert!(Intent::parse("support").is_none());
    }
}
