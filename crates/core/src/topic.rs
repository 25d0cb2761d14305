//! Topic and TopicDetail: the catalog's value objects.
//!
//! The JSON shape (camelCase keys) is shared by the embedded catalog, the
//! schema sent to providers, and the persona context handed to the Oracle.

use serde::{Deserialize, Serialize};

/// How deep the rabbit hole goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Infinite,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Infinite => "Infinite",
        };
        f.write_str(label)
    }
}

/// A catalog entry representing one subject the archive can describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Unique, stable identifier (e.g. "quantum-computing")
    pub id: String,

    /// Display title
    pub title: String,

    /// One-line teaser
    pub short_description: String,

    /// Icon reference, resolved by whatever renders the catalog
    pub icon_name: String,

    pub difficulty: Difficulty,
}

/// The full narrative content for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub title: String,

    pub description: String,

    /// Why the topic is endless
    pub why_it_is_a_black_hole: String,

    pub key_concepts: Vec<KeyConcept>,

    /// Ordered study steps
    pub learning_roadmap: Vec<String>,

    pub philosophical_implications: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<CodeSnippet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConcept {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub language: String,
    pub code: String,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_uses_display_labels() {
        let json = serde_json::to_string(&Difficulty::VeryHigh).unwrap();
        assert_eq!(json, r#""Very High""#);
        let parsed: Difficulty = serde_json::from_str(r#""Infinite""#).unwrap();
        assert_eq!(parsed, Difficulty::Infinite);
        assert_eq!(Difficulty::VeryHigh.to_string(), "Very High");
    }

    #[test]
    fn topic_detail_uses_camel_case_keys() {
        let detail = TopicDetail {
            title: "P vs NP".into(),
            description: "d".into(),
            why_it_is_a_black_hole: "w".into(),
            key_concepts: vec![KeyConcept {
                name: "NP".into(),
                description: "verifiable".into(),
            }],
            learning_roadmap: vec!["Automata".into()],
            philosophical_implications: "p".into(),
            code_snippet: None,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("whyItIsABlackHole").is_some());
        assert!(json.get("keyConcepts").is_some());
        assert!(json.get("learningRoadmap").is_some());
        assert!(json.get("philosophicalImplications").is_some());
        assert!(json.get("codeSnippet").is_none());
    }

    #[test]
    fn topic_detail_rejects_missing_fields() {
        let result = serde_json::from_str::<TopicDetail>(r#"{"title":"X"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn topic_parses_catalog_shape() {
        let json = r#"{
            "id": "voynich",
            "title": "The Voynich Manuscript",
            "shortDescription": "Undeciphered.",
            "iconName": "Scroll",
            "difficulty": "Very High"
        }"#;
        let topic: Topic = serde_json::from_str(json).unwrap();
        assert_eq!(topic.id, "voynich");
        assert_eq!(topic.difficulty, Difficulty::VeryHigh);
    }
}
