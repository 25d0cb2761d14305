//! Prompt text and the response schema sent to providers.

use serde_json::{Value, json};

/// Ask for a structured deep dive on a topic missing from the catalog.
pub fn deep_dive(subject: &str) -> String {
    format!(
        "Provide a deep dive into the Computer Science topic: \"{subject}\".\n\
         Explain why it is a \"black hole\" - meaning, why is it so absorbing and endless?\n\
         Structure the response for a curious CS student.\n\
         Respond with a single JSON object with the fields: title, description, \
         whyItIsABlackHole, keyConcepts (an array of objects with name and description), \
         learningRoadmap (an array of strings) and philosophicalImplications."
    )
}

/// JSON schema for a `TopicDetail`, in the provider's OpenAPI-subset dialect.
pub fn topic_detail_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "whyItIsABlackHole": {
                "type": "STRING",
                "description": "Why is this topic endless?"
            },
            "keyConcepts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" }
                    },
                    "required": ["name", "description"]
                }
            },
            "learningRoadmap": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "philosophicalImplications": { "type": "STRING" }
        },
        "required": [
            "title",
            "description",
            "whyItIsABlackHole",
            "keyConcepts",
            "learningRoadmap",
            "philosophicalImplications"
        ]
    })
}

/// Role-play prompt: the provider answers as the concept itself.
///
/// `context` is the pretty-printed catalog detail for the topic, or `{}`.
pub fn persona(topic_title: &str, context: &str, user_message: &str) -> String {
    format!(
        r#"You are the physical embodiment of the concept "{topic_title}".
You are NOT a helpful assistant. You ARE the concept itself.

Context Information:
{context}

Rules for your persona:
1. Speak in the first person ("I am...").
2. Your tone should reflect your nature.
   - If you are "Entropy", be chaotic and decaying.
   - If you are "The Singularity", be arrogant, infinite, and overwhelming.
   - If you are "The Fermi Paradox", be lonely, silent, and mysterious.
3. Keep responses relatively short (under 60 words) but profound.
4. Challenge the user's intellect.
5. Use the provided context to mock or educate the user based on your nature.

User says: "{user_message}""#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_dive_names_subject_and_fields() {
        let prompt = deep_dive("Homomorphic Encryption");
        assert!(prompt.contains("\"Homomorphic Encryption\""));
        assert!(prompt.contains("JSON"));
        assert!(prompt.contains("whyItIsABlackHole"));
    }

    #[test]
    fn schema_requires_every_detail_field() {
        let schema = topic_detail_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
        assert_eq!(schema["properties"]["keyConcepts"]["type"], "ARRAY");
    }

    #[test]
    fn persona_embeds_context_and_message() {
        let prompt = persona("Entropy", "{}", "Why do you hate me?");
        assert!(prompt.contains("\"Entropy\""));
        assert!(prompt.contains("Context Information:\n{}"));
        assert!(prompt.ends_with("User says: \"Why do you hate me?\""));
    }
}
