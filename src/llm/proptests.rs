//! Property-based tests for the chat completions translation layer
//!
//! - Message translation is 1:1 and preserves order, role and content
//! - Temperature always reaches the wire
//! - Responses without usable text are rejected

use super::openai::{translate_message, OpenAIChoice, OpenAIMessage, OpenAIResponse, OpenAIService};
use super::types::CompletionRequest;
use crate::conversation::{Message, Role};
use proptest::prelude::*;

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (arb_role(), "[a-zA-Z0-9 _.!?,éà\n]{0,100}")
        .prop_map(|(role, content)| Message { role, content })
}

fn service() -> OpenAIService {
    OpenAIService::new("key".to_string(), "gpt-4o-mini", None).unwrap()
}

proptest! {
    #[test]
    fn translation_preserves_transcript(messages in proptest::collection::vec(arb_message(), 0..20)) {
        let request = CompletionRequest::new(messages.clone(), 0.3);
        let translated = service().translate_request(&request);

        prop_assert_eq!(translated.messages.len(), messages.len());
        for (wire, original) in translated.messages.iter().zip(&messages) {
            prop_assert_eq!(wire.role.as_str(), original.role.as_str());
            prop_assert_eq!(wire.content.as_deref(), Some(original.content.as_str()));
        }
    }

    #[test]
    fn temperature_always_sent(temperature in 0.0f32..2.0) {
        let request = CompletionRequest::new(vec![Message::user("q")], temperature);
        let translated = service().translate_request(&request);
        prop_assert_eq!(translated.temperature, Some(temperature));
        prop_assert!(!translated.stream);
    }

    #[test]
    fn single_message_round_trips_role(message in arb_message()) {
        let wire = translate_message(&message);
        let expected = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        prop_assert_eq!(wire.role, expected);
    }

    #[test]
    fn whitespace_only_content_rejected(content in "[ \t\n]{0,10}") {
        let resp = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage { role: "assistant".to_string(), content: Some(content) },
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        };
        prop_assert!(OpenAIService::normalize_response(resp).is_err());
    }

    #[test]
    fn non_empty_content_preserved(content in "[a-zA-Z][a-zA-Z0-9 ]{0,60}") {
        let resp = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage { role: "assistant".to_string(), content: Some(content.clone()) },
                finish_reason: None,
            }],
            usage: None,
        };
        let normalized = OpenAIService::normalize_response(resp).unwrap();
        prop_assert_eq!(normalized.text, content);
        prop_assert_eq!(normalized.usage.total(), 0);
    }
}
