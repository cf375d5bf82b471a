//! Prompt templates for the journaling assistant.

use ink_common::OperationClass;
use serde::{Deserialize, Serialize};

use super::{ContentBlock, LlmMessage, LlmRequest, Role};

const CHAT_SYSTEM: &str = "You are a warm, thoughtful journaling companion. \
Help the writer reflect on what they have written. Ask at most one question \
at a time, keep replies short, and never give medical or legal advice.";

const SUMMARY_INSTRUCTIONS: &str = "Summarize the journal entries below in a \
short paragraph written to the author in the second person.";

const THEMES_INSTRUCTIONS: &str = "Identify up to five recurring themes in the \
journal entries below. Reply with a JSON object inside a ```json code block \
shaped as {\"themes\": [{\"name\": string, \"description\": string}]}, \
followed by one sentence of encouragement.";

const CHART_INSTRUCTIONS: &str = "Estimate the author's overall mood for each \
journal entry below on a scale from 1 (low) to 10 (high). Reply only with a \
JSON object inside a ```json code block shaped as {\"title\": string, \
\"series\": [{\"label\": string, \"value\": number}]} with one point per entry \
in the order given.";

const TRANSCRIBE_INSTRUCTIONS: &str = "Transcribe the handwritten journal page \
in this image exactly as written. Preserve paragraph breaks. Reply with the \
transcription only; write [illegible] for words you cannot read.";

/// What the analysis endpoint is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Summary,
    Themes,
    Chart,
}

impl AnalysisKind {
    /// Chart generation is the costly call and gets the longer cooldown.
    pub fn operation_class(&self) -> OperationClass {
        match self {
            AnalysisKind::Chart => OperationClass::Expensive,
            AnalysisKind::Summary | AnalysisKind::Themes => OperationClass::Interactive,
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => SUMMARY_INSTRUCTIONS,
            AnalysisKind::Themes => THEMES_INSTRUCTIONS,
            AnalysisKind::Chart => CHART_INSTRUCTIONS,
        }
    }
}

/// A chat turn as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

pub fn chat_request(turns: &[ChatTurn], max_tokens: u32) -> LlmRequest {
    LlmRequest {
        max_tokens,
        system: Some(CHAT_SYSTEM.to_string()),
        messages: turns
            .iter()
            .map(|turn| LlmMessage {
                role: turn.role,
                content: vec![ContentBlock::text(turn.content.trim())],
            })
            .collect(),
    }
}

pub fn analysis_request(kind: AnalysisKind, entries: &[String], max_tokens: u32) -> LlmRequest {
    let mut prompt = String::from(kind.instructions());
    prompt.push_str("\n\n");
    for (i, entry) in entries.iter().enumerate() {
        prompt.push_str(&format!("<entry index=\"{}\">\n{}\n</entry>\n", i + 1, entry.trim()));
    }

    LlmRequest {
        max_tokens,
        system: None,
        messages: vec![LlmMessage::user(prompt)],
    }
}

pub fn transcription_request(media_type: &str, base64_data: &str, max_tokens: u32) -> LlmRequest {
    LlmRequest {
        max_tokens,
        system: None,
        messages: vec![LlmMessage {
            role: Role::User,
            content: vec![
                ContentBlock::image(media_type, base64_data),
                ContentBlock::text(TRANSCRIBE_INSTRUCTIONS),
            ],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_is_expensive() {
        assert_eq!(AnalysisKind::Chart.operation_class(), OperationClass::Expensive);
        assert_eq!(AnalysisKind::Summary.operation_class(), OperationClass::Interactive);
        assert_eq!(AnalysisKind::Themes.operation_class(), OperationClass::Interactive);
    }

    #[test]
    fn test_chat_request_keeps_turn_order() {
        let turns = vec![
            ChatTurn { role: Role::User, content: "I slept badly ".to_string() },
            ChatTurn { role: Role::Assistant, content: "What kept you up?".to_string() },
            ChatTurn { role: Role::User, content: "Work.".to_string() },
        ];
        let request = chat_request(&turns, 300);

        assert_eq!(request.max_tokens, 300);
        assert!(request.system.is_some());
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0], LlmMessage::user("I slept badly"));
        assert_eq!(request.messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_analysis_request_numbers_entries() {
        let entries = vec!["First day.".to_string(), "Second day.".to_string()];
        let request = analysis_request(AnalysisKind::Chart, &entries, 2048);

        let ContentBlock::Text { text } = &request.messages[0].content[0] else {
            panic!("expected text block");
        };
        assert!(text.starts_with(CHART_INSTRUCTIONS));
        assert!(text.contains("<entry index=\"1\">\nFirst day.\n</entry>"));
        assert!(text.contains("<entry index=\"2\">\nSecond day.\n</entry>"));
    }

    #[test]
    fn test_transcription_request_puts_image_first() {
        let request = transcription_request("image/png", "AAAA", 1024);
        let content = &request.messages[0].content;
        assert_eq!(content[0], ContentBlock::image("image/png", "AAAA"));
        assert!(matches!(content[1], ContentBlock::Text { .. }));
    }
}
