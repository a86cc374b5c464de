//! Structured section summaries via the chat model
//!
//! Truncates over-long input to a character budget before prompting, and
//! degrades to a fixed failure message instead of propagating provider
//! errors (the HTTP layer treats summaries as best-effort).

use crate::ai_client::ChatModel;
use crate::utils::safe_truncate;

/// Character budget for summary input; prevents token-limit errors on
/// long sections.
pub const MAX_SUMMARY_INPUT_CHARS: usize = 12_000;

/// Appended when the input was cut at the budget.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated for length...]";

const FAILURE_MESSAGE: &str = "Failed to generate summary. Please try again.";

fn build_prompt(input_text: &str) -> String {
    format!(
        r#"You are an expert research analyst and technical writer.
Your task is to carefully read the following text and generate a comprehensive, structured summary that covers all key ideas, concepts, and insights.

Instructions:

1. Provide a structured summary including:
   - Main idea or theme of the text
   - Important subtopics or sections
   - Key findings, facts, or arguments
   - Any examples or data mentioned

2. Explain complex terms or concepts in a simple and intuitive way, as if teaching someone new to the topic.

3. Ensure clarity and depth. Avoid vague or generic summaries.

4. Present the output in a clear format with headings, bullet points, and short paragraphs.

5. If the text is technical or academic, include a section: "Explanation in Simple Terms".

Input Text:
{}

Output Format:
## Title or Theme
[Brief title or theme description]

## Summary
[Well-structured paragraphs]

## Key Points
- [Key point 1]
- [Key point 2]
- [Key point 3]

## Explanation in Simple Terms
[Layperson-friendly explanation]
"#,
        input_text
    )
}

/// Generate a detailed, structured summary of one section's text.
///
/// Input beyond `MAX_SUMMARY_INPUT_CHARS` is truncated (UTF-8 safe) with
/// the marker appended. A provider failure yields `FAILURE_MESSAGE`
/// rather than an error.
pub async fn generate_detailed_summary(input_text: &str, chat: &dyn ChatModel) -> String {
    let input = if input_text.len() > MAX_SUMMARY_INPUT_CHARS {
        println!(
            "[Summary] Input truncated from {} to {} chars",
            input_text.len(),
            MAX_SUMMARY_INPUT_CHARS
        );
        format!(
            "{}{}",
            safe_truncate(input_text, MAX_SUMMARY_INPUT_CHARS),
            TRUNCATION_MARKER
        )
    } else {
        input_text.to_string()
    };

    match chat.complete(&build_prompt(&input)).await {
        Ok(response) => response.trim().to_string(),
        Err(e) => {
            eprintln!("[Summary] Generation failed: {}", e);
            FAILURE_MESSAGE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::StubChat;

    #[tokio::test]
    async fn test_short_input_passed_unchanged() {
        let chat = StubChat::replying("## Title\nshort summary");
        let summary = generate_detailed_summary("A short section.", &chat).await;
        assert_eq!(summary, "## Title\nshort summary");

        let prompt = chat.last_prompt().unwrap();
        assert!(prompt.contains("A short section."));
        assert!(!prompt.contains(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_long_input_truncated_with_marker() {
        let chat = StubChat::replying("ok");
        let long_text = "word ".repeat(5_000); // 25,000 chars
        generate_detailed_summary(&long_text, &chat).await;

        let prompt = chat.last_prompt().unwrap();
        assert!(prompt.contains(TRUNCATION_MARKER));

        // The text handed to the model never exceeds budget + marker
        let template_len = build_prompt("").len();
        let input_len = prompt.len() - template_len;
        assert!(input_len <= MAX_SUMMARY_INPUT_CHARS + TRUNCATION_MARKER.len());
    }

    #[tokio::test]
    async fn test_provider_failure_returns_fixed_message() {
        let chat = StubChat::failing("rate limited");
        let summary = generate_detailed_summary("Some text.", &chat).await;
        assert_eq!(summary, "Failed to generate summary. Please try again.");
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let chat = StubChat::replying("\n  summary body  \n");
        let summary = generate_detailed_summary("text", &chat).await;
        assert_eq!(summary, "summary body");
    }
}
