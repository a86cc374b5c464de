//! LLM-backed refinement of detected section lists
//!
//! The regex detector picks up figure captions and line fragments that look
//! like numbered headings. This optional pass asks the chat model to return
//! a cleaned JSON array of the same record shape. Non-deterministic by
//! construction: the only guarantee is the schema, not the contents.

use super::SectionRecord;
use crate::ai_client::ChatModel;

/// Strip a markdown code fence if the model wrapped its JSON in one.
fn strip_code_fence(text: &str) -> String {
    if text.starts_with("```") {
        text.lines()
            .skip(1)
            .take_while(|l| !l.starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        text.to_string()
    }
}

fn build_prompt(input_json: &str) -> String {
    format!(
        r#"You are a precise data processor.

I will give you a JSON list of sections from a research paper. Each item may have:
- "section" (string)
- optional "subsection" (string)
- "start" (integer)

Some entries are unnecessary and must be removed completely:
1. Figure or Table captions (any "section" starting with "Figure" or "Table").
2. Incomplete, meaningless, or fragment sections.
3. Any other irrelevant entries that are not proper sections or subsections.

Refine this list:
- Keep only meaningful main sections and their subsections.
- Main sections: {{"section": "Section Name", "start": number}}
- Subsections: {{"section": "Parent Section", "subsection": "Subsection Name", "start": number}}
- The output must be strictly a JSON array of objects.
- Do not include any explanations, notes, or commentary.

Here is the input JSON:

{}

Always return a JSON array only, no preamble."#,
        input_json
    )
}

/// Ask the chat model to drop spurious entries from the detected list.
///
/// Fails soft: any provider error or unparsable reply yields an empty
/// list, and the caller falls back to single-block content.
pub async fn refine_sections(detected: &[SectionRecord], chat: &dyn ChatModel) -> Vec<SectionRecord> {
    let input_json = match serde_json::to_string(detected) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("[Refine] Failed to serialize sections: {}", e);
            return Vec::new();
        }
    };

    let reply = match chat.complete(&build_prompt(&input_json)).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("[Refine] LLM call failed: {}", e);
            return Vec::new();
        }
    };

    let cleaned = strip_code_fence(reply.trim());
    match serde_json::from_str::<Vec<SectionRecord>>(&cleaned) {
        Ok(sections) => sections,
        Err(e) => {
            eprintln!("[Refine] LLM output not valid JSON, returning empty list: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::StubChat;

    #[tokio::test]
    async fn test_valid_reply_is_parsed() {
        let detected = vec![
            SectionRecord::main("Introduction", 10),
            SectionRecord::main("Figure 1: Architecture", 50),
        ];
        let chat = StubChat::replying(r#"[{"section":"Introduction","start":10}]"#);
        let refined = refine_sections(&detected, &chat).await;
        assert_eq!(refined, vec![SectionRecord::main("Introduction", 10)]);
    }

    #[tokio::test]
    async fn test_code_fenced_reply_is_parsed() {
        let detected = vec![SectionRecord::main("Methods", 0)];
        let chat = StubChat::replying("```json\n[{\"section\":\"Methods\",\"start\":0}]\n```");
        let refined = refine_sections(&detected, &chat).await;
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].section, "Methods");
    }

    #[tokio::test]
    async fn test_garbage_reply_fails_soft() {
        let detected = vec![SectionRecord::main("Methods", 0)];
        let chat = StubChat::replying("Sure! Here are the cleaned sections: ...");
        assert!(refine_sections(&detected, &chat).await.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_fails_soft() {
        let detected = vec![SectionRecord::main("Methods", 0)];
        let chat = StubChat::failing("connection refused");
        assert!(refine_sections(&detected, &chat).await.is_empty());
    }
}
