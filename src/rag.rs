//! Retrieval-augmented question answering over the session's paper
//!
//! Retrieves the top-4 chunks for a question, renders them into a fixed
//! prompt, and returns the chat model's trimmed reply.
//!
//! Behavioral contract (permissive mode): the model answers from the
//! paper's context when possible; when the context lacks the answer it
//! says so and falls back to general knowledge, clearly labelled. This is
//! the one supported mode — there is no strict "not found" sentinel.

use crate::ai_client::ChatModel;
use crate::embeddings::Embedder;
use crate::vector_index::VectorIndex;

/// Number of chunks retrieved per question.
const TOP_K: usize = 4;

const SYSTEM_INSTRUCTIONS: &str = r#"You are an AI research assistant analyzing an academic paper.

Your primary goal is to answer questions using the context from the uploaded paper. If the information is not available in the paper, you should still help the user with your general knowledge.

INSTRUCTIONS:
1. FIRST, search the provided context for relevant information.
2. If the answer IS found in the context:
   - Provide a clear and concise response based on the paper.
   - Quote relevant passages when appropriate to support your answer.
   - Use bullet points or numbered lists when listing multiple items.
3. If the answer is NOT found in the context:
   - Start with: "I couldn't find this specific information in the uploaded research paper."
   - Then add: "However, based on my general knowledge:"
   - Provide a helpful answer from your training knowledge, clearly marked as general knowledge.
4. If the answer is PARTIALLY available:
   - Provide what the paper says first, then supplement with general knowledge, clearly marking it as such.

Always be helpful: answer from the paper or from general knowledge, never with a bare "I don't know"."#;

/// Join retrieved chunk texts into the prompt's context block.
fn format_context(chunks: &[(String, f32)]) -> String {
    chunks
        .iter()
        .map(|(text, _)| text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\nCONTEXT (from the research paper):\n{}\n\nQUESTION: {}\n\nANSWER:",
        SYSTEM_INSTRUCTIONS, context, question
    )
}

/// Answer a question about the indexed paper.
pub async fn answer_question(
    question: &str,
    index: &VectorIndex,
    embedder: &dyn Embedder,
    chat: &dyn ChatModel,
) -> Result<String, String> {
    let query_embedding = embedder.embed_query(question).await?;
    let retrieved = index.search(&query_embedding, TOP_K);
    let context = format_context(&retrieved);

    let answer = chat.complete(&build_prompt(&context, question)).await?;
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::StubChat;
    use crate::embeddings::{Embedder, StubEmbedder};

    async fn tiny_index(embedder: &StubEmbedder) -> VectorIndex {
        let chunks = vec![
            "The encoder stacks six identical layers.".to_string(),
            "Training ran on eight P100 GPUs.".to_string(),
            "We use label smoothing of value 0.1.".to_string(),
        ];
        let embeddings = embedder.embed_documents(&chunks).await.unwrap();
        VectorIndex::build(chunks, embeddings).unwrap()
    }

    #[test]
    fn test_context_is_double_newline_joined() {
        let chunks = vec![
            ("first chunk".to_string(), 0.9),
            ("second chunk".to_string(), 0.8),
        ];
        assert_eq!(format_context(&chunks), "first chunk\n\nsecond chunk");
    }

    #[tokio::test]
    async fn test_answer_passes_through_trimmed_reply() {
        let embedder = StubEmbedder::new();
        let index = tiny_index(&embedder).await;
        let chat = StubChat::replying("  The encoder has six layers.\n");

        let answer = answer_question("How many layers?", &index, &embedder, &chat)
            .await
            .unwrap();
        assert_eq!(answer, "The encoder has six layers.");
    }

    #[tokio::test]
    async fn test_prompt_embeds_retrieved_context_and_question() {
        let embedder = StubEmbedder::new();
        let index = tiny_index(&embedder).await;
        let chat = StubChat::replying("ok");

        answer_question("Training ran on eight P100 GPUs.", &index, &embedder, &chat)
            .await
            .unwrap();

        let prompt = chat.last_prompt().unwrap();
        assert!(prompt.contains("QUESTION: Training ran on eight P100 GPUs."));
        // The identically-worded chunk must be the closest retrieval
        assert!(prompt.contains("Training ran on eight P100 GPUs."));
        assert!(prompt.contains("CONTEXT (from the research paper):"));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let embedder = StubEmbedder::new();
        let index = tiny_index(&embedder).await;
        let chat = StubChat::failing("boom");

        let err = answer_question("anything", &index, &embedder, &chat)
            .await
            .unwrap_err();
        assert!(err.contains("boom"));
    }
}
