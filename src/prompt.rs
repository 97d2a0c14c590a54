//! Grounded prompt composition.
//!
//! Builds the strict answer-only-from-context prompt sent to the chat
//! model, plus the fixed session greeting instruction.

use crate::index::ScoredChunk;

/// Instruction used to open a session.
pub const GREETING_INSTRUCTION: &str = "Greet the user warmly and ask what they would like to \
learn from their library today. You are a knowledgeable study tutor; do not mention that you \
are a chatbot, a bot, or an AI.";

/// Reply returned for an empty or whitespace-only query.
pub const EMPTY_QUERY_REPLY: &str = "Please ask a question.";

/// Assemble the grounded prompt: role instruction, context block, the
/// literal question, and a response-style instruction. An empty chunk list
/// still produces a well-formed prompt; the model will then say it does
/// not know.
pub fn compose(query: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|chunk| format!("[Source: {}]\n{}", chunk.book_name, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a study tutor for the user's personal library. Answer the question strictly \
using the context below. Do NOT use any outside knowledge. If the answer is not in the \
context, say you do not know. If the question is unrelated to the library, gently steer the \
user back to it. If the user asks for external resources, offer to look up video links for \
them.\n\
\n\
Context:\n\
{context}\n\
\n\
Question:\n\
{query}\n\
\n\
Answer concisely and clearly, like a teacher would, and end by asking whether the user wants \
to go deeper into the topic. Apologize only if you do not know the answer, and then ask what \
else they would like to learn."
    )
}
