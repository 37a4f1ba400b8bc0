//! Fixed prompt framing shared by clients and cost estimation
//!
//! Clients wrap the document and instruction with this framing, and the
//! orchestrator counts tokens over the same framing, so the admitted cost
//! matches what is actually sent.

/// System prompt sent with every extraction request
pub const SYSTEM_PROMPT: &str = "You are an AI assistant tasked with analyzing documents.";

/// Render the user message for a document and instruction
pub fn render_user_message(text: &str, instruction: &str) -> String {
    format!("Document content:\n{}\n\n{}", text, instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_user_message() {
        let message = render_user_message("body", "do it");
        assert_eq!(message, "Document content:\nbody\n\ndo it");
    }
}
