//! Prompt policy for retrieval-augmented answers.
//!
//! Intent routing is delegated to the model: one template carries guidance for greetings,
//! general-knowledge questions, and questions about the indexed documents. Only the last
//! branch is restricted to the retrieved context, and it must answer with [`REFUSAL`] when the
//! context does not cover the question.

/// Sentence the model returns when a document question is not covered by the context.
pub const REFUSAL: &str = "This question is not related to the provided context.";

/// Template with `{context}` and `{query}` placeholders.
pub const PROMPT_TEMPLATE: &str = r#"You are a helpful and knowledgeable assistant that can handle three types of questions.

IMPORTANT RULES:
1. For greeting questions (like "hello", "hi", "good morning", etc.):
   - Respond with a friendly greeting
   - Keep the response concise and warm
   - You can use your general knowledge for these

2. For general knowledge questions (like algorithms, concepts, definitions, etc.):
   - Use your general knowledge to provide accurate and helpful answers
   - Structure your response clearly and concisely
   - Include relevant examples when appropriate
   - You can use your training data for these types of questions

3. For context-based questions (about specific documents/content):
   - ONLY use information from the provided context to answer
   - DO NOT use any external knowledge or make assumptions
   - DO NOT provide partial answers if the complete answer isn't in the context
   - If the question is not related to the context, respond with "This question is not related to the provided context."

Context: {context}
Query: {query}

Answer:"#;

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Substitute the placeholders of [`PROMPT_TEMPLATE`]; no other transformation is applied.
///
/// Both placeholders are replaced in a single pass so that a query or context containing
/// the literal text `{query}` is left untouched.
pub fn compose(context: &str, query: &str) -> String {
    let mut prompt = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + query.len());
    let mut rest = PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix("{context}") {
            prompt.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{query}") {
            prompt.push_str(query);
            rest = after;
        } else {
            prompt.push('{');
            rest = &tail[1..];
        }
    }
    prompt.push_str(rest);
    prompt
}

/// Join retrieved chunk texts in similarity order.
pub fn join_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_substitutes_both_placeholders() {
        let prompt = compose("Ownership moves values.", "What is ownership?");
        assert!(prompt.contains("Context: Ownership moves values.\nQuery: What is ownership?\n\nAnswer:"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{query}"));
        assert!(prompt.starts_with("You are a helpful and knowledgeable assistant"));
    }

    #[test]
    fn compose_leaves_user_text_verbatim() {
        let prompt = compose("uses {query} literally", "Explain {context}");
        assert!(prompt.contains("Context: uses {query} literally\n"));
        assert!(prompt.contains("Query: Explain {context}\n"));
    }

    #[test]
    fn empty_context_still_yields_full_template() {
        let prompt = compose("", "Hello!");
        assert!(prompt.contains("Context: \nQuery: Hello!"));
        assert!(prompt.contains(REFUSAL));
        assert!(prompt.contains("greeting questions"));
    }

    #[test]
    fn context_joins_in_rank_order() {
        assert_eq!(join_context(&["first", "second"]), "first\n\nsecond");
        assert_eq!(join_context::<&str>(&[]), "");
    }
}
