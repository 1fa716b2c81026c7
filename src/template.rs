//! # Answer prompt template
//!
//! The prompt sent to the language model is a fixed template with two placeholders,
//! `{context}` and `{question}`:
//!
//! ```text
//! Answer the question using the context below.
//!
//! Context:
//! {context}
//!
//! Question:
//! {question}
//!
//! Answer:
//! ```
//!
//! The text can be replaced through the `prompt_template` configuration key; a
//! replacement must keep both placeholders.

use std::error::Error;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// The built-in template.
pub const DEFAULT_TEMPLATE: &str = "Answer the question using the context below.\n\n\
Context:\n{context}\n\n\
Question:\n{question}\n\n\
Answer:";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(context|question)\}").expect("placeholder regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Use `text` as the template.
    ///
    /// # Errors
    /// If `text` lacks `{context}` or `{question}`.
    pub fn new(text: impl Into<String>) -> Result<Self, Box<dyn Error>> {
        let text = text.into();
        for placeholder in ["{context}", "{question}"] {
            if !text.contains(placeholder) {
                return Err(format!("prompt template is missing {placeholder}").into());
            }
        }
        Ok(Self { text })
    }

    /// Fill in the placeholders in one pass, so placeholder-looking text inside the
    /// context or question is left alone.
    ///
    /// ```rust
    /// use rag_llm::template::PromptTemplate;
    ///
    /// let prompt = PromptTemplate::default().render("The sky is blue.", "What color is the sky?");
    /// assert!(prompt.contains("Context:\nThe sky is blue.\n"));
    /// assert!(prompt.ends_with("Answer:"));
    /// ```
    pub fn render(&self, context: &str, question: &str) -> String {
        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures| match &caps[1] {
                "context" => context.to_string(),
                _ => question.to_string(),
            })
            .into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
