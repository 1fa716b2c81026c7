//! Deterministic stand-ins for the embedding model and the language model.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::llm::LanguageModel;

/// Bag-of-words embedder over a fixed vocabulary, L2-normalised.
///
/// Texts sharing more vocabulary words land closer together, which is enough to make
/// retrieval results predictable in tests.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn with_vocabulary(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
        }
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::with_vocabulary(&[
            "what", "color", "is", "the", "sky", "blue", "grass", "green", "rust", "fast",
        ])
    }
}

impl Embedder for KeywordEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        let mut vector = vec![0f32; self.vocabulary.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if let Some(slot) = self.vocabulary.iter().position(|v| *v == word) {
                vector[slot] += 1.0;
            }
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn encode(&self, _text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
        Err("model exploded".into())
    }
}

/// Language model that records prompts and answers with a canned reply.
///
/// `prompts` is shared so a test can keep a handle after boxing the model.
#[derive(Default)]
pub struct RecordingModel {
    pub reply: String,
    pub prompts: Rc<RefCell<Vec<String>>>,
}

impl RecordingModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Rc::default(),
        }
    }
}

#[async_trait(?Send)]
impl LanguageModel for RecordingModel {
    async fn complete(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}
