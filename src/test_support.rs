use crate::error::{PipelineError, Result};
use crate::pipelines::similarity::SentenceEmbeddingModel;
use candle_core::Device;

const VOCABULARY: &[&str] = &[
    "i", "love", "trading", "forex", "finance", "politics", "market", "election", "rates", "bank",
];

/// Bag-of-words embedder over a tiny fixed vocabulary. Unknown words are ignored.
#[derive(Debug, Clone)]
pub(crate) struct VocabularyEmbedder {
    /// Texts containing this marker fail with an encoding error.
    pub fail_marker: Option<&'static str>,
    device: Device,
}

impl Default for VocabularyEmbedder {
    fn default() -> Self {
        Self {
            fail_marker: None,
            device: Device::Cpu,
        }
    }
}

impl VocabularyEmbedder {
    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            fail_marker: Some(marker),
            ..Self::default()
        }
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(marker) = self.fail_marker {
            if text.contains(marker) {
                return Err(PipelineError::Encoding(format!("cannot encode '{text}'")));
            }
        }

        let mut vector = vec![0f32; VOCABULARY.len()];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if let Some(index) = VOCABULARY.iter().position(|&v| v == word) {
                vector[index] += 1.0;
            }
        }
        Ok(vector)
    }
}

impl SentenceEmbeddingModel for VocabularyEmbedder {
    type Options = ();

    fn new(_options: Self::Options, _device: Device) -> Result<Self> {
        Ok(Self::default())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn device(&self) -> &Device {
        &self.device
    }
}
