use super::model::SentenceEmbeddingModel;
use super::pipeline::SimilarityRanker;
use crate::error::Result;
use crate::models::{SentenceBertModel, SentenceBertOptions, SentenceBertVariant, TruncationPolicy};
use crate::pipelines::utils::{BasePipelineBuilder, DeviceRequest, StandardPipelineBuilder};

crate::pipelines::utils::impl_device_methods!(delegated: SimilarityRankerBuilder<M: SentenceEmbeddingModel>);

/// Builder for creating [`SimilarityRanker`] instances.
///
/// Use [`Self::sentence_bert`] as the entry point.
///
/// # Examples
///
/// ```rust,no_run
/// # use tweet_topics::similarity::{SimilarityRankerBuilder, SentenceBertVariant};
/// # fn main() -> tweet_topics::error::Result<()> {
/// let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::AllMiniLmL6V2)
///     .cpu()
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SimilarityRankerBuilder<M: SentenceEmbeddingModel>(
    StandardPipelineBuilder<M::Options>,
);

impl<M: SentenceEmbeddingModel> SimilarityRankerBuilder<M> {
    /// Creates a builder for any [`SentenceEmbeddingModel`] from its options.
    pub fn new(options: M::Options) -> Self {
        Self(StandardPipelineBuilder::new(options))
    }

    /// Builds the ranker with configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if model loading or device initialization fails.
    pub fn build(self) -> Result<SimilarityRanker<M>> {
        BasePipelineBuilder::build(self)
    }
}

impl<M: SentenceEmbeddingModel> BasePipelineBuilder<M> for SimilarityRankerBuilder<M> {
    type Pipeline = SimilarityRanker<M>;
    type Options = M::Options;

    fn options(&self) -> &Self::Options {
        &self.0.options
    }

    fn device_request(&self) -> &DeviceRequest {
        &self.0.device_request
    }

    fn create_model(options: Self::Options, device: candle_core::Device) -> Result<M> {
        M::new(options, device)
    }

    fn construct_pipeline(model: M) -> Result<Self::Pipeline> {
        Ok(SimilarityRanker::new(model))
    }
}

impl SimilarityRankerBuilder<SentenceBertModel> {
    /// Creates a builder for a pretrained Sentence-BERT encoder.
    pub fn sentence_bert(variant: SentenceBertVariant) -> Self {
        Self::new(SentenceBertOptions {
            variant,
            truncation: TruncationPolicy::default(),
        })
    }

    /// Sets how inputs longer than the encoder limit are handled.
    pub fn truncation(mut self, policy: TruncationPolicy) -> Self {
        self.0.options_mut().truncation = policy;
        self
    }
}
