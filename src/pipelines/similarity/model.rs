use crate::error::Result;

/// A frozen encoder that maps texts to fixed-length sentence vectors.
pub trait SentenceEmbeddingModel {
    /// Settings needed to load the model.
    type Options: std::fmt::Debug + Clone;

    /// Loads the model onto `device`.
    fn new(options: Self::Options, device: candle_core::Device) -> Result<Self>
    where
        Self: Sized;

    /// Embeds all texts in a single forward pass, one vector per text, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Device holding the model weights.
    fn device(&self) -> &candle_core::Device;
}
