//! Embedding-similarity ranking of candidate labels.
//!
//! Embeds a text and a set of candidate labels with a frozen Sentence-BERT encoder
//! and scores each label by cosine similarity to the text. No training required.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tweet_topics::similarity::{SimilarityRankerBuilder, SentenceBertVariant};
//!
//! # fn main() -> tweet_topics::error::Result<()> {
//! let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::default()).build()?;
//! let labels = &["forex", "finance", "politics"];
//!
//! let scores = ranker.rank("EUR/USD breaks resistance ahead of the ECB meeting", labels)?;
//!
//! // Scores keep label order; `ranked()` sorts them for display.
//! for s in scores.ranked() {
//!     println!("{}: {:.3}", s.label, s.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Batch Inference
//!
//! ```rust,no_run
//! # use tweet_topics::similarity::{SimilarityRankerBuilder, SentenceBertVariant};
//! # fn main() -> tweet_topics::error::Result<()> {
//! # let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::default()).build()?;
//! let texts = &["Fed raises rates again", "Senate passes the budget"];
//! let output = ranker.rank_batch(texts, &["finance", "politics"])?;
//!
//! for r in output.results {
//!     let scores = r.scores?;
//!     println!("{} → {:?}", r.text, scores.top().map(|s| &s.label));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Supported Models
//!
//! | Model | Variant |
//! |-------|---------|
//! | `sentence-transformers/bert-base-nli-mean-tokens` | [`SentenceBertVariant::BertBaseNliMeanTokens`] |
//! | `sentence-transformers/all-MiniLM-L6-v2` | [`SentenceBertVariant::AllMiniLmL6V2`] |
//! | any BERT sentence-transformers repo | [`SentenceBertVariant::Custom`] |

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod model;
pub(crate) mod pipeline;

// ============ Public API ============

pub use crate::models::{mean_pool, SentenceBertOptions, SentenceBertVariant, TruncationPolicy};
pub use crate::pipelines::stats::PipelineStats;
pub use crate::pipelines::utils::DeviceRequest;
pub use builder::SimilarityRankerBuilder;
pub use model::SentenceEmbeddingModel;
pub use pipeline::{
    cosine_similarity, BatchOutput, BatchResult, LabelScore, LabelScores, SimilarityRanker,
};

/// Only for generic annotations. Use [`SimilarityRankerBuilder::sentence_bert`].
pub type SentenceBert = crate::models::SentenceBertModel;
