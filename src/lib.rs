//! Zero-shot topic scoring of tweets with Sentence-BERT embeddings.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). Loads a CSV of
//! preprocessed tweets, embeds each tweet alongside a set of candidate topic labels,
//! scores every label by cosine similarity, and writes the scored table as a
//! compressed snapshot.

#![deny(missing_docs)]

// ============ Internal API ============

pub(crate) mod loaders;
pub(crate) mod models;
pub(crate) mod pipelines;

#[cfg(test)]
pub(crate) mod test_support;

// ============ Public API ============

pub mod error;
pub mod tweets;

pub use pipelines::similarity;
