pub mod sentence_bert;

pub use sentence_bert::{
    mean_pool, SentenceBertModel, SentenceBertOptions, SentenceBertVariant, TruncationPolicy,
};
