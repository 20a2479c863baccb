//! Loading, scoring and persisting tweets.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use tweet_topics::similarity::{SimilarityRankerBuilder, SentenceBertVariant};
//! use tweet_topics::tweets::{RowFailurePolicy, ScoredTweetCollection, TweetFilter, TweetLoader};
//!
//! # fn main() -> tweet_topics::error::Result<()> {
//! let filter = TweetFilter::new(
//!     NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2019, 6, 30).unwrap(),
//!     3,
//! );
//! let tweets = TweetLoader::load("tweets.csv", &filter)?;
//!
//! let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::default()).build()?;
//! let scored = ScoredTweetCollection::score(
//!     &ranker,
//!     &tweets,
//!     &["forex", "finance", "politics"],
//!     RowFailurePolicy::Abort,
//! )?;
//!
//! scored.write_snapshot("scored_tweets.csv.gz")?;
//! # Ok(())
//! # }
//! ```

mod loader;
mod record;
mod scored;

pub use loader::{TweetCollection, TweetFilter, TweetLoader};
pub use record::{TweetRecord, REQUIRED_COLUMNS};
pub use scored::{RowFailurePolicy, ScoredTweet, ScoredTweetCollection};
