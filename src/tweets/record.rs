use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// Columns a tweet source must provide. Any other columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "date",
    "time",
    "username",
    "tweet",
    "clean_tweet",
    "hashtags",
    "likes_count",
    "replies_count",
    "retweets_count",
    "slang_count",
];

/// One parsed row of the tweet source.
///
/// Two records are duplicates when every field is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TweetRecord {
    /// Calendar date the tweet was posted.
    pub date: NaiveDate,
    /// Time of day, kept verbatim.
    pub time: String,
    /// Author handle.
    pub username: String,
    /// Raw tweet text.
    pub tweet: String,
    /// Normalized text with noise removed; this is what gets ranked.
    pub clean_tweet: String,
    /// Hashtags as written in the source, e.g. `['#forex']`.
    pub hashtags: String,
    /// Likes received.
    pub likes_count: u64,
    /// Replies received.
    pub replies_count: u64,
    /// Retweets received.
    pub retweets_count: u64,
    /// Number of slang terms found during preprocessing.
    pub slang_count: u64,
}

impl TweetRecord {
    /// Number of whitespace-delimited tokens in the cleaned text.
    pub fn token_count(&self) -> usize {
        self.clean_tweet.split_whitespace().count()
    }
}

/// Row shape as it appears in the file, before date parsing.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTweetRow {
    date: String,
    time: String,
    username: String,
    tweet: String,
    clean_tweet: String,
    hashtags: String,
    likes_count: u64,
    replies_count: u64,
    retweets_count: u64,
    slang_count: u64,
}

impl RawTweetRow {
    pub(crate) fn into_record(self) -> Result<TweetRecord, String> {
        let date = parse_tweet_date(&self.date)
            .ok_or_else(|| format!("unparsable date '{}'", self.date))?;

        Ok(TweetRecord {
            date,
            time: self.time,
            username: self.username,
            tweet: self.tweet,
            clean_tweet: self.clean_tweet,
            hashtags: self.hashtags,
            likes_count: self.likes_count,
            replies_count: self.replies_count,
            retweets_count: self.retweets_count,
            slang_count: self.slang_count,
        })
    }
}

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS`.
pub(crate) fn parse_tweet_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
