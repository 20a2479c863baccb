use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

use super::record::{RawTweetRow, TweetRecord, REQUIRED_COLUMNS};
use crate::error::{PipelineError, Result};

/// Date window and length threshold applied while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TweetFilter {
    /// First date kept, inclusive.
    pub from: NaiveDate,
    /// Last date kept, inclusive.
    pub to: NaiveDate,
    /// Rows need strictly more cleaned-text tokens than this.
    pub min_token_count: usize,
}

impl TweetFilter {
    /// Keeps tweets dated `from..=to` with more than `min_token_count` cleaned tokens.
    pub fn new(from: NaiveDate, to: NaiveDate, min_token_count: usize) -> Self {
        Self {
            from,
            to,
            min_token_count,
        }
    }

    fn keeps_date(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Tweets sorted ascending by date, inside the filter window, without
/// duplicates, each with enough cleaned-text tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetCollection {
    records: Vec<TweetRecord>,
}

impl TweetCollection {
    /// Number of tweets.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no tweets survived filtering.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tweets in date order.
    pub fn iter(&self) -> std::slice::Iter<'_, TweetRecord> {
        self.records.iter()
    }

    /// Tweets in date order, as a slice.
    pub fn as_slice(&self) -> &[TweetRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a TweetCollection {
    type Item = &'a TweetRecord;
    type IntoIter = std::slice::Iter<'a, TweetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Reads tweet tables into a [`TweetCollection`].
///
/// # Examples
///
/// ```rust,no_run
/// use chrono::NaiveDate;
/// use tweet_topics::tweets::{TweetFilter, TweetLoader};
///
/// # fn main() -> tweet_topics::error::Result<()> {
/// let filter = TweetFilter::new(
///     NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
///     3,
/// );
/// let tweets = TweetLoader::load("tweets.csv", &filter)?;
/// println!("{} tweets", tweets.len());
/// # Ok(())
/// # }
/// ```
pub struct TweetLoader;

impl TweetLoader {
    /// Loads and filters the CSV file at `source`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::SourceNotFound`] if the file cannot be opened,
    /// [`PipelineError::Schema`] if required columns are missing, and
    /// [`PipelineError::MalformedRow`] for the first row that does not parse.
    pub fn load(source: impl AsRef<Path>, filter: &TweetFilter) -> Result<TweetCollection> {
        let source = source.as_ref();
        if !source.is_file() {
            return Err(PipelineError::SourceNotFound(format!(
                "Tweet source '{}' is not a readable file",
                source.display()
            )));
        }
        let file = File::open(source).map_err(|e| {
            PipelineError::SourceNotFound(format!(
                "Cannot open tweet source '{}': {e}",
                source.display()
            ))
        })?;

        tracing::info!(source = %source.display(), "loading tweets");
        Self::load_reader(file, filter)
    }

    /// Same as [`TweetLoader::load`], reading CSV from any reader.
    pub fn load_reader<R: Read>(reader: R, filter: &TweetFilter) -> Result<TweetCollection> {
        let records = read_records(reader)?;
        Ok(apply_filter(records, filter))
    }
}

fn read_records<R: Read>(reader: R) -> Result<Vec<TweetRecord>> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => {
                PipelineError::SourceNotFound(format!("Cannot read tweet source: {e}"))
            }
            _ => PipelineError::Schema(format!("Cannot read header row: {e}")),
        })?
        .clone();
    check_schema(&headers)?;

    let mut records = Vec::new();
    let mut row = StringRecord::new();
    while reader.read_record(&mut row)? {
        let line = row.position().map_or(0, |p| p.line());
        let raw: RawTweetRow = row
            .deserialize(Some(&headers))
            .map_err(|e| PipelineError::MalformedRow {
                line,
                reason: e.to_string(),
            })?;
        let record = raw
            .into_record()
            .map_err(|reason| PipelineError::MalformedRow { line, reason })?;
        records.push(record);
    }

    Ok(records)
}

fn check_schema(headers: &StringRecord) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema(format!(
            "Tweet source is missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

fn apply_filter(mut records: Vec<TweetRecord>, filter: &TweetFilter) -> TweetCollection {
    let total = records.len();

    // `sort_by_key` is stable, so same-day tweets keep file order.
    records.sort_by_key(|record| record.date);
    records.retain(|record| filter.keeps_date(record.date));
    let in_range = records.len();

    let mut seen = HashSet::with_capacity(records.len());
    records.retain(|record| seen.insert(record.clone()));
    let unique = records.len();

    records.retain(|record| record.token_count() > filter.min_token_count);
    let kept = records.len();

    tracing::info!(
        total,
        in_range,
        unique,
        kept,
        from = %filter.from,
        to = %filter.to,
        min_token_count = filter.min_token_count,
        "filtered tweets"
    );

    TweetCollection { records }
}
