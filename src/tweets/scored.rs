use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use super::loader::TweetCollection;
use super::record::TweetRecord;
use crate::error::{PipelineError, Result};
use crate::pipelines::similarity::pipeline::validate_labels;
use crate::pipelines::similarity::{LabelScores, SentenceEmbeddingModel, SimilarityRanker};

const PROGRESS_EVERY: usize = 100;

/// What to do when ranking a single tweet fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowFailurePolicy {
    /// Stop and return the error.
    #[default]
    Abort,
    /// Log the error, drop the row and continue.
    Skip,
}

/// A tweet together with its label scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTweet {
    /// The source tweet.
    pub record: TweetRecord,
    /// One score per candidate label.
    pub scores: LabelScores,
}

impl ScoredTweet {
    /// Best-matching label for this tweet.
    pub fn top_label(&self) -> Option<&str> {
        self.scores.top().map(|s| s.label.as_str())
    }
}

/// Tweets with one score column per candidate label.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTweetCollection {
    labels: Vec<String>,
    rows: Vec<ScoredTweet>,
}

impl ScoredTweetCollection {
    /// Ranks every tweet's cleaned text against `labels`.
    ///
    /// Produces a new collection; `tweets` is left untouched. Row order follows `tweets`.
    ///
    /// # Errors
    ///
    /// Invalid labels always fail. Per-row ranking errors fail only under
    /// [`RowFailurePolicy::Abort`].
    pub fn score<M: SentenceEmbeddingModel>(
        ranker: &SimilarityRanker<M>,
        tweets: &TweetCollection,
        labels: &[&str],
        policy: RowFailurePolicy,
    ) -> Result<Self> {
        validate_labels(labels)?;
        if let Some(reserved) = labels
            .iter()
            .find(|&&label| label == "date" || label == "clean_tweet")
        {
            return Err(PipelineError::InvalidInput(format!(
                "Label '{reserved}' collides with a snapshot column"
            )));
        }

        let total = tweets.len();
        let mut rows = Vec::with_capacity(total);
        let mut skipped = 0usize;

        for (index, record) in tweets.iter().enumerate() {
            match ranker.rank(&record.clean_tweet, labels) {
                Ok(scores) => rows.push(ScoredTweet {
                    record: record.clone(),
                    scores,
                }),
                Err(e) => match policy {
                    RowFailurePolicy::Abort => return Err(e),
                    RowFailurePolicy::Skip => {
                        skipped += 1;
                        tracing::warn!(row = index, date = %record.date, error = %e, "skipping tweet");
                    }
                },
            }

            if (index + 1) % PROGRESS_EVERY == 0 {
                tracing::debug!(done = index + 1, total, "scoring tweets");
            }
        }

        tracing::info!(scored = rows.len(), skipped, "scored tweets");

        Ok(Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            rows,
        })
    }

    /// Candidate labels, in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Scored tweets in date order.
    pub fn rows(&self) -> &[ScoredTweet] {
        &self.rows
    }

    /// Iterates scored tweets in date order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredTweet> {
        self.rows.iter()
    }

    /// Number of scored tweets.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing was scored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes `date,clean_tweet,<label>...` rows as uncompressed CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.labels.len() + 2);
        header.push("date");
        header.push("clean_tweet");
        header.extend(self.labels.iter().map(String::as_str));
        csv_writer.write_record(&header).map_err(persist_error)?;

        for row in &self.rows {
            let mut fields = Vec::with_capacity(header.len());
            fields.push(row.record.date.format("%Y-%m-%d").to_string());
            fields.push(row.record.clean_tweet.clone());
            for label in &self.labels {
                let score = row.scores.get(label).ok_or_else(|| {
                    PipelineError::Unexpected(format!("Row has no score for label '{label}'"))
                })?;
                fields.push(score.to_string());
            }
            csv_writer.write_record(&fields).map_err(persist_error)?;
        }

        csv_writer.flush().map_err(persist_error)?;
        Ok(())
    }

    /// Writes the collection to `path` as gzip-compressed CSV.
    ///
    /// Data goes to `<path>.tmp` first and is renamed into place once complete, so
    /// a failed write never leaves a partial snapshot at `path`.
    pub fn write_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = temp_path(path);

        if let Err(e) = self.write_compressed(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            PipelineError::Persist(format!(
                "Failed to move snapshot into '{}': {e}",
                path.display()
            ))
        })?;

        tracing::info!(path = %path.display(), rows = self.rows.len(), "wrote snapshot");
        Ok(())
    }

    fn write_compressed(&self, tmp: &Path) -> Result<()> {
        let file = File::create(tmp).map_err(|e| {
            PipelineError::Persist(format!("Failed to create '{}': {e}", tmp.display()))
        })?;

        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        self.write_csv(&mut encoder)?;

        let file = encoder
            .finish()
            .map_err(persist_error)?
            .into_inner()
            .map_err(persist_error)?;
        file.sync_all().map_err(persist_error)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ScoredTweetCollection {
    type Item = &'a ScoredTweet;
    type IntoIter = std::slice::Iter<'a, ScoredTweet>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn persist_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Persist(format!("Failed to write snapshot: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VocabularyEmbedder;
    use crate::tweets::{TweetFilter, TweetLoader};
    use chrono::NaiveDate;
    use flate2::read::GzDecoder;

    const LABELS: [&str; 3] = ["forex", "finance", "politics"];

    fn tweets() -> TweetCollection {
        let csv = "\
date,time,username,tweet,clean_tweet,hashtags,likes_count,replies_count,retweets_count,slang_count
2019-01-02,09:00:00,a,raw,i love trading forex,[],0,0,0,0
2019-01-03,09:00:00,b,raw,election politics heats up,[],0,0,0,0
2019-01-04,09:00:00,c,raw,bank rates and finance,[],0,0,0,0";
        let filter = TweetFilter::new(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2019, 1, 31).unwrap(),
            2,
        );
        TweetLoader::load_reader(csv.as_bytes(), &filter).unwrap()
    }

    fn ranker(embedder: VocabularyEmbedder) -> SimilarityRanker<VocabularyEmbedder> {
        SimilarityRanker::new(embedder)
    }

    #[test]
    fn scores_every_tweet_without_mutating_input() {
        let input = tweets();
        let before = input.clone();

        let scored = ScoredTweetCollection::score(
            &ranker(VocabularyEmbedder::default()),
            &input,
            &LABELS,
            RowFailurePolicy::Abort,
        )
        .unwrap();

        assert_eq!(input, before);
        assert_eq!(scored.len(), 3);
        assert_eq!(scored.labels(), LABELS);
        for row in &scored {
            assert_eq!(row.scores.labels().collect::<Vec<_>>(), LABELS);
        }

        let tops: Vec<_> = scored.iter().map(|r| r.top_label().unwrap()).collect();
        assert_eq!(tops, ["forex", "politics", "finance"]);
    }

    #[test]
    fn abort_policy_returns_first_error() {
        let result = ScoredTweetCollection::score(
            &ranker(VocabularyEmbedder::failing_on("election")),
            &tweets(),
            &LABELS,
            RowFailurePolicy::Abort,
        );

        assert!(matches!(result, Err(PipelineError::Encoding(_))));
    }

    #[test]
    fn skip_policy_drops_failing_rows() {
        let scored = ScoredTweetCollection::score(
            &ranker(VocabularyEmbedder::failing_on("election")),
            &tweets(),
            &LABELS,
            RowFailurePolicy::Skip,
        )
        .unwrap();

        let users: Vec<_> = scored.iter().map(|r| r.record.username.as_str()).collect();
        assert_eq!(users, ["a", "c"]);
    }

    #[test]
    fn invalid_labels_fail_even_when_skipping() {
        let r = ranker(VocabularyEmbedder::default());

        let cases: [&[&str]; 3] = [&["forex", "forex"], &[], &["date", "forex"]];
        for labels in cases {
            let result =
                ScoredTweetCollection::score(&r, &tweets(), labels, RowFailurePolicy::Skip);
            assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
        }
    }

    #[test]
    fn snapshot_is_gzipped_csv_with_label_columns() {
        let scored = ScoredTweetCollection::score(
            &ranker(VocabularyEmbedder::default()),
            &tweets(),
            &LABELS,
            RowFailurePolicy::Abort,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scored.csv.gz");
        scored.write_snapshot(&path).unwrap();

        assert!(!temp_path(&path).exists());

        let file = File::open(&path).unwrap();
        let mut reader = csv::Reader::from_reader(GzDecoder::new(file));
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            header,
            ["date", "clean_tweet", "forex", "finance", "politics"]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "2019-01-02");
        assert_eq!(&rows[0][1], "i love trading forex");

        let forex: f32 = rows[0][2].parse().unwrap();
        let politics: f32 = rows[0][4].parse().unwrap();
        assert_eq!(Some(forex), scored.rows()[0].scores.get("forex"));
        assert!(forex > politics);
    }

    #[test]
    fn snapshot_into_missing_directory_fails_cleanly() {
        let scored = ScoredTweetCollection::score(
            &ranker(VocabularyEmbedder::default()),
            &tweets(),
            &LABELS,
            RowFailurePolicy::Abort,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("scored.csv.gz");

        let err = scored.write_snapshot(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Persist(_)));
        assert!(!path.exists());
    }
}
