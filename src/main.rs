use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tweet_topics::similarity::{
    DeviceRequest, SentenceBertVariant, SimilarityRankerBuilder, TruncationPolicy,
};
use tweet_topics::tweets::{RowFailurePolicy, ScoredTweetCollection, TweetFilter, TweetLoader};

#[derive(Debug, Parser)]
#[command(name = "tweet-topics")]
#[command(about = "Score tweets against topic labels with Sentence-BERT embeddings")]
struct Cli {
    /// CSV file of preprocessed tweets.
    #[arg(long, env = "TWEETS_INPUT")]
    input: PathBuf,

    /// First date to keep (YYYY-MM-DD, inclusive).
    #[arg(long, env = "TWEETS_FROM")]
    from: NaiveDate,

    /// Last date to keep (YYYY-MM-DD, inclusive).
    #[arg(long, env = "TWEETS_TO")]
    to: NaiveDate,

    /// Keep tweets whose cleaned text has more tokens than this.
    #[arg(long, env = "TWEETS_MIN_TOKENS", default_value_t = 3)]
    min_tokens: usize,

    /// Comma-separated candidate topic labels.
    #[arg(
        long,
        env = "TWEETS_LABELS",
        value_delimiter = ',',
        default_value = "forex,finance,politics"
    )]
    labels: Vec<String>,

    /// Where to write the gzip-compressed scored CSV.
    #[arg(long, env = "TWEETS_OUTPUT", default_value = "scored_tweets.csv.gz")]
    output: PathBuf,

    /// Sentence-BERT checkpoint: a short name or an owner/name repo id.
    #[arg(long, env = "TWEETS_MODEL", default_value = "bert-base-nli-mean-tokens")]
    model: SentenceBertVariant,

    /// auto, cpu, cuda[:N] or metal[:N].
    #[arg(long, env = "TWEETS_DEVICE", default_value = "auto")]
    device: DeviceRequest,

    /// Log and drop tweets that fail to encode instead of aborting.
    #[arg(long, env = "TWEETS_SKIP_FAILED_ROWS")]
    skip_failed_rows: bool,

    /// Fail on tweets longer than the encoder limit instead of truncating them.
    #[arg(long, env = "TWEETS_REJECT_OVERSIZED")]
    reject_oversized: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let filter = TweetFilter::new(cli.from, cli.to, cli.min_tokens);
    let tweets = TweetLoader::load(&cli.input, &filter)
        .with_context(|| format!("failed to load tweets from {}", cli.input.display()))?;
    if tweets.is_empty() {
        bail!(
            "no tweets left in {} after filtering {}..={} with more than {} tokens",
            cli.input.display(),
            cli.from,
            cli.to,
            cli.min_tokens
        );
    }

    let truncation = if cli.reject_oversized {
        TruncationPolicy::Reject
    } else {
        TruncationPolicy::Truncate
    };
    let ranker = SimilarityRankerBuilder::sentence_bert(cli.model.clone())
        .device(cli.device.clone())
        .truncation(truncation)
        .build()
        .with_context(|| format!("failed to load sentence encoder {}", cli.model))?;

    let labels = candidate_labels(&cli.labels);
    let policy = if cli.skip_failed_rows {
        RowFailurePolicy::Skip
    } else {
        RowFailurePolicy::Abort
    };
    let scored = ScoredTweetCollection::score(&ranker, &tweets, &labels, policy)
        .context("failed to score tweets")?;
    if scored.is_empty() {
        bail!("every tweet failed to score; not writing {}", cli.output.display());
    }

    let mut top_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tweet in &scored {
        if let Some(label) = tweet.top_label() {
            *top_counts.entry(label).or_default() += 1;
        }
    }
    for (label, tweets) in &top_counts {
        tracing::info!(label, tweets, "top label");
    }

    scored
        .write_snapshot(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    Ok(())
}

fn candidate_labels(raw: &[String]) -> Vec<&str> {
    raw.iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .collect()
}
