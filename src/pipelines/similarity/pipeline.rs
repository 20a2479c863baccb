use super::model::SentenceEmbeddingModel;
use crate::error::{PipelineError, Result};
use crate::pipelines::stats::PipelineStats;
use std::collections::HashSet;

// ============ Output types ============

/// Similarity of one candidate label to the input text.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    /// The candidate label, exactly as passed in.
    pub label: String,
    /// Cosine similarity, in `[-1.0, 1.0]`.
    pub score: f32,
}

/// One score per candidate label, in the order the labels were given.
///
/// The order carries no meaning; use [`LabelScores::ranked`] for a
/// best-first view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelScores {
    entries: Vec<LabelScore>,
}

impl LabelScores {
    /// Score for `label`, if it was a candidate.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.score)
    }

    /// Entries in input label order.
    pub fn iter(&self) -> std::slice::Iter<'_, LabelScore> {
        self.entries.iter()
    }

    /// Candidate labels in input order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    /// Number of scored labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no labels were scored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by descending score. Ties keep input order.
    pub fn ranked(&self) -> Vec<LabelScore> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// The highest-scoring label.
    pub fn top(&self) -> Option<&LabelScore> {
        self.entries
            .iter()
            .reduce(|best, entry| if entry.score > best.score { entry } else { best })
    }
}

impl<'a> IntoIterator for &'a LabelScores {
    type Item = &'a LabelScore;
    type IntoIter = std::slice::Iter<'a, LabelScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for LabelScores {
    type Item = LabelScore;
    type IntoIter = std::vec::IntoIter<LabelScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Single result in batch output.
#[derive(Debug)]
pub struct BatchResult {
    /// Input text.
    pub text: String,
    /// Scores or error for this input.
    pub scores: Result<LabelScores>,
}

/// Batch output from `rank_batch()`.
#[derive(Debug)]
pub struct BatchOutput {
    /// Results for each input, in input order.
    pub results: Vec<BatchResult>,
    /// Execution statistics.
    pub stats: PipelineStats,
}

// ============ Pipeline ============

/// Scores candidate labels by embedding similarity to a text.
///
/// Construct with [`SimilarityRankerBuilder`](super::SimilarityRankerBuilder), or wrap
/// an already loaded model with [`SimilarityRanker::new`]. The ranker never mutates
/// its model, so a single instance can be shared by reference across threads.
///
/// # Examples
///
/// ```rust,no_run
/// # use tweet_topics::similarity::{SimilarityRankerBuilder, SentenceBertVariant};
/// # fn main() -> tweet_topics::error::Result<()> {
/// let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::default()).build()?;
///
/// let scores = ranker.rank("I love trading forex", &["forex", "politics"])?;
/// assert!(scores.get("forex") > scores.get("politics"));
/// # Ok(())
/// # }
/// ```
pub struct SimilarityRanker<M: SentenceEmbeddingModel> {
    pub(crate) model: M,
}

impl<M: SentenceEmbeddingModel> SimilarityRanker<M> {
    /// Wraps a loaded embedding model.
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Scores every label in `labels` against `text`.
    ///
    /// The text and all labels are embedded in one padded batch; each label's score
    /// is the cosine similarity between its pooled vector and the text's.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] for blank text, no labels, or duplicate labels;
    /// [`PipelineError::Encoding`] if tokenization or the forward pass fails.
    pub fn rank(&self, text: &str, labels: &[&str]) -> Result<LabelScores> {
        validate_labels(labels)?;
        self.rank_validated(text, labels)
    }

    /// Ranks each text independently against the same labels.
    ///
    /// A failure on one text is reported in its [`BatchResult`] and does not
    /// affect the others. Invalid labels fail the whole call.
    pub fn rank_batch(&self, texts: &[&str], labels: &[&str]) -> Result<BatchOutput> {
        validate_labels(labels)?;

        let stats_builder = PipelineStats::start();
        let results = texts
            .iter()
            .map(|&text| BatchResult {
                text: text.to_string(),
                scores: self.rank_validated(text, labels),
            })
            .collect();

        Ok(BatchOutput {
            results,
            stats: stats_builder.finish(texts.len()),
        })
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &candle_core::Device {
        self.model.device()
    }

    fn rank_validated(&self, text: &str, labels: &[&str]) -> Result<LabelScores> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "Text to rank must not be empty".into(),
            ));
        }

        let mut batch = Vec::with_capacity(labels.len() + 1);
        batch.push(text);
        batch.extend_from_slice(labels);

        let embeddings = self.model.embed_batch(&batch)?;
        if embeddings.len() != batch.len() {
            return Err(PipelineError::Unexpected(format!(
                "Encoder returned {} vectors for {} inputs",
                embeddings.len(),
                batch.len()
            )));
        }

        let (text_vector, label_vectors) = embeddings
            .split_first()
            .ok_or_else(|| PipelineError::Unexpected("No embeddings returned".into()))?;

        let entries = labels
            .iter()
            .zip(label_vectors)
            .map(|(&label, vector)| LabelScore {
                label: label.to_string(),
                score: cosine_similarity(text_vector, vector),
            })
            .collect();

        Ok(LabelScores { entries })
    }
}

pub(crate) fn validate_labels(labels: &[&str]) -> Result<()> {
    if labels.is_empty() {
        return Err(PipelineError::InvalidInput(
            "At least one candidate label is required".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(labels.len());
    for &label in labels {
        if label.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "Candidate labels must not be blank".into(),
            ));
        }
        if !seen.insert(label) {
            return Err(PipelineError::InvalidInput(format!(
                "Duplicate candidate label '{label}'"
            )));
        }
    }

    Ok(())
}

/// `a·b / (|a| |b|)`, or 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must share a dimension");

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0f32, 0f32, 0f32), |(dot, na, nb), (&x, &y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::VocabularyEmbedder;

    fn ranker() -> SimilarityRanker<VocabularyEmbedder> {
        SimilarityRanker::new(VocabularyEmbedder::default())
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3f32, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_and_opposite_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 2.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[-2.0, -4.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let a = cosine_similarity(&[1.0, 2.0, 3.0], &[2.0, 1.0, 0.0]);
        let b = cosine_similarity(&[10.0, 20.0, 30.0], &[2.0, 1.0, 0.0]);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn rank_returns_one_entry_per_label() {
        let labels = ["forex", "finance", "politics"];
        let scores = ranker().rank("forex traders watch finance news", &labels).unwrap();

        assert_eq!(scores.len(), labels.len());
        assert_eq!(scores.labels().collect::<Vec<_>>(), labels);
    }

    #[test]
    fn rank_prefers_matching_label() {
        let scores = ranker()
            .rank("I love trading forex", &["forex", "politics"])
            .unwrap();

        let forex = scores.get("forex").unwrap();
        let politics = scores.get("politics").unwrap();
        assert!(forex > politics, "forex={forex} politics={politics}");
        assert_eq!(scores.top().unwrap().label, "forex");
    }

    #[test]
    fn label_equal_to_text_scores_one() {
        let text = "trading forex";
        let scores = ranker().rank(text, &[text, "politics"]).unwrap();
        assert!((scores.get(text).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rank_is_deterministic() {
        let r = ranker();
        let labels = ["forex", "finance", "politics"];
        let first = r.rank("finance and politics", &labels).unwrap();
        let second = r.rank("finance and politics", &labels).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ranked_sorts_descending_without_touching_entries() {
        let scores = ranker()
            .rank("politics politics finance", &["forex", "finance", "politics"])
            .unwrap();

        let ranked: Vec<_> = scores.ranked().into_iter().map(|s| s.label).collect();
        assert_eq!(ranked, ["politics", "finance", "forex"]);
        assert_eq!(
            scores.labels().collect::<Vec<_>>(),
            ["forex", "finance", "politics"]
        );
    }

    #[test]
    fn rejects_bad_inputs() {
        let r = ranker();
        assert!(matches!(
            r.rank("   ", &["forex"]),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            r.rank("forex", &[]),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            r.rank("forex", &["forex", "forex"]),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            r.rank("forex", &["forex", " "]),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn batch_isolates_failures() {
        let output = ranker()
            .rank_batch(&["trading forex", "", "politics"], &["forex", "politics"])
            .unwrap();

        assert_eq!(output.stats.items_processed, 3);
        assert_eq!(output.results.len(), 3);
        assert!(output.results[0].scores.is_ok());
        assert!(output.results[1].scores.is_err());
        assert_eq!(
            output.results[2].scores.as_ref().unwrap().top().unwrap().label,
            "politics"
        );
    }
}
