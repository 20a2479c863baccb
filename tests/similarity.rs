//! Integration tests for the similarity ranker
//! Run with: cargo test --features integration

#![cfg(feature = "integration")]

use tweet_topics::similarity::{
    cosine_similarity, SentenceBertVariant, SimilarityRankerBuilder, TruncationPolicy,
};

const LABELS: [&str; 3] = ["forex", "finance", "politics"];

#[test]
fn similarity_basic() -> anyhow::Result<()> {
    let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::BertBaseNliMeanTokens)
        .cpu()
        .build()?;

    let scores = ranker.rank("I love trading forex", &LABELS)?;
    assert_eq!(scores.labels().collect::<Vec<_>>(), LABELS);

    let forex = scores.get("forex").unwrap();
    let politics = scores.get("politics").unwrap();
    assert!(forex > politics, "forex={forex} politics={politics}");
    for s in &scores {
        assert!((-1.0..=1.0).contains(&s.score), "{} out of range", s.score);
    }
    Ok(())
}

#[test]
fn similarity_deterministic() -> anyhow::Result<()> {
    let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::BertBaseNliMeanTokens)
        .cpu()
        .build()?;

    let text = "Fed raises interest rates again";
    let first = ranker.rank(text, &LABELS)?;
    let second = ranker.rank(text, &LABELS)?;
    for (a, b) in first.iter().zip(&second) {
        assert!((a.score - b.score).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn similarity_self_match() -> anyhow::Result<()> {
    let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::AllMiniLmL6V2)
        .cpu()
        .build()?;

    let text = "central bank policy";
    let scores = ranker.rank(text, &[text, "football"])?;
    assert!((scores.get(text).unwrap() - 1.0).abs() < 1e-4);
    assert_eq!(scores.top().unwrap().label, text);
    Ok(())
}

#[test]
fn similarity_batch() -> anyhow::Result<()> {
    let ranker = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::AllMiniLmL6V2)
        .cpu()
        .build()?;

    let texts = ["EUR/USD slides after the ECB meeting", "", "Senate vote on the budget"];
    let output = ranker.rank_batch(&texts, &LABELS)?;

    assert_eq!(output.results.len(), 3);
    assert_eq!(output.stats.items_processed, 3);
    assert!(output.results[0].scores.is_ok());
    assert!(output.results[1].scores.is_err());
    assert!(output.results[2].scores.is_ok());
    Ok(())
}

#[test]
fn similarity_long_text_truncates_or_rejects() -> anyhow::Result<()> {
    let long_text = "forex ".repeat(2_000);

    let truncating = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::AllMiniLmL6V2)
        .cpu()
        .build()?;
    assert!(truncating.rank(&long_text, &LABELS).is_ok());

    let rejecting = SimilarityRankerBuilder::sentence_bert(SentenceBertVariant::AllMiniLmL6V2)
        .cpu()
        .truncation(TruncationPolicy::Reject)
        .build()?;
    assert!(rejecting.rank(&long_text, &LABELS).is_err());
    Ok(())
}

#[test]
fn cosine_matches_manual_computation() {
    let a = [1.0f32, 2.0, 2.0];
    let b = [2.0f32, 0.0, 1.0];
    let expected = 4.0 / (3.0 * 5f32.sqrt());
    assert!((cosine_similarity(&a, &b) - expected).abs() < 1e-6);
}
