use crate::backend::SimilarityBackend;
use crate::error::{EngineError, EngineResult};
use crate::vector::Embedding;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    pub position: usize,
    pub score: f32,
}

/// Rank every item against the anchor's own vector, excluding the anchor.
pub fn rank_by_anchor(backend: &dyn SimilarityBackend, anchor: usize, top_n: usize) -> EngineResult<Vec<ScoredPosition>> {
    check_top_n(top_n)?;
    let query = backend
        .vector_of(anchor)
        .ok_or(EngineError::AnchorOutOfRange { position: anchor, len: backend.len() })?;
    let mut scored = score_all(backend, query);
    scored.retain(|s| s.position != anchor);
    scored.truncate(top_n);
    Ok(scored)
}

/// Rank every item against the projection of `text`. No item is excluded.
pub fn rank_by_text(backend: &dyn SimilarityBackend, text: &str, top_n: usize) -> EngineResult<Vec<ScoredPosition>> {
    check_top_n(top_n)?;
    let query = backend.transform(text)?;
    let mut scored = score_all(backend, &query);
    scored.truncate(top_n);
    Ok(scored)
}

fn check_top_n(top_n: usize) -> EngineResult<()> {
    if top_n == 0 { Err(EngineError::InvalidTopN(top_n)) } else { Ok(()) }
}

/// Scores sorted descending, ties by ascending position.
fn score_all(backend: &dyn SimilarityBackend, query: &Embedding) -> Vec<ScoredPosition> {
    let mut scored: Vec<ScoredPosition> = (0..backend.len())
        .filter_map(|position| {
            backend.vector_of(position).map(|v| ScoredPosition { position, score: backend.similarity(query, v) })
        })
        .collect();
    scored.sort_by(by_score_then_position);
    scored
}

fn by_score_then_position(a: &ScoredPosition, b: &ScoredPosition) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.position.cmp(&b.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TfidfBackend;
    use crate::vectorizer::TfidfConfig;

    fn fitted(docs: &[&str]) -> TfidfBackend {
        let mut b = TfidfBackend::new(TfidfConfig::default());
        b.fit(docs).unwrap();
        b
    }

    #[test]
    fn anchor_is_excluded_and_scores_descend() {
        let b = fitted(&["ninja action village", "ninja action", "pirate action", "romance school"]);
        let ranked = rank_by_anchor(&b, 0, 10).unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|s| s.position != 0));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ranked[0].position, 1);
    }

    #[test]
    fn ties_break_by_position() {
        let b = fitted(&["alpha", "beta", "gamma", "delta"]);
        let ranked = rank_by_anchor(&b, 2, 3).unwrap();
        let positions: Vec<usize> = ranked.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 3]);
        assert!(ranked.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn text_mode_keeps_all_items() {
        let b = fitted(&["ninja action", "pirate action", "romance school"]);
        let ranked = rank_by_text(&b, "ninja", 5).unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].position, 0);
    }

    #[test]
    fn out_of_vocabulary_text_scores_zero() {
        let b = fitted(&["ninja action", "pirate action"]);
        let ranked = rank_by_text(&b, "the and of zzzqqq", 2).unwrap();
        assert_eq!(ranked.iter().map(|s| s.position).collect::<Vec<_>>(), vec![0, 1]);
        assert!(ranked.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn invalid_arguments() {
        let b = fitted(&["ninja action", "pirate action"]);
        assert!(matches!(rank_by_anchor(&b, 0, 0), Err(EngineError::InvalidTopN(0))));
        assert!(matches!(rank_by_anchor(&b, 5, 1), Err(EngineError::AnchorOutOfRange { position: 5, len: 2 })));
        assert!(matches!(rank_by_text(&b, "ninja", 0), Err(EngineError::InvalidTopN(0))));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let b = fitted(&["ninja action", "ninja drama", "pirate action", "action drama"]);
        assert_eq!(rank_by_anchor(&b, 3, 3).unwrap(), rank_by_anchor(&b, 3, 3).unwrap());
    }
}
