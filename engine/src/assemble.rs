use crate::catalog::Corpus;
use crate::ranker::ScoredPosition;
use serde::{Deserialize, Serialize};

/// Digits kept in reported similarity scores.
pub const SCORE_DECIMALS: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: i64,
    pub title: String,
    pub genres: String,
    pub image_url: String,
    pub similarity_score: f64,
}

/// Join ranked positions back to catalog rows, preserving rank order.
pub fn assemble(corpus: &Corpus, ranked: &[ScoredPosition]) -> Vec<Recommendation> {
    ranked
        .iter()
        .filter_map(|s| {
            corpus.get(s.position).map(|item| Recommendation {
                item_id: item.item_id(),
                title: item.title().to_string(),
                genres: item.genres().to_string(),
                image_url: item.image_url().to_string(),
                similarity_score: round_score(s.score),
            })
        })
        .collect()
}

pub fn round_score(score: f32) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (score as f64 * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;

    #[test]
    fn keeps_order_and_rounds() {
        let corpus = Corpus::new(vec![
            CatalogItem::new(10, "A", "Action", "", None),
            CatalogItem::new(20, "B", "Drama", "", Some("http://img/b.jpg".into())),
        ]);
        let ranked = [
            ScoredPosition { position: 1, score: 0.87654 },
            ScoredPosition { position: 0, score: 0.12345 },
        ];
        let recs = assemble(&corpus, &ranked);
        assert_eq!(recs.iter().map(|r| r.item_id).collect::<Vec<_>>(), vec![20, 10]);
        assert_eq!(recs[0].similarity_score, 0.877);
        assert_eq!(recs[0].image_url, "http://img/b.jpg");
        assert_eq!(recs[1].similarity_score, 0.123);
    }
}
