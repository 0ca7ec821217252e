//! Weighted score fusion of independently ranked hit lists.

use std::collections::HashMap;

use docsearch_core::types::{ChunkId, SearchHit};

/// Zero-anchored min-max: `lo = min(0, min)`, `hi = max`. Equal positive
/// scores map to 1.0; a list with no positive score maps to 0.0.
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let Some(hi) = scores.iter().copied().reduce(f32::max) else { return Vec::new() };
    let lo = scores.iter().copied().fold(0.0f32, f32::min);
    let spread = hi - lo;
    if spread <= f32::EPSILON {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| ((s - lo) / spread).clamp(0.0, 1.0)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: ChunkId,
    pub score: f32,
}

/// One ranked list and the weight its normalized scores carry.
pub struct WeightedList<'a> {
    pub hits: &'a [SearchHit],
    pub weight: f32,
}

struct Accum {
    score: f32,
    best_rank: usize,
    ordinal: usize,
}

/// Fuse `lists` into one ranking truncated to `k`.
///
/// The weighted sum is divided by the total weight of the lists given, so a
/// single list comes back as its own normalized ranking. Ties go to the better
/// position in any input list, then to the lower insertion ordinal.
pub fn fuse(lists: &[WeightedList<'_>], ordinals: &HashMap<ChunkId, usize>, k: usize) -> Vec<FusedHit> {
    let total_weight: f32 = lists.iter().map(|l| l.weight).sum();
    let equal = total_weight <= f32::EPSILON;

    let mut by_id: HashMap<&str, Accum> = HashMap::new();
    for list in lists {
        let weight = if equal { 1.0 / lists.len() as f32 } else { list.weight / total_weight };
        let scores: Vec<f32> = list.hits.iter().map(|h| h.score).collect();
        for (rank, (hit, norm)) in list.hits.iter().zip(normalize(&scores)).enumerate() {
            let entry = by_id.entry(hit.id.as_str()).or_insert_with(|| Accum {
                score: 0.0,
                best_rank: rank,
                ordinal: ordinals.get(&hit.id).copied().unwrap_or(usize::MAX),
            });
            entry.score += weight * norm;
            entry.best_rank = entry.best_rank.min(rank);
        }
    }

    let mut fused: Vec<(&str, Accum)> = by_id.into_iter().collect();
    fused.sort_by(|(_, a), (_, b)| {
        b.score
            .total_cmp(&a.score)
            .then(a.best_rank.cmp(&b.best_rank))
            .then(a.ordinal.cmp(&b.ordinal))
    });
    fused
        .into_iter()
        .take(k)
        .map(|(id, acc)| FusedHit { id: id.to_string(), score: acc.score.clamp(0.0, 1.0) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_core::types::SourceKind;

    fn hits(source: SourceKind, items: &[(&str, f32)]) -> Vec<SearchHit> {
        items.iter().map(|(id, score)| SearchHit { id: id.to_string(), score: *score, source }).collect()
    }

    fn ordinals(ids: &[&str]) -> HashMap<ChunkId, usize> {
        ids.iter().enumerate().map(|(i, id)| (id.to_string(), i)).collect()
    }

    #[test]
    fn normalize_handles_bm25_and_negative_cosine() {
        assert_eq!(normalize(&[4.0, 2.0, 1.0]), vec![1.0, 0.5, 0.25]);
        let n = normalize(&[0.5, -0.5]);
        assert!((n[0] - 1.0).abs() < 1e-6 && n[1].abs() < 1e-6);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn equal_scores_are_full_only_when_positive() {
        assert_eq!(normalize(&[0.7, 0.7]), vec![1.0, 1.0]);
        assert_eq!(normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalize(&[-0.2, -0.2]), vec![0.0, 0.0]);
    }

    #[test]
    fn unrelated_vector_hits_do_not_score_full_marks() {
        let vec = hits(SourceKind::Vector, &[("a", 0.0), ("b", 0.0)]);
        let fused = fuse(&[WeightedList { hits: &vec, weight: 1.0 }], &ordinals(&["a", "b"]), 2);
        let ids: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(fused.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn agreeing_lists_put_the_shared_top_first() {
        let kw = hits(SourceKind::Keyword, &[("a", 9.0), ("b", 3.0)]);
        let vec = hits(SourceKind::Vector, &[("a", 0.9), ("c", 0.8)]);
        let fused = fuse(
            &[WeightedList { hits: &kw, weight: 0.5 }, WeightedList { hits: &vec, weight: 0.5 }],
            &ordinals(&["a", "b", "c"]),
            3,
        );
        assert_eq!(fused[0].id, "a");
        assert!((fused[0].score - 1.0).abs() < 1e-6);
        assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn single_list_is_its_own_normalized_ranking() {
        let vec = hits(SourceKind::Vector, &[("c", 0.8), ("a", 0.4), ("b", 0.2)]);
        let fused = fuse(&[WeightedList { hits: &vec, weight: 0.5 }], &ordinals(&["a", "b", "c"]), 5);
        let ids: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(fused.iter().map(|h| h.score).collect::<Vec<_>>(), normalize(&[0.8, 0.4, 0.2]));
    }

    #[test]
    fn ties_prefer_better_rank_then_ordinal() {
        // b is first in the vector list, a is first in the keyword list: equal fused scores.
        let kw = hits(SourceKind::Keyword, &[("a", 2.0), ("b", 1.0)]);
        let vec = hits(SourceKind::Vector, &[("b", 2.0), ("a", 1.0)]);
        let fused = fuse(
            &[WeightedList { hits: &kw, weight: 1.0 }, WeightedList { hits: &vec, weight: 1.0 }],
            &ordinals(&["b", "a"]),
            2,
        );
        let ids: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"], "both have best rank 0; ordinal decides");

        let kw = hits(SourceKind::Keyword, &[("x", 1.0), ("y", 1.0)]);
        let fused = fuse(&[WeightedList { hits: &kw, weight: 1.0 }], &ordinals(&["y", "x"]), 2);
        assert_eq!(fused[0].id, "x", "better position wins before ordinal");
    }

    #[test]
    fn zero_weight_survivor_still_ranks() {
        let kw = hits(SourceKind::Keyword, &[("a", 2.0), ("b", 1.0)]);
        let fused = fuse(&[WeightedList { hits: &kw, weight: 0.0 }], &ordinals(&["a", "b"]), 2);
        assert_eq!(fused[0].id, "a");
        assert!((fused[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn k_truncates() {
        let kw = hits(SourceKind::Keyword, &[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        assert_eq!(fuse(&[WeightedList { hits: &kw, weight: 1.0 }], &ordinals(&["a", "b", "c"]), 2).len(), 2);
        assert!(fuse(&[WeightedList { hits: &kw, weight: 1.0 }], &ordinals(&["a", "b", "c"]), 0).is_empty());
    }
}
