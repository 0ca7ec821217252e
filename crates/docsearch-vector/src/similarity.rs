use docsearch_core::config::Metric;
use docsearch_core::types::{SearchHit, SourceKind};

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let na = dot(a, a).sqrt();
    let nb = dot(b, b).sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

pub fn similarity(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Cosine => cosine(a, b),
        Metric::Dot => dot(a, b),
    }
}

/// A stored vector with what ranking needs to identify and order it.
pub struct Candidate<'a> {
    pub id: &'a str,
    pub ordinal: usize,
    pub vector: &'a [f32],
}

/// Exact top-k by similarity, ties broken by insertion ordinal.
pub fn top_k<'a>(metric: Metric, query: &[f32], candidates: impl IntoIterator<Item = Candidate<'a>>, k: usize) -> Vec<SearchHit> {
    if k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f32, usize, &str)> = candidates
        .into_iter()
        .map(|c| (similarity(metric, query, c.vector), c.ordinal, c.id))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(k)
        .map(|(score, _, id)| SearchHit { id: id.to_string(), score, source: SourceKind::Vector })
        .collect()
}
