//! Markdown rendering of ranked results.

use std::fmt::Write;

use crate::types::{RetrievalResult, RetrievalWarning, SearchOutcome};

pub const NO_RESULTS: &str = "No relevant information found.";
pub const NO_DOCUMENTS: &str = "No documents have been indexed.";

/// One section per result: rank, page (1-based), text, source and score.
/// An empty slice renders as [`NO_RESULTS`].
pub fn format_results(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = String::from("## Search Results\n\n");
    for r in results {
        let page_info = r.chunk.page.map(|p| format!(" (Page: {})", p + 1)).unwrap_or_default();
        let _ = write!(out, "### Result {}{}\n\n", r.rank, page_info);
        let _ = write!(out, "{}\n\n", r.chunk.content.trim_end());
        if r.chunk.title.is_empty() || r.chunk.title == r.chunk.source {
            let _ = writeln!(out, "Source: {}", r.chunk.source);
        } else {
            let _ = writeln!(out, "Source: {} ({})", r.chunk.title, r.chunk.source);
        }
        let _ = write!(out, "Score: {:.2}\n\n---\n\n", r.score);
    }
    out
}

pub fn format_warnings(warnings: &[RetrievalWarning]) -> String {
    warnings.iter().map(|w| format!("> Warning: {w}\n")).collect()
}

pub fn format_outcome(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::NoDocuments => NO_DOCUMENTS.to_string(),
        SearchOutcome::Ranked(ranked) if ranked.warnings.is_empty() => format_results(&ranked.results),
        SearchOutcome::Ranked(ranked) => {
            format!("{}\n{}", format_warnings(&ranked.warnings), format_results(&ranked.results))
        }
    }
}
