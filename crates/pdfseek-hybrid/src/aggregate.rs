//! Collapse chunk-level results into one composite judgment per source file.
//!
//! ```text
//! relevance = 0.4 * max + 0.4 * top3_avg + 0.2 * median
//! score     = relevance * page_bonus * density_adjustment * consistency_bonus
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, warn};

use pdfseek_core::types::{Chunk, FileAggregate, FusedResult, ScoredChunk, SearchType};

const MAX_WEIGHT: f32 = 0.4;
const TOP3_WEIGHT: f32 = 0.4;
const MEDIAN_WEIGHT: f32 = 0.2;

const PAGE_COUNT_STEP: f32 = 0.05;
const PAGE_COUNT_CAP: f32 = 1.2;
const DISPERSION_STEP: f32 = 0.1;

const DENSITY_KNEE: f32 = 3.0;
const DENSITY_STEP: f32 = 0.1;
const DENSITY_PENALTY: f32 = 0.05;
const DENSITY_FLOOR: f32 = 0.85;

const CONSISTENCY_STEP: f32 = 0.1;

/// Anything that carries a chunk and a ranking score.
pub trait RankedChunk {
    fn chunk(&self) -> &Chunk;
    fn score(&self) -> f32;
}

impl RankedChunk for FusedResult {
    fn chunk(&self) -> &Chunk {
        &self.chunk
    }
    fn score(&self) -> f32 {
        self.score
    }
}

impl RankedChunk for ScoredChunk {
    fn chunk(&self) -> &Chunk {
        &self.chunk
    }
    fn score(&self) -> f32 {
        self.score
    }
}

/// Group `results` by source and score each file, best first.
///
/// Files are visited in order of first appearance, so equal scores keep
/// that order. A file with no usable page numbers or with a non-finite
/// score is skipped with a warning rather than failing the batch.
pub fn aggregate_by_file<R: RankedChunk>(results: &[R], search_type: SearchType) -> Vec<FileAggregate> {
    let mut groups: Vec<(&str, Vec<&R>)> = Vec::new();
    let mut by_source: HashMap<&str, usize> = HashMap::new();
    for r in results {
        let source = r.chunk().source.as_str();
        match by_source.get(source) {
            Some(&i) => groups[i].1.push(r),
            None => {
                by_source.insert(source, groups.len());
                groups.push((source, vec![r]));
            }
        }
    }

    let mut files: Vec<FileAggregate> = groups
        .into_iter()
        .filter_map(|(source, members)| aggregate_file(source, &members, search_type))
        .collect();

    files.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    files
}

fn aggregate_file<R: RankedChunk>(source: &str, members: &[&R], search_type: SearchType) -> Option<FileAggregate> {
    if let Some(bad) = members.iter().find(|m| !m.score().is_finite()) {
        warn!(source, chunk = %bad.chunk().id, "skipping file with non-finite chunk score");
        return None;
    }

    // pages are 1-based; chunks without one take no part in any statistic
    let paged: Vec<&R> = members.iter().copied().filter(|m| m.chunk().page > 0).collect();
    if paged.is_empty() {
        warn!(source, chunks = members.len(), "skipping file with no recorded pages");
        return None;
    }
    if paged.len() < members.len() {
        warn!(source, dropped = members.len() - paged.len(), "ignoring chunks without a page number");
    }
    let members: &[&R] = &paged;

    let mut pages: Vec<u32> = members.iter().map(|m| m.chunk().page).collect();
    pages.sort_unstable();
    pages.dedup();

    // first occurrence wins among equal scores
    let mut best: &R = members[0];
    for &m in &members[1..] {
        if m.score() > best.score() {
            best = m;
        }
    }

    let mut scores: Vec<f32> = members.iter().map(|m| m.score()).collect();
    scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    let max_score = scores[0];
    let avg_score = mean(&scores);
    let median_score = median(&scores);
    let top3_avg = mean(&scores[..scores.len().min(3)]);
    let relevance_score = MAX_WEIGHT * max_score + TOP3_WEIGHT * top3_avg + MEDIAN_WEIGHT * median_score;

    let page_bonus = page_bonus(&pages);
    let density_adjustment = density_adjustment(members.len(), pages.len());
    let consistency_bonus = consistency_bonus(&scores);
    let score = relevance_score * page_bonus * density_adjustment * consistency_bonus;

    debug!(
        source,
        chunks = members.len(),
        pages = pages.len(),
        relevance_score,
        page_bonus,
        density_adjustment,
        consistency_bonus,
        score,
        "aggregated file"
    );

    Some(FileAggregate {
        source: source.to_string(),
        max_score,
        avg_score,
        median_score,
        top3_avg,
        chunk_count: members.len(),
        pages,
        best_chunk: best.chunk().content.clone(),
        relevance_score,
        page_bonus,
        density_adjustment,
        consistency_bonus,
        score,
        search_type,
    })
}

/// Breadth of coverage: more distinct pages help, gaps between them help a
/// little more. `pages` must be sorted and distinct.
pub fn page_bonus(pages: &[u32]) -> f32 {
    let (Some(&first), Some(&last)) = (pages.first(), pages.last()) else {
        return 1.0;
    };
    if pages.len() == 1 {
        return 1.0;
    }
    let n = pages.len() as f32;
    let count_bonus = (1.0 + (n - 1.0) * PAGE_COUNT_STEP).min(PAGE_COUNT_CAP);
    let span = (last - first + 1) as f32;
    let dispersion = n / span;
    count_bonus * (1.0 + (dispersion - 1.0) * DISPERSION_STEP)
}

/// Rewards a few hits per page and penalizes many, which usually means
/// repeated boilerplate.
pub fn density_adjustment(chunk_count: usize, page_count: usize) -> f32 {
    if chunk_count <= 1 || page_count == 0 {
        return 1.0;
    }
    let density = chunk_count as f32 / page_count as f32;
    if density <= DENSITY_KNEE {
        1.0 + density * DENSITY_STEP
    } else {
        (1.0 + DENSITY_KNEE * DENSITY_STEP - (density - DENSITY_KNEE) * DENSITY_PENALTY).max(DENSITY_FLOOR)
    }
}

/// Low spread across a file's chunk scores earns up to +10%.
pub fn consistency_bonus(scores: &[f32]) -> f32 {
    if scores.len() < 2 {
        return 1.0;
    }
    1.0 + (1.0 / (1.0 + std_dev(scores))) * CONSISTENCY_STEP
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f32>() / xs.len() as f32
}

/// Median of scores already sorted (either direction).
fn median(sorted: &[f32]) -> f32 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Population standard deviation.
fn std_dev(xs: &[f32]) -> f32 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / xs.len() as f32;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(source: &str, page: u32, content: &str, score: f32) -> ScoredChunk {
        ScoredChunk::new(
            Chunk {
                id: format!("{source}-{page}-{content}"),
                content: content.to_string(),
                source: source.to_string(),
                page,
                chunk_index: 0,
            },
            score,
            SearchType::Hybrid,
        )
    }

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn three_contiguous_pages() {
        let hits = vec![hit("r.pdf", 1, "a", 0.9), hit("r.pdf", 2, "b", 0.5), hit("r.pdf", 3, "c", 0.3)];
        let files = aggregate_by_file(&hits, SearchType::Hybrid);
        assert_eq!(files.len(), 1);
        let f = &files[0];

        assert!(close(f.relevance_score, 0.6867, 1e-4), "relevance {}", f.relevance_score);
        assert!(close(f.page_bonus, 1.1, 1e-6));
        assert!(close(f.density_adjustment, 1.1, 1e-6));
        assert!(close(f.consistency_bonus, 1.0800, 1e-4), "consistency {}", f.consistency_bonus);
        let expected = f.relevance_score * f.page_bonus * f.density_adjustment * f.consistency_bonus;
        assert!(close(f.score, expected, 1e-6));

        assert_eq!(f.pages, vec![1, 2, 3]);
        assert_eq!(f.chunk_count, 3);
        assert_eq!(f.best_chunk, "a");
        assert!(close(f.max_score, 0.9, 1e-6));
        assert!(close(f.median_score, 0.5, 1e-6));
        assert!(close(f.avg_score, 1.7 / 3.0, 1e-6));
    }

    #[test]
    fn single_chunk_has_neutral_bonuses() {
        let files = aggregate_by_file(&[hit("one.pdf", 4, "only", 0.42)], SearchType::Semantic);
        let f = &files[0];
        assert_eq!(f.page_bonus, 1.0);
        assert_eq!(f.density_adjustment, 1.0);
        assert_eq!(f.consistency_bonus, 1.0);
        assert!(close(f.score, f.relevance_score, 1e-7));
        assert!(close(f.score, 0.42, 1e-6));
        assert_eq!(f.search_type, SearchType::Semantic);
    }

    #[test]
    fn scattered_pages_lose_a_little_dispersion() {
        // 2 pages over a span of 10
        let b = page_bonus(&[1, 10]);
        assert!(close(b, 1.05 * (1.0 + (0.2 - 1.0) * 0.1), 1e-6));
        assert!(b < 1.05);
    }

    #[test]
    fn page_count_bonus_is_capped() {
        let pages: Vec<u32> = (1..=20).collect();
        assert!(close(page_bonus(&pages), 1.2, 1e-6));
    }

    #[test]
    fn density_rewards_then_penalizes() {
        assert!(close(density_adjustment(3, 1), 1.3, 1e-6));
        assert!(close(density_adjustment(5, 1), 1.2, 1e-6));
        assert!(close(density_adjustment(100, 1), DENSITY_FLOOR, 1e-6));
    }

    #[test]
    fn identical_scores_get_full_consistency_bonus() {
        assert!(close(consistency_bonus(&[0.5, 0.5, 0.5]), 1.1, 1e-6));
        assert_eq!(consistency_bonus(&[0.5]), 1.0);
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        assert!(close(median(&[0.9, 0.6, 0.4, 0.1]), 0.5, 1e-6));
    }

    #[test]
    fn files_sorted_best_first_and_grouped() {
        let hits = vec![
            hit("weak.pdf", 1, "w", 0.2),
            hit("strong.pdf", 1, "s1", 0.9),
            hit("strong.pdf", 5, "s2", 0.8),
            hit("weak.pdf", 2, "w2", 0.1),
        ];
        let files = aggregate_by_file(&hits, SearchType::Hybrid);
        let order: Vec<&str> = files.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(order, vec!["strong.pdf", "weak.pdf"]);
        assert_eq!(files[1].chunk_count, 2);
        assert_eq!(files[0].pages, vec![1, 5]);
    }

    #[test]
    fn file_without_pages_is_skipped() {
        let hits = vec![hit("broken.pdf", 0, "x", 0.9), hit("ok.pdf", 1, "y", 0.3)];
        let files = aggregate_by_file(&hits, SearchType::Hybrid);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source, "ok.pdf");
    }

    #[test]
    fn pageless_chunks_do_not_skew_file_statistics() {
        let mixed = vec![
            hit("m.pdf", 1, "a", 0.9),
            hit("m.pdf", 0, "x", 0.1),
            hit("m.pdf", 0, "y", 0.1),
            hit("m.pdf", 2, "b", 0.5),
        ];
        let clean = vec![hit("m.pdf", 1, "a", 0.9), hit("m.pdf", 2, "b", 0.5)];
        let got = &aggregate_by_file(&mixed, SearchType::Hybrid)[0];
        let want = &aggregate_by_file(&clean, SearchType::Hybrid)[0];

        assert_eq!(got.chunk_count, 2);
        assert_eq!(got.pages, vec![1, 2]);
        assert!(close(got.density_adjustment, 1.1, 1e-6), "density {}", got.density_adjustment);
        assert!(close(got.median_score, want.median_score, 1e-6));
        assert!(close(got.score, want.score, 1e-6));
    }

    #[test]
    fn non_finite_score_skips_only_that_file() {
        let hits = vec![hit("nan.pdf", 1, "x", f32::NAN), hit("ok.pdf", 1, "y", 0.3)];
        let files = aggregate_by_file(&hits, SearchType::Hybrid);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source, "ok.pdf");
    }

    #[test]
    fn empty_input_is_empty_output() {
        let none: Vec<FusedResult> = Vec::new();
        assert!(aggregate_by_file(&none, SearchType::Hybrid).is_empty());
    }
}
