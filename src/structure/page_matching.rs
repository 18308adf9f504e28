use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::DetectOptions;
use super::cache::PageCache;
use super::toc_extraction::{TocEntry, is_arabic_token};
use crate::provider::PageProvider;
use crate::section::Section;
use crate::session::{PassToken, Superseded};

/// Leading numbering (arabic or roman), punctuation and dashes in front of
/// the content words of a title.
static NUMBERING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\divxlcdm.)\s-]+\b").unwrap());

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());

/// Printed-number offsets further out than this are noise.
const OFFSET_MIN: i64 = -200;
const OFFSET_MAX: i64 = 400;

/// Normalizes a title into its match key: lowercased, numbering prefix
/// stripped, symbols removed, truncated to the first 6 content words
/// longer than 2 characters.
pub fn title_key(title: &str) -> String {
    let t = title.to_lowercase();
    let t = NUMBERING_PREFIX.replace(&t, "");
    let t = NON_ALNUM.replace_all(&t, " ");
    t.split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scores how well a title key matches a page's header text: 1.0 on a
/// literal substring hit, otherwise word-set Jaccard similarity combined
/// (by max) with a discounted in-order subsequence bonus.
pub fn title_match_score(key: &str, haystack: &str) -> f32 {
    if key.is_empty() || haystack.is_empty() {
        return 0.0;
    }
    if haystack.contains(key) {
        return 1.0;
    }

    let key_words: Vec<&str> = key.split(' ').collect();
    let hay_words: Vec<&str> = haystack.split(' ').collect();
    let a: HashSet<&str> = key_words.iter().copied().collect();
    let b: HashSet<&str> = hay_words.iter().copied().collect();
    let inter = a.intersection(&b).count();
    let union = a.len() + b.len() - inter;
    let jaccard = inter as f32 / union.max(1) as f32;

    let seq = sequential_presence_bonus(&key_words, &hay_words);
    jaccard.max(seq * 0.6)
}

/// Fraction of key words found, in order, as a subsequence of the header
/// words.
fn sequential_presence_bonus(tokens: &[&str], words: &[&str]) -> f32 {
    let mut i = 0;
    for w in words {
        if i < tokens.len() && *w == tokens[i] {
            i += 1;
        }
        if i >= tokens.len() {
            break;
        }
    }
    i as f32 / tokens.len().max(1) as f32
}

/// Estimates the offset between printed TOC page numbers and physical page
/// indices by content-matching a sample of entry titles against page
/// headers. An inconclusive scan yields offset 0.
pub(crate) async fn estimate_arabic_offset<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    entries: &[TocEntry],
    opts: &DetectOptions,
    token: &PassToken,
) -> Result<i64, Superseded> {
    let page_count = provider.page_count();
    let last = page_count.min(opts.offset_scan_limit);
    let first = opts.offset_min_page.max(1);

    let sampled: Vec<&TocEntry> = entries
        .iter()
        .filter(|e| is_arabic_token(&e.page_token) && e.title.trim().chars().count() >= 3)
        .take(opts.offset_sample)
        .collect();

    let mut candidates: Vec<i64> = Vec::new();
    for entry in sampled {
        let Ok(printed) = entry.page_token.parse::<i64>() else {
            continue;
        };
        let key = title_key(&entry.title);
        if key.is_empty() {
            continue;
        }

        let mut best_page = None;
        let mut best_score = -1.0f32;
        for page in first..=last {
            token.check()?;
            let head = cache.header_text(provider, page).await;
            let score = title_match_score(&key, &head);
            if score > best_score {
                best_score = score;
                best_page = Some(page);
            }
        }
        if let Some(best) = best_page
            && best_score >= opts.offset_accept_score
        {
            candidates.push(best as i64 - printed);
        }
    }

    let offset = median_offset(&mut candidates);
    debug!(offset, samples = candidates.len(), "estimated printed-page offset");
    Ok(offset)
}

/// Median of the candidate offsets, clamped to a sane range; 0 when no
/// candidate was accepted.
fn median_offset(candidates: &mut [i64]) -> i64 {
    if candidates.is_empty() {
        return 0;
    }
    candidates.sort_unstable();
    let mid = candidates.len() / 2;
    let median = if candidates.len() % 2 == 1 {
        candidates[mid]
    } else {
        ((candidates[mid - 1] + candidates[mid]) as f64 / 2.0).round() as i64
    };
    median.clamp(OFFSET_MIN, OFFSET_MAX)
}

/// Local-window correction: scans `guess ± window` and returns the page
/// whose header best matches the title, keeping the guess unless the best
/// score clears the acceptance threshold.
pub(crate) async fn find_best_page_for_title<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    title: &str,
    guess: u32,
    opts: &DetectOptions,
    token: &PassToken,
) -> Result<u32, Superseded> {
    let key = title_key(title);
    if key.is_empty() {
        return Ok(guess);
    }
    let page_count = provider.page_count();
    let start = guess.saturating_sub(opts.refine_window).max(1);
    let end = (guess + opts.refine_window).min(page_count);

    let mut best_page = guess;
    let mut best_score = -1.0f32;
    for page in start..=end {
        token.check()?;
        let head = cache.header_text(provider, page).await;
        let score = title_match_score(&key, &head);
        if score > best_score {
            best_score = score;
            best_page = page;
        }
    }
    if best_score >= opts.refine_accept_score {
        Ok(best_page)
    } else {
        Ok(guess)
    }
}

/// Nudges every section's page within the refinement window.
pub(crate) async fn refine_pages_by_content<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    sections: &mut [Section],
    opts: &DetectOptions,
    token: &PassToken,
) -> Result<(), Superseded> {
    for section in sections.iter_mut() {
        section.page =
            find_best_page_for_title(provider, cache, &section.title, section.page, opts, token)
                .await?;
    }
    Ok(())
}
