use once_cell::sync::Lazy;
use regex::Regex;

use super::DetectOptions;
use super::cache::PageCache;
use super::section_builder::{dedupe_sequential, guess_level_from_title};
use super::text_extraction::Line;
use crate::provider::PageProvider;
use crate::section::{Section, SectionIdGen, SectionSource};
use crate::session::{PassToken, Superseded};

static NUMBERED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*[).]?\s+").unwrap());

/// Headings stand out by font height; how far above the page median a
/// line must be to qualify.
const HEIGHT_OUTLIER_FACTOR: f32 = 1.35;
/// Headings hug the left margin.
const MAX_HEADING_INDENT: f32 = 140.0;
/// Unnumbered candidates longer than this are body text, not headings.
const MAX_UNNUMBERED_LEN: usize = 80;
/// At most this many headings are kept per page.
const MAX_PER_PAGE: usize = 3;

/// Last-resort structural detection: per-page font-height outliers stand
/// in for headings when no outline, link TOC or textual TOC exists.
pub(crate) async fn detect_headings<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    opts: &DetectOptions,
    ids: &mut SectionIdGen,
    token: &PassToken,
) -> Result<Vec<Section>, Superseded> {
    let pages_to_scan = provider.page_count().min(opts.heading_max_pages);
    let mut sections = Vec::new();

    for page in 1..=pages_to_scan {
        token.check()?;
        let lines = cache.lines(provider, page).await;
        if lines.is_empty() {
            continue;
        }
        let median = median_line_height(&lines);

        let mut candidates: Vec<&Line> = lines
            .iter()
            .filter(|l| {
                l.height >= HEIGHT_OUTLIER_FACTOR * median
                    && l.x_min <= MAX_HEADING_INDENT
                    && is_heading_like(&l.text)
            })
            .collect();
        candidates.sort_by(|a, b| a.y_min.total_cmp(&b.y_min).then(a.x_min.total_cmp(&b.x_min)));

        for candidate in candidates.into_iter().take(MAX_PER_PAGE) {
            sections.push(Section {
                id: ids.next_id(),
                title: candidate.text.clone(),
                level: guess_level_from_title(&candidate.text),
                page,
                anchor_x: 0.0,
                anchor_y: None,
                destination: None,
                source: SectionSource::Heading,
            });
        }
    }

    Ok(dedupe_sequential(sections))
}

fn median_line_height(lines: &[Line]) -> f32 {
    let mut heights: Vec<f32> = lines.iter().map(|l| l.height).collect();
    heights.sort_by(f32::total_cmp);
    heights.get(heights.len() / 2).copied().unwrap_or(10.0)
}

fn is_heading_like(text: &str) -> bool {
    let len = text.chars().count();
    if len <= 3 {
        return false;
    }
    NUMBERED_PREFIX.is_match(text) || len <= MAX_UNNUMBERED_LEN
}
