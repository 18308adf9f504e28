use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::DetectOptions;
use super::toc_extraction::{TocEntry, clean_toc_title, is_arabic_token};
use crate::section::{Section, SectionIdGen, SectionSource};

/// Caption-style prefixes that do not mark body sections.
static NON_BODY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(figure|fig\.|table|tab\.|appendix|lampiran|gambar|tabel)\b").unwrap()
});

static LEADING_NUMBERING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*").unwrap());

/// Infers a heading level from the depth of a leading `2.3.1` style
/// numbering, clamped to 1..=3. Unnumbered titles are level 1.
pub fn guess_level_from_title(title: &str) -> u8 {
    let Some(m) = LEADING_NUMBERING.find(title.trim_start()) else {
        return 1;
    };
    let depth = m.as_str().matches('.').count() as u8 + 1;
    depth.clamp(1, 3)
}

/// Whether a title is a figure/table/appendix style caption rather than a
/// body section.
pub fn is_non_body_title(title: &str) -> bool {
    NON_BODY_PREFIX.is_match(title)
}

/// Indent allowance for a heading level: lines indented further than this
/// are treated as layout noise, not genuine headings.
pub fn allowed_indent(min_indent: f32, indent_slack: f32, level: u8) -> f32 {
    min_indent + indent_slack * (level as f32 - 1.0 + 0.15)
}

/// Assembles sections from parsed TOC entries using the estimated
/// printed-to-physical offset. Roman page tokens are skipped under the
/// default policy; arabic tokens map via `clamp(n + offset, 1, page_count)`.
/// Enforces monotonic non-decreasing page order and drops consecutive
/// duplicates.
pub fn build_sections_from_toc(
    entries: &[TocEntry],
    offset: i64,
    page_count: u32,
    opts: &DetectOptions,
    ids: &mut SectionIdGen,
) -> Vec<Section> {
    if entries.is_empty() || page_count == 0 {
        return Vec::new();
    }
    let min_indent = entries
        .iter()
        .map(|e| e.indent)
        .fold(f32::INFINITY, f32::min);

    let mut sections = Vec::new();
    let mut last_page = 0u32;
    let mut last_key = String::new();

    for entry in entries {
        if !opts.include_figures && is_non_body_title(&entry.title) {
            continue;
        }
        let Some(page) = map_page_token(&entry.page_token, offset, page_count) else {
            continue;
        };

        let level = guess_level_from_title(&entry.title);
        if level > opts.max_depth {
            continue;
        }
        if entry.indent > allowed_indent(min_indent, opts.indent_slack, level) {
            continue;
        }
        if page < last_page {
            debug!(title = %entry.title, page, "dropping page regression in TOC order");
            continue;
        }

        let title = clean_toc_title(&entry.title);
        let key = format!("{}|{}", page, title.chars().take(120).collect::<String>());
        if key == last_key {
            continue;
        }

        sections.push(Section {
            id: ids.next_id(),
            title,
            level,
            page,
            anchor_x: 0.0,
            anchor_y: None,
            destination: None,
            source: SectionSource::TocText,
        });
        last_page = last_page.max(page);
        last_key = key;
    }
    sections
}

fn map_page_token(token: &str, offset: i64, page_count: u32) -> Option<u32> {
    if !is_arabic_token(token) {
        // Roman tokens overwhelmingly reference unnumbered front matter
        // and are unreliable; the default policy skips them.
        return None;
    }
    let n: i64 = token.parse().ok()?;
    Some((n + offset).clamp(1, page_count as i64) as u32)
}

/// Removes runs of sections sharing the same `(page, title prefix)` key,
/// keeping the first of each run.
pub fn dedupe_sequential(sections: Vec<Section>) -> Vec<Section> {
    let mut out: Vec<Section> = Vec::with_capacity(sections.len());
    let mut last_key = String::new();
    for section in sections {
        let key = section.dedupe_key();
        if key != last_key {
            out.push(section);
        }
        last_key = key;
    }
    out
}
