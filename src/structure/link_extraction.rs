use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::DetectOptions;
use super::cache::PageCache;
use super::section_builder::{allowed_indent, guess_level_from_title, is_non_body_title};
use super::text_extraction::Line;
use super::toc_extraction::{clean_toc_title, is_toc_page, parse_toc_line};
use crate::geometry::Rect;
use crate::provider::{LinkAnnotation, PageProvider};
use crate::section::{Section, SectionIdGen, SectionSource};
use crate::session::{PassToken, Superseded};

/// `#page=12` style fragments in link uris.
static PAGE_FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[#?&]page=(\d+)").unwrap());

/// `1.`, `2.3)`, `(a)`, `IV.` style markers that open a fresh entry.
static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*[).]?\s+").unwrap());
static LETTERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[(\[]?[a-zA-Z][).\]]\s+").unwrap());
static ROMAN_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[ivxlcdm]+[).]\s+").unwrap());

static STARTS_LOWER_OR_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z-]").unwrap());

/// One link annotation matched to a TOC line, before wrap merging.
#[derive(Debug, Clone)]
pub(crate) struct RawLinkEntry {
    pub toc_page: u32,
    pub line_idx: usize,
    pub mid_y: f32,
    pub indent: f32,
    pub target_page: u32,
    pub dest: Option<String>,
    pub anchor_x: f32,
    pub anchor_y: Option<f32>,
    pub title: String,
    pub level: u8,
}

/// Builds sections from hyperlink annotations found on the visual TOC
/// pages starting at `start`. Entries keep document order (TOC page, line
/// index, vertical position); reading order and target order may
/// legitimately diverge, so the result is never re-sorted by target page.
pub(crate) async fn detect_toc_by_links<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    start: u32,
    opts: &DetectOptions,
    ids: &mut SectionIdGen,
    token: &PassToken,
) -> Result<Vec<Section>, Superseded> {
    let page_count = provider.page_count();
    let pages_to_scan = page_count.min(opts.max_scan_pages);
    let mut raw = Vec::new();
    let mut span = 0;

    for toc_page in start..=pages_to_scan {
        if span >= opts.max_toc_span_pages {
            break;
        }
        token.check()?;
        let lines = cache.lines(provider, toc_page).await;
        if lines.is_empty() || !is_toc_page(&lines) {
            break;
        }
        span += 1;

        let annotations = match provider.annotations(toc_page).await {
            Ok(annotations) => annotations,
            Err(e) => {
                debug!(page = toc_page, error = %e, "annotation fetch failed, skipping page");
                continue;
            }
        };
        let min_indent = lines.iter().map(|l| l.x_min).fold(f32::INFINITY, f32::min);

        let mut page_entries = Vec::new();
        for annotation in &annotations {
            token.check()?;
            let Some(target) = resolve_link_target(provider, annotation, page_count).await else {
                continue;
            };

            let line = pick_line_by_rect(&lines, annotation.rect)
                .or_else(|| pick_nearest_line(&lines, annotation.rect));
            let Some(line) = line else { continue };

            let raw_title = parse_toc_line(&line.text)
                .map(|p| p.title)
                .unwrap_or_else(|| clean_toc_title(&line.text));
            let title = clean_toc_title(&raw_title);
            if title.is_empty() {
                continue;
            }
            if !opts.include_figures && is_non_body_title(&title) {
                continue;
            }
            let level = guess_level_from_title(&title);
            if level > opts.max_depth {
                continue;
            }
            let indent = line.x_min;
            if indent > allowed_indent(min_indent, opts.indent_slack, level) {
                continue;
            }

            page_entries.push(RawLinkEntry {
                toc_page,
                line_idx: line.index,
                mid_y: line.mid_y(),
                indent,
                target_page: target.page,
                dest: target.dest,
                anchor_x: target.x,
                anchor_y: target.y,
                title,
                level,
            });
        }

        page_entries.sort_by(|a, b| {
            a.line_idx
                .cmp(&b.line_idx)
                .then(a.mid_y.total_cmp(&b.mid_y))
        });
        raw.extend(page_entries);
    }

    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let merged = merge_multiline_entries(raw, opts);

    let mut sections = Vec::new();
    let mut last_key = String::new();
    for entry in merged {
        let key = format!(
            "{}|{}",
            entry.target_page,
            entry.title.chars().take(120).collect::<String>()
        );
        if key == last_key {
            continue;
        }
        sections.push(Section {
            id: ids.next_id(),
            title: entry.title,
            level: entry.level,
            page: entry.target_page,
            anchor_x: entry.anchor_x,
            anchor_y: entry.anchor_y,
            destination: entry.dest,
            source: SectionSource::TocLink,
        });
        last_key = key;
    }
    Ok(sections)
}

struct LinkTarget {
    page: u32,
    x: f32,
    y: Option<f32>,
    dest: Option<String>,
}

/// Resolves an annotation to a physical target. Targets outside
/// `1..=page_count` are skipped; a dangling link must not produce a
/// section pointing past the document.
async fn resolve_link_target<P: PageProvider>(
    provider: &P,
    annotation: &LinkAnnotation,
    page_count: u32,
) -> Option<LinkTarget> {
    if let Some(dest) = &annotation.dest {
        match provider.resolve_destination(dest).await {
            Ok(Some(loc)) if loc.page >= 1 && loc.page <= page_count => {
                return Some(LinkTarget {
                    page: loc.page,
                    x: loc.x,
                    y: loc.y,
                    dest: Some(dest.clone()),
                });
            }
            Ok(Some(loc)) => {
                debug!(dest, page = loc.page, "link destination outside document, skipping");
            }
            Ok(None) => {}
            Err(e) => {
                debug!(dest, error = %e, "destination resolution failed");
            }
        }
    }
    if let Some(uri) = &annotation.uri
        && let Some(caps) = PAGE_FRAGMENT.captures(uri)
        && let Ok(page) = caps[1].parse::<u32>()
        && page >= 1
        && page <= page_count
    {
        return Some(LinkTarget {
            page,
            x: 0.0,
            y: None,
            dest: None,
        });
    }
    None
}

/// The line whose horizontal span overlaps the annotation rect, nearest
/// the rect's vertical center.
pub(crate) fn pick_line_by_rect(lines: &[Line], rect: Rect<f32>) -> Option<&Line> {
    let mid_y = rect.center().y;
    let mut best: Option<&Line> = None;
    let mut best_dist = f32::INFINITY;
    for line in lines {
        if !rect.overlaps_x_span(line.x_min, line.x_max) {
            continue;
        }
        let d = (line.mid_y() - mid_y).abs();
        if d < best_dist {
            best = Some(line);
            best_dist = d;
        }
    }
    best
}

/// Fallback when no line overlaps horizontally: nearest by vertical
/// distance alone.
pub(crate) fn pick_nearest_line(lines: &[Line], rect: Rect<f32>) -> Option<&Line> {
    let mid_y = rect.center().y;
    lines.iter().min_by(|a, b| {
        (a.mid_y() - mid_y)
            .abs()
            .total_cmp(&(b.mid_y() - mid_y).abs())
    })
}

/// Merges wrapped multi-line titles: consecutive raw entries on the same
/// TOC page, vertically close, with similar indent, where the second line
/// reads like a continuation of the first. The merged entry keeps the
/// outermost level and the first line's target page, anchor and
/// destination.
pub(crate) fn merge_multiline_entries(
    entries: Vec<RawLinkEntry>,
    opts: &DetectOptions,
) -> Vec<RawLinkEntry> {
    let mut groups: Vec<RawLinkEntry> = Vec::new();
    for entry in entries {
        let can_merge = groups.last().is_some_and(|g| {
            g.toc_page == entry.toc_page
                && (g.mid_y - entry.mid_y).abs() <= opts.merge_y_tolerance
                && (g.indent - entry.indent).abs() <= opts.merge_x_tolerance
                && looks_like_continuation(&g.title, &entry.title)
        });
        if can_merge {
            let group = groups.last_mut().unwrap();
            group.title = merge_titles(&group.title, &entry.title);
            group.level = group.level.min(entry.level);
            group.mid_y = entry.mid_y;
        } else {
            groups.push(entry);
        }
    }
    for group in &mut groups {
        group.title = clean_toc_title(&group.title);
    }
    groups
}

/// Whether `next` reads like the wrapped tail of `prev` rather than a
/// fresh entry.
pub(crate) fn looks_like_continuation(prev: &str, next: &str) -> bool {
    let a = clean_toc_title(prev);
    let b = clean_toc_title(next);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    // A numbered or caption-style line is always a new item.
    if is_numbered_item(&b) || is_non_body_title(&b) {
        return false;
    }

    let starts_lower_or_hyphen = STARTS_LOWER_OR_HYPHEN.is_match(&b);
    let prev_hangs =
        !a.ends_with(['.', ':', ';']) && a.chars().count() >= 12;
    starts_lower_or_hyphen || prev_hangs || shares_first_token(&a, &b)
}

fn is_numbered_item(s: &str) -> bool {
    let t = s.trim();
    NUMBERED_ITEM.is_match(t) || LETTERED_ITEM.is_match(t) || ROMAN_ITEM.is_match(t)
}

fn shares_first_token(a: &str, b: &str) -> bool {
    let first = |s: &str| {
        s.to_lowercase()
            .split_whitespace()
            .next()
            .map(str::to_string)
    };
    match (first(a), first(b)) {
        (Some(x), Some(y)) => x == y && x.chars().count() > 2,
        _ => false,
    }
}

fn merge_titles(a: &str, b: &str) -> String {
    let a = clean_toc_title(a);
    let b = clean_toc_title(b);
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }
    clean_toc_title(&format!("{a} {b}"))
}
