use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::DetectOptions;
use super::cache::PageCache;
use super::text_extraction::Line;
use crate::provider::PageProvider;
use crate::session::{PassToken, Superseded};

/// Localized header tokens that mark a visual table of contents.
static TOC_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|\s)(daftar\s+isi|table\s+of\s+contents|contents)(\s|$)").unwrap()
});

/// `Title ..... 12` style lines, tolerating mid-dot leaders, long space
/// runs and an optional page label before the trailing token.
static DOT_LEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^.+?(?:\.{2,}|·{2,}|[.\s]{4,})\s*(?:hal\.?|page|p\.)?\s*(\d+|[ivxlcdm]+)$")
        .unwrap()
});

static STRUCTURED_TOC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)(?:\.{2,}|·{2,}|[.\s]{4,})\s*(?:hal\.?|page|p\.)?\s*([a-z0-9]+)$")
        .unwrap()
});

/// Bullet glyph runs used as leaders; collapsed to plain dots before
/// parsing.
static BULLET_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[•●○∙·⋅]+").unwrap());

/// A label left dangling at the end of a title once its page token has
/// been cut off, e.g. the `(page` of `Results (page iv)`.
static DANGLING_PAGE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[(\[]\s*(?:hal\.?|page|p\.?)?\s*$").unwrap());

static ARABIC_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static ROMAN_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[ivxlcdm]+$").unwrap());

/// A parsed TOC line, before page mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTocLine {
    pub title: String,
    pub page_token: String,
}

/// A parsed TOC line together with its indent (the line's `x_min`).
#[derive(Debug, Clone)]
pub struct TocEntry {
    pub title: String,
    pub page_token: String,
    pub indent: f32,
}

pub fn is_arabic_token(token: &str) -> bool {
    !token.is_empty() && ARABIC_TOKEN.is_match(token)
}

pub fn is_roman_token(token: &str) -> bool {
    !token.is_empty() && ROMAN_TOKEN.is_match(token)
}

/// A page qualifies as a TOC page when it carries a contents header or at
/// least five dot-leader lines.
pub fn is_toc_page(lines: &[Line]) -> bool {
    let text_block = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if TOC_HEADER.is_match(&text_block) {
        return true;
    }
    let dot_leader_lines = lines.iter().filter(|l| is_dot_leader_line(&l.text)).count();
    dot_leader_lines >= 5
}

pub fn is_dot_leader_line(text: &str) -> bool {
    let t = normalize_whitespace(text);
    !t.is_empty() && DOT_LEADER_LINE.is_match(&t)
}

/// Parses one candidate line into `(title, page token)`.
///
/// The structured grammar handles leadered lines; when it fails, words are
/// scanned right-to-left for the last purely arabic or roman token, and
/// everything before it becomes the title. Returns `None` when no page
/// token can be isolated.
pub fn parse_toc_line(text: &str) -> Option<ParsedTocLine> {
    let t = BULLET_RUNS.replace_all(text, ".");
    let t = normalize_whitespace(&t);
    let t = strip_trailing_dots(&t);
    if t.is_empty() {
        return None;
    }

    if let Some(caps) = STRUCTURED_TOC_LINE.captures(&t) {
        let title = clean_toc_title(&caps[1]);
        let page_token = clean_page_token(&caps[2]);
        if !title.is_empty() && !page_token.is_empty() {
            return Some(ParsedTocLine { title, page_token });
        }
    }

    let words: Vec<&str> = t.split(' ').collect();
    for i in (0..words.len()).rev() {
        let token = clean_page_token(words[i]);
        if token.is_empty() {
            continue;
        }
        if is_arabic_token(&token) || is_roman_token(&token) {
            let head = words[..i].join(" ");
            let head = DANGLING_PAGE_LABEL.replace(&head, "");
            let title = clean_toc_title(&head);
            if title.is_empty() {
                break;
            }
            return Some(ParsedTocLine {
                title,
                page_token: token,
            });
        }
    }
    None
}

/// Parses one [`Line`], carrying its indent along.
pub fn parse_toc_entry(line: &Line) -> Option<TocEntry> {
    let parsed = parse_toc_line(&line.text)?;
    Some(TocEntry {
        title: parsed.title,
        page_token: parsed.page_token,
        indent: line.x_min,
    })
}

pub fn clean_toc_title(s: &str) -> String {
    normalize_whitespace(&strip_trailing_dots(&normalize_whitespace(s)))
}

fn clean_page_token(s: &str) -> String {
    s.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']' | ',' | '.' | ':'))
        .trim()
        .to_string()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_trailing_dots(s: &str) -> String {
    s.trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Scans the leading pages for the first one that qualifies as a TOC
/// page.
pub(crate) async fn find_toc_start<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    opts: &DetectOptions,
    token: &PassToken,
) -> Result<Option<u32>, Superseded> {
    let pages_to_scan = provider.page_count().min(opts.max_scan_pages);
    for page in 1..=pages_to_scan {
        token.check()?;
        let lines = cache.lines(provider, page).await;
        if !lines.is_empty() && is_toc_page(&lines) {
            debug!(page, "found start of visual table of contents");
            return Ok(Some(page));
        }
    }
    Ok(None)
}

/// Sweeps consecutive TOC pages from `start`, parsing every line that
/// yields a page token, until a page stops qualifying or the span cap is
/// reached.
pub(crate) async fn collect_toc_entries<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    start: u32,
    opts: &DetectOptions,
    token: &PassToken,
) -> Result<Vec<TocEntry>, Superseded> {
    let pages_to_scan = provider.page_count().min(opts.max_scan_pages);
    let mut entries = Vec::new();
    let mut span = 0;

    for page in start..=pages_to_scan {
        if span >= opts.max_toc_span_pages {
            break;
        }
        token.check()?;
        let lines = cache.lines(provider, page).await;
        if lines.is_empty() || !is_toc_page(&lines) {
            break;
        }
        entries.extend(lines.iter().filter_map(parse_toc_entry));
        span += 1;
    }
    Ok(entries)
}
