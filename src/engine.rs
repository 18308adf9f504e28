use tracing::{debug, info};

use crate::provider::PageProvider;
use crate::section::{Section, SectionIdGen, SectionSource};
use crate::session::{PassToken, Superseded};
use crate::structure::cache::PageCache;
use crate::structure::{
    DetectOptions, heading_extraction, link_extraction, outline_extraction, page_matching,
    section_builder, toc_extraction,
};

/// Runs the full strategy chain on a document and returns its section
/// list. One-shot form for hosts that do not manage reloads; never
/// returns an empty list when the document has at least one page.
pub async fn infer_structure<P: PageProvider>(provider: &P, opts: &DetectOptions) -> Vec<Section> {
    infer_structure_with_token(provider, opts, &PassToken::standalone())
        .await
        .unwrap_or_default()
}

/// Like [`infer_structure`], but cooperating with a
/// [`crate::session::StructureSession`]: returns `None` without
/// publishing anything when a newer pass supersedes this one.
pub async fn infer_structure_with_token<P: PageProvider>(
    provider: &P,
    opts: &DetectOptions,
    token: &PassToken,
) -> Option<Vec<Section>> {
    match run_strategies(provider, opts, token).await {
        Ok(sections) => Some(sections),
        Err(Superseded) => {
            debug!("structure pass superseded by a newer load");
            None
        }
    }
}

/// The strategy state machine: TryOutline, TryLinkTOC, TryTextTOC,
/// TryHeadings, Fallback. The first strategy producing a non-empty list
/// terminates the machine; strategies are never merged.
async fn run_strategies<P: PageProvider>(
    provider: &P,
    opts: &DetectOptions,
    token: &PassToken,
) -> Result<Vec<Section>, Superseded> {
    let page_count = provider.page_count();
    if page_count == 0 {
        return Ok(Vec::new());
    }
    let mut cache = PageCache::new(opts.line_y_tolerance);
    let mut ids = SectionIdGen::default();

    if let Some(sections) = try_outline(provider, &mut ids, token).await? {
        return Ok(sections);
    }

    token.check()?;
    let toc_start = toc_extraction::find_toc_start(provider, &mut cache, opts, token).await?;
    if let Some(start) = toc_start {
        let by_links =
            link_extraction::detect_toc_by_links(provider, &mut cache, start, opts, &mut ids, token)
                .await?;
        if !by_links.is_empty() {
            info!(sections = by_links.len(), "structure from link-annotated TOC");
            return Ok(by_links);
        }

        let by_text =
            try_text_toc(provider, &mut cache, start, opts, &mut ids, token).await?;
        if !by_text.is_empty() {
            info!(sections = by_text.len(), "structure from textual TOC");
            return Ok(by_text);
        }
    }

    let headings =
        heading_extraction::detect_headings(provider, &mut cache, opts, &mut ids, token).await?;
    if !headings.is_empty() {
        info!(sections = headings.len(), "structure from font-height headings");
        return Ok(headings);
    }

    info!(pages = page_count, "no structure found, falling back to one section per page");
    Ok(page_fallback(page_count, &mut ids))
}

async fn try_outline<P: PageProvider>(
    provider: &P,
    ids: &mut SectionIdGen,
    token: &PassToken,
) -> Result<Option<Vec<Section>>, Superseded> {
    let roots = match provider.outline().await {
        Ok(Some(roots)) if !roots.is_empty() => roots,
        Ok(_) => return Ok(None),
        Err(e) => {
            debug!(error = %e, "outline fetch failed, trying other strategies");
            return Ok(None);
        }
    };
    let sections = outline_extraction::flatten_outline(provider, &roots, ids, token).await?;
    if sections.is_empty() {
        Ok(None)
    } else {
        info!(sections = sections.len(), "structure from native outline");
        Ok(Some(sections))
    }
}

async fn try_text_toc<P: PageProvider>(
    provider: &P,
    cache: &mut PageCache,
    start: u32,
    opts: &DetectOptions,
    ids: &mut SectionIdGen,
    token: &PassToken,
) -> Result<Vec<Section>, Superseded> {
    let mut entries =
        toc_extraction::collect_toc_entries(provider, cache, start, opts, token).await?;
    if opts.ignore_roman_tokens {
        entries.retain(|e| toc_extraction::is_arabic_token(&e.page_token));
    }
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let offset =
        page_matching::estimate_arabic_offset(provider, cache, &entries, opts, token).await?;
    let mut sections = section_builder::build_sections_from_toc(
        &entries,
        offset,
        provider.page_count(),
        opts,
        ids,
    );
    page_matching::refine_pages_by_content(provider, cache, &mut sections, opts, token).await?;
    Ok(section_builder::dedupe_sequential(sections))
}

/// Degenerate final strategy: one section per physical page, titled by
/// its page number.
fn page_fallback(page_count: u32, ids: &mut SectionIdGen) -> Vec<Section> {
    (1..=page_count)
        .map(|page| Section {
            id: ids.next_id(),
            title: format!("Page {page}"),
            level: 1,
            page,
            anchor_x: 0.0,
            anchor_y: None,
            destination: None,
            source: SectionSource::PageFallback,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_fallback_covers_every_page() {
        let mut ids = SectionIdGen::default();
        let sections = page_fallback(4, &mut ids);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].title, "Page 1");
        assert_eq!(sections[3].page, 4);
        assert!(sections.iter().all(|s| s.source == SectionSource::PageFallback));
    }
}
