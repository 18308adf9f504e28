use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::text_extraction::{Line, group_runs_into_lines};
use crate::provider::PageProvider;

/// How many leading lines of a page make up its "header text" for title
/// matching.
const HEADER_LINES: usize = 8;

/// Per-pass memo of extracted page lines.
///
/// Offset estimation, refinement and the TOC sweep all revisit the same
/// pages; extraction is a pure function of page content, so one pass never
/// needs to re-cluster a page. The cache is pass-local and dropped with
/// the pass, so reloads cannot observe stale lines.
#[derive(Debug)]
pub(crate) struct PageCache {
    tol_y: f32,
    lines: HashMap<u32, Arc<Vec<Line>>>,
}

impl PageCache {
    pub fn new(tol_y: f32) -> Self {
        Self {
            tol_y,
            lines: HashMap::new(),
        }
    }

    /// Lines of a 1-based page. A page that fails to extract is recorded
    /// as empty and skipped; the scan continues over remaining pages.
    pub async fn lines<P: PageProvider>(&mut self, provider: &P, page: u32) -> Arc<Vec<Line>> {
        if let Some(lines) = self.lines.get(&page) {
            return Arc::clone(lines);
        }
        let runs = match provider.text_runs(page).await {
            Ok(runs) => runs,
            Err(e) => {
                debug!(page, error = %e, "text extraction failed, skipping page");
                Vec::new()
            }
        };
        let lines = Arc::new(group_runs_into_lines(&runs, self.tol_y));
        self.lines.insert(page, Arc::clone(&lines));
        lines
    }

    /// Lowercased concatenation of a page's leading lines, used as the
    /// haystack for title matching.
    pub async fn header_text<P: PageProvider>(&mut self, provider: &P, page: u32) -> String {
        let lines = self.lines(provider, page).await;
        lines
            .iter()
            .take(HEADER_LINES)
            .map(|l| l.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
