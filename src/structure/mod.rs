use serde::{Deserialize, Serialize};

pub mod cache;
pub mod heading_extraction;
pub mod link_extraction;
pub mod outline_extraction;
pub mod page_matching;
pub mod section_builder;
pub mod text_extraction;
pub mod toc_extraction;

/// Tunables for structure inference. The defaults are what the engine has
/// been calibrated with; hosts normally only touch `include_figures` and
/// `max_depth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    /// How many leading pages to scan for a visual TOC.
    pub max_scan_pages: u32,
    /// Longest run of consecutive TOC pages to sweep.
    pub max_toc_span_pages: u32,
    /// Deepest heading level to keep, clamped to 1..=3.
    pub max_depth: u8,
    /// Keep figure/table/appendix captions instead of dropping them.
    pub include_figures: bool,
    /// Indent tolerance per heading level when pruning over-indented lines.
    pub indent_slack: f32,
    /// Drop TOC entries with roman page tokens; they overwhelmingly point
    /// at unnumbered front matter.
    pub ignore_roman_tokens: bool,
    /// Vertical tolerance when clustering runs into lines.
    pub line_y_tolerance: f32,
    /// First page considered when content-matching printed page numbers;
    /// skips covers and blank leaders.
    pub offset_min_page: u32,
    /// Last page considered by the offset scan.
    pub offset_scan_limit: u32,
    /// How many arabic TOC entries to sample for the offset estimate.
    pub offset_sample: usize,
    /// Minimum title-match score for an offset candidate.
    pub offset_accept_score: f32,
    /// Half-width of the local window when refining a guessed page.
    pub refine_window: u32,
    /// Minimum title-match score for accepting a refined page.
    pub refine_accept_score: f32,
    /// Pages scanned by the font-height heading fallback.
    pub heading_max_pages: u32,
    /// Vertical gap under which consecutive link-TOC lines may merge.
    pub merge_y_tolerance: f32,
    /// Indent gap under which consecutive link-TOC lines may merge.
    pub merge_x_tolerance: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            max_scan_pages: 60,
            max_toc_span_pages: 8,
            max_depth: 3,
            include_figures: false,
            indent_slack: 42.0,
            ignore_roman_tokens: true,
            line_y_tolerance: 2.2,
            offset_min_page: 3,
            offset_scan_limit: 160,
            offset_sample: 8,
            offset_accept_score: 0.22,
            refine_window: 3,
            refine_accept_score: 0.15,
            heading_max_pages: 120,
            merge_y_tolerance: 10.0,
            merge_x_tolerance: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_serde() {
        let opts = DetectOptions::default();
        let json = serde_json::to_string(&opts).unwrap();
        let back: DetectOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_scan_pages, 60);
        assert_eq!(back.offset_sample, 8);
        assert!(back.ignore_roman_tokens);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let opts: DetectOptions = serde_json::from_str(r#"{"max_depth": 2}"#).unwrap();
        assert_eq!(opts.max_depth, 2);
        assert_eq!(opts.max_toc_span_pages, 8);
    }
}
