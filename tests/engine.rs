use std::collections::HashMap;

use anyhow::{Result, anyhow};
use tocmap::geometry::{Rect, Vector};
use tocmap::{
    DetectOptions, Destination, LinkAnnotation, OutlineNode, PageProvider, SectionSource,
    StructureSession, TextRun, infer_structure, infer_structure_with_token,
};

#[derive(Debug, Default, Clone)]
struct PageData {
    runs: Vec<TextRun>,
    annotations: Vec<LinkAnnotation>,
    broken: bool,
}

/// In-memory document for driving the engine in tests.
#[derive(Debug, Default)]
struct FakeDoc {
    pages: Vec<PageData>,
    outline: Option<Vec<OutlineNode>>,
    dests: HashMap<String, Destination>,
}

impl FakeDoc {
    fn with_pages(n: usize) -> Self {
        Self {
            pages: vec![PageData::default(); n],
            ..Self::default()
        }
    }

    /// Lays the given texts out as one line each, top to bottom.
    fn set_lines(&mut self, page: usize, lines: &[&str]) {
        let data = &mut self.pages[page - 1];
        data.runs = lines
            .iter()
            .enumerate()
            .map(|(i, text)| TextRun {
                text: (*text).to_string(),
                x: 50.0,
                y: 30.0 + 20.0 * i as f32,
                height: 12.0,
            })
            .collect();
    }

    fn push_run(&mut self, page: usize, text: &str, x: f32, y: f32, height: f32) {
        self.pages[page - 1].runs.push(TextRun {
            text: text.to_string(),
            x,
            y,
            height,
        });
    }

    fn push_link(&mut self, page: usize, rect: Rect<f32>, dest: &str) {
        self.pages[page - 1].annotations.push(LinkAnnotation {
            rect,
            dest: Some(dest.to_string()),
            uri: None,
        });
    }

    fn push_uri_link(&mut self, page: usize, rect: Rect<f32>, uri: &str) {
        self.pages[page - 1].annotations.push(LinkAnnotation {
            rect,
            dest: None,
            uri: Some(uri.to_string()),
        });
    }

    fn add_dest(&mut self, name: &str, page: u32, y: Option<f32>) {
        self.dests.insert(
            name.to_string(),
            Destination { page, x: 10.0, y },
        );
    }
}

impl PageProvider for FakeDoc {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn text_runs(&self, page: u32) -> Result<Vec<TextRun>> {
        let data = self
            .pages
            .get((page - 1) as usize)
            .ok_or_else(|| anyhow!("page {page} out of bounds"))?;
        if data.broken {
            return Err(anyhow!("page {page} cannot be parsed"));
        }
        Ok(data.runs.clone())
    }

    async fn annotations(&self, page: u32) -> Result<Vec<LinkAnnotation>> {
        Ok(self
            .pages
            .get((page - 1) as usize)
            .map(|d| d.annotations.clone())
            .unwrap_or_default())
    }

    async fn resolve_destination(&self, dest: &str) -> Result<Option<Destination>> {
        Ok(self.dests.get(dest).copied())
    }

    async fn outline(&self) -> Result<Option<Vec<OutlineNode>>> {
        Ok(self.outline.clone())
    }
}

fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Rect<f32> {
    Rect::from_points(Vector::new(x0, y0), Vector::new(x1, y1))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A document whose printed TOC numbers are physical page minus 4, with
/// page headers carrying the literal TOC titles.
fn doc_with_text_toc() -> FakeDoc {
    let mut doc = FakeDoc::with_pages(10);
    doc.set_lines(
        1,
        &[
            "Contents",
            "Alpha Research Methods ....... 1",
            "Beta Testing Procedures ....... 3",
            "Gamma Ray Analysis ....... 6",
        ],
    );
    for page in [2, 3, 4, 6, 8, 9] {
        doc.set_lines(page, &["front matter filler words", "nothing interesting here"]);
    }
    doc.set_lines(5, &["Alpha Research Methods", "body body body"]);
    doc.set_lines(7, &["Beta Testing Procedures", "more body content"]);
    doc.set_lines(10, &["Gamma Ray Analysis", "closing content"]);
    doc
}

#[tokio::test]
async fn offset_is_recovered_from_content_matching() {
    init_tracing();
    let doc = doc_with_text_toc();
    let sections = infer_structure(&doc, &DetectOptions::default()).await;

    assert_eq!(sections.len(), 3);
    let pages: Vec<u32> = sections.iter().map(|s| s.page).collect();
    assert_eq!(pages, [5, 7, 10]);
    assert!(sections.iter().all(|s| s.source == SectionSource::TocText));
    assert_eq!(sections[0].title, "Alpha Research Methods");
}

#[tokio::test]
async fn toc_text_pages_are_monotonic_and_in_bounds() {
    let mut doc = doc_with_text_toc();
    // An entry pointing far past the end of the document must clamp, not
    // escape the page range.
    doc.push_run(1, "Delta Extra Chapter ....... 40", 50.0, 110.0, 12.0);
    let sections = infer_structure(&doc, &DetectOptions::default()).await;

    assert!(!sections.is_empty());
    let pages: Vec<u32> = sections.iter().map(|s| s.page).collect();
    assert!(pages.windows(2).all(|w| w[0] <= w[1]), "pages regressed: {pages:?}");
    assert!(pages.iter().all(|p| (1..=10).contains(p)));
}

#[tokio::test]
async fn engine_is_idempotent() {
    let doc = doc_with_text_toc();
    let opts = DetectOptions::default();
    let first = infer_structure(&doc, &opts).await;
    let second = infer_structure(&doc, &opts).await;
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn empty_document_falls_back_to_one_section_per_page() {
    let doc = FakeDoc::with_pages(3);
    let sections = infer_structure(&doc, &DetectOptions::default()).await;

    assert_eq!(sections.len(), 3);
    for (i, section) in sections.iter().enumerate() {
        assert_eq!(section.page, i as u32 + 1);
        assert_eq!(section.title, format!("Page {}", i + 1));
        assert_eq!(section.source, SectionSource::PageFallback);
    }
}

#[tokio::test]
async fn unreadable_pages_never_raise() {
    let mut doc = FakeDoc::with_pages(2);
    doc.pages[0].broken = true;
    doc.pages[1].broken = true;
    let sections = infer_structure(&doc, &DetectOptions::default()).await;

    assert_eq!(sections.len(), 2);
    assert!(sections.iter().all(|s| s.source == SectionSource::PageFallback));
}

#[tokio::test]
async fn native_outline_wins_and_flattens_in_order() {
    let mut doc = doc_with_text_toc();
    doc.add_dest("d-intro", 2, Some(700.0));
    doc.add_dest("d-details", 3, Some(650.0));
    doc.add_dest("d-deep", 4, None);
    doc.outline = Some(vec![
        OutlineNode {
            title: "Introduction".into(),
            dest: Some("d-intro".into()),
            children: vec![OutlineNode {
                title: "Details".into(),
                dest: Some("d-details".into()),
                children: vec![],
            }],
        },
        OutlineNode {
            title: "Broken".into(),
            dest: Some("nowhere".into()),
            children: vec![OutlineNode {
                title: "Deep".into(),
                dest: Some("d-deep".into()),
                children: vec![],
            }],
        },
    ]);

    let sections = infer_structure(&doc, &DetectOptions::default()).await;
    let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["Introduction", "Details", "Deep"]);
    let levels: Vec<u8> = sections.iter().map(|s| s.level).collect();
    assert_eq!(levels, [1, 2, 2]);
    assert!(sections.iter().all(|s| s.source == SectionSource::Outline));
    assert_eq!(sections[0].anchor_y, Some(700.0));
    assert_eq!(sections[0].destination.as_deref(), Some("d-intro"));
}

#[tokio::test]
async fn link_annotations_beat_text_toc_and_merge_wrapped_titles() {
    init_tracing();
    let mut doc = FakeDoc::with_pages(12);
    doc.push_run(1, "Contents", 50.0, 20.0, 12.0);
    doc.push_run(1, "Overview of the system", 50.0, 100.0, 12.0);
    doc.push_run(1, "architecture", 50.0, 108.0, 12.0);
    doc.push_run(1, "Second Chapter", 50.0, 160.0, 12.0);
    for page in 2..=12 {
        doc.set_lines(page, &["plain page body"]);
    }

    doc.add_dest("d1", 6, Some(720.0));
    doc.add_dest("d2", 9, Some(700.0));
    doc.push_link(1, rect(45.0, 96.0, 400.0, 104.0), "d1");
    doc.push_link(1, rect(45.0, 104.0, 400.0, 112.0), "d1");
    doc.push_link(1, rect(45.0, 156.0, 400.0, 164.0), "d2");

    let sections = infer_structure(&doc, &DetectOptions::default()).await;

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].title, "Overview of the system architecture");
    assert_eq!(sections[0].page, 6);
    assert_eq!(sections[0].anchor_y, Some(720.0));
    assert_eq!(sections[0].destination.as_deref(), Some("d1"));
    assert_eq!(sections[1].title, "Second Chapter");
    assert_eq!(sections[1].page, 9);
    assert!(sections.iter().all(|s| s.source == SectionSource::TocLink));
}

#[tokio::test]
async fn link_targets_outside_document_are_skipped() {
    let mut doc = FakeDoc::with_pages(3);
    doc.push_run(1, "Contents", 50.0, 20.0, 12.0);
    doc.push_run(1, "Valid Chapter Heading", 50.0, 100.0, 12.0);
    doc.push_run(1, "Ghost Chapter Beyond", 50.0, 160.0, 12.0);
    doc.push_run(1, "Far Away Chapter", 50.0, 220.0, 12.0);
    doc.set_lines(2, &["plain page body"]);
    doc.set_lines(3, &["plain page body"]);

    doc.add_dest("d-ok", 2, Some(700.0));
    // Resolves, but to a page the document does not have.
    doc.add_dest("d-far", 99, None);
    doc.push_link(1, rect(45.0, 96.0, 400.0, 104.0), "d-ok");
    doc.push_uri_link(1, rect(45.0, 156.0, 400.0, 164.0), "doc.pdf#page=9");
    doc.push_link(1, rect(45.0, 216.0, 400.0, 224.0), "d-far");

    let sections = infer_structure(&doc, &DetectOptions::default()).await;

    assert!(sections.iter().all(|s| (1..=3).contains(&s.page)));
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Valid Chapter Heading");
    assert_eq!(sections[0].page, 2);
    assert_eq!(sections[0].source, SectionSource::TocLink);
}

#[tokio::test]
async fn heading_fallback_uses_font_height_outliers() {
    let mut doc = FakeDoc::with_pages(3);
    for page in 1..=3 {
        let title = format!("Chapter Heading {page}");
        doc.push_run(page, &title, 50.0, 30.0, 20.0);
        for i in 0..4 {
            doc.push_run(
                page,
                "ordinary paragraph text continues along",
                50.0,
                70.0 + 20.0 * i as f32,
                10.0,
            );
        }
    }

    let sections = infer_structure(&doc, &DetectOptions::default()).await;
    assert_eq!(sections.len(), 3);
    assert!(sections.iter().all(|s| s.source == SectionSource::Heading));
    assert_eq!(sections[0].title, "Chapter Heading 1");
    assert_eq!(sections[2].page, 3);
}

#[tokio::test]
async fn newer_load_supersedes_older_pass() {
    let doc = doc_with_text_toc();
    let session = StructureSession::new();
    let opts = DetectOptions::default();

    let stale = session.begin();
    let current = session.begin();

    let stale_result = infer_structure_with_token(&doc, &opts, &stale).await;
    assert!(stale_result.is_none(), "superseded pass must not publish");

    let fresh_result = infer_structure_with_token(&doc, &opts, &current).await;
    assert!(fresh_result.is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn sections_serialize_with_snake_case_source() {
    let doc = doc_with_text_toc();
    let sections = infer_structure(&doc, &DetectOptions::default()).await;
    let value = serde_json::to_value(&sections[0]).unwrap();

    assert_eq!(value["source"], "toc_text");
    assert!(value["id"].as_str().unwrap().starts_with("sec_"));
    assert!(value["page"].as_u64().unwrap() >= 1);
    assert!(value.get("anchor_y").is_some());
}
