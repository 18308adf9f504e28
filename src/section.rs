use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which strategy produced a [`Section`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionSource {
    Outline,
    TocLink,
    TocText,
    Heading,
    #[default]
    PageFallback,
}

/// A navigable section of a document. `page` is the 1-based physical page
/// index; `anchor_y` is `None` when the strategy could not recover an
/// in-page position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// Heading depth, clamped to 1..=3.
    pub level: u8,
    pub page: u32,
    pub anchor_x: f32,
    pub anchor_y: Option<f32>,
    /// Opaque explicit jump target, when the source carried one.
    pub destination: Option<String>,
    pub source: SectionSource,
}

impl Section {
    /// Key used for sequential deduplication.
    pub(crate) fn dedupe_key(&self) -> String {
        let prefix: String = self.title.chars().take(120).collect();
        format!("{}|{}", self.page, prefix)
    }
}

/// Deterministic id source for one inference pass. Ids only need to be
/// unique within a pass; they carry no identity across document reloads.
#[derive(Debug)]
pub struct SectionIdGen {
    prefix: &'static str,
    next: u64,
}

impl SectionIdGen {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 0 }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{}_{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

impl Default for SectionIdGen {
    fn default() -> Self {
        Self::new("sec")
    }
}
