use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// A positioned glyph run in page coordinates, origin top-left.
///
/// Hosts whose native page origin is bottom-left must flip coordinates with
/// [`flip_y`] / [`flip_rect_y`] before handing runs to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub height: f32,
}

/// A hyperlink annotation on a page, rect in the same top-left coordinate
/// space as the text runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkAnnotation {
    pub rect: Rect<f32>,
    /// Opaque destination ref, resolved through [`PageProvider::resolve_destination`].
    pub dest: Option<String>,
    /// Raw uri; a `#page=N` fragment is understood as an internal target.
    pub uri: Option<String>,
}

/// A resolved jump target. `page` is 1-based physical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Destination {
    pub page: u32,
    pub x: f32,
    pub y: Option<f32>,
}

/// One node of a native outline (bookmark) tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    pub dest: Option<String>,
    pub children: Vec<OutlineNode>,
}

/// Capability the host supplies to the engine. Every async method is a
/// suspension point; per-call failures are skipped by the engine, never
/// surfaced to its caller.
pub trait PageProvider {
    /// Total number of pages in the document.
    fn page_count(&self) -> u32;

    /// Positioned text runs for a 1-based page number.
    fn text_runs(&self, page: u32) -> impl Future<Output = Result<Vec<TextRun>>> + Send;

    /// Link annotations for a 1-based page number.
    fn annotations(&self, page: u32) -> impl Future<Output = Result<Vec<LinkAnnotation>>> + Send;

    /// Resolve an opaque destination ref to a physical location, if possible.
    fn resolve_destination(
        &self,
        dest: &str,
    ) -> impl Future<Output = Result<Option<Destination>>> + Send;

    /// The native outline tree, if the document carries one.
    fn outline(&self) -> impl Future<Output = Result<Option<Vec<OutlineNode>>>> + Send;
}

/// Flips a y coordinate from a bottom-left origin into the engine's
/// top-left space.
pub fn flip_y(page_height: f32, y: f32) -> f32 {
    page_height - y
}

/// Flips a bottom-left-origin rectangle into top-left space, keeping
/// `x0` the top-left corner.
pub fn flip_rect_y(page_height: f32, rect: Rect<f32>) -> Rect<f32> {
    let mut out = rect;
    out.x0.y = page_height - rect.x1.y;
    out.x1.y = page_height - rect.x0.y;
    out
}
