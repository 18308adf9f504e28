//! Structure inference for paginated documents.
//!
//! Given a [`provider::PageProvider`] exposing positioned text runs,
//! optional link annotations and an optional native outline, the engine
//! derives an ordered list of navigable [`section::Section`]s: titles
//! mapped to physical page numbers and in-page anchors, suitable for a
//! table-of-contents navigator.
//!
//! No single reliable source of structure exists, so the engine tries
//! strategies in decreasing order of trust: the native outline, hyperlink
//! annotations on visual TOC pages, the printed TOC text itself (with a
//! content-matched printed-to-physical page offset), font-height heading
//! outliers, and finally one section per page. The first strategy that
//! produces anything wins.
//!
//! ```no_run
//! # async fn demo(provider: impl tocmap::PageProvider) {
//! use tocmap::{DetectOptions, infer_structure};
//!
//! let sections = infer_structure(&provider, &DetectOptions::default()).await;
//! for s in &sections {
//!     println!("{} -> page {}", s.title, s.page);
//! }
//! # }
//! ```

pub mod engine;
pub mod geometry;
pub mod provider;
pub mod section;
pub mod session;
pub mod structure;

pub use engine::{infer_structure, infer_structure_with_token};
pub use provider::{Destination, LinkAnnotation, OutlineNode, PageProvider, TextRun};
pub use section::{Section, SectionIdGen, SectionSource};
pub use session::{PassToken, StructureSession};
pub use structure::DetectOptions;
