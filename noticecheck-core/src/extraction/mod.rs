//! Document extraction
//!
//! This module defines the boundary between the compiled document on disk
//! and the format-agnostic evidence the validators work with.
//!
//! ```text
//! Compiled PDF
//!     ↓
//! [DocumentExtractor backend]
//!     ↓
//! ExtractedDocument (page text, embedded images, link targets)
//!     ↓
//! [markers → measurements → codes → rules]
//! ```
//!
//! ## Available Extractors
//!
//! - `LopdfExtractor` - pure Rust PDF parsing via lopdf

pub mod pdf;
pub mod raster;

use crate::error::Result;
use crate::types::PageText;
use std::path::Path;

pub use pdf::LopdfExtractor;
pub use raster::{EmbeddedImage, ImageEncoding};

/// Everything the validators need from one compiled document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub page_text: PageText,
    /// Raster images referenced from page resources, in page order
    pub images: Vec<EmbeddedImage>,
    /// URI targets of link annotations, in page then annotation order
    pub link_urls: Vec<String>,
}

/// Extractor trait - converts a compiled document into `ExtractedDocument`
///
/// Implementations acquire the file, read it fully and release it before
/// returning. Any failure is terminal for that document.
pub trait DocumentExtractor: Send + Sync {
    /// Extract evidence from an in-memory document
    fn extract_bytes(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument>;

    /// Convenience method: read the file and extract it
    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let bytes = std::fs::read(path)
            .map_err(|e| crate::error::ValidatorError::extraction(path, e))?;
        self.extract_bytes(path, &bytes)
    }

    /// Extractor name for logging
    fn name(&self) -> &str;
}
