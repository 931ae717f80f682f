//! lopdf-backed extractor
//!
//! Reads per-page text, image XObjects and link annotation targets. Text
//! comes from pdf-extract, which decodes composite (`Type0`/`Identity-H`)
//! fonts through their `/ToUnicode` maps. Images and link targets are read
//! with lopdf; link targets come from `/Annots` dictionaries, never from
//! visible text.

use super::raster::{EmbeddedImage, ImageEncoding};
use super::{DocumentExtractor, ExtractedDocument};
use crate::error::{Result, ValidatorError};
use crate::types::PageText;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::debug;

/// Form XObjects can nest; stop following them past this depth
const MAX_XOBJECT_DEPTH: usize = 4;

/// Parent chain limit when looking up inherited page resources
const MAX_PAGE_TREE_DEPTH: usize = 32;

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentExtractor for LopdfExtractor {
    fn extract_bytes(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedDocument> {
        let doc = Document::load_mem(bytes).map_err(|e| ValidatorError::extraction(path, e))?;
        let pages = doc.get_pages();

        let texts = page_texts(path, bytes)?;
        if texts.len() != pages.len() {
            return Err(ValidatorError::extraction(
                path,
                format!("text found for {} of {} pages", texts.len(), pages.len()),
            ));
        }

        let mut images = Vec::new();
        let mut link_urls: Vec<String> = Vec::new();

        for (number, page_id) in pages {
            if let Some(resources) = page_resources(&doc, page_id) {
                collect_images(&doc, resources, number as usize, 0, &mut images);
            }

            for url in page_link_urls(&doc, page_id) {
                if !link_urls.contains(&url) {
                    link_urls.push(url);
                }
            }
        }

        debug!(
            "📄 {}: {} pages, {} images, {} links",
            path.display(),
            texts.len(),
            images.len(),
            link_urls.len()
        );

        Ok(ExtractedDocument {
            page_text: PageText::new(texts),
            images,
            link_urls,
        })
    }

    fn name(&self) -> &str {
        "LopdfExtractor"
    }
}

/// Text of every page, in page order
fn page_texts(path: &Path, bytes: &[u8]) -> Result<Vec<String>> {
    // pdf-extract panics on some malformed font programs
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(texts)) => Ok(texts),
        Ok(Err(e)) => Err(ValidatorError::extraction(path, format!("text extraction: {e}"))),
        Err(_) => Err(ValidatorError::extraction(path, "text extraction panicked")),
    }
}

/// Follow a reference to its object; direct objects are returned as-is
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

fn name_of<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

fn integer_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?)? {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        _ => None,
    }
}

/// `/Resources` of a page, inherited from the page tree when absent
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Some(resources) = node.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
            return Some(resources);
        }
        node = resolve_dict(doc, node.get(b"Parent").ok()?)?;
    }
    None
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    page: usize,
    depth: usize,
    images: &mut Vec<EmbeddedImage>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve_dict(doc, x))
    else {
        return;
    };

    for (_, entry) in xobjects.iter() {
        let Some(Object::Stream(stream)) = resolve(doc, entry) else {
            continue;
        };
        match name_of(doc, &stream.dict, b"Subtype") {
            Some(b"Image") => {
                if let Some(image) = read_image(doc, stream, page) {
                    images.push(image);
                }
            }
            Some(b"Form") if depth < MAX_XOBJECT_DEPTH => {
                if let Some(inner) = stream.dict.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
                    collect_images(doc, inner, page, depth + 1, images);
                }
            }
            _ => {}
        }
    }
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| resolve(doc, f)) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match resolve(doc, item)? {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_image_mask(doc: &Document, dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"ImageMask").ok().and_then(|m| resolve(doc, m)),
        Some(Object::Boolean(true))
    )
}

/// Number of colour components and optional palette for an image's colour space
fn color_layout(doc: &Document, dict: &Dictionary) -> Option<(u8, Option<(u8, Vec<u8>)>)> {
    if is_image_mask(doc, dict) {
        return Some((1, None));
    }
    let space = resolve(doc, dict.get(b"ColorSpace").ok()?)?;
    color_space_components(doc, space).map(|c| (c, None)).or_else(|| {
        // [/Indexed base hival lookup]
        let Object::Array(parts) = space else {
            return None;
        };
        if !matches!(parts.first(), Some(Object::Name(n)) if n.as_slice() == b"Indexed") {
            return None;
        }
        let base = color_space_components(doc, resolve(doc, parts.get(1)?)?)?;
        let lookup = match resolve(doc, parts.get(3)?)? {
            Object::String(bytes, _) => bytes.clone(),
            Object::Stream(stream) => stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
            _ => return None,
        };
        Some((1, Some((base, lookup))))
    })
}

fn color_space_components(doc: &Document, space: &Object) -> Option<u8> {
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        Object::Array(parts) => match parts.first()? {
            Object::Name(kind) if kind.as_slice() == b"ICCBased" => {
                let profile = resolve_dict(doc, parts.get(1)?)?;
                integer_of(doc, profile, b"N").map(|n| n as u8)
            }
            Object::Name(kind) if kind.as_slice() == b"CalGray" => Some(1),
            Object::Name(kind) if kind.as_slice() == b"CalRGB" => Some(3),
            _ => None,
        },
        _ => None,
    }
}

fn read_image(doc: &Document, stream: &Stream, page: usize) -> Option<EmbeddedImage> {
    let dict = &stream.dict;
    let width = u32::try_from(integer_of(doc, dict, b"Width")?).ok()?;
    let height = u32::try_from(integer_of(doc, dict, b"Height")?).ok()?;
    let filters = filter_names(doc, dict);
    let bits_per_component = if is_image_mask(doc, dict) {
        1
    } else {
        integer_of(doc, dict, b"BitsPerComponent").unwrap_or(8) as u8
    };

    let encoding = if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        ImageEncoding::Jpeg(stream.content.clone())
    } else if let Some(other) = filters
        .iter()
        .find(|f| !matches!(f.as_slice(), b"FlateDecode" | b"LZWDecode"))
    {
        ImageEncoding::Unsupported(String::from_utf8_lossy(other).into_owned())
    } else {
        match color_layout(doc, dict) {
            None => ImageEncoding::Unsupported("colour space".to_string()),
            Some((components, palette)) if filters.is_empty() => ImageEncoding::Samples {
                components,
                bits_per_component,
                data: stream.content.clone(),
                palette,
            },
            Some((components, palette)) => ImageEncoding::Filtered {
                components,
                bits_per_component,
                stream: codec_stream(doc, stream),
                palette,
            },
        }
    };

    Some(EmbeddedImage {
        page,
        width,
        height,
        encoding,
    })
}

/// Raw image bytes with only the keys lopdf needs to decompress them.
///
/// lopdf refuses to decompress streams whose dictionary says `/Subtype /Image`.
fn codec_stream(doc: &Document, stream: &Stream) -> Stream {
    let mut codec = Dictionary::new();
    for key in [&b"Filter"[..], &b"DecodeParms"[..]] {
        if let Some(value) = stream.dict.get(key).ok().and_then(|v| resolve(doc, v)) {
            codec.set(key, value.clone());
        }
    }
    Stream::new(codec, stream.content.clone())
}

/// `/URI` targets of the `/Link` annotations on a page
fn page_link_urls(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(Object::Array(annotations)) = page.get(b"Annots").ok().and_then(|a| resolve(doc, a))
    else {
        return Vec::new();
    };

    annotations
        .iter()
        .filter_map(|annotation| {
            let annotation = resolve_dict(doc, annotation)?;
            if name_of(doc, annotation, b"Subtype")? != b"Link" {
                return None;
            }
            let action = resolve_dict(doc, annotation.get(b"A").ok()?)?;
            if name_of(doc, action, b"S")? != b"URI" {
                return None;
            }
            match resolve(doc, action.get(b"URI").ok()?)? {
                Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            }
        })
        .collect()
}
