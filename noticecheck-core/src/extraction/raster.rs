//! Embedded raster images and their conversion to greyscale
//!
//! PDF image XObjects carry pixel data either as JPEG (`DCTDecode`) or as
//! plain samples, possibly behind a `FlateDecode`/`LZWDecode` filter. Code
//! decoders only need an 8-bit luma plane, so everything is reduced to
//! `GrayImage`. Filtered samples stay compressed until `to_luma` is called,
//! which only happens for images inside the code size band.

use image::{GrayImage, ImageFormat};
use lopdf::Stream;

/// How an image's pixel data is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageEncoding {
    /// Uncompressed samples, row-major, rows padded to whole bytes
    Samples {
        components: u8,
        bits_per_component: u8,
        data: Vec<u8>,
        /// `(base components, lookup table)` for `/Indexed` colour spaces
        palette: Option<(u8, Vec<u8>)>,
    },
    /// Samples behind a stream filter, decompressed on demand. `stream`
    /// only carries `/Filter` and `/DecodeParms` next to the raw bytes.
    Filtered {
        components: u8,
        bits_per_component: u8,
        stream: Stream,
        palette: Option<(u8, Vec<u8>)>,
    },
    /// A complete JPEG stream
    Jpeg(Vec<u8>),
    /// Anything else (JBIG2, JPX, CCITT, ...), kept only for diagnostics
    Unsupported(String),
}

/// One image XObject found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    /// 1-based page the image is drawn on
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
}

impl EmbeddedImage {
    /// 8-bit greyscale image built from 8-bit grey samples
    pub fn from_luma(page: usize, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            page,
            width,
            height,
            encoding: ImageEncoding::Samples {
                components: 1,
                bits_per_component: 8,
                data,
                palette: None,
            },
        }
    }

    /// Whether the image is roughly square and within `tolerance` of `expected` pixels
    pub fn is_code_candidate(&self, expected: u32, tolerance: u32) -> bool {
        self.width.abs_diff(self.height) <= tolerance
            && self.width.abs_diff(expected) <= tolerance
            && self.height.abs_diff(expected) <= tolerance
    }

    /// Convert to an 8-bit luma plane, or `None` if the data can't be interpreted
    pub fn to_luma(&self) -> Option<GrayImage> {
        match &self.encoding {
            ImageEncoding::Jpeg(bytes) => image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
                .ok()
                .map(|img| img.to_luma8()),
            ImageEncoding::Samples {
                components,
                bits_per_component,
                data,
                palette,
            } => samples_to_luma(
                self.width,
                self.height,
                *components,
                *bits_per_component,
                data,
                palette.as_ref(),
            ),
            ImageEncoding::Filtered {
                components,
                bits_per_component,
                stream,
                palette,
            } => {
                let data = stream.decompressed_content().ok()?;
                samples_to_luma(
                    self.width,
                    self.height,
                    *components,
                    *bits_per_component,
                    &data,
                    palette.as_ref(),
                )
            }
            ImageEncoding::Unsupported(_) => None,
        }
    }

    /// Whether the pixel data is still compressed
    pub fn is_filtered(&self) -> bool {
        matches!(self.encoding, ImageEncoding::Filtered { .. })
    }
}

fn samples_to_luma(
    width: u32,
    height: u32,
    components: u8,
    bits: u8,
    data: &[u8],
    palette: Option<&(u8, Vec<u8>)>,
) -> Option<GrayImage> {
    if !matches!(bits, 1 | 2 | 4 | 8) || components == 0 || width == 0 || height == 0 {
        return None;
    }
    let (w, h) = (width as usize, height as usize);
    let row_bytes = (w * components as usize * bits as usize).div_ceil(8);
    if data.len() < row_bytes * h {
        return None;
    }

    let max_sample = (1u32 << bits) - 1;
    let mut luma = Vec::with_capacity(w * h);
    let mut pixel = Vec::with_capacity(components as usize);

    for row in data.chunks(row_bytes).take(h) {
        for x in 0..w {
            pixel.clear();
            for c in 0..components as usize {
                let index = x * components as usize + c;
                pixel.push(read_sample(row, index, bits));
            }
            let value = match palette {
                Some((base, table)) => {
                    let entry = pixel[0] as usize * *base as usize;
                    let color = table.get(entry..entry + *base as usize)?;
                    to_gray(color)
                }
                None if bits == 8 => to_gray(&pixel),
                None => {
                    let scaled: Vec<u8> = pixel
                        .iter()
                        .map(|s| (*s as u32 * 255 / max_sample) as u8)
                        .collect();
                    to_gray(&scaled)
                }
            };
            luma.push(value);
        }
    }

    GrayImage::from_raw(width, height, luma)
}

fn read_sample(row: &[u8], index: usize, bits: u8) -> u8 {
    if bits == 8 {
        return row[index];
    }
    let bit_offset = index * bits as usize;
    let byte = row[bit_offset / 8];
    let shift = 8 - bits as usize - (bit_offset % 8);
    (byte >> shift) & ((1u8 << bits) - 1)
}

fn to_gray(color: &[u8]) -> u8 {
    match color {
        [g] => *g,
        [r, g, b] => ((*r as u32 * 299 + *g as u32 * 587 + *b as u32 * 114) / 1000) as u8,
        [c, m, y, k] => {
            let r = (255 - *c as u32) * (255 - *k as u32) / 255;
            let g = (255 - *m as u32) * (255 - *k as u32) / 255;
            let b = (255 - *y as u32) * (255 - *k as u32) / 255;
            ((r * 299 + g * 587 + b * 114) / 1000) as u8
        }
        other => other.first().copied().unwrap_or(255),
    }
}
