//! Synthetic notice PDFs built with lopdf.

#![allow(dead_code)]

use image::{GrayImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// How page text is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FontKind {
    /// Type1 Helvetica, one byte per character
    #[default]
    Simple,
    /// Type0 font with `Identity-H` encoding and a `/ToUnicode` map, the
    /// way Typst writes its fonts
    Composite,
}

/// How the QR image is stored in the page resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QrStyle {
    /// Flate-compressed 8-bit grey samples
    #[default]
    Samples,
    /// `DCTDecode` JPEG stream
    Jpeg,
    /// Grey samples wrapped in a Form XObject
    InForm,
}

/// Description of one synthetic notice.
#[derive(Debug, Clone, Default)]
pub struct NoticeFixture {
    /// Text lines per page
    pub pages: Vec<Vec<String>>,
    /// Link annotation targets, all placed on page 1
    pub links: Vec<String>,
    /// QR payload rendered as an image on page 1
    pub qr_payload: Option<String>,
    pub font: FontKind,
    pub qr_style: QrStyle,
}

impl NoticeFixture {
    /// Well-formed two-page notice for `client_id`
    pub fn notice(client_id: &str) -> Self {
        Self {
            pages: vec![
                vec![
                    "Dear parent or guardian,".to_string(),
                    format!("Client ID: {client_id}"),
                    "MEASURE_CONTACT_HEIGHT:72".to_string(),
                    "MARK_END_SIGNATURE_BLOCK".to_string(),
                ],
                vec!["Immunization record".to_string()],
            ],
            ..Default::default()
        }
    }

    pub fn with_extra_page(mut self) -> Self {
        self.pages.push(vec!["Overflow page".to_string()]);
        self
    }

    pub fn with_qr_link(mut self, payload: &str, link: &str) -> Self {
        self.qr_payload = Some(payload.to_string());
        self.links.push(link.to_string());
        self
    }

    pub fn with_font(mut self, font: FontKind) -> Self {
        self.font = font;
        self
    }

    pub fn with_qr_style(mut self, style: QrStyle) -> Self {
        self.qr_style = style;
        self
    }

    /// Move the end-of-signature marker from page 1 to page 2
    pub fn with_signature_overflow(mut self) -> Self {
        let marker = "MARK_END_SIGNATURE_BLOCK";
        self.pages[0].retain(|line| line != marker);
        self.pages[1].insert(0, marker.to_string());
        self
    }

    /// Replace the contact block height measurement (points)
    pub fn with_contact_height(mut self, points: f64) -> Self {
        for line in self.pages[0].iter_mut() {
            if line.starts_with("MEASURE_CONTACT_HEIGHT:") {
                *line = format!("MEASURE_CONTACT_HEIGHT:{points}");
            }
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = match self.font {
            FontKind::Simple => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
            }),
            FontKind::Composite => composite_font(&mut doc),
        };

        let qr_image = self
            .qr_payload
            .as_deref()
            .map(|payload| qr_xobject(&mut doc, payload, self.qr_style));

        let mut page_ids = Vec::new();
        for (index, lines) in self.pages.iter().enumerate() {
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, text_content(lines, self.font)));
            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            };
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
            };
            if index == 0 {
                if let Some(image_id) = qr_image {
                    resources.set("XObject", dictionary! { "Qr1" => image_id });
                }
                let annotations: Vec<Object> = self
                    .links
                    .iter()
                    .map(|url| {
                        Object::Dictionary(dictionary! {
                            "Type" => "Annot",
                            "Subtype" => "Link",
                            "Rect" => vec![400.into(), 600.into(), 520.into(), 720.into()],
                            "A" => dictionary! {
                                "S" => "URI",
                                "URI" => Object::string_literal(url.as_str()),
                            },
                        })
                    })
                    .collect();
                if !annotations.is_empty() {
                    page.set("Annots", annotations);
                }
            }
            page.set("Resources", resources);
            page_ids.push(doc.add_object(page));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    pub fn write(&self, dir: &Path, filename: &str) -> PathBuf {
        let path = dir.join(filename);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

fn text_content(lines: &[String], font: FontKind) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
        operations.push(Operation::new(
            "Td",
            vec![72.into(), (720 - 14 * i as i64).into()],
        ));
        let shown = match font {
            FontKind::Simple => Object::String(line.as_bytes().to_vec(), StringFormat::Literal),
            // Glyph ids equal to the character codes, two bytes each
            FontKind::Composite => Object::String(
                line.bytes().flat_map(|b| [0, b]).collect(),
                StringFormat::Hexadecimal,
            ),
        };
        operations.push(Operation::new("Tj", vec![shown]));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }.encode().unwrap()
}

const TO_UNICODE_CMAP: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0020> <007E> <0020>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Type0 font over a CIDFontType2 descendant, printable ASCII mapped
/// through `/ToUnicode`
fn composite_font(doc: &mut Document) -> ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => "NoticeSans",
        "Flags" => 32,
        "FontBBox" => vec![0.into(), (-200).into(), 1000.into(), 900.into()],
        "ItalicAngle" => 0,
        "Ascent" => 900,
        "Descent" => -200,
        "CapHeight" => 700,
        "StemV" => 80,
    });
    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "NoticeSans",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 500,
        "CIDToGIDMap" => "Identity",
    });
    let to_unicode_id = doc.add_object(Stream::new(
        dictionary! {},
        TO_UNICODE_CMAP.as_bytes().to_vec(),
    ));
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "NoticeSans",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![descendant_id.into()],
        "ToUnicode" => to_unicode_id,
    })
}

/// QR image for `payload`, stored the way `style` asks
fn qr_xobject(doc: &mut Document, payload: &str, style: QrStyle) -> ObjectId {
    let (size, pixels) = qr_pixels(payload);
    let image_dict = |filter: Option<&str>| {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => size as i64,
            "Height" => size as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        if let Some(filter) = filter {
            dict.set("Filter", filter);
        }
        dict
    };

    match style {
        QrStyle::Samples => {
            let mut stream = Stream::new(image_dict(None), pixels);
            stream.compress().unwrap();
            doc.add_object(stream)
        }
        QrStyle::Jpeg => {
            let image = GrayImage::from_raw(size as u32, size as u32, pixels).unwrap();
            let mut jpeg = Cursor::new(Vec::new());
            image.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();
            doc.add_object(Stream::new(image_dict(Some("DCTDecode")), jpeg.into_inner()))
        }
        QrStyle::InForm => {
            let image_id = doc.add_object(Stream::new(image_dict(None), pixels));
            let draw = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![120.into(), 0.into(), 0.into(), 120.into(), 0.into(), 0.into()],
                    ),
                    Operation::new("Do", vec!["Qr1".into()]),
                    Operation::new("Q", vec![]),
                ],
            };
            doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 120.into(), 120.into()],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Qr1" => image_id },
                    },
                },
                draw.encode().unwrap(),
            ))
        }
    }
}

/// QR code as 8-bit grey samples: 10px modules, 4-module quiet zone
pub fn qr_pixels(payload: &str) -> (usize, Vec<u8>) {
    let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width();
    let colors = code.to_colors();
    let (scale, border) = (10, 4);
    let size = (modules + 2 * border) * scale;

    let mut pixels = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let dark = match ((x / scale).checked_sub(border), (y / scale).checked_sub(border)) {
                (Some(mx), Some(my)) if mx < modules && my < modules => {
                    colors[my * modules + mx] == qrcode::Color::Dark
                }
                _ => false,
            };
            pixels.push(if dark { 0 } else { 255 });
        }
    }
    (size, pixels)
}
