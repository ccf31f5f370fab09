//! lopdf-backed drawing surface

use label_core::{Rgb, Surface};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;

use crate::error::PdfError;
use crate::metrics::{self, is_standard_font, map_to_standard_font};
use crate::truetype::EmbeddedFont;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FontKey {
    Standard(&'static str),
    Embedded(usize),
}

struct PageBuffer {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
}

/// Builds a PDF document page by page
pub struct PdfSurface {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
    current: Option<PageBuffer>,
    embedded: Vec<EmbeddedFont>,
    /// Resource name per font in use, e.g. `F1`
    font_resources: BTreeMap<FontKey, String>,
    error: Option<PdfError>,
}

impl Default for PdfSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfSurface {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let resources_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            resources_id,
            page_ids: Vec::new(),
            current: None,
            embedded: Vec::new(),
            font_resources: BTreeMap::new(),
            error: None,
        }
    }

    /// Make an embedded TrueType font available under its name
    pub fn register_font(&mut self, font: EmbeddedFont) {
        tracing::debug!("Registered embedded font '{}'", font.name());
        self.embedded.push(font);
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.current.is_some())
    }

    fn font_key(&self, name: &str) -> FontKey {
        match self.embedded.iter().position(|f| f.name() == name) {
            Some(index) => FontKey::Embedded(index),
            None => FontKey::Standard(map_to_standard_font(name)),
        }
    }

    fn resource_name(&mut self, key: FontKey) -> String {
        let next = self.font_resources.len() + 1;
        self.font_resources
            .entry(key)
            .or_insert_with(|| format!("F{}", next))
            .clone()
    }

    fn push(&mut self, operation: Operation) {
        match self.current.as_mut() {
            Some(page) => page.operations.push(operation),
            None => tracing::debug!("Drawing outside a page ignored: {}", operation.operator),
        }
    }

    fn flush_page(&mut self) {
        let Some(page) = self.current.take() else {
            return;
        };
        let content = Content {
            operations: page.operations,
        };
        let bytes = match content.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.error.get_or_insert(PdfError::Content(e.to_string()));
                Vec::new()
            }
        };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(page.width), Object::Real(page.height)],
            "Contents" => content_id,
            "Resources" => self.resources_id,
        });
        self.page_ids.push(page_id);
    }

    /// Close the last page and assemble the document
    pub fn finish(mut self) -> Result<Document, PdfError> {
        self.flush_page();
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let mut fonts = Dictionary::new();
        for (key, resource) in &self.font_resources {
            let font_id = match key {
                FontKey::Standard(base) => self.doc.add_object(standard_font_dict(base)),
                FontKey::Embedded(index) => self.embedded[*index].write(&mut self.doc),
            };
            fonts.set(resource.as_str(), Object::Reference(font_id));
        }
        self.doc.objects.insert(
            self.resources_id,
            Object::Dictionary(dictionary! { "Font" => fonts }),
        );

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.compress();
        Ok(self.doc)
    }
}

fn standard_font_dict(base: &str) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base.as_bytes().to_vec()),
    };
    // Symbol fonts use their built-in encoding
    if base != "Symbol" && base != "ZapfDingbats" {
        dict.set("Encoding", "WinAnsiEncoding");
    }
    dict
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![
        Object::Real(color.r),
        Object::Real(color.g),
        Object::Real(color.b),
    ]
}

impl Surface for PdfSurface {
    fn begin_page(&mut self, width: f32, height: f32) {
        self.flush_page();
        self.current = Some(PageBuffer {
            width,
            height,
            operations: Vec::new(),
        });
    }

    fn has_font(&self, font: &str) -> bool {
        is_standard_font(font) || self.embedded.iter().any(|f| f.name() == font)
    }

    fn string_width(&mut self, text: &str, font: &str, size: f32) -> f32 {
        match self.font_key(font) {
            FontKey::Standard(base) => metrics::string_width(base, text, size),
            FontKey::Embedded(index) => self.embedded[index].string_width(text, size),
        }
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, font: &str, size: f32, color: Rgb) {
        if text.is_empty() {
            return;
        }
        let key = self.font_key(font);
        let operand = match key {
            FontKey::Standard(_) => {
                Object::String(metrics::encode_win_ansi(text), StringFormat::Literal)
            }
            FontKey::Embedded(index) => self.embedded[index].encode(text),
        };
        let resource = self.resource_name(key);

        self.push(Operation::new("BT", vec![]));
        self.push(Operation::new(
            "Tf",
            vec![Object::Name(resource.into_bytes()), Object::Real(size)],
        ));
        self.push(Operation::new("rg", color_operands(color)));
        self.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
        self.push(Operation::new("Tj", vec![operand]));
        self.push(Operation::new("ET", vec![]));
    }

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb) {
        self.push(Operation::new("RG", color_operands(color)));
        self.push(Operation::new("w", vec![Object::Real(width)]));
        self.push(Operation::new("m", vec![Object::Real(from.0), Object::Real(from.1)]));
        self.push(Operation::new("l", vec![Object::Real(to.0), Object::Real(to.1)]));
        self.push(Operation::new("S", vec![]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32, color: Rgb) {
        self.push(Operation::new("RG", color_operands(color)));
        self.push(Operation::new("w", vec![Object::Real(line_width)]));
        self.push(Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(width),
                Object::Real(height),
            ],
        ));
        self.push(Operation::new("S", vec![]));
    }
}
