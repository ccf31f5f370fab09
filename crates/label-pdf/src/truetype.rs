//! TrueType embedding for CJK text
//!
//! The font is embedded whole as a Type0 font with a CIDFontType2 descendant,
//! Identity-H encoding and an identity CID-to-GID map, so the content stream
//! carries glyph ids directly. A ToUnicode map keeps the text extractable.

use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::PdfError;

/// A parsed TrueType font plus the glyphs used so far
pub struct EmbeddedFont {
    name: String,
    data: Vec<u8>,
    units_per_em: f32,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// char -> (glyph id, advance in font units)
    glyphs: HashMap<char, (u16, u16)>,
    used: BTreeMap<u16, (char, u16)>,
}

impl EmbeddedFont {
    pub fn load(name: &str, path: &Path) -> Result<Self, PdfError> {
        let data = fs::read(path)
            .map_err(|e| PdfError::FontLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(name, data)
    }

    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self, PdfError> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| PdfError::FontLoad(format!("{}: {}", name, e)))?;
        let bbox = face.global_bounding_box();
        let units_per_em = face.units_per_em() as f32;
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);

        Ok(Self {
            name: name.to_string(),
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            glyphs: HashMap::new(),
            used: BTreeMap::new(),
            data,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn glyph(&mut self, c: char) -> (u16, u16) {
        if let Some(glyph) = self.glyphs.get(&c) {
            return *glyph;
        }
        // Only reached on a cache miss, so the face is parsed once per new char
        let glyph = ttf_parser::Face::parse(&self.data, 0)
            .ok()
            .and_then(|face| {
                let id = face.glyph_index(c)?;
                Some((id.0, face.glyph_hor_advance(id).unwrap_or(0)))
            })
            .unwrap_or((0, 0));
        self.glyphs.insert(c, glyph);
        glyph
    }

    pub fn string_width(&mut self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.glyph(c).1 as u32).sum();
        units as f32 * size / self.units_per_em
    }

    /// Two-byte glyph ids for a text operand; records glyphs for embedding
    pub fn encode(&mut self, text: &str) -> Object {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let (gid, advance) = self.glyph(c);
            self.used.entry(gid).or_insert((c, advance));
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    fn scale(&self, units: i32) -> i64 {
        (units as f32 * 1000.0 / self.units_per_em).round() as i64
    }

    /// Write the font objects and return the Type0 font dictionary id
    pub fn write(&self, doc: &mut Document) -> ObjectId {
        let base_font = Object::Name(self.name.replace(' ', "").into_bytes());

        let font_file = Stream::new(
            dictionary! { "Length1" => self.data.len() as i64 },
            self.data.clone(),
        );
        let font_file_id = doc.add_object(font_file);

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => 4,
            "FontBBox" => self.bbox.iter().map(|v| Object::Integer(self.scale(*v as i32))).collect::<Vec<_>>(),
            "ItalicAngle" => 0,
            "Ascent" => self.scale(self.ascender as i32),
            "Descent" => self.scale(self.descender as i32),
            "CapHeight" => self.scale(self.cap_height as i32),
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for (gid, (_, advance)) in &self.used {
            widths.push(Object::Integer(*gid as i64));
            widths.push(Object::Array(vec![Object::Integer(
                self.scale(*advance as i32),
            )]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            self.to_unicode_cmap().into_bytes(),
        ));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        })
    }

    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );

        let entries: Vec<(u16, char)> = self
            .used
            .iter()
            .filter(|(gid, _)| **gid != 0)
            .map(|(gid, (c, _))| (*gid, *c))
            .collect();
        // bfchar sections are limited to 100 entries each
        for chunk in entries.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (gid, c) in chunk {
                let mut units = [0u16; 2];
                let hex: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{:04X}", u))
                    .collect();
                cmap.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }
}

/// Find the font file for the `cjk` role.
///
/// Absolute paths are used as given; relative paths are tried against the
/// configuration directory first and the working directory second.
pub fn resolve_font_path(file: &str, config_dir: Option<&Path>) -> Option<std::path::PathBuf> {
    let path = Path::new(file);
    if path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }
    config_dir
        .map(|dir| dir.join(path))
        .into_iter()
        .chain(std::iter::once(path.to_path_buf()))
        .find(|candidate| candidate.exists())
}
