//! Standard 14 font names and advance widths
//!
//! Widths are in 1/1000 em for the printable ASCII range. Times has no table
//! of its own and is measured as Helvetica.

/// Width used for Latin-1 characters outside printable ASCII
const LATIN1_FALLBACK_WIDTH: u16 = 556;

/// Width ratio for fonts with no metrics at all
pub const DEFAULT_CHAR_WIDTH_RATIO: f32 = 0.5;

pub const STANDARD_FONTS: [&str; 14] = [
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Map an arbitrary font name to one of the standard 14 fonts
pub fn map_to_standard_font(name: &str) -> &'static str {
    if let Some(exact) = STANDARD_FONTS
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(name))
    {
        return exact;
    }

    let lower = name.to_lowercase();
    let bold = lower.contains("bold");
    let italic = lower.contains("italic") || lower.contains("oblique");

    match lower.as_str() {
        "serif" => return "Times-Roman",
        "sans-serif" => return "Helvetica",
        "monospace" => return "Courier",
        _ => {}
    }

    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return match (bold, italic) {
            (true, true) => "Times-BoldItalic",
            (true, false) => "Times-Bold",
            (false, true) => "Times-Italic",
            (false, false) => "Times-Roman",
        };
    }

    if lower.contains("courier") || lower.contains("mono") || lower.contains("consolas") {
        return match (bold, italic) {
            (true, true) => "Courier-BoldOblique",
            (true, false) => "Courier-Bold",
            (false, true) => "Courier-Oblique",
            (false, false) => "Courier",
        };
    }

    match (bold, italic) {
        (true, true) => "Helvetica-BoldOblique",
        (true, false) => "Helvetica-Bold",
        (false, true) => "Helvetica-Oblique",
        (false, false) => "Helvetica",
    }
}

pub fn is_standard_font(name: &str) -> bool {
    STANDARD_FONTS.contains(&name)
}

/// Advance width of one character in 1/1000 em
fn char_width(base: &str, c: char) -> u16 {
    if base.starts_with("Courier") {
        return 600;
    }
    let bold = base.contains("Bold");
    match c as u32 {
        code @ 32..=126 => {
            let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
            table[(code - 32) as usize]
        }
        _ => LATIN1_FALLBACK_WIDTH,
    }
}

/// Width in points of `text` set in the standard font `base`
pub fn string_width(base: &str, text: &str, size: f32) -> f32 {
    if base == "Symbol" || base == "ZapfDingbats" {
        return text.chars().count() as f32 * size * DEFAULT_CHAR_WIDTH_RATIO;
    }
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|b| char_width(base, b as char) as u32)
        .sum();
    units as f32 * size / 1000.0
}

/// Single-byte text for standard fonts; characters outside Latin-1 become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}
