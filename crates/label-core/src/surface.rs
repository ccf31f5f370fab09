//! Drawing surface abstraction
//!
//! Coordinates are PDF points with the origin at the bottom-left of the page.

use crate::config::Rgb;

/// Minimal drawing target for label sheets
pub trait Surface {
    /// Start a new page. Called once before the first label and once per
    /// page break.
    fn begin_page(&mut self, width: f32, height: f32);

    /// Whether `font` can be drawn with its own glyphs
    fn has_font(&self, font: &str) -> bool;

    /// Advance width of `text` in points
    fn string_width(&mut self, text: &str, font: &str, size: f32) -> f32;

    fn draw_text(&mut self, x: f32, y: f32, text: &str, font: &str, size: f32, color: Rgb);

    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb);

    /// Stroke a rectangle whose bottom-left corner is (`x`, `y`)
    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32, color: Rgb);
}
