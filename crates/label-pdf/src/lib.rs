//! PDF output for label sheets
//!
//! [`PdfSurface`] implements the engine's drawing surface on top of lopdf.
//! Standard fonts are referenced by name with built-in metrics; the `cjk`
//! font role is embedded from its TrueType file when one can be found.

pub mod error;
pub mod metrics;
pub mod surface;
pub mod truetype;

pub use error::PdfError;
pub use surface::PdfSurface;
pub use truetype::{resolve_font_path, EmbeddedFont};

use label_core::{render_labels, FontRole, LabelConfig, LabelError, Record, RenderSummary};
use std::fs;
use std::path::Path;

/// A rendered label sheet
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub summary: RenderSummary,
}

/// Surface with the configured CJK font registered when it can be loaded.
///
/// A missing or unreadable font file is not an error: the engine falls back
/// to the body font and says so.
pub fn prepare_surface(config: &LabelConfig, config_dir: Option<&Path>) -> PdfSurface {
    let mut surface = PdfSurface::new();
    if !config.has_cjk_font() {
        return surface;
    }

    let cjk = config.font(FontRole::Cjk);
    let Some(file) = cjk.file.as_deref().filter(|f| !f.trim().is_empty()) else {
        tracing::debug!("CJK font '{}' has no file to embed", cjk.name);
        return surface;
    };

    match resolve_font_path(file, config_dir) {
        Some(path) => match EmbeddedFont::load(&cjk.name, &path) {
            Ok(font) => {
                tracing::info!("Embedding CJK font '{}' from {}", cjk.name, path.display());
                surface.register_font(font);
            }
            Err(e) => tracing::warn!("Could not embed CJK font: {}", e),
        },
        None => tracing::warn!("CJK font file '{}' not found", file),
    }
    surface
}

/// Lay out `records` and serialize the PDF
pub fn render_label_pdf(
    records: &[Record],
    config: &LabelConfig,
    config_dir: Option<&Path>,
) -> Result<RenderedPdf, LabelError> {
    let mut surface = prepare_surface(config, config_dir);
    let summary = render_labels(records, config, &mut surface)?;
    let mut doc = surface.finish()?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfError::Write(e.to_string()))?;
    Ok(RenderedPdf { bytes, summary })
}

/// Render and write the PDF to `output`, creating its directory if needed
pub fn write_label_pdf(
    records: &[Record],
    config: &LabelConfig,
    config_dir: Option<&Path>,
    output: &Path,
) -> Result<RenderSummary, LabelError> {
    let rendered = render_label_pdf(records, config, config_dir)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| LabelError::OutputWrite(format!("{}: {}", parent.display(), e)))?;
    }
    fs::write(output, &rendered.bytes)
        .map_err(|e| LabelError::OutputWrite(format!("{}: {}", output.display(), e)))?;
    tracing::info!(
        "Wrote {} labels on {} pages to {}",
        rendered.summary.labels,
        rendered.summary.pages,
        output.display()
    );
    Ok(rendered.summary)
}
