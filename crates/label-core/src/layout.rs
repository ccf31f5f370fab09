//! Sheet layout: grid geometry, placement and pagination

use crate::config::{LabelConfig, MM_TO_PT};
use crate::content::LabelPainter;
use crate::error::LabelError;
use crate::record::Record;
use crate::surface::Surface;

/// Hard cap on labels rendered in one run
pub const MAX_LABELS: usize = 9999;

/// Grid cell of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPlacement {
    pub page: usize,
    pub row: usize,
    pub column: usize,
}

/// Label rectangle in points; (`x`, `y`) is the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Page and grid geometry in points
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_left: f32,
    pub columns: usize,
    pub rows: usize,
    pub label_width: f32,
    pub label_height: f32,
    pub h_gap: f32,
    pub v_gap: f32,
}

impl PageGeometry {
    pub fn from_config(config: &LabelConfig) -> Result<Self, LabelError> {
        if config.columns == 0 || config.rows == 0 {
            return Err(LabelError::InvalidLayout(format!(
                "grid must have at least one row and column (got {} x {})",
                config.columns, config.rows
            )));
        }

        let (page_width, page_height) = config.page_dimensions();
        let columns = config.columns as usize;
        let rows = config.rows as usize;
        let margin_top = config.margin_top * MM_TO_PT;
        let margin_bottom = config.margin_bottom * MM_TO_PT;
        let margin_left = config.margin_left * MM_TO_PT;
        let margin_right = config.margin_right * MM_TO_PT;
        let label_width = config.label_width * MM_TO_PT;
        let label_height = config.label_height * MM_TO_PT;

        let h_gap = gap(
            page_width - margin_left - margin_right,
            label_width,
            columns,
        );
        let v_gap = gap(
            page_height - margin_top - margin_bottom,
            label_height,
            rows,
        );
        if h_gap < 0.0 || v_gap < 0.0 {
            tracing::warn!(
                "Labels do not fit the printable area (gaps {:.1} x {:.1} pt); they will overlap",
                h_gap,
                v_gap
            );
        }

        Ok(Self {
            page_width,
            page_height,
            margin_top,
            margin_left,
            columns,
            rows,
            label_width,
            label_height,
            h_gap,
            v_gap,
        })
    }

    pub fn labels_per_page(&self) -> usize {
        self.columns * self.rows
    }

    pub fn placement(&self, index: usize) -> LabelPlacement {
        LabelPlacement {
            page: index / self.labels_per_page(),
            row: (index / self.columns) % self.rows,
            column: index % self.columns,
        }
    }

    pub fn label_rect(&self, placement: LabelPlacement) -> LabelRect {
        let x = self.margin_left + placement.column as f32 * (self.label_width + self.h_gap);
        let y = self.page_height
            - self.margin_top
            - placement.row as f32 * (self.label_height + self.v_gap)
            - self.label_height;
        LabelRect {
            x,
            y,
            width: self.label_width,
            height: self.label_height,
        }
    }
}

fn gap(printable: f32, cell: f32, count: usize) -> f32 {
    if count > 1 {
        (printable - count as f32 * cell) / (count - 1) as f32
    } else {
        0.0
    }
}

/// Outcome of a layout run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub labels: usize,
    pub pages: usize,
    pub truncated: usize,
}

/// Lay out and draw one label per record onto `surface`
pub fn render_labels<S: Surface>(
    records: &[Record],
    config: &LabelConfig,
    surface: &mut S,
) -> Result<RenderSummary, LabelError> {
    let geometry = PageGeometry::from_config(config)?;
    let total = records.len().min(MAX_LABELS);
    let truncated = records.len() - total;
    if truncated > 0 {
        tracing::warn!(
            "{} records exceed the {} label limit and were not rendered",
            truncated,
            MAX_LABELS
        );
    }

    let mut painter = LabelPainter::new(config, surface);
    let mut pages = 0;
    for (index, record) in records[..total].iter().enumerate() {
        let placement = geometry.placement(index);
        if placement.page == pages {
            painter
                .surface()
                .begin_page(geometry.page_width, geometry.page_height);
            pages += 1;
        }
        painter.paint(record, geometry.label_rect(placement));
    }

    tracing::info!("Rendered {} labels on {} pages", total, pages);
    Ok(RenderSummary {
        labels: total,
        pages,
        truncated,
    })
}
