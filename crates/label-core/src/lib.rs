//! Mailing label engine
//!
//! Turns a table of recipient records into laid-out label sheets:
//! - `config`: default-complete configuration resolved from an optional override
//! - `filter` / `batch` / `pipeline`: which records are printed
//! - `layout` / `content`: where each label goes and what it shows
//!
//! Drawing goes through the [`Surface`] trait so the engine stays independent
//! of the output format.

pub mod batch;
pub mod config;
pub mod content;
pub mod error;
pub mod filter;
pub mod layout;
pub mod pipeline;
pub mod record;
pub mod surface;

pub use batch::BatchSelection;
pub use config::{load_config, save_config, FontRole, LabelConfig, Rgb, MM_TO_PT};
pub use content::{badge_text, LabelContent};
pub use error::LabelError;
pub use filter::{
    count_tokens, filter_table, Criterion, FilterCriteria, FilterDiagnostic, FilterMode,
    FilterOutcome, TokenCount,
};
pub use layout::{render_labels, PageGeometry, RenderSummary, MAX_LABELS};
pub use pipeline::{select_records, GenerationOptions, Selection};
pub use record::{CellValue, Record, Table};
pub use surface::Surface;
