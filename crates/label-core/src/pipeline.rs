//! Request-level selection: filter, then batch, shared by every front end

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::batch::BatchSelection;
use crate::config::LabelConfig;
use crate::error::LabelError;
use crate::filter::{filter_table, FilterCriteria, FilterDiagnostic, FilterMode};
use crate::record::Table;

/// Filter and batch options of one generation or export request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_filter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_exclude_filter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status_filter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status_exclude_filter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mail_zone_filter: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filter_mode: FilterMode,
    /// Publication display names or column names
    #[serde(default, deserialize_with = "null_as_default")]
    pub publication_columns: Vec<String>,
    /// Exact-match filters on arbitrary columns
    #[serde(default, deserialize_with = "null_as_default")]
    pub column_filters: BTreeMap<String, String>,
    pub limit: Option<usize>,
    pub start_index: Option<usize>,
    pub batch_size: Option<usize>,
}

/// Accept strings, numbers and null for free-text filter fields
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Treat an explicit `null` like a missing field
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl GenerationOptions {
    /// Apply one `key=value` filter as given on the command line.
    ///
    /// Named keys map to their criteria; any other key is an exact match on
    /// the column of that name.
    pub fn apply_filter(&mut self, key: &str, value: &str) -> Result<(), LabelError> {
        let key = key.trim();
        let value = value.trim().to_string();
        match key {
            "" => return Err(LabelError::InvalidFilter("empty filter key".to_string())),
            "category" => self.category_filter = Some(value),
            "category_exclude" => self.category_exclude_filter = Some(value),
            "status" => self.status_filter = Some(value),
            "status_exclude" => self.status_exclude_filter = Some(value),
            "mail_zone" => self.mail_zone_filter = Some(value),
            "filter_mode" => self.filter_mode = value.parse()?,
            "publication" => self
                .publication_columns
                .extend(crate::filter::split_tokens(&value).map(str::to_string)),
            column => {
                self.column_filters.insert(column.to_string(), value);
            }
        }
        Ok(())
    }

    pub fn criteria(&self, config: &LabelConfig) -> FilterCriteria {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let (publication_columns, _) = config.resolve_publications(&self.publication_columns);

        let mut criteria = FilterCriteria::new(self.filter_mode)
            .category(&text(&self.category_filter))
            .category_exclude(&text(&self.category_exclude_filter))
            .status(&text(&self.status_filter))
            .status_exclude(&text(&self.status_exclude_filter))
            .mail_zone(&text(&self.mail_zone_filter))
            .publication(&publication_columns);
        for (column, value) in &self.column_filters {
            criteria = criteria.column_equals(column, value);
        }
        criteria
    }

    /// Zero sizes mean "not given"
    pub fn batch(&self) -> BatchSelection {
        BatchSelection {
            batch_size: self.batch_size.filter(|n| *n > 0),
            start_index: self.start_index.unwrap_or(0),
            limit: self.limit.filter(|n| *n > 0),
        }
    }

    /// Configuration for this run: publication columns named by the request
    /// become the badge codes unless the configuration already lists some.
    pub fn effective_config(&self, mut config: LabelConfig) -> LabelConfig {
        if config.display_publication_codes_on_label.is_none() {
            let (_, codes) = config.resolve_publications(&self.publication_columns);
            if !codes.is_empty() {
                config.display_publication_codes_on_label = Some(codes);
            }
        }
        config
    }
}

/// Records chosen for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub table: Table,
    /// Records left after filtering, before batching
    pub matched: usize,
    pub diagnostics: Vec<FilterDiagnostic>,
}

/// Filter then batch `table`.
///
/// # Errors
///
/// [`LabelError::NoData`] when nothing survives filtering or batching.
pub fn select_records(
    table: &Table,
    options: &GenerationOptions,
    config: &LabelConfig,
) -> Result<Selection, LabelError> {
    let outcome = filter_table(table, &options.criteria(config));
    let matched = outcome.table.len();
    if matched == 0 {
        tracing::warn!("No records left after filtering {} rows", table.len());
        return Err(LabelError::NoData);
    }

    let rows = options.batch().select(&outcome.table.rows);
    if rows.is_empty() {
        tracing::warn!("Batch selection is empty ({} records matched)", matched);
        return Err(LabelError::NoData);
    }

    tracing::info!(
        "Selected {} of {} records ({} matched filters)",
        rows.len(),
        table.len(),
        matched
    );
    Ok(Selection {
        table: outcome.table.derive(rows),
        matched,
        diagnostics: outcome.diagnostics,
    })
}
