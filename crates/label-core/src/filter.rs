//! Record filtering
//!
//! Criteria are independent predicates over one designated column (a set of
//! columns for publications). A criterion whose column is absent from the
//! table is skipped with a diagnostic instead of failing the whole filter.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::LabelError;
use crate::record::{CellValue, Record, Table};

pub const CATEGORY_COLUMN: &str = "category_ids";
pub const STATUS_COLUMN: &str = "status_ids";
pub const MAIL_ZONE_COLUMN: &str = "MAIL_ZONE";

/// Split a comma-separated cell into trimmed, non-empty tokens
pub fn split_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Set of tokens for a multi-valued column criterion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet(BTreeSet<String>);

impl TokenSet {
    pub fn parse(text: &str) -> Self {
        Self(split_tokens(text).map(str::to_string).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    /// True when any token of the cell is in the set
    pub fn matches_cell(&self, cell: &CellValue) -> bool {
        let text = cell.as_text();
        let matched = split_tokens(&text).any(|t| self.contains(t));
        matched
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .map(|t: String| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self.iter().collect();
        write!(f, "{}", tokens.join(","))
    }
}

/// How criteria combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

impl FromStr for FilterMode {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(FilterMode::And),
            "OR" => Ok(FilterMode::Or),
            other => Err(LabelError::InvalidFilter(format!(
                "unknown filter mode '{}', expected AND or OR",
                other
            ))),
        }
    }
}

/// A single filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    CategoryInclude(TokenSet),
    CategoryExclude(TokenSet),
    StatusInclude(TokenSet),
    StatusExclude(TokenSet),
    MailZoneEquals(String),
    /// Passes when any listed column holds a count of at least one
    PublicationSubscribed(Vec<String>),
    ColumnEquals { column: String, value: String },
}

impl Criterion {
    pub fn is_exclusion(&self) -> bool {
        matches!(
            self,
            Criterion::CategoryExclude(_) | Criterion::StatusExclude(_)
        )
    }

    /// Column read by a single-column criterion
    fn column(&self) -> Option<&str> {
        match self {
            Criterion::CategoryInclude(_) | Criterion::CategoryExclude(_) => Some(CATEGORY_COLUMN),
            Criterion::StatusInclude(_) | Criterion::StatusExclude(_) => Some(STATUS_COLUMN),
            Criterion::MailZoneEquals(_) => Some(MAIL_ZONE_COLUMN),
            Criterion::ColumnEquals { column, .. } => Some(column.as_str()),
            Criterion::PublicationSubscribed(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::CategoryInclude(_) => "category",
            Criterion::CategoryExclude(_) => "category exclusion",
            Criterion::StatusInclude(_) => "status",
            Criterion::StatusExclude(_) => "status exclusion",
            Criterion::MailZoneEquals(_) => "mail zone",
            Criterion::PublicationSubscribed(_) => "publication",
            Criterion::ColumnEquals { .. } => "column equality",
        }
    }

    /// Raw predicate: for exclusions this is "the record is excluded"
    fn matches(&self, record: &Record, columns: &[String]) -> bool {
        match self {
            Criterion::CategoryInclude(set)
            | Criterion::CategoryExclude(set)
            | Criterion::StatusInclude(set)
            | Criterion::StatusExclude(set) => self
                .column()
                .is_some_and(|column| set.matches_cell(record.get(column))),
            Criterion::MailZoneEquals(zone) => record.text(MAIL_ZONE_COLUMN) == zone.trim(),
            Criterion::ColumnEquals { column, value } => record.text(column) == value.trim(),
            Criterion::PublicationSubscribed(_) => columns
                .iter()
                .any(|column| is_subscribed(record.get(column))),
        }
    }
}

/// A publication cell counts as subscribed when it reads as a number >= 1
pub fn is_subscribed(cell: &CellValue) -> bool {
    cell.as_number().is_some_and(|n| n >= 1.0)
}

/// Criteria plus the mode combining them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub criteria: Vec<Criterion>,
    pub mode: FilterMode,
}

impl FilterCriteria {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            criteria: Vec::new(),
            mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn push(&mut self, criterion: Criterion) {
        self.criteria.push(criterion);
    }

    fn with_tokens(mut self, text: &str, build: fn(TokenSet) -> Criterion) -> Self {
        let tokens = TokenSet::parse(text);
        if !tokens.is_empty() {
            self.criteria.push(build(tokens));
        }
        self
    }

    pub fn category(self, text: &str) -> Self {
        self.with_tokens(text, Criterion::CategoryInclude)
    }

    pub fn category_exclude(self, text: &str) -> Self {
        self.with_tokens(text, Criterion::CategoryExclude)
    }

    pub fn status(self, text: &str) -> Self {
        self.with_tokens(text, Criterion::StatusInclude)
    }

    pub fn status_exclude(self, text: &str) -> Self {
        self.with_tokens(text, Criterion::StatusExclude)
    }

    pub fn mail_zone(mut self, zone: &str) -> Self {
        if !zone.trim().is_empty() {
            self.criteria
                .push(Criterion::MailZoneEquals(zone.trim().to_string()));
        }
        self
    }

    pub fn publication(mut self, columns: &[String]) -> Self {
        let columns: Vec<String> = columns
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if !columns.is_empty() {
            self.criteria.push(Criterion::PublicationSubscribed(columns));
        }
        self
    }

    pub fn column_equals(mut self, column: &str, value: &str) -> Self {
        self.criteria.push(Criterion::ColumnEquals {
            column: column.trim().to_string(),
            value: value.trim().to_string(),
        });
        self
    }
}

/// Why a criterion did not take part in filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDiagnostic {
    /// The criterion's column is absent; it was skipped
    MissingColumn { criterion: String, column: String },
    /// None of the publication columns exist; nothing can match
    NoPublicationColumns { columns: Vec<String> },
}

impl fmt::Display for FilterDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDiagnostic::MissingColumn { criterion, column } => write!(
                f,
                "column '{}' not found; {} filter skipped",
                column, criterion
            ),
            FilterDiagnostic::NoPublicationColumns { columns } => write!(
                f,
                "none of the publication columns [{}] exist; no records can match",
                columns.join(", ")
            ),
        }
    }
}

/// Filtered table plus any skipped-criterion diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub table: Table,
    pub diagnostics: Vec<FilterDiagnostic>,
}

enum Prepared<'a> {
    Active(&'a Criterion, Vec<String>),
    /// Publication criterion with no usable column: never matches
    Unsatisfiable,
}

impl Prepared<'_> {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Prepared::Active(criterion, columns) => criterion.matches(record, columns),
            Prepared::Unsatisfiable => false,
        }
    }
}

/// Apply `criteria` to `table`, preserving row order and columns
pub fn filter_table(table: &Table, criteria: &FilterCriteria) -> FilterOutcome {
    let mut diagnostics = Vec::new();
    let mut inclusions = Vec::new();
    let mut exclusions = Vec::new();

    for criterion in &criteria.criteria {
        let prepared = match criterion {
            Criterion::PublicationSubscribed(columns) => {
                let present: Vec<String> = columns
                    .iter()
                    .filter(|c| table.has_column(c))
                    .cloned()
                    .collect();
                if present.is_empty() {
                    diagnostics.push(FilterDiagnostic::NoPublicationColumns {
                        columns: columns.clone(),
                    });
                    Prepared::Unsatisfiable
                } else {
                    if present.len() < columns.len() {
                        tracing::debug!(
                            "Publication filter using {:?} of requested {:?}",
                            present,
                            columns
                        );
                    }
                    Prepared::Active(criterion, present)
                }
            }
            _ => match criterion.column() {
                Some(column) if !table.has_column(column) => {
                    diagnostics.push(FilterDiagnostic::MissingColumn {
                        criterion: criterion.name().to_string(),
                        column: column.to_string(),
                    });
                    continue;
                }
                _ => Prepared::Active(criterion, Vec::new()),
            },
        };

        if criterion.is_exclusion() {
            exclusions.push(prepared);
        } else {
            inclusions.push(prepared);
        }
    }

    for diagnostic in &diagnostics {
        tracing::warn!("{}", diagnostic);
    }

    let passes_inclusion = |record: &Record| match criteria.mode {
        FilterMode::And => inclusions.iter().all(|c| c.matches(record)),
        FilterMode::Or => inclusions.is_empty() || inclusions.iter().any(|c| c.matches(record)),
    };

    let rows: Vec<Record> = table
        .rows
        .iter()
        .filter(|record| passes_inclusion(record))
        .filter(|record| !exclusions.iter().any(|c| c.matches(record)))
        .cloned()
        .collect();

    tracing::debug!(
        "Filtered {} -> {} records ({} criteria, {:?} mode)",
        table.len(),
        rows.len(),
        criteria.criteria.len(),
        criteria.mode
    );

    FilterOutcome {
        table: table.derive(rows),
        diagnostics,
    }
}

/// Occurrences of one token in a multi-valued column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    pub token: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Count every token of `column` across the table.
///
/// Sorted by count descending, then token ascending. Descriptions come from
/// `lookup` when given.
pub fn count_tokens(
    table: &Table,
    column: &str,
    lookup: Option<&BTreeMap<String, String>>,
) -> Result<Vec<TokenCount>, LabelError> {
    if !table.has_column(column) {
        return Err(LabelError::MissingColumn(column.to_string()));
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in &table.rows {
        let text = record.get(column).as_text();
        for token in split_tokens(&text) {
            *counts.entry(token.to_string()).or_default() += 1;
        }
    }

    let mut census: Vec<TokenCount> = counts
        .into_iter()
        .map(|(token, count)| TokenCount {
            description: lookup.and_then(|map| map.get(&token).cloned()),
            token,
            count,
        })
        .collect();
    census.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token)));
    Ok(census)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table() -> Table {
        Table::with_rows(
            columns(&["NAME1", "category_ids", "status_ids", "MAIL_ZONE", "BE", "AR"]),
            vec![
                Record::new()
                    .with("NAME1", "Alice")
                    .with("category_ids", "C_acd, C_col")
                    .with("status_ids", "1")
                    .with("MAIL_ZONE", 1i64)
                    .with("BE", 1i64)
                    .with("AR", 0i64),
                Record::new()
                    .with("NAME1", "Bob")
                    .with("category_ids", "C_can")
                    .with("status_ids", "2,4")
                    .with("MAIL_ZONE", "3")
                    .with("BE", "0")
                    .with("AR", "2.0"),
                Record::new()
                    .with("NAME1", "Carol")
                    .with("category_ids", "C_col")
                    .with("status_ids", "4")
                    .with("MAIL_ZONE", 3.0)
                    .with("BE", "")
                    .with("AR", "abc"),
                Record::new()
                    .with("NAME1", "Dan")
                    .with("category_ids", CellValue::Empty)
                    .with("status_ids", "90")
                    .with("MAIL_ZONE", "5")
                    .with("BE", 3i64),
            ],
        )
    }

    fn names(outcome: &FilterOutcome) -> Vec<String> {
        outcome.table.rows.iter().map(|r| r.text("NAME1")).collect()
    }

    // ============================================================
    // Token parsing
    // ============================================================

    #[test]
    fn test_token_set_drops_empty_tokens() {
        let set = TokenSet::parse(" C_acd, ,C_col,, ");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["C_acd", "C_col"]);
        assert!(TokenSet::parse(" , ").is_empty());
    }

    #[test]
    fn test_empty_criterion_text_is_not_a_criterion() {
        let criteria = FilterCriteria::default()
            .category("  ")
            .status(",")
            .mail_zone("")
            .publication(&[]);
        assert!(criteria.is_empty());
    }

    #[test]
    fn test_filter_mode_parsing() {
        assert_eq!("or".parse::<FilterMode>().unwrap(), FilterMode::Or);
        assert_eq!(" AND ".parse::<FilterMode>().unwrap(), FilterMode::And);
        assert!("XOR".parse::<FilterMode>().is_err());
    }

    // ============================================================
    // Individual criteria
    // ============================================================

    #[test]
    fn test_token_set_matches_numeric_cells() {
        let set = TokenSet::parse(" 1, 4 ,,");
        assert!(set.matches_cell(&CellValue::Number(4.0)));
        assert!(set.matches_cell(&CellValue::text("7, 1")));
        assert!(!set.matches_cell(&CellValue::text("14")));
        assert!(!set.matches_cell(&CellValue::Empty));
    }

    #[test]
    fn test_category_include_matches_any_token() {
        let outcome = filter_table(&sample_table(), &FilterCriteria::default().category("C_col"));
        assert_eq!(names(&outcome), vec!["Alice", "Carol"]);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_include_and_exclude_same_field() {
        let criteria = FilterCriteria::default()
            .category("C_col,C_can")
            .category_exclude("C_acd");
        let outcome = filter_table(&sample_table(), &criteria);
        assert_eq!(names(&outcome), vec!["Bob", "Carol"]);
    }

    #[test]
    fn test_status_exclude() {
        let outcome = filter_table(
            &sample_table(),
            &FilterCriteria::default().status_exclude("4"),
        );
        assert_eq!(names(&outcome), vec!["Alice", "Dan"]);
    }

    #[test]
    fn test_mail_zone_compares_numbers_as_text() {
        let outcome = filter_table(&sample_table(), &FilterCriteria::default().mail_zone("3"));
        assert_eq!(names(&outcome), vec!["Bob", "Carol"]);
    }

    #[test]
    fn test_publication_subscription_values() {
        let outcome = filter_table(
            &sample_table(),
            &FilterCriteria::default().publication(&columns(&["BE"])),
        );
        assert_eq!(names(&outcome), vec!["Alice", "Dan"]);

        let outcome = filter_table(
            &sample_table(),
            &FilterCriteria::default().publication(&columns(&["AR"])),
        );
        assert_eq!(names(&outcome), vec!["Bob"]);
    }

    #[test]
    fn test_publication_any_of_several_columns() {
        let outcome = filter_table(
            &sample_table(),
            &FilterCriteria::default().publication(&columns(&["BE", "AR", "FFE"])),
        );
        assert_eq!(names(&outcome), vec!["Alice", "Bob", "Dan"]);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_publication_without_any_column_is_empty_with_diagnostic() {
        let outcome = filter_table(
            &sample_table(),
            &FilterCriteria::default().publication(&columns(&["FFE", "FFC"])),
        );
        assert!(outcome.table.is_empty());
        assert_eq!(
            outcome.diagnostics,
            vec![FilterDiagnostic::NoPublicationColumns {
                columns: columns(&["FFE", "FFC"])
            }]
        );
    }

    #[test]
    fn test_column_equals() {
        let outcome = filter_table(
            &sample_table(),
            &FilterCriteria::default().column_equals("NAME1", "Bob"),
        );
        assert_eq!(names(&outcome), vec!["Bob"]);
    }

    #[test]
    fn test_missing_column_skips_criterion() {
        let table = Table::with_rows(
            columns(&["NAME1"]),
            vec![Record::new().with("NAME1", "Alice")],
        );
        let outcome = filter_table(&table, &FilterCriteria::default().category("C_acd"));
        assert_eq!(outcome.table, table);
        assert_eq!(
            outcome.diagnostics,
            vec![FilterDiagnostic::MissingColumn {
                criterion: "category".to_string(),
                column: "category_ids".to_string(),
            }]
        );
    }

    // ============================================================
    // Composition
    // ============================================================

    #[test]
    fn test_and_mode_requires_every_criterion() {
        let criteria = FilterCriteria::default().category("C_col").mail_zone("3");
        assert_eq!(names(&filter_table(&sample_table(), &criteria)), vec!["Carol"]);
    }

    #[test]
    fn test_or_mode_unions_inclusions_then_subtracts_exclusions() {
        let criteria = FilterCriteria::new(FilterMode::Or)
            .category("C_acd")
            .mail_zone("5")
            .status("2")
            .status_exclude("90");
        assert_eq!(names(&filter_table(&sample_table(), &criteria)), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_or_mode_with_only_exclusions() {
        let criteria = FilterCriteria::new(FilterMode::Or).category_exclude("C_col");
        assert_eq!(names(&filter_table(&sample_table(), &criteria)), vec!["Bob", "Dan"]);
    }

    #[test]
    fn test_or_mode_skipped_criterion_does_not_contribute() {
        let criteria = FilterCriteria::new(FilterMode::Or)
            .mail_zone("5")
            .column_equals("region", "north");
        let outcome = filter_table(&sample_table(), &criteria);
        assert_eq!(names(&outcome), vec!["Dan"]);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    // ============================================================
    // Token census
    // ============================================================

    #[test]
    fn test_count_tokens_sorted_by_count_then_token() {
        let lookup = BTreeMap::from([("C_col".to_string(), "Colleges".to_string())]);
        let census = count_tokens(&sample_table(), "category_ids", Some(&lookup)).unwrap();
        assert_eq!(
            census,
            vec![
                TokenCount {
                    token: "C_col".to_string(),
                    count: 2,
                    description: Some("Colleges".to_string()),
                },
                TokenCount {
                    token: "C_acd".to_string(),
                    count: 1,
                    description: None,
                },
                TokenCount {
                    token: "C_can".to_string(),
                    count: 1,
                    description: None,
                },
            ]
        );
    }

    #[test]
    fn test_count_tokens_missing_column() {
        let err = count_tokens(&sample_table(), "nope", None).unwrap_err();
        assert_eq!(err.code(), "MISSING_COLUMN");
    }

    // ============================================================
    // Properties
    // ============================================================

    fn arb_table() -> impl Strategy<Value = Table> {
        let token = prop::sample::select(vec!["a", "b", "c", "d"]);
        let cell = prop::collection::vec(token, 0..3).prop_map(|t| t.join(","));
        prop::collection::vec((cell, 0u32..4), 0..20).prop_map(|cells| {
            let rows = cells
                .into_iter()
                .enumerate()
                .map(|(i, (categories, zone))| {
                    Record::new()
                        .with("id", i as i64)
                        .with("category_ids", categories)
                        .with("MAIL_ZONE", zone as i64)
                })
                .collect();
            Table::with_rows(columns(&["id", "category_ids", "MAIL_ZONE"]), rows)
        })
    }

    fn arb_tokens() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d"]), 1..3)
            .prop_map(|t| t.join(","))
    }

    proptest! {
        #[test]
        fn prop_filter_is_order_preserving_subset(
            table in arb_table(),
            tokens in arb_tokens(),
            zone in 0u32..4,
            or_mode in any::<bool>(),
        ) {
            let mode = if or_mode { FilterMode::Or } else { FilterMode::And };
            let criteria = FilterCriteria::new(mode).category(&tokens).mail_zone(&zone.to_string());
            let outcome = filter_table(&table, &criteria);

            let ids: Vec<String> = outcome.table.rows.iter().map(|r| r.text("id")).collect();
            let all: Vec<String> = table.rows.iter().map(|r| r.text("id")).collect();
            let mut cursor = all.iter();
            for id in &ids {
                prop_assert!(cursor.any(|candidate| candidate == id));
            }
            prop_assert_eq!(&outcome.table.columns, &table.columns);
        }

        #[test]
        fn prop_include_and_exclude_same_set_is_empty(
            table in arb_table(),
            tokens in arb_tokens(),
            or_mode in any::<bool>(),
        ) {
            let mode = if or_mode { FilterMode::Or } else { FilterMode::And };
            let criteria = FilterCriteria::new(mode).category(&tokens).category_exclude(&tokens);
            prop_assert!(filter_table(&table, &criteria).table.is_empty());
        }

        #[test]
        fn prop_missing_column_leaves_table_unchanged(table in arb_table(), tokens in arb_tokens()) {
            let criteria = FilterCriteria::default().status(&tokens);
            let outcome = filter_table(&table, &criteria);
            prop_assert_eq!(outcome.table, table);
            prop_assert_eq!(outcome.diagnostics.len(), 1);
        }
    }
}
