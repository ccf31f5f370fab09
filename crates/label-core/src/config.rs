//! Label configuration
//!
//! The resolved configuration is an immutable value built once per run by
//! layering a user override document on top of the built-in defaults.
//! Nested mappings merge key by key; lists and scalars are replaced wholesale.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::LabelError;

/// Millimeters to PDF points
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// Maximum characters of custom right-panel text drawn on a label
pub const RIGHT_PANEL_TEXT_MAX_CHARS: usize = 3;

/// Font roles used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Header,
    Title,
    Body,
    Footer,
    Cjk,
}

impl FontRole {
    pub fn key(self) -> &'static str {
        match self {
            FontRole::Header => "header",
            FontRole::Title => "title",
            FontRole::Body => "body",
            FontRole::Footer => "footer",
            FontRole::Cjk => "cjk",
        }
    }

    fn fallback(self) -> (&'static str, f32) {
        match self {
            FontRole::Header => ("Helvetica-Bold", 12.0),
            FontRole::Title => ("Helvetica-Bold", 10.0),
            FontRole::Body => ("Helvetica", 9.0),
            FontRole::Footer => ("Helvetica", 8.0),
            FontRole::Cjk => ("SimSun", 9.0),
        }
    }
}

/// Color roles used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRole {
    Header,
    Title,
    Body,
    Border,
}

impl ColorRole {
    pub fn key(self) -> &'static str {
        match self {
            ColorRole::Header => "header",
            ColorRole::Title => "title",
            ColorRole::Body => "body",
            ColorRole::Border => "border",
        }
    }
}

/// Font entry as written in the configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    /// Font file to embed (TrueType)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl FontSpec {
    fn new(name: &str, size: f32) -> Self {
        Self {
            name: Some(name.to_string()),
            size: Some(size),
            file: None,
        }
    }
}

/// Font after the role -> role default -> global default fallback chain
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    pub name: String,
    pub size: f32,
    pub file: Option<String>,
}

/// RGB color with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parse `#RRGGBB` (the leading `#` is optional)
    pub fn from_hex(color: &str) -> Option<Rgb> {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

/// Which part of the label a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldGroup {
    Recipient,
    Address,
    #[serde(other)]
    Other,
}

/// Catalog entry describing a selectable field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub key: String,
    #[serde(default)]
    pub label: String,
    /// 1 when the field is selected by default
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub default: u8,
    pub group: FieldGroup,
}

impl FieldInfo {
    fn new(key: &str, label: &str, default: bool, group: FieldGroup) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            default: u8::from(default),
            group,
        }
    }
}

/// Accept `0`/`1` as well as `true`/`false`
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => u8::from(b),
        Value::Number(n) => u8::from(n.as_f64().is_some_and(|v| v >= 1.0)),
        Value::String(s) => u8::from(s.trim() == "1" || s.trim().eq_ignore_ascii_case("true")),
        _ => 0,
    })
}

/// Publication choice: data columns to test and codes to print
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationOption {
    #[serde(default)]
    pub data_columns: Vec<String>,
    #[serde(default)]
    pub label_codes: Vec<String>,
}

impl PublicationOption {
    fn single(code: &str) -> Self {
        Self {
            data_columns: vec![code.to_string()],
            label_codes: vec![code.to_string()],
        }
    }
}

/// Fully merged label configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub page_size: String,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub columns: u32,
    pub rows: u32,
    /// Label width in millimeters
    pub label_width: f32,
    /// Label height in millimeters
    pub label_height: f32,
    pub fonts: BTreeMap<String, FontSpec>,
    pub colors: BTreeMap<String, String>,
    pub show_border: bool,
    pub border_width: f32,
    pub bulletin_text: String,
    pub bulletin_number_text: String,
    pub custom_right_panel_text: String,
    pub category_map: BTreeMap<String, String>,
    pub status_map: BTreeMap<String, String>,
    pub mail_zone_map: BTreeMap<String, String>,
    pub publication_options_map: BTreeMap<String, PublicationOption>,
    pub all_fields_info: Vec<FieldInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_selected_fields_on_label: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_publication_codes_on_label: Option<Vec<String>>,
    /// Keys this version does not interpret; kept so a save does not lose them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let fonts = BTreeMap::from([
            ("header".to_string(), FontSpec::new("Helvetica-Bold", 12.0)),
            ("title".to_string(), FontSpec::new("Helvetica-Bold", 10.0)),
            ("body".to_string(), FontSpec::new("Helvetica", 9.0)),
            ("footer".to_string(), FontSpec::new("Helvetica", 8.0)),
            (
                "cjk".to_string(),
                FontSpec {
                    file: Some("SimSun.ttf".to_string()),
                    ..FontSpec::new("SimSun", 9.0)
                },
            ),
        ]);
        let colors = ["header", "title", "body", "border"]
            .into_iter()
            .map(|role| (role.to_string(), "#000000".to_string()))
            .collect();

        Self {
            page_size: "A4".to_string(),
            margin_top: 10.0,
            margin_bottom: 10.0,
            margin_left: 10.0,
            margin_right: 10.0,
            columns: 2,
            rows: 8,
            label_width: 95.0,
            label_height: 30.0,
            fonts,
            colors,
            show_border: true,
            border_width: 0.5,
            bulletin_text: "Bulletin".to_string(),
            bulletin_number_text: "No.2-2026".to_string(),
            custom_right_panel_text: String::new(),
            category_map: string_map(&[
                ("C_acd", "Academic Units"),
                ("C_acd_dept", "Academic Units_departments"),
                ("C_acd_oths", "Other Academic Units"),
                ("C_acd_prof", "Academic Units_profs-at-large"),
                ("C_adm_sev", "Professional Administrative and Services Units"),
                ("C_can", "Canteens"),
                ("C_col", "Colleges"),
                ("C_fac", "Facilities"),
                ("C_hst", "Student Hostels"),
                ("C_jrsh", "Joint Research Units"),
                ("C_mgt", "University Management Units"),
                ("C_mgt_offr", "University Officers"),
                ("C_org", "Staff Organizations"),
                ("C_rsh", "Research Units"),
                ("C_rsh_ctr", "Research Centre"),
                ("C_rsh_inst", "Research Institute"),
                ("C_rsh_key", "State Key Laboratories"),
                ("C_su", "Student Unions"),
            ]),
            status_map: string_map(&[
                ("1", "CU Admin Units/Academic Depts/Research Centres"),
                ("2", "Units Other than CU Departments/Units"),
                ("3", "CU-related Individual/Special Order"),
                ("4", "Council Members"),
                ("5", "Emeritus Professors"),
                ("6", "Honorary Graduates"),
                ("7", "College Trustees"),
                ("8", "Advisory Boards/Committees"),
                ("9", "College Donors"),
                ("10", "Newsletter as request / Subscription"),
                ("11", "Government"),
                ("12", "Local Culture"),
                ("13", "Local Individuals"),
                ("15", "Local Tertiary"),
                ("17", "Overseas Individuals"),
                ("18", "Special Request (local/overseas)"),
                ("19", "Secondary School (principle + student union)"),
                ("20", "Overseas Culture"),
                ("21", "Overseas Tertiary"),
                ("22", "LegCo Members (AR only)"),
                ("23", "ExeCo Members (AR only)"),
                ("24", "Education Commission Members (AR only)"),
                ("26", "Consulates (AR only)"),
                ("27", "Honorary Fellows"),
                ("90", "Alumni"),
            ]),
            mail_zone_map: string_map(&[
                ("1", "Internal circulation"),
                ("2", "Hong Kong Island"),
                ("3", "Kowloon, NT"),
                ("4", "China, Taiwan, Macau"),
                ("5", "All others"),
            ]),
            publication_options_map: BTreeMap::from([
                (
                    "Annual Report (English Only)".to_string(),
                    PublicationOption::single("AR"),
                ),
                (
                    "Bulletin (English Only)".to_string(),
                    PublicationOption::single("BE"),
                ),
                (
                    "Bulletin (Chinese Only)".to_string(),
                    PublicationOption::single("BC"),
                ),
                (
                    "Bulletin (Chinese & English)".to_string(),
                    PublicationOption::single("BEC"),
                ),
                (
                    "Facts and Figures (English Only)".to_string(),
                    PublicationOption::single("FFE"),
                ),
                (
                    "Facts and Figures (Chinese Only)".to_string(),
                    PublicationOption::single("FFC"),
                ),
            ]),
            all_fields_info: vec![
                FieldInfo::new("TITLE1", "Title", true, FieldGroup::Recipient),
                FieldInfo::new("NAME1", "Name", true, FieldGroup::Recipient),
                FieldInfo::new("surname", "Surname", true, FieldGroup::Recipient),
                FieldInfo::new("post", "Post", false, FieldGroup::Recipient),
                FieldInfo::new("co_name", "Company Name", false, FieldGroup::Address),
                FieldInfo::new("co_name_chi", "Company Name (Chi)", false, FieldGroup::Address),
                FieldInfo::new("UNIT_NAME", "Unit Name", false, FieldGroup::Address),
                FieldInfo::new("unit_name_chi", "Unit Name (Chi)", false, FieldGroup::Address),
                FieldInfo::new("sub_unit", "Sub Unit", false, FieldGroup::Address),
                FieldInfo::new("sub_unit_chi", "Sub Unit (Chi)", false, FieldGroup::Address),
                FieldInfo::new("add1", "Address 1", true, FieldGroup::Address),
                FieldInfo::new("add2", "Address 2", true, FieldGroup::Address),
                FieldInfo::new("state", "State/Country", true, FieldGroup::Address),
            ],
            display_selected_fields_on_label: None,
            display_publication_codes_on_label: None,
            extra: Map::new(),
        }
    }
}

const SELECTION_KEY: &str = "display_selected_fields_on_label";
const LEGACY_SELECTION_KEY: &str = "selected_fields_for_label";

fn string_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Merge `overlay` into `base`: objects merge key by key, anything else is
/// replaced by the overlay value.
pub fn merge_values(base: Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                base.insert(key.clone(), merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay.clone(),
    }
}

impl LabelConfig {
    /// Resolve the configuration for one run.
    ///
    /// A malformed override is reported and ignored; this never fails.
    pub fn resolve(overrides: Option<&Value>) -> LabelConfig {
        let defaults = LabelConfig::default();
        let Some(overrides) = overrides else {
            return defaults.finalize();
        };
        if !overrides.is_object() {
            tracing::warn!("Configuration override is not a JSON object; using defaults");
            return defaults.finalize();
        }

        let base = match serde_json::to_value(&defaults) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Failed to serialize default configuration: {}", e);
                return defaults.finalize();
            }
        };

        match LabelConfig::from_merged(merge_values(base, overrides)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid configuration override ({}); using defaults", e);
                defaults.finalize()
            }
        }
    }

    /// Build a configuration from an already merged document.
    ///
    /// The legacy `selected_fields_for_label` key only supplies the field
    /// selection when `display_selected_fields_on_label` is absent.
    pub fn from_merged(mut merged: Value) -> Result<LabelConfig, serde_json::Error> {
        if let Value::Object(map) = &mut merged {
            if let Some(legacy) = map.remove(LEGACY_SELECTION_KEY) {
                let current = map
                    .get(SELECTION_KEY)
                    .filter(|v| !v.is_null())
                    .is_some();
                if !current {
                    map.insert(SELECTION_KEY.to_string(), legacy);
                }
            }
        }
        serde_json::from_value::<LabelConfig>(merged).map(LabelConfig::finalize)
    }

    /// Fill in the field selection from the catalog when none was given
    fn finalize(mut self) -> Self {
        if self.display_selected_fields_on_label.is_none() {
            self.display_selected_fields_on_label = Some(
                self.all_fields_info
                    .iter()
                    .filter(|f| f.default == 1)
                    .map(|f| f.key.clone())
                    .collect(),
            );
        }
        self
    }

    /// Replace the grid dimensions for this run
    pub fn with_grid(mut self, columns: Option<u32>, rows: Option<u32>) -> Self {
        if let Some(columns) = columns {
            self.columns = columns;
        }
        if let Some(rows) = rows {
            self.rows = rows;
        }
        self
    }

    pub fn font(&self, role: FontRole) -> ResolvedFont {
        let (default_name, default_size) = role.fallback();
        let spec = self.fonts.get(role.key());
        let name = spec
            .and_then(|s| s.name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(default_name)
            .to_string();
        let size = spec
            .and_then(|s| s.size)
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(default_size);
        ResolvedFont {
            name,
            size,
            file: spec.and_then(|s| s.file.clone()),
        }
    }

    /// True when the configuration names a CJK font at all
    pub fn has_cjk_font(&self) -> bool {
        self.fonts
            .get(FontRole::Cjk.key())
            .and_then(|s| s.name.as_deref())
            .is_some_and(|n| !n.trim().is_empty())
    }

    pub fn color(&self, role: ColorRole) -> Rgb {
        self.colors
            .get(role.key())
            .and_then(|c| Rgb::from_hex(c))
            .unwrap_or(Rgb::BLACK)
    }

    /// Custom right-panel text, capped at three characters
    pub fn right_panel_text(&self) -> String {
        self.custom_right_panel_text
            .chars()
            .take(RIGHT_PANEL_TEXT_MAX_CHARS)
            .collect()
    }

    pub fn selected_fields(&self) -> &[String] {
        self.display_selected_fields_on_label.as_deref().unwrap_or(&[])
    }

    pub fn publication_codes(&self) -> &[String] {
        self.display_publication_codes_on_label
            .as_deref()
            .unwrap_or(&[])
    }

    /// Page size in points; unknown names fall back to A4
    pub fn page_dimensions(&self) -> (f32, f32) {
        page_size_points(&self.page_size).unwrap_or_else(|| {
            tracing::warn!("Unknown page size '{}'; using A4", self.page_size);
            A4
        })
    }

    /// Lookup map describing the tokens of a multi-valued column
    pub fn lookup_map(&self, column: &str) -> Option<&BTreeMap<String, String>> {
        match column {
            "category_ids" => Some(&self.category_map),
            "status_ids" => Some(&self.status_map),
            "MAIL_ZONE" => Some(&self.mail_zone_map),
            _ => None,
        }
    }

    /// Expand a publication selection into data columns and label codes.
    ///
    /// Each entry is either a display name from `publication_options_map`
    /// or a raw column name, which then doubles as its own label code.
    pub fn resolve_publications(&self, selection: &[String]) -> (Vec<String>, Vec<String>) {
        let mut columns = Vec::new();
        let mut codes = Vec::new();
        for entry in selection {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match self.publication_options_map.get(entry) {
                Some(option) => {
                    push_unique(&mut columns, &option.data_columns);
                    push_unique(&mut codes, &option.label_codes);
                }
                None => {
                    push_unique(&mut columns, &[entry.to_string()]);
                    push_unique(&mut codes, &[entry.to_string()]);
                }
            }
        }
        (columns, codes)
    }
}

fn push_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

const A4: (f32, f32) = (595.28, 841.89);

/// Page dimensions in points for a named paper size
pub fn page_size_points(name: &str) -> Option<(f32, f32)> {
    match name.trim().to_ascii_lowercase().as_str() {
        "a3" => Some((841.89, 1190.55)),
        "a4" => Some(A4),
        "a5" => Some((419.53, 595.28)),
        "letter" => Some((612.0, 792.0)),
        "legal" => Some((612.0, 1008.0)),
        _ => None,
    }
}

/// Load the configuration document at `path`.
///
/// A missing file or malformed JSON falls back to defaults with a warning.
pub fn load_config(path: Option<&Path>) -> LabelConfig {
    let Some(path) = path else {
        return LabelConfig::resolve(None);
    };
    if !path.exists() {
        tracing::warn!(
            "Config file not found at {}; using default settings",
            path.display()
        );
        return LabelConfig::resolve(None);
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return LabelConfig::resolve(None);
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(value) => LabelConfig::resolve(Some(&value)),
        Err(e) => {
            tracing::warn!("Error decoding JSON from {}: {}", path.display(), e);
            LabelConfig::resolve(None)
        }
    }
}

/// Persist `config` as pretty-printed JSON
pub fn save_config(path: &Path, config: &LabelConfig) -> Result<(), LabelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| LabelError::OutputWrite(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| LabelError::OutputWrite(e.to_string()))?;
    fs::write(path, json).map_err(|e| LabelError::OutputWrite(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults_derive_field_selection() {
        let config = LabelConfig::resolve(None);
        assert_eq!(
            config.selected_fields(),
            ["TITLE1", "NAME1", "surname", "add1", "add2", "state"]
        );
        assert_eq!(config.columns, 2);
        assert_eq!(config.rows, 8);
        assert_eq!(config.label_width, 95.0);
        assert_eq!(config.label_height, 30.0);
    }

    #[test]
    fn test_nested_font_override_preserves_siblings() {
        let config = LabelConfig::resolve(Some(&json!({"fonts": {"body": {"size": 11}}})));

        let body = config.font(FontRole::Body);
        assert_eq!(body.name, "Helvetica");
        assert_eq!(body.size, 11.0);
        assert_eq!(config.font(FontRole::Title).name, "Helvetica-Bold");
        assert_eq!(config.font(FontRole::Header).size, 12.0);
        assert_eq!(config.font(FontRole::Cjk).file.as_deref(), Some("SimSun.ttf"));
        assert_eq!(config.fonts.len(), 5);
    }

    #[test]
    fn test_lists_are_replaced_wholesale() {
        let config = LabelConfig::resolve(Some(&json!({
            "display_selected_fields_on_label": ["NAME1", "co_name"]
        })));
        assert_eq!(config.selected_fields(), ["NAME1", "co_name"]);
    }

    #[test]
    fn test_legacy_selection_key_is_accepted() {
        let config = LabelConfig::resolve(Some(&json!({
            "selected_fields_for_label": ["surname"]
        })));
        assert_eq!(config.selected_fields(), ["surname"]);
        assert!(!config.extra.contains_key("selected_fields_for_label"));
    }

    #[test]
    fn test_current_selection_key_wins_over_legacy() {
        let config = LabelConfig::resolve(Some(&json!({
            "columns": 3,
            "display_selected_fields_on_label": ["NAME1"],
            "selected_fields_for_label": ["surname"]
        })));
        assert_eq!(config.columns, 3);
        assert_eq!(config.selected_fields(), ["NAME1"]);
    }

    #[test]
    fn test_legacy_key_over_saved_config_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let saved = LabelConfig::resolve(Some(&json!({"rows": 5})));
        save_config(&path, &saved).unwrap();

        let current = serde_json::to_value(load_config(Some(&path))).unwrap();
        let merged = merge_values(current, &json!({"selected_fields_for_label": ["surname"]}));
        let config = LabelConfig::from_merged(merged).unwrap();
        assert_eq!(config.rows, 5);
        assert_eq!(config.selected_fields(), saved.selected_fields());
    }

    #[test]
    fn test_maps_merge_key_by_key() {
        let config = LabelConfig::resolve(Some(&json!({
            "mail_zone_map": {"6": "Moon"}
        })));
        assert_eq!(config.mail_zone_map.len(), 6);
        assert_eq!(config.mail_zone_map["1"], "Internal circulation");
        assert_eq!(config.mail_zone_map["6"], "Moon");
    }

    #[test]
    fn test_malformed_override_falls_back_to_defaults() {
        let defaults = LabelConfig::resolve(None);
        assert_eq!(LabelConfig::resolve(Some(&json!([1, 2, 3]))), defaults);
        assert_eq!(LabelConfig::resolve(Some(&json!({"columns": "two"}))), defaults);
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let config = LabelConfig::resolve(Some(&json!({"barcode": {"height": 10}})));
        assert_eq!(config.extra["barcode"], json!({"height": 10}));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["barcode"]["height"], 10);
    }

    #[test]
    fn test_font_fallback_chain() {
        let config = LabelConfig::resolve(Some(&json!({
            "fonts": {"title": {"name": "", "size": -3}}
        })));
        let title = config.font(FontRole::Title);
        assert_eq!(title.name, "Helvetica-Bold");
        assert_eq!(title.size, 10.0);

        let mut bare = LabelConfig::resolve(None);
        bare.fonts.clear();
        assert_eq!(bare.font(FontRole::Body).name, "Helvetica");
        assert!(!bare.has_cjk_font());
    }

    #[test]
    fn test_invalid_color_falls_back_to_black() {
        let config = LabelConfig::resolve(Some(&json!({
            "colors": {"title": "#00008B", "body": "navy"}
        })));
        let title = config.color(ColorRole::Title);
        assert_eq!(title.r, 0.0);
        assert!((title.b - 139.0 / 255.0).abs() < 1e-6);
        assert_eq!(config.color(ColorRole::Body), Rgb::BLACK);
    }

    #[test]
    fn test_right_panel_text_is_capped() {
        let config = LabelConfig::resolve(Some(&json!({"custom_right_panel_text": "EXTRA"})));
        assert_eq!(config.right_panel_text(), "EXT");
    }

    #[test]
    fn test_resolve_publications_by_name_and_column() {
        let config = LabelConfig::resolve(None);
        let (columns, codes) = config.resolve_publications(&[
            "Bulletin (English Only)".to_string(),
            "AR".to_string(),
            "BE".to_string(),
        ]);
        assert_eq!(columns, ["BE", "AR"]);
        assert_eq!(codes, ["BE", "AR"]);
    }

    #[test]
    fn test_page_dimensions() {
        let config = LabelConfig::resolve(Some(&json!({"page_size": "letter"})));
        assert_eq!(config.page_dimensions(), (612.0, 792.0));
        let unknown = LabelConfig::resolve(Some(&json!({"page_size": "B9"})));
        assert_eq!(unknown.page_dimensions(), A4);
    }

    #[test]
    fn test_load_config_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(load_config(Some(&missing)), LabelConfig::resolve(None));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert_eq!(load_config(Some(&broken)), LabelConfig::resolve(None));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("label_config.json");
        let config = LabelConfig::resolve(Some(&json!({
            "rows": 5,
            "bulletin_text": "Newsletter"
        })));
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(Some(&path)), config);
    }
}
