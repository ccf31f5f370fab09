//! Label content: which fields appear, in what order, and how they are drawn

use crate::config::{ColorRole, FontRole, LabelConfig, ResolvedFont, Rgb};
use crate::layout::LabelRect;
use crate::record::Record;
use crate::surface::Surface;

/// Recipient fields in display order
pub const RECIPIENT_FIELDS: [&str; 4] = ["TITLE1", "NAME1", "surname", "post"];

/// Address fields in display order
pub const ADDRESS_FIELDS: [&str; 9] = [
    "co_name",
    "co_name_chi",
    "UNIT_NAME",
    "unit_name_chi",
    "sub_unit",
    "sub_unit_chi",
    "add1",
    "add2",
    "state",
];

const LEGACY_RECIPIENT_FIELDS: [&str; 3] = ["TITLE1", "NAME1", "surname"];
const LEGACY_ADDRESS_FIELDS: [&str; 3] = ["add1", "add2", "state"];

pub const RECEIPT_COLUMN: &str = "RECEIVE_ID";

const PADDING: f32 = 5.0;
const NAME_OFFSET: f32 = 15.0;
const ADDRESS_OFFSET: f32 = 12.0;
const ADDRESS_LEADING: f32 = 3.0;
const EMPHASIS_MIN_SIZE: f32 = 14.0;
const BULLETIN_MIN_SIZE: f32 = 6.0;
const LEFT_ZONE_RATIO: f32 = 0.75;

/// Badge text for the right panel.
///
/// Each code whose same-named column holds a count of at least one becomes
/// `"{count} {code}"`; entries are joined with `" + "` and followed by the
/// custom text when there is any.
pub fn badge_text(record: &Record, codes: &[String], custom: &str) -> String {
    let entries: Vec<String> = codes
        .iter()
        .filter_map(|code| {
            record
                .get(code)
                .as_count()
                .filter(|count| *count >= 1)
                .map(|count| format!("{} {}", count, code))
        })
        .collect();

    match (entries.is_empty(), custom.is_empty()) {
        (true, _) => custom.to_string(),
        (false, true) => entries.join(" + "),
        (false, false) => format!("{} {}", entries.join(" + "), custom),
    }
}

/// Text content of one label, independent of any drawing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelContent {
    pub recipient: String,
    pub address_lines: Vec<String>,
    pub receipt: Option<String>,
    pub badge: String,
}

impl LabelContent {
    pub fn compose(record: &Record, config: &LabelConfig) -> Self {
        let selected = config.selected_fields();
        let is_selected = |key: &&str| selected.iter().any(|s| s == key);

        let (recipient, address_lines) = if selected.is_empty() {
            (
                recipient_line(record, LEGACY_RECIPIENT_FIELDS.iter().copied()),
                non_empty_fields(record, LEGACY_ADDRESS_FIELDS.iter().copied()),
            )
        } else {
            (
                recipient_line(record, RECIPIENT_FIELDS.iter().copied().filter(is_selected)),
                non_empty_fields(record, ADDRESS_FIELDS.iter().copied().filter(is_selected)),
            )
        };

        let receive_id = record.text(RECEIPT_COLUMN);
        Self {
            recipient,
            address_lines,
            receipt: (!receive_id.is_empty()).then(|| format!("Rec. # {}", receive_id)),
            badge: badge_text(record, config.publication_codes(), &config.right_panel_text()),
        }
    }
}

fn recipient_line<'a>(record: &Record, fields: impl Iterator<Item = &'a str>) -> String {
    let mut parts: Vec<String> = Vec::new();
    for key in fields {
        let value = record.text(key);
        if value.is_empty() {
            continue;
        }
        if key == "post" {
            if !parts.is_empty() {
                parts.push(format!("({})", value));
            }
        } else {
            parts.push(value);
        }
    }
    parts.join(" ")
}

fn non_empty_fields<'a>(record: &Record, fields: impl Iterator<Item = &'a str>) -> Vec<String> {
    fields
        .map(|key| record.text(key))
        .filter(|value| !value.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
struct Style {
    font: String,
    size: f32,
}

impl From<ResolvedFont> for Style {
    fn from(font: ResolvedFont) -> Self {
        Self {
            font: font.name,
            size: font.size,
        }
    }
}

/// Draws labels with styles resolved once per run
pub struct LabelPainter<'a, S: Surface> {
    config: &'a LabelConfig,
    surface: &'a mut S,
    recipient: Style,
    address: Style,
    receipt: Style,
    emphasis: Style,
    bulletin: Style,
    title_color: Rgb,
    body_color: Rgb,
    border_color: Rgb,
}

impl<'a, S: Surface> LabelPainter<'a, S> {
    pub fn new(config: &'a LabelConfig, surface: &'a mut S) -> Self {
        let title = config.font(FontRole::Title);
        let body = config.font(FontRole::Body);

        let cjk = config
            .has_cjk_font()
            .then(|| config.font(FontRole::Cjk))
            .filter(|cjk| {
                let registered = surface.has_font(&cjk.name);
                if !registered {
                    tracing::warn!(
                        "CJK font '{}' is not available; address text falls back to '{}' and Chinese characters will not render",
                        cjk.name,
                        body.name
                    );
                }
                registered
            });

        let (recipient, address) = match cjk {
            Some(cjk) => (Style::from(cjk.clone()), Style::from(cjk)),
            None => (Style::from(title.clone()), Style::from(body.clone())),
        };

        Self {
            config,
            recipient,
            address,
            receipt: Style {
                font: body.name.clone(),
                size: (body.size - 1.0).max(1.0),
            },
            emphasis: Style {
                font: title.name.clone(),
                size: title.size.max(EMPHASIS_MIN_SIZE),
            },
            bulletin: Style {
                font: body.name,
                size: (body.size - 1.0).max(BULLETIN_MIN_SIZE),
            },
            title_color: config.color(ColorRole::Title),
            body_color: config.color(ColorRole::Body),
            border_color: config.color(ColorRole::Border),
            surface,
        }
    }

    pub fn surface(&mut self) -> &mut S {
        self.surface
    }

    pub fn paint(&mut self, record: &Record, rect: LabelRect) {
        let content = LabelContent::compose(record, self.config);
        let divider_x = rect.x + rect.width * LEFT_ZONE_RATIO;

        if self.config.show_border {
            let width = self.config.border_width;
            self.surface
                .stroke_rect(rect.x, rect.y, rect.width, rect.height, width, self.border_color);
            self.surface.draw_line(
                (divider_x, rect.y),
                (divider_x, rect.y + rect.height),
                width,
                self.border_color,
            );
        }

        // Left zone
        let name_y = rect.y + rect.height - NAME_OFFSET;
        let text_x = rect.x + PADDING;
        if !content.recipient.is_empty() {
            self.surface.draw_text(
                text_x,
                name_y,
                &content.recipient,
                &self.recipient.font,
                self.recipient.size,
                self.title_color,
            );
        }

        let mut line_y = name_y - ADDRESS_OFFSET;
        for line in &content.address_lines {
            if line_y < rect.y {
                tracing::debug!("Address line dropped; label is full");
                break;
            }
            self.surface.draw_text(
                text_x,
                line_y,
                line,
                &self.address.font,
                self.address.size,
                self.body_color,
            );
            line_y -= self.address.size + ADDRESS_LEADING;
        }

        // Right zone
        let right_width = rect.width * (1.0 - LEFT_ZONE_RATIO);
        let center_x = divider_x + right_width / 2.0;
        let center_y = rect.y + rect.height / 2.0;

        if let Some(receipt) = &content.receipt {
            let style = &self.receipt;
            let width = self.surface.string_width(receipt, &style.font, style.size);
            let x = divider_x + (right_width - width) / 2.0;
            self.surface
                .draw_text(x, name_y, receipt, &style.font, style.size, self.body_color);
        }

        let color = self.body_color;
        let emphasis = self.emphasis.clone();
        self.draw_centered(&content.badge, center_x, center_y, &emphasis, color);

        let bulletin = self.bulletin.clone();
        let bulletin_y = center_y - 15.0;
        let bulletin_text = self.config.bulletin_text.clone();
        let bulletin_number = self.config.bulletin_number_text.clone();
        self.draw_centered(&bulletin_text, center_x, bulletin_y, &bulletin, color);
        self.draw_centered(&bulletin_number, center_x, bulletin_y - 10.0, &bulletin, color);
    }

    fn draw_centered(&mut self, text: &str, center_x: f32, y: f32, style: &Style, color: Rgb) {
        if text.is_empty() {
            return;
        }
        let width = self.surface.string_width(text, &style.font, style.size);
        self.surface
            .draw_text(center_x - width / 2.0, y, text, &style.font, style.size, color);
    }
}
