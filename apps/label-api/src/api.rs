//! API handlers for the label server
//!
//! - Spreadsheet upload and listing
//! - Label PDF generation and filtered export
//! - Persisted configuration
//! - Token census for multi-valued columns

use std::collections::BTreeMap;
use std::path::Path;

use axum::{
    body::Body,
    extract::{Multipart, Path as UrlPath, State},
    http::{header, HeaderValue},
    response::Response,
    Json,
};
use label_core::config::merge_values;
use label_core::pipeline::null_as_default;
use label_core::{
    count_tokens, save_config, select_records, GenerationOptions, LabelConfig, Selection,
    TokenCount,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::StoredFile;

const PREVIEW_COLUMNS: usize = 10;
const PREVIEW_ROWS: usize = 3;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "label-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Upload response
#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    /// Non-empty data rows
    pub rows: usize,
    /// First ten column names
    pub columns: Vec<String>,
    /// First three rows, empty cells as ""
    pub preview: Vec<BTreeMap<String, String>>,
}

/// Handler: POST /upload
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        upload = Some((filename, bytes));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::InvalidRequest("No file provided".to_string()))?;
    if !label_sheet::is_supported_file(&filename) {
        return Err(ApiError::InvalidRequest(
            "Only Excel files (.xlsx, .xls) are supported".to_string(),
        ));
    }
    info!("Upload received: {} ({} bytes)", filename, bytes.len());

    let data = bytes.to_vec();
    let table = tokio::task::spawn_blocking(move || label_sheet::read_table_from_bytes(data))
        .await??;
    let stored = state.store.save(&filename, &bytes)?;

    let preview = table
        .rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(|record| {
            table
                .columns
                .iter()
                .map(|c| (c.clone(), record.get(c).as_text()))
                .collect()
        })
        .collect();

    Ok(Json(UploadResponse {
        success: true,
        filename: stored.filename,
        rows: table.len(),
        columns: table.columns.iter().take(PREVIEW_COLUMNS).cloned().collect(),
        preview,
    }))
}

/// File list response
#[derive(Serialize)]
pub struct FileListResponse {
    pub files: Vec<StoredFile>,
}

/// Handler: GET /files
pub async fn handle_list_files(State(state): State<AppState>) -> Json<FileListResponse> {
    Json(FileListResponse {
        files: state.store.list(),
    })
}

/// Generation / export request body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: GenerationOptions,
}

/// Load the upload and apply the request's filters off the async runtime
async fn select_for_request(
    state: &AppState,
    request: GenerateRequest,
) -> Result<(Selection, LabelConfig), ApiError> {
    let path = state.store.path_for(&request.filename)?;
    let config = request.config.effective_config(state.load_config());
    debug!("Generation options: {:?}", request.config);

    tokio::task::spawn_blocking(move || {
        let table = label_sheet::read_table(&path)?;
        let selection = select_records(&table, &request.config, &config)?;
        Ok::<_, ApiError>((selection, config))
    })
    .await?
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("labels")
        .to_string()
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    let mut response = Response::new(Body::from(bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Handler: POST /generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    info!("Generate request: file={}", request.filename);
    let stem = file_stem(&request.filename);
    let config_dir = state.config_dir().map(Path::to_path_buf);
    let (selection, config) = select_for_request(&state, request).await?;

    let rendered = tokio::task::spawn_blocking(move || {
        label_pdf::render_label_pdf(&selection.table.rows, &config, config_dir.as_deref())
    })
    .await??;

    let mut response = attachment(
        rendered.bytes,
        "application/pdf",
        &format!("labels_{}.pdf", stem),
    );
    response.headers_mut().insert(
        "x-label-count",
        HeaderValue::from(rendered.summary.labels),
    );
    response
        .headers_mut()
        .insert("x-page-count", HeaderValue::from(rendered.summary.pages));
    Ok(response)
}

/// Handler: POST /export-filtered
pub async fn handle_export_filtered(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    info!("Export request: file={}", request.filename);
    let stem = file_stem(&request.filename);
    let (selection, _) = select_for_request(&state, request).await?;
    let count = selection.table.len();

    let bytes =
        tokio::task::spawn_blocking(move || label_sheet::table_to_xlsx_bytes(&selection.table))
            .await??;
    info!("Exported {} filtered records", count);

    Ok(attachment(
        bytes,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &format!("filtered_{}.xlsx", stem),
    ))
}

/// Handler: GET /config
pub async fn handle_get_config(State(state): State<AppState>) -> Json<LabelConfig> {
    Json(state.load_config())
}

/// Config update response
#[derive(Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: LabelConfig,
}

/// Handler: POST /config
///
/// Merges the body into the persisted configuration and saves the result.
pub async fn handle_update_config(
    State(state): State<AppState>,
    Json(patch): Json<Value>,
) -> Result<Json<ConfigResponse>, ApiError> {
    if !patch.is_object() {
        return Err(ApiError::InvalidRequest(
            "Configuration must be a JSON object".to_string(),
        ));
    }

    let current = serde_json::to_value(state.load_config())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let merged = merge_values(current, &patch);
    let config = LabelConfig::from_merged(merged)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid configuration: {}", e)))?;
    save_config(&state.config_path, &config)?;
    info!("Configuration updated");

    Ok(Json(ConfigResponse {
        success: true,
        config,
    }))
}

/// Handler: POST /config/reset
pub async fn handle_reset_config(
    State(state): State<AppState>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let config = LabelConfig::resolve(None);
    save_config(&state.config_path, &config)?;
    info!("Configuration reset to defaults");
    Ok(Json(ConfigResponse {
        success: true,
        config,
    }))
}

/// Token census response
#[derive(Serialize)]
pub struct TokenCensusResponse {
    pub filename: String,
    pub column: String,
    pub tokens: Vec<TokenCount>,
}

/// Handler: GET /files/:filename/tokens/:column
pub async fn handle_token_census(
    State(state): State<AppState>,
    UrlPath((filename, column)): UrlPath<(String, String)>,
) -> Result<Json<TokenCensusResponse>, ApiError> {
    let path = state.store.path_for(&filename)?;
    let config = state.load_config();
    let lookup_column = column.clone();

    let tokens = tokio::task::spawn_blocking(move || {
        let table = label_sheet::read_table(&path)?;
        let tokens = count_tokens(&table, &lookup_column, config.lookup_map(&lookup_column))?;
        Ok::<_, ApiError>(tokens)
    })
    .await??;

    Ok(Json(TokenCensusResponse {
        filename,
        column,
        tokens,
    }))
}
