//! Tests for the label server API
//!
//! Test categories:
//! - Health and upload handling
//! - Generation and export through the full router
//! - Retention window expiry
//! - Configuration persistence

#[cfg(test)]
mod http_endpoint_tests {
    //! HTTP endpoint integration tests using axum-test

    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use chrono::Duration;
    use label_core::{Record, Table};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::state::AppState;
    use crate::store::testing::ManualClock;
    use crate::store::UploadStore;

    const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

    struct Harness {
        server: TestServer,
        clock: Arc<ManualClock>,
        dir: TempDir,
    }

    /// Create a test server backed by a temporary upload dir and config file
    fn create_test_server() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new());
        let store = UploadStore::open(
            dir.path().join("uploads"),
            Duration::minutes(60),
            clock.clone(),
        )
        .unwrap();
        let state = AppState::new(store, dir.path().join("config.json"));

        Harness {
            server: TestServer::new(crate::app(state)).unwrap(),
            clock,
            dir,
        }
    }

    /// Members table: even rows are category 1, odd rows category 2
    fn members_xlsx(n: usize) -> Vec<u8> {
        let columns: Vec<String> = ["TITLE1", "NAME1", "add1", "category_ids", "status_ids"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = (0..n)
            .map(|i| {
                Record::new()
                    .with("TITLE1", "Dr.")
                    .with("NAME1", format!("Member {}", i))
                    .with("add1", format!("{} Harbour Road", i + 1))
                    .with("category_ids", if i % 2 == 0 { "1,5" } else { "2" })
                    .with("status_ids", "1")
            })
            .collect();
        label_sheet::table_to_xlsx_bytes(&Table::with_rows(columns, rows)).unwrap()
    }

    async fn upload(server: &TestServer, filename: &str, bytes: Vec<u8>) -> serde_json::Value {
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(bytes).file_name(filename).mime_type(XLSX_MIME),
        );
        let response = server.post("/upload").multipart(form).await;
        response.assert_status_ok();
        response.json::<serde_json::Value>()
    }

    // ============================================================
    // Health and uploads
    // ============================================================

    #[tokio::test]
    async fn test_health_returns_200() {
        let h = create_test_server();
        let response = h.server.get("/health").await;
        response.assert_status_ok();

        let json = response.json::<serde_json::Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "label-api");
    }

    #[tokio::test]
    async fn test_upload_returns_preview() {
        let h = create_test_server();
        let json = upload(&h.server, "members.xlsx", members_xlsx(5)).await;

        assert_eq!(json["success"], true);
        assert_eq!(json["filename"], "members.xlsx");
        assert_eq!(json["rows"], 5);
        assert_eq!(
            json["columns"],
            json!(["TITLE1", "NAME1", "add1", "category_ids", "status_ids"])
        );
        assert_eq!(json["preview"].as_array().unwrap().len(), 3);
        assert_eq!(json["preview"][1]["NAME1"], "Member 1");

        let files = h.server.get("/files").await.json::<serde_json::Value>();
        assert_eq!(files["files"][0]["filename"], "members.xlsx");
    }

    #[tokio::test]
    async fn test_upload_rejects_other_extensions() {
        let h = create_test_server();
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"a,b\n1,2\n".to_vec()).file_name("members.csv"),
        );
        let response = h.server.post("/upload").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let json = response.json::<serde_json::Value>();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INVALID_REQUEST");
        assert!(json["error"].as_str().unwrap().contains(".xlsx"));
    }

    #[tokio::test]
    async fn test_upload_rejects_unreadable_workbook() {
        let h = create_test_server();
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"not a workbook".to_vec()).file_name("broken.xlsx"),
        );
        let response = h.server.post("/upload").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(h.server.get("/files").await.json::<serde_json::Value>()["files"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    // ============================================================
    // Generation and export
    // ============================================================

    #[tokio::test]
    async fn test_generate_returns_pdf_attachment() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(33)).await;

        let response = h
            .server
            .post("/generate")
            .json(&json!({"filename": "members.xlsx", "config": {}}))
            .await;
        response.assert_status_ok();

        assert_eq!(response.header("content-type"), "application/pdf");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"labels_members.pdf\""
        );
        assert_eq!(response.header("x-label-count"), "33");
        assert_eq!(response.header("x-page-count"), "3");
        assert!(response.as_bytes().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_generate_applies_filters_and_limit() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(10)).await;

        let response = h
            .server
            .post("/generate")
            .json(&json!({
                "filename": "members.xlsx",
                "config": {"category_filter": "5", "limit": 3}
            }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("x-label-count"), "3");
    }

    #[tokio::test]
    async fn test_generate_accepts_null_options() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(4)).await;

        let response = h
            .server
            .post("/generate")
            .json(&json!({
                "filename": "members.xlsx",
                "config": {"publication_columns": null, "filter_mode": null, "limit": null}
            }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("x-label-count"), "4");

        let response = h
            .server
            .post("/generate")
            .json(&json!({"filename": "members.xlsx", "config": null}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.header("x-label-count"), "4");
    }

    #[tokio::test]
    async fn test_generate_with_no_matches_is_no_data() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(4)).await;

        let response = h
            .server
            .post("/generate")
            .json(&json!({"filename": "members.xlsx", "config": {"category_filter": "9"}}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["code"], "NO_DATA");
    }

    #[tokio::test]
    async fn test_generate_unknown_file_is_404() {
        let h = create_test_server();
        let response = h
            .server
            .post("/generate")
            .json(&json!({"filename": "missing.xlsx"}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<serde_json::Value>()["code"], "FILE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_export_filtered_round_trips() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(6)).await;

        let response = h
            .server
            .post("/export-filtered")
            .json(&json!({"filename": "members.xlsx", "config": {"category_filter": "2"}}))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"filtered_members.xlsx\""
        );

        let table = label_sheet::read_table_from_bytes(response.as_bytes().to_vec()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.columns,
            vec!["TITLE1", "NAME1", "add1", "category_ids", "status_ids"]
        );
        assert_eq!(table.rows[0].text("NAME1"), "Member 1");
    }

    #[tokio::test]
    async fn test_token_census_counts_and_describes() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(5)).await;

        let response = h.server.get("/files/members.xlsx/tokens/category_ids").await;
        response.assert_status_ok();

        let json = response.json::<serde_json::Value>();
        let tokens = json["tokens"].as_array().unwrap();
        let counted: Vec<(String, u64)> = tokens
            .iter()
            .map(|t| (t["token"].as_str().unwrap().to_string(), t["count"].as_u64().unwrap()))
            .collect();
        assert_eq!(
            counted,
            vec![("1".to_string(), 3), ("5".to_string(), 3), ("2".to_string(), 2)]
        );

        let status = h
            .server
            .get("/files/members.xlsx/tokens/status_ids")
            .await
            .json::<serde_json::Value>();
        assert_eq!(status["tokens"][0]["count"], 5);
        assert_eq!(
            status["tokens"][0]["description"],
            "CU Admin Units/Academic Depts/Research Centres"
        );
    }

    #[tokio::test]
    async fn test_token_census_unknown_column_is_400() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(2)).await;

        let response = h.server.get("/files/members.xlsx/tokens/MAIL_ZONE").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    // ============================================================
    // Retention
    // ============================================================

    #[tokio::test]
    async fn test_expired_upload_is_not_found() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(2)).await;

        h.clock.advance(Duration::minutes(61));
        let response = h
            .server
            .post("/generate")
            .json(&json!({"filename": "members.xlsx"}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let files = h.server.get("/files").await.json::<serde_json::Value>();
        assert!(files["files"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_deleted_behind_live_entry_is_not_found() {
        let h = create_test_server();
        upload(&h.server, "members.xlsx", members_xlsx(2)).await;
        std::fs::remove_file(h.dir.path().join("uploads").join("members.xlsx")).unwrap();

        let response = h
            .server
            .post("/generate")
            .json(&json!({"filename": "members.xlsx"}))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<serde_json::Value>()["code"], "FILE_NOT_FOUND");
    }

    // ============================================================
    // Configuration
    // ============================================================

    #[tokio::test]
    async fn test_config_update_persists_and_reset_restores() {
        let h = create_test_server();

        let defaults = h.server.get("/config").await.json::<serde_json::Value>();
        assert_eq!(defaults["columns"], 2);

        let response = h
            .server
            .post("/config")
            .json(&json!({"columns": 3, "mail_zone_map": {"6": "Moon"}}))
            .await;
        response.assert_status_ok();
        assert!(h.dir.path().join("config.json").exists());

        let updated = h.server.get("/config").await.json::<serde_json::Value>();
        assert_eq!(updated["columns"], 3);
        assert_eq!(updated["rows"], 8);
        assert_eq!(updated["mail_zone_map"]["6"], "Moon");
        assert_eq!(updated["mail_zone_map"]["1"], "Internal circulation");

        h.server.post("/config/reset").await.assert_status_ok();
        let reset = h.server.get("/config").await.json::<serde_json::Value>();
        assert_eq!(reset["columns"], 2);
        assert!(reset["mail_zone_map"].get("6").is_none());
    }

    #[tokio::test]
    async fn test_config_update_with_legacy_selection_key() {
        let h = create_test_server();
        h.server
            .post("/config")
            .json(&json!({"rows": 5}))
            .await
            .assert_status_ok();

        let response = h
            .server
            .post("/config")
            .json(&json!({"selected_fields_for_label": ["surname"]}))
            .await;
        response.assert_status_ok();

        let config = h.server.get("/config").await.json::<serde_json::Value>();
        assert_eq!(config["rows"], 5);
        assert_eq!(
            config["display_selected_fields_on_label"],
            json!(["TITLE1", "NAME1", "surname", "add1", "add2", "state"])
        );
        assert!(config.get("selected_fields_for_label").is_none());
    }

    #[tokio::test]
    async fn test_config_update_rejects_non_object() {
        let h = create_test_server();
        let response = h.server.post("/config").json(&json!([1, 2, 3])).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
