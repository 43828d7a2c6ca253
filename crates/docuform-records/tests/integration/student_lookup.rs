//! Lookup, search and pre-fill against file and URL sources.

use docuform_core::config::RecordsSettings;
use docuform_core::ServiceState;
use docuform_records::{RecordDirectory, prefill};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{ROSTER_CSV, serve_roster, url_settings};

#[tokio::test]
async fn test_url_source_lookup_and_search() {
    let server = serve_roster(ROSTER_CSV).await;
    let directory = RecordDirectory::from_settings(&url_settings(&server)).unwrap();

    let ana = directory.lookup("1001").await.unwrap();
    assert_eq!(ana.get("Guardian Email"), Some("rosa@example.com"));
    assert_eq!(directory.service().state(), ServiceState::Ready);

    let with_l: Vec<_> = directory
        .search("l", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(with_l, vec!["1001", "1003"]);

    assert_eq!(directory.search("", 10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_file_source_sees_updates_after_refresh() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("roster.csv");
    std::fs::write(&file, ROSTER_CSV).unwrap();

    let settings = RecordsSettings {
        path: Some(file.clone()),
        ..RecordsSettings::default()
    };
    let directory = RecordDirectory::from_settings(&settings).unwrap();
    assert!(directory.lookup("1004").await.unwrap_err().is_not_found());

    std::fs::write(&file, format!("{ROSTER_CSV}1004,Dee Park,12,Room 1,,\r\n")).unwrap();
    // Still cached until refreshed.
    assert!(directory.lookup("1004").await.is_err());
    assert_eq!(directory.refresh().await.unwrap(), 4);
    assert_eq!(
        directory.lookup("1004").await.unwrap().get("Name"),
        Some("Dee Park")
    );
}

#[tokio::test]
async fn test_prefill_for_template_fields() {
    let server = serve_roster(ROSTER_CSV).await;
    let mut settings = url_settings(&server);
    settings
        .field_map
        .insert("parent".into(), "Guardian Name".into());
    let directory = RecordDirectory::from_settings(&settings).unwrap();

    let fields = ["name", "grade", "homeroom", "parent", "guardian_email", "date"];
    let values = directory.prefill("1003", fields).await.unwrap();
    assert_eq!(values.len(), 5);
    assert_eq!(values["name"], "Díaz, Luz");
    assert_eq!(values["parent"], "Mario Díaz");
    assert_eq!(values["homeroom"], "Room 12");

    let record = directory.lookup("1002").await.unwrap();
    let plain = prefill(fields, &record, &Default::default());
    assert!(!plain.contains_key("parent"));
    assert_eq!(plain["guardian_email"], "wei@example.com");
}

#[tokio::test]
async fn test_wrong_id_column_is_reported() {
    let server = serve_roster(ROSTER_CSV).await;
    let settings = RecordsSettings {
        id_column: "Learner Number".into(),
        ..url_settings(&server)
    };
    let directory = RecordDirectory::from_settings(&settings).unwrap();
    let err = directory.lookup("1001").await.unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Guardian Email"));
    assert!(matches!(directory.service().state(), ServiceState::Failed(_)));
}

#[tokio::test]
async fn test_upstream_error_status() {
    let server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/roster.csv"))
        .respond_with(ResponseTemplate::new(500).set_body_string("sheet unavailable"))
        .mount(&server)
        .await;

    let directory = RecordDirectory::from_settings(&url_settings(&server)).unwrap();
    let err = directory.search("ana", 5).await.unwrap_err();
    assert!(err.is_upstream());
    assert!(err.to_string().contains("sheet unavailable"));
}
