//! Shared fixtures for record integration tests.

use docuform_core::config::RecordsSettings;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A roster exported from a spreadsheet, with the quirks real exports have.
pub const ROSTER_CSV: &str = "\u{feff}Student ID,Name,Grade,Homeroom,Guardian Name,Guardian Email\r\n\
    1001,Ana Lima,10,Room 12,Rosa Lima,rosa@example.com\r\n\
    1002,Bo Chen,11,Room 4,Wei Chen,wei@example.com\r\n\
    ,,,,,\r\n\
    1003,\"Díaz, Luz\",9,Room 12,Mario Díaz,mario@example.com\r\n";

/// Serve `body` at `/roster.csv` and return the server.
pub async fn serve_roster(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/roster.csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/csv")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

/// Settings pointing at `server`'s roster.
pub fn url_settings(server: &MockServer) -> RecordsSettings {
    RecordsSettings {
        url: Some(format!("{}/roster.csv", server.uri())),
        ..RecordsSettings::default()
    }
}
