use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use directory_cell::{DirectoryError, DirectoryService};
use session_cell::Session;
use shared_api::ApiClient;
use shared_utils::test_utils::{MockApiResponses, TestConfig, TestPatient};

const TOKEN: &str = "test-token";

fn create_service(base_url: &str) -> DirectoryService {
    let config = TestConfig::with_base_url(base_url).to_app_config();
    DirectoryService::new(Arc::new(ApiClient::new(&config).unwrap()))
}

fn session_at(hospital_id: Option<&str>) -> Session {
    let session = Session::new(TOKEN, TestPatient::default().to_profile());
    match hospital_id {
        Some(id) => session.with_hospital(id, "City General"),
        None => session,
    }
}

#[tokio::test]
async fn test_list_hospitals_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hospital"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::hospital_response("h-1", "City General"),
            MockApiResponses::hospital_response("h-2", "Lakeside"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let hospitals = service.list_hospitals(&session_at(None)).await.unwrap();

    assert_eq!(hospitals.len(), 2);
    assert_eq!(hospitals[1].hospital_id, "h-2");
}

#[tokio::test]
async fn test_list_hospitals_reads_stored_records_and_skips_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hospital"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::stored_hospital_response("HOSP-1", "665f1c", "City General"),
            { "_id": "665f1d", "name": "Lakeside" },
            { "hospital_id": "HOSP-3" },
        ])))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let hospitals = service.list_hospitals(&session_at(None)).await.unwrap();

    let ids: Vec<&str> = hospitals.iter().map(|h| h.hospital_id.as_str()).collect();
    assert_eq!(ids, vec!["HOSP-1", "665f1d"]);
}

#[tokio::test]
async fn test_get_hospital_with_object_id_and_hospital_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hospital/HOSP-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockApiResponses::stored_hospital_response("HOSP-1", "665f1c", "City General"),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let hospital = service.get_hospital(&session_at(None), "HOSP-1").await.unwrap();

    assert_eq!(hospital.hospital_id, "HOSP-1");
    assert_eq!(hospital.name, "City General");
}

#[tokio::test]
async fn test_get_missing_hospital() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hospital/h-404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(MockApiResponses::error_response("Not found")),
        )
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let result = service.get_hospital(&session_at(None), "h-404").await;

    assert_matches!(result, Err(DirectoryError::HospitalNotFound(id)) if id == "h-404");
}

#[tokio::test]
async fn test_departments_use_selected_hospital() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/patient-appointments/departments/h-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "departments": ["Cardiology", "Dermatology"]
        })))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let departments = service.list_departments(&session_at(Some("h-1"))).await.unwrap();

    assert_eq!(departments, vec!["Cardiology", "Dermatology"]);
}

#[tokio::test]
async fn test_departments_without_hospital_selection() {
    let service = create_service("http://localhost:3000");
    let result = service.list_departments(&session_at(None)).await;

    assert_matches!(result, Err(DirectoryError::NoHospitalSelected));
}

#[tokio::test]
async fn test_list_doctors_filters_by_hospital_and_department() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/patient-appointments/doctors"))
        .and(query_param("hospitalId", "h-1"))
        .and(query_param("department", "Cardiology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "doctors": [MockApiResponses::doctor_response("d-1", "Dr. Shah", "Cardiology")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let doctors = service
        .list_doctors(&session_at(Some("h-1")), "Cardiology")
        .await
        .unwrap();

    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0].id, "d-1");
    assert_eq!(doctors[0].department.as_deref(), Some("Cardiology"));
}

#[tokio::test]
async fn test_list_doctors_with_empty_department_skips_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let doctors = service.list_doctors(&session_at(Some("h-1")), " ").await.unwrap();

    assert!(doctors.is_empty());
}

#[tokio::test]
async fn test_list_hospital_doctors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doctors/hospital/h-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::doctor_response("d-1", "Dr. Shah", "Cardiology"),
            MockApiResponses::doctor_response("d-2", "Dr. Okafor", "Dermatology"),
        ])))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let doctors = service
        .list_hospital_doctors(&session_at(None), "h-9")
        .await
        .unwrap();

    assert_eq!(doctors.len(), 2);
}

#[tokio::test]
async fn test_list_doctors_skips_unreadable_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/patient-appointments/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "doctors": [
                MockApiResponses::doctor_response("d-1", "Dr. Shah", "Cardiology"),
                { "name": "Dr. Nobody" },
                { "_id": "d-3", "id": 3, "name": "Dr. Okafor" },
            ]
        })))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server.uri());
    let doctors = service
        .list_doctors(&session_at(Some("h-1")), "Cardiology")
        .await
        .unwrap();

    let ids: Vec<&str> = doctors.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["d-1", "d-3"]);
}
