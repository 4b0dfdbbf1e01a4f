//! End-to-end runs against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port on its own tokio runtime thread,
//! then drives `AutomationClient` with the real `UreqTransport`. This is the
//! check that request building, query encoding and response parsing agree
//! with an actual HTTP server.

use automation_core::{
    run_automation, ApiError, AutomationClient, ClientConfig, Listing, NewPatient, NewSession,
    RunOptions, Step,
};
use automation_mock::{shared, Store};
use chrono::Utc;
use serde_json::json;

const USER: &str = "123e4567-e89b-12d3-a456-426614174000";

/// Serve `store` on 127.0.0.1 and return the base URL.
fn spawn_server(store: Store) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            automation_mock::run(listener, shared(store)).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn empty_store() -> Store {
    let mut store = Store::default();
    store.add_user(USER);
    store
}

fn client(base_url: &str) -> AutomationClient {
    AutomationClient::new(ClientConfig::new(base_url, USER)).unwrap()
}

#[test]
fn patient_and_session_lifecycle() {
    let base_url = spawn_server(empty_store());
    let client = client(&base_url);

    // Step 1: service answers.
    assert_eq!(client.try_ping().unwrap()["message"], "PONG");

    // Step 2: no patients yet.
    let listing = Listing::from_value(&client.try_get_patients().unwrap());
    assert_eq!(listing.total, 0);
    assert!(listing.is_empty());

    // Step 3: create a patient.
    let patient = NewPatient {
        name: "Ana Souza".into(),
        phone: Some("(11) 99999-9999".into()),
        birth_date: Some("1990-01-01".into()),
        gender: Some("Female".into()),
        ..Default::default()
    };
    let created = client.try_create_patient(&patient).unwrap();
    let patient_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["status"], 1);

    // Step 4: read it back.
    let fetched = client.try_get_patient_by_id(&patient_id).unwrap();
    assert_eq!(fetched["data"]["name"], "Ana Souza");

    // Step 5: schedule a session.
    let session = NewSession {
        patient_id: patient_id.clone(),
        date: "2024-01-25".into(),
        time: "14:00:00".into(),
        consultation_type: "Individual therapy".into(),
        modality: "Online".into(),
        service_type: "First visit".into(),
        duration: 60,
        value: 15000,
        notes: None,
        status: None,
    };
    client.try_create_session(&session).unwrap();

    // Step 6: filters travel as query parameters.
    let in_window = client
        .try_get_sessions(Some("2024-01-01"), Some("2024-01-31"), Some(&patient_id))
        .unwrap();
    assert_eq!(in_window["total"], 1);
    let out_of_window = client
        .try_get_sessions(Some("2024-02-01"), None, None)
        .unwrap();
    assert_eq!(out_of_window["total"], 0);

    // Step 7: nested patient sessions.
    let by_patient = client.try_get_sessions_by_patient(&patient_id).unwrap();
    assert_eq!(by_patient["data"][0]["time"], "14:00:00");

    // Step 8: stats reflect both records.
    let stats = client.get_user_stats();
    assert_eq!(stats["data"]["totalPatients"], 1);
    assert_eq!(stats["data"]["totalSessions"], 1);
}

#[test]
fn server_errors_surface_as_typed_errors_or_empty_objects() {
    let base_url = spawn_server(empty_store());
    let client = client(&base_url);

    let err = client
        .try_get_patient_by_id("00000000-0000-0000-0000-000000000000")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
    assert_eq!(client.get_patient_by_id("missing"), json!({}));

    let err = client
        .try_get_financial_info(Some("not-a-date"), None)
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));

    // The mock requires a phone; the client only requires a name.
    let err = client
        .try_create_patient(&json!({"name": "No Phone"}))
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));
}

#[test]
fn unusual_patient_ids_reach_the_server_as_one_segment() {
    let base_url = spawn_server(Store::demo(USER));
    let client = client(&base_url);

    // Without escaping these would be a bad URI or a different resource.
    for id in ["a b", "x?y=1", "p/1", "frag#ment"] {
        let err = client.try_get_patient_by_id(id).unwrap_err();
        assert!(matches!(err, ApiError::NotFound), "{id}: {err:?}");
        let err = client.try_get_sessions_by_patient(id).unwrap_err();
        assert!(matches!(err, ApiError::NotFound), "{id}: {err:?}");
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    assert!(matches!(
        client.try_get_user_stats(),
        Err(ApiError::Transport(_))
    ));
    assert_eq!(client.get_user_stats(), json!({}));
}

#[test]
fn automation_run_against_demo_data() {
    let base_url = spawn_server(Store::demo(USER));
    let client = client(&base_url);

    let report = run_automation(&client, Utc::now().date_naive(), &RunOptions::default());

    assert!(report.is_success(), "{report}");
    assert_eq!(report.patient_total(), Some(2));
    // Demo sessions sit 3, 5, 10 and 45 days back.
    assert_eq!(report.recent_session_total(), Some(3));
    let summary = report.financial_summary().unwrap();
    assert_eq!(summary["totalReceived"], 300.0);
    assert_eq!(summary["totalPending"], 150.0);
    assert_eq!(summary["totalCancelled"], 0.0);
    assert!(report.value(Step::PatientDetail).is_some());
}
