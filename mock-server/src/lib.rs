//! In-memory stand-in for the practice's automation API.
//!
//! Serves the same routes and response envelopes as the real service under
//! `/automation-api`, backed by a `Store` behind a `RwLock`. Amounts are kept
//! in cents and reported in currency units.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_PREFIX: &str = "/automation-api";

pub const STATUS_PENDING: i64 = 0;
pub const STATUS_PAID: i64 = 1;
pub const STATUS_CANCELLED: i64 = 3;
/// Status of newly created patients and sessions.
pub const STATUS_ACTIVE: i64 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub occupation: Option<String>,
    pub gender: Option<String>,
    pub status: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub consultation_type: String,
    pub modality: String,
    pub service_type: String,
    pub duration: u32,
    /// Cents.
    pub value: i64,
    pub notes: Option<String>,
    pub status: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: String,
    pub patient_id: Uuid,
    pub session_id: Option<Uuid>,
    pub date: NaiveDate,
    /// Cents.
    pub value: i64,
    pub status: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub occupation: Option<String>,
    pub gender: Option<String>,
    pub status: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    pub patient_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub consultation_type: Option<String>,
    pub modality: Option<String>,
    pub service_type: Option<String>,
    pub duration: Option<u32>,
    pub value: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub patient_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    users: HashSet<String>,
    patients: Vec<Patient>,
    sessions: Vec<Session>,
    payments: Vec<Payment>,
}

impl Store {
    pub fn add_user(&mut self, user_id: &str) {
        self.users.insert(user_id.to_string());
    }

    pub fn add_patient(&mut self, patient: Patient) {
        self.patients.push(patient);
    }

    pub fn add_session(&mut self, session: Session) {
        self.sessions.push(session);
    }

    pub fn add_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    /// One user with two patients, a few sessions and payments in every state.
    pub fn demo(user_id: &str) -> Self {
        let mut store = Store::default();
        store.add_user(user_id);
        let today = Utc::now().date_naive();
        let days_ago = |n: u64| today.checked_sub_days(chrono::Days::new(n)).unwrap_or(today);

        let maria = Patient {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: "Maria Oliveira".into(),
            email: Some("maria@email.com".into()),
            phone: Some("(11) 98888-7777".into()),
            cpf: None,
            birth_date: Some("1985-06-12".into()),
            address: None,
            occupation: Some("Pharmacist".into()),
            gender: Some("Female".into()),
            status: STATUS_ACTIVE,
        };
        let carlos = Patient {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: "Carlos Lima".into(),
            email: None,
            phone: Some("(21) 97777-6666".into()),
            cpf: None,
            birth_date: Some("1992-11-03".into()),
            address: None,
            occupation: None,
            gender: Some("Male".into()),
            status: STATUS_ACTIVE,
        };

        for (patient, offset, status) in [
            (&maria, 3, STATUS_PAID),
            (&maria, 10, STATUS_PENDING),
            (&carlos, 5, STATUS_PAID),
            (&carlos, 45, STATUS_CANCELLED),
        ] {
            let session = Session {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                patient_id: patient.id,
                date: days_ago(offset),
                time: "14:00:00".into(),
                consultation_type: "Individual therapy".into(),
                modality: "Online".into(),
                service_type: "Follow-up".into(),
                duration: 50,
                value: 15000,
                notes: None,
                status: STATUS_ACTIVE,
            };
            store.add_payment(Payment {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                patient_id: patient.id,
                session_id: Some(session.id),
                date: session.date,
                value: session.value,
                status,
            });
            store.add_session(session);
        }
        store.add_patient(maria);
        store.add_patient(carlos);
        store
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response in the service's `{success: false, message}` envelope.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = Json(json!({"success": false, "message": self.message}));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiFailure>;

pub fn app(db: Db) -> Router {
    let api = Router::new()
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/ping", get(ping))
        .route("/user/{user_id}/stats", get(user_stats))
        .route(
            "/user/{user_id}/patients",
            get(list_patients).post(create_patient),
        )
        .route("/user/{user_id}/patient/{patient_id}", get(get_patient))
        .route(
            "/user/{user_id}/patient/{patient_id}/agenda-sessions",
            get(patient_sessions),
        )
        .route(
            "/user/{user_id}/agenda-sessions",
            get(list_sessions).post(create_session),
        )
        .route("/user/{user_id}/financial", get(financial))
        .with_state(db);
    Router::new().nest(API_PREFIX, api)
}

pub fn shared(store: Store) -> Db {
    Arc::new(RwLock::new(store))
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

async fn status() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Automation API is up",
        "timestamp": timestamp(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Automation API is healthy",
        "timestamp": timestamp(),
        "status": "OK",
    }))
}

async fn ping() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "PONG",
        "timestamp": timestamp(),
    }))
}

fn require_user(store: &Store, user_id: &str) -> ApiResult<()> {
    if store.users.contains(user_id) {
        Ok(())
    } else {
        Err(ApiFailure::not_found("user not found"))
    }
}

fn parse_date(raw: Option<&str>, field: &str) -> ApiResult<Option<NaiveDate>> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiFailure::bad_request(format!("{field} must be YYYY-MM-DD"))),
    }
}

fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

fn to_currency(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn find_patient<'a>(store: &'a Store, user_id: &str, patient_id: &str) -> Option<&'a Patient> {
    let id = Uuid::parse_str(patient_id).ok()?;
    store
        .patients
        .iter()
        .find(|p| p.id == id && p.user_id == user_id)
}

async fn user_stats(
    State(db): State<Db>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    require_user(&store, &user_id)?;
    let owned = |uid: &String| *uid == user_id;
    let total_received: i64 = store
        .payments
        .iter()
        .filter(|p| owned(&p.user_id) && p.status == STATUS_PAID)
        .map(|p| p.value)
        .sum();
    Ok(Json(json!({
        "success": true,
        "data": {
            "totalPatients": store.patients.iter().filter(|p| owned(&p.user_id)).count(),
            "totalSessions": store.sessions.iter().filter(|s| owned(&s.user_id)).count(),
            "totalPayments": store.payments.iter().filter(|p| owned(&p.user_id)).count(),
            "totalReceived": to_currency(total_received),
        }
    })))
}

async fn list_patients(
    State(db): State<Db>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    require_user(&store, &user_id)?;
    let mut patients: Vec<&Patient> = store
        .patients
        .iter()
        .filter(|p| p.user_id == user_id)
        .collect();
    patients.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(json!({
        "success": true,
        "data": patients,
        "total": patients.len(),
    })))
}

async fn get_patient(
    State(db): State<Db>,
    Path((user_id, patient_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    require_user(&store, &user_id)?;
    let patient = find_patient(&store, &user_id, &patient_id)
        .ok_or_else(|| ApiFailure::not_found("patient not found for this user"))?;
    Ok(Json(json!({"success": true, "data": patient})))
}

fn sessions_response(mut sessions: Vec<&Session>) -> Json<Value> {
    sessions.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
    Json(json!({
        "success": true,
        "data": sessions,
        "total": sessions.len(),
    }))
}

async fn list_sessions(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Json<Value>> {
    let start = parse_date(filter.start_date.as_deref(), "startDate")?;
    let end = parse_date(filter.end_date.as_deref(), "endDate")?;
    let store = db.read().await;
    require_user(&store, &user_id)?;
    let patient = filter.patient_id.as_deref().filter(|s| !s.is_empty());
    let sessions = store
        .sessions
        .iter()
        .filter(|s| s.user_id == user_id)
        .filter(|s| patient.map_or(true, |p| s.patient_id.to_string() == p))
        .filter(|s| in_range(s.date, start, end))
        .collect();
    Ok(sessions_response(sessions))
}

async fn patient_sessions(
    State(db): State<Db>,
    Path((user_id, patient_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let store = db.read().await;
    require_user(&store, &user_id)?;
    let patient = find_patient(&store, &user_id, &patient_id)
        .ok_or_else(|| ApiFailure::not_found("patient not found for this user"))?;
    let sessions = store
        .sessions
        .iter()
        .filter(|s| s.user_id == user_id && s.patient_id == patient.id)
        .collect();
    Ok(sessions_response(sessions))
}

async fn financial(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Query(filter): Query<DateFilter>,
) -> ApiResult<Json<Value>> {
    let start = parse_date(filter.start_date.as_deref(), "startDate")?;
    let end = parse_date(filter.end_date.as_deref(), "endDate")?;
    let store = db.read().await;
    require_user(&store, &user_id)?;
    let mut payments: Vec<&Payment> = store
        .payments
        .iter()
        .filter(|p| p.user_id == user_id && in_range(p.date, start, end))
        .collect();
    payments.sort_by(|a, b| b.date.cmp(&a.date));

    let total_with = |status: i64| -> i64 {
        payments
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.value)
            .sum()
    };
    let summary = json!({
        "totalReceived": to_currency(total_with(STATUS_PAID)),
        "totalPending": to_currency(total_with(STATUS_PENDING)),
        "totalCancelled": to_currency(total_with(STATUS_CANCELLED)),
        "totalPayments": payments.len(),
    });
    Ok(Json(json!({
        "success": true,
        "data": {"payments": payments, "summary": summary},
    })))
}

fn required<'a>(value: &'a Option<String>, message: &str) -> ApiResult<&'a str> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiFailure::bad_request(message))
}

async fn create_patient(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Json(input): Json<CreatePatient>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let name = required(&input.name, "patient name is required")?.to_string();
    required(&input.phone, "patient phone is required")?;
    required(&input.birth_date, "birth date is required")?;
    required(&input.gender, "gender is required")?;

    let mut store = db.write().await;
    require_user(&store, &user_id)?;
    let same_user = |p: &&Patient| p.user_id == user_id;
    if let Some(cpf) = input.cpf.as_deref() {
        if store
            .patients
            .iter()
            .filter(same_user)
            .any(|p| p.cpf.as_deref() == Some(cpf))
        {
            return Err(ApiFailure::bad_request(
                "a patient with this CPF already exists for this user",
            ));
        }
    }
    if let Some(email) = input.email.as_deref() {
        if store
            .patients
            .iter()
            .filter(same_user)
            .any(|p| p.email.as_deref() == Some(email))
        {
            return Err(ApiFailure::bad_request(
                "a patient with this email already exists for this user",
            ));
        }
    }

    let patient = Patient {
        id: Uuid::new_v4(),
        user_id: user_id.clone(),
        name,
        email: input.email,
        phone: input.phone,
        cpf: input.cpf,
        birth_date: input.birth_date,
        address: input.address,
        occupation: input.occupation,
        gender: input.gender,
        status: input.status.unwrap_or(STATUS_ACTIVE),
    };
    store.add_patient(patient.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "patient created",
            "data": patient,
        })),
    ))
}

async fn create_session(
    State(db): State<Db>,
    Path(user_id): Path<String>,
    Json(input): Json<CreateSession>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let patient_id = required(&input.patient_id, "patientId is required")?.to_string();
    let date = parse_date(
        Some(required(&input.date, "date is required")?),
        "date",
    )?
    .ok_or_else(|| ApiFailure::bad_request("date is required"))?;
    let time = required(&input.time, "time is required")?.to_string();
    let consultation_type =
        required(&input.consultation_type, "consultationType is required")?.to_string();
    let modality = required(&input.modality, "modality is required")?.to_string();
    let service_type = required(&input.service_type, "serviceType is required")?.to_string();
    let duration = input
        .duration
        .ok_or_else(|| ApiFailure::bad_request("duration is required"))?;
    let value = input
        .value
        .ok_or_else(|| ApiFailure::bad_request("value is required"))?;

    let mut store = db.write().await;
    require_user(&store, &user_id)?;
    let patient = find_patient(&store, &user_id, &patient_id)
        .ok_or_else(|| ApiFailure::not_found("patient not found for this user"))?;

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user_id.clone(),
        patient_id: patient.id,
        date,
        time,
        consultation_type,
        modality,
        service_type,
        duration,
        value,
        notes: input.notes,
        status: input.status.unwrap_or(STATUS_ACTIVE),
    };
    store.add_session(session.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "session scheduled",
            "data": session,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(name: &str) -> Patient {
        Patient {
            id: Uuid::nil(),
            user_id: "u1".into(),
            name: name.into(),
            email: None,
            phone: None,
            cpf: None,
            birth_date: Some("1990-01-01".into()),
            address: None,
            occupation: None,
            gender: None,
            status: STATUS_ACTIVE,
        }
    }

    #[test]
    fn patient_serializes_camel_case() {
        let json = serde_json::to_value(patient("Ana")).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["birthDate"], "1990-01-01");
        assert_eq!(json["status"], 1);
    }

    #[test]
    fn create_patient_fields_are_all_optional_on_the_wire() {
        let input: CreatePatient = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.status.is_none());
    }

    #[test]
    fn create_session_reads_camel_case() {
        let input: CreateSession = serde_json::from_str(
            r#"{"patientId":"p","consultationType":"t","serviceType":"s","duration":60}"#,
        )
        .unwrap();
        assert_eq!(input.patient_id.as_deref(), Some("p"));
        assert_eq!(input.consultation_type.as_deref(), Some("t"));
        assert_eq!(input.duration, Some(60));
    }

    #[test]
    fn date_parsing_accepts_only_iso_dates() {
        assert_eq!(parse_date(None, "d").unwrap(), None);
        assert_eq!(parse_date(Some(""), "d").unwrap(), None);
        assert_eq!(
            parse_date(Some("2024-02-29"), "d").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(parse_date(Some("29/02/2024"), "d").is_err());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        assert!(in_range(d(1), Some(d(1)), Some(d(31))));
        assert!(in_range(d(31), Some(d(1)), Some(d(31))));
        assert!(!in_range(d(15), Some(d(16)), None));
        assert!(in_range(d(15), None, None));
    }

    #[test]
    fn demo_store_has_one_user_and_two_patients() {
        let store = Store::demo("u1");
        assert!(store.users.contains("u1"));
        assert_eq!(store.patients.len(), 2);
        assert_eq!(store.sessions.len(), 4);
        assert_eq!(store.payments.len(), 4);
    }

    #[test]
    fn cents_convert_to_currency() {
        assert_eq!(to_currency(15050), 150.5);
    }
}
