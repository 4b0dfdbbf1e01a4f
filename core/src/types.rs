//! Payloads and response views for the automation API.
//!
//! # Design
//! Responses stay `serde_json::Value` because every endpoint has its own
//! shape; `Listing` is a typed view over the `{total, data}` convention the
//! list endpoints share. Outgoing payloads can be any `Serialize` type that
//! produces a JSON object, and `NewPatient` / `NewSession` cover the common
//! case. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// JSON object as sent in POST bodies.
pub type JsonObject = Map<String, Value>;

/// Status given to new records that do not carry one (1 = active).
pub const DEFAULT_STATUS: i64 = 1;

pub const REQUIRED_PATIENT_FIELDS: &[&str] = &["name"];

pub const REQUIRED_SESSION_FIELDS: &[&str] = &[
    "patientId",
    "date",
    "time",
    "consultationType",
    "modality",
    "serviceType",
    "duration",
    "value",
];

/// Typed view over a `{ "total": n, "data": [...] }` response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Listing {
    pub total: u64,
    pub data: Vec<Value>,
}

impl Listing {
    /// Reads `total` and `data` from a list response. A missing `total`
    /// falls back to the number of records.
    pub fn from_value(value: &Value) -> Self {
        let data = value
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total = value
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(data.len() as u64);
        Self { total, data }
    }

    pub fn first(&self) -> Option<&Value> {
        self.data.first()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Record identifier as a string, whether the server sent a string or a number.
pub fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub patient_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    pub consultation_type: String,
    pub modality: String,
    pub service_type: String,
    /// Minutes.
    pub duration: u32,
    /// Cents.
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

/// Serializes `payload` to an object, checks `required` fields and fills in
/// the default status.
pub fn prepare_payload<P: Serialize + ?Sized>(
    payload: &P,
    required: &[&str],
) -> Result<JsonObject, ApiError> {
    let value =
        serde_json::to_value(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(ApiError::Serialization(
            "payload must serialize to a JSON object".into(),
        ));
    };

    for field in required {
        let present = match object.get(*field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(ApiError::MissingField((*field).to_string()));
        }
    }

    if matches!(object.get("status"), None | Some(Value::Null)) {
        object.insert("status".into(), Value::from(DEFAULT_STATUS));
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listing_reads_total_and_records_in_order() {
        let value = json!({"total": 2, "data": [{"id": "a"}, {"id": "b"}]});
        let listing = Listing::from_value(&value);
        assert_eq!(listing.total, 2);
        assert_eq!(listing.data, vec![json!({"id": "a"}), json!({"id": "b"})]);
        assert_eq!(listing.first().and_then(record_id).as_deref(), Some("a"));
    }

    #[test]
    fn listing_of_empty_object_is_empty() {
        let listing = Listing::from_value(&json!({}));
        assert!(listing.is_empty());
        assert_eq!(listing.total, 0);
    }

    #[test]
    fn record_id_accepts_numbers() {
        assert_eq!(record_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(record_id(&json!({"id": ""})), None);
        assert_eq!(record_id(&json!({"name": "x"})), None);
    }

    #[test]
    fn new_patient_serializes_camel_case_and_skips_absent_fields() {
        let patient = NewPatient {
            name: "Ana".into(),
            birth_date: Some("1990-01-01".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&patient).unwrap();
        assert_eq!(value, json!({"name": "Ana", "birthDate": "1990-01-01"}));
    }

    #[test]
    fn prepare_payload_fills_default_status() {
        let object = prepare_payload(&json!({"name": "Ana"}), REQUIRED_PATIENT_FIELDS).unwrap();
        assert_eq!(object["status"], json!(1));
    }

    #[test]
    fn prepare_payload_keeps_explicit_status() {
        let object =
            prepare_payload(&json!({"name": "Ana", "status": 2}), REQUIRED_PATIENT_FIELDS)
                .unwrap();
        assert_eq!(object["status"], json!(2));
    }

    #[test]
    fn prepare_payload_rejects_blank_required_field() {
        let err = prepare_payload(&json!({"name": "  "}), REQUIRED_PATIENT_FIELDS).unwrap_err();
        assert!(matches!(err, ApiError::MissingField(ref f) if f == "name"));
    }

    #[test]
    fn prepare_payload_reports_first_missing_session_field() {
        let session = json!({"patientId": "p1", "date": "2024-01-25"});
        let err = prepare_payload(&session, REQUIRED_SESSION_FIELDS).unwrap_err();
        assert!(matches!(err, ApiError::MissingField(ref f) if f == "time"));
    }

    #[test]
    fn prepare_payload_rejects_non_objects() {
        let err = prepare_payload(&json!([1, 2]), REQUIRED_PATIENT_FIELDS).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn typed_session_passes_required_fields() {
        let session = NewSession {
            patient_id: "p1".into(),
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
        let object = prepare_payload(&session, REQUIRED_SESSION_FIELDS).unwrap();
        assert_eq!(object["duration"], json!(60));
        assert_eq!(object["status"], json!(DEFAULT_STATUS));
    }
}
