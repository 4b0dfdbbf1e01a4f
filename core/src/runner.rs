//! One-shot automation run over the read endpoints.
//!
//! The run goes stats, patients, first patient's detail and sessions (when
//! there is a patient), sessions of the last `days` days, then the financial
//! summary for the same range. Creating a sample patient and session is
//! opt-in. Failed steps are recorded and the run moves on; a response that
//! lacks the data the next step needs ends the run.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::client::AutomationClient;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{record_id, Listing, NewPatient, NewSession};

pub const DEFAULT_DAYS: u64 = 30;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Width of the look-back window for sessions and financial data.
    pub days: u64,
    /// Also create a sample patient and schedule a session for it.
    pub include_samples: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            include_samples: false,
        }
    }
}

/// Inclusive date window, rendered as `YYYY-MM-DD` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    UserStats,
    Patients,
    PatientDetail,
    PatientSessions,
    RecentSessions,
    Financial,
    CreatePatient,
    CreateSession,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::UserStats => "user stats",
            Step::Patients => "patients",
            Step::PatientDetail => "first patient",
            Step::PatientSessions => "first patient sessions",
            Step::RecentSessions => "recent sessions",
            Step::Financial => "financial summary",
            Step::CreatePatient => "create sample patient",
            Step::CreateSession => "create sample session",
        }
    }
}

#[derive(Debug)]
pub enum StepOutcome {
    Completed(Value),
    Failed(ApiError),
}

#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Everything a run retrieved, in the order it was retrieved.
#[derive(Debug)]
pub struct AutomationReport {
    pub range: DateRange,
    pub steps: Vec<StepReport>,
    /// Why the run stopped early, if it did.
    pub aborted: Option<String>,
}

impl AutomationReport {
    fn new(range: DateRange) -> Self {
        Self {
            range,
            steps: Vec::new(),
            aborted: None,
        }
    }

    /// True when the run finished and no step failed.
    pub fn is_success(&self) -> bool {
        self.aborted.is_none()
            && self
                .steps
                .iter()
                .all(|s| matches!(s.outcome, StepOutcome::Completed(_)))
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    /// Decoded response of a completed step.
    pub fn value(&self, step: Step) -> Option<&Value> {
        match self.outcome(step)? {
            StepOutcome::Completed(value) => Some(value),
            StepOutcome::Failed(_) => None,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }

    pub fn patient_total(&self) -> Option<u64> {
        self.value(Step::Patients)
            .map(|v| Listing::from_value(v).total)
    }

    pub fn recent_session_total(&self) -> Option<u64> {
        self.value(Step::RecentSessions)
            .map(|v| Listing::from_value(v).total)
    }

    pub fn financial_summary(&self) -> Option<&Value> {
        self.value(Step::Financial)?.get("data")?.get("summary")
    }

    fn record(&mut self, step: Step, result: Result<Value, ApiError>) -> Option<&Value> {
        let outcome = match result {
            Ok(value) => {
                info!(step = step.label(), "automation step completed");
                StepOutcome::Completed(value)
            }
            Err(err) => {
                warn!(step = step.label(), error = %err, "automation step failed");
                StepOutcome::Failed(err)
            }
        };
        self.steps.push(StepReport { step, outcome });
        match self.steps.last().map(|s| &s.outcome) {
            Some(StepOutcome::Completed(value)) => Some(value),
            _ => None,
        }
    }

    fn abort(&mut self, reason: String) {
        error!(reason = %reason, "automation run aborted");
        self.aborted = Some(reason);
    }
}

impl fmt::Display for AutomationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Automation report ({} .. {})",
            self.range.start_str(),
            self.range.end_str()
        )?;
        for report in &self.steps {
            match &report.outcome {
                StepOutcome::Completed(_) => writeln!(f, "  [ok]     {}", report.step.label())?,
                StepOutcome::Failed(err) => {
                    writeln!(f, "  [failed] {}: {err}", report.step.label())?
                }
            }
        }
        if let Some(stats) = self.value(Step::UserStats).and_then(|v| v.get("data")) {
            writeln!(f, "Stats: {stats}")?;
        }
        if let Some(total) = self.patient_total() {
            writeln!(f, "Patients: {total}")?;
        }
        if let Some(total) = self.recent_session_total() {
            writeln!(f, "Recent sessions: {total}")?;
        }
        if let Some(summary) = self.financial_summary() {
            writeln!(f, "Financial summary: {summary}")?;
        }
        match &self.aborted {
            Some(reason) => write!(f, "Aborted: {reason}"),
            None if self.is_success() => write!(f, "Automation completed"),
            None => write!(f, "Automation completed with failures"),
        }
    }
}

/// Runs the fixed automation sequence once against `client`.
pub fn run_automation<T: Transport>(
    client: &AutomationClient<T>,
    today: NaiveDate,
    options: &RunOptions,
) -> AutomationReport {
    let range = DateRange::last_days(today, options.days);
    let mut report = AutomationReport::new(range);
    info!(
        user_id = client.config().user_id(),
        start = %range.start_str(),
        end = %range.end_str(),
        "starting automation run"
    );

    report.record(Step::UserStats, client.try_get_user_stats());

    let first_patient = report
        .record(Step::Patients, client.try_get_patients())
        .map(Listing::from_value)
        .and_then(|listing| listing.first().cloned());
    if let Some(patient) = first_patient {
        let Some(patient_id) = record_id(&patient) else {
            report.abort("first patient record has no id".into());
            return report;
        };
        report.record(Step::PatientDetail, client.try_get_patient_by_id(&patient_id));
        report.record(
            Step::PatientSessions,
            client.try_get_sessions_by_patient(&patient_id),
        );
    }

    let (start, end) = (range.start_str(), range.end_str());
    report.record(
        Step::RecentSessions,
        client.try_get_sessions(Some(&start), Some(&end), None),
    );
    report.record(
        Step::Financial,
        client.try_get_financial_info(Some(&start), Some(&end)),
    );

    if options.include_samples {
        let created = report
            .record(Step::CreatePatient, client.try_create_patient(&sample_patient()))
            .cloned();
        if let Some(created) = created {
            let Some(patient_id) = created.get("data").and_then(record_id) else {
                report.abort("created patient response has no data.id".into());
                return report;
            };
            let date = today.checked_add_days(Days::new(7)).unwrap_or(today);
            report.record(
                Step::CreateSession,
                client.try_create_session(&sample_session(&patient_id, date)),
            );
        }
    }

    info!(
        steps = report.steps.len(),
        failures = report.failures().count(),
        "automation run finished"
    );
    report
}

pub fn sample_patient() -> NewPatient {
    NewPatient {
        name: "João Silva".into(),
        email: Some("joao@email.com".into()),
        phone: Some("(11) 99999-9999".into()),
        cpf: Some("123.456.789-00".into()),
        birth_date: Some("1990-01-01".into()),
        address: Some("Rua A, 123".into()),
        occupation: Some("Engineer".into()),
        gender: Some("Male".into()),
        status: None,
    }
}

pub fn sample_session(patient_id: &str, date: NaiveDate) -> NewSession {
    NewSession {
        patient_id: patient_id.to_string(),
        date: date.format(DATE_FORMAT).to_string(),
        time: "14:00:00".into(),
        consultation_type: "Individual therapy".into(),
        modality: "Online".into(),
        service_type: "First visit".into(),
        duration: 60,
        value: 15000,
        notes: Some("Scheduled by automation".into()),
        status: None,
    }
}
