// src/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

/// Decimal strings, forwarded exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    /// The portal bounced the login POST back to the login page.
    RejectedCredentials,
    /// The login page carried no input fields at all.
    LoginFormMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Timeout,
    Connection,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PunchOutcome {
    Success { timestamp: Option<String> },
    AuthFailure { reason: AuthFailureReason },
    ActionRejected { server_message: String },
    TransportError { kind: TransportKind, detail: String },
}

impl PunchOutcome {
    pub fn transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connection
        } else {
            TransportKind::Other
        };
        PunchOutcome::TransportError {
            kind,
            detail: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PunchOutcome::Success { .. })
    }

    /// One template per outcome kind, for whatever renders the result.
    pub fn user_message(&self) -> String {
        match self {
            PunchOutcome::Success { timestamp: Some(ts) } => format!("Punch recorded at {ts}."),
            PunchOutcome::Success { timestamp: None } => "Punch recorded.".into(),
            PunchOutcome::AuthFailure {
                reason: AuthFailureReason::RejectedCredentials,
            } => "Login failed: check your employee ID and password.".into(),
            PunchOutcome::AuthFailure {
                reason: AuthFailureReason::LoginFormMissing,
            } => "Login failed: the login page did not contain a form.".into(),
            PunchOutcome::ActionRejected { server_message } => {
                format!("Punch rejected: {server_message}")
            }
            PunchOutcome::TransportError {
                kind: TransportKind::Timeout,
                detail,
            } => format!("Server unreachable, check your network. ({detail})"),
            PunchOutcome::TransportError {
                kind: TransportKind::Connection,
                detail,
            } => format!("Cannot establish a connection, check VPN/DNS. ({detail})"),
            PunchOutcome::TransportError {
                kind: TransportKind::Other,
                detail,
            } => format!("Unexpected error: {detail}"),
        }
    }
}

// ---------- STEP TRACE ---------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PageFetch,
    AuthSubmit,
    ActionSubmit,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub stage: Stage,
    pub method: &'static str,
    pub url: String,
    pub status: Option<u16>,
    pub note: String,
}

/// Caller-held diagnostic trace. Steps are only kept when enabled.
#[derive(Debug, Default)]
pub struct Trace {
    enabled: bool,
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            steps: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        stage: Stage,
        method: &'static str,
        url: &str,
        status: Option<u16>,
        note: impl Into<String>,
    ) {
        let note = note.into();
        tracing::debug!(?stage, method, url, ?status, note = %note, "exchange");
        if self.enabled {
            self.steps.push(TraceStep {
                stage,
                method,
                url: url.to_string(),
                status,
                note,
            });
        }
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Option<Vec<TraceStep>> {
        self.enabled.then_some(self.steps)
    }
}

#[derive(Debug)]
pub struct PunchReport {
    pub outcome: PunchOutcome,
    pub trace: Option<Vec<TraceStep>>,
}

// ---------- API ---------- //

#[derive(Deserialize)]
pub struct PunchReq {
    pub identifier: String,
    pub secret: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Serialize)]
pub struct PunchRes {
    pub request_id: Uuid,
    pub outcome: PunchOutcome,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceStep>>,
    pub finished_at: String,
}
