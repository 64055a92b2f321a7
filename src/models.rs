use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Account Role ---

/// Role
///
/// The closed enumeration classifying an account's onboarding path. The identity
/// provider stores it as free-form metadata; it is narrowed into this type at the
/// session boundary and anything unrecognized is dropped there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Doctor,
    Clinic,
    Patient,
    Admin,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::Doctor, Role::Clinic, Role::Patient, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Clinic => "clinic",
            Role::Patient => "patient",
            Role::Admin => "admin",
        }
    }

    /// Narrows an optional raw attribute. Absent, empty and unknown values all yield `None`.
    pub fn narrow(raw: Option<&str>) -> Option<Role> {
        let raw = raw?;
        match raw.parse() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unrecognized role attribute");
                None
            }
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(raw.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Onboarding API Payloads ---

/// ApiMessage
///
/// The fixed acknowledgement/status body returned by the onboarding API stubs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// OnboardingKind
///
/// Which onboarding stub a request targets. Only used to pick the response wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingKind {
    Doctor,
    Patient,
}

impl OnboardingKind {
    pub fn label(self) -> &'static str {
        match self {
            OnboardingKind::Doctor => "Doctor",
            OnboardingKind::Patient => "Patient",
        }
    }
}
