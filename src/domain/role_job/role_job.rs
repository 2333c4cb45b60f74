//! RoleJob - a durable instruction for the role worker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{RoleJobId, SubjectId, Timestamp, ValidationError};

/// What the worker should do with the subject's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleAction {
    Grant,
    Revoke,
}

impl RoleAction {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleAction::Grant => "grant",
            RoleAction::Revoke => "revoke",
        }
    }
}

impl fmt::Display for RoleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grant" => Ok(RoleAction::Grant),
            "revoke" => Ok(RoleAction::Revoke),
            other => Err(ValidationError::invalid_format(
                "action",
                format!("unknown role action '{}'", other),
            )),
        }
    }
}

/// A job as handed to the store; id and creation time are assigned there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoleJob {
    pub subject_id: SubjectId,
    pub action: RoleAction,
    /// Provenance, normally the originating event type.
    pub reason: Option<String>,
    /// Originating Stripe event id. Re-enqueueing a seen id is a no-op.
    pub event_id: Option<String>,
}

impl NewRoleJob {
    /// Creates a job request with no idempotency key.
    pub fn new(subject_id: SubjectId, action: RoleAction, reason: impl Into<String>) -> Self {
        Self {
            subject_id,
            action,
            reason: Some(reason.into()),
            event_id: None,
        }
    }

    /// Keys the job by the Stripe event that caused it.
    pub fn for_event(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

/// A persisted role job.
///
/// Immutable apart from `done`, which only the downstream worker flips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleJob {
    pub id: RoleJobId,
    pub subject_id: SubjectId,
    pub action: RoleAction,
    pub reason: Option<String>,
    pub created_at: Timestamp,
    pub done: bool,
    pub event_id: Option<String>,
}

impl RoleJob {
    /// Materializes a request as stored at `created_at` under `id`.
    pub fn from_new(id: RoleJobId, new: NewRoleJob, created_at: Timestamp) -> Self {
        Self {
            id,
            subject_id: new.subject_id,
            action: new.action,
            reason: new.reason,
            created_at,
            done: false,
            event_id: new.event_id,
        }
    }

    /// Returns true while the worker has not completed the job.
    pub fn is_pending(&self) -> bool {
        !self.done
    }
}
