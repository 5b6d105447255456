//! Job lifecycle types.

use serde::Serialize;

/// Lifecycle event published on the queue bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    /// The job reported progress. `state` is the current phase label.
    Progress {
        id: String,
        progress: f64,
        state: Option<String>,
    },
    /// The job was cancelled.
    Abort { id: String, reason: Option<String> },
    /// The job body returned successfully.
    Completed { id: String },
    /// The job body failed or panicked.
    Error { id: String, error: String },
    /// Last event of every run.
    Ended { id: String },
}

impl JobEvent {
    /// Id of the job that emitted the event.
    pub fn id(&self) -> &str {
        match self {
            Self::Progress { id, .. }
            | Self::Abort { id, .. }
            | Self::Completed { id }
            | Self::Error { id, .. }
            | Self::Ended { id } => id,
        }
    }

    pub fn kind(&self) -> JobEventKind {
        match self {
            Self::Progress { .. } => JobEventKind::Progress,
            Self::Abort { .. } => JobEventKind::Abort,
            Self::Completed { .. } => JobEventKind::Completed,
            Self::Error { .. } => JobEventKind::Error,
            Self::Ended { .. } => JobEventKind::Ended,
        }
    }
}

/// Discriminant of [`JobEvent`], used to filter handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    Progress,
    Abort,
    Completed,
    Error,
    Ended,
}

/// Derived status of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Running,
    Completed,
    Error,
    Aborted,
}

impl JobStatus {
    /// Returns true for `Completed` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub kind: String,
    pub progress: f64,
    pub state: Option<String>,
    pub status: JobStatus,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_accessors() {
        let ev = JobEvent::Error {
            id: "install-rom-romm-1".into(),
            error: "boom".into(),
        };
        assert_eq!(ev.id(), "install-rom-romm-1");
        assert_eq!(ev.kind(), JobEventKind::Error);
    }

    #[test]
    fn event_serializes_with_tag() {
        let ev = JobEvent::Progress {
            id: "a".into(),
            progress: 10.0,
            state: Some("download".into()),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["state"], "download");
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Aborted.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }
}
