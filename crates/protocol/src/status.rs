//! Game status values and the frames pushed to status observers.

use serde::{Deserialize, Serialize};

/// Derived status of one game. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    Install,
    Download,
    Extract,
    Installed,
    MissingEmulator,
    Error,
    Playing,
}

impl GameStatus {
    /// Maps a job phase label (`"download"`, `"extract"`) to a status.
    pub fn from_phase(phase: &str) -> Option<Self> {
        match phase {
            "install" => Some(Self::Install),
            "download" => Some(Self::Download),
            "extract" => Some(Self::Extract),
            "installed" => Some(Self::Installed),
            "missing-emulator" => Some(Self::MissingEmulator),
            "error" => Some(Self::Error),
            "playing" => Some(Self::Playing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Installed => "installed",
            Self::MissingEmulator => "missing-emulator",
            Self::Error => "error",
            Self::Playing => "playing",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of one status frame. Absent fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn status(status: GameStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_details(status: GameStatus, details: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            details: Some(details.into()),
            ..Default::default()
        }
    }

    pub fn with_error(status: GameStatus, error: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Progress report for a running job phase.
    pub fn progress(progress: f64, status: Option<GameStatus>) -> Self {
        Self {
            progress: Some(progress),
            status,
            ..Default::default()
        }
    }
}

/// Named SSE events. Plain updates carry no event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusEvent {
    /// The observer should refetch the game; a job just completed.
    Refresh,
    Error,
}

impl StatusEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Error => "error",
        }
    }
}

/// One frame of a status feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<StatusEvent>,
    pub update: StatusUpdate,
}

impl StatusFrame {
    pub fn update(update: StatusUpdate) -> Self {
        Self {
            event: None,
            update,
        }
    }

    pub fn refresh() -> Self {
        Self {
            event: Some(StatusEvent::Refresh),
            update: StatusUpdate::default(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            event: Some(StatusEvent::Error),
            update: StatusUpdate::with_error(GameStatus::Error, message),
        }
    }

    /// Renders the frame as a server-sent event.
    pub fn to_sse(&self) -> String {
        // StatusUpdate only holds strings, numbers and enums; serialization cannot fail.
        let data = serde_json::to_string(&self.update).unwrap_or_else(|_| "{}".into());
        match self.event {
            Some(event) => format!("event: {}\ndata: {data}\n\n", event.as_str()),
            None => format!("data: {data}\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&GameStatus::MissingEmulator).unwrap();
        assert_eq!(json, "\"missing-emulator\"");
        assert_eq!(GameStatus::from_phase("extract"), Some(GameStatus::Extract));
        assert_eq!(GameStatus::from_phase("unpack"), None);
    }

    #[test]
    fn plain_frame_has_no_event_line() {
        let frame = StatusFrame::update(StatusUpdate::progress(50.0, Some(GameStatus::Download)));
        assert_eq!(
            frame.to_sse(),
            "data: {\"progress\":50.0,\"status\":\"download\"}\n\n"
        );
    }

    #[test]
    fn refresh_frame_has_empty_payload() {
        assert_eq!(StatusFrame::refresh().to_sse(), "event: refresh\ndata: {}\n\n");
    }

    #[test]
    fn error_frame_carries_message() {
        let sse = StatusFrame::error("boom").to_sse();
        assert_eq!(
            sse,
            "event: error\ndata: {\"status\":\"error\",\"error\":\"boom\"}\n\n"
        );
    }

    #[test]
    fn update_roundtrips_with_missing_fields() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"installed","details":"Play"}"#).unwrap();
        assert_eq!(update, StatusUpdate::with_details(GameStatus::Installed, "Play"));
    }
}
