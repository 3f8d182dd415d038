//! Serial link lifecycle state

use serde::Serialize;

/// Connection state of the sensor link
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
    /// Stopped on request; no further reconnects
    Disabled,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&LinkState::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
        assert_eq!(LinkState::Error.to_string(), "error");
    }

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(LinkState::default(), LinkState::Disconnected);
    }
}
