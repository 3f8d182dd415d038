//! Display events broadcast to attached UI layers

use serde::Serialize;

/// Notification sent to UI subscribers when the display power changes
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayEvent {
    /// Someone arrived, brighten immediately
    PresenceDetected,
    /// Absence exceeded the off-delay, dim
    PresenceLost,
}

impl DisplayEvent {
    /// Event matching a requested display power state
    pub fn for_power(on: bool) -> Self {
        if on {
            Self::PresenceDetected
        } else {
            Self::PresenceLost
        }
    }

    /// Event name as used on the wire (SSE `event:` field)
    pub fn name(&self) -> &'static str {
        match self {
            Self::PresenceDetected => "presence-detected",
            Self::PresenceLost => "presence-lost",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_for_power() {
        assert_eq!(DisplayEvent::for_power(true), DisplayEvent::PresenceDetected);
        assert_eq!(DisplayEvent::for_power(false), DisplayEvent::PresenceLost);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&DisplayEvent::PresenceLost).unwrap();
        assert_eq!(json, "\"presence-lost\"");
        assert_eq!(DisplayEvent::PresenceLost.name(), "presence-lost");
    }
}
