//! Service state reported by the operator's status feed.

use std::fmt;

use serde::Serialize;

/// Error returned when a service state string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid service state: {0:?} (expected on, off or limited)")]
pub struct InvalidServiceState(String);

/// Whether the shuttle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    #[default]
    On,
    Off,
    Limited,
}

impl ServiceState {
    /// Parse `on`, `off` or `limited`, ignoring case and surrounding space.
    pub fn parse(s: &str) -> Result<Self, InvalidServiceState> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "limited" => Ok(Self::Limited),
            _ => Err(InvalidServiceState(s.to_string())),
        }
    }

    /// Resolve a possibly-missing, possibly-garbled feed value.
    ///
    /// Anything unrecognised falls back to `default`.
    pub fn resolve(raw: Option<&str>, default: ServiceState) -> Self {
        raw.and_then(|s| Self::parse(s).ok()).unwrap_or(default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Limited => "limited",
        }
    }

    /// Arrival alerts are only meaningful while the shuttle runs.
    pub fn alerts_available(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Banner headline for the state.
    pub fn title(&self) -> &'static str {
        match self {
            Self::On => "Service running",
            Self::Off => "Service paused",
            Self::Limited => "Service limited",
        }
    }

    /// Banner text used when the status feed has no message.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::On => "Live ETAs are active.",
            Self::Off => {
                "Trolley is offline. Check the schedule estimate and campus shuttle signage for alternatives."
            }
            Self::Limited => {
                "Delays possible. Thanks for your patience while we keep the route moving."
            }
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_states() {
        assert_eq!(ServiceState::parse("on"), Ok(ServiceState::On));
        assert_eq!(ServiceState::parse("OFF"), Ok(ServiceState::Off));
        assert_eq!(ServiceState::parse(" Limited "), Ok(ServiceState::Limited));
        assert!(ServiceState::parse("maybe").is_err());
        assert!(ServiceState::parse("").is_err());
    }

    #[test]
    fn resolve_falls_back_to_default() {
        assert_eq!(
            ServiceState::resolve(Some("limited"), ServiceState::On),
            ServiceState::Limited
        );
        assert_eq!(
            ServiceState::resolve(Some("paused"), ServiceState::Off),
            ServiceState::Off
        );
        assert_eq!(ServiceState::resolve(None, ServiceState::On), ServiceState::On);
    }

    #[test]
    fn alerts_only_when_running() {
        assert!(ServiceState::On.alerts_available());
        assert!(ServiceState::Limited.alerts_available());
        assert!(!ServiceState::Off.alerts_available());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ServiceState::Limited).unwrap(),
            "\"limited\""
        );
        assert_eq!(ServiceState::Off.to_string(), "off");
    }
}
