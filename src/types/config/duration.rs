//! Duration serialization helpers for configuration files

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serde adapter storing a `Duration` as whole milliseconds
///
/// Pacing delays and report intervals are configured in milliseconds,
/// both on the command line and in TOML files.
pub mod duration_millis_serde {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "duration_millis_serde")]
        delay: Duration,
    }

    #[test]
    fn test_millis_from_toml() {
        let parsed: Wrapper = toml::from_str("delay = 250").unwrap();
        assert_eq!(parsed.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_millis_to_toml() {
        let wrapper = Wrapper {
            delay: Duration::from_millis(1500),
        };
        assert_eq!(toml::to_string(&wrapper).unwrap().trim(), "delay = 1500");
    }
}
