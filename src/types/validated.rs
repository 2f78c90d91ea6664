//! Validated string types that enforce invariants at construction time

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for string types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("endpoint cannot be empty or whitespace")]
    EmptyEndpoint,

    #[error("invalid endpoint '{0}': expected a ws:// or wss:// URL")]
    InvalidEndpoint(String),

    #[error("room name cannot be empty or whitespace")]
    EmptyTargetName,
}

/// Macro to generate validated string newtypes.
///
/// This macro eliminates boilerplate by generating all the standard implementations
/// for validated string types. Each type gets:
/// - A `new()` constructor that validates
/// - `as_str()` getter
/// - `AsRef<str>`, `Deref`, `Display`, `TryFrom<String>` impls
/// - Serde `Serialize` and `Deserialize` with validation
///
/// # Example
///
/// ```ignore
/// validated_string! {
///     /// A validated username
///     pub struct UserName(String) {
///         validation: |s| {
///             if s.trim().is_empty() {
///                 Err(ValidationError::EmptyUserName)
///             } else {
///                 Ok(())
///             }
///         },
///         error_variant: EmptyUserName,
///         error_message: "username cannot be empty",
///     }
/// }
/// ```
macro_rules! validated_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(String) {
            validation: |$s_param:ident| $validation:expr,
            error_variant: $error_variant:ident,
            error_message: $error_msg:literal,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " after validation")]
            pub fn new($s_param: String) -> Result<Self, ValidationError> {
                let validate = || $validation;
                validate()?;
                Ok(Self($s_param))
            }

            #[doc = concat!("Get the ", stringify!($name), " as a string slice")]
            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from($s_param: String) -> Result<Self, Self::Error> {
                Self::new($s_param)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}


validated_string! {
    /// Server endpoint every session connects to
    ///
    /// Must be an absolute `ws://` or `wss://` URL.
    ///
    /// # Examples
    /// ```
    /// use room_loadtest::types::Endpoint;
    ///
    /// let endpoint = Endpoint::new("ws://localhost:2567".to_string()).unwrap();
    /// assert_eq!(endpoint.as_str(), "ws://localhost:2567");
    ///
    /// assert!(Endpoint::new("".to_string()).is_err());
    /// assert!(Endpoint::new("http://localhost".to_string()).is_err());
    /// ```
    #[doc(alias = "url")]
    pub struct Endpoint(String) {
        validation: |s| {
            if s.trim().is_empty() {
                return Err(ValidationError::EmptyEndpoint);
            }
            match url::Url::parse(&s) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss") && url.has_host() => Ok(()),
                _ => Err(ValidationError::InvalidEndpoint(s.clone())),
            }
        },
        error_variant: InvalidEndpoint,
        error_message: "endpoint must be a ws:// or wss:// URL",
    }
}

impl Endpoint {
    /// Parsed form of the endpoint
    ///
    /// Construction already proved the string parses, so this cannot fail
    /// for values built through `new`.
    pub fn to_url(&self) -> Result<url::Url, url::ParseError> {
        url::Url::parse(&self.0)
    }
}

validated_string! {
    /// Room (target handler) every session joins
    #[doc(alias = "room")]
    pub struct TargetName(String) {
        validation: |s| {
            if s.trim().is_empty() {
                Err(ValidationError::EmptyTargetName)
            } else {
                Ok(())
            }
        },
        error_variant: EmptyTargetName,
        error_message: "room name cannot be empty or whitespace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_valid_ws() {
        let endpoint = Endpoint::new("ws://localhost:2567".to_string()).unwrap();
        assert_eq!(endpoint.as_str(), "ws://localhost:2567");
    }

    #[test]
    fn test_endpoint_valid_wss_with_path() {
        let endpoint = Endpoint::new("wss://game.example.com/rooms".to_string()).unwrap();
        assert_eq!(endpoint.to_url().unwrap().path(), "/rooms");
    }

    #[test]
    fn test_endpoint_empty_rejected() {
        assert!(matches!(
            Endpoint::new("  ".to_string()),
            Err(ValidationError::EmptyEndpoint)
        ));
    }

    #[test]
    fn test_endpoint_wrong_scheme_rejected() {
        assert!(matches!(
            Endpoint::new("http://localhost:2567".to_string()),
            Err(ValidationError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_endpoint_garbage_rejected() {
        assert!(Endpoint::new("not a url".to_string()).is_err());
    }

    #[test]
    fn test_target_name_rejects_whitespace() {
        assert!(matches!(
            TargetName::new("\t\n".to_string()),
            Err(ValidationError::EmptyTargetName)
        ));
    }

    #[test]
    fn test_target_name_try_from() {
        let result: Result<TargetName, _> = "battle".to_string().try_into();
        assert_eq!(result.unwrap().as_str(), "battle");
    }

    #[test]
    fn test_target_name_deserialize_validates() {
        let ok: TargetName = serde_json::from_str("\"lobby\"").unwrap();
        assert_eq!(ok.as_str(), "lobby");
        assert!(serde_json::from_str::<TargetName>("\"\"").is_err());
    }

    #[test]
    fn test_display() {
        let target = TargetName::new("state_handler".to_string()).unwrap();
        assert_eq!(format!("{}", target), "state_handler");
    }
}
