//! Service name: the identifier of one OS-managed service.
//!
//! Names are validated once at construction so every layer below can rely
//! on them being non-empty, NUL-free and short enough for the service
//! control manager.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest service name accepted by the service control manager, in UTF-16 units.
pub const MAX_SERVICE_NAME_LEN: usize = 256;

/// Validated, immutable name of a service (e.g. `W32Time`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Validate and wrap a service name.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the name is empty, contains a NUL
    /// character, or is longer than [`MAX_SERVICE_NAME_LEN`] UTF-16 units.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyServiceName);
        }
        if name.contains('\0') {
            return Err(ValidationError::InteriorNul);
        }
        let len = name.encode_utf16().count();
        if len > MAX_SERVICE_NAME_LEN {
            return Err(ValidationError::ServiceNameTooLong {
                max: MAX_SERVICE_NAME_LEN,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// NUL-terminated UTF-16 encoding, as expected by wide-character OS APIs.
    #[must_use]
    pub fn to_wide(&self) -> Vec<u16> {
        self.0.encode_utf16().chain(std::iter::once(0)).collect()
    }
}

impl TryFrom<String> for ServiceName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

impl FromStr for ServiceName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_regular_service_name() {
        let name = ServiceName::new("W32Time").unwrap();
        assert_eq!(name.as_str(), "W32Time");
        assert_eq!(name.to_string(), "W32Time");
    }

    #[test]
    fn should_reject_empty_name() {
        assert_eq!(
            ServiceName::new(""),
            Err(ValidationError::EmptyServiceName)
        );
    }

    #[test]
    fn should_reject_name_with_nul() {
        assert_eq!(
            ServiceName::new("Web\0Client"),
            Err(ValidationError::InteriorNul)
        );
    }

    #[test]
    fn should_reject_name_longer_than_limit() {
        let long = "x".repeat(MAX_SERVICE_NAME_LEN + 1);
        assert_eq!(
            ServiceName::new(long),
            Err(ValidationError::ServiceNameTooLong {
                max: MAX_SERVICE_NAME_LEN,
                actual: MAX_SERVICE_NAME_LEN + 1,
            })
        );
    }

    #[test]
    fn should_accept_name_at_exact_limit() {
        let name = "x".repeat(MAX_SERVICE_NAME_LEN);
        assert!(ServiceName::new(name).is_ok());
    }

    #[test]
    fn should_encode_nul_terminated_wide_string() {
        let name = ServiceName::new("Ab").unwrap();
        assert_eq!(name.to_wide(), vec![u16::from(b'A'), u16::from(b'b'), 0]);
    }

    #[test]
    fn should_validate_when_deserializing() {
        let ok: ServiceName = serde_json::from_str("\"WebClient\"").unwrap();
        assert_eq!(ok.as_str(), "WebClient");
        assert!(serde_json::from_str::<ServiceName>("\"\"").is_err());
    }
}
