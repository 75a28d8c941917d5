//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SvcWatchError`] via `#[from]`. Subscription failures are deliberately
//! *not* errors: they are recorded as a [`SystemErrorCode`] on the entry
//! that failed, and callers inspect it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::service::ServiceName;

/// Top-level error for the svcwatch workspace.
#[derive(Debug, thiserror::Error)]
pub enum SvcWatchError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("service control error")]
    ServiceControl(#[from] ScmError),
}

/// A domain invariant was violated while building a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service name is {actual} UTF-16 units long, the limit is {max}")]
    ServiceNameTooLong { max: usize, actual: usize },

    #[error("service name must not contain NUL characters")]
    InteriorNul,

    #[error("unknown status change kind `{0}`")]
    UnknownStatusChange(String),
}

/// Failure to open a handle on the service control manager or on a service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScmError {
    #[error("cannot open the service control manager: {code}")]
    ManagerUnavailable { code: SystemErrorCode },

    #[error("cannot open service `{service}`: {code}")]
    ServiceUnavailable {
        service: ServiceName,
        code: SystemErrorCode,
    },
}

impl ScmError {
    /// The platform error code reported for the failed open.
    #[must_use]
    pub fn code(&self) -> SystemErrorCode {
        match self {
            Self::ManagerUnavailable { code } | Self::ServiceUnavailable { code, .. } => *code,
        }
    }
}

/// A raw platform error code (`GetLastError` style), `0` meaning success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemErrorCode(u32);

impl SystemErrorCode {
    pub const SUCCESS: Self = Self(0);
    pub const ACCESS_DENIED: Self = Self(5);
    pub const SERVICE_DOES_NOT_EXIST: Self = Self(1060);

    #[must_use]
    pub const fn from_raw(code: u32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {} (0x{:08X})", self.0, self.0)
    }
}
