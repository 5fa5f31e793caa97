// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit availability state for optional services.
//!
//! Optional collaborators are resolved once at startup into a
//! [`ServiceState`], and callers branch on it instead of null-checking.

use std::fmt;

use crate::error::ChronicleError;

/// Availability of an optional service.
#[derive(Debug, Clone)]
pub enum ServiceState<T> {
    /// Turned off by configuration.
    Disabled,
    /// Configured and passed its startup checks.
    Ready(T),
    /// Configured but could not be started.
    Failed(String),
}

impl<T> ServiceState<T> {
    /// Returns the service when ready.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(service) => Some(service),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns the service, or an [`ChronicleError::Unavailable`] naming why it is not.
    pub fn require(&self, service_name: &str) -> Result<&T, ChronicleError> {
        match self {
            Self::Ready(service) => Ok(service),
            Self::Disabled => Err(ChronicleError::Unavailable(format!(
                "{service_name} is disabled"
            ))),
            Self::Failed(cause) => Err(ChronicleError::Unavailable(format!(
                "{service_name} failed to start: {cause}"
            ))),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceState<U> {
        match self {
            Self::Disabled => ServiceState::Disabled,
            Self::Ready(service) => ServiceState::Ready(f(service)),
            Self::Failed(cause) => ServiceState::Failed(cause),
        }
    }
}

impl<T> fmt::Display for ServiceState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Ready(_) => write!(f, "ready"),
            Self::Failed(cause) => write!(f, "failed ({cause})"),
        }
    }
}
