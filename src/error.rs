//! Errors surfaced by the retry loop and the tower layer.
//!
//! Policies themselves never fail; these wrap the last error of the operation together with how
//! many attempts were made.
use std::fmt;

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The last attempt failed with a permanent error; retrying could not help.
    Permanent { attempts: usize, error: E },
    /// The last attempt failed with a transient error, but the policy's budget is spent.
    Exhausted { attempts: usize, error: E },
    /// Failure outside of any attempt (for example the inner service not becoming ready).
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permanent { attempts, error } => {
                write!(f, "permanent failure after {} attempt(s): {}", attempts, error)
            }
            Self::Exhausted { attempts, error } => {
                write!(
                    f,
                    "retry policy exhausted after {} attempt(s); last error: {}",
                    attempts, error
                )
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.last_error())
    }
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up; `0` for [`RetryError::Inner`].
    pub fn attempts(&self) -> usize {
        match self {
            Self::Permanent { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
            Self::Inner(_) => 0,
        }
    }

    /// Borrow the error that ended the operation.
    pub fn last_error(&self) -> &E {
        match self {
            Self::Permanent { error, .. } | Self::Exhausted { error, .. } => error,
            Self::Inner(e) => e,
        }
    }

    /// Take the error that ended the operation.
    pub fn into_inner(self) -> E {
        match self {
            Self::Permanent { error, .. } | Self::Exhausted { error, .. } => error,
            Self::Inner(e) => e,
        }
    }

    /// Check if the operation stopped on a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent { .. })
    }

    /// Check if the operation stopped because the retry policy ran out of budget
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if the error happened outside of any attempt
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }
}
