/// Validation state definitions for the extraction retry loop
///
/// This module defines the states an extraction passes through while the
/// consistency validator reconciles the rendered item count.
use std::fmt;

/// Represents the current state of an extraction in the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationState {
    // ===== Active States =====
    /// Records are being read from the current page
    Extracting,

    /// The latest extraction is being checked against the expected count
    Validating,

    /// The check failed and the recovery action is running
    Retrying,

    // ===== Terminal States =====
    /// Extraction matched the expected count and every record is complete
    Accepted,

    /// The retry policy ran out of attempts or time
    Exhausted,
}

impl ValidationState {
    /// Returns true if this is a terminal state (the loop has finished)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }

    /// Returns true if the state may follow `self`
    ///
    /// `extracting -> validating -> {accepted | retrying | exhausted}` and
    /// `retrying -> extracting`. Terminal states have no successors.
    pub fn can_transition_to(&self, next: ValidationState) -> bool {
        matches!(
            (self, next),
            (Self::Extracting, Self::Validating)
                | (Self::Validating, Self::Accepted)
                | (Self::Validating, Self::Retrying)
                | (Self::Validating, Self::Exhausted)
                | (Self::Retrying, Self::Extracting)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Retrying => "retrying",
            Self::Accepted => "accepted",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
