use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Raw wire value meaning "never expires".
pub const NO_EXPIRY: Timestamp = 0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpiryError {
    #[error("expiry timestamp must not be negative, got {0}")]
    Negative(Timestamp),
}

/// Certificate expiry. `0` on the wire is the "never expires" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Expiry {
    Never,
    At(Timestamp),
}

impl Expiry {
    /// Decode the raw wire value.
    pub fn from_unix(value: Timestamp) -> Result<Self, ExpiryError> {
        match value {
            NO_EXPIRY => Ok(Expiry::Never),
            v if v < 0 => Err(ExpiryError::Negative(v)),
            v => Ok(Expiry::At(v)),
        }
    }

    /// Encode back to the raw wire value (`0` for never).
    pub fn as_unix(&self) -> Timestamp {
        match self {
            Expiry::Never => NO_EXPIRY,
            Expiry::At(ts) => *ts,
        }
    }

    /// A certificate is expired once `now` reaches the expiry instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(ts) => *ts <= now,
        }
    }
}

impl TryFrom<i64> for Expiry {
    type Error = ExpiryError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Expiry::from_unix(value)
    }
}

impl From<Expiry> for i64 {
    fn from(value: Expiry) -> Self {
        value.as_unix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_means_never() {
        assert_eq!(Expiry::from_unix(0).unwrap(), Expiry::Never);
        assert_eq!(Expiry::Never.as_unix(), 0);
        assert!(!Expiry::Never.is_expired_at(i64::MAX));
    }

    #[test]
    fn negative_is_rejected() {
        assert_eq!(Expiry::from_unix(-5), Err(ExpiryError::Negative(-5)));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let expiry = Expiry::from_unix(1_000).unwrap();
        assert!(!expiry.is_expired_at(999));
        assert!(expiry.is_expired_at(1_000));
        assert!(expiry.is_expired_at(1_001));
    }
}
