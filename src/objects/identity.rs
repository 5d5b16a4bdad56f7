use crate::CoordinatorError;

use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

///
/// The identity of a ceremony participant.
///
/// Identities are case-insensitive, so the token is canonicalized to lowercase
/// on construction. The canonical form doubles as the name of the participant's
/// directory in every lifecycle area of the transcript store.
///
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Creates a new instance of `Identity` from the given token.
    ///
    /// Returns `CoordinatorError::InvalidIdentity` if the token cannot be
    /// used as a single directory name.
    pub fn new(token: &str) -> Result<Self, CoordinatorError> {
        let canonical = token.trim().to_lowercase();

        let is_reserved = canonical.is_empty() || canonical == "." || canonical == "..";
        let has_separator = canonical.contains(|c| c == '/' || c == '\\' || c == '\0');
        if is_reserved || has_separator {
            return Err(CoordinatorError::InvalidIdentity(token.to_string()));
        }

        Ok(Self(canonical))
    }

    /// Returns the canonical lowercase form of the identity.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = CoordinatorError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Self::new(token)
    }
}

impl TryFrom<String> for Identity {
    type Error = CoordinatorError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Self::new(&token)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
