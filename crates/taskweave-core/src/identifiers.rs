//! Validated identifier types used throughout Taskweave.
//!
//! All identifiers follow the parse-don't-validate discipline: constructors
//! return `Result` instead of panicking, and each identifier is a distinct
//! newtype so a `TaskId` can never be passed where an `AgentId` is expected.
//!
//! # Validation Rules
//!
//! - Non-empty, at most 128 characters
//! - No leading or trailing whitespace
//! - Only alphanumeric characters, hyphens (`-`), underscores (`_`), and dots (`.`)
//!
//! # Examples
//!
//! ```rust
//! use taskweave_core::identifiers::{AgentId, TaskId};
//!
//! let agent = AgentId::parse("planner").unwrap();
//! assert_eq!(agent.as_str(), "planner");
//!
//! assert!(TaskId::parse("").is_err());
//! assert!(TaskId::parse("task/1").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of any identifier, in characters.
pub const MAX_ID_LEN: usize = 128;

/// Reasons an identifier string fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier cannot be empty")]
    Empty,

    #[error("identifier exceeds {MAX_ID_LEN} characters (got {len})")]
    TooLong { len: usize },

    #[error("identifier has leading or trailing whitespace: '{id}'")]
    Whitespace { id: String },

    #[error("identifier '{id}' contains invalid character '{ch}'")]
    InvalidChar { id: String, ch: char },
}

fn validate(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    let len = id.chars().count();
    if len > MAX_ID_LEN {
        return Err(IdError::TooLong { len });
    }
    if id.trim() != id {
        return Err(IdError::Whitespace { id: id.to_string() });
    }
    if let Some(ch) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(IdError::InvalidChar {
            id: id.to_string(),
            ch,
        });
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier from a string.
            pub fn parse(id: impl AsRef<str>) -> Result<Self, IdError> {
                let id = id.as_ref();
                validate(id)?;
                Ok(Self(id.to_string()))
            }

            /// View the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                validate(&s)?;
                Ok(Self(s))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier! {
    /// Unique identifier for a registered agent, used to route tasks.
    AgentId
}

identifier! {
    /// Unique identifier for a task. A task id is executed at most once.
    TaskId
}

identifier! {
    /// Stable identifier for a node in the memory graph.
    NodeId
}

impl TaskId {
    /// Generate a fresh random task id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl NodeId {
    /// Generate a fresh random node id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
