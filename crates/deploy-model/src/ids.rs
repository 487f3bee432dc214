//! Validated identifier newtypes shared across the deployment core.
//!
//! Every identifier in the data model (backup ids, lock ids, deployment ids,
//! config ids) is a 16-character lowercase-hex string. Using one newtype
//! shape for all of them, with a validated constructor and a random
//! generator, mirrors how the reference crate this was grounded on treats
//! its own object identifiers (`GitOid`, `FileId`): never a bare `String`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string fails id validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid id `{value}`: {reason}")]
pub struct IdError {
    value: String,
    reason: String,
}

/// A validated 16-character lowercase-hex identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id(String);

const ID_LEN: usize = 16;

impl Id {
    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(rand_seed());
        let hex: String = digest.iter().take(ID_LEN / 2).map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    /// Validate and wrap an existing id string.
    pub fn new(s: impl Into<String>) -> Result<Self, IdError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), IdError> {
        if s.len() != ID_LEN {
            return Err(IdError {
                value: s.to_owned(),
                reason: format!("expected {ID_LEN} hex characters, got {}", s.len()),
            });
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(IdError {
                value: s.to_owned(),
                reason: "must contain only lowercase hex characters (0-9, a-f)".to_owned(),
            });
        }
        Ok(())
    }

    /// Return the inner string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Produce bytes to seed id generation: process-local monotonic counter plus
/// a thread-local random component, so ids generated in quick succession
/// within one process never collide.
fn rand_seed() -> [u8; 24] {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut buf = [0u8; 24];
    buf[0..8].copy_from_slice(&counter.to_le_bytes());
    buf[8..16].copy_from_slice(&nanos.to_le_bytes());
    buf[16..24].copy_from_slice(&(std::process::id() as u64).to_le_bytes());
    buf
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Id {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Id {
    type Error = IdError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

/// A named group of artifacts (`settings`, `ai-prompts`, `hooks`, ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentName(pub String);

impl ComponentName {
    /// Construct a component name from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the component name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ComponentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A specific target IDE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// Claude Code.
    ClaudeCode,
    /// Kiro.
    Kiro,
    /// Cursor.
    Cursor,
    /// Windsurf.
    Windsurf,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ClaudeCode => "claudeCode",
            Self::Kiro => "kiro",
            Self::Cursor => "cursor",
            Self::Windsurf => "windsurf",
        };
        f.write_str(s)
    }
}

impl Platform {
    /// Backup retention period for this platform, in days.
    ///
    /// Varies per platform per the data model's note that retention "depends
    /// on platform"; `claudeCode` gets the longest retention since its
    /// configuration directory is also consulted by other tooling.
    #[must_use]
    pub const fn backup_retention_days(self) -> u32 {
        match self {
            Self::ClaudeCode => 30,
            Self::Kiro | Self::Cursor | Self::Windsurf => 14,
        }
    }
}
