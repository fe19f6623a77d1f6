//! Lock modes.

use std::fmt;

/// Mode a lock is held in.
///
/// Modes are ordered by strength, so promotion is `max(current, requested)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    /// Nobody holds the lock.
    None,
    /// Shared read access.
    Read,
    /// Exclusive write access.
    Write,
}

impl LockMode {
    /// Returns the stronger of the two modes.
    #[must_use]
    pub fn promote(self, requested: LockMode) -> LockMode {
        self.max(requested)
    }

    pub(crate) fn to_code(self) -> u8 {
        match self {
            LockMode::None => 0,
            LockMode::Read => 1,
            LockMode::Write => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> LockMode {
        match code {
            1 => LockMode::Read,
            2 => LockMode::Write,
            _ => LockMode::None,
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockMode::None => "EMPTY_LOCK",
            LockMode::Read => "READ_LOCK",
            LockMode::Write => "WRITE_LOCK",
        };
        f.write_str(name)
    }
}
