use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask selecting which per-channel containers a `clear` empties.
///
/// Flags combine with `|`. The `*_ERRORS` flags remove only error/warn
/// entries from their container; the plain flags empty it entirely.
/// `SILENT` suppresses the `clear` log entry that documents the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearFlags(u8);

impl ClearFlags {
    pub const ALERTS: ClearFlags = ClearFlags(1);
    pub const LOG: ClearFlags = ClearFlags(1 << 1);
    pub const SUMMARY: ClearFlags = ClearFlags(1 << 2);
    pub const LOG_ERRORS: ClearFlags = ClearFlags(1 << 3);
    pub const SUMMARY_ERRORS: ClearFlags = ClearFlags(1 << 4);
    pub const SILENT: ClearFlags = ClearFlags(1 << 5);

    pub const ALL_ERRORS: ClearFlags = ClearFlags(Self::LOG_ERRORS.0 | Self::SUMMARY_ERRORS.0);
    pub const ALL: ClearFlags =
        ClearFlags(Self::ALERTS.0 | Self::LOG.0 | Self::SUMMARY.0 | Self::ALL_ERRORS.0);

    pub const fn empty() -> ClearFlags {
        ClearFlags(0)
    }

    pub const fn contains(self, other: ClearFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the set flags, in canonical order. Recorded in the meta of
    /// the `clear` entry so the operation is self-documenting downstream.
    pub fn names(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        for (flag, name) in [
            (Self::ALERTS, "alerts"),
            (Self::LOG, "log"),
            (Self::SUMMARY, "summary"),
            (Self::LOG_ERRORS, "logErrors"),
            (Self::SUMMARY_ERRORS, "summaryErrors"),
            (Self::SILENT, "silent"),
        ] {
            if self.contains(flag) {
                out.push(name);
            }
        }
        out
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for ClearFlags {
    type Output = ClearFlags;

    fn bitor(self, rhs: ClearFlags) -> ClearFlags {
        ClearFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClearFlags {
    fn bitor_assign(&mut self, rhs: ClearFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ClearFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}
