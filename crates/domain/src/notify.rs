//! Status-change kinds and the notify mask built from them.
//!
//! The bit values match the `SERVICE_NOTIFY_*` flags the service control
//! manager reports, so a raw flag word received from the OS can be compared
//! against a [`NotifyMask`] without translation.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One kind of service status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
    Created,
    Deleted,
    DeletePending,
}

impl StatusChange {
    pub const ALL: [Self; 10] = [
        Self::Stopped,
        Self::StartPending,
        Self::StopPending,
        Self::Running,
        Self::ContinuePending,
        Self::PausePending,
        Self::Paused,
        Self::Created,
        Self::Deleted,
        Self::DeletePending,
    ];

    /// The `SERVICE_NOTIFY_*` bit for this kind.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Stopped => 0x0001,
            Self::StartPending => 0x0002,
            Self::StopPending => 0x0004,
            Self::Running => 0x0008,
            Self::ContinuePending => 0x0010,
            Self::PausePending => 0x0020,
            Self::Paused => 0x0040,
            Self::Created => 0x0080,
            Self::Deleted => 0x0100,
            Self::DeletePending => 0x0200,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::StartPending => "start_pending",
            Self::StopPending => "stop_pending",
            Self::Running => "running",
            Self::ContinuePending => "continue_pending",
            Self::PausePending => "pause_pending",
            Self::Paused => "paused",
            Self::Created => "created",
            Self::Deleted => "deleted",
            Self::DeletePending => "delete_pending",
        }
    }
}

impl fmt::Display for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatusChange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnknownStatusChange(wanted.to_string()))
    }
}

/// Bit-set of [`StatusChange`] kinds a caller wants to hear about.
///
/// Also used to decode the raw flag word delivered with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotifyMask(u32);

impl NotifyMask {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0x03FF);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, kind: StatusChange) -> bool {
        self.0 & kind.bit() != 0
    }

    #[must_use]
    pub const fn with(self, kind: StatusChange) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Dispatch predicate for a raw notification flag word.
    ///
    /// A zero word means the OS could not say what changed, so it is always
    /// admitted and the receiver must re-check the service itself. Any other
    /// word is admitted only when every bit in it is part of this mask.
    #[must_use]
    pub const fn admits(self, raw_flags: u32) -> bool {
        raw_flags == 0 || (raw_flags | self.0) == self.0
    }

    /// Named kinds set in this mask, in bit order. Unknown bits are skipped.
    pub fn kinds(self) -> impl Iterator<Item = StatusChange> {
        StatusChange::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl From<StatusChange> for NotifyMask {
    fn from(kind: StatusChange) -> Self {
        Self(kind.bit())
    }
}

impl BitOr for NotifyMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<StatusChange> for NotifyMask {
    type Output = Self;

    fn bitor(self, rhs: StatusChange) -> Self {
        self.with(rhs)
    }
}

impl BitOr for StatusChange {
    type Output = NotifyMask;

    fn bitor(self, rhs: Self) -> NotifyMask {
        NotifyMask::from(self).with(rhs)
    }
}

impl FromIterator<StatusChange> for NotifyMask {
    fn from_iter<I: IntoIterator<Item = StatusChange>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Parses `stopped|running` or `stopped, running`.
impl FromStr for NotifyMask {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(['|', ','])
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<StatusChange>)
            .collect()
    }
}

impl fmt::Display for NotifyMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for kind in self.kinds() {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(kind.name())?;
        }
        let unknown = self.0 & !Self::ALL.0;
        if unknown != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "0x{unknown:X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOPPED: u32 = 0x1;
    const RUNNING: u32 = 0x8;

    #[test]
    fn should_admit_zero_flags_for_any_mask() {
        assert!(NotifyMask::EMPTY.admits(0));
        assert!(NotifyMask::from(StatusChange::Stopped).admits(0));
        assert!(NotifyMask::ALL.admits(0));
    }

    #[test]
    fn should_admit_flags_that_are_subset_of_mask() {
        let mask = StatusChange::Stopped | StatusChange::Running;
        assert!(mask.admits(STOPPED));
        assert!(mask.admits(RUNNING));
        assert!(mask.admits(STOPPED | RUNNING));
    }

    #[test]
    fn should_reject_flags_with_bits_outside_mask() {
        let mask = NotifyMask::from(StatusChange::Stopped);
        assert!(!mask.admits(STOPPED | RUNNING));
        assert!(!mask.admits(RUNNING));
        assert!(!NotifyMask::EMPTY.admits(STOPPED));
    }

    #[test]
    fn should_agree_with_subset_definition_for_all_small_masks() {
        for mask in 0..64u32 {
            for flags in 0..64u32 {
                let expected = flags == 0 || flags & !mask == 0;
                assert_eq!(NotifyMask::from_bits(mask).admits(flags), expected);
            }
        }
    }

    #[test]
    fn should_parse_mask_from_names() {
        let mask: NotifyMask = "stopped|running".parse().unwrap();
        assert_eq!(mask.bits(), STOPPED | RUNNING);

        let mask: NotifyMask = "Stopped, start_pending".parse().unwrap();
        assert_eq!(mask, StatusChange::Stopped | StatusChange::StartPending);
    }

    #[test]
    fn should_reject_unknown_kind_name() {
        let err = "stopped|exploded".parse::<NotifyMask>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownStatusChange("exploded".into()));
    }

    #[test]
    fn should_decode_raw_flags_into_kinds() {
        let kinds: Vec<_> = NotifyMask::from_bits(0x0009).kinds().collect();
        assert_eq!(kinds, vec![StatusChange::Stopped, StatusChange::Running]);
    }

    #[test]
    fn should_display_mask_as_joined_names() {
        assert_eq!(NotifyMask::EMPTY.to_string(), "none");
        assert_eq!(
            (StatusChange::Stopped | StatusChange::Paused).to_string(),
            "stopped|paused"
        );
        assert_eq!(NotifyMask::from_bits(0x1001).to_string(), "stopped|0x1000");
    }

    #[test]
    fn should_build_mask_from_iterator() {
        let mask: NotifyMask = [StatusChange::Deleted, StatusChange::Created]
            .into_iter()
            .collect();
        assert!(mask.contains(StatusChange::Deleted));
        assert!(mask.contains(StatusChange::Created));
        assert!(!mask.contains(StatusChange::Stopped));
    }

    #[test]
    fn should_cover_all_bits_with_all_mask() {
        let union: NotifyMask = StatusChange::ALL.into_iter().collect();
        assert_eq!(union, NotifyMask::ALL);
    }
}
