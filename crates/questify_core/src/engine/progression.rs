//! XP to level mapping.

use crate::model::progress::UserProgress;

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 100;

/// Upper bound of cumulative XP; storage keeps XP in a signed 64-bit column.
pub const MAX_XP: u64 = i64::MAX as u64;

/// Level reached with `xp` cumulative points: `floor(xp / 100) + 1`.
pub fn level_for(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// Outcome of one XP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    pub previous_level: u64,
    pub level: u64,
    pub xp: u64,
}

impl XpAward {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Adds `delta` XP and recomputes the cached level.
///
/// The delta is unsigned, so XP can never decrease here; the sum saturates at
/// [`MAX_XP`].
pub fn award_xp(progress: &mut UserProgress, delta: u64) -> XpAward {
    let previous_level = progress.level;
    progress.xp = progress.xp.saturating_add(delta).min(MAX_XP);
    progress.level = level_for(progress.xp);
    XpAward {
        previous_level,
        level: progress.level,
        xp: progress.xp,
    }
}
