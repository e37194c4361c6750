//! Student XP and level progression.

use serde::{Deserialize, Serialize};

/// XP needed to climb one level.
pub const XP_PER_LEVEL: u32 = 100;

/// XP granted by the player for a correct checkpoint answer.
pub const CHECKPOINT_CORRECT_XP: u32 = 10;

/// Level reached with `total_xp`, starting at level 1.
#[must_use]
pub fn level_for_xp(total_xp: u32) -> u32 {
    total_xp / XP_PER_LEVEL + 1
}

/// Level before and after an XP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub previous_level: u32,
    pub new_level: u32,
}

impl LevelChange {
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.previous_level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProgress {
    total_xp: u32,
}

impl Default for StudentProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

impl StudentProgress {
    #[must_use]
    pub fn new(total_xp: u32) -> Self {
        Self { total_xp }
    }

    #[must_use]
    pub fn total_xp(&self) -> u32 {
        self.total_xp
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        level_for_xp(self.total_xp)
    }

    /// XP earned inside the current level.
    #[must_use]
    pub fn xp_into_level(&self) -> u32 {
        self.total_xp % XP_PER_LEVEL
    }

    #[must_use]
    pub fn xp_to_next_level(&self) -> u32 {
        XP_PER_LEVEL - self.xp_into_level()
    }

    pub fn award(&mut self, xp: u32) -> LevelChange {
        let previous_level = self.level();
        self.total_xp = self.total_xp.saturating_add(xp);
        LevelChange {
            previous_level,
            new_level: self.level(),
        }
    }
}
