//! XP to level conversion. `level == floor(xp / xp_per_level) + 1`, and every level
//! gained through XP credits one avatar unlock token.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progression {
    pub(crate) xp_points: i64,
    pub(crate) level: i32,
    pub(crate) avatar_unlock_tokens: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LevelOutcome {
    pub(crate) progression: Progression,
    pub(crate) levels_gained: i32,
}

impl LevelOutcome {
    pub(crate) fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

pub(crate) fn level_for_xp(xp_points: i64, xp_per_level: i64) -> i32 {
    let per_level = xp_per_level.max(1);
    let level = xp_points.max(0) / per_level + 1;
    i32::try_from(level).unwrap_or(i32::MAX)
}

pub(crate) fn apply_xp_gain(current: Progression, gain: i64, xp_per_level: i64) -> LevelOutcome {
    let xp_points = current.xp_points.saturating_add(gain.max(0));
    let new_level = level_for_xp(xp_points, xp_per_level);

    // A lower computed level only happens after a formula change: resync without tokens.
    let levels_gained = (new_level - current.level).max(0);
    let avatar_unlock_tokens = current.avatar_unlock_tokens.saturating_add(levels_gained);

    LevelOutcome {
        progression: Progression { xp_points, level: new_level, avatar_unlock_tokens },
        levels_gained,
    }
}
