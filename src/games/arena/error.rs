//! Error types for the arena core.
//!
//! Player commands fail with [`ActionError`] and never mutate state on the
//! failure path. A tick that cannot continue reports a [`TickFault`] to the
//! game loop, which cleans up and resumes.

use thiserror::Error;

use super::state::EntityId;

/// Why a command or skill use was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),
    #[error("entity {0:?} is dead")]
    EntityDead(EntityId),
    #[error("skill slot {0} is empty or out of range")]
    InvalidSlot(usize),
    #[error("skill is still cooling down ({remaining_ms:.0}ms left)")]
    OnCooldown { remaining_ms: f64 },
    #[error("not enough mana: need {needed}, have {available:.0}")]
    InsufficientMana { needed: f64, available: f64 },
    #[error("passive skills cannot be cast")]
    PassiveSkill,
    #[error("caster is stunned")]
    Stunned,
    #[error("no valid target")]
    NoTarget,
    #[error("target is already at full health")]
    FullHealth,
    #[error("unknown id: {0}")]
    UnknownId(String),
    #[error("skill not learned")]
    NotLearned,
    #[error("skill already learned")]
    AlreadyLearned,
    #[error("not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u64, available: u64 },
    #[error("item not in inventory")]
    ItemMissing,
    #[error("item cannot be used this way")]
    NotUsable,
    #[error("quest is not available")]
    QuestUnavailable,
    #[error("quest is not complete yet")]
    QuestIncomplete,
    #[error("team is full")]
    TeamFull,
    #[error("team must keep at least one member")]
    TeamEmpty,
    #[error("farm plot {0} is unavailable")]
    PlotUnavailable(usize),
    #[error("crop is not ready")]
    CropNotReady,
}

/// A fault that aborts the rest of the current tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickFault {
    #[error("{list} list references missing entity {id:?}")]
    DanglingReference { list: &'static str, id: EntityId },
    #[error("transient collection {collection} overflowed ({len} entries)")]
    TransientOverflow { collection: &'static str, len: usize },
    #[error("tick panicked: {0}")]
    Panicked(String),
}

/// Snapshot (de)serialization failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot version {saved} is older than the minimum {min}")]
    TooOld { saved: u32, min: u32 },
}
