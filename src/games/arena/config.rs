//! Simulation tuning. Every constant the systems read lives here so a
//! JSON override can rebalance a build without touching code.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunable simulation constants. Missing JSON fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    /// Fixed ticks per second; movement integrates `speed / tick_rate`.
    pub tick_rate: u32,

    pub contact_invuln_ms: f64,
    pub collision_cooldown_ms: f64,
    pub knockback_ms: f64,
    pub knockback_base_distance: f32,
    pub knockback_min_ratio: f32,
    pub knockback_max_ratio: f32,
    /// Look-ahead used to reject wander directions that re-exit at once.
    pub wander_lookahead: f32,
    pub wander_retry_limit: u32,

    pub auto_cast_threshold: f64,
    pub max_level_ups_per_award: u32,
    pub level_up_attribute_points: u32,
    pub character_respawn_ms: f64,

    pub boss_fire_chance: f64,
    pub boss_base_threshold: u32,
    pub boss_threshold_step: u32,
    pub boss_retarget_ms: f64,
    pub boss_base_gold: u64,

    pub masterwork_chance: f64,

    pub idle_gold_per_hour: f64,
    pub idle_cap_hours: f64,
    pub stall_threshold_ms: f64,

    pub max_projectiles: usize,
    pub max_zones: usize,
    pub max_damage_numbers: usize,
    pub max_particles: usize,
    pub damage_number_ms: f64,

    pub max_team_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            tick_rate: 60,

            contact_invuln_ms: 500.0,
            collision_cooldown_ms: 100.0,
            knockback_ms: 500.0,
            knockback_base_distance: 40.0,
            knockback_min_ratio: 0.3,
            knockback_max_ratio: 2.5,
            wander_lookahead: 30.0,
            wander_retry_limit: 8,

            auto_cast_threshold: 100.0,
            max_level_ups_per_award: 50,
            level_up_attribute_points: 3,
            character_respawn_ms: 5_000.0,

            boss_fire_chance: 0.3,
            boss_base_threshold: 30,
            boss_threshold_step: 10,
            boss_retarget_ms: 1_500.0,
            boss_base_gold: 200,

            masterwork_chance: 0.1,

            idle_gold_per_hour: 600.0,
            idle_cap_hours: 8.0,
            stall_threshold_ms: 2_000.0,

            max_projectiles: 200,
            max_zones: 32,
            max_damage_numbers: 100,
            max_particles: 300,
            damage_number_ms: 800.0,

            max_team_size: 4,
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) JSON override.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Defaults with an optional override applied. A broken override is
    /// logged and ignored.
    pub fn with_override(json: Option<&str>) -> Self {
        match json.map(Self::from_json) {
            None => Self::default(),
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                warn!(error = %e, "ignoring unreadable config override");
                Self::default()
            }
        }
    }

    pub fn ms_per_tick(&self) -> f64 {
        1000.0 / self.tick_rate.max(1) as f64
    }
}
