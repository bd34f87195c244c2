//! Snapshot save/load.
//!
//! `SAVE_VERSION` is bumped whenever a field is added. `MIN_COMPATIBLE_VERSION`
//! only moves on breaking changes (a field removed or its meaning changed);
//! anything at or above it loads, with missing fields defaulted.
//!
//! Positions, status effects, transients and the hostile population are not
//! saved. Loading rebuilds the team and respawns the level.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::boss::BossController;
use super::equipment::EquipmentItem;
use super::error::SnapshotError;
use super::farm::Farm;
use super::progression;
use super::quest::QuestLog;
use super::skills::SkillId;
use super::spawner;
use super::state::{Entity, ItemStack, PrimaryAttributes, SimulationContext, SkillSlot, World, SKILL_SLOTS};
use super::stats;
use super::tables;

pub const SAVE_VERSION: u32 = 1;
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

#[cfg(target_arch = "wasm32")]
const STORAGE_KEY: &str = "idle_arena_save";
#[cfg(target_arch = "wasm32")]
const CONFIG_KEY: &str = "idle_arena_config";

/// Autosave interval in ticks: 60 ticks/sec × 30 sec.
pub const AUTOSAVE_INTERVAL: u64 = 1_800;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSave {
    pub template: String,
    pub level: u32,
    pub exp: f64,
    pub primary: PrimaryAttributes,
    pub learned: Vec<(SkillId, u32)>,
    /// Slotted skill per slot index.
    pub skills: Vec<Option<SkillId>>,
    /// Equipped item per `EquipSlot` index.
    pub equipment: Vec<Option<EquipmentItem>>,
    pub on_team: bool,
    /// Current pools. `None` (older saves, downed characters) restores full
    /// health and empty mana.
    pub health: Option<f64>,
    pub mana: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSnapshot {
    pub version: u32,
    pub gold: u64,
    pub items: Vec<ItemStack>,
    pub equipment: Vec<EquipmentItem>,
    pub characters: Vec<CharacterSave>,
    pub level: u32,
    pub kill_counters: Vec<(u32, u32)>,
    pub boss_threshold: u32,
    pub boss_defeats: u32,
    pub quests: QuestLog,
    pub farm: Farm,
    /// Wall-clock ms at save time; used for the offline catch-up.
    pub saved_at: f64,
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            gold: 0,
            items: Vec::new(),
            equipment: Vec::new(),
            characters: Vec::new(),
            level: 1,
            kill_counters: Vec::new(),
            boss_threshold: 0,
            boss_defeats: 0,
            quests: QuestLog::default(),
            farm: Farm::default(),
            saved_at: 0.0,
        }
    }
}

fn save_character(e: &Entity, on_team: bool) -> CharacterSave {
    CharacterSave {
        template: e.template.clone(),
        level: e.level,
        exp: e.exp,
        primary: e.primary,
        learned: e.learned.iter().map(|(s, l)| (*s, *l)).collect(),
        skills: e.skills.iter().map(|s| s.map(|s| s.skill)).collect(),
        equipment: e.equipment.to_vec(),
        on_team,
        health: e.alive.then_some(e.health),
        mana: e.alive.then_some(e.mana),
    }
}

pub fn extract_snapshot(ctx: &SimulationContext) -> GameSnapshot {
    let team = ctx.world.characters.iter().map(|id| (id, true));
    let bench = ctx.world.bench.iter().map(|id| (id, false));
    let characters = team
        .chain(bench)
        .filter_map(|(id, on_team)| ctx.registry.get(*id).map(|e| save_character(e, on_team)))
        .collect();
    GameSnapshot {
        version: SAVE_VERSION,
        gold: ctx.inventory.gold,
        items: ctx.inventory.stacks.clone(),
        equipment: ctx.inventory.equipment.clone(),
        characters,
        level: ctx.world.level,
        kill_counters: ctx.boss.kill_counters.iter().map(|(l, k)| (*l, *k)).collect(),
        boss_threshold: ctx.boss.threshold,
        boss_defeats: ctx.boss.defeats,
        quests: ctx.quests.clone(),
        farm: ctx.farm.clone(),
        saved_at: ctx.wall_ms,
    }
}

fn restore_character(save: &CharacterSave) -> Entity {
    let mut e = spawner::build_character(&save.template, glam::Vec2::ZERO, 0);
    e.level = save.level.max(1);
    e.max_exp = progression::max_exp(e.level);
    e.exp = save.exp.clamp(0.0, e.max_exp);
    e.primary = save.primary;
    if !save.learned.is_empty() {
        e.learned = save.learned.iter().copied().collect();
    }
    if !save.skills.is_empty() {
        e.skills = [None; SKILL_SLOTS];
        for (slot, skill) in save.skills.iter().enumerate().take(SKILL_SLOTS) {
            e.skills[slot] = skill
                .filter(|s| e.learned.contains_key(s))
                .map(SkillSlot::new);
        }
    }
    for item in save.equipment.iter().flatten() {
        e.equipment[item.slot.index()] = Some(item.clone());
    }
    stats::recompute(&mut e);
    e.health = match save.health {
        Some(h) if h > 0.0 && h.is_finite() => h.min(e.max_health),
        _ => e.max_health,
    };
    e.mana = save
        .mana
        .filter(|m| m.is_finite())
        .map_or(0.0, |m| m.clamp(0.0, e.max_mana));
    e
}

/// Replace the context's persistent state with `snapshot` and respawn the
/// level around the restored team.
pub fn apply_snapshot(ctx: &mut SimulationContext, snapshot: &GameSnapshot) {
    if snapshot.characters.is_empty() {
        spawner::start_new_game(ctx);
    } else {
        ctx.registry = Default::default();
        ctx.world = World {
            level: 1,
            ..Default::default()
        };
        for save in &snapshot.characters {
            let id = spawner::add_character(ctx, restore_character(save));
            let on_team = ctx.world.characters.contains(&id);
            if on_team != save.on_team {
                ctx.world.characters.retain(|c| *c != id);
                ctx.world.bench.retain(|c| *c != id);
                if save.on_team && ctx.world.characters.len() < ctx.config.max_team_size {
                    ctx.world.characters.push(id);
                } else {
                    ctx.world.bench.push(id);
                }
            }
        }
        if ctx.world.characters.is_empty() {
            if let Some(first) = ctx.world.bench.first().copied() {
                ctx.world.bench.remove(0);
                ctx.world.characters.push(first);
            }
        }
    }

    ctx.inventory.gold = snapshot.gold;
    ctx.inventory.stacks = snapshot.items.iter().filter(|s| s.quantity > 0).cloned().collect();
    ctx.inventory.equipment = snapshot.equipment.clone();

    let mut boss = BossController::new(&ctx.config);
    boss.kill_counters = snapshot.kill_counters.iter().copied().collect();
    if snapshot.boss_threshold > 0 {
        boss.threshold = snapshot.boss_threshold;
    }
    boss.defeats = snapshot.boss_defeats;
    ctx.boss = boss;

    ctx.quests = snapshot.quests.clone();
    ctx.quests.fill_missing();
    ctx.farm = snapshot.farm.clone();
    ctx.farm.plots.resize(super::farm::PLOT_COUNT, Default::default());

    let level = if (1..=tables::LEVEL_COUNT).contains(&snapshot.level) {
        snapshot.level
    } else {
        1
    };
    // Wipe hostiles spawned by a fallback new game before switching level.
    let hostiles = std::mem::take(&mut ctx.world.enemies);
    for id in hostiles {
        ctx.registry.remove(id);
    }
    ctx.world.level = level;
    spawner::top_up(ctx);
    info!(level, characters = snapshot.characters.len(), "snapshot applied");
}

pub fn to_json(snapshot: &GameSnapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(snapshot)?)
}

pub fn from_json(json: &str) -> Result<GameSnapshot, SnapshotError> {
    let snapshot: GameSnapshot = serde_json::from_str(json)?;
    if snapshot.version < MIN_COMPATIBLE_VERSION {
        return Err(SnapshotError::TooOld {
            saved: snapshot.version,
            min: MIN_COMPATIBLE_VERSION,
        });
    }
    Ok(snapshot)
}

#[cfg(target_arch = "wasm32")]
fn get_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Optional `SimConfig` JSON override stored next to the save.
#[cfg(target_arch = "wasm32")]
pub fn stored_config() -> Option<String> {
    get_storage()?.get_item(CONFIG_KEY).ok()?
}

#[cfg(target_arch = "wasm32")]
pub fn save_game(ctx: &SimulationContext) {
    use tracing::warn;

    let json = match to_json(&extract_snapshot(ctx)) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "save serialization failed");
            return;
        }
    };
    if let Some(storage) = get_storage() {
        if let Err(e) = storage.set_item(STORAGE_KEY, &json) {
            warn!(error = ?e, "localStorage write failed");
        }
    }
}

/// Load the stored snapshot. Returns the save's wall-clock timestamp when a
/// snapshot was applied.
#[cfg(target_arch = "wasm32")]
pub fn load_game(ctx: &mut SimulationContext) -> Option<f64> {
    use tracing::warn;

    let storage = get_storage()?;
    let json = storage.get_item(STORAGE_KEY).ok()??;
    match from_json(&json) {
        Ok(snapshot) => {
            apply_snapshot(ctx, &snapshot);
            Some(snapshot.saved_at)
        }
        Err(e) => {
            warn!(error = %e, "discarding unreadable save");
            let _ = storage.remove_item(STORAGE_KEY);
            None
        }
    }
}
