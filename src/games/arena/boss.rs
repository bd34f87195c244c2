//! Boss encounters: spawn gating by kill count, HP-driven phases,
//! cooldown-and-chance ability firing, and the integrity guard that keeps a
//! live boss in the enemy list exactly once.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::affix::Attribute;
use super::combat;
use super::config::SimConfig;
use super::loot;
use super::movement::unit_or;
use super::quest;
use super::spawner;
use super::state::{Entity, EntityId, EntityKind, GameEvent, KillReward, SecondaryAttributes, SimulationContext};
use super::status::{self, StatusModifier, StatusTemplate};
use super::tables::{self, EnemyKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossKind {
    SlimeKing,
    GoblinWarlord,
    Lich,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityId {
    GroundSlam,
    Enrage,
    IronHide,
    Shockwave,
    Regenerate,
    CallMinions,
    Cataclysm,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AbilityEffect {
    StunRadius { radius: f32, duration_ms: f64 },
    EmpowerNextHit { multiplier: f64 },
    SelfBuff { status: StatusTemplate },
    RadiusDamage { radius: f32, attack_mult: f64 },
    SelfHealPercent { percent: f64 },
    Summon { count: u32, kind: EnemyKind },
    TeamStrike { attack_mult: f64, debuff: StatusTemplate },
}

pub struct AbilityDef {
    pub cooldown_ms: f64,
    pub effect: AbilityEffect,
}

const IRON_HIDE: StatusTemplate = StatusTemplate {
    id: "iron_hide",
    duration_ms: 5_000.0,
    modifiers: &[StatusModifier::Flat(Attribute::Defense, 6.0)],
    tick: None,
    stun: false,
};

const DREAD: StatusTemplate = StatusTemplate {
    id: "dread",
    duration_ms: 4_000.0,
    modifiers: &[
        StatusModifier::Flat(Attribute::AttackPower, -4.0),
        StatusModifier::Flat(Attribute::MoveSpeed, -15.0),
    ],
    tick: None,
    stun: false,
};

pub fn ability_def(id: AbilityId) -> AbilityDef {
    let (cooldown_ms, effect) = match id {
        AbilityId::GroundSlam => (6_000.0, AbilityEffect::StunRadius { radius: 90.0, duration_ms: 1_200.0 }),
        AbilityId::Enrage => (5_000.0, AbilityEffect::EmpowerNextHit { multiplier: 2.0 }),
        AbilityId::IronHide => (9_000.0, AbilityEffect::SelfBuff { status: IRON_HIDE }),
        AbilityId::Shockwave => (4_000.0, AbilityEffect::RadiusDamage { radius: 120.0, attack_mult: 0.8 }),
        AbilityId::Regenerate => (15_000.0, AbilityEffect::SelfHealPercent { percent: 10.0 }),
        AbilityId::CallMinions => (12_000.0, AbilityEffect::Summon { count: 3, kind: EnemyKind::Slime }),
        AbilityId::Cataclysm => (
            10_000.0,
            AbilityEffect::TeamStrike { attack_mult: 1.2, debuff: DREAD },
        ),
    };
    AbilityDef { cooldown_ms, effect }
}

/// One phase: active while HP% is at or below `ceiling`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseDef {
    pub ceiling: f64,
    pub abilities: &'static [AbilityId],
}

pub struct BossInfo {
    pub key: &'static str,
    pub max_health: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub radius: f32,
    pub weight: f64,
    pub exp: f64,
    pub phases: &'static [PhaseDef],
}

pub fn boss_info(kind: BossKind) -> BossInfo {
    match kind {
        BossKind::SlimeKing => BossInfo {
            key: "slime_king",
            max_health: 600.0,
            attack: 12.0,
            defense: 2.0,
            speed: 35.0,
            radius: 24.0,
            weight: 200.0,
            exp: 200.0,
            phases: &[
                PhaseDef { ceiling: 100.0, abilities: &[AbilityId::Enrage] },
                PhaseDef { ceiling: 50.0, abilities: &[AbilityId::Enrage, AbilityId::CallMinions] },
                PhaseDef { ceiling: 25.0, abilities: &[AbilityId::Shockwave, AbilityId::Regenerate] },
            ],
        },
        BossKind::GoblinWarlord => BossInfo {
            key: "goblin_warlord",
            max_health: 1_400.0,
            attack: 20.0,
            defense: 5.0,
            speed: 45.0,
            radius: 22.0,
            weight: 180.0,
            exp: 500.0,
            phases: &[
                PhaseDef { ceiling: 100.0, abilities: &[AbilityId::GroundSlam, AbilityId::Enrage] },
                PhaseDef { ceiling: 60.0, abilities: &[AbilityId::IronHide, AbilityId::Shockwave] },
                PhaseDef { ceiling: 30.0, abilities: &[AbilityId::Enrage, AbilityId::Cataclysm, AbilityId::Regenerate] },
            ],
        },
        BossKind::Lich => BossInfo {
            key: "lich",
            max_health: 2_600.0,
            attack: 28.0,
            defense: 8.0,
            speed: 40.0,
            radius: 22.0,
            weight: 120.0,
            exp: 1_200.0,
            phases: &[
                PhaseDef { ceiling: 100.0, abilities: &[AbilityId::Shockwave, AbilityId::IronHide] },
                PhaseDef { ceiling: 66.0, abilities: &[AbilityId::GroundSlam, AbilityId::CallMinions] },
                PhaseDef { ceiling: 33.0, abilities: &[AbilityId::Cataclysm, AbilityId::Regenerate, AbilityId::GroundSlam] },
            ],
        },
    }
}

/// Phase index for `hp_percent`: the phase with the lowest ceiling still at
/// or above the current HP%. HP above every ceiling maps to the highest one.
pub fn phase_for(phases: &[PhaseDef], hp_percent: f64) -> usize {
    let eligible = phases
        .iter()
        .enumerate()
        .filter(|(_, p)| p.ceiling >= hp_percent)
        .min_by(|a, b| a.1.ceiling.total_cmp(&b.1.ceiling));
    match eligible {
        Some((i, _)) => i,
        None => phases
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.ceiling.total_cmp(&b.1.ceiling))
            .map_or(0, |(i, _)| i),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BossState {
    Dormant,
    Active { phase: usize },
    Defeated,
}

/// Result of the integrity check that precedes every boss action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    Proceed,
    /// Zero health but still present; actions are suppressed until the
    /// defeat is confirmed.
    PendingDeath,
    Missing,
}

#[derive(Debug, Clone)]
pub struct BossController {
    pub state: BossState,
    pub boss: Option<EntityId>,
    pub kind: Option<BossKind>,
    /// Non-boss kills per level since the last boss.
    pub kill_counters: BTreeMap<u32, u32>,
    pub threshold: u32,
    pub defeats: u32,
    /// Per-ability last use; survives phase changes.
    pub last_used: HashMap<AbilityId, f64>,
    pub last_retarget: f64,
    pub last_hit_by: Option<EntityId>,
    threshold_step: u32,
}

impl BossController {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: BossState::Dormant,
            boss: None,
            kind: None,
            kill_counters: BTreeMap::new(),
            threshold: config.boss_base_threshold,
            defeats: 0,
            last_used: HashMap::new(),
            last_retarget: 0.0,
            last_hit_by: None,
            threshold_step: config.boss_threshold_step,
        }
    }

    pub fn record_kill(&mut self, level: u32) {
        *self.kill_counters.entry(level).or_insert(0) += 1;
    }

    pub fn kills(&self, level: u32) -> u32 {
        self.kill_counters.get(&level).copied().unwrap_or(0)
    }

    pub fn phase(&self) -> Option<usize> {
        match self.state {
            BossState::Active { phase } => Some(phase),
            _ => None,
        }
    }

    pub fn ability_ready(&self, id: AbilityId, now: f64) -> bool {
        match self.last_used.get(&id) {
            Some(last) => now - last >= ability_def(id).cooldown_ms,
            None => true,
        }
    }

    /// Drop the current encounter without rewards (level change, lost
    /// entity). Kill counters are kept.
    pub fn abandon(&mut self) {
        self.state = BossState::Dormant;
        self.boss = None;
        self.kind = None;
        self.last_used.clear();
        self.last_hit_by = None;
    }
}

pub fn build_boss(kind: BossKind, level: u32, position: Vec2) -> Entity {
    let info = boss_info(kind);
    let scale = tables::level_scale(level, 0.2);
    let mut e = Entity::new(EntityKind::Boss, info.key, position, info.radius);
    e.base = SecondaryAttributes {
        attack_power: (info.attack * scale).floor(),
        defense: info.defense,
        move_speed: info.speed,
        health_regen: 0.0,
        mana_regen: 0.0,
        weight: info.weight,
        volume: 2.0,
        exp_gain_percent: 0.0,
    };
    e.max_health = (info.max_health * scale).floor();
    e.health = e.max_health;
    e.level = level;
    e.reward = KillReward {
        exp: info.exp * scale,
        gold: 0,
    };
    e
}

/// Integrity check run before every boss ability or movement decision.
pub fn guard(ctx: &mut SimulationContext) -> Guard {
    let Some(id) = ctx.boss.boss else {
        return Guard::Missing;
    };
    let Some(e) = ctx.registry.get(id) else {
        return Guard::Missing;
    };
    if !e.alive || e.health <= 0.0 {
        return Guard::PendingDeath;
    }
    if ctx.world.ensure_enemy_listed(id) {
        ctx.world.push_event(GameEvent::IntegrityRepaired { id });
    }
    Guard::Proceed
}

/// Boss phase of a tick.
pub fn update(ctx: &mut SimulationContext) {
    match ctx.boss.state {
        BossState::Dormant => {
            let level = ctx.world.level;
            if ctx.boss.kills(level) >= ctx.boss.threshold {
                spawn(ctx);
            }
        }
        BossState::Defeated => ctx.boss.state = BossState::Dormant,
        BossState::Active { phase } => match guard(ctx) {
            Guard::Missing => {
                warn!(boss = ?ctx.boss.boss, "boss entity vanished from the registry, abandoning encounter");
                ctx.boss.abandon();
            }
            Guard::PendingDeath => confirm_defeat(ctx),
            Guard::Proceed => {
                let phase = update_phase(ctx, phase);
                fire_abilities(ctx, phase);
                retarget(ctx);
            }
        },
    }
}

pub fn spawn(ctx: &mut SimulationContext) -> Option<EntityId> {
    if ctx.boss.state != BossState::Dormant {
        return None;
    }
    let level = ctx.world.level;
    let kind = tables::level_info(level).boss;
    let info = boss_info(kind);
    let pos = spawner::random_position(ctx, info.radius);
    let enemy_level = tables::level_info(level).enemy_level;
    let mut boss = build_boss(kind, enemy_level, pos);
    boss.direction = ctx.rng.direction();
    super::stats::recompute(&mut boss);
    let id = ctx.registry.insert(boss);
    ctx.world.enemies.push(id);

    let hp = ctx.registry.get(id).map_or(100.0, Entity::health_percent);
    ctx.boss.boss = Some(id);
    ctx.boss.kind = Some(kind);
    ctx.boss.state = BossState::Active {
        phase: phase_for(info.phases, hp),
    };
    ctx.boss.last_used.clear();
    ctx.boss.last_hit_by = None;
    ctx.boss.last_retarget = ctx.now;
    info!(key = info.key, level, "boss spawned");
    ctx.world.push_event(GameEvent::BossSpawned {
        template: info.key.to_string(),
    });
    Some(id)
}

fn update_phase(ctx: &mut SimulationContext, current: usize) -> usize {
    let (Some(id), Some(kind)) = (ctx.boss.boss, ctx.boss.kind) else {
        return current;
    };
    let Some(hp) = ctx.registry.get(id).map(Entity::health_percent) else {
        return current;
    };
    let next = phase_for(boss_info(kind).phases, hp);
    if next != current {
        debug!(from = current, to = next, hp, "boss phase change");
        ctx.boss.state = BossState::Active { phase: next };
        ctx.world.push_event(GameEvent::BossPhaseChanged { phase: next });
    }
    next
}

fn fire_abilities(ctx: &mut SimulationContext, phase: usize) {
    let Some(kind) = ctx.boss.kind else {
        return;
    };
    let Some(phase_def) = boss_info(kind).phases.get(phase).copied() else {
        return;
    };
    let now = ctx.now;
    let chance = ctx.config.boss_fire_chance;
    for &ability in phase_def.abilities {
        if !ctx.boss.ability_ready(ability, now) || buff_active(ctx, ability) || !ctx.rng.chance(chance) {
            continue;
        }
        if guard(ctx) != Guard::Proceed {
            return;
        }
        ctx.boss.last_used.insert(ability, now);
        dispatch(ctx, ability);
    }
}

/// A self-buff whose status is still on the boss is held back.
fn buff_active(ctx: &SimulationContext, ability: AbilityId) -> bool {
    let AbilityEffect::SelfBuff { status: template } = ability_def(ability).effect else {
        return false;
    };
    ctx.boss
        .boss
        .and_then(|id| ctx.registry.get(id))
        .is_some_and(|b| status::has(b, template.id))
}

/// Fire one ability's effect. Callers pass the guard first.
pub fn dispatch(ctx: &mut SimulationContext, ability: AbilityId) {
    let Some(boss_id) = ctx.boss.boss else {
        return;
    };
    let Some(boss) = ctx.registry.get(boss_id) else {
        return;
    };
    let (origin, attack, max_health) = (boss.position, boss.secondary.attack_power, boss.max_health);
    let now = ctx.now;
    let in_radius = |ctx: &SimulationContext, radius: f32| -> Vec<EntityId> {
        ctx.living_characters()
            .into_iter()
            .filter(|id| {
                ctx.registry
                    .get(*id)
                    .is_some_and(|e| e.position.distance(origin) <= radius + e.radius)
            })
            .collect()
    };

    match ability_def(ability).effect {
        AbilityEffect::StunRadius { radius, duration_ms } => {
            for id in in_radius(ctx, radius) {
                if let Some(e) = ctx.registry.get_mut(id) {
                    status::add(e, status::stun(duration_ms, now, Some(boss_id)));
                }
            }
        }
        AbilityEffect::EmpowerNextHit { multiplier } => {
            if let Some(b) = ctx.registry.get_mut(boss_id) {
                b.empowered_multiplier = multiplier;
            }
        }
        AbilityEffect::SelfBuff { status: template } => {
            if let Some(b) = ctx.registry.get_mut(boss_id) {
                status::add(b, template.instantiate(now, Some(boss_id), 1.0));
            }
        }
        AbilityEffect::RadiusDamage { radius, attack_mult } => {
            for id in in_radius(ctx, radius) {
                combat::deal_damage(ctx, id, attack * attack_mult, Some(boss_id));
            }
        }
        AbilityEffect::SelfHealPercent { percent } => {
            combat::heal(ctx, boss_id, max_health * percent / 100.0);
        }
        AbilityEffect::Summon { count, kind } => {
            let level = tables::level_info(ctx.world.level).enemy_level.saturating_sub(1).max(1);
            for _ in 0..count {
                let offset = ctx.rng.direction() * 40.0;
                spawner::spawn_enemy(ctx, kind, level, origin + offset);
            }
        }
        AbilityEffect::TeamStrike { attack_mult, debuff } => {
            for id in ctx.living_characters() {
                combat::deal_damage(ctx, id, attack * attack_mult, Some(boss_id));
                if let Some(e) = ctx.registry.get_mut(id) {
                    if e.is_active() {
                        status::add(e, debuff.instantiate(now, Some(boss_id), 1.0));
                    }
                }
            }
        }
    }
    ctx.world.push_event(GameEvent::BossAbility { ability });
}

/// Periodically point the boss at the nearest character.
fn retarget(ctx: &mut SimulationContext) {
    if ctx.now - ctx.boss.last_retarget < ctx.config.boss_retarget_ms {
        return;
    }
    ctx.boss.last_retarget = ctx.now;
    if guard(ctx) != Guard::Proceed {
        return;
    }
    let Some(id) = ctx.boss.boss else {
        return;
    };
    let Some(target_pos) = ctx
        .nearest_opponent(id, None)
        .and_then(|t| ctx.registry.get(t))
        .map(|t| t.position)
    else {
        return;
    };
    if let Some(b) = ctx.registry.get_mut(id) {
        if !b.is_knocked_back() {
            b.direction = unit_or(target_pos - b.position, b.direction);
        }
    }
}

/// Active → Defeated, exactly once: rewards, counter reset, harder
/// threshold.
pub fn confirm_defeat(ctx: &mut SimulationContext) {
    if !matches!(ctx.boss.state, BossState::Active { .. }) {
        return;
    }
    let Some(id) = ctx.boss.boss else {
        ctx.boss.abandon();
        return;
    };
    let level = ctx.world.level;
    let (template, exp) = match ctx.registry.get_mut(id) {
        Some(e) => {
            e.alive = false;
            e.health = 0.0;
            (e.template.clone(), e.reward.exp)
        }
        None => (String::new(), 0.0),
    };

    let gold = ctx.config.boss_base_gold * (1 + ctx.boss.defeats as u64);
    ctx.inventory.gold += gold;
    let killer = ctx.boss.last_hit_by;
    combat::distribute_exp(ctx, killer, exp);
    let bundle = loot::boss_bundle(&mut ctx.rng);
    loot::grant(ctx, bundle);
    quest::notify_boss(&mut ctx.quests);
    // Dread ends with the boss.
    for c in ctx.world.characters.clone() {
        if let Some(e) = ctx.registry.get_mut(c) {
            status::remove(e, DREAD.id);
        }
    }

    ctx.boss.kill_counters.insert(level, 0);
    ctx.boss.threshold += ctx.boss.threshold_step;
    ctx.boss.defeats += 1;
    ctx.boss.state = BossState::Defeated;
    ctx.boss.boss = None;
    ctx.boss.kind = None;
    ctx.boss.last_used.clear();
    ctx.boss.last_hit_by = None;
    info!(template = %template, gold, "boss defeated");
    ctx.world.push_event(GameEvent::BossDefeated { template, gold });
}

#[cfg(test)]
mod tests {
    use super::*;

    const E_PHASES: &[PhaseDef] = &[
        PhaseDef { ceiling: 100.0, abilities: &[AbilityId::Enrage] },
        PhaseDef { ceiling: 50.0, abilities: &[AbilityId::CallMinions] },
        PhaseDef { ceiling: 25.0, abilities: &[AbilityId::Regenerate] },
    ];

    fn ctx() -> SimulationContext {
        SimulationContext::new(SimConfig::default(), 31)
    }

    fn active_boss(ctx: &mut SimulationContext) -> EntityId {
        let level = ctx.world.level;
        for _ in 0..ctx.boss.threshold {
            ctx.boss.record_kill(level);
        }
        update(ctx);
        ctx.boss.boss.unwrap()
    }

    #[test]
    fn phase_from_hp_percent() {
        assert_eq!(phase_for(E_PHASES, 100.0), 0);
        assert_eq!(phase_for(E_PHASES, 40.0), 1);
        assert_eq!(phase_for(E_PHASES, 50.0), 1);
        assert_eq!(phase_for(E_PHASES, 25.0), 2);
        assert_eq!(phase_for(E_PHASES, 3.0), 2);
        assert_eq!(phase_for(E_PHASES, 120.0), 0);
        assert_eq!(phase_for(&[], 50.0), 0);
    }

    #[test]
    fn phase_selects_its_abilities() {
        assert_eq!(E_PHASES[phase_for(E_PHASES, 40.0)].abilities, &[AbilityId::CallMinions]);
    }

    #[test]
    fn dormant_until_threshold() {
        let mut ctx = ctx();
        for _ in 0..ctx.boss.threshold - 1 {
            ctx.boss.record_kill(1);
        }
        update(&mut ctx);
        assert_eq!(ctx.boss.state, BossState::Dormant);
        ctx.boss.record_kill(1);
        update(&mut ctx);
        assert!(matches!(ctx.boss.state, BossState::Active { phase: 0 }));
        let id = ctx.boss.boss.unwrap();
        assert_eq!(ctx.world.enemy_listing_count(id), 1);
    }

    #[test]
    fn phase_moves_both_ways() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 0.0;
        let id = active_boss(&mut ctx);
        let max = ctx.registry.get(id).unwrap().max_health;
        ctx.registry.get_mut(id).unwrap().health = max * 0.4;
        update(&mut ctx);
        assert_eq!(ctx.boss.phase(), Some(1));
        ctx.registry.get_mut(id).unwrap().health = max;
        update(&mut ctx);
        assert_eq!(ctx.boss.phase(), Some(0));
    }

    #[test]
    fn unlisted_boss_is_reinserted() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 0.0;
        let id = active_boss(&mut ctx);
        ctx.world.enemies.retain(|e| *e != id);
        update(&mut ctx);
        assert_eq!(ctx.world.enemy_listing_count(id), 1);
        assert!(ctx.world.events.contains(&GameEvent::IntegrityRepaired { id }));
    }

    #[test]
    fn duplicate_listing_is_collapsed() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 0.0;
        let id = active_boss(&mut ctx);
        ctx.world.enemies.push(id);
        update(&mut ctx);
        assert_eq!(ctx.world.enemy_listing_count(id), 1);
    }

    #[test]
    fn pending_death_suppresses_abilities_and_defeats_once() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 1.0;
        let id = active_boss(&mut ctx);
        let defeats = ctx.boss.defeats;
        let threshold = ctx.boss.threshold;
        ctx.registry.get_mut(id).unwrap().health = 0.0;
        assert_eq!(guard(&mut ctx), Guard::PendingDeath);
        update(&mut ctx);
        assert_eq!(ctx.boss.state, BossState::Defeated);
        assert!(ctx.boss.last_used.is_empty());
        assert_eq!(ctx.boss.defeats, defeats + 1);
        assert_eq!(ctx.boss.threshold, threshold + ctx.config.boss_threshold_step);
        assert_eq!(ctx.boss.kills(ctx.world.level), 0);
        // A second confirmation is a no-op.
        confirm_defeat(&mut ctx);
        assert_eq!(ctx.boss.defeats, defeats + 1);
        update(&mut ctx);
        assert_eq!(ctx.boss.state, BossState::Dormant);
    }

    #[test]
    fn defeat_grants_gold_and_bundle() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 0.0;
        let id = active_boss(&mut ctx);
        let gold = ctx.inventory.gold;
        ctx.registry.get_mut(id).unwrap().health = -5.0;
        update(&mut ctx);
        assert_eq!(ctx.inventory.gold, gold + ctx.config.boss_base_gold);
        let stacks: u32 = ctx.inventory.stacks.iter().map(|s| s.quantity).sum();
        assert_eq!(stacks, 3);
    }

    #[test]
    fn defeat_lifts_dread_from_the_team() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 0.0;
        let hero = spawner::start_new_game(&mut ctx);
        let id = active_boss(&mut ctx);
        let now = ctx.now;
        {
            let e = ctx.registry.get_mut(hero).unwrap();
            status::add(e, DREAD.instantiate(now, Some(id), 1.0));
            status::add(e, status::stun(60_000.0, now, None));
        }
        ctx.registry.get_mut(id).unwrap().health = 0.0;
        update(&mut ctx);
        assert_eq!(ctx.boss.state, BossState::Defeated);
        let e = ctx.registry.get(hero).unwrap();
        assert!(!status::has(e, "dread"));
        assert!(status::has(e, "stun"));
    }

    #[test]
    fn active_self_buff_is_held_back() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 0.0;
        let id = active_boss(&mut ctx);
        assert!(!buff_active(&ctx, AbilityId::IronHide));
        assert!(!buff_active(&ctx, AbilityId::Enrage));
        let now = ctx.now;
        status::add(ctx.registry.get_mut(id).unwrap(), IRON_HIDE.instantiate(now, Some(id), 1.0));
        assert!(buff_active(&ctx, AbilityId::IronHide));
        assert!(!buff_active(&ctx, AbilityId::Enrage));
    }

    #[test]
    fn cooldowns_survive_phase_change() {
        let mut ctx = ctx();
        ctx.config.boss_fire_chance = 1.0;
        let id = active_boss(&mut ctx);
        ctx.now = 1_000.0;
        update(&mut ctx);
        assert_eq!(ctx.boss.last_used.get(&AbilityId::Enrage), Some(&1_000.0));
        let max = ctx.registry.get(id).unwrap().max_health;
        ctx.registry.get_mut(id).unwrap().health = max * 0.4;
        ctx.now = 1_100.0;
        update(&mut ctx);
        // Enrage is in phase 1 as well but still cooling down.
        assert_eq!(ctx.boss.last_used.get(&AbilityId::Enrage), Some(&1_000.0));
    }

    #[test]
    fn missing_boss_abandons_encounter() {
        let mut ctx = ctx();
        let id = active_boss(&mut ctx);
        ctx.registry.remove(id);
        update(&mut ctx);
        assert_eq!(ctx.boss.state, BossState::Dormant);
        assert_eq!(ctx.boss.boss, None);
    }
}
