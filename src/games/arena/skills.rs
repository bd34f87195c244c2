//! Skill catalog and casting. Active skills dispatch a closed set of
//! effects; passive skills feed stat computation and on-cast triggers.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::affix::Attribute;
use super::combat;
use super::error::ActionError;
use super::movement::unit_or;
use super::projectile::{self, AreaZone, Motion, Projectile};
use super::state::{Entity, EntityId, GameEvent, SimulationContext, SkillSlot, SKILL_SLOTS};
use super::status::{self, Control, PeriodicTick, StatusEffect, StatusModifier, StatusTemplate, TickKind};

pub const MAX_SKILL_LEVEL: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillId {
    // Active
    Slash,
    Fireball,
    Volley,
    Meteor,
    Smite,
    Bulwark,
    Rally,
    Mend,
    Hex,
    Charge,
    Boomerang,
    Lance,
    // Passive
    Brawn,
    IronSkin,
    Swiftness,
    Vigor,
    Meditation,
    Renewal,
    Scholar,
    Giant,
    Executioner,
    Harvester,
    Echo,
    Wellspring,
}

impl SkillId {
    pub fn all() -> &'static [SkillId] {
        &[
            SkillId::Slash,
            SkillId::Fireball,
            SkillId::Volley,
            SkillId::Meteor,
            SkillId::Smite,
            SkillId::Bulwark,
            SkillId::Rally,
            SkillId::Mend,
            SkillId::Hex,
            SkillId::Charge,
            SkillId::Boomerang,
            SkillId::Lance,
            SkillId::Brawn,
            SkillId::IronSkin,
            SkillId::Swiftness,
            SkillId::Vigor,
            SkillId::Meditation,
            SkillId::Renewal,
            SkillId::Scholar,
            SkillId::Giant,
            SkillId::Executioner,
            SkillId::Harvester,
            SkillId::Echo,
            SkillId::Wellspring,
        ]
    }

    pub fn key(self) -> &'static str {
        skill_def(self).key
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkillKind {
    Active,
    Passive,
}

/// What an active skill does when cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectKind {
    /// Short-range tracking projectile at one target.
    Melee { damage_mult: f64, range: f32 },
    /// Tracking projectile that leaves a status on hit.
    Bolt { damage_mult: f64, speed: f32, on_hit: StatusTemplate },
    Fan { count: u32, spread: f32, damage_mult: f64, speed: f32, range: f32 },
    Zone { radius: f32, duration_ms: f64, tick_ms: f64, damage_mult: f64 },
    Strike { damage_mult: f64 },
    TeamBuff { status: StatusTemplate },
    Heal { base: f64, attack_mult: f64 },
    Debuff { status: StatusTemplate, range: f32 },
    Charge { speed_multiplier: f64, duration_ms: f64 },
    Boomerang { damage_mult: f64, speed: f32, range: f32 },
    Lance { damage_mult: f64, speed: f32, range: f32, rehit_ms: f64 },
}

/// Always-on contribution of an equipped passive skill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassiveEffect {
    Flat { attribute: Attribute, per_level: f64 },
    /// Contributes a factor of `1 + per_level × level`.
    Multiplier { attribute: Attribute, per_level: f64 },
    Size { per_level: f64 },
    BonusVsHighHealth { pct_per_level: f64 },
    HarvestDouble,
    ManaRefund { chance: f64, fraction: f64 },
    TeamManaRestore { per_level: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SkillEffect {
    Active(EffectKind),
    Passive(PassiveEffect),
}

pub struct SkillDef {
    pub id: SkillId,
    pub key: &'static str,
    pub name: &'static str,
    pub cost: f64,
    pub cooldown_ms: f64,
    pub effect: SkillEffect,
}

impl SkillDef {
    pub fn kind(&self) -> SkillKind {
        match self.effect {
            SkillEffect::Active(_) => SkillKind::Active,
            SkillEffect::Passive(_) => SkillKind::Passive,
        }
    }
}

const BURNING: StatusTemplate = StatusTemplate {
    id: "burning",
    duration_ms: 3_000.0,
    modifiers: &[],
    tick: Some(PeriodicTick {
        interval_ms: 500.0,
        amount: 3.0,
        kind: TickKind::Damage,
    }),
    stun: false,
};

const SHIELDED: StatusTemplate = StatusTemplate {
    id: "shielded",
    duration_ms: 6_000.0,
    modifiers: &[StatusModifier::Flat(Attribute::Defense, 5.0)],
    tick: None,
    stun: false,
};

const RALLIED: StatusTemplate = StatusTemplate {
    id: "rallied",
    duration_ms: 6_000.0,
    modifiers: &[StatusModifier::AttackMultiplier(1.3)],
    tick: None,
    stun: false,
};

const HEXED: StatusTemplate = StatusTemplate {
    id: "hexed",
    duration_ms: 5_000.0,
    modifiers: &[
        StatusModifier::Flat(Attribute::Defense, -3.0),
        StatusModifier::Flat(Attribute::MoveSpeed, -20.0),
    ],
    tick: None,
    stun: false,
};

fn active(
    id: SkillId,
    key: &'static str,
    name: &'static str,
    cost: f64,
    cooldown_ms: f64,
    effect: EffectKind,
) -> SkillDef {
    SkillDef {
        id,
        key,
        name,
        cost,
        cooldown_ms,
        effect: SkillEffect::Active(effect),
    }
}

fn passive(id: SkillId, key: &'static str, name: &'static str, effect: PassiveEffect) -> SkillDef {
    SkillDef {
        id,
        key,
        name,
        cost: 0.0,
        cooldown_ms: 0.0,
        effect: SkillEffect::Passive(effect),
    }
}

pub fn skill_def(id: SkillId) -> SkillDef {
    use EffectKind as E;
    use PassiveEffect as P;
    match id {
        SkillId::Slash => active(id, "slash", "Slash", 10.0, 1_200.0, E::Melee { damage_mult: 1.5, range: 60.0 }),
        SkillId::Fireball => active(
            id,
            "fireball",
            "Fireball",
            20.0,
            2_500.0,
            E::Bolt { damage_mult: 1.2, speed: 320.0, on_hit: BURNING },
        ),
        SkillId::Volley => active(
            id,
            "volley",
            "Volley",
            25.0,
            4_000.0,
            E::Fan { count: 5, spread: 0.6, damage_mult: 0.7, speed: 360.0, range: 260.0 },
        ),
        SkillId::Meteor => active(
            id,
            "meteor",
            "Meteor",
            35.0,
            8_000.0,
            E::Zone { radius: 60.0, duration_ms: 3_000.0, tick_ms: 500.0, damage_mult: 0.5 },
        ),
        SkillId::Smite => active(id, "smite", "Smite", 30.0, 5_000.0, E::Strike { damage_mult: 2.5 }),
        SkillId::Bulwark => active(id, "bulwark", "Bulwark", 30.0, 12_000.0, E::TeamBuff { status: SHIELDED }),
        SkillId::Rally => active(id, "rally", "Rally", 30.0, 12_000.0, E::TeamBuff { status: RALLIED }),
        SkillId::Mend => active(id, "mend", "Mend", 25.0, 6_000.0, E::Heal { base: 20.0, attack_mult: 1.0 }),
        SkillId::Hex => active(id, "hex", "Hex", 20.0, 5_000.0, E::Debuff { status: HEXED, range: 220.0 }),
        SkillId::Charge => active(
            id,
            "charge",
            "Charge",
            15.0,
            6_000.0,
            E::Charge { speed_multiplier: 2.5, duration_ms: 1_500.0 },
        ),
        SkillId::Boomerang => active(
            id,
            "boomerang",
            "Boomerang",
            20.0,
            3_500.0,
            E::Boomerang { damage_mult: 1.0, speed: 300.0, range: 220.0 },
        ),
        SkillId::Lance => active(
            id,
            "lance",
            "Lance",
            25.0,
            4_000.0,
            E::Lance { damage_mult: 0.9, speed: 420.0, range: 320.0, rehit_ms: 400.0 },
        ),
        SkillId::Brawn => passive(id, "brawn", "Brawn", P::Flat { attribute: Attribute::AttackPower, per_level: 2.0 }),
        SkillId::IronSkin => passive(id, "iron_skin", "Iron Skin", P::Flat { attribute: Attribute::Defense, per_level: 1.0 }),
        SkillId::Swiftness => passive(
            id,
            "swiftness",
            "Swiftness",
            P::Multiplier { attribute: Attribute::MoveSpeed, per_level: 0.1 },
        ),
        SkillId::Vigor => passive(id, "vigor", "Vigor", P::Multiplier { attribute: Attribute::MaxHealth, per_level: 0.05 }),
        SkillId::Meditation => passive(
            id,
            "meditation",
            "Meditation",
            P::Multiplier { attribute: Attribute::ManaRegen, per_level: 0.2 },
        ),
        SkillId::Renewal => passive(
            id,
            "renewal",
            "Renewal",
            P::Multiplier { attribute: Attribute::HealthRegen, per_level: 0.2 },
        ),
        SkillId::Scholar => passive(id, "scholar", "Scholar", P::Multiplier { attribute: Attribute::ExpGain, per_level: 0.1 }),
        SkillId::Giant => passive(id, "giant", "Giant", P::Size { per_level: 0.1 }),
        SkillId::Executioner => passive(id, "executioner", "Executioner", P::BonusVsHighHealth { pct_per_level: 0.02 }),
        SkillId::Harvester => passive(id, "harvester", "Harvester", P::HarvestDouble),
        SkillId::Echo => passive(id, "echo", "Echo", P::ManaRefund { chance: 0.25, fraction: 0.5 }),
        SkillId::Wellspring => passive(id, "wellspring", "Wellspring", P::TeamManaRestore { per_level: 5.0 }),
    }
}

/// Effect magnitude multiplier for a skill level.
pub fn level_scale(level: u32) -> f64 {
    1.0 + 0.1 * level.saturating_sub(1) as f64
}

/// Equipped passive skills of an entity with their levels.
pub fn equipped_passives(entity: &Entity) -> impl Iterator<Item = (PassiveEffect, u32)> + '_ {
    entity.skills.iter().flatten().filter_map(move |slot| match skill_def(slot.skill).effect {
        SkillEffect::Passive(p) => Some((p, entity.skill_level(slot.skill))),
        SkillEffect::Active(_) => None,
    })
}

// ── Gating ────────────────────────────────────────────────────

/// Cooldown and resource gate for one skill slot.
pub fn check_use(entity: &Entity, slot: usize, now: f64) -> Result<(), ActionError> {
    let skill_slot = entity
        .skills
        .get(slot)
        .copied()
        .flatten()
        .ok_or(ActionError::InvalidSlot(slot))?;
    let def = skill_def(skill_slot.skill);
    if def.kind() == SkillKind::Passive {
        return Err(ActionError::PassiveSkill);
    }
    if let Some(last) = skill_slot.last_used {
        let elapsed = now - last;
        if elapsed < def.cooldown_ms {
            return Err(ActionError::OnCooldown {
                remaining_ms: def.cooldown_ms - elapsed,
            });
        }
    }
    if entity.mana < def.cost {
        return Err(ActionError::InsufficientMana {
            needed: def.cost,
            available: entity.mana,
        });
    }
    Ok(())
}

pub fn can_use(entity: &Entity, slot: usize, now: f64) -> bool {
    check_use(entity, slot, now).is_ok()
}

// ── Casting ───────────────────────────────────────────────────

/// Target chosen for a cast, resolved before anything mutates.
#[derive(Clone, Copy, Debug, PartialEq)]
enum CastTarget {
    Entity(EntityId),
    Point(Vec2),
    Team,
}

fn resolve_target(
    ctx: &SimulationContext,
    caster: &Entity,
    effect: &EffectKind,
    requested: Option<EntityId>,
) -> Result<CastTarget, ActionError> {
    let opponent = |range: Option<f32>| -> Result<EntityId, ActionError> {
        match requested {
            Some(id) => {
                let target = ctx.registry.get(id).ok_or(ActionError::EntityNotFound(id))?;
                if !target.is_active() {
                    return Err(ActionError::EntityDead(id));
                }
                if target.team() == caster.team() {
                    return Err(ActionError::NoTarget);
                }
                Ok(id)
            }
            None => ctx
                .nearest_opponent(caster.id, range)
                .ok_or(ActionError::NoTarget),
        }
    };

    match *effect {
        EffectKind::Melee { range, .. } | EffectKind::Debuff { range, .. } => {
            opponent(Some(range)).map(CastTarget::Entity)
        }
        EffectKind::Bolt { .. }
        | EffectKind::Strike { .. }
        | EffectKind::Fan { .. }
        | EffectKind::Boomerang { .. }
        | EffectKind::Lance { .. }
        | EffectKind::Charge { .. } => opponent(None).map(CastTarget::Entity),
        EffectKind::Zone { .. } => {
            let id = opponent(None)?;
            let pos = ctx
                .registry
                .get(id)
                .map(|e| e.position)
                .ok_or(ActionError::NoTarget)?;
            Ok(CastTarget::Point(pos))
        }
        EffectKind::TeamBuff { .. } => Ok(CastTarget::Team),
        EffectKind::Heal { .. } => {
            let wounded = |id: EntityId| {
                ctx.registry
                    .get(id)
                    .is_some_and(|e| e.is_active() && e.health < e.max_health)
            };
            match requested {
                Some(id) if ctx.registry.get(id).is_some_and(|e| e.team() == caster.team()) => {
                    if wounded(id) {
                        Ok(CastTarget::Entity(id))
                    } else {
                        Err(ActionError::FullHealth)
                    }
                }
                Some(_) => Err(ActionError::NoTarget),
                None => ctx
                    .allies_of(caster.team())
                    .into_iter()
                    .filter(|id| wounded(*id))
                    .filter_map(|id| ctx.registry.get(id).map(|e| (id, e.health_percent())))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(id, _)| CastTarget::Entity(id))
                    .ok_or(ActionError::FullHealth),
            }
        }
    }
}

/// Cast the skill in `slot`. Every check runs before any mutation.
pub fn use_skill(
    ctx: &mut SimulationContext,
    caster_id: EntityId,
    slot: usize,
    target: Option<EntityId>,
) -> Result<(), ActionError> {
    cast(ctx, caster_id, slot, target, false)
}

fn cast(
    ctx: &mut SimulationContext,
    caster_id: EntityId,
    slot: usize,
    requested: Option<EntityId>,
    waive_cost: bool,
) -> Result<(), ActionError> {
    let now = ctx.now;
    let caster = ctx
        .registry
        .get(caster_id)
        .ok_or(ActionError::EntityNotFound(caster_id))?;
    if !caster.is_active() {
        return Err(ActionError::EntityDead(caster_id));
    }
    if slot >= SKILL_SLOTS {
        return Err(ActionError::InvalidSlot(slot));
    }
    if status::is_stunned(caster) {
        return Err(ActionError::Stunned);
    }
    match check_use(caster, slot, now) {
        Err(ActionError::InsufficientMana { .. }) if waive_cost => {}
        other => other?,
    }
    let skill = caster.skills[slot]
        .map(|s| s.skill)
        .ok_or(ActionError::InvalidSlot(slot))?;
    let def = skill_def(skill);
    let SkillEffect::Active(effect) = def.effect else {
        return Err(ActionError::PassiveSkill);
    };
    let cast_target = resolve_target(ctx, caster, &effect, requested)?;
    let level = caster.skill_level(skill);

    if let Some(c) = ctx.registry.get_mut(caster_id) {
        if !waive_cost {
            c.mana -= def.cost;
        }
        if let Some(s) = c.skills[slot].as_mut() {
            s.last_used = Some(now);
        }
    }
    dispatch(ctx, caster_id, &effect, level, cast_target);
    on_active_cast(ctx, caster_id, def.cost);
    ctx.world.push_event(GameEvent::SkillCast {
        caster: caster_id,
        skill: def.id,
    });
    debug!(?caster_id, skill = def.name, "skill cast");
    Ok(())
}

fn attack_of(ctx: &SimulationContext, id: EntityId) -> f64 {
    ctx.registry
        .get(id)
        .map_or(0.0, |e| e.secondary.attack_power)
}

fn position_of(ctx: &SimulationContext, id: EntityId) -> Option<Vec2> {
    ctx.registry.get(id).map(|e| e.position)
}

fn dispatch(ctx: &mut SimulationContext, caster_id: EntityId, effect: &EffectKind, level: u32, target: CastTarget) {
    let now = ctx.now;
    let scale = level_scale(level);
    let power = attack_of(ctx, caster_id) * scale;
    let Some(origin) = position_of(ctx, caster_id) else {
        return;
    };
    let team = match ctx.registry.get(caster_id) {
        Some(c) => c.team(),
        None => return,
    };
    let target_pos = match target {
        CastTarget::Entity(id) => position_of(ctx, id),
        CastTarget::Point(p) => Some(p),
        CastTarget::Team => None,
    };
    let aim = target_pos
        .map(|p| unit_or(p - origin, Vec2::X))
        .unwrap_or(Vec2::X);
    let target_id = match target {
        CastTarget::Entity(id) => Some(id),
        _ => None,
    };

    match *effect {
        EffectKind::Melee { damage_mult, range } => {
            let speed = 480.0;
            let mut p = Projectile::new(caster_id, team, origin, aim * speed, now, f64::from(range / speed) * 1000.0, power * damage_mult);
            p.motion = Motion::Tracking;
            p.target = target_id;
            projectile::spawn(ctx, p);
        }
        EffectKind::Bolt { damage_mult, speed, on_hit } => {
            let mut p = Projectile::new(caster_id, team, origin, aim * speed, now, 2_000.0, power * damage_mult);
            p.motion = Motion::Tracking;
            p.target = target_id;
            p.on_hit = Some((on_hit, scale));
            projectile::spawn(ctx, p);
        }
        EffectKind::Fan { count, spread, damage_mult, speed, range } => {
            let count = count.max(1);
            let base = aim.y.atan2(aim.x);
            for i in 0..count {
                let offset = if count == 1 {
                    0.0
                } else {
                    -spread / 2.0 + spread * i as f32 / (count - 1) as f32
                };
                let dir = Vec2::from_angle(base + offset);
                let p = Projectile::new(caster_id, team, origin, dir * speed, now, f64::from(range / speed) * 1000.0, power * damage_mult);
                projectile::spawn(ctx, p);
            }
        }
        EffectKind::Zone { radius, duration_ms, tick_ms, damage_mult } => {
            if let Some(center) = target_pos {
                projectile::spawn_zone(
                    ctx,
                    AreaZone {
                        source: Some(caster_id),
                        team,
                        center,
                        radius,
                        expires_at: now + duration_ms,
                        tick_ms,
                        last_tick: now - tick_ms,
                        damage: power * damage_mult,
                    },
                );
            }
        }
        EffectKind::Strike { damage_mult } => {
            if let Some(id) = target_id {
                combat::deal_damage(ctx, id, power * damage_mult, Some(caster_id));
            }
        }
        EffectKind::TeamBuff { status: template } => {
            for ally in ctx.allies_of(team) {
                if let Some(e) = ctx.registry.get_mut(ally) {
                    status::add(e, template.instantiate(now, Some(caster_id), scale));
                }
            }
        }
        EffectKind::Heal { base, attack_mult } => {
            if let Some(id) = target_id {
                let amount = (base + attack_of(ctx, caster_id) * attack_mult) * scale;
                combat::heal(ctx, id, amount);
            }
        }
        EffectKind::Debuff { status: template, .. } => {
            if let Some(e) = target_id.and_then(|id| ctx.registry.get_mut(id)) {
                status::add(e, template.instantiate(now, Some(caster_id), scale));
            }
        }
        EffectKind::Charge { speed_multiplier, duration_ms } => {
            if let (Some(t), Some(e)) = (target_id, ctx.registry.get_mut(caster_id)) {
                let effect = StatusEffect::new("charging", duration_ms, now)
                    .with_control(Control::Charge {
                        target: t,
                        speed_multiplier,
                    })
                    .from_source(caster_id);
                status::add(e, effect);
            }
        }
        EffectKind::Boomerang { damage_mult, speed, range } => {
            let lifetime = f64::from(range / speed) * 2_000.0;
            let mut p = Projectile::new(caster_id, team, origin, aim * speed, now, lifetime, power * damage_mult);
            p.motion = Motion::Boomerang {
                turn_at: now + lifetime / 2.0,
                returning: false,
            };
            p.pierce_rehit_ms = Some(lifetime / 2.0);
            projectile::spawn(ctx, p);
        }
        EffectKind::Lance { damage_mult, speed, range, rehit_ms } => {
            let mut p = Projectile::new(caster_id, team, origin, aim * speed, now, f64::from(range / speed) * 1000.0, power * damage_mult);
            p.pierce_rehit_ms = Some(rehit_ms);
            projectile::spawn(ctx, p);
        }
    }
}

/// Passive side effects evaluated after every successful active cast.
fn on_active_cast(ctx: &mut SimulationContext, caster_id: EntityId, cost: f64) {
    let Some(caster) = ctx.registry.get(caster_id) else {
        return;
    };
    let team = caster.team();
    let passives: Vec<(PassiveEffect, u32)> = equipped_passives(caster).collect();
    for (effect, level) in passives {
        match effect {
            PassiveEffect::ManaRefund { chance, fraction } => {
                if cost > 0.0 && ctx.rng.chance(chance) {
                    if let Some(c) = ctx.registry.get_mut(caster_id) {
                        c.mana = (c.mana + cost * fraction).min(c.max_mana);
                    }
                }
            }
            PassiveEffect::TeamManaRestore { per_level } => {
                let amount = per_level * level as f64;
                for ally in ctx.allies_of(team) {
                    if let Some(a) = ctx.registry.get_mut(ally) {
                        a.mana = (a.mana + amount).min(a.max_mana);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Characters at the mana threshold fire a random ready active skill for
/// free and drop to zero mana.
pub fn auto_cast(ctx: &mut SimulationContext) {
    let threshold = ctx.config.auto_cast_threshold;
    for id in ctx.living_characters() {
        let Some(e) = ctx.registry.get(id) else {
            continue;
        };
        if e.mana < threshold || status::is_stunned(e) {
            continue;
        }
        let now = ctx.now;
        let ready: Vec<usize> = (0..SKILL_SLOTS)
            .filter(|slot| match check_use(e, *slot, now) {
                Ok(()) | Err(ActionError::InsufficientMana { .. }) => true,
                Err(_) => false,
            })
            .collect();
        let Some(slot) = ctx.rng.pick(&ready).copied() else {
            continue;
        };
        if cast(ctx, id, slot, None, true).is_ok() {
            if let Some(e) = ctx.registry.get_mut(id) {
                e.mana = 0.0;
            }
        }
    }
}

// ── Learning ──────────────────────────────────────────────────

pub fn learn(entity: &mut Entity, skill: SkillId) -> Result<(), ActionError> {
    if entity.learned.contains_key(&skill) {
        return Err(ActionError::AlreadyLearned);
    }
    entity.learned.insert(skill, 1);
    Ok(())
}

/// Raise a learned skill by one level.
pub fn level_up(entity: &mut Entity, skill: SkillId) -> Result<u32, ActionError> {
    let level = entity.learned.get_mut(&skill).ok_or(ActionError::NotLearned)?;
    if *level >= MAX_SKILL_LEVEL {
        return Err(ActionError::NotUsable);
    }
    *level += 1;
    let level = *level;
    entity.stats_dirty = true;
    Ok(level)
}

/// Put a learned skill into `slot`, moving it if it sits in another slot.
pub fn equip(entity: &mut Entity, slot: usize, skill: SkillId) -> Result<(), ActionError> {
    if slot >= SKILL_SLOTS {
        return Err(ActionError::InvalidSlot(slot));
    }
    if !entity.learned.contains_key(&skill) {
        return Err(ActionError::NotLearned);
    }
    let previous = entity
        .skills
        .iter()
        .position(|s| s.is_some_and(|s| s.skill == skill));
    if previous == Some(slot) {
        return Ok(());
    }
    let kept = previous.and_then(|p| entity.skills[p].take());
    entity.skills[slot] = Some(kept.unwrap_or_else(|| SkillSlot::new(skill)));
    entity.stats_dirty = true;
    Ok(())
}

pub fn unequip(entity: &mut Entity, slot: usize) -> Result<SkillId, ActionError> {
    let s = entity
        .skills
        .get_mut(slot)
        .and_then(Option::take)
        .ok_or(ActionError::InvalidSlot(slot))?;
    entity.stats_dirty = true;
    Ok(s.skill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::SimConfig;
    use super::super::state::EntityKind;

    fn ctx_with_duel() -> (SimulationContext, EntityId, EntityId) {
        let mut ctx = SimulationContext::new(SimConfig::default(), 1);
        let mut hero = Entity::new(EntityKind::Character, "hero", Vec2::new(100.0, 100.0), 12.0);
        hero.health = 100.0;
        hero.max_health = 100.0;
        hero.mana = 100.0;
        hero.secondary.attack_power = 10.0;
        hero.learned.insert(SkillId::Smite, 1);
        hero.learned.insert(SkillId::Brawn, 1);
        hero.skills[0] = Some(SkillSlot::new(SkillId::Smite));
        hero.skills[1] = Some(SkillSlot::new(SkillId::Brawn));
        let hero = ctx.registry.insert(hero);
        ctx.world.characters.push(hero);

        let mut foe = Entity::new(EntityKind::Enemy, "slime", Vec2::new(150.0, 100.0), 10.0);
        foe.health = 200.0;
        foe.max_health = 200.0;
        let foe = ctx.registry.insert(foe);
        ctx.world.enemies.push(foe);
        (ctx, hero, foe)
    }

    #[test]
    fn skill_keys_are_unique() {
        let mut keys: Vec<_> = SkillId::all().iter().map(|s| s.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), SkillId::all().len());
        for s in SkillId::all() {
            assert_eq!(skill_def(*s).id, *s);
        }
    }

    #[test]
    fn successful_cast_costs_mana_and_stamps_cooldown() {
        let (mut ctx, hero, foe) = ctx_with_duel();
        ctx.now = 1_000.0;
        use_skill(&mut ctx, hero, 0, None).unwrap();
        let h = ctx.registry.get(hero).unwrap();
        assert!((h.mana - 70.0).abs() < 1e-9);
        assert_eq!(h.skills[0].unwrap().last_used, Some(1_000.0));
        // Smite: 10 × 2.5 = 25 against 0 defense.
        assert!((ctx.registry.get(foe).unwrap().health - 175.0).abs() < 1e-9);
        assert!(ctx.world.events.contains(&GameEvent::SkillCast {
            caster: hero,
            skill: SkillId::Smite,
        }));
    }

    #[test]
    fn boomerang_turns_at_half_its_flight() {
        let (mut ctx, hero, _) = ctx_with_duel();
        {
            let h = ctx.registry.get_mut(hero).unwrap();
            h.learned.insert(SkillId::Boomerang, 1);
            h.skills[2] = Some(SkillSlot::new(SkillId::Boomerang));
        }
        ctx.now = 500.0;
        use_skill(&mut ctx, hero, 2, None).unwrap();
        let p = ctx.world.projectiles.last().unwrap();
        // 220 range at 300 speed, out and back.
        let flight = p.expires_at - 500.0;
        assert!((flight - 1_466.67).abs() < 0.01);
        match p.motion {
            Motion::Boomerang { turn_at, returning } => {
                assert!(!returning);
                assert!((turn_at - (500.0 + flight / 2.0)).abs() < 1e-6);
            }
            other => panic!("unexpected motion {:?}", other),
        }
        assert_eq!(p.pierce_rehit_ms, Some(flight / 2.0));
    }

    #[test]
    fn cooldown_blocks_without_mutation() {
        let (mut ctx, hero, _) = ctx_with_duel();
        use_skill(&mut ctx, hero, 0, None).unwrap();
        let mana = ctx.registry.get(hero).unwrap().mana;
        ctx.now += 100.0;
        assert!(!can_use(ctx.registry.get(hero).unwrap(), 0, ctx.now));
        let err = use_skill(&mut ctx, hero, 0, None).unwrap_err();
        assert!(matches!(err, ActionError::OnCooldown { .. }));
        assert_eq!(ctx.registry.get(hero).unwrap().mana, mana);
    }

    #[test]
    fn insufficient_mana_rejected() {
        let (mut ctx, hero, foe) = ctx_with_duel();
        ctx.registry.get_mut(hero).unwrap().mana = 5.0;
        let err = use_skill(&mut ctx, hero, 0, None).unwrap_err();
        assert!(matches!(err, ActionError::InsufficientMana { .. }));
        assert!((ctx.registry.get(foe).unwrap().health - 200.0).abs() < 1e-9);
    }

    #[test]
    fn passive_and_empty_slots_rejected() {
        let (mut ctx, hero, _) = ctx_with_duel();
        assert_eq!(use_skill(&mut ctx, hero, 1, None), Err(ActionError::PassiveSkill));
        assert_eq!(use_skill(&mut ctx, hero, 2, None), Err(ActionError::InvalidSlot(2)));
        assert_eq!(use_skill(&mut ctx, hero, 9, None), Err(ActionError::InvalidSlot(9)));
    }

    #[test]
    fn no_target_when_no_enemies() {
        let (mut ctx, hero, foe) = ctx_with_duel();
        ctx.registry.remove(foe);
        ctx.world.enemies.clear();
        assert_eq!(use_skill(&mut ctx, hero, 0, None), Err(ActionError::NoTarget));
        assert!((ctx.registry.get(hero).unwrap().mana - 100.0).abs() < 1e-9);
    }

    #[test]
    fn heal_at_full_health_is_invalid() {
        let (mut ctx, hero, _) = ctx_with_duel();
        {
            let h = ctx.registry.get_mut(hero).unwrap();
            h.learned.insert(SkillId::Mend, 1);
            h.skills[2] = Some(SkillSlot::new(SkillId::Mend));
        }
        assert_eq!(use_skill(&mut ctx, hero, 2, None), Err(ActionError::FullHealth));
        ctx.registry.get_mut(hero).unwrap().health = 50.0;
        use_skill(&mut ctx, hero, 2, None).unwrap();
        // 20 + 10 attack.
        assert!((ctx.registry.get(hero).unwrap().health - 80.0).abs() < 1e-9);
    }

    #[test]
    fn auto_cast_resets_mana() {
        let (mut ctx, hero, foe) = ctx_with_duel();
        ctx.registry.get_mut(hero).unwrap().mana = 100.0;
        auto_cast(&mut ctx);
        assert_eq!(ctx.registry.get(hero).unwrap().mana, 0.0);
        assert!(ctx.registry.get(foe).unwrap().health < 200.0);
    }

    #[test]
    fn auto_cast_waits_for_threshold() {
        let (mut ctx, hero, foe) = ctx_with_duel();
        ctx.registry.get_mut(hero).unwrap().mana = 99.0;
        auto_cast(&mut ctx);
        assert!((ctx.registry.get(hero).unwrap().mana - 99.0).abs() < 1e-9);
        assert!((ctx.registry.get(foe).unwrap().health - 200.0).abs() < 1e-9);
    }

    #[test]
    fn stunned_caster_cannot_cast() {
        let (mut ctx, hero, _) = ctx_with_duel();
        status::add(ctx.registry.get_mut(hero).unwrap(), status::stun(1_000.0, 0.0, None));
        assert_eq!(use_skill(&mut ctx, hero, 0, None), Err(ActionError::Stunned));
    }

    #[test]
    fn team_mana_restore_after_cast() {
        let (mut ctx, hero, _) = ctx_with_duel();
        {
            let h = ctx.registry.get_mut(hero).unwrap();
            h.learned.insert(SkillId::Wellspring, 2);
            h.skills[3] = Some(SkillSlot::new(SkillId::Wellspring));
        }
        use_skill(&mut ctx, hero, 0, None).unwrap();
        // 100 - 30 cost + 10 restore.
        assert!((ctx.registry.get(hero).unwrap().mana - 80.0).abs() < 1e-9);
    }

    #[test]
    fn equip_requires_learning() {
        let mut e = Entity::new(EntityKind::Character, "hero", Vec2::ZERO, 10.0);
        assert_eq!(equip(&mut e, 0, SkillId::Meteor), Err(ActionError::NotLearned));
        learn(&mut e, SkillId::Meteor).unwrap();
        assert_eq!(learn(&mut e, SkillId::Meteor), Err(ActionError::AlreadyLearned));
        equip(&mut e, 0, SkillId::Meteor).unwrap();
        equip(&mut e, 2, SkillId::Meteor).unwrap();
        assert!(e.skills[0].is_none());
        assert_eq!(e.skills[2].map(|s| s.skill), Some(SkillId::Meteor));
        assert_eq!(equip(&mut e, 4, SkillId::Meteor), Err(ActionError::InvalidSlot(4)));
    }

    #[test]
    fn skill_level_capped() {
        let mut e = Entity::new(EntityKind::Character, "hero", Vec2::ZERO, 10.0);
        assert_eq!(level_up(&mut e, SkillId::Slash), Err(ActionError::NotLearned));
        e.learned.insert(SkillId::Slash, MAX_SKILL_LEVEL - 1);
        assert_eq!(level_up(&mut e, SkillId::Slash), Ok(MAX_SKILL_LEVEL));
        assert_eq!(level_up(&mut e, SkillId::Slash), Err(ActionError::NotUsable));
    }
}
