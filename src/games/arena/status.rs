//! Status effects: time-boxed modifiers, damage/heal over time and control
//! (stun, charge). Replace-not-stack by id.

use super::affix::{Attribute, AttributeSheet};
use super::combat;
use super::state::{Entity, EntityId, MovementState, SimulationContext};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusModifier {
    Flat(Attribute, f64),
    /// Attack-power multiplier; statuses sum their `(m - 1)` terms.
    AttackMultiplier(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickKind {
    Damage,
    Heal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicTick {
    pub interval_ms: f64,
    pub amount: f64,
    pub kind: TickKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    Stun,
    Charge { target: EntityId, speed_multiplier: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusEffect {
    pub id: &'static str,
    pub modifiers: Vec<StatusModifier>,
    pub tick: Option<PeriodicTick>,
    pub control: Option<Control>,
    pub started_at: f64,
    pub duration_ms: f64,
    pub last_tick: f64,
    /// Attribution only; the source may already be gone.
    pub source: Option<EntityId>,
}

impl StatusEffect {
    pub fn new(id: &'static str, duration_ms: f64, now: f64) -> Self {
        Self {
            id,
            modifiers: Vec::new(),
            tick: None,
            control: None,
            started_at: now,
            duration_ms,
            last_tick: now,
            source: None,
        }
    }

    pub fn with_modifier(mut self, modifier: StatusModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_tick(mut self, tick: PeriodicTick) -> Self {
        self.tick = Some(tick);
        self
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.control = Some(control);
        self
    }

    pub fn from_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now - self.started_at >= self.duration_ms
    }

    pub fn remaining_ms(&self, now: f64) -> f64 {
        (self.duration_ms - (now - self.started_at)).max(0.0)
    }
}

/// Compile-time description of a status a skill or ability applies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusTemplate {
    pub id: &'static str,
    pub duration_ms: f64,
    pub modifiers: &'static [StatusModifier],
    pub tick: Option<PeriodicTick>,
    pub stun: bool,
}

impl StatusTemplate {
    /// Build a live effect with magnitudes multiplied by `scale`.
    pub fn instantiate(&self, now: f64, source: Option<EntityId>, scale: f64) -> StatusEffect {
        let mut effect = StatusEffect::new(self.id, self.duration_ms, now);
        effect.source = source;
        effect.modifiers = self
            .modifiers
            .iter()
            .map(|m| match *m {
                StatusModifier::Flat(attr, v) => StatusModifier::Flat(attr, v * scale),
                StatusModifier::AttackMultiplier(m) => {
                    StatusModifier::AttackMultiplier(1.0 + (m - 1.0) * scale)
                }
            })
            .collect();
        effect.tick = self.tick.map(|t| PeriodicTick {
            amount: t.amount * scale,
            ..t
        });
        if self.stun {
            effect.control = Some(Control::Stun);
        }
        effect
    }
}

/// Sum of active status contributions fed into stat computation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatusAggregate {
    pub flat: AttributeSheet,
    /// Combined attack bonus, clamped to at most +100%.
    pub attack_bonus: f64,
}

pub const MAX_ATTACK_BONUS: f64 = 1.0;

pub fn aggregate(entity: &Entity) -> StatusAggregate {
    let mut agg = StatusAggregate::default();
    let mut bonus = 0.0;
    for effect in &entity.statuses {
        for m in &effect.modifiers {
            match *m {
                StatusModifier::Flat(attr, v) => agg.flat.add(attr, v),
                StatusModifier::AttackMultiplier(mult) if mult.is_finite() => bonus += mult - 1.0,
                StatusModifier::AttackMultiplier(_) => {}
            }
        }
    }
    agg.attack_bonus = bonus.clamp(-1.0, MAX_ATTACK_BONUS);
    agg
}

/// Attach `effect`, replacing any effect with the same id.
pub fn add(entity: &mut Entity, effect: StatusEffect) {
    entity.statuses.retain(|s| s.id != effect.id);
    if let Some(Control::Charge {
        target,
        speed_multiplier,
    }) = effect.control
    {
        if !entity.is_knocked_back() {
            entity.movement = MovementState::Charging {
                target,
                speed_multiplier,
            };
        }
    }
    entity.statuses.push(effect);
    entity.stats_dirty = true;
}

pub fn has(entity: &Entity, id: &str) -> bool {
    entity.statuses.iter().any(|s| s.id == id)
}

/// Drop the status with `id`. Returns whether anything was removed.
pub fn remove(entity: &mut Entity, id: &str) -> bool {
    let before = entity.statuses.len();
    let mut dropped_charge = false;
    entity.statuses.retain(|s| {
        if s.id != id {
            return true;
        }
        dropped_charge |= matches!(s.control, Some(Control::Charge { .. }));
        false
    });
    if dropped_charge {
        end_charge(entity);
    }
    let removed = entity.statuses.len() != before;
    if removed {
        entity.stats_dirty = true;
    }
    removed
}

pub fn is_stunned(entity: &Entity) -> bool {
    entity
        .statuses
        .iter()
        .any(|s| matches!(s.control, Some(Control::Stun)))
}

/// Drop every charge-control status and return to wandering.
pub fn cancel_charge(entity: &mut Entity) {
    let before = entity.statuses.len();
    entity
        .statuses
        .retain(|s| !matches!(s.control, Some(Control::Charge { .. })));
    if entity.statuses.len() != before {
        entity.stats_dirty = true;
    }
    end_charge(entity);
}

fn end_charge(entity: &mut Entity) {
    if matches!(entity.movement, MovementState::Charging { .. }) {
        entity.movement = MovementState::Wandering;
    }
}

/// A periodic tick that fired and still has to be applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingTick {
    pub target: EntityId,
    pub amount: f64,
    pub kind: TickKind,
    pub source: Option<EntityId>,
}

/// Expire and tick one entity's statuses. At most one tick per effect per
/// call; missed intervals are not caught up.
pub fn update_entity(entity: &mut Entity, now: f64) -> Vec<PendingTick> {
    let mut pending = Vec::new();
    let mut i = entity.statuses.len();
    while i > 0 {
        i -= 1;
        if entity.statuses[i].is_expired(now) {
            let effect = entity.statuses.remove(i);
            if matches!(effect.control, Some(Control::Charge { .. })) {
                end_charge(entity);
            }
            entity.stats_dirty = true;
            continue;
        }
        let effect = &mut entity.statuses[i];
        if let Some(tick) = effect.tick {
            if tick.interval_ms > 0.0 && now - effect.last_tick >= tick.interval_ms {
                effect.last_tick = now;
                pending.push(PendingTick {
                    target: entity.id,
                    amount: tick.amount,
                    kind: tick.kind,
                    source: effect.source,
                });
            }
        }
    }
    pending
}

/// Status phase of a tick: expiry, periodic ticks, then regeneration.
pub fn update(ctx: &mut SimulationContext) {
    let now = ctx.now;
    let mut pending = Vec::new();
    for id in ctx.field_ids() {
        if let Some(entity) = ctx.registry.get_mut(id) {
            if entity.is_active() {
                pending.extend(update_entity(entity, now));
            }
        }
    }
    for tick in pending {
        if !ctx.registry.is_active(tick.target) {
            continue;
        }
        match tick.kind {
            TickKind::Damage => {
                combat::deal_damage(ctx, tick.target, tick.amount, tick.source);
            }
            TickKind::Heal => {
                combat::heal(ctx, tick.target, tick.amount);
            }
        }
    }
    regen(ctx);
}

/// Per-second regen rates scaled to one tick.
pub fn regen(ctx: &mut SimulationContext) {
    let seconds = ctx.config.ms_per_tick() / 1000.0;
    for id in ctx.field_ids() {
        let Some(e) = ctx.registry.get_mut(id) else {
            continue;
        };
        if !e.is_active() {
            continue;
        }
        if e.health < e.max_health {
            e.health = (e.health + e.secondary.health_regen.max(0.0) * seconds).min(e.max_health);
        }
        if e.mana < e.max_mana {
            e.mana = (e.mana + e.secondary.mana_regen.max(0.0) * seconds).min(e.max_mana);
        }
    }
}

pub fn stun(duration_ms: f64, now: f64, source: Option<EntityId>) -> StatusEffect {
    let mut effect = StatusEffect::new("stun", duration_ms, now).with_control(Control::Stun);
    effect.source = source;
    effect
}
