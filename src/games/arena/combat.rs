//! Damage resolution, death handling and reward distribution.

use glam::Vec2;
use tracing::{debug, info};

use super::loot;
use super::progression;
use super::quest;
use super::state::{
    DamageNumber, EntityId, EntityKind, GameEvent, MovementState, Particle, SimulationContext,
};
use super::stats;
use super::status;

/// Integer damage after defense, never below 1.
pub fn damage(amount: f64, defense: f64) -> f64 {
    (amount - defense).floor().max(1.0)
}

/// What one side of a contact dealt.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContactOutcome {
    pub to_a: Option<f64>,
    pub to_b: Option<f64>,
}

/// Outgoing contact damage of `attacker` against `defender`, from the
/// state both are in right now. `None` when the defender is invulnerable
/// or the attacker never deals contact damage.
fn contact_damage(ctx: &SimulationContext, attacker: EntityId, defender: EntityId) -> Option<f64> {
    let a = ctx.registry.get(attacker)?;
    let d = ctx.registry.get(defender)?;
    if a.kind == EntityKind::ResourcePoint || d.invulnerable_until > ctx.now {
        return None;
    }
    let passive = stats::passive_aggregate(a);
    let mut amount = damage(
        a.secondary.attack_power * a.empowered_multiplier,
        d.secondary.defense,
    );
    if passive.bonus_vs_high_health > 0.0 {
        amount += (d.health.max(0.0) * passive.bonus_vs_high_health).floor();
    }
    if passive.harvest_double && d.kind == EntityKind::ResourcePoint {
        amount *= 2.0;
    }
    Some(amount)
}

/// Simultaneous exchange between two touching entities. Both sides are
/// computed before either is applied.
pub fn resolve_contact(ctx: &mut SimulationContext, a: EntityId, b: EntityId) -> ContactOutcome {
    if !ctx.registry.is_active(a) || !ctx.registry.is_active(b) {
        return ContactOutcome::default();
    }
    let outcome = ContactOutcome {
        to_b: contact_damage(ctx, a, b),
        to_a: contact_damage(ctx, b, a),
    };
    let now = ctx.now;
    let invuln = ctx.config.contact_invuln_ms;

    for (attacker, defender, dealt) in [(a, b, outcome.to_b), (b, a, outcome.to_a)] {
        if let Some(e) = ctx.registry.get_mut(attacker) {
            status::cancel_charge(e);
            if dealt.is_some() {
                e.empowered_multiplier = 1.0;
            }
        }
        if dealt.is_some() {
            if let Some(d) = ctx.registry.get_mut(defender) {
                d.invulnerable_until = now + invuln;
            }
        }
    }
    if let Some(amount) = outcome.to_b {
        apply_damage(ctx, b, amount, Some(a));
    }
    if let Some(amount) = outcome.to_a {
        apply_damage(ctx, a, amount, Some(b));
    }
    outcome
}

/// Skill, projectile, zone and status damage: defense applies, contact
/// invulnerability does not.
pub fn deal_damage(ctx: &mut SimulationContext, target: EntityId, raw: f64, source: Option<EntityId>) -> f64 {
    let Some(defense) = ctx.registry.get(target).map(|e| e.secondary.defense) else {
        return 0.0;
    };
    apply_damage(ctx, target, damage(raw, defense), source)
}

/// Subtract an already-final amount and run the death path when health
/// reaches zero.
pub fn apply_damage(ctx: &mut SimulationContext, target: EntityId, amount: f64, source: Option<EntityId>) -> f64 {
    let now = ctx.now;
    let Some(e) = ctx.registry.get_mut(target) else {
        return 0.0;
    };
    if !e.is_active() || !amount.is_finite() || amount <= 0.0 {
        return 0.0;
    }
    e.health -= amount;
    let position = e.position;
    let dead = e.health <= 0.0;
    ctx.world.damage_numbers.push(DamageNumber {
        position,
        amount,
        heal: false,
        created_at: now,
    });
    if dead {
        handle_death(ctx, target, source);
    }
    amount
}

pub fn heal(ctx: &mut SimulationContext, target: EntityId, amount: f64) -> f64 {
    let now = ctx.now;
    let Some(e) = ctx.registry.get_mut(target) else {
        return 0.0;
    };
    if !e.is_active() || !amount.is_finite() || amount <= 0.0 {
        return 0.0;
    }
    let before = e.health;
    e.health = (e.health + amount).min(e.max_health);
    let healed = e.health - before;
    let position = e.position;
    if healed > 0.0 {
        ctx.world.damage_numbers.push(DamageNumber {
            position,
            amount: healed,
            heal: true,
            created_at: now,
        });
    }
    healed
}

/// Death path. Bosses stay in place at zero health until the boss
/// controller confirms the defeat; everything else is marked dead here and
/// swept at the end of the tick.
pub fn handle_death(ctx: &mut SimulationContext, id: EntityId, killer: Option<EntityId>) {
    let now = ctx.now;
    let respawn_ms = ctx.config.character_respawn_ms;
    let Some(e) = ctx.registry.get_mut(id) else {
        return;
    };
    if !e.alive {
        return;
    }
    e.health = e.health.min(0.0);
    match e.kind {
        EntityKind::Boss => {
            ctx.boss.last_hit_by = killer.or(ctx.boss.last_hit_by);
            debug!(?id, "boss at zero health, awaiting confirmation");
        }
        EntityKind::Character => {
            e.alive = false;
            e.health = 0.0;
            e.statuses.clear();
            e.movement = MovementState::Wandering;
            e.respawn_at = Some(now + respawn_ms);
            e.stats_dirty = true;
            info!(?id, "character downed");
            ctx.world.push_event(GameEvent::CharacterDowned { id });
        }
        EntityKind::Enemy | EntityKind::ResourcePoint => {
            e.alive = false;
            let template = e.template.clone();
            let reward = e.reward;
            let position = e.position;
            let kind = e.kind;

            distribute_exp(ctx, killer, reward.exp);
            if reward.gold > 0 {
                ctx.inventory.gold += reward.gold;
                ctx.world.push_event(GameEvent::GoldGained { amount: reward.gold });
            }
            let drops = match kind {
                EntityKind::ResourcePoint => loot::roll_resource(&template, killer_harvests(ctx, killer)),
                _ => loot::roll_kill(&mut ctx.rng),
            };
            loot::grant(ctx, drops);
            if kind == EntityKind::Enemy {
                quest::notify_kill(&mut ctx.quests, &template);
                let level = ctx.world.level;
                ctx.boss.record_kill(level);
            }
            burst(ctx, position);
            ctx.world.push_event(GameEvent::EnemyKilled { template, killer });
        }
    }
}

fn killer_harvests(ctx: &SimulationContext, killer: Option<EntityId>) -> bool {
    killer
        .and_then(|k| ctx.registry.get(k))
        .is_some_and(|k| stats::passive_aggregate(k).harvest_double)
}

/// Full experience to the killer, half to every other living character.
/// Without a living character killer everyone gets the half share.
pub fn distribute_exp(ctx: &mut SimulationContext, killer: Option<EntityId>, exp: f64) {
    if exp <= 0.0 {
        return;
    }
    let killer = killer.filter(|k| {
        ctx.registry
            .get(*k)
            .is_some_and(|e| e.kind == EntityKind::Character && e.is_active())
    });
    for id in ctx.living_characters() {
        let share = if Some(id) == killer { exp } else { exp * 0.5 };
        progression::award_exp(ctx, id, share);
    }
}

fn burst(ctx: &mut SimulationContext, at: Vec2) {
    let expires_at = ctx.now + 600.0;
    for _ in 0..6 {
        let velocity = ctx.rng.direction() * 40.0;
        ctx.world.particles.push(Particle {
            position: at,
            velocity,
            expires_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::SimConfig;
    use super::super::skills::SkillId;
    use super::super::state::{Entity, SkillSlot};

    fn fighter(kind: EntityKind, attack: f64, defense: f64, health: f64) -> Entity {
        let mut e = Entity::new(kind, "slime", Vec2::new(100.0, 100.0), 10.0);
        e.secondary.attack_power = attack;
        e.secondary.defense = defense;
        e.health = health;
        e.max_health = health;
        e
    }

    fn duel(hero: Entity, foe: Entity) -> (SimulationContext, EntityId, EntityId) {
        let mut ctx = SimulationContext::new(SimConfig::default(), 5);
        let h = ctx.registry.insert(hero);
        ctx.world.characters.push(h);
        let f = ctx.registry.insert(foe);
        ctx.world.enemies.push(f);
        (ctx, h, f)
    }

    #[test]
    fn damage_floor_examples() {
        assert_eq!(damage(10.0, 3.0), 7.0);
        assert_eq!(damage(2.0, 3.0), 1.0);
        assert_eq!(damage(10.0, 0.0), 10.0);
        assert_eq!(damage(f64::NAN, 0.0), 1.0);
    }

    #[test]
    fn contact_exchange_is_simultaneous() {
        let (mut ctx, h, f) = duel(
            fighter(EntityKind::Character, 10.0, 0.0, 5.0),
            fighter(EntityKind::Enemy, 8.0, 3.0, 7.0),
        );
        let out = resolve_contact(&mut ctx, h, f);
        // Both lethal hits land even though each kills the other.
        assert_eq!(out.to_b, Some(7.0));
        assert_eq!(out.to_a, Some(8.0));
        assert!(!ctx.registry.get(h).unwrap().alive);
        assert!(!ctx.registry.get(f).unwrap().alive);
    }

    #[test]
    fn contact_invulnerability_blocks_only_contact() {
        let (mut ctx, h, f) = duel(
            fighter(EntityKind::Character, 5.0, 0.0, 100.0),
            fighter(EntityKind::Enemy, 1.0, 0.0, 100.0),
        );
        resolve_contact(&mut ctx, h, f);
        assert!((ctx.registry.get(f).unwrap().health - 95.0).abs() < 1e-9);
        ctx.now += 100.0;
        let out = resolve_contact(&mut ctx, h, f);
        assert_eq!(out.to_b, None);
        assert!((ctx.registry.get(f).unwrap().health - 95.0).abs() < 1e-9);
        // Skill damage ignores the window.
        deal_damage(&mut ctx, f, 10.0, Some(h));
        assert!((ctx.registry.get(f).unwrap().health - 85.0).abs() < 1e-9);
        ctx.now += 500.0;
        assert_eq!(resolve_contact(&mut ctx, h, f).to_b, Some(5.0));
    }

    #[test]
    fn bonus_vs_high_health_adds_flat() {
        let mut hero = fighter(EntityKind::Character, 10.0, 0.0, 100.0);
        hero.learned.insert(SkillId::Executioner, 5);
        hero.skills[0] = Some(SkillSlot::new(SkillId::Executioner));
        let (mut ctx, h, f) = duel(hero, fighter(EntityKind::Enemy, 0.0, 0.0, 200.0));
        // 10 + floor(200 × 0.10)
        assert_eq!(resolve_contact(&mut ctx, h, f).to_b, Some(30.0));
    }

    #[test]
    fn harvester_doubles_reduced_damage_on_nodes() {
        let mut hero = fighter(EntityKind::Character, 10.0, 0.0, 100.0);
        hero.learned.insert(SkillId::Harvester, 1);
        hero.skills[0] = Some(SkillSlot::new(SkillId::Harvester));
        let mut node = fighter(EntityKind::ResourcePoint, 0.0, 2.0, 100.0);
        node.template = "ore_vein".into();
        let (mut ctx, h, n) = duel(hero, node);
        let out = resolve_contact(&mut ctx, h, n);
        assert_eq!(out.to_b, Some(16.0));
        assert_eq!(out.to_a, None);
    }

    #[test]
    fn empowered_hit_consumed_once() {
        let mut boss = fighter(EntityKind::Boss, 10.0, 0.0, 500.0);
        boss.empowered_multiplier = 2.0;
        let (mut ctx, h, b) = duel(fighter(EntityKind::Character, 1.0, 0.0, 500.0), boss);
        assert_eq!(resolve_contact(&mut ctx, h, b).to_a, Some(20.0));
        assert_eq!(ctx.registry.get(b).unwrap().empowered_multiplier, 1.0);
    }

    #[test]
    fn enemy_kill_rewards_and_counts() {
        let mut foe = fighter(EntityKind::Enemy, 0.0, 0.0, 5.0);
        foe.reward.gold = 7;
        foe.reward.exp = 10.0;
        let (mut ctx, h, f) = duel(fighter(EntityKind::Character, 50.0, 0.0, 100.0), foe);
        ctx.registry.get_mut(h).unwrap().secondary.exp_gain_percent = 100.0;
        deal_damage(&mut ctx, f, 50.0, Some(h));
        assert!(!ctx.registry.get(f).unwrap().alive);
        assert!(ctx.inventory.gold >= 7);
        assert!((ctx.registry.get(h).unwrap().exp - 10.0).abs() < 1e-9);
        assert_eq!(ctx.boss.kills(ctx.world.level), 1);
    }

    #[test]
    fn other_allies_get_half_exp() {
        let (mut ctx, h, f) = duel(
            fighter(EntityKind::Character, 50.0, 0.0, 100.0),
            fighter(EntityKind::Enemy, 0.0, 0.0, 5.0),
        );
        let mut buddy = fighter(EntityKind::Character, 1.0, 0.0, 100.0);
        buddy.secondary.exp_gain_percent = 100.0;
        let b = ctx.registry.insert(buddy);
        ctx.world.characters.push(b);
        ctx.registry.get_mut(h).unwrap().secondary.exp_gain_percent = 100.0;
        distribute_exp(&mut ctx, Some(h), 20.0);
        assert!((ctx.registry.get(h).unwrap().exp - 20.0).abs() < 1e-9);
        assert!((ctx.registry.get(b).unwrap().exp - 10.0).abs() < 1e-9);
        let _ = f;
    }

    #[test]
    fn death_runs_once() {
        let (mut ctx, h, f) = duel(
            fighter(EntityKind::Character, 50.0, 0.0, 100.0),
            fighter(EntityKind::Enemy, 0.0, 0.0, 5.0),
        );
        deal_damage(&mut ctx, f, 50.0, Some(h));
        handle_death(&mut ctx, f, Some(h));
        assert_eq!(ctx.boss.kills(ctx.world.level), 1);
        assert_eq!(deal_damage(&mut ctx, f, 50.0, Some(h)), 0.0);
    }

    #[test]
    fn boss_death_waits_for_controller() {
        let (mut ctx, h, b) = duel(
            fighter(EntityKind::Character, 50.0, 0.0, 100.0),
            fighter(EntityKind::Boss, 0.0, 0.0, 5.0),
        );
        deal_damage(&mut ctx, b, 50.0, Some(h));
        let boss = ctx.registry.get(b).unwrap();
        assert!(boss.alive);
        assert!(boss.health <= 0.0);
        assert_eq!(ctx.boss.last_hit_by, Some(h));
        assert_eq!(ctx.boss.kills(ctx.world.level), 0);
    }

    #[test]
    fn downed_character_schedules_respawn() {
        let (mut ctx, h, f) = duel(
            fighter(EntityKind::Character, 1.0, 0.0, 3.0),
            fighter(EntityKind::Enemy, 0.0, 0.0, 5.0),
        );
        deal_damage(&mut ctx, h, 10.0, Some(f));
        let e = ctx.registry.get(h).unwrap();
        assert!(!e.alive);
        assert_eq!(e.respawn_at, Some(ctx.now + ctx.config.character_respawn_ms));
    }

    #[test]
    fn heal_caps_at_max() {
        let (mut ctx, h, _) = duel(
            fighter(EntityKind::Character, 1.0, 0.0, 100.0),
            fighter(EntityKind::Enemy, 0.0, 0.0, 5.0),
        );
        ctx.registry.get_mut(h).unwrap().health = 90.0;
        assert!((heal(&mut ctx, h, 50.0) - 10.0).abs() < 1e-9);
        assert_eq!(heal(&mut ctx, h, 50.0), 0.0);
    }
}
