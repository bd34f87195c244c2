//! Experience and leveling.

use tracing::{info, warn};

use super::state::{EntityId, GameEvent, SimulationContext};
use super::stats;

/// Experience needed to clear `level`.
pub fn max_exp(level: u32) -> f64 {
    let l = level.max(1) as f64;
    (100.0 * l.powf(1.5) + l * 50.0).floor().max(100.0)
}

/// Grant experience to `id`, scaled by its `expGainPercent`. Returns the
/// number of levels gained. At most `max_level_ups_per_award` levels are
/// processed per call; the remainder stays banked.
pub fn award_exp(ctx: &mut SimulationContext, id: EntityId, amount: f64) -> u32 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    let cap = ctx.config.max_level_ups_per_award;
    let points = ctx.config.level_up_attribute_points;
    let Some(e) = ctx.registry.get_mut(id) else {
        return 0;
    };
    if !e.is_active() {
        return 0;
    }
    let gain_pct = if e.secondary.exp_gain_percent > 0.0 {
        e.secondary.exp_gain_percent
    } else {
        100.0
    };
    e.exp += amount * gain_pct / 100.0;

    let mut gained = 0;
    while e.exp >= e.max_exp && gained < cap {
        e.exp -= e.max_exp;
        e.level += 1;
        for _ in 0..points {
            match ctx.rng.index(4) {
                Some(0) => e.primary.strength += 1,
                Some(1) => e.primary.agility += 1,
                Some(2) => e.primary.intelligence += 1,
                _ => e.primary.skill += 1,
            }
        }
        e.max_exp = max_exp(e.level);
        gained += 1;
    }
    if gained == cap && e.exp >= e.max_exp {
        warn!(?id, cap, "level-up cap reached in a single award");
    }
    if gained > 0 {
        stats::recompute(e);
        e.health = e.max_health;
        let level = e.level;
        info!(?id, level, "level up");
        ctx.world.push_event(GameEvent::LevelUp { id, level });
    }
    gained
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use super::super::config::SimConfig;
    use super::super::state::{Entity, EntityKind, PrimaryAttributes, SecondaryAttributes};

    fn ctx_with_hero() -> (SimulationContext, EntityId) {
        let mut ctx = SimulationContext::new(SimConfig::default(), 3);
        let mut e = Entity::new(EntityKind::Character, "hero", Vec2::new(50.0, 50.0), 12.0);
        e.primary = PrimaryAttributes::uniform(1);
        e.base = SecondaryAttributes::character_base();
        e.base.exp_gain_percent = 99.0; // +1 INT → 100%
        stats::recompute(&mut e);
        e.health = e.max_health;
        let id = ctx.registry.insert(e);
        ctx.world.characters.push(id);
        (ctx, id)
    }

    #[test]
    fn max_exp_known_values() {
        assert_eq!(max_exp(1), 150.0);
        assert_eq!(max_exp(4), 1_000.0);
        assert_eq!(max_exp(0), max_exp(1));
    }

    #[test]
    fn single_level_up_refills_health() {
        let (mut ctx, id) = ctx_with_hero();
        ctx.registry.get_mut(id).unwrap().health = 10.0;
        assert_eq!(award_exp(&mut ctx, id, 150.0), 1);
        let e = ctx.registry.get(id).unwrap();
        assert_eq!(e.level, 2);
        assert_eq!(e.exp, 0.0);
        assert_eq!(e.primary.total(), 4 + 3);
        assert_eq!(e.health, e.max_health);
    }

    #[test]
    fn huge_award_is_bounded() {
        let (mut ctx, id) = ctx_with_hero();
        let gained = award_exp(&mut ctx, id, 1e15);
        assert_eq!(gained, ctx.config.max_level_ups_per_award);
        assert_eq!(ctx.registry.get(id).unwrap().level, 1 + gained);
    }

    #[test]
    fn non_finite_award_ignored() {
        let (mut ctx, id) = ctx_with_hero();
        assert_eq!(award_exp(&mut ctx, id, f64::NAN), 0);
        assert_eq!(award_exp(&mut ctx, id, -5.0), 0);
        assert_eq!(ctx.registry.get(id).unwrap().exp, 0.0);
    }

    #[test]
    fn exp_gain_percent_scales_award() {
        let (mut ctx, id) = ctx_with_hero();
        ctx.registry.get_mut(id).unwrap().secondary.exp_gain_percent = 150.0;
        award_exp(&mut ctx, id, 40.0);
        assert!((ctx.registry.get(id).unwrap().exp - 60.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_max_exp_strictly_increasing(level in 1u32..10_000) {
            prop_assert!(max_exp(level + 1) > max_exp(level));
            prop_assert!(max_exp(level) >= 100.0);
        }
    }
}
