//! Movement integration, boundary handling, knockback and contact
//! detection.

use glam::Vec2;
use tracing::warn;

use super::combat;
use super::rng::GameRng;
use super::state::{EntityId, EntityKind, Knockback, MovementState, SimulationContext};
use super::status;

/// Normalized `v`, or `fallback` when `v` has no usable direction.
pub fn unit_or(v: Vec2, fallback: Vec2) -> Vec2 {
    v.try_normalize().unwrap_or(fallback)
}

fn clamp_axis(v: f32, radius: f32, extent: f32) -> f32 {
    let lo = radius;
    let hi = (extent - radius).max(lo);
    v.max(lo).min(hi)
}

/// Clamp a circle's center into the canvas.
pub fn clamp_to_bounds(pos: Vec2, radius: f32, canvas: Vec2) -> Vec2 {
    Vec2::new(
        clamp_axis(pos.x, radius, canvas.x),
        clamp_axis(pos.y, radius, canvas.y),
    )
}

fn in_bounds(pos: Vec2, radius: f32, canvas: Vec2) -> bool {
    pos.x >= radius && pos.x <= canvas.x - radius && pos.y >= radius && pos.y <= canvas.y - radius
}

/// Random direction biased toward the canvas center. Candidates that would
/// leave the canvas within `lookahead` are rejected; after `retries`
/// rejections the direction points straight at the center.
pub fn center_biased_direction(
    rng: &mut GameRng,
    pos: Vec2,
    radius: f32,
    canvas: Vec2,
    lookahead: f32,
    retries: u32,
) -> Vec2 {
    let center = canvas * 0.5;
    let toward = unit_or(center - pos, Vec2::X);
    for _ in 0..retries {
        let candidate = unit_or(rng.direction() + toward, toward);
        if in_bounds(pos + candidate * lookahead, radius, canvas) {
            return candidate;
        }
    }
    toward
}

fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Advance every moving entity by one tick.
pub fn update(ctx: &mut SimulationContext) {
    let now = ctx.now;
    let canvas = ctx.canvas();
    let tick_rate = ctx.config.tick_rate.max(1) as f32;
    let lookahead = ctx.config.wander_lookahead;
    let retries = ctx.config.wander_retry_limit;

    for id in ctx.field_ids() {
        let charge_target = match ctx.registry.get(id) {
            Some(e) if e.is_active() && e.kind != EntityKind::ResourcePoint => match e.movement {
                MovementState::Charging { target, .. } => {
                    Some(ctx.registry.get(target).filter(|t| t.is_active()).map(|t| t.position))
                }
                _ => None,
            },
            _ => continue,
        };
        let Some(e) = ctx.registry.get_mut(id) else {
            continue;
        };

        if !e.position.is_finite() {
            warn!(?id, "non-finite position, restoring last good position");
            e.position = e.last_good_position;
        }

        let movement = e.movement;
        match movement {
            MovementState::KnockedBack(kb) => {
                let t = if kb.duration_ms > 0.0 {
                    (now - kb.started_at) / kb.duration_ms
                } else {
                    1.0
                };
                if t >= 1.0 {
                    e.position = kb.to;
                    e.movement = MovementState::Wandering;
                    e.direction = match kb.resume_direction {
                        Some(dir) if e.kind != EntityKind::Boss => dir,
                        _ => center_biased_direction(&mut ctx.rng, e.position, e.radius, canvas, lookahead, retries),
                    };
                } else {
                    e.position = kb.from.lerp(kb.to, ease_out(t) as f32);
                }
            }
            _ if status::is_stunned(e) => {}
            MovementState::Charging {
                speed_multiplier, ..
            } => match charge_target.flatten() {
                Some(target_pos) => {
                    e.direction = unit_or(target_pos - e.position, e.direction);
                    let step = e.secondary.move_speed as f32 * speed_multiplier as f32 / tick_rate;
                    e.position += e.direction * step;
                }
                None => status::cancel_charge(e),
            },
            MovementState::Wandering => {
                let step = e.secondary.move_speed.max(0.0) as f32 / tick_rate;
                e.position += e.direction * step;
            }
        }

        if !e.is_knocked_back() && !in_bounds(e.position, e.radius, canvas) {
            e.position = clamp_to_bounds(e.position, e.radius, canvas);
            if !matches!(e.movement, MovementState::Charging { .. }) {
                e.direction = center_biased_direction(&mut ctx.rng, e.position, e.radius, canvas, lookahead, retries);
            }
        }

        if e.position.is_finite() {
            e.last_good_position = e.position;
        } else {
            warn!(?id, "movement produced a non-finite position");
            e.position = e.last_good_position;
        }
    }
}

/// Begin a knockback of `id` away from `from`. Distance scales with
/// `other_weight / own_weight`, clamped; the landing point is kept inside
/// the canvas.
pub fn knock_back(ctx: &mut SimulationContext, id: EntityId, from: Vec2, other_weight: f64) {
    let now = ctx.now;
    let canvas = ctx.canvas();
    let cfg = &ctx.config;
    let (base, min_ratio, max_ratio, duration_ms) = (
        cfg.knockback_base_distance,
        cfg.knockback_min_ratio,
        cfg.knockback_max_ratio,
        cfg.knockback_ms,
    );
    let fallback = ctx.rng.direction();
    let Some(e) = ctx.registry.get_mut(id) else {
        return;
    };
    if !e.is_active() || e.kind == EntityKind::ResourcePoint {
        return;
    }
    let own = if e.secondary.weight > 0.0 { e.secondary.weight } else { 1.0 };
    let other = if other_weight > 0.0 { other_weight } else { 1.0 };
    let ratio = ((other / own) as f32).clamp(min_ratio, max_ratio);
    let away = unit_or(e.position - from, fallback);
    let to = clamp_to_bounds(e.position + away * base * ratio, e.radius, canvas);
    let resume_direction = match e.movement {
        MovementState::KnockedBack(prev) => prev.resume_direction,
        _ => Some(e.direction),
    };
    status::cancel_charge(e);
    e.movement = MovementState::KnockedBack(Knockback {
        from: e.position,
        to,
        started_at: now,
        duration_ms,
        resume_direction,
    });
}

/// Pairwise character × hostile contact: combat exchange plus mutual
/// knockback, gated by a per-pair cooldown.
pub fn resolve_collisions(ctx: &mut SimulationContext) {
    let now = ctx.now;
    let cooldown = ctx.config.collision_cooldown_ms;
    ctx.world
        .collision_cooldowns
        .retain(|_, at| now - *at < cooldown * 10.0);

    let characters = ctx.living_characters();
    let hostiles = ctx.living_enemies();
    for &a in &characters {
        for &b in &hostiles {
            let (Some(ea), Some(eb)) = (ctx.registry.get(a), ctx.registry.get(b)) else {
                continue;
            };
            if !ea.is_active() || !eb.is_active() {
                continue;
            }
            if ea.position.distance(eb.position) > ea.radius + eb.radius {
                continue;
            }
            if let Some(at) = ctx.world.collision_cooldowns.get(&(a, b)) {
                if now - at < cooldown {
                    continue;
                }
            }
            let (pos_a, pos_b) = (ea.position, eb.position);
            let (weight_a, weight_b) = (ea.secondary.weight, eb.secondary.weight);
            ctx.world.collision_cooldowns.insert((a, b), now);

            combat::resolve_contact(ctx, a, b);
            knock_back(ctx, a, pos_b, weight_b);
            knock_back(ctx, b, pos_a, weight_a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::SimConfig;
    use super::super::state::Entity;

    fn ctx() -> SimulationContext {
        SimulationContext::new(SimConfig::default(), 8)
    }

    fn body(kind: EntityKind, pos: Vec2, weight: f64) -> Entity {
        let mut e = Entity::new(kind, "slime", pos, 10.0);
        e.health = 1_000.0;
        e.max_health = 1_000.0;
        e.secondary.weight = weight;
        e.secondary.move_speed = 60.0;
        e.secondary.attack_power = 1.0;
        e
    }

    fn run_until_settled(ctx: &mut SimulationContext) {
        for _ in 0..60 {
            ctx.now += ctx.config.ms_per_tick();
            update(ctx);
        }
    }

    #[test]
    fn wandering_moves_by_speed_over_tick_rate() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Enemy, Vec2::new(400.0, 300.0), 10.0);
        e.direction = Vec2::X;
        let id = ctx.registry.insert(e);
        update(&mut ctx);
        assert!((ctx.registry.get(id).unwrap().position.x - 401.0).abs() < 1e-4);
    }

    #[test]
    fn benched_character_stays_put() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Character, Vec2::new(400.0, 300.0), 10.0);
        e.direction = Vec2::X;
        let benched = ctx.registry.insert(e);
        ctx.world.bench.push(benched);
        let mut e = body(EntityKind::Character, Vec2::new(200.0, 300.0), 10.0);
        e.direction = Vec2::X;
        let fielded = ctx.registry.insert(e);
        ctx.world.characters.push(fielded);

        run_until_settled(&mut ctx);
        assert_eq!(ctx.registry.get(benched).unwrap().position, Vec2::new(400.0, 300.0));
        assert_ne!(ctx.registry.get(fielded).unwrap().position, Vec2::new(200.0, 300.0));
    }

    #[test]
    fn boundary_clamps_and_turns_inward() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Enemy, Vec2::new(789.5, 300.0), 10.0);
        e.direction = Vec2::X;
        let id = ctx.registry.insert(e);
        update(&mut ctx);
        let e = ctx.registry.get(id).unwrap();
        assert!(e.position.x <= 790.0);
        assert!(e.direction.x <= 0.0);
    }

    #[test]
    fn center_direction_fallback() {
        let mut rng = GameRng::seeded(1);
        // Lookahead larger than the canvas: every candidate is rejected.
        let d = center_biased_direction(&mut rng, Vec2::new(10.0, 10.0), 5.0, Vec2::new(100.0, 100.0), 1_000.0, 4);
        let expected = Vec2::new(40.0, 40.0).normalize();
        assert!((d - expected).length() < 1e-5);
    }

    #[test]
    fn lighter_body_flies_further() {
        let mut ctx = ctx();
        let a = ctx.registry.insert(body(EntityKind::Character, Vec2::new(400.0, 300.0), 10.0));
        let b = ctx.registry.insert(body(EntityKind::Enemy, Vec2::new(415.0, 300.0), 40.0));
        ctx.world.characters.push(a);
        ctx.world.enemies.push(b);
        resolve_collisions(&mut ctx);
        let dist = |id| match ctx.registry.get(id).unwrap().movement {
            MovementState::KnockedBack(kb) => kb.from.distance(kb.to),
            other => panic!("not knocked back: {:?}", other),
        };
        assert!(dist(a) > dist(b));
        // ratio 4 clamps to 2.5, ratio 0.25 clamps to 0.3
        assert!((dist(a) - 100.0).abs() < 1e-3);
        assert!((dist(b) - 12.0).abs() < 1e-3);
    }

    #[test]
    fn equal_weight_uses_base_distance() {
        let mut ctx = ctx();
        let a = ctx.registry.insert(body(EntityKind::Character, Vec2::new(400.0, 300.0), 20.0));
        let b = ctx.registry.insert(body(EntityKind::Enemy, Vec2::new(415.0, 300.0), 20.0));
        ctx.world.characters.push(a);
        ctx.world.enemies.push(b);
        resolve_collisions(&mut ctx);
        match ctx.registry.get(a).unwrap().movement {
            MovementState::KnockedBack(kb) => assert!((kb.from.distance(kb.to) - 40.0).abs() < 1e-3),
            other => panic!("not knocked back: {:?}", other),
        }
    }

    #[test]
    fn collision_cooldown_suppresses_rehit() {
        let mut ctx = ctx();
        ctx.config.contact_invuln_ms = 0.0;
        let a = ctx.registry.insert(body(EntityKind::Character, Vec2::new(400.0, 300.0), 20.0));
        let b = ctx.registry.insert(body(EntityKind::Enemy, Vec2::new(415.0, 300.0), 20.0));
        ctx.world.characters.push(a);
        ctx.world.enemies.push(b);
        resolve_collisions(&mut ctx);
        let after_first = ctx.registry.get(b).unwrap().health;
        // Still overlapping (knockback has not moved them yet).
        ctx.now += 50.0;
        resolve_collisions(&mut ctx);
        assert_eq!(ctx.registry.get(b).unwrap().health, after_first);
        ctx.now += 60.0;
        resolve_collisions(&mut ctx);
        assert!(ctx.registry.get(b).unwrap().health < after_first);
    }

    #[test]
    fn knockback_lands_in_bounds_and_restores_direction() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Character, Vec2::new(15.0, 15.0), 1.0);
        e.direction = Vec2::Y;
        let id = ctx.registry.insert(e);
        knock_back(&mut ctx, id, Vec2::new(30.0, 30.0), 100.0);
        run_until_settled(&mut ctx);
        let e = ctx.registry.get(id).unwrap();
        assert_eq!(e.movement, MovementState::Wandering);
        assert!(e.position.x >= e.radius && e.position.y >= e.radius);
        assert_eq!(e.direction, Vec2::Y);
    }

    #[test]
    fn knockback_ignores_movement_input() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Enemy, Vec2::new(400.0, 300.0), 10.0);
        e.direction = Vec2::Y;
        let id = ctx.registry.insert(e);
        knock_back(&mut ctx, id, Vec2::new(390.0, 300.0), 10.0);
        ctx.now += 250.0;
        update(&mut ctx);
        let e = ctx.registry.get(id).unwrap();
        assert!((e.position.y - 300.0).abs() < 1e-4);
        assert!(e.position.x > 400.0);
    }

    #[test]
    fn nan_position_restored() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Enemy, Vec2::new(200.0, 200.0), 10.0);
        e.last_good_position = Vec2::new(200.0, 200.0);
        e.position = Vec2::new(f32::NAN, 5.0);
        e.secondary.move_speed = 0.0;
        let id = ctx.registry.insert(e);
        update(&mut ctx);
        assert_eq!(ctx.registry.get(id).unwrap().position, Vec2::new(200.0, 200.0));
    }

    #[test]
    fn charge_ends_when_target_gone() {
        let mut ctx = ctx();
        let mut e = body(EntityKind::Character, Vec2::new(200.0, 200.0), 10.0);
        e.movement = MovementState::Charging {
            target: EntityId(999),
            speed_multiplier: 2.0,
        };
        let id = ctx.registry.insert(e);
        update(&mut ctx);
        assert_eq!(ctx.registry.get(id).unwrap().movement, MovementState::Wandering);
    }

    #[test]
    fn collision_cancels_charge() {
        let mut ctx = ctx();
        let b = ctx.registry.insert(body(EntityKind::Enemy, Vec2::new(415.0, 300.0), 20.0));
        let mut hero = body(EntityKind::Character, Vec2::new(400.0, 300.0), 20.0);
        hero.movement = MovementState::Charging {
            target: b,
            speed_multiplier: 2.0,
        };
        let a = ctx.registry.insert(hero);
        ctx.world.characters.push(a);
        ctx.world.enemies.push(b);
        resolve_collisions(&mut ctx);
        assert!(ctx.registry.get(a).unwrap().is_knocked_back());
        ctx.now += 600.0;
        update(&mut ctx);
        assert_eq!(ctx.registry.get(a).unwrap().movement, MovementState::Wandering);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    use super::super::config::SimConfig;
    use super::super::state::Entity;

    proptest! {
        #[test]
        fn prop_knockback_ends_in_bounds(
            x in 0.0f32..800.0,
            y in 0.0f32..600.0,
            fx in -100.0f32..900.0,
            fy in -100.0f32..700.0,
            own in 0.1f64..500.0,
            other in 0.1f64..500.0,
        ) {
            let mut ctx = SimulationContext::new(SimConfig::default(), 77);
            let mut e = Entity::new(EntityKind::Enemy, "slime", Vec2::new(x, y), 10.0);
            e.health = 10.0;
            e.secondary.weight = own;
            let id = ctx.registry.insert(e);
            knock_back(&mut ctx, id, Vec2::new(fx, fy), other);
            for _ in 0..40 {
                ctx.now += ctx.config.ms_per_tick();
                update(&mut ctx);
            }
            let e = ctx.registry.get(id).unwrap();
            prop_assert!(!e.is_knocked_back());
            prop_assert!(e.position.x >= e.radius && e.position.x <= 800.0 - e.radius);
            prop_assert!(e.position.y >= e.radius && e.position.y <= 600.0 - e.radius);
        }
    }
}
