//! Projectiles and area zones spawned by skills.

use glam::Vec2;

use super::combat;
use super::movement::unit_or;
use super::state::{EntityId, SimulationContext, Team};
use super::status::{self, StatusTemplate};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Straight,
    /// Steers toward `target` while it exists, then flies straight.
    Tracking,
    /// Flies out, turns at `turn_at` and homes back to its source.
    Boomerang { turn_at: f64, returning: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub source: EntityId,
    pub team: Team,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub target: Option<EntityId>,
    pub motion: Motion,
    pub damage: f64,
    pub expires_at: f64,
    /// Piercing projectiles keep flying and may re-hit a target after this
    /// many ms.
    pub pierce_rehit_ms: Option<f64>,
    pub hits: Vec<(EntityId, f64)>,
    /// Status applied on hit, with its magnitude scale.
    pub on_hit: Option<(StatusTemplate, f64)>,
    pub spent: bool,
}

impl Projectile {
    pub fn new(
        source: EntityId,
        team: Team,
        position: Vec2,
        velocity: Vec2,
        now: f64,
        lifetime_ms: f64,
        damage: f64,
    ) -> Self {
        Self {
            source,
            team,
            position,
            velocity,
            radius: 4.0,
            target: None,
            motion: Motion::Straight,
            damage,
            expires_at: now + lifetime_ms,
            pierce_rehit_ms: None,
            hits: Vec::new(),
            on_hit: None,
            spent: false,
        }
    }

    fn can_hit(&self, id: EntityId, now: f64) -> bool {
        match self.pierce_rehit_ms {
            None => !self.hits.iter().any(|(h, _)| *h == id),
            Some(cd) => self
                .hits
                .iter()
                .filter(|(h, _)| *h == id)
                .all(|(_, at)| now - at >= cd),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaZone {
    pub source: Option<EntityId>,
    pub team: Team,
    pub center: Vec2,
    pub radius: f32,
    pub expires_at: f64,
    pub tick_ms: f64,
    pub last_tick: f64,
    pub damage: f64,
}

pub fn spawn(ctx: &mut SimulationContext, projectile: Projectile) {
    ctx.world.projectiles.push(projectile);
}

pub fn spawn_zone(ctx: &mut SimulationContext, zone: AreaZone) {
    ctx.world.zones.push(zone);
}

struct Hit {
    target: EntityId,
    source: EntityId,
    damage: f64,
    on_hit: Option<(StatusTemplate, f64)>,
}

/// Move projectiles, collect hits, tick zones, then apply the damage.
pub fn update(ctx: &mut SimulationContext) {
    let now = ctx.now;
    let dt = (ctx.config.ms_per_tick() / 1000.0) as f32;
    let canvas = ctx.canvas();
    let margin = 20.0;

    let mut projectiles = std::mem::take(&mut ctx.world.projectiles);
    let mut hits = Vec::new();
    for p in projectiles.iter_mut() {
        if now >= p.expires_at {
            p.spent = true;
            continue;
        }
        steer(ctx, p, now);
        p.position += p.velocity * dt;
        if !p.position.is_finite()
            || p.position.x < -margin
            || p.position.y < -margin
            || p.position.x > canvas.x + margin
            || p.position.y > canvas.y + margin
        {
            p.spent = true;
            continue;
        }
        for id in ctx.opponents_of(p.team) {
            let Some(e) = ctx.registry.get(id) else {
                continue;
            };
            if e.position.distance(p.position) > e.radius + p.radius || !p.can_hit(id, now) {
                continue;
            }
            p.hits.push((id, now));
            hits.push(Hit {
                target: id,
                source: p.source,
                damage: p.damage,
                on_hit: p.on_hit,
            });
            if p.pierce_rehit_ms.is_none() {
                p.spent = true;
                break;
            }
        }
    }
    projectiles.retain(|p| !p.spent);
    projectiles.append(&mut ctx.world.projectiles);
    ctx.world.projectiles = projectiles;

    for zone in ctx.world.zones.iter_mut() {
        if now < zone.expires_at && now - zone.last_tick >= zone.tick_ms {
            zone.last_tick = now;
            for id in ctx
                .world
                .enemies
                .iter()
                .chain(ctx.world.characters.iter())
            {
                let Some(e) = ctx.registry.get(*id) else {
                    continue;
                };
                if e.team() != zone.team
                    && e.is_active()
                    && e.position.distance(zone.center) <= zone.radius + e.radius
                {
                    hits.push(Hit {
                        target: *id,
                        source: zone.source.unwrap_or(*id),
                        damage: zone.damage,
                        on_hit: None,
                    });
                }
            }
        }
    }
    ctx.world.zones.retain(|z| now < z.expires_at);

    for hit in hits {
        if !ctx.registry.is_active(hit.target) {
            continue;
        }
        let source = Some(hit.source).filter(|s| *s != hit.target);
        combat::deal_damage(ctx, hit.target, hit.damage, source);
        if let Some((template, scale)) = hit.on_hit {
            if let Some(e) = ctx.registry.get_mut(hit.target) {
                if e.is_active() {
                    status::add(e, template.instantiate(now, source, scale));
                }
            }
        }
    }
}

fn steer(ctx: &SimulationContext, p: &mut Projectile, now: f64) {
    let speed = p.velocity.length();
    match p.motion {
        Motion::Straight => {}
        Motion::Tracking => match p.target.and_then(|t| ctx.registry.get(t)).filter(|e| e.is_active()) {
            Some(target) => p.velocity = unit_or(target.position - p.position, p.velocity) * speed,
            None => {
                p.target = None;
                p.motion = Motion::Straight;
            }
        },
        Motion::Boomerang { turn_at, returning } => {
            if !returning && now < turn_at {
                return;
            }
            p.motion = Motion::Boomerang {
                turn_at,
                returning: true,
            };
            match ctx.registry.get(p.source) {
                Some(owner) => {
                    let to_owner = owner.position - p.position;
                    if to_owner.length() <= owner.radius {
                        p.spent = true;
                    }
                    p.velocity = unit_or(to_owner, -p.velocity) * speed;
                }
                None if !returning => p.velocity = -p.velocity,
                None => {}
            }
        }
    }
}
