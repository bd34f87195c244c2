//! Tick orchestration, fault policy and the read-only frame snapshot.
//!
//! One frame feeds the wall clock into [`GameTime`], credits idle gold when
//! the driver stalled, then runs the owed ticks. Each tick runs the systems
//! in a fixed order; a tick that faults (error or panic) triggers an
//! emergency cleanup and the loop carries on. Two faulting ticks in a row
//! stop the loop.

use std::panic::{self, AssertUnwindSafe};

use glam::Vec2;
use tracing::{error, info, warn};

use super::boss::{self, BossState};
use super::config::SimConfig;
use super::error::TickFault;
use super::movement;
use super::projectile;
use super::skills;
use super::spawner;
use super::state::{DamageNumber, EntityId, EntityKind, GameEvent, SimulationContext};
use super::stats;
use super::status;
use crate::time::{Clock, GameTime, Watchdog};

#[derive(Clone, Debug, PartialEq)]
pub enum LoopStatus {
    Running,
    /// Stopped after repeated faults; the shell asks for a reload.
    Fatal(String),
}

pub struct GameLoop {
    pub ctx: SimulationContext,
    time: GameTime,
    watchdog: Watchdog,
    pub status: LoopStatus,
    consecutive_faults: u32,
    /// Total faults survived since start.
    pub faults: u32,
}

impl GameLoop {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self::from_context(SimulationContext::new(config, seed))
    }

    pub fn from_context(ctx: SimulationContext) -> Self {
        let time = GameTime::new(ctx.config.tick_rate);
        let watchdog = Watchdog::new(ctx.config.stall_threshold_ms, ctx.config.idle_cap_hours);
        Self {
            ctx,
            time,
            watchdog,
            status: LoopStatus::Running,
            consecutive_faults: 0,
            faults: 0,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.status, LoopStatus::Fatal(_))
    }

    /// Drive one rendered frame. Returns the number of ticks run.
    pub fn frame(&mut self, clock: &dyn Clock) -> u32 {
        let now = clock.now_ms();
        self.ctx.wall_ms = now;
        let ticks = self.time.update(now);
        if let Some(idle_ms) = self.watchdog.check_gap(self.time.last_gap_ms) {
            credit_idle(&mut self.ctx, idle_ms);
        }
        self.run_ticks(ticks)
    }

    pub fn run_ticks(&mut self, ticks: u32) -> u32 {
        let mut ran = 0;
        for _ in 0..ticks {
            if self.is_fatal() {
                break;
            }
            let _ = self.run_tick();
            ran += 1;
        }
        ran
    }

    pub fn run_tick(&mut self) -> Result<(), TickFault> {
        self.run_guarded(step)
    }

    /// Run `tick` with panic capture and the fault policy applied.
    pub fn run_guarded(
        &mut self,
        tick: impl FnOnce(&mut SimulationContext) -> Result<(), TickFault>,
    ) -> Result<(), TickFault> {
        if let LoopStatus::Fatal(msg) = &self.status {
            return Err(TickFault::Panicked(msg.clone()));
        }
        let ctx = &mut self.ctx;
        let result = match panic::catch_unwind(AssertUnwindSafe(|| tick(ctx))) {
            Ok(result) => result,
            Err(payload) => Err(TickFault::Panicked(panic_message(payload.as_ref()))),
        };
        match &result {
            Ok(()) => self.consecutive_faults = 0,
            Err(fault) => {
                self.faults += 1;
                self.consecutive_faults += 1;
                emergency_cleanup(&mut self.ctx);
                if self.consecutive_faults >= 2 {
                    error!(%fault, "second consecutive faulting tick, stopping");
                    self.status = LoopStatus::Fatal(fault.to_string());
                } else {
                    warn!(%fault, "tick faulted, cleaned up and resuming");
                }
            }
        }
        result
    }

    pub fn view(&self) -> FrameView {
        view(&self.ctx, &self.status)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// One simulation tick.
pub fn step(ctx: &mut SimulationContext) -> Result<(), TickFault> {
    ctx.now += ctx.config.ms_per_tick();
    verify_lists(ctx)?;

    movement::update(ctx);
    projectile::update(ctx);
    movement::resolve_collisions(ctx);
    status::update(ctx);
    skills::auto_cast(ctx);
    boss::update(ctx);
    stats::recompute_dirty(ctx);
    spawner::respawn_characters(ctx);
    spawner::top_up(ctx);
    decay_transients(ctx);
    sweep_dead(ctx);

    check_overflow(ctx)
}

fn verify_lists(ctx: &SimulationContext) -> Result<(), TickFault> {
    let lists: [(&'static str, &[EntityId]); 3] = [
        ("characters", &ctx.world.characters),
        ("bench", &ctx.world.bench),
        ("enemies", &ctx.world.enemies),
    ];
    for (list, ids) in lists {
        if let Some(id) = ids.iter().find(|id| !ctx.registry.contains(**id)) {
            return Err(TickFault::DanglingReference { list, id: *id });
        }
    }
    Ok(())
}

fn check_overflow(ctx: &SimulationContext) -> Result<(), TickFault> {
    let cfg = &ctx.config;
    let w = &ctx.world;
    let checks = [
        ("projectiles", w.projectiles.len(), cfg.max_projectiles),
        ("zones", w.zones.len(), cfg.max_zones),
    ];
    for (collection, len, max) in checks {
        if len > max {
            return Err(TickFault::TransientOverflow { collection, len });
        }
    }
    Ok(())
}

/// Expire overlays. Damage numbers and particles are cosmetic, so past
/// their cap the oldest are dropped instead of faulting.
fn decay_transients(ctx: &mut SimulationContext) {
    let now = ctx.now;
    let ttl = ctx.config.damage_number_ms;
    let dt = (ctx.config.ms_per_tick() / 1000.0) as f32;
    ctx.world.damage_numbers.retain(|d| now - d.created_at < ttl);
    ctx.world.particles.retain(|p| now < p.expires_at);
    for p in ctx.world.particles.iter_mut() {
        p.position += p.velocity * dt;
    }
    trim_front(&mut ctx.world.damage_numbers, ctx.config.max_damage_numbers);
    trim_front(&mut ctx.world.particles, ctx.config.max_particles);
}

/// Remove dead hostiles. Characters stay listed and wait for respawn; a
/// boss at zero health stays until its defeat is confirmed.
fn sweep_dead(ctx: &mut SimulationContext) {
    let dead: Vec<EntityId> = ctx
        .world
        .enemies
        .iter()
        .copied()
        .filter(|id| ctx.registry.get(*id).is_some_and(|e| !e.alive))
        .collect();
    for id in dead {
        ctx.registry.remove(id);
        ctx.world.unlist(id);
    }
}

fn trim_front<T>(items: &mut Vec<T>, keep: usize) {
    if items.len() > keep {
        let excess = items.len() - keep;
        items.drain(..excess);
    }
}

/// Recovery after a faulting tick: halve every transient collection
/// (oldest first), drop dangling ids and reset collision cooldowns.
pub fn emergency_cleanup(ctx: &mut SimulationContext) {
    let cfg = &ctx.config;
    let (p, z, d, pa) = (
        cfg.max_projectiles / 2,
        cfg.max_zones / 2,
        cfg.max_damage_numbers / 2,
        cfg.max_particles / 2,
    );
    trim_front(&mut ctx.world.projectiles, p);
    trim_front(&mut ctx.world.zones, z);
    trim_front(&mut ctx.world.damage_numbers, d);
    trim_front(&mut ctx.world.particles, pa);

    let registry = &ctx.registry;
    ctx.world.characters.retain(|id| registry.contains(*id));
    ctx.world.bench.retain(|id| registry.contains(*id));
    ctx.world.enemies.retain(|id| registry.contains(*id));
    ctx.world.collision_cooldowns.clear();

    if ctx.boss.boss.is_some_and(|id| !ctx.registry.contains(id)) {
        ctx.boss.abandon();
    }
    info!("emergency cleanup done");
}

/// Gold for time spent away, at the configured hourly rate.
pub fn credit_idle(ctx: &mut SimulationContext, idle_ms: f64) -> u64 {
    let gold = (ctx.config.idle_gold_per_hour * idle_ms / 3_600_000.0).floor().max(0.0) as u64;
    ctx.inventory.gold += gold;
    info!(gold, idle_ms, "idle reward credited");
    ctx.world.push_event(GameEvent::IdleReward { gold, idle_ms });
    gold
}

// ── Snapshot for rendering ────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub template: String,
    pub position: Vec2,
    pub radius: f32,
    pub health_percent: f64,
    pub statuses: Vec<&'static str>,
    pub alive: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BossView {
    pub template: String,
    pub phase: usize,
    pub health_percent: f64,
}

/// Read-only picture of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameView {
    pub canvas: Vec2,
    pub entities: Vec<EntityView>,
    pub projectiles: Vec<Vec2>,
    pub zones: Vec<(Vec2, f32)>,
    pub damage_numbers: Vec<DamageNumber>,
    pub gold: u64,
    pub level: u32,
    pub kills: u32,
    pub boss_threshold: u32,
    pub boss: Option<BossView>,
    pub status: LoopStatus,
}

pub fn view(ctx: &SimulationContext, status: &LoopStatus) -> FrameView {
    let entities = ctx
        .world
        .characters
        .iter()
        .chain(ctx.world.enemies.iter())
        .filter_map(|id| ctx.registry.get(*id))
        .map(|e| EntityView {
            id: e.id,
            kind: e.kind,
            template: e.template.clone(),
            position: e.position,
            radius: e.radius,
            health_percent: e.health_percent(),
            statuses: e.statuses.iter().map(|s| s.id).collect(),
            alive: e.alive,
        })
        .collect();
    let boss = match (ctx.boss.state, ctx.boss.boss) {
        (BossState::Active { phase }, Some(id)) => ctx.registry.get(id).map(|e| BossView {
            template: e.template.clone(),
            phase,
            health_percent: e.health_percent(),
        }),
        _ => None,
    };
    FrameView {
        canvas: ctx.canvas(),
        entities,
        projectiles: ctx.world.projectiles.iter().map(|p| p.position).collect(),
        zones: ctx.world.zones.iter().map(|z| (z.center, z.radius)).collect(),
        damage_numbers: ctx.world.damage_numbers.clone(),
        gold: ctx.inventory.gold,
        level: ctx.world.level,
        kills: ctx.boss.kills(ctx.world.level),
        boss_threshold: ctx.boss.threshold,
        boss,
        status: status.clone(),
    }
}
