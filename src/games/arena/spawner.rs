//! Entity construction and population management: level rosters, top-up,
//! character respawn, new game and travel between levels.

use glam::Vec2;
use tracing::{debug, info};

use super::equipment::{self, EquipSlot};
use super::error::ActionError;
use super::skills::SkillId;
use super::state::{
    Entity, EntityId, EntityKind, GameEvent, KillReward, MovementState, PrimaryAttributes,
    SecondaryAttributes, SimulationContext, SkillSlot,
};
use super::stats;
use super::tables::{self, EnemyKind, ResourceKind};

const CHARACTER_RADIUS: f32 = 12.0;
const HEALTH_PER_LEVEL: f64 = 0.25;
const ATTACK_PER_LEVEL: f64 = 0.15;
const REWARD_PER_LEVEL: f64 = 0.2;

/// Uniform point with the whole circle inside the canvas.
pub fn random_position(ctx: &mut SimulationContext, radius: f32) -> Vec2 {
    let canvas = ctx.canvas();
    let x = ctx
        .rng
        .float_inclusive(radius as f64, (canvas.x - radius).max(radius) as f64);
    let y = ctx
        .rng
        .float_inclusive(radius as f64, (canvas.y - radius).max(radius) as f64);
    Vec2::new(x as f32, y as f32)
}

/// A level-1 character with every primary attribute at `attributes`, Slash
/// learned and slotted.
pub fn build_character(template: &str, position: Vec2, attributes: u32) -> Entity {
    let mut e = Entity::new(EntityKind::Character, template, position, CHARACTER_RADIUS);
    e.primary = PrimaryAttributes::uniform(attributes);
    e.base = SecondaryAttributes::character_base();
    e.learned.insert(SkillId::Slash, 1);
    e.skills[0] = Some(SkillSlot::new(SkillId::Slash));
    e.max_health = 100.0;
    e.health = 100.0;
    stats::recompute(&mut e);
    e.health = e.max_health;
    e
}

pub fn build_enemy(kind: EnemyKind, level: u32, position: Vec2) -> Entity {
    let info = tables::enemy_info(kind);
    let mut e = Entity::new(EntityKind::Enemy, info.key, position, info.radius);
    e.base = SecondaryAttributes {
        attack_power: (info.attack * tables::level_scale(level, ATTACK_PER_LEVEL)).floor(),
        defense: info.defense,
        move_speed: info.speed,
        weight: info.weight,
        ..SecondaryAttributes::default()
    };
    e.max_health = (info.max_health * tables::level_scale(level, HEALTH_PER_LEVEL)).floor();
    e.health = e.max_health;
    e.level = level;
    let reward_scale = tables::level_scale(level, REWARD_PER_LEVEL);
    e.reward = KillReward {
        exp: info.exp * reward_scale,
        gold: (info.gold as f64 * reward_scale).floor() as u64,
    };
    stats::recompute(&mut e);
    e
}

pub fn build_resource(kind: ResourceKind, position: Vec2) -> Entity {
    let info = tables::resource_info(kind);
    let mut e = Entity::new(EntityKind::ResourcePoint, info.key, position, info.radius);
    e.base = SecondaryAttributes {
        defense: info.defense,
        weight: 1_000.0,
        ..SecondaryAttributes::default()
    };
    e.max_health = info.max_health;
    e.health = info.max_health;
    e.reward = KillReward {
        exp: info.exp,
        gold: 0,
    };
    stats::recompute(&mut e);
    e
}

fn insert_hostile(ctx: &mut SimulationContext, mut entity: Entity) -> EntityId {
    entity.direction = ctx.rng.direction();
    let id = ctx.registry.insert(entity);
    ctx.world.enemies.push(id);
    id
}

pub fn spawn_enemy(ctx: &mut SimulationContext, kind: EnemyKind, level: u32, position: Vec2) -> EntityId {
    let mut enemy = build_enemy(kind, level, position);
    let position = super::movement::clamp_to_bounds(position, enemy.radius, ctx.canvas());
    enemy.position = position;
    enemy.last_good_position = position;
    insert_hostile(ctx, enemy)
}

fn count_living(ctx: &SimulationContext, kind: EntityKind) -> usize {
    ctx.world
        .enemies
        .iter()
        .filter_map(|id| ctx.registry.get(*id))
        .filter(|e| e.kind == kind && e.is_active())
        .count()
}

/// Refill the level's enemy population and resource points.
pub fn top_up(ctx: &mut SimulationContext) {
    let level = tables::level_info(ctx.world.level);
    let enemies = count_living(ctx, EntityKind::Enemy);
    for _ in enemies..level.population {
        let Some(kind) = ctx.rng.pick(level.roster).copied() else {
            break;
        };
        let radius = tables::enemy_info(kind).radius;
        let pos = random_position(ctx, radius);
        spawn_enemy(ctx, kind, level.enemy_level, pos);
    }
    let resources = count_living(ctx, EntityKind::ResourcePoint);
    for _ in resources..level.resource_count {
        let Some(kind) = ctx.rng.pick(level.resources).copied() else {
            break;
        };
        let pos = random_position(ctx, tables::resource_info(kind).radius);
        insert_hostile(ctx, build_resource(kind, pos));
    }
}

/// Bring downed characters back once their timer runs out.
pub fn respawn_characters(ctx: &mut SimulationContext) {
    let now = ctx.now;
    let invuln = ctx.config.contact_invuln_ms;
    for id in ctx.world.characters.clone() {
        let due = ctx
            .registry
            .get(id)
            .is_some_and(|e| !e.alive && e.respawn_at.is_some_and(|t| now >= t));
        if !due {
            continue;
        }
        let pos = random_position(ctx, CHARACTER_RADIUS);
        let Some(e) = ctx.registry.get_mut(id) else {
            continue;
        };
        e.alive = true;
        e.respawn_at = None;
        e.position = pos;
        e.last_good_position = pos;
        e.movement = MovementState::Wandering;
        e.invulnerable_until = now + invuln;
        e.mana = 0.0;
        stats::recompute(e);
        e.health = e.max_health;
        info!(?id, "character respawned");
        ctx.world.push_event(GameEvent::CharacterRespawned { id });
    }
}

/// Add a character to the team (or the bench when the team is full).
pub fn add_character(ctx: &mut SimulationContext, mut character: Entity) -> EntityId {
    character.position = random_position(ctx, character.radius);
    character.last_good_position = character.position;
    character.direction = ctx.rng.direction();
    let id = ctx.registry.insert(character);
    if ctx.world.characters.len() < ctx.config.max_team_size {
        ctx.world.characters.push(id);
    } else {
        ctx.world.bench.push(id);
    }
    id
}

/// Fresh world: one hero with a wooden sword on level 1.
pub fn start_new_game(ctx: &mut SimulationContext) -> EntityId {
    ctx.registry = Default::default();
    ctx.world = super::state::World {
        level: 1,
        ..Default::default()
    };
    ctx.boss = super::boss::BossController::new(&ctx.config);

    let mut hero = build_character("hero", Vec2::ZERO, 1);
    if let Some(template) = equipment::find_template("wooden_sword") {
        let sword = equipment::generate(template, &mut ctx.rng);
        hero.equipment[EquipSlot::Weapon.index()] = Some(sword);
        stats::recompute(&mut hero);
        hero.health = hero.max_health;
    }
    let id = add_character(ctx, hero);
    top_up(ctx);
    info!("new game started");
    id
}

/// Move the team to another level. The current hostiles and any boss
/// encounter are dropped; kill counters persist per level.
pub fn change_level(ctx: &mut SimulationContext, level: u32) -> Result<(), ActionError> {
    if level == 0 || level > tables::LEVEL_COUNT {
        return Err(ActionError::UnknownId(format!("level {level}")));
    }
    if level == ctx.world.level {
        return Ok(());
    }
    for id in std::mem::take(&mut ctx.world.enemies) {
        ctx.registry.remove(id);
    }
    ctx.world.projectiles.clear();
    ctx.world.zones.clear();
    ctx.world.collision_cooldowns.clear();
    ctx.boss.abandon();
    ctx.world.level = level;
    debug!(level, name = tables::level_info(level).name, "changed level");
    top_up(ctx);
    Ok(())
}
