//! Arena state: entity registry, world lists, inventory and the
//! simulation context every system receives. Data only; behaviour lives in
//! the system modules.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::boss::BossController;
use super::config::SimConfig;
use super::equipment::{EquipSlot, EquipmentItem};
use super::farm::Farm;
use super::projectile::{AreaZone, Projectile};
use super::quest::QuestLog;
use super::rng::GameRng;
use super::skills::SkillId;
use super::status::StatusEffect;
use super::tables::ItemKind;

// ── Identity ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Character,
    Enemy,
    Boss,
    ResourcePoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Team {
    Ally,
    Hostile,
}

impl EntityKind {
    pub fn team(self) -> Team {
        match self {
            EntityKind::Character => Team::Ally,
            EntityKind::Enemy | EntityKind::Boss | EntityKind::ResourcePoint => Team::Hostile,
        }
    }
}

// ── Stat blocks ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryAttributes {
    pub strength: u32,
    pub agility: u32,
    pub intelligence: u32,
    pub skill: u32,
}

impl PrimaryAttributes {
    pub fn uniform(value: u32) -> Self {
        Self {
            strength: value,
            agility: value,
            intelligence: value,
            skill: value,
        }
    }

    pub fn total(&self) -> u32 {
        self.strength + self.agility + self.intelligence + self.skill
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SecondaryAttributes {
    pub attack_power: f64,
    pub defense: f64,
    pub move_speed: f64,
    pub health_regen: f64,
    pub mana_regen: f64,
    pub weight: f64,
    pub volume: f64,
    pub exp_gain_percent: f64,
}

impl SecondaryAttributes {
    /// Template constants shared by every playable character.
    pub fn character_base() -> Self {
        Self {
            attack_power: 10.0,
            defense: 0.0,
            move_speed: 60.0,
            health_regen: 0.5,
            mana_regen: 2.0,
            weight: 50.0,
            volume: 1.0,
            exp_gain_percent: 100.0,
        }
    }
}

// ── Skill slots ───────────────────────────────────────────────

pub const SKILL_SLOTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkillSlot {
    pub skill: SkillId,
    pub last_used: Option<f64>,
}

impl SkillSlot {
    pub fn new(skill: SkillId) -> Self {
        Self {
            skill,
            last_used: None,
        }
    }
}

// ── Movement ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Knockback {
    pub from: Vec2,
    pub to: Vec2,
    pub started_at: f64,
    pub duration_ms: f64,
    /// Direction to resume with once the animation finishes.
    pub resume_direction: Option<Vec2>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MovementState {
    Wandering,
    Charging { target: EntityId, speed_multiplier: f64 },
    KnockedBack(Knockback),
}

// ── Entity ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KillReward {
    pub exp: f64,
    pub gold: u64,
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Catalog key (enemy kind, boss kind, resource kind or character class).
    pub template: String,

    pub position: Vec2,
    pub last_good_position: Vec2,
    pub base_radius: f32,
    pub radius: f32,
    pub direction: Vec2,

    pub health: f64,
    pub max_health: f64,
    pub mana: f64,
    pub max_mana: f64,

    pub level: u32,
    pub exp: f64,
    pub max_exp: f64,

    pub primary: PrimaryAttributes,
    pub base: SecondaryAttributes,
    pub secondary: SecondaryAttributes,

    pub skills: [Option<SkillSlot>; SKILL_SLOTS],
    /// Learned skills and their levels.
    pub learned: BTreeMap<SkillId, u32>,
    pub equipment: [Option<EquipmentItem>; EquipSlot::COUNT],
    pub statuses: Vec<StatusEffect>,

    pub alive: bool,
    pub invulnerable_until: f64,
    pub movement: MovementState,
    pub stats_dirty: bool,
    /// Multiplier consumed by the next outgoing contact hit.
    pub empowered_multiplier: f64,
    pub reward: KillReward,
    pub respawn_at: Option<f64>,
}

impl Entity {
    pub fn new(kind: EntityKind, template: impl Into<String>, position: Vec2, radius: f32) -> Self {
        Self {
            id: EntityId(0),
            kind,
            template: template.into(),
            position,
            last_good_position: position,
            base_radius: radius,
            radius,
            direction: Vec2::X,
            health: 1.0,
            max_health: 1.0,
            mana: 0.0,
            max_mana: 100.0,
            level: 1,
            exp: 0.0,
            max_exp: 100.0,
            primary: PrimaryAttributes::default(),
            base: SecondaryAttributes::default(),
            secondary: SecondaryAttributes::default(),
            skills: [None; SKILL_SLOTS],
            learned: BTreeMap::new(),
            equipment: Default::default(),
            statuses: Vec::new(),
            alive: true,
            invulnerable_until: 0.0,
            movement: MovementState::Wandering,
            stats_dirty: true,
            empowered_multiplier: 1.0,
            reward: KillReward::default(),
            respawn_at: None,
        }
    }

    pub fn team(&self) -> Team {
        self.kind.team()
    }

    pub fn is_boss(&self) -> bool {
        self.kind == EntityKind::Boss
    }

    /// Alive and above zero health.
    pub fn is_active(&self) -> bool {
        self.alive && self.health > 0.0
    }

    pub fn health_percent(&self) -> f64 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health * 100.0).clamp(0.0, 100.0)
        }
    }

    /// Level of a slotted or learned skill; unknown skills count as level 1.
    pub fn skill_level(&self, skill: SkillId) -> u32 {
        self.learned.get(&skill).copied().unwrap_or(1).max(1)
    }

    pub fn equipped(&self, slot: EquipSlot) -> Option<&EquipmentItem> {
        self.equipment[slot.index()].as_ref()
    }

    pub fn is_knocked_back(&self) -> bool {
        matches!(self.movement, MovementState::KnockedBack(_))
    }
}

// ── Registry ──────────────────────────────────────────────────

/// Authoritative id → entity map. Every other collection holds ids.
#[derive(Debug, Default)]
pub struct Registry {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,
}

impl Registry {
    /// Insert an entity under a fresh id and return it.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Present, alive and above zero health.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_active)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }
}

// ── Transient overlays ────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageNumber {
    pub position: Vec2,
    pub amount: f64,
    pub heal: bool,
    pub created_at: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub expires_at: f64,
}

/// Notable things that happened during a tick. The shell drains and
/// formats them; the core never builds display text.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    EnemyKilled { template: String, killer: Option<EntityId> },
    CharacterDowned { id: EntityId },
    CharacterRespawned { id: EntityId },
    LevelUp { id: EntityId, level: u32 },
    SkillCast { caster: EntityId, skill: SkillId },
    LootDropped { item: ItemKind, quantity: u32 },
    EquipmentDropped { name: String },
    GoldGained { amount: u64 },
    BossSpawned { template: String },
    BossPhaseChanged { phase: usize },
    BossAbility { ability: super::boss::AbilityId },
    BossDefeated { template: String, gold: u64 },
    QuestCompleted { quest: super::quest::QuestId },
    IdleReward { gold: u64, idle_ms: f64 },
    IntegrityRepaired { id: EntityId },
}

// ── World ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct World {
    /// Active team, in display order.
    pub characters: Vec<EntityId>,
    /// Owned companions not currently on the team.
    pub bench: Vec<EntityId>,
    /// Hostile live set: enemies, resource points and the boss.
    pub enemies: Vec<EntityId>,
    pub projectiles: Vec<Projectile>,
    pub zones: Vec<AreaZone>,
    pub damage_numbers: Vec<DamageNumber>,
    pub particles: Vec<Particle>,
    /// Ordered-pair collision cooldown: (a, b) → time of last resolution.
    pub collision_cooldowns: HashMap<(EntityId, EntityId), f64>,
    /// Current level id.
    pub level: u32,
    pub events: Vec<GameEvent>,
}

impl World {
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
        if self.events.len() > 200 {
            self.events.remove(0);
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn enemy_listing_count(&self, id: EntityId) -> usize {
        self.enemies.iter().filter(|e| **e == id).count()
    }

    /// Make sure `id` appears in the enemy list exactly once. Returns true
    /// when the list had to be repaired.
    pub fn ensure_enemy_listed(&mut self, id: EntityId) -> bool {
        match self.enemy_listing_count(id) {
            1 => false,
            0 => {
                warn!(?id, "live entity missing from enemy list, re-inserting");
                self.enemies.push(id);
                true
            }
            n => {
                warn!(?id, count = n, "entity listed multiple times, deduplicating");
                let mut seen = false;
                self.enemies.retain(|e| {
                    if *e != id {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                true
            }
        }
    }

    pub fn unlist(&mut self, id: EntityId) {
        self.enemies.retain(|e| *e != id);
        self.characters.retain(|e| *e != id);
        self.collision_cooldowns.retain(|(a, b), _| *a != id && *b != id);
    }
}

// ── Inventory ─────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemKind,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inventory {
    pub gold: u64,
    pub stacks: Vec<ItemStack>,
    /// Unequipped equipment owned by the player.
    pub equipment: Vec<EquipmentItem>,
}

impl Inventory {
    pub fn count(&self, item: &ItemKind) -> u32 {
        self.stacks
            .iter()
            .find(|s| &s.item == item)
            .map_or(0, |s| s.quantity)
    }

    pub fn add(&mut self, item: ItemKind, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.stacks.iter_mut().find(|s| s.item == item) {
            Some(stack) => stack.quantity = stack.quantity.saturating_add(quantity),
            None => self.stacks.push(ItemStack { item, quantity }),
        }
    }

    /// Remove `quantity` of `item`; fails without change if short.
    pub fn remove(&mut self, item: &ItemKind, quantity: u32) -> bool {
        let Some(pos) = self.stacks.iter().position(|s| &s.item == item) else {
            return false;
        };
        if self.stacks[pos].quantity < quantity {
            return false;
        }
        self.stacks[pos].quantity -= quantity;
        if self.stacks[pos].quantity == 0 {
            self.stacks.remove(pos);
        }
        true
    }

    pub fn spend_gold(&mut self, amount: u64) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }
}

// ── Context ───────────────────────────────────────────────────

/// Everything a system call may touch, passed explicitly.
pub struct SimulationContext {
    pub config: SimConfig,
    pub registry: Registry,
    pub world: World,
    pub inventory: Inventory,
    pub quests: QuestLog,
    pub farm: Farm,
    pub boss: BossController,
    pub rng: GameRng,
    /// Simulation time in ms; advanced only by the game loop.
    pub now: f64,
    /// Last wall-clock reading (epoch ms) used for farm timers.
    pub wall_ms: f64,
}

impl SimulationContext {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let boss = BossController::new(&config);
        Self {
            config,
            registry: Registry::default(),
            world: World {
                level: 1,
                ..World::default()
            },
            inventory: Inventory::default(),
            quests: QuestLog::default(),
            farm: Farm::default(),
            boss,
            rng: GameRng::seeded(seed),
            now: 0.0,
            wall_ms: 0.0,
        }
    }

    pub fn canvas(&self) -> Vec2 {
        Vec2::new(self.config.canvas_width, self.config.canvas_height)
    }

    /// Living members of the active team.
    pub fn living_characters(&self) -> Vec<EntityId> {
        self.world
            .characters
            .iter()
            .copied()
            .filter(|id| self.registry.is_active(*id))
            .collect()
    }

    /// Every registered entity except benched characters. Benched
    /// characters sit out movement, status ticks and regeneration.
    pub fn field_ids(&self) -> Vec<EntityId> {
        self.registry
            .iter()
            .map(|e| e.id)
            .filter(|id| !self.world.bench.contains(id))
            .collect()
    }

    /// Living hostile entities.
    pub fn living_enemies(&self) -> Vec<EntityId> {
        self.world
            .enemies
            .iter()
            .copied()
            .filter(|id| self.registry.is_active(*id))
            .collect()
    }

    /// Ids on the opposite team of `team` that are alive.
    pub fn opponents_of(&self, team: Team) -> Vec<EntityId> {
        match team {
            Team::Ally => self.living_enemies(),
            Team::Hostile => self.living_characters(),
        }
    }

    pub fn allies_of(&self, team: Team) -> Vec<EntityId> {
        match team {
            Team::Ally => self.living_characters(),
            Team::Hostile => self.living_enemies(),
        }
    }

    /// Nearest living opponent of `id`, optionally within `range`.
    pub fn nearest_opponent(&self, id: EntityId, range: Option<f32>) -> Option<EntityId> {
        let me = self.registry.get(id)?;
        self.opponents_of(me.team())
            .into_iter()
            .filter_map(|other| {
                let e = self.registry.get(other)?;
                let d = e.position.distance(me.position);
                match range {
                    Some(r) if d > r + e.radius => None,
                    _ => Some((other, d)),
                }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(other, _)| other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(kind: EntityKind) -> Entity {
        Entity::new(kind, "test", Vec2::new(10.0, 10.0), 8.0)
    }

    #[test]
    fn registry_assigns_unique_ids() {
        let mut reg = Registry::default();
        let a = reg.insert(blank(EntityKind::Enemy));
        let b = reg.insert(blank(EntityKind::Enemy));
        assert_ne!(a, b);
        assert_eq!(reg.get(a).unwrap().id, a);
        assert_eq!(reg.entities.len(), 2);
    }

    #[test]
    fn removed_entity_lookup_is_none() {
        let mut reg = Registry::default();
        let a = reg.insert(blank(EntityKind::Enemy));
        assert!(reg.remove(a).is_some());
        assert!(reg.get(a).is_none());
        assert!(!reg.is_active(a));
    }

    #[test]
    fn ensure_listed_inserts_missing() {
        let mut world = World::default();
        assert!(world.ensure_enemy_listed(EntityId(4)));
        assert_eq!(world.enemy_listing_count(EntityId(4)), 1);
        assert!(!world.ensure_enemy_listed(EntityId(4)));
    }

    #[test]
    fn ensure_listed_dedups() {
        let mut world = World::default();
        world.enemies = vec![EntityId(1), EntityId(4), EntityId(2), EntityId(4)];
        assert!(world.ensure_enemy_listed(EntityId(4)));
        assert_eq!(world.enemies, vec![EntityId(1), EntityId(4), EntityId(2)]);
    }

    #[test]
    fn unlist_clears_cooldowns() {
        let mut world = World::default();
        world.enemies = vec![EntityId(1), EntityId(2)];
        world.collision_cooldowns.insert((EntityId(9), EntityId(1)), 0.0);
        world.collision_cooldowns.insert((EntityId(9), EntityId(2)), 0.0);
        world.unlist(EntityId(1));
        assert_eq!(world.enemies, vec![EntityId(2)]);
        assert_eq!(world.collision_cooldowns.len(), 1);
    }

    #[test]
    fn inventory_add_remove() {
        let mut inv = Inventory::default();
        inv.add(ItemKind::HealthPotion, 2);
        inv.add(ItemKind::HealthPotion, 1);
        assert_eq!(inv.count(&ItemKind::HealthPotion), 3);
        assert!(!inv.remove(&ItemKind::HealthPotion, 4));
        assert_eq!(inv.count(&ItemKind::HealthPotion), 3);
        assert!(inv.remove(&ItemKind::HealthPotion, 3));
        assert!(inv.stacks.is_empty());
    }

    #[test]
    fn spend_gold_is_all_or_nothing() {
        let mut inv = Inventory {
            gold: 10,
            ..Inventory::default()
        };
        assert!(!inv.spend_gold(11));
        assert_eq!(inv.gold, 10);
        assert!(inv.spend_gold(10));
        assert_eq!(inv.gold, 0);
    }

    #[test]
    fn health_percent_handles_zero_max() {
        let mut e = blank(EntityKind::Enemy);
        e.max_health = 0.0;
        assert_eq!(e.health_percent(), 0.0);
    }

    #[test]
    fn event_log_is_bounded() {
        let mut world = World::default();
        for _ in 0..250 {
            world.push_event(GameEvent::GoldGained { amount: 1 });
        }
        assert_eq!(world.events.len(), 200);
    }
}
