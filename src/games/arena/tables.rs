//! Static catalogs: enemies, resource points, levels, consumables, eggs,
//! crops and the shop list.

use serde::{Deserialize, Serialize};

use super::affix::Rarity;
use super::skills::SkillId;

// ── Enemies ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    Slime,
    Wolf,
    Goblin,
    Golem,
    Wraith,
}

pub struct EnemyInfo {
    pub key: &'static str,
    pub max_health: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub radius: f32,
    pub weight: f64,
    pub exp: f64,
    pub gold: u64,
}

pub fn enemy_info(kind: EnemyKind) -> EnemyInfo {
    match kind {
        EnemyKind::Slime => EnemyInfo {
            key: "slime",
            max_health: 30.0,
            attack: 4.0,
            defense: 0.0,
            speed: 30.0,
            radius: 9.0,
            weight: 20.0,
            exp: 10.0,
            gold: 2,
        },
        EnemyKind::Wolf => EnemyInfo {
            key: "wolf",
            max_health: 45.0,
            attack: 7.0,
            defense: 1.0,
            speed: 70.0,
            radius: 10.0,
            weight: 40.0,
            exp: 16.0,
            gold: 3,
        },
        EnemyKind::Goblin => EnemyInfo {
            key: "goblin",
            max_health: 60.0,
            attack: 9.0,
            defense: 2.0,
            speed: 50.0,
            radius: 11.0,
            weight: 45.0,
            exp: 22.0,
            gold: 5,
        },
        EnemyKind::Golem => EnemyInfo {
            key: "golem",
            max_health: 140.0,
            attack: 12.0,
            defense: 5.0,
            speed: 25.0,
            radius: 15.0,
            weight: 120.0,
            exp: 45.0,
            gold: 10,
        },
        EnemyKind::Wraith => EnemyInfo {
            key: "wraith",
            max_health: 80.0,
            attack: 15.0,
            defense: 3.0,
            speed: 65.0,
            radius: 11.0,
            weight: 30.0,
            exp: 40.0,
            gold: 9,
        },
    }
}

impl EnemyKind {
    pub fn all() -> &'static [EnemyKind] {
        &[
            EnemyKind::Slime,
            EnemyKind::Wolf,
            EnemyKind::Goblin,
            EnemyKind::Golem,
            EnemyKind::Wraith,
        ]
    }

    pub fn key(self) -> &'static str {
        enemy_info(self).key
    }

    pub fn from_key(key: &str) -> Option<EnemyKind> {
        EnemyKind::all().iter().copied().find(|k| k.key() == key)
    }
}

/// Multiplicative growth applied to enemy templates per level above 1.
pub fn level_scale(level: u32, per_level: f64) -> f64 {
    1.0 + per_level * level.saturating_sub(1) as f64
}

// ── Resource points ───────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    OreVein,
    HerbPatch,
}

pub struct ResourceInfo {
    pub key: &'static str,
    pub max_health: f64,
    pub defense: f64,
    pub radius: f32,
    pub exp: f64,
    pub yields: ItemKind,
}

pub fn resource_info(kind: ResourceKind) -> ResourceInfo {
    match kind {
        ResourceKind::OreVein => ResourceInfo {
            key: "ore_vein",
            max_health: 50.0,
            defense: 2.0,
            radius: 12.0,
            exp: 5.0,
            yields: ItemKind::Ore,
        },
        ResourceKind::HerbPatch => ResourceInfo {
            key: "herb_patch",
            max_health: 25.0,
            defense: 0.0,
            radius: 10.0,
            exp: 3.0,
            yields: ItemKind::Herb,
        },
    }
}

impl ResourceKind {
    pub fn all() -> &'static [ResourceKind] {
        &[ResourceKind::OreVein, ResourceKind::HerbPatch]
    }

    pub fn from_key(key: &str) -> Option<ResourceKind> {
        ResourceKind::all()
            .iter()
            .copied()
            .find(|k| resource_info(*k).key == key)
    }
}

// ── Levels ────────────────────────────────────────────────────

pub struct LevelInfo {
    pub name: &'static str,
    pub roster: &'static [EnemyKind],
    pub population: usize,
    pub resources: &'static [ResourceKind],
    pub resource_count: usize,
    pub enemy_level: u32,
    pub boss: super::boss::BossKind,
}

pub const LEVEL_COUNT: u32 = 3;

/// Unknown level ids fall back to the first level.
pub fn level_info(level: u32) -> LevelInfo {
    use super::boss::BossKind;
    match level {
        2 => LevelInfo {
            name: "Goblin Warrens",
            roster: &[EnemyKind::Wolf, EnemyKind::Goblin, EnemyKind::Golem],
            population: 10,
            resources: &[ResourceKind::OreVein],
            resource_count: 2,
            enemy_level: 4,
            boss: BossKind::GoblinWarlord,
        },
        3 => LevelInfo {
            name: "Haunted Keep",
            roster: &[EnemyKind::Golem, EnemyKind::Wraith, EnemyKind::Goblin],
            population: 12,
            resources: &[ResourceKind::OreVein, ResourceKind::HerbPatch],
            resource_count: 2,
            enemy_level: 8,
            boss: BossKind::Lich,
        },
        _ => LevelInfo {
            name: "Verdant Meadow",
            roster: &[EnemyKind::Slime, EnemyKind::Wolf],
            population: 8,
            resources: &[ResourceKind::HerbPatch],
            resource_count: 3,
            enemy_level: 1,
            boss: BossKind::SlimeKing,
        },
    }
}

// ── Items ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EggTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl EggTier {
    pub fn all() -> &'static [EggTier] {
        &[EggTier::Common, EggTier::Rare, EggTier::Epic, EggTier::Legendary]
    }

    /// Weights used by the boss loot bundle.
    pub fn weights() -> [(EggTier, f64); 4] {
        [
            (EggTier::Common, 60.0),
            (EggTier::Rare, 25.0),
            (EggTier::Epic, 12.0),
            (EggTier::Legendary, 3.0),
        ]
    }

    /// Starting primary attribute value of the hatched companion.
    pub fn companion_attributes(self) -> u32 {
        match self {
            EggTier::Common => 1,
            EggTier::Rare => 3,
            EggTier::Epic => 5,
            EggTier::Legendary => 8,
        }
    }

    pub fn starting_gear(self) -> Rarity {
        match self {
            EggTier::Common => Rarity::Common,
            EggTier::Rare => Rarity::Rare,
            EggTier::Epic => Rarity::Epic,
            EggTier::Legendary => Rarity::Legendary,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodKind {
    Bread,
    Stew,
    Feast,
}

pub struct FoodInfo {
    pub heal: f64,
    /// Flat health-regen bonus granted as a status.
    pub regen_bonus: f64,
    /// Heal-over-time applied once per second while the status lasts.
    pub mend_per_sec: f64,
    pub duration_ms: f64,
}

pub fn food_info(kind: FoodKind) -> FoodInfo {
    match kind {
        FoodKind::Bread => FoodInfo {
            heal: 20.0,
            regen_bonus: 1.0,
            mend_per_sec: 4.0,
            duration_ms: 30_000.0,
        },
        FoodKind::Stew => FoodInfo {
            heal: 40.0,
            regen_bonus: 2.0,
            mend_per_sec: 6.0,
            duration_ms: 45_000.0,
        },
        FoodKind::Feast => FoodInfo {
            heal: 80.0,
            regen_bonus: 5.0,
            mend_per_sec: 12.0,
            duration_ms: 60_000.0,
        },
    }
}

impl FoodKind {
    pub fn all() -> &'static [FoodKind] {
        &[FoodKind::Bread, FoodKind::Stew, FoodKind::Feast]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropKind {
    Wheat,
    Carrot,
    Pumpkin,
}

pub struct CropInfo {
    pub grow_ms: f64,
    pub yields: FoodKind,
    pub amount: u32,
}

pub fn crop_info(kind: CropKind) -> CropInfo {
    match kind {
        CropKind::Wheat => CropInfo {
            grow_ms: 60_000.0,
            yields: FoodKind::Bread,
            amount: 2,
        },
        CropKind::Carrot => CropInfo {
            grow_ms: 180_000.0,
            yields: FoodKind::Stew,
            amount: 1,
        },
        CropKind::Pumpkin => CropInfo {
            grow_ms: 600_000.0,
            yields: FoodKind::Feast,
            amount: 1,
        },
    }
}

impl CropKind {
    pub fn all() -> &'static [CropKind] {
        &[CropKind::Wheat, CropKind::Carrot, CropKind::Pumpkin]
    }
}

pub const POTION_HEAL: f64 = 50.0;
pub const POTION_MANA: f64 = 50.0;

/// Everything that can sit in an inventory stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    HealthPotion,
    ManaPotion,
    SkillTome(SkillId),
    Egg(EggTier),
    Food(FoodKind),
    Seed(CropKind),
    Ore,
    Herb,
}

// ── Shop ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShopGood {
    Item(ItemKind),
    /// Equipment template key; bought items are generated fresh.
    Equipment(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShopEntry {
    pub good: ShopGood,
    pub price: u64,
}

pub const SHOP: &[ShopEntry] = &[
    ShopEntry { good: ShopGood::Item(ItemKind::HealthPotion), price: 15 },
    ShopEntry { good: ShopGood::Item(ItemKind::ManaPotion), price: 20 },
    ShopEntry { good: ShopGood::Item(ItemKind::Seed(CropKind::Wheat)), price: 5 },
    ShopEntry { good: ShopGood::Item(ItemKind::Seed(CropKind::Carrot)), price: 12 },
    ShopEntry { good: ShopGood::Item(ItemKind::Seed(CropKind::Pumpkin)), price: 30 },
    ShopEntry { good: ShopGood::Item(ItemKind::SkillTome(SkillId::Fireball)), price: 120 },
    ShopEntry { good: ShopGood::Item(ItemKind::SkillTome(SkillId::Mend)), price: 150 },
    ShopEntry { good: ShopGood::Item(ItemKind::Egg(EggTier::Common)), price: 250 },
    ShopEntry { good: ShopGood::Equipment("wooden_sword"), price: 30 },
    ShopEntry { good: ShopGood::Equipment("cloth_tunic"), price: 25 },
    ShopEntry { good: ShopGood::Equipment("wooden_buckler"), price: 30 },
    ShopEntry { good: ShopGood::Equipment("lucky_charm"), price: 40 },
    ShopEntry { good: ShopGood::Equipment("iron_sword"), price: 150 },
    ShopEntry { good: ShopGood::Equipment("chain_mail"), price: 140 },
];

/// Fixed value of materials and consumables when sold.
pub fn item_sell_price(item: &ItemKind) -> u64 {
    match item {
        ItemKind::HealthPotion => 5,
        ItemKind::ManaPotion => 7,
        ItemKind::SkillTome(_) => 40,
        ItemKind::Egg(_) => 60,
        ItemKind::Food(_) => 4,
        ItemKind::Seed(_) => 1,
        ItemKind::Ore => 6,
        ItemKind::Herb => 3,
    }
}
