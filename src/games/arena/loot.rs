//! Kill drops, resource yields and the boss reward bundle.

use super::affix::Rarity;
use super::equipment::{self, EquipmentItem};
use super::rng::GameRng;
use super::skills::SkillId;
use super::state::{GameEvent, SimulationContext};
use super::tables::{self, CropKind, EggTier, FoodKind, ItemKind, ResourceKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Loot {
    Item(ItemKind, u32),
    Equipment(EquipmentItem),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DropKind {
    Item(ItemKind),
    RandomSeed,
    RandomTome,
    Equipment(Rarity),
    Egg(EggTier),
}

/// Independent drop chances rolled on every regular kill.
const KILL_DROPS: &[(DropKind, f64)] = &[
    (DropKind::Item(ItemKind::HealthPotion), 0.08),
    (DropKind::Item(ItemKind::ManaPotion), 0.05),
    (DropKind::RandomSeed, 0.04),
    (DropKind::Equipment(Rarity::Common), 0.03),
    (DropKind::Equipment(Rarity::Rare), 0.01),
    (DropKind::RandomTome, 0.01),
    (DropKind::Egg(EggTier::Common), 0.005),
    (DropKind::Equipment(Rarity::Epic), 0.002),
];

fn random_tome(rng: &mut GameRng) -> ItemKind {
    let skill = rng.pick(SkillId::all()).copied().unwrap_or(SkillId::Slash);
    ItemKind::SkillTome(skill)
}

pub fn roll_kill(rng: &mut GameRng) -> Vec<Loot> {
    let mut drops = Vec::new();
    for (drop, chance) in KILL_DROPS {
        if !rng.chance(*chance) {
            continue;
        }
        let loot = match *drop {
            DropKind::Item(item) => Some(Loot::Item(item, 1)),
            DropKind::RandomSeed => rng
                .pick(CropKind::all())
                .map(|c| Loot::Item(ItemKind::Seed(*c), 1)),
            DropKind::RandomTome => Some(Loot::Item(random_tome(rng), 1)),
            DropKind::Equipment(rarity) => equipment::random_of_rarity(rarity, rng).map(Loot::Equipment),
            DropKind::Egg(tier) => Some(Loot::Item(ItemKind::Egg(tier), 1)),
        };
        drops.extend(loot);
    }
    drops
}

/// Resource points always yield their material; harvesters get double.
pub fn roll_resource(template: &str, harvester: bool) -> Vec<Loot> {
    let Some(kind) = ResourceKind::from_key(template) else {
        return Vec::new();
    };
    let qty = if harvester { 2 } else { 1 };
    vec![Loot::Item(tables::resource_info(kind).yields, qty)]
}

/// Fixed composition: one skill tome, one weighted egg, one food.
pub fn boss_bundle(rng: &mut GameRng) -> Vec<Loot> {
    let tome = random_tome(rng);
    let egg = rng.weighted(&EggTier::weights()).unwrap_or(EggTier::Common);
    let food = rng.pick(FoodKind::all()).copied().unwrap_or(FoodKind::Bread);
    vec![
        Loot::Item(tome, 1),
        Loot::Item(ItemKind::Egg(egg), 1),
        Loot::Item(ItemKind::Food(food), 1),
    ]
}

/// Move drops into the inventory.
pub fn grant(ctx: &mut SimulationContext, drops: Vec<Loot>) {
    for loot in drops {
        match loot {
            Loot::Item(item, quantity) => {
                ctx.inventory.add(item, quantity);
                ctx.world.push_event(GameEvent::LootDropped { item, quantity });
            }
            Loot::Equipment(item) => {
                ctx.world.push_event(GameEvent::EquipmentDropped {
                    name: item.name.clone(),
                });
                ctx.inventory.equipment.push(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boss_bundle_composition() {
        let mut rng = GameRng::seeded(21);
        for _ in 0..50 {
            let bundle = boss_bundle(&mut rng);
            assert_eq!(bundle.len(), 3);
            assert!(matches!(bundle[0], Loot::Item(ItemKind::SkillTome(_), 1)));
            assert!(matches!(bundle[1], Loot::Item(ItemKind::Egg(_), 1)));
            assert!(matches!(bundle[2], Loot::Item(ItemKind::Food(_), 1)));
        }
    }

    #[test]
    fn resource_yield_and_harvester() {
        assert_eq!(roll_resource("ore_vein", false), vec![Loot::Item(ItemKind::Ore, 1)]);
        assert_eq!(roll_resource("herb_patch", true), vec![Loot::Item(ItemKind::Herb, 2)]);
        assert!(roll_resource("mystery", false).is_empty());
    }

    #[test]
    fn kill_drops_are_occasional() {
        let mut rng = GameRng::seeded(4);
        let total: usize = (0..1_000).map(|_| roll_kill(&mut rng).len()).sum();
        assert!(total > 0);
        assert!(total < 1_000);
    }
}
