//! Player commands. Each validates fully before mutating, so an `Err`
//! leaves the context untouched.

use tracing::info;

use super::affix::{Attribute, Rarity};
use super::equipment::{self, EquipSlot, EquipmentItem};
use super::error::ActionError;
use super::farm;
use super::quest::{self, QuestId};
use super::skills::{self, SkillId, MAX_SKILL_LEVEL};
use super::spawner;
use super::state::{Entity, EntityId, SimulationContext};
use super::status::{self, PeriodicTick, StatusEffect, StatusModifier, TickKind};
use super::tables::{self, CropKind, EggTier, ItemKind, ShopGood, POTION_HEAL, POTION_MANA};

fn entity(ctx: &SimulationContext, id: EntityId) -> Result<&Entity, ActionError> {
    ctx.registry.get(id).ok_or(ActionError::EntityNotFound(id))
}

fn entity_mut(ctx: &mut SimulationContext, id: EntityId) -> Result<&mut Entity, ActionError> {
    ctx.registry.get_mut(id).ok_or(ActionError::EntityNotFound(id))
}

fn owned(ctx: &SimulationContext, id: EntityId) -> Result<&Entity, ActionError> {
    if !ctx.world.characters.contains(&id) && !ctx.world.bench.contains(&id) {
        return Err(ActionError::EntityNotFound(id));
    }
    entity(ctx, id)
}

fn living(ctx: &SimulationContext, id: EntityId) -> Result<&Entity, ActionError> {
    let e = owned(ctx, id)?;
    if !e.is_active() {
        return Err(ActionError::EntityDead(id));
    }
    Ok(e)
}

// ── Skills ────────────────────────────────────────────────────

pub fn cast_skill(
    ctx: &mut SimulationContext,
    caster: EntityId,
    slot: usize,
    target: Option<EntityId>,
) -> Result<(), ActionError> {
    owned(ctx, caster)?;
    skills::use_skill(ctx, caster, slot, target)
}

/// Read a skill tome: learns the skill, or raises its level when known.
pub fn learn_skill(ctx: &mut SimulationContext, character: EntityId, skill: SkillId) -> Result<u32, ActionError> {
    let tome = ItemKind::SkillTome(skill);
    let e = owned(ctx, character)?;
    if ctx.inventory.count(&tome) == 0 {
        return Err(ActionError::ItemMissing);
    }
    if e.learned.get(&skill).is_some_and(|l| *l >= MAX_SKILL_LEVEL) {
        return Err(ActionError::NotUsable);
    }
    ctx.inventory.remove(&tome, 1);
    let e = entity_mut(ctx, character)?;
    let level = if e.learned.contains_key(&skill) {
        skills::level_up(e, skill)?
    } else {
        skills::learn(e, skill)?;
        e.stats_dirty = true;
        1
    };
    info!(?character, skill = skill.key(), level, "skill learned");
    Ok(level)
}

pub fn equip_skill(ctx: &mut SimulationContext, character: EntityId, slot: usize, skill: SkillId) -> Result<(), ActionError> {
    owned(ctx, character)?;
    skills::equip(entity_mut(ctx, character)?, slot, skill)
}

pub fn unequip_skill(ctx: &mut SimulationContext, character: EntityId, slot: usize) -> Result<SkillId, ActionError> {
    owned(ctx, character)?;
    skills::unequip(entity_mut(ctx, character)?, slot)
}

// ── Equipment ─────────────────────────────────────────────────

/// Move inventory item `index` onto `character`; whatever occupied the slot
/// goes back to the inventory.
pub fn equip_item(ctx: &mut SimulationContext, character: EntityId, index: usize) -> Result<(), ActionError> {
    owned(ctx, character)?;
    if index >= ctx.inventory.equipment.len() {
        return Err(ActionError::ItemMissing);
    }
    let item = ctx.inventory.equipment.remove(index);
    let slot = item.slot.index();
    let e = entity_mut(ctx, character)?;
    let previous = e.equipment[slot].replace(item);
    e.stats_dirty = true;
    if let Some(previous) = previous {
        ctx.inventory.equipment.push(previous);
    }
    Ok(())
}

pub fn unequip_item(ctx: &mut SimulationContext, character: EntityId, slot: EquipSlot) -> Result<(), ActionError> {
    owned(ctx, character)?;
    let e = entity_mut(ctx, character)?;
    let item = e.equipment[slot.index()].take().ok_or(ActionError::ItemMissing)?;
    e.stats_dirty = true;
    ctx.inventory.equipment.push(item);
    Ok(())
}

fn craft_cost(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::Common => 2,
        Rarity::Rare => 5,
        Rarity::Epic => 10,
        Rarity::Legendary => 20,
    }
}

/// Forge a template from ore and gold. Crafted items may roll masterwork.
pub fn craft_equipment<'a>(
    ctx: &'a mut SimulationContext,
    template: &str,
) -> Result<&'a EquipmentItem, ActionError> {
    let t = equipment::find_template(template).ok_or_else(|| ActionError::UnknownId(template.to_string()))?;
    let ore = craft_cost(t.rarity);
    let gold = t.price / 2;
    if ctx.inventory.count(&ItemKind::Ore) < ore {
        return Err(ActionError::ItemMissing);
    }
    if ctx.inventory.gold < gold {
        return Err(ActionError::InsufficientGold {
            needed: gold,
            available: ctx.inventory.gold,
        });
    }
    ctx.inventory.remove(&ItemKind::Ore, ore);
    ctx.inventory.spend_gold(gold);
    let item = equipment::craft(t, ctx.config.masterwork_chance, &mut ctx.rng);
    info!(name = %item.name, masterwork = item.masterwork, "crafted");
    ctx.inventory.equipment.push(item);
    ctx.inventory.equipment.last().ok_or(ActionError::ItemMissing)
}

// ── Shop ──────────────────────────────────────────────────────

pub fn buy_item(ctx: &mut SimulationContext, shop_index: usize) -> Result<(), ActionError> {
    let entry = tables::SHOP
        .get(shop_index)
        .ok_or_else(|| ActionError::UnknownId(format!("shop entry {shop_index}")))?;
    let template = match entry.good {
        ShopGood::Equipment(key) => {
            Some(equipment::find_template(key).ok_or_else(|| ActionError::UnknownId(key.to_string()))?)
        }
        ShopGood::Item(_) => None,
    };
    if !ctx.inventory.spend_gold(entry.price) {
        return Err(ActionError::InsufficientGold {
            needed: entry.price,
            available: ctx.inventory.gold,
        });
    }
    match (entry.good, template) {
        (ShopGood::Item(item), _) => ctx.inventory.add(item, 1),
        (ShopGood::Equipment(_), Some(t)) => {
            let item = equipment::generate(t, &mut ctx.rng);
            ctx.inventory.equipment.push(item);
        }
        (ShopGood::Equipment(_), None) => {}
    }
    Ok(())
}

pub fn sell_equipment(ctx: &mut SimulationContext, index: usize) -> Result<u64, ActionError> {
    if index >= ctx.inventory.equipment.len() {
        return Err(ActionError::ItemMissing);
    }
    let item = ctx.inventory.equipment.remove(index);
    let price = item.sell_price();
    ctx.inventory.gold += price;
    Ok(price)
}

pub fn sell_item(ctx: &mut SimulationContext, item: ItemKind, quantity: u32) -> Result<u64, ActionError> {
    if quantity == 0 || !ctx.inventory.remove(&item, quantity) {
        return Err(ActionError::ItemMissing);
    }
    let price = tables::item_sell_price(&item) * quantity as u64;
    ctx.inventory.gold += price;
    Ok(price)
}

// ── Consumables ───────────────────────────────────────────────

/// Use a stack item on `target`. Eggs and seeds ignore the target.
pub fn use_item(ctx: &mut SimulationContext, item: ItemKind, target: EntityId) -> Result<(), ActionError> {
    if ctx.inventory.count(&item) == 0 {
        return Err(ActionError::ItemMissing);
    }
    match item {
        ItemKind::HealthPotion => {
            let e = living(ctx, target)?;
            if e.health >= e.max_health {
                return Err(ActionError::FullHealth);
            }
            ctx.inventory.remove(&item, 1);
            super::combat::heal(ctx, target, POTION_HEAL);
        }
        ItemKind::ManaPotion => {
            let e = living(ctx, target)?;
            if e.mana >= e.max_mana {
                return Err(ActionError::NotUsable);
            }
            ctx.inventory.remove(&item, 1);
            let e = entity_mut(ctx, target)?;
            e.mana = (e.mana + POTION_MANA).min(e.max_mana);
        }
        ItemKind::Food(kind) => {
            living(ctx, target)?;
            let info = tables::food_info(kind);
            let now = ctx.now;
            ctx.inventory.remove(&item, 1);
            super::combat::heal(ctx, target, info.heal);
            let e = entity_mut(ctx, target)?;
            status::add(
                e,
                StatusEffect::new("well_fed", info.duration_ms, now)
                    .with_modifier(StatusModifier::Flat(Attribute::HealthRegen, info.regen_bonus))
                    .with_tick(PeriodicTick {
                        interval_ms: 1_000.0,
                        amount: info.mend_per_sec,
                        kind: TickKind::Heal,
                    }),
            );
        }
        ItemKind::SkillTome(skill) => {
            learn_skill(ctx, target, skill)?;
        }
        ItemKind::Egg(tier) => {
            hatch_egg(ctx, tier)?;
        }
        ItemKind::Seed(_) | ItemKind::Ore | ItemKind::Herb => return Err(ActionError::NotUsable),
    }
    Ok(())
}

/// Open an egg into a companion with tier-scaled attributes and one piece
/// of starting gear.
pub fn hatch_egg(ctx: &mut SimulationContext, tier: EggTier) -> Result<EntityId, ActionError> {
    let egg = ItemKind::Egg(tier);
    if !ctx.inventory.remove(&egg, 1) {
        return Err(ActionError::ItemMissing);
    }
    let mut companion = spawner::build_character("companion", glam::Vec2::ZERO, tier.companion_attributes());
    if let Some(gear) = equipment::random_of_rarity(tier.starting_gear(), &mut ctx.rng) {
        let slot = gear.slot.index();
        companion.equipment[slot] = Some(gear);
        super::stats::recompute(&mut companion);
        companion.health = companion.max_health;
    }
    let id = spawner::add_character(ctx, companion);
    info!(?id, ?tier, "egg hatched");
    Ok(id)
}

// ── Team ──────────────────────────────────────────────────────

pub fn add_to_team(ctx: &mut SimulationContext, id: EntityId) -> Result<(), ActionError> {
    let pos = ctx
        .world
        .bench
        .iter()
        .position(|b| *b == id)
        .ok_or(ActionError::EntityNotFound(id))?;
    if ctx.world.characters.len() >= ctx.config.max_team_size {
        return Err(ActionError::TeamFull);
    }
    ctx.world.bench.remove(pos);
    ctx.world.characters.push(id);
    Ok(())
}

pub fn remove_from_team(ctx: &mut SimulationContext, id: EntityId) -> Result<(), ActionError> {
    let pos = ctx
        .world
        .characters
        .iter()
        .position(|c| *c == id)
        .ok_or(ActionError::EntityNotFound(id))?;
    if ctx.world.characters.len() <= 1 {
        return Err(ActionError::TeamEmpty);
    }
    ctx.world.characters.remove(pos);
    ctx.world.bench.push(id);
    ctx.world.collision_cooldowns.retain(|(a, b), _| *a != id && *b != id);
    Ok(())
}

// ── Quests, farm, travel ──────────────────────────────────────

pub fn accept_quest(ctx: &mut SimulationContext, id: QuestId) -> Result<(), ActionError> {
    quest::accept(&mut ctx.quests, id)
}

pub fn submit_quest(ctx: &mut SimulationContext, id: QuestId) -> Result<(), ActionError> {
    quest::submit(ctx, id)
}

pub fn plant(ctx: &mut SimulationContext, plot: usize, crop: CropKind) -> Result<(), ActionError> {
    farm::plant(ctx, plot, crop)
}

pub fn harvest(ctx: &mut SimulationContext, plot: usize) -> Result<(ItemKind, u32), ActionError> {
    farm::harvest(ctx, plot)
}

pub fn travel(ctx: &mut SimulationContext, level: u32) -> Result<(), ActionError> {
    spawner::change_level(ctx, level)
}
