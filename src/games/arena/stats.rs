//! Derived attribute computation.
//!
//! Secondary attributes are recomputed from scratch out of primary
//! attributes, equipment, equipped passives and active statuses. Nothing
//! accumulates between calls.

use super::affix::{Attribute, AttributeSheet};
use super::progression;
use super::skills::{self, PassiveEffect};
use super::state::{Entity, EntityKind, SecondaryAttributes, SimulationContext};
use super::status;

/// Equipped passive contributions. Flat bonuses and multipliers are kept
/// apart and never added together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassiveAggregate {
    pub flat: AttributeSheet,
    multipliers: [f64; Attribute::COUNT],
    pub size_multiplier: f64,
    pub bonus_vs_high_health: f64,
    pub harvest_double: bool,
}

impl Default for PassiveAggregate {
    fn default() -> Self {
        Self {
            flat: AttributeSheet::default(),
            multipliers: [1.0; Attribute::COUNT],
            size_multiplier: 1.0,
            bonus_vs_high_health: 0.0,
            harvest_double: false,
        }
    }
}

impl PassiveAggregate {
    pub fn multiplier(&self, attribute: Attribute) -> f64 {
        self.multipliers[attribute.index()]
    }
}

pub fn passive_aggregate(entity: &Entity) -> PassiveAggregate {
    let mut agg = PassiveAggregate::default();
    for (effect, level) in skills::equipped_passives(entity) {
        let level = level as f64;
        match effect {
            PassiveEffect::Flat {
                attribute,
                per_level,
            } => agg.flat.add(attribute, per_level * level),
            PassiveEffect::Multiplier {
                attribute,
                per_level,
            } => {
                let factor = 1.0 + per_level * level;
                if factor.is_finite() {
                    agg.multipliers[attribute.index()] *= factor;
                }
            }
            PassiveEffect::Size { per_level } => agg.size_multiplier *= 1.0 + per_level * level,
            PassiveEffect::BonusVsHighHealth { pct_per_level } => {
                agg.bonus_vs_high_health += pct_per_level * level
            }
            PassiveEffect::HarvestDouble => agg.harvest_double = true,
            PassiveEffect::ManaRefund { .. } | PassiveEffect::TeamManaRestore { .. } => {}
        }
    }
    agg
}

/// Sum of every non-empty equipment slot.
pub fn equipment_aggregate(entity: &Entity) -> AttributeSheet {
    let mut sheet = AttributeSheet::default();
    for item in entity.equipment.iter().flatten() {
        sheet.merge(&item.bonuses());
    }
    sheet
}

pub fn compute_secondary(entity: &Entity) -> SecondaryAttributes {
    let base = &entity.base;
    let p = &entity.primary;
    let equip = equipment_aggregate(entity);
    let passive = passive_aggregate(entity);
    let st = status::aggregate(entity);

    let str_ = p.strength as f64;
    let agi = p.agility as f64;
    let int = p.intelligence as f64;
    let skl = p.skill as f64;
    let eq = |a: Attribute| equip.get(a);
    let pf = |a: Attribute| passive.flat.get(a);
    let pm = |a: Attribute| passive.multiplier(a);
    let sf = |a: Attribute| st.flat.get(a);

    let attack_inner = base.attack_power
        + str_
        + eq(Attribute::Strength)
        + pf(Attribute::AttackPower)
        + sf(Attribute::AttackPower)
        + eq(Attribute::AttackPower);
    let attack_power =
        (attack_inner * pm(Attribute::AttackPower) * (1.0 + st.attack_bonus)).floor();

    let defense =
        base.defense + pf(Attribute::Defense) + sf(Attribute::Defense) + eq(Attribute::Defense);

    let move_speed = ((base.move_speed
        + agi
        + eq(Attribute::Agility)
        + pf(Attribute::MoveSpeed)
        + sf(Attribute::MoveSpeed)
        + eq(Attribute::MoveSpeed))
        * pm(Attribute::MoveSpeed))
    .floor();

    let health_regen = (base.health_regen
        + skl * 0.1
        + eq(Attribute::Skill) * 0.1
        + pf(Attribute::HealthRegen)
        + sf(Attribute::HealthRegen)
        + eq(Attribute::HealthRegen))
        * pm(Attribute::HealthRegen);

    let mana_regen = (base.mana_regen
        + int * 0.5
        + eq(Attribute::Intelligence) * 0.5
        + pf(Attribute::ManaRegen)
        + sf(Attribute::ManaRegen)
        + eq(Attribute::ManaRegen))
        * pm(Attribute::ManaRegen);

    let weight = base.weight + str_ * 2.0 + eq(Attribute::Strength) * 2.0;

    let exp_gain_percent = ((base.exp_gain_percent
        + int
        + eq(Attribute::Intelligence)
        + eq(Attribute::ExpGain))
        * pm(Attribute::ExpGain))
    .floor();

    SecondaryAttributes {
        attack_power,
        defense,
        move_speed,
        health_regen,
        mana_regen,
        weight,
        volume: base.volume,
        exp_gain_percent,
    }
}

pub fn compute_max_health(entity: &Entity) -> f64 {
    let equip = equipment_aggregate(entity);
    let passive = passive_aggregate(entity);
    ((100.0 + entity.primary.total() as f64 + equip.get(Attribute::MaxHealth))
        * passive.multiplier(Attribute::MaxHealth))
    .floor()
}

/// Refresh every derived value on `entity`.
///
/// Characters get the max-health formula; other kinds keep their template
/// maximum. A larger maximum rescales current health proportionally, a
/// smaller one clamps it.
pub fn recompute(entity: &mut Entity) {
    entity.secondary = compute_secondary(entity);
    let passive = passive_aggregate(entity);
    entity.radius = entity.base_radius * passive.size_multiplier.max(0.1) as f32;

    if entity.kind == EntityKind::Character {
        let old_max = entity.max_health;
        let new_max = compute_max_health(entity).max(1.0);
        if new_max > old_max && old_max > 0.0 {
            entity.health *= new_max / old_max;
        }
        entity.max_health = new_max;
    }
    entity.health = entity.health.min(entity.max_health);
    entity.max_exp = progression::max_exp(entity.level);
    entity.stats_dirty = false;
}

/// Recompute every entity whose inputs changed since the last pass.
pub fn recompute_dirty(ctx: &mut SimulationContext) {
    for id in ctx.registry.ids() {
        if let Some(e) = ctx.registry.get_mut(id) {
            if e.stats_dirty {
                recompute(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use super::super::equipment::{EquipSlot, EquipmentItem};
    use super::super::affix::Rarity;
    use super::super::skills::SkillId;
    use super::super::state::{PrimaryAttributes, SkillSlot};
    use super::super::status::{StatusEffect, StatusModifier};

    fn level_one_character() -> Entity {
        let mut e = Entity::new(EntityKind::Character, "hero", Vec2::new(50.0, 50.0), 12.0);
        e.primary = PrimaryAttributes::uniform(1);
        e.base = SecondaryAttributes::character_base();
        e.max_health = 100.0;
        e.health = 100.0;
        e
    }

    fn item(main: &str, slot: EquipSlot) -> EquipmentItem {
        EquipmentItem {
            template: "test".into(),
            name: "Test".into(),
            slot,
            rarity: Rarity::Common,
            main_affix: main.into(),
            sub_affixes: Vec::new(),
            masterwork: false,
        }
    }

    #[test]
    fn level_one_attack_and_health() {
        let mut e = level_one_character();
        recompute(&mut e);
        assert_eq!(e.secondary.attack_power, 11.0);
        assert_eq!(e.max_health, 104.0);
    }

    #[test]
    fn regen_status_adds_exactly_its_bonus() {
        let mut e = level_one_character();
        let baseline = compute_secondary(&e).health_regen;
        status::add(
            &mut e,
            StatusEffect::new("regen", 10_000.0, 0.0)
                .with_modifier(StatusModifier::Flat(Attribute::HealthRegen, 5.0)),
        );
        let with_status = compute_secondary(&e).health_regen;
        assert!((with_status - baseline - 5.0).abs() < 1e-9);
    }

    #[test]
    fn compute_is_idempotent() {
        let mut e = level_one_character();
        e.equipment[EquipSlot::Weapon.index()] = Some(item("attackPower+5", EquipSlot::Weapon));
        e.learned.insert(SkillId::Swiftness, 2);
        e.skills[0] = Some(SkillSlot::new(SkillId::Swiftness));
        assert_eq!(compute_secondary(&e), compute_secondary(&e));
    }

    #[test]
    fn equipment_strength_feeds_attack_and_weight() {
        let mut e = level_one_character();
        e.equipment[EquipSlot::Misc.index()] = Some(item("strength+2", EquipSlot::Misc));
        let s = compute_secondary(&e);
        assert_eq!(s.attack_power, 13.0);
        assert!((s.weight - (50.0 + 2.0 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn passive_multiplier_applies_after_flat() {
        let mut e = level_one_character();
        e.learned.insert(SkillId::Brawn, 1);
        e.learned.insert(SkillId::Swiftness, 1);
        e.skills[0] = Some(SkillSlot::new(SkillId::Brawn));
        e.skills[1] = Some(SkillSlot::new(SkillId::Swiftness));
        let s = compute_secondary(&e);
        // (10 + 1 + 2) attack, (60 + 1) × 1.1 speed.
        assert_eq!(s.attack_power, 13.0);
        assert_eq!(s.move_speed, 67.0);
    }

    #[test]
    fn status_attack_multiplier_capped() {
        let mut e = level_one_character();
        status::add(
            &mut e,
            StatusEffect::new("a", 1e9, 0.0).with_modifier(StatusModifier::AttackMultiplier(3.0)),
        );
        assert_eq!(compute_secondary(&e).attack_power, 22.0);
    }

    #[test]
    fn volume_ignores_primary_attributes() {
        let mut e = level_one_character();
        e.primary.strength = 40;
        assert!((compute_secondary(&e).volume - e.base.volume).abs() < 1e-12);
    }

    #[test]
    fn max_health_increase_rescales_current() {
        let mut e = level_one_character();
        recompute(&mut e);
        e.health = 52.0; // half of 104
        e.equipment[EquipSlot::Offhand.index()] = Some(item("maxHealth+104", EquipSlot::Offhand));
        recompute(&mut e);
        assert_eq!(e.max_health, 208.0);
        assert!((e.health - 104.0).abs() < 1e-9);
    }

    #[test]
    fn enemies_keep_template_max_health() {
        let mut e = Entity::new(EntityKind::Enemy, "slime", Vec2::ZERO, 9.0);
        e.max_health = 30.0;
        e.health = 30.0;
        recompute(&mut e);
        assert_eq!(e.max_health, 30.0);
    }

    #[test]
    fn recompute_before_any_assignment_is_safe() {
        let mut e = Entity::new(EntityKind::Character, "blank", Vec2::ZERO, 10.0);
        recompute(&mut e);
        assert_eq!(e.max_health, 100.0);
        assert!(e.max_exp >= 100.0);
        assert!(!e.stats_dirty);
    }

    #[test]
    fn giant_scales_radius_only() {
        let mut e = level_one_character();
        e.learned.insert(SkillId::Giant, 5);
        e.skills[0] = Some(SkillSlot::new(SkillId::Giant));
        recompute(&mut e);
        assert!((e.radius - 18.0).abs() < 1e-4);
        assert!((e.secondary.volume - e.base.volume).abs() < 1e-12);
    }
}
