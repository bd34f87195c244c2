//! Equipment templates and the affix generator.
//!
//! An item's main affix is fixed by its template; its sub-affixes are rolled
//! once at creation and never change afterwards.

use serde::{Deserialize, Serialize};

use super::affix::{self, Attribute, AttributeSheet, Rarity, AFFIX_TABLE};
use super::rng::GameRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Armor,
    Offhand,
    Misc,
}

impl EquipSlot {
    pub const COUNT: usize = 4;

    pub fn all() -> &'static [EquipSlot] {
        &[
            EquipSlot::Weapon,
            EquipSlot::Armor,
            EquipSlot::Offhand,
            EquipSlot::Misc,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

pub struct EquipmentTemplate {
    pub key: &'static str,
    pub name: &'static str,
    pub slot: EquipSlot,
    pub rarity: Rarity,
    pub main_affix: &'static str,
    pub price: u64,
}

const fn template(
    key: &'static str,
    name: &'static str,
    slot: EquipSlot,
    rarity: Rarity,
    main_affix: &'static str,
    price: u64,
) -> EquipmentTemplate {
    EquipmentTemplate {
        key,
        name,
        slot,
        rarity,
        main_affix,
        price,
    }
}

pub const EQUIPMENT_TEMPLATES: &[EquipmentTemplate] = &[
    template("wooden_sword", "Wooden Sword", EquipSlot::Weapon, Rarity::Common, "attackPower+3", 30),
    template("iron_sword", "Iron Sword", EquipSlot::Weapon, Rarity::Rare, "attackPower+8", 150),
    template("flame_blade", "Flame Blade", EquipSlot::Weapon, Rarity::Epic, "attackPower+15", 600),
    template("worldbreaker", "Worldbreaker", EquipSlot::Weapon, Rarity::Legendary, "attackPower+28", 2_500),
    template("cloth_tunic", "Cloth Tunic", EquipSlot::Armor, Rarity::Common, "defense+1", 25),
    template("chain_mail", "Chain Mail", EquipSlot::Armor, Rarity::Rare, "defense+3", 140),
    template("dragon_plate", "Dragon Plate", EquipSlot::Armor, Rarity::Epic, "defense+6", 650),
    template("wooden_buckler", "Wooden Buckler", EquipSlot::Offhand, Rarity::Common, "maxHealth+10", 30),
    template("tower_shield", "Tower Shield", EquipSlot::Offhand, Rarity::Rare, "defense+2", 160),
    template("grimoire", "Grimoire", EquipSlot::Offhand, Rarity::Epic, "intelligence+3", 700),
    template("lucky_charm", "Lucky Charm", EquipSlot::Misc, Rarity::Common, "expGain+5", 40),
    template("swift_boots", "Swift Boots", EquipSlot::Misc, Rarity::Rare, "moveSpeed+8", 180),
    template("phoenix_feather", "Phoenix Feather", EquipSlot::Misc, Rarity::Legendary, "healthRegen+2.5", 3_000),
];

pub fn find_template(key: &str) -> Option<&'static EquipmentTemplate> {
    EQUIPMENT_TEMPLATES.iter().find(|t| t.key == key)
}

/// Parsed main affix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MainAffix {
    pub attribute: Attribute,
    pub value: f64,
}

/// Parse a main-affix string of the form `attribute+value`.
pub fn parse_main_affix(text: &str) -> Option<MainAffix> {
    let (key, value) = text.split_once('+')?;
    let attribute = Attribute::from_key(key.trim())?;
    let value: f64 = value.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(MainAffix { attribute, value })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubAffix {
    pub name: String,
    pub attribute: Attribute,
    pub value: f64,
    pub rarity: Rarity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub template: String,
    pub name: String,
    pub slot: EquipSlot,
    pub rarity: Rarity,
    pub main_affix: String,
    #[serde(default)]
    pub sub_affixes: Vec<SubAffix>,
    #[serde(default)]
    pub masterwork: bool,
}

impl EquipmentItem {
    /// Sum of main and sub affixes. An unparsable main affix contributes
    /// nothing.
    pub fn bonuses(&self) -> AttributeSheet {
        let mut sheet = AttributeSheet::default();
        if let Some(main) = parse_main_affix(&self.main_affix) {
            sheet.add(main.attribute, main.value);
        }
        for sub in &self.sub_affixes {
            sheet.add(sub.attribute, sub.value);
        }
        sheet
    }

    pub fn has_affix_named(&self, name: &str) -> bool {
        self.sub_affixes.iter().any(|s| s.name == name)
    }

    /// Shop sell price: a fraction of the template price, or a rarity floor
    /// for unknown templates.
    pub fn sell_price(&self) -> u64 {
        let base = find_template(&self.template)
            .map(|t| t.price)
            .unwrap_or(match self.rarity {
                Rarity::Common => 20,
                Rarity::Rare => 80,
                Rarity::Epic => 300,
                Rarity::Legendary => 1_000,
            });
        (base / 2).max(1) + if self.masterwork { base / 4 } else { 0 }
    }
}

fn roll_sub_affix(equipment_rarity: Rarity, rng: &mut GameRng) -> Option<SubAffix> {
    let preset = affix::roll_preset(equipment_rarity, rng)?;
    Some(SubAffix {
        name: preset.name.to_string(),
        attribute: preset.attribute,
        value: affix::roll_value(preset, rng),
        rarity: preset.rarity,
    })
}

/// Build an item from its template with `sub_affix_count(rarity)` rolled
/// sub-affixes. Duplicated names are allowed.
pub fn generate(template: &EquipmentTemplate, rng: &mut GameRng) -> EquipmentItem {
    let count = template.rarity.sub_affix_count();
    let mut sub_affixes = Vec::with_capacity(count);
    while sub_affixes.len() < count {
        match roll_sub_affix(template.rarity, rng) {
            Some(sub) => sub_affixes.push(sub),
            // Every rarity row has positive weights over non-empty tiers, so
            // this only triggers on a broken table; fall back to the first preset.
            None => {
                let preset = &AFFIX_TABLE[0];
                sub_affixes.push(SubAffix {
                    name: preset.name.to_string(),
                    attribute: preset.attribute,
                    value: preset.min,
                    rarity: preset.rarity,
                });
            }
        }
    }
    EquipmentItem {
        template: template.key.to_string(),
        name: template.name.to_string(),
        slot: template.slot,
        rarity: template.rarity,
        main_affix: template.main_affix.to_string(),
        sub_affixes,
        masterwork: false,
    }
}

/// Crafting path: a normal generation plus, with `masterwork_chance`, one
/// extra sub-affix whose name is not on the item yet.
pub fn craft(template: &EquipmentTemplate, masterwork_chance: f64, rng: &mut GameRng) -> EquipmentItem {
    let mut item = generate(template, rng);
    if rng.chance(masterwork_chance) {
        add_masterwork_affix(&mut item, rng);
    }
    item
}

/// Append one sub-affix with a fresh name. Tier comes from the item's
/// rarity weights; if that tier has no unused names any unused name is
/// taken. Returns false when every preset name is already present.
pub fn add_masterwork_affix(item: &mut EquipmentItem, rng: &mut GameRng) -> bool {
    let tier = rng.weighted(&item.rarity.sub_affix_weights());
    let unused = |p: &&affix::AffixPreset| !item.has_affix_named(p.name);

    let mut candidates: Vec<&'static affix::AffixPreset> = match tier {
        Some(tier) => affix::presets_of(tier).filter(unused).collect(),
        None => Vec::new(),
    };
    if candidates.is_empty() {
        candidates = AFFIX_TABLE.iter().filter(unused).collect();
    }
    let Some(preset) = rng.pick(&candidates).copied() else {
        return false;
    };
    item.sub_affixes.push(SubAffix {
        name: preset.name.to_string(),
        attribute: preset.attribute,
        value: affix::roll_value(preset, rng),
        rarity: preset.rarity,
    });
    item.masterwork = true;
    true
}

/// Random template of the given rarity (loot and boss bundles).
pub fn random_of_rarity(rarity: Rarity, rng: &mut GameRng) -> Option<EquipmentItem> {
    let pool: Vec<&'static EquipmentTemplate> = EQUIPMENT_TEMPLATES
        .iter()
        .filter(|t| t.rarity == rarity)
        .collect();
    let template = rng.pick(&pool).copied()?;
    Some(generate(template, rng))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_of(rarity: Rarity) -> &'static EquipmentTemplate {
        EQUIPMENT_TEMPLATES.iter().find(|t| t.rarity == rarity).unwrap()
    }

    #[test]
    fn sub_affix_count_matches_rarity() {
        let mut rng = GameRng::seeded(5);
        for (rarity, expected) in [
            (Rarity::Common, 1),
            (Rarity::Rare, 2),
            (Rarity::Epic, 3),
            (Rarity::Legendary, 4),
        ] {
            for _ in 0..50 {
                let item = generate(template_of(rarity), &mut rng);
                assert_eq!(item.sub_affixes.len(), expected);
            }
        }
    }

    #[test]
    fn legendary_always_four_sub_affixes() {
        let mut rng = GameRng::seeded(99);
        let t = find_template("worldbreaker").unwrap();
        for _ in 0..200 {
            assert_eq!(generate(t, &mut rng).sub_affixes.len(), 4);
        }
    }

    #[test]
    fn all_template_main_affixes_parse() {
        for t in EQUIPMENT_TEMPLATES {
            assert!(parse_main_affix(t.main_affix).is_some(), "{}", t.main_affix);
        }
    }

    #[test]
    fn parse_main_affix_rejects_garbage() {
        assert_eq!(parse_main_affix("attackPower"), None);
        assert_eq!(parse_main_affix("luck+3"), None);
        assert_eq!(parse_main_affix("defense+abc"), None);
        assert_eq!(
            parse_main_affix("healthRegen+2.5"),
            Some(MainAffix {
                attribute: Attribute::HealthRegen,
                value: 2.5
            })
        );
    }

    #[test]
    fn bonuses_sum_main_and_subs() {
        let item = EquipmentItem {
            template: "iron_sword".into(),
            name: "Iron Sword".into(),
            slot: EquipSlot::Weapon,
            rarity: Rarity::Rare,
            main_affix: "attackPower+8".into(),
            sub_affixes: vec![
                SubAffix {
                    name: "Keen".into(),
                    attribute: Attribute::AttackPower,
                    value: 2.0,
                    rarity: Rarity::Common,
                },
                SubAffix {
                    name: "Mighty".into(),
                    attribute: Attribute::Strength,
                    value: 1.0,
                    rarity: Rarity::Rare,
                },
            ],
            masterwork: false,
        };
        let b = item.bonuses();
        assert!((b.get(Attribute::AttackPower) - 10.0).abs() < 1e-9);
        assert!((b.get(Attribute::Strength) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn masterwork_never_duplicates_names() {
        let mut rng = GameRng::seeded(17);
        let t = find_template("worldbreaker").unwrap();
        for _ in 0..200 {
            let mut item = generate(t, &mut rng);
            let before = item.sub_affixes.len();
            assert!(add_masterwork_affix(&mut item, &mut rng));
            assert_eq!(item.sub_affixes.len(), before + 1);
            let new_name = &item.sub_affixes.last().unwrap().name;
            let same = item.sub_affixes.iter().filter(|s| &s.name == new_name).count();
            assert_eq!(same, 1);
            assert!(item.masterwork);
        }
    }

    #[test]
    fn masterwork_fails_when_all_names_used() {
        let mut rng = GameRng::seeded(2);
        let mut item = generate(find_template("wooden_sword").unwrap(), &mut rng);
        item.sub_affixes = AFFIX_TABLE
            .iter()
            .map(|p| SubAffix {
                name: p.name.into(),
                attribute: p.attribute,
                value: p.min,
                rarity: p.rarity,
            })
            .collect();
        let len = item.sub_affixes.len();
        assert!(!add_masterwork_affix(&mut item, &mut rng));
        assert_eq!(item.sub_affixes.len(), len);
    }

    #[test]
    fn craft_with_certain_masterwork_adds_one() {
        let mut rng = GameRng::seeded(4);
        let item = craft(find_template("chain_mail").unwrap(), 1.0, &mut rng);
        assert_eq!(item.sub_affixes.len(), 3);
        assert!(item.masterwork);
        let item = craft(find_template("chain_mail").unwrap(), 0.0, &mut rng);
        assert_eq!(item.sub_affixes.len(), 2);
        assert!(!item.masterwork);
    }

    #[test]
    fn sell_price_positive() {
        let mut rng = GameRng::seeded(4);
        for t in EQUIPMENT_TEMPLATES {
            assert!(generate(t, &mut rng).sell_price() > 0);
        }
    }
}
