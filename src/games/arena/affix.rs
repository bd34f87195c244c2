//! Affix table: named stat-modifier presets keyed by rarity and attribute.

use serde::{Deserialize, Serialize};

use super::rng::GameRng;

/// Attributes an affix, status or passive can modify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Agility,
    Intelligence,
    Skill,
    AttackPower,
    Defense,
    MoveSpeed,
    HealthRegen,
    ManaRegen,
    MaxHealth,
    ExpGain,
}

impl Attribute {
    pub const COUNT: usize = 11;

    pub fn all() -> &'static [Attribute] {
        &[
            Attribute::Strength,
            Attribute::Agility,
            Attribute::Intelligence,
            Attribute::Skill,
            Attribute::AttackPower,
            Attribute::Defense,
            Attribute::MoveSpeed,
            Attribute::HealthRegen,
            Attribute::ManaRegen,
            Attribute::MaxHealth,
            Attribute::ExpGain,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used in main-affix strings such as `attackPower+5`.
    pub fn key(self) -> &'static str {
        match self {
            Attribute::Strength => "strength",
            Attribute::Agility => "agility",
            Attribute::Intelligence => "intelligence",
            Attribute::Skill => "skill",
            Attribute::AttackPower => "attackPower",
            Attribute::Defense => "defense",
            Attribute::MoveSpeed => "moveSpeed",
            Attribute::HealthRegen => "healthRegen",
            Attribute::ManaRegen => "manaRegen",
            Attribute::MaxHealth => "maxHealth",
            Attribute::ExpGain => "expGain",
        }
    }

    pub fn from_key(key: &str) -> Option<Attribute> {
        Attribute::all().iter().copied().find(|a| a.key() == key)
    }
}

/// Per-attribute accumulator used for equipment and status aggregates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttributeSheet {
    values: [f64; Attribute::COUNT],
}

impl AttributeSheet {
    pub fn get(&self, attribute: Attribute) -> f64 {
        self.values[attribute.index()]
    }

    pub fn add(&mut self, attribute: Attribute, value: f64) {
        if value.is_finite() {
            self.values[attribute.index()] += value;
        }
    }

    pub fn merge(&mut self, other: &AttributeSheet) {
        for (a, b) in self.values.iter_mut().zip(other.values.iter()) {
            *a += b;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

/// Persisted by name; unknown names load as common.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn all() -> &'static [Rarity] {
        &[Rarity::Common, Rarity::Rare, Rarity::Epic, Rarity::Legendary]
    }

    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    /// Unknown names fall back to common-tier rules.
    pub fn from_name(name: &str) -> Rarity {
        match name.to_ascii_lowercase().as_str() {
            "rare" => Rarity::Rare,
            "epic" => Rarity::Epic,
            "legendary" => Rarity::Legendary,
            _ => Rarity::Common,
        }
    }

    pub fn sub_affix_count(self) -> usize {
        match self {
            Rarity::Common => 1,
            Rarity::Rare => 2,
            Rarity::Epic => 3,
            Rarity::Legendary => 4,
        }
    }

    /// Sub-affix rarity weights for equipment of this rarity.
    pub fn sub_affix_weights(self) -> [(Rarity, f64); 4] {
        let w = match self {
            Rarity::Common => [70.0, 25.0, 5.0, 0.0],
            Rarity::Rare => [40.0, 40.0, 15.0, 5.0],
            Rarity::Epic => [10.0, 40.0, 40.0, 10.0],
            Rarity::Legendary => [0.0, 5.0, 45.0, 50.0],
        };
        [
            (Rarity::Common, w[0]),
            (Rarity::Rare, w[1]),
            (Rarity::Epic, w[2]),
            (Rarity::Legendary, w[3]),
        ]
    }
}

impl From<String> for Rarity {
    fn from(name: String) -> Self {
        Rarity::from_name(&name)
    }
}

impl From<Rarity> for &'static str {
    fn from(rarity: Rarity) -> Self {
        rarity.name()
    }
}

/// A named affix preset with its value range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffixPreset {
    pub name: &'static str,
    pub attribute: Attribute,
    pub min: f64,
    pub max: f64,
    pub rarity: Rarity,
}

const fn preset(
    name: &'static str,
    attribute: Attribute,
    min: f64,
    max: f64,
    rarity: Rarity,
) -> AffixPreset {
    AffixPreset {
        name,
        attribute,
        min,
        max,
        rarity,
    }
}

pub const AFFIX_TABLE: &[AffixPreset] = &[
    // ── Common ──────────────────────────────────────────────
    preset("Sturdy", Attribute::Defense, 1.0, 2.0, Rarity::Common),
    preset("Brisk", Attribute::MoveSpeed, 2.0, 4.0, Rarity::Common),
    preset("Keen", Attribute::AttackPower, 1.0, 3.0, Rarity::Common),
    preset("Hale", Attribute::MaxHealth, 5.0, 10.0, Rarity::Common),
    preset("Mending", Attribute::HealthRegen, 0.1, 0.3, Rarity::Common),
    preset("Lucid", Attribute::ManaRegen, 0.2, 0.5, Rarity::Common),
    // ── Rare ────────────────────────────────────────────────
    preset("Mighty", Attribute::Strength, 1.0, 2.0, Rarity::Rare),
    preset("Nimble", Attribute::Agility, 1.0, 2.0, Rarity::Rare),
    preset("Wise", Attribute::Intelligence, 1.0, 2.0, Rarity::Rare),
    preset("Deft", Attribute::Skill, 1.0, 2.0, Rarity::Rare),
    preset("Vicious", Attribute::AttackPower, 3.0, 6.0, Rarity::Rare),
    preset("Warded", Attribute::Defense, 2.0, 4.0, Rarity::Rare),
    // ── Epic ────────────────────────────────────────────────
    preset("Titanic", Attribute::Strength, 2.0, 4.0, Rarity::Epic),
    preset("Zephyr", Attribute::MoveSpeed, 6.0, 10.0, Rarity::Epic),
    preset("Scholarly", Attribute::ExpGain, 5.0, 10.0, Rarity::Epic),
    preset("Vital", Attribute::MaxHealth, 20.0, 35.0, Rarity::Epic),
    preset("Regenerating", Attribute::HealthRegen, 0.5, 1.2, Rarity::Epic),
    preset("Arcane", Attribute::ManaRegen, 1.0, 2.0, Rarity::Epic),
    // ── Legendary ───────────────────────────────────────────
    preset("Godslayer", Attribute::AttackPower, 10.0, 16.0, Rarity::Legendary),
    preset("Aegis", Attribute::Defense, 6.0, 10.0, Rarity::Legendary),
    preset("Phoenix", Attribute::HealthRegen, 2.0, 3.5, Rarity::Legendary),
    preset("Sage", Attribute::Intelligence, 4.0, 6.0, Rarity::Legendary),
    preset("Colossus", Attribute::MaxHealth, 50.0, 80.0, Rarity::Legendary),
    preset("Prodigy", Attribute::ExpGain, 15.0, 25.0, Rarity::Legendary),
];

pub fn presets_of(rarity: Rarity) -> impl Iterator<Item = &'static AffixPreset> {
    AFFIX_TABLE.iter().filter(move |p| p.rarity == rarity)
}

/// Roll a value inside the preset range. Integer ranges give integers,
/// fractional ranges are rounded to one decimal.
pub fn roll_value(preset: &AffixPreset, rng: &mut GameRng) -> f64 {
    if preset.min.fract() == 0.0 && preset.max.fract() == 0.0 {
        rng.int_inclusive(preset.min as i64, preset.max as i64) as f64
    } else {
        let v = rng.float_inclusive(preset.min, preset.max);
        ((v * 10.0).round() / 10.0).clamp(preset.min, preset.max)
    }
}

/// Draw an affix tier from the weights of `equipment_rarity`, then a preset
/// uniformly among that tier.
pub fn roll_preset(equipment_rarity: Rarity, rng: &mut GameRng) -> Option<&'static AffixPreset> {
    let tier = rng.weighted(&equipment_rarity.sub_affix_weights())?;
    let candidates: Vec<&'static AffixPreset> = presets_of(tier).collect();
    rng.pick(&candidates).copied()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_rolled_value_in_range(idx in 0usize..AFFIX_TABLE.len(), seed in any::<u64>()) {
            let preset = &AFFIX_TABLE[idx];
            let mut rng = GameRng::seeded(seed);
            let v = roll_value(preset, &mut rng);
            prop_assert!(v >= preset.min && v <= preset.max, "{} out of [{}, {}]", v, preset.min, preset.max);
            if preset.min.fract() == 0.0 && preset.max.fract() == 0.0 {
                prop_assert_eq!(v.fract(), 0.0);
            } else {
                let scaled = v * 10.0;
                prop_assert!((scaled - scaled.round()).abs() < 1e-6);
            }
        }
    }
}
