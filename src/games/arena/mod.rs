/// Idle Arena: a real-time incremental arena RPG.

pub mod actions;
pub mod affix;
pub mod boss;
pub mod combat;
pub mod commands;
pub mod config;
pub mod equipment;
pub mod error;
pub mod farm;
pub mod game_loop;
pub mod loot;
pub mod movement;
pub mod progression;
pub mod projectile;
pub mod quest;
pub mod render;
pub mod rng;
pub mod save;
pub mod skills;
pub mod spawner;
pub mod state;
pub mod stats;
pub mod status;
pub mod tables;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;
use tracing::debug;

use crate::games::Game;
use crate::input::{ClickState, InputEvent};
use crate::time::Clock;

use actions::*;
use config::SimConfig;
use equipment::{EquipSlot, EQUIPMENT_TEMPLATES};
use error::ActionError;
use game_loop::GameLoop;
use quest::{QuestId, QuestStatus, ALL_QUESTS};
use skills::SkillId;
use state::{EntityId, GameEvent, SKILL_SLOTS};
use tables::{CropKind, ItemKind, ShopGood, LEVEL_COUNT, SHOP};

const LOG_CAPACITY: usize = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Team,
    Items,
    Shop,
    Quests,
    Farm,
    Map,
}

impl Panel {
    pub const ALL: [Panel; 6] = [
        Panel::Team,
        Panel::Items,
        Panel::Shop,
        Panel::Quests,
        Panel::Farm,
        Panel::Map,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Panel::Team => "Team",
            Panel::Items => "Items",
            Panel::Shop => "Shop",
            Panel::Quests => "Quests",
            Panel::Farm => "Farm",
            Panel::Map => "Map",
        }
    }

    pub fn hotkey(self) -> char {
        match self {
            Panel::Team => 't',
            Panel::Items => 'i',
            Panel::Shop => 'p',
            Panel::Quests => 'o',
            Panel::Farm => 'f',
            Panel::Map => 'm',
        }
    }
}

/// What activating a panel row does.
#[derive(Clone, Debug, PartialEq)]
pub enum RowAction {
    Select(usize),
    EquipSkill(SkillId),
    UnequipSkill(usize),
    Unequip(EquipSlot),
    UseItem(ItemKind),
    SellItem(ItemKind),
    Equip(usize),
    SellEquipment(usize),
    Buy(usize),
    Craft(&'static str),
    AcceptQuest(QuestId),
    SubmitQuest(QuestId),
    Plant(usize, CropKind),
    Harvest(usize),
    Travel(u32),
    /// Informational row.
    None,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelRow {
    pub label: String,
    pub action: RowAction,
}

impl PanelRow {
    fn new(label: impl Into<String>, action: RowAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub text: String,
    pub important: bool,
}

pub struct ArenaGame {
    pub game_loop: GameLoop,
    pub panel: Panel,
    /// Index into `roster()`.
    pub selected: usize,
    /// Items panel rows sell instead of use/equip.
    pub sell_mode: bool,
    pub log: VecDeque<LogLine>,
    ticks_since_save: u64,
}

impl ArenaGame {
    pub fn new(seed: u64) -> Self {
        Self::configured(seed, None)
    }

    /// New game with an optional `SimConfig` JSON override.
    pub fn configured(seed: u64, config_json: Option<&str>) -> Self {
        let mut game_loop = GameLoop::new(SimConfig::with_override(config_json), seed);
        spawner::start_new_game(&mut game_loop.ctx);
        Self::with_loop(game_loop)
    }

    pub fn with_loop(game_loop: GameLoop) -> Self {
        Self {
            game_loop,
            panel: Panel::Team,
            selected: 0,
            sell_mode: false,
            log: VecDeque::new(),
            ticks_since_save: 0,
        }
    }

    /// Resume from localStorage, crediting idle gold for the time the page
    /// was closed. Falls back to a new game.
    #[cfg(target_arch = "wasm32")]
    pub fn load_or_new(seed: u64, wall_ms: f64) -> Self {
        let mut game = Self::configured(seed, save::stored_config().as_deref());
        if let Some(saved_at) = save::load_game(&mut game.game_loop.ctx) {
            game.game_loop.ctx.wall_ms = wall_ms;
            let offline = wall_ms - saved_at;
            if offline > game.game_loop.ctx.config.stall_threshold_ms {
                game_loop::credit_idle(&mut game.game_loop.ctx, offline);
            }
            game.push_log("Save loaded.", false);
            game.drain_events();
        }
        game
    }

    pub fn roster(&self) -> Vec<EntityId> {
        let world = &self.game_loop.ctx.world;
        world.characters.iter().chain(world.bench.iter()).copied().collect()
    }

    pub fn selected_id(&self) -> Option<EntityId> {
        self.roster().get(self.selected).copied()
    }

    fn push_log(&mut self, text: impl Into<String>, important: bool) {
        self.log.push_back(LogLine {
            text: text.into(),
            important,
        });
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }
    }

    fn entity_name(&self, id: EntityId) -> String {
        self.game_loop
            .ctx
            .registry
            .get(id)
            .map(|e| format!("{} #{}", e.template, id.0))
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    fn describe(&self, event: &GameEvent) -> Option<LogLine> {
        let (text, important) = match event {
            GameEvent::EnemyKilled { template, .. } => (format!("Defeated {template}."), false),
            GameEvent::CharacterDowned { id } => (format!("{} was downed!", self.entity_name(*id)), true),
            GameEvent::CharacterRespawned { id } => (format!("{} is back.", self.entity_name(*id)), false),
            GameEvent::LevelUp { id, level } => {
                (format!("{} reached level {level}!", self.entity_name(*id)), true)
            }
            GameEvent::LootDropped { item, quantity } => {
                (format!("Found {} x{quantity}.", render::item_name(item)), false)
            }
            GameEvent::EquipmentDropped { name } => (format!("Found {name}!"), true),
            GameEvent::BossSpawned { template } => (format!("{template} has appeared!"), true),
            GameEvent::BossPhaseChanged { phase } => (format!("The boss enters phase {}.", phase + 1), true),
            GameEvent::BossAbility { ability } => (format!("Boss uses {ability:?}!"), false),
            GameEvent::BossDefeated { template, gold } => {
                (format!("{template} defeated! +{gold} gold"), true)
            }
            GameEvent::QuestCompleted { quest } => {
                (format!("Quest ready: {}", quest::quest_info(*quest).name), true)
            }
            GameEvent::IdleReward { gold, idle_ms } => (
                format!("While away ({:.0} min): +{gold} gold", idle_ms / 60_000.0),
                true,
            ),
            GameEvent::IntegrityRepaired { id } => (format!("Repaired world state for #{}.", id.0), false),
            GameEvent::SkillCast { .. } | GameEvent::GoldGained { .. } => return None,
        };
        Some(LogLine { text, important })
    }

    fn drain_events(&mut self) {
        let events = self.game_loop.ctx.world.drain_events();
        for event in &events {
            if let Some(line) = self.describe(event) {
                self.push_log(line.text, line.important);
            }
        }
    }

    /// Rows of the active panel. Render and input both read this list, so a
    /// row index means the same thing to both.
    pub fn panel_rows(&self) -> Vec<PanelRow> {
        let ctx = &self.game_loop.ctx;
        let mut rows = Vec::new();
        match self.panel {
            Panel::Team => {
                let team = ctx.world.characters.len();
                for (i, id) in self.roster().into_iter().enumerate() {
                    let Some(e) = ctx.registry.get(id) else { continue };
                    let marker = if i == self.selected { ">" } else { " " };
                    let place = if i < team { "" } else { " (bench)" };
                    rows.push(PanelRow::new(
                        format!(
                            "{marker} {} Lv{} {:.0}/{:.0} HP{place}",
                            e.template, e.level, e.health.max(0.0), e.max_health
                        ),
                        RowAction::Select(i),
                    ));
                }
                let Some(e) = self.selected_id().and_then(|id| ctx.registry.get(id)) else {
                    return rows;
                };
                for (slot, s) in e.skills.iter().enumerate() {
                    if let Some(s) = s {
                        rows.push(PanelRow::new(
                            format!("  slot {}: {} (remove)", slot + 1, skills::skill_def(s.skill).name),
                            RowAction::UnequipSkill(slot),
                        ));
                    }
                }
                for (skill, level) in &e.learned {
                    if e.skills.iter().flatten().any(|s| s.skill == *skill) {
                        continue;
                    }
                    rows.push(PanelRow::new(
                        format!("  learn: {} Lv{level} (slot in)", skills::skill_def(*skill).name),
                        RowAction::EquipSkill(*skill),
                    ));
                }
                for slot in EquipSlot::all() {
                    if let Some(item) = e.equipped(*slot) {
                        rows.push(PanelRow::new(
                            format!("  {:?}: {} (unequip)", slot, item.name),
                            RowAction::Unequip(*slot),
                        ));
                    }
                }
            }
            Panel::Items => {
                for stack in &ctx.inventory.stacks {
                    let action = if self.sell_mode {
                        RowAction::SellItem(stack.item)
                    } else {
                        RowAction::UseItem(stack.item)
                    };
                    rows.push(PanelRow::new(
                        format!("{} x{}", render::item_name(&stack.item), stack.quantity),
                        action,
                    ));
                }
                for (i, item) in ctx.inventory.equipment.iter().enumerate() {
                    let action = if self.sell_mode {
                        RowAction::SellEquipment(i)
                    } else {
                        RowAction::Equip(i)
                    };
                    rows.push(PanelRow::new(
                        format!("{} [{}] {}g", item.name, item.rarity.name(), item.sell_price()),
                        action,
                    ));
                }
            }
            Panel::Shop => {
                for (i, entry) in SHOP.iter().enumerate() {
                    let name = match entry.good {
                        ShopGood::Item(item) => render::item_name(&item),
                        ShopGood::Equipment(key) => equipment::find_template(key)
                            .map(|t| t.name.to_string())
                            .unwrap_or_else(|| key.to_string()),
                    };
                    rows.push(PanelRow::new(format!("Buy {name} - {}g", entry.price), RowAction::Buy(i)));
                }
                for t in EQUIPMENT_TEMPLATES {
                    rows.push(PanelRow::new(
                        format!("Craft {} [{}]", t.name, t.rarity.name()),
                        RowAction::Craft(t.key),
                    ));
                }
            }
            Panel::Quests => {
                for &id in ALL_QUESTS {
                    let info = quest::quest_info(id);
                    let Some(p) = ctx.quests.get(id) else { continue };
                    let target = info.goal.target();
                    let (state, action) = match p.status {
                        QuestStatus::Available => ("accept".to_string(), RowAction::AcceptQuest(id)),
                        QuestStatus::Active => (format!("{}/{}", p.progress, target), RowAction::None),
                        QuestStatus::ReadyToComplete => ("submit!".to_string(), RowAction::SubmitQuest(id)),
                        QuestStatus::Completed => ("done".to_string(), RowAction::None),
                    };
                    rows.push(PanelRow::new(format!("{} [{state}]", info.name), action));
                }
            }
            Panel::Farm => {
                for (i, plot) in ctx.farm.plots.iter().enumerate() {
                    let row = match plot.crop {
                        Some(crop) if plot.is_ready(ctx.wall_ms) => {
                            PanelRow::new(format!("Plot {}: {crop:?} (harvest)", i + 1), RowAction::Harvest(i))
                        }
                        Some(crop) => PanelRow::new(
                            format!("Plot {}: {crop:?} {:.0}%", i + 1, plot.progress(ctx.wall_ms) * 100.0),
                            RowAction::None,
                        ),
                        None => match CropKind::all()
                            .iter()
                            .find(|c| ctx.inventory.count(&ItemKind::Seed(**c)) > 0)
                        {
                            Some(crop) => PanelRow::new(
                                format!("Plot {}: empty (plant {crop:?})", i + 1),
                                RowAction::Plant(i, *crop),
                            ),
                            None => PanelRow::new(format!("Plot {}: empty (no seeds)", i + 1), RowAction::None),
                        },
                    };
                    rows.push(row);
                }
            }
            Panel::Map => {
                for level in 1..=LEVEL_COUNT {
                    let info = tables::level_info(level);
                    let here = if level == ctx.world.level { " (here)" } else { "" };
                    rows.push(PanelRow::new(
                        format!("{} (Lv{}){here}", info.name, info.enemy_level),
                        RowAction::Travel(level),
                    ));
                }
            }
        }
        rows
    }

    fn perform(&mut self, action: RowAction) -> Result<Option<String>, ActionError> {
        let selected = self.selected_id();
        let character = || selected.ok_or(ActionError::NoTarget);
        let ctx = &mut self.game_loop.ctx;
        let message = match action {
            RowAction::Select(i) => {
                self.selected = i;
                None
            }
            RowAction::EquipSkill(skill) => {
                let id = character()?;
                let e = ctx.registry.get(id).ok_or(ActionError::EntityNotFound(id))?;
                let slot = e
                    .skills
                    .iter()
                    .position(|s| s.is_none())
                    .ok_or(ActionError::InvalidSlot(SKILL_SLOTS))?;
                commands::equip_skill(ctx, id, slot, skill)?;
                None
            }
            RowAction::UnequipSkill(slot) => {
                commands::unequip_skill(ctx, character()?, slot)?;
                None
            }
            RowAction::Unequip(slot) => {
                commands::unequip_item(ctx, character()?, slot)?;
                None
            }
            RowAction::UseItem(item) => {
                commands::use_item(ctx, item, character()?)?;
                Some(format!("Used {}.", render::item_name(&item)))
            }
            RowAction::SellItem(item) => {
                let gold = commands::sell_item(ctx, item, 1)?;
                Some(format!("Sold {} for {gold}g.", render::item_name(&item)))
            }
            RowAction::Equip(index) => {
                commands::equip_item(ctx, character()?, index)?;
                None
            }
            RowAction::SellEquipment(index) => {
                let gold = commands::sell_equipment(ctx, index)?;
                Some(format!("Sold equipment for {gold}g."))
            }
            RowAction::Buy(index) => {
                commands::buy_item(ctx, index)?;
                Some("Purchased.".to_string())
            }
            RowAction::Craft(key) => {
                let item = commands::craft_equipment(ctx, key)?;
                let mark = if item.masterwork { " (masterwork)" } else { "" };
                Some(format!("Crafted {}{mark}.", item.name))
            }
            RowAction::AcceptQuest(id) => {
                commands::accept_quest(ctx, id)?;
                Some(format!("Accepted {}.", quest::quest_info(id).name))
            }
            RowAction::SubmitQuest(id) => {
                commands::submit_quest(ctx, id)?;
                Some(format!("Completed {}!", quest::quest_info(id).name))
            }
            RowAction::Plant(plot, crop) => {
                commands::plant(ctx, plot, crop)?;
                Some(format!("Planted {crop:?}."))
            }
            RowAction::Harvest(plot) => {
                let (item, amount) = commands::harvest(ctx, plot)?;
                Some(format!("Harvested {} x{amount}.", render::item_name(&item)))
            }
            RowAction::Travel(level) => {
                commands::travel(ctx, level)?;
                Some(format!("Travelled to {}.", tables::level_info(level).name))
            }
            RowAction::None => None,
        };
        Ok(message)
    }

    fn report(&mut self, result: Result<Option<String>, ActionError>) {
        match result {
            Ok(Some(message)) => self.push_log(message, false),
            Ok(None) => {}
            Err(e) => {
                debug!(error = %e, "command rejected");
                self.push_log(e.to_string(), false);
            }
        }
        self.drain_events();
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.roster().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn activate_row(&mut self, row: usize) -> bool {
        let Some(row) = self.panel_rows().into_iter().nth(row) else {
            return false;
        };
        let result = self.perform(row.action);
        self.report(result);
        true
    }

    pub fn cast(&mut self, slot: usize) {
        let Some(id) = self.selected_id() else { return };
        let result = commands::cast_skill(&mut self.game_loop.ctx, id, slot, None).map(|_| None);
        self.report(result);
    }

    fn toggle_bench(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let ctx = &mut self.game_loop.ctx;
        let result = if ctx.world.characters.contains(&id) {
            commands::remove_from_team(ctx, id)
        } else {
            commands::add_to_team(ctx, id)
        };
        self.report(result.map(|_| None));
        // Keep the same character selected after it changes lists.
        if let Some(i) = self.roster().iter().position(|r| *r == id) {
            self.selected = i;
        }
    }

    /// Rebuild the simulation from its own persistent state after a fatal
    /// stop.
    pub fn restart(&mut self, seed: u64) {
        let snapshot = save::extract_snapshot(&self.game_loop.ctx);
        let mut game_loop = GameLoop::new(self.game_loop.ctx.config.clone(), seed);
        game_loop.ctx.wall_ms = self.game_loop.ctx.wall_ms;
        save::apply_snapshot(&mut game_loop.ctx, &snapshot);
        self.game_loop = game_loop;
        self.push_log("Simulation restarted.", true);
        self.clamp_selection();
    }

    fn autosave(&mut self, ticks: u32) {
        self.ticks_since_save += ticks as u64;
        if self.ticks_since_save < save::AUTOSAVE_INTERVAL {
            return;
        }
        self.ticks_since_save = 0;
        #[cfg(target_arch = "wasm32")]
        save::save_game(&self.game_loop.ctx);
    }

    fn key(&mut self, key: char) -> bool {
        if self.game_loop.is_fatal() {
            if key == 'R' || key == 'r' {
                let seed = self.game_loop.ctx.now as u64 ^ self.game_loop.faults as u64;
                self.restart(seed);
                return true;
            }
            return false;
        }
        if let Some(panel) = Panel::ALL.iter().find(|p| p.hotkey() == key) {
            self.panel = *panel;
            return true;
        }
        match key {
            'q' | 'w' | 'e' | 'r' => {
                let slot = "qwer".find(key).unwrap_or(0);
                self.cast(slot);
                true
            }
            'n' => {
                self.next_character();
                true
            }
            'b' => {
                self.toggle_bench();
                true
            }
            's' => {
                self.sell_mode = !self.sell_mode;
                true
            }
            '1'..='9' => self.activate_row((key as u8 - b'1') as usize),
            '0' => self.activate_row(9),
            _ => false,
        }
    }

    fn next_character(&mut self) {
        let len = self.roster().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    fn click(&mut self, id: u16) -> bool {
        if self.game_loop.is_fatal() {
            return false;
        }
        match id {
            NEXT_CHARACTER => self.next_character(),
            BENCH_SELECTED => self.toggle_bench(),
            TOGGLE_SELL_MODE => self.sell_mode = !self.sell_mode,
            id if id >= PANEL_ROW_BASE && id < NEXT_CHARACTER => {
                return self.activate_row((id - PANEL_ROW_BASE) as usize);
            }
            id if id >= CAST_SKILL_BASE && id < CAST_SKILL_BASE + SKILL_SLOTS as u16 => {
                self.cast((id - CAST_SKILL_BASE) as usize);
            }
            id if id >= TAB_BASE && id < TAB_BASE + Panel::ALL.len() as u16 => {
                self.panel = Panel::ALL[(id - TAB_BASE) as usize];
            }
            _ => return false,
        }
        true
    }
}

impl Game for ArenaGame {
    fn handle_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key(c) => self.key(*c),
            InputEvent::Click(id) => self.click(*id),
        }
    }

    fn tick(&mut self, clock: &dyn Clock) -> u32 {
        let ticks = self.game_loop.frame(clock);
        self.drain_events();
        self.clamp_selection();
        self.autosave(ticks);
        ticks
    }

    fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(self, f, area, click_state);
    }
}
