//! Kill quests: accept, track via the combat death path, submit for
//! rewards.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ActionError;
use super::progression;
use super::state::{GameEvent, SimulationContext};
use super::tables::{EggTier, EnemyKind, ItemKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestId {
    Culling,
    SlimeSweep,
    WolfPack,
    GoblinBounty,
    GolemBreaker,
    Exorcism,
    Champion,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QuestGoal {
    KillAny(u32),
    KillKind(EnemyKind, u32),
    DefeatBoss(u32),
}

impl QuestGoal {
    pub fn target(self) -> u32 {
        match self {
            QuestGoal::KillAny(n) | QuestGoal::KillKind(_, n) | QuestGoal::DefeatBoss(n) => n,
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuestInfo {
    pub name: &'static str,
    pub goal: QuestGoal,
    pub reward_gold: u64,
    pub reward_exp: f64,
    pub reward_item: Option<ItemKind>,
    /// Repeatable quests return to Available after submission.
    pub repeatable: bool,
}

pub fn quest_info(id: QuestId) -> QuestInfo {
    match id {
        QuestId::Culling => QuestInfo {
            name: "Culling",
            goal: QuestGoal::KillAny(20),
            reward_gold: 50,
            reward_exp: 40.0,
            reward_item: Some(ItemKind::HealthPotion),
            repeatable: true,
        },
        QuestId::SlimeSweep => QuestInfo {
            name: "Slime Sweep",
            goal: QuestGoal::KillKind(EnemyKind::Slime, 15),
            reward_gold: 40,
            reward_exp: 30.0,
            reward_item: None,
            repeatable: true,
        },
        QuestId::WolfPack => QuestInfo {
            name: "Wolf Pack",
            goal: QuestGoal::KillKind(EnemyKind::Wolf, 10),
            reward_gold: 80,
            reward_exp: 60.0,
            reward_item: Some(ItemKind::ManaPotion),
            repeatable: true,
        },
        QuestId::GoblinBounty => QuestInfo {
            name: "Goblin Bounty",
            goal: QuestGoal::KillKind(EnemyKind::Goblin, 12),
            reward_gold: 120,
            reward_exp: 90.0,
            reward_item: None,
            repeatable: true,
        },
        QuestId::GolemBreaker => QuestInfo {
            name: "Golem Breaker",
            goal: QuestGoal::KillKind(EnemyKind::Golem, 5),
            reward_gold: 200,
            reward_exp: 150.0,
            reward_item: Some(ItemKind::Egg(EggTier::Rare)),
            repeatable: false,
        },
        QuestId::Exorcism => QuestInfo {
            name: "Exorcism",
            goal: QuestGoal::KillKind(EnemyKind::Wraith, 8),
            reward_gold: 260,
            reward_exp: 200.0,
            reward_item: None,
            repeatable: true,
        },
        QuestId::Champion => QuestInfo {
            name: "Champion",
            goal: QuestGoal::DefeatBoss(1),
            reward_gold: 500,
            reward_exp: 300.0,
            reward_item: Some(ItemKind::Egg(EggTier::Epic)),
            repeatable: false,
        },
    }
}

pub const ALL_QUESTS: &[QuestId] = &[
    QuestId::Culling,
    QuestId::SlimeSweep,
    QuestId::WolfPack,
    QuestId::GoblinBounty,
    QuestId::GolemBreaker,
    QuestId::Exorcism,
    QuestId::Champion,
];

// ── Progress ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestStatus {
    Available,
    Active,
    ReadyToComplete,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: QuestId,
    pub status: QuestStatus,
    #[serde(default)]
    pub progress: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestLog {
    pub quests: Vec<QuestProgress>,
}

impl Default for QuestLog {
    fn default() -> Self {
        Self {
            quests: ALL_QUESTS
                .iter()
                .map(|&quest_id| QuestProgress {
                    quest_id,
                    status: QuestStatus::Available,
                    progress: 0,
                })
                .collect(),
        }
    }
}

impl QuestLog {
    pub fn get(&self, id: QuestId) -> Option<&QuestProgress> {
        self.quests.iter().find(|q| q.quest_id == id)
    }

    fn get_mut(&mut self, id: QuestId) -> Option<&mut QuestProgress> {
        self.quests.iter_mut().find(|q| q.quest_id == id)
    }

    pub fn status(&self, id: QuestId) -> Option<QuestStatus> {
        self.get(id).map(|q| q.status)
    }

    /// Add entries for quests missing from an older save.
    pub fn fill_missing(&mut self) {
        for &id in ALL_QUESTS {
            if self.get(id).is_none() {
                self.quests.push(QuestProgress {
                    quest_id: id,
                    status: QuestStatus::Available,
                    progress: 0,
                });
            }
        }
    }

    fn advance(&mut self, matches: impl Fn(QuestGoal) -> bool) {
        for q in self.quests.iter_mut().filter(|q| q.status == QuestStatus::Active) {
            let goal = quest_info(q.quest_id).goal;
            if !matches(goal) {
                continue;
            }
            q.progress += 1;
            if q.progress >= goal.target() {
                q.status = QuestStatus::ReadyToComplete;
            }
        }
    }
}

pub fn accept(log: &mut QuestLog, id: QuestId) -> Result<(), ActionError> {
    let q = log.get_mut(id).ok_or(ActionError::QuestUnavailable)?;
    if q.status != QuestStatus::Available {
        return Err(ActionError::QuestUnavailable);
    }
    q.status = QuestStatus::Active;
    q.progress = 0;
    Ok(())
}

/// Called from the death path for every regular enemy kill.
pub fn notify_kill(log: &mut QuestLog, template: &str) {
    let kind = EnemyKind::from_key(template);
    log.advance(|goal| match goal {
        QuestGoal::KillAny(_) => true,
        QuestGoal::KillKind(k, _) => Some(k) == kind,
        QuestGoal::DefeatBoss(_) => false,
    });
}

pub fn notify_boss(log: &mut QuestLog) {
    log.advance(|goal| matches!(goal, QuestGoal::DefeatBoss(_)));
}

/// Hand in a finished quest: gold, full exp to every living character and
/// the optional item.
pub fn submit(ctx: &mut SimulationContext, id: QuestId) -> Result<(), ActionError> {
    let status = ctx.quests.status(id).ok_or(ActionError::QuestUnavailable)?;
    match status {
        QuestStatus::ReadyToComplete => {}
        QuestStatus::Active => return Err(ActionError::QuestIncomplete),
        _ => return Err(ActionError::QuestUnavailable),
    }
    let info = quest_info(id);
    if let Some(q) = ctx.quests.get_mut(id) {
        q.progress = 0;
        q.status = if info.repeatable {
            QuestStatus::Available
        } else {
            QuestStatus::Completed
        };
    }
    ctx.inventory.gold += info.reward_gold;
    for member in ctx.living_characters() {
        progression::award_exp(ctx, member, info.reward_exp);
    }
    if let Some(item) = info.reward_item {
        ctx.inventory.add(item, 1);
    }
    info!(quest = info.name, gold = info.reward_gold, "quest completed");
    ctx.world.push_event(GameEvent::QuestCompleted { quest: id });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::SimConfig;

    #[test]
    fn accept_only_when_available() {
        let mut log = QuestLog::default();
        assert!(accept(&mut log, QuestId::SlimeSweep).is_ok());
        assert_eq!(accept(&mut log, QuestId::SlimeSweep), Err(ActionError::QuestUnavailable));
    }

    #[test]
    fn kills_only_count_for_active_matching_quests() {
        let mut log = QuestLog::default();
        accept(&mut log, QuestId::SlimeSweep).unwrap();
        accept(&mut log, QuestId::Culling).unwrap();
        notify_kill(&mut log, "wolf");
        notify_kill(&mut log, "slime");
        assert_eq!(log.get(QuestId::SlimeSweep).unwrap().progress, 1);
        assert_eq!(log.get(QuestId::Culling).unwrap().progress, 2);
        assert_eq!(log.get(QuestId::WolfPack).unwrap().progress, 0);
    }

    #[test]
    fn reaching_target_marks_ready() {
        let mut log = QuestLog::default();
        accept(&mut log, QuestId::Champion).unwrap();
        notify_boss(&mut log);
        assert_eq!(log.status(QuestId::Champion), Some(QuestStatus::ReadyToComplete));
    }

    #[test]
    fn submit_pays_out_and_resets() {
        let mut ctx = SimulationContext::new(SimConfig::default(), 1);
        accept(&mut ctx.quests, QuestId::Culling).unwrap();
        assert_eq!(submit(&mut ctx, QuestId::Culling), Err(ActionError::QuestIncomplete));
        for _ in 0..20 {
            notify_kill(&mut ctx.quests, "goblin");
        }
        submit(&mut ctx, QuestId::Culling).unwrap();
        assert_eq!(ctx.inventory.gold, 50);
        assert_eq!(ctx.inventory.count(&ItemKind::HealthPotion), 1);
        assert_eq!(ctx.quests.status(QuestId::Culling), Some(QuestStatus::Available));
        assert_eq!(submit(&mut ctx, QuestId::Culling), Err(ActionError::QuestUnavailable));
    }

    #[test]
    fn one_shot_quest_completes() {
        let mut ctx = SimulationContext::new(SimConfig::default(), 1);
        accept(&mut ctx.quests, QuestId::Champion).unwrap();
        notify_boss(&mut ctx.quests);
        submit(&mut ctx, QuestId::Champion).unwrap();
        assert_eq!(ctx.quests.status(QuestId::Champion), Some(QuestStatus::Completed));
        assert_eq!(accept(&mut ctx.quests, QuestId::Champion), Err(ActionError::QuestUnavailable));
    }

    #[test]
    fn old_log_is_filled() {
        let mut log: QuestLog = serde_json::from_str(r#"{ "quests": [] }"#).unwrap();
        log.fill_missing();
        assert_eq!(log.quests.len(), ALL_QUESTS.len());
    }
}
