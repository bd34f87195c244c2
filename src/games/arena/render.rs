/// Idle Arena rendering: arena canvas, panels, skill bar and log.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::symbols::Marker;
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::canvas::{Canvas, Circle, Points};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};
use crate::widgets::{ClickableList, TabBar};

use super::actions::*;
use super::error::ActionError;
use super::game_loop::{EntityView, FrameView, LoopStatus};
use super::skills;
use super::state::EntityKind;
use super::tables::{self, ItemKind};
use super::{ArenaGame, Panel};

const SLOT_KEYS: [char; 4] = ['Q', 'W', 'E', 'R'];

pub fn item_name(item: &ItemKind) -> String {
    match item {
        ItemKind::HealthPotion => "Health Potion".to_string(),
        ItemKind::ManaPotion => "Mana Potion".to_string(),
        ItemKind::SkillTome(skill) => format!("Tome of {}", skills::skill_def(*skill).name),
        ItemKind::Egg(tier) => format!("{tier:?} Egg"),
        ItemKind::Food(food) => format!("{food:?}"),
        ItemKind::Seed(crop) => format!("{crop:?} Seed"),
        ItemKind::Ore => "Ore".to_string(),
        ItemKind::Herb => "Herb".to_string(),
    }
}

pub fn render(game: &ArenaGame, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
    let view = game.game_loop.view();
    if is_narrow_layout(area.width) {
        render_narrow(game, &view, f, area, click_state);
    } else {
        render_wide(game, &view, f, area, click_state);
    }
}

fn render_wide(
    game: &ArenaGame,
    view: &FrameView,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(10), Constraint::Length(8)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(4)])
        .split(columns[1]);

    let mut cs = click_state.borrow_mut();
    render_header(game, view, f, rows[0]);
    render_arena(view, f, columns[0]);
    render_tabs(game, f, right[0], &mut cs);
    render_skill_bar(game, f, right[1], &mut cs);
    render_panel(game, f, right[2], &mut cs);
    render_log(game, f, rows[2]);
}

fn render_narrow(
    game: &ArenaGame,
    view: &FrameView,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(12),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(5),
        ])
        .split(area);

    let mut cs = click_state.borrow_mut();
    render_header(game, view, f, chunks[0]);
    render_arena(view, f, chunks[1]);
    render_tabs(game, f, chunks[2], &mut cs);
    render_skill_bar(game, f, chunks[3], &mut cs);
    render_panel(game, f, chunks[4], &mut cs);
    render_log(game, f, chunks[5]);
}

fn render_header(game: &ArenaGame, view: &FrameView, f: &mut Frame, area: Rect) {
    let gold = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut first = vec![
        Span::styled(format!(" {}g ", view.gold), gold),
        Span::styled(
            format!(" {} ", tables::level_info(view.level).name),
            Style::default().fg(Color::Green),
        ),
    ];
    match &view.boss {
        Some(boss) => first.push(Span::styled(
            format!(
                " {} P{} {:.0}% ",
                boss.template,
                boss.phase + 1,
                boss.health_percent
            ),
            Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        )),
        None => first.push(Span::styled(
            format!(" boss {}/{} ", view.kills, view.boss_threshold),
            Style::default().fg(Color::DarkGray),
        )),
    }

    let second = match &view.status {
        LoopStatus::Fatal(reason) => Line::from(Span::styled(
            format!(" Simulation stopped: {reason}. Press R to restart. "),
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        LoopStatus::Running => selected_summary(game),
    };

    let header = Paragraph::new(vec![Line::from(first), second]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Idle Arena "),
    );
    f.render_widget(header, area);
}

fn selected_summary(game: &ArenaGame) -> Line<'static> {
    let ctx = &game.game_loop.ctx;
    let Some(e) = game.selected_id().and_then(|id| ctx.registry.get(id)) else {
        return Line::from("");
    };
    let mut text = format!(
        " {} Lv{}  HP {:.0}/{:.0}  MP {:.0}/{:.0}  EXP {:.0}/{:.0}  ATK {:.0} DEF {:.0}",
        e.template,
        e.level,
        e.health.max(0.0),
        e.max_health,
        e.mana,
        e.max_mana,
        e.exp,
        e.max_exp,
        e.secondary.attack_power,
        e.secondary.defense,
    );
    for status in &e.statuses {
        text.push_str(&format!("  {} {:.0}s", status.id, status.remaining_ms(ctx.now) / 1000.0));
    }
    let color = if e.alive { Color::White } else { Color::DarkGray };
    Line::from(Span::styled(text, Style::default().fg(color)))
}

fn entity_color(e: &EntityView) -> Color {
    if e.statuses.contains(&"stun") {
        return Color::Gray;
    }
    match e.kind {
        EntityKind::Character => Color::Cyan,
        EntityKind::Enemy => Color::Red,
        EntityKind::Boss => Color::LightMagenta,
        EntityKind::ResourcePoint => Color::Green,
    }
}

fn render_arena(view: &FrameView, f: &mut Frame, area: Rect) {
    let width = view.canvas.x as f64;
    let height = view.canvas.y as f64;
    // Canvas y grows upwards.
    let flip = |y: f32| height - y as f64;
    let projectiles: Vec<(f64, f64)> = view
        .projectiles
        .iter()
        .map(|p| (p.x as f64, flip(p.y)))
        .collect();

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for (center, radius) in &view.zones {
                ctx.draw(&Circle {
                    x: center.x as f64,
                    y: flip(center.y),
                    radius: *radius as f64,
                    color: Color::Magenta,
                });
            }
            ctx.layer();
            for e in view.entities.iter().filter(|e| e.alive) {
                ctx.draw(&Circle {
                    x: e.position.x as f64,
                    y: flip(e.position.y),
                    radius: e.radius as f64,
                    color: entity_color(e),
                });
            }
            ctx.draw(&Points {
                coords: &projectiles,
                color: Color::Yellow,
            });
            ctx.layer();
            for n in &view.damage_numbers {
                let style = if n.heal {
                    Style::default().fg(Color::LightGreen)
                } else {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                };
                ctx.print(
                    n.position.x as f64,
                    flip(n.position.y),
                    Span::styled(format!("{:.0}", n.amount), style),
                );
            }
        });
    f.render_widget(canvas, area);
}

fn render_tabs(game: &ArenaGame, f: &mut Frame, area: Rect, cs: &mut ClickState) {
    let mut bar = TabBar::new("│");
    for (i, panel) in Panel::ALL.iter().enumerate() {
        let style = if *panel == game.panel {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        bar = bar.tab(panel.label(), style, TAB_BASE + i as u16);
    }
    bar.block(Block::default().borders(Borders::ALL)).render(f, area, cs);
}

fn render_skill_bar(game: &ArenaGame, f: &mut Frame, area: Rect, cs: &mut ClickState) {
    let ctx = &game.game_loop.ctx;
    let mut bar = TabBar::new(" ");
    if let Some(e) = game.selected_id().and_then(|id| ctx.registry.get(id)) {
        for (slot, key) in SLOT_KEYS.iter().enumerate() {
            let Some(s) = e.skills[slot] else {
                bar = bar.tab(format!("{key}:-"), Style::default().fg(Color::DarkGray), CAST_SKILL_BASE + slot as u16);
                continue;
            };
            let name = skills::skill_def(s.skill).name;
            let label = match skills::check_use(e, slot, ctx.now) {
                Err(ActionError::OnCooldown { remaining_ms }) => {
                    format!("{key}:{name} {:.1}s", remaining_ms / 1000.0)
                }
                _ => format!("{key}:{name}"),
            };
            let ready = skills::can_use(e, slot, ctx.now);
            let style = Style::default().fg(if ready { Color::LightGreen } else { Color::DarkGray });
            bar = bar.tab(label, style, CAST_SKILL_BASE + slot as u16);
        }
    }
    let sell = if game.sell_mode { "Sell:on" } else { "Sell:off" };
    bar.tab("Next", Style::default().fg(Color::Cyan), NEXT_CHARACTER)
        .tab("Bench", Style::default().fg(Color::Cyan), BENCH_SELECTED)
        .tab(sell, Style::default().fg(Color::Yellow), TOGGLE_SELL_MODE)
        .block(Block::default().borders(Borders::ALL).title(" Skills "))
        .render(f, area, cs);
}

fn render_panel(game: &ArenaGame, f: &mut Frame, area: Rect, cs: &mut ClickState) {
    let mut cl = ClickableList::new();
    for (i, row) in game.panel_rows().into_iter().enumerate() {
        let key = match i {
            0..=8 => format!("{} ", i + 1),
            9 => "0 ".to_string(),
            _ => "  ".to_string(),
        };
        let line = Line::from(vec![
            Span::styled(key, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(row.label),
        ]);
        cl.push_clickable(line, PANEL_ROW_BASE + i as u16);
    }
    cl.register_targets(area, cs, 1, 1);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" {} ", game.panel.label()));
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_log(game: &ArenaGame, f: &mut Frame, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = game.log.len().saturating_sub(visible);
    let lines: Vec<Line> = game
        .log
        .iter()
        .skip(skip)
        .map(|entry| {
            let style = if entry.important {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(entry.text.clone(), style))
        })
        .collect();
    let log = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Log "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(log, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::arena::skills::SkillId;
    use crate::games::arena::tables::{CropKind, EggTier};

    #[test]
    fn item_names_are_readable() {
        assert_eq!(item_name(&ItemKind::HealthPotion), "Health Potion");
        assert_eq!(item_name(&ItemKind::Seed(CropKind::Wheat)), "Wheat Seed");
        assert_eq!(item_name(&ItemKind::Egg(EggTier::Rare)), "Rare Egg");
        assert!(item_name(&ItemKind::SkillTome(SkillId::Fireball)).starts_with("Tome of "));
    }

    #[test]
    fn summary_lists_statuses_with_time_left() {
        let mut game = ArenaGame::new(3);
        let ctx = &mut game.game_loop.ctx;
        let hero = ctx.world.characters[0];
        let now = ctx.now;
        crate::games::arena::status::add(
            ctx.registry.get_mut(hero).unwrap(),
            crate::games::arena::status::stun(4_000.0, now, None),
        );
        ctx.now = now + 1_000.0;
        let line = selected_summary(&game).to_string();
        assert!(line.contains("stun 3s"), "{line}");
    }
}
