mod games;
mod input;
mod logging;
mod time;
mod widgets;

use std::{cell::RefCell, io, rc::Rc};

use games::arena::ArenaGame;
use games::Game;
use input::{pixel_x_to_col, pixel_y_to_row, ClickState, InputEvent};
use ratzilla::event::{KeyCode, MouseButton, MouseEventKind};
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};
use time::{BrowserClock, Clock};
use tracing::{debug, info, Level};

/// Query the grid container's bounding rect and convert a pixel position to
/// a terminal cell.
fn dom_pixel_to_cell(mouse_x: u32, mouse_y: u32, cs: &ClickState) -> Option<(u16, u16)> {
    let window = web_sys::window()?;
    let document = window.document()?;

    // DomBackend creates a <div> as the grid container inside <body>.
    let grid = document.query_selector("body > div").ok()??;
    let rect = grid.get_bounding_client_rect();

    let col = pixel_x_to_col(mouse_x as f64 - rect.left(), rect.width(), cs.terminal_cols)?;
    let row = pixel_y_to_row(mouse_y as f64 - rect.top(), rect.height(), cs.terminal_rows)?;
    debug!(mouse_x, mouse_y, col, row, targets = cs.targets.len(), "click");
    Some((col, row))
}

#[cfg(target_arch = "wasm32")]
fn boot(seed: u64, now: f64) -> ArenaGame {
    ArenaGame::load_or_new(seed, now)
}

#[cfg(not(target_arch = "wasm32"))]
fn boot(seed: u64, _now: f64) -> ArenaGame {
    ArenaGame::new(seed)
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();
    logging::init(Level::INFO);

    let now = BrowserClock.now_ms();
    let seed = (now as u64) ^ (js_sys::Math::random() * u32::MAX as f64) as u64;
    info!(seed, "booting idle arena");

    let game = Rc::new(RefCell::new(boot(seed, now)));
    let click_state = Rc::new(RefCell::new(ClickState::new()));
    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;

    // Mouse/touch click handler
    terminal.on_mouse_event({
        let game = game.clone();
        let click_state = click_state.clone();
        move |mouse_event| {
            if mouse_event.event != MouseEventKind::Pressed || mouse_event.button != MouseButton::Left {
                return;
            }
            let cs = click_state.borrow();
            if cs.terminal_rows == 0 || cs.terminal_cols == 0 {
                return;
            }
            let Some((col, row)) = dom_pixel_to_cell(mouse_event.x, mouse_event.y, &cs) else {
                return;
            };
            let action = cs.hit_test(col, row);
            drop(cs);

            if let Some(action) = action {
                game.borrow_mut().handle_input(&InputEvent::Click(action));
            }
        }
    });

    // Keyboard handler
    terminal.on_key_event({
        let game = game.clone();
        move |key_event| {
            if let KeyCode::Char(c) = key_event.code {
                game.borrow_mut().handle_input(&InputEvent::Key(c));
            }
        }
    });

    terminal.draw_web({
        let click_state = click_state.clone();
        move |f| {
            game.borrow_mut().tick(&BrowserClock);

            let size = f.area();
            {
                let mut cs = click_state.borrow_mut();
                cs.terminal_cols = size.width;
                cs.terminal_rows = size.height;
                cs.clear_targets();
            }

            game.borrow().render(f, size, &click_state);
        }
    });

    Ok(())
}
