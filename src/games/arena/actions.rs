//! Semantic action IDs for arena click targets.
//!
//! Registered during render and dispatched through `InputEvent::Click`.

// ── Panel tabs (base + Panel index) ─────────────────────────────
pub const TAB_BASE: u16 = 10;

// ── Skill slots of the selected character (base + slot) ─────────
pub const CAST_SKILL_BASE: u16 = 100;

// ── Rows of the active panel (base + row index) ─────────────────
pub const PANEL_ROW_BASE: u16 = 200;

// ── Misc ────────────────────────────────────────────────────────
pub const NEXT_CHARACTER: u16 = 900;
pub const BENCH_SELECTED: u16 = 901;
pub const TOGGLE_SELL_MODE: u16 = 902;
