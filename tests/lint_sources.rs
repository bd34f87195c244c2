//! Source lints for the arena game.
//!
//! 1. The simulation core stays browser-free: only `save.rs` may touch
//!    `web_sys`/`js_sys`, so everything else runs under plain `cargo test`.
//! 2. Bracket-key hints like `[Q]` in a `render.rs` must come from
//!    `push_clickable()`; a plain `push()` renders a button nobody can tap.

use std::fs;
use std::path::{Path, PathBuf};

const BROWSER_CRATES: &[&str] = &["web_sys", "js_sys", "wasm_bindgen"];
const BROWSER_ALLOWED: &[&str] = &["save.rs"];

fn rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rust_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

fn code_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.starts_with("//"))
}

fn browser_uses(source: &str) -> Vec<(usize, String)> {
    code_lines(source)
        .filter(|(_, l)| BROWSER_CRATES.iter().any(|c| l.contains(&format!("{c}::"))))
        .map(|(n, l)| (n, l.to_string()))
        .collect()
}

fn contains_bracket_key(s: &str) -> bool {
    s.as_bytes().windows(3).any(|w| {
        w[0] == b'[' && w[2] == b']' && (w[1].is_ascii_alphanumeric() || b"-=!~".contains(&w[1]))
    })
}

fn unclickable_bracket_keys(source: &str) -> Vec<(usize, String)> {
    code_lines(source)
        .filter(|(_, l)| contains_bracket_key(l) && l.contains(".push(") && !l.contains("push_clickable("))
        .map(|(n, l)| (n, l.to_string()))
        .collect()
}

fn arena_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src/games/arena")
}

#[test]
fn arena_core_is_browser_free() {
    let mut files = Vec::new();
    rust_files(&arena_dir(), &mut files);
    assert!(!files.is_empty(), "no sources found under {}", arena_dir().display());

    let mut report = String::new();
    for path in files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if BROWSER_ALLOWED.contains(&name) {
            continue;
        }
        let source = fs::read_to_string(&path).unwrap_or_default();
        for (line, text) in browser_uses(&source) {
            report.push_str(&format!("  {}:{line}: {text}\n", path.display()));
        }
    }
    assert!(report.is_empty(), "browser APIs used outside save.rs:\n{report}");
}

#[test]
fn bracket_keys_are_clickable() {
    let mut files = Vec::new();
    rust_files(&Path::new(env!("CARGO_MANIFEST_DIR")).join("src/games"), &mut files);

    let mut report = String::new();
    for path in files.iter().filter(|p| p.ends_with("render.rs")) {
        let source = fs::read_to_string(path).unwrap_or_default();
        for (line, text) in unclickable_bracket_keys(&source) {
            report.push_str(&format!("  {}:{line}: {text}\n", path.display()));
        }
    }
    assert!(report.is_empty(), "bracket keys rendered via push():\n{report}");
}

#[test]
fn detectors() {
    assert!(contains_bracket_key("[Q] cast"));
    assert!(contains_bracket_key("[1]"));
    assert!(!contains_bracket_key("[]"));
    assert!(!contains_bracket_key("[QW]"));

    assert_eq!(unclickable_bracket_keys(r#"cl.push(Line::from("[I] items"));"#).len(), 1);
    assert!(unclickable_bracket_keys(r#"cl.push_clickable(Line::from("[I] items"), 3);"#).is_empty());
    assert!(unclickable_bracket_keys(r#"// cl.push(Line::from("[I]"));"#).is_empty());

    assert_eq!(browser_uses("let w = web_sys::window();").len(), 1);
    assert!(browser_uses("// js_sys::Date::now()").is_empty());
    assert!(browser_uses("let now = ctx.now;").is_empty());
}
