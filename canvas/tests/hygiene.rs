//! Source hygiene for the code that ships to the browser.
//!
//! The engine and the wire codec run inside a wasm module with no logger and
//! no panic hook, so a panic kills the page and a dropped error is invisible.
//! Each rule below scans the non-test sources of `canvas/src` and
//! `wire/src` and fails if its hit count rises above the budget. Budgets
//! only go down.

use std::fs;
use std::path::{Path, PathBuf};

const SOURCE_ROOTS: &[&str] = &["src", "../wire/src"];

struct Rule {
    name: &'static str,
    patterns: &'static [&'static str],
    budget: usize,
}

const PANICS: Rule = Rule {
    name: "panic paths",
    patterns: &[".unwrap()", ".expect(", "panic!(", "unreachable!(", "todo!(", "unimplemented!("],
    budget: 0,
};

const DISCARDS: Rule = Rule {
    name: "discarded errors",
    patterns: &["let _ =", ".ok()", "Err(_) ="],
    budget: 0,
};

// `device_pixels` is the one sanctioned float-to-integer conversion.
const NUMERIC_CASTS: Rule = Rule {
    name: "numeric `as` casts",
    patterns: &[
        " as u8", " as u16", " as u32", " as u64", " as usize", " as i8", " as i16", " as i32", " as i64",
        " as isize", " as f32", " as f64",
    ],
    budget: 1,
};

const PRINTS: Rule = Rule { name: "stdout/stderr output", patterns: &["println!(", "eprintln!(", "dbg!("], budget: 0 };

const DEAD_CODE: Rule = Rule { name: "#[allow(dead_code)]", patterns: &["allow(dead_code)"], budget: 0 };

struct SourceFile {
    path: PathBuf,
    content: String,
}

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    for root in SOURCE_ROOTS {
        collect(Path::new(root), &mut files);
    }
    assert!(!files.is_empty(), "no sources found under {SOURCE_ROOTS:?}");
    files
}

fn collect(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect(&path, out);
            continue;
        }
        let is_rs = path.extension().is_some_and(|e| e == "rs");
        let is_test = path.to_string_lossy().ends_with("_test.rs");
        if is_rs && !is_test {
            if let Ok(content) = fs::read_to_string(&path) {
                out.push(SourceFile { path, content });
            }
        }
    }
}

/// Code lines only; `//` and `///` comments may name the patterns freely.
fn code_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(idx, line)| (idx + 1, line))
}

fn hits(files: &[SourceFile], rule: &Rule) -> Vec<String> {
    let mut found = Vec::new();
    for file in files {
        for (lineno, line) in code_lines(&file.content) {
            if rule.patterns.iter().any(|p| line.contains(p)) {
                found.push(format!("  {}:{lineno}: {}", file.path.display(), line.trim()));
            }
        }
    }
    found
}

fn check(rule: &Rule) {
    let found = hits(&source_files(), rule);
    assert!(
        found.len() <= rule.budget,
        "{} budget exceeded: found {}, max {}.\n{}",
        rule.name,
        found.len(),
        rule.budget,
        found.join("\n")
    );
}

#[test]
fn panic_budget() {
    check(&PANICS);
}

#[test]
fn discard_budget() {
    check(&DISCARDS);
}

#[test]
fn numeric_cast_budget() {
    check(&NUMERIC_CASTS);
}

#[test]
fn print_budget() {
    check(&PRINTS);
}

#[test]
fn dead_code_budget() {
    check(&DEAD_CODE);
}

#[test]
fn discard_rule_flags_wildcard_error_arms() {
    let file = SourceFile {
        path: PathBuf::from("sample.rs"),
        content: "match r {\n    Ok(v) => v,\n    Err(_) => None,\n}\n// Err(_) => in a comment\n".to_owned(),
    };
    let found = hits(&[file], &DISCARDS);
    assert_eq!(found, vec!["  sample.rs:3: Err(_) => None,".to_owned()]);
}
