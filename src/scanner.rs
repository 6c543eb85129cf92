use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub classes: Vec<String>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
}

/// Walks the working tree (respecting .gitignore) and collects class
/// candidates from every file matching `patterns` and not `ignore_patterns`.
pub fn scan_globs_with_ignore(
    patterns: &[String],
    ignore_patterns: &[String],
) -> Result<ScanResult, ScanError> {
    scan_globs_in(Path::new("."), patterns, ignore_patterns)
}

pub fn scan_globs_in(
    base_path: &Path,
    patterns: &[String],
    ignore_patterns: &[String],
) -> Result<ScanResult, ScanError> {
    if patterns.is_empty() {
        return Err(ScanError {
            message: "scan requires at least one content pattern".to_string(),
        });
    }

    let globset = build_globset(patterns)?;
    let ignore_set = build_globset(ignore_patterns)?;
    let mut paths = Vec::new();

    let mut builder = WalkBuilder::new(base_path);
    builder.hidden(false).git_ignore(true).git_exclude(true);

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let relative_path = path.strip_prefix(base_path).unwrap_or(path);
        if !globset.is_match(relative_path) && !globset.is_match(path) {
            continue;
        }
        if ignore_set.is_match(relative_path) || ignore_set.is_match(path) {
            continue;
        }
        if should_skip_file(path) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    Ok(scan_files(&paths))
}

fn scan_files(paths: &[PathBuf]) -> ScanResult {
    let mut classes = Vec::new();
    let mut seen = HashSet::new();
    let mut files_scanned = 0;

    for path in paths {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        files_scanned += 1;
        for class in extract_classes(&text) {
            if seen.insert(class.clone()) {
                classes.push(class);
            }
        }
    }

    ScanResult {
        classes,
        files_scanned,
    }
}

fn should_skip_file(path: &Path) -> bool {
    if path
        .components()
        .any(|component| component.as_os_str() == "node_modules")
    {
        return true;
    }

    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase());
    matches!(
        ext.as_deref(),
        Some(
            "css"
                | "png"
                | "jpg"
                | "jpeg"
                | "gif"
                | "webp"
                | "ico"
                | "woff"
                | "woff2"
                | "ttf"
                | "otf"
                | "zip"
                | "gz"
                | "pdf"
        )
    )
}

/// Class candidates found inside quoted strings (which covers markup
/// attributes and script literals alike).
pub fn extract_classes(text: &str) -> Vec<String> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for literal in quoted_strings(text) {
        for token in literal.split_whitespace() {
            if is_valid_candidate(token) && seen.insert(token.to_string()) {
                results.push(token.to_string());
            }
        }
    }

    results
}

fn quoted_strings(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut chars = text.char_indices();

    while let Some((idx, ch)) = chars.next() {
        if !matches!(ch, '"' | '\'' | '`') {
            continue;
        }
        let start = idx + ch.len_utf8();
        let mut end = None;
        let mut escaped = false;
        for (inner_idx, inner) in chars.by_ref() {
            if escaped {
                escaped = false;
                continue;
            }
            if inner == '\\' {
                escaped = true;
                continue;
            }
            if inner == ch {
                end = Some(inner_idx);
                break;
            }
        }
        match end {
            Some(end) if end > start => out.push(&text[start..end]),
            Some(_) => {}
            None => break,
        }
    }

    out
}

fn is_valid_candidate(token: &str) -> bool {
    if token.is_empty() || token.starts_with(['-', '/', ':', '.']) || token.ends_with(':') {
        return false;
    }
    let mut has_letter = false;
    for ch in token.chars() {
        if ch.is_ascii_alphabetic() {
            has_letter = true;
        } else if !(ch.is_ascii_digit() || matches!(ch, '-' | '/' | ':' | '.' | '_')) {
            return false;
        }
    }
    has_letter
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| ScanError {
            message: format!("invalid glob pattern '{}': {}", pattern, err),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| ScanError {
        message: format!("failed to build glob set: {}", err),
    })
}
