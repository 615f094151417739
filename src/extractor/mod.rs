//! Code extractor - turn raw model output into a single executable script.
//!
//! This is the component most prone to silent data corruption (wrong scene
//! picked, truncated code), so every ambiguity is an explicit error rather
//! than a best guess.

use crate::error::{ExtractionErrorKind, Result, SceneforgeError};

/// Modules the generated script must not touch. Lines mentioning any of
/// these are dropped during sanitization.
const DANGEROUS_PATTERNS: &[&str] = &[
    "subprocess",
    "os.system",
    "eval(",
    "exec(",
    "__import__",
    "importlib",
    "shutil.rmtree",
];

/// Extract the scene script from raw model output.
///
/// Fenced code regions are located first. With no fences, the entire output
/// is accepted only when it carries a recognizable scene-class marker.
/// With multiple fences, only regions that look like the target scripting
/// language are kept, and more than one top-level scene class across them is
/// an error - it would be ambiguous which is the true entry point. Narrative
/// text outside fences is always discarded.
pub fn extract(raw: &str) -> Result<String> {
    let regions = fenced_regions(raw);

    let script = if regions.is_empty() {
        // Tolerant fallback: whole output, but only when it plainly is a script
        if scene_classes(raw).is_empty() {
            return Err(SceneforgeError::Extraction(ExtractionErrorKind::NoCodeBlock));
        }
        raw.trim().to_string()
    } else {
        let kept: Vec<&str> = regions
            .iter()
            .map(String::as_str)
            .filter(|r| looks_like_script(r))
            .collect();
        if kept.is_empty() {
            return Err(SceneforgeError::Extraction(ExtractionErrorKind::NoCodeBlock));
        }
        kept.join("\n\n").trim().to_string()
    };

    if script.is_empty() {
        return Err(SceneforgeError::Extraction(ExtractionErrorKind::EmptyScript));
    }

    if scene_classes(&script).len() > 1 {
        return Err(SceneforgeError::Extraction(ExtractionErrorKind::MultipleScenes));
    }

    Ok(script)
}

/// Sanitize a script before execution: drop lines touching dangerous
/// modules, and prepend the manim import when none is present.
pub fn sanitize(code: &str) -> String {
    let mut cleaned: String = code
        .lines()
        .filter(|line| !DANGEROUS_PATTERNS.iter().any(|p| line.contains(p)))
        .collect::<Vec<_>>()
        .join("\n");

    if !cleaned.contains("from manim import") && !cleaned.contains("import manim") {
        cleaned = format!("from manim import *\n\n{}", cleaned);
    }

    cleaned
}

/// Name of the single scene class, if the script has exactly one.
pub fn scene_name(code: &str) -> Option<String> {
    let classes = scene_classes(code);
    match classes.as_slice() {
        [single] => Some(single.clone()),
        _ => None,
    }
}

/// Collect contents of fenced code regions, in order. The info string after
/// the opening fence (e.g. "python") is discarded.
fn fenced_regions(raw: &str) -> Vec<String> {
    let mut regions = Vec::new();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        if line.trim_start().starts_with("```") {
            match current.take() {
                Some(region) => regions.push(region),
                None => current = Some(String::new()),
            }
            continue;
        }
        if let Some(region) = current.as_mut() {
            region.push_str(line);
            region.push('\n');
        }
    }

    // An unterminated fence still counts as a region
    if let Some(region) = current {
        regions.push(region);
    }

    regions
}

/// Heuristic check that a fenced region is script code rather than prose or
/// a JSON/shell snippet the model added alongside it.
fn looks_like_script(region: &str) -> bool {
    region.lines().any(|line| {
        let trimmed = line.trim_start();
        trimmed.starts_with("import ")
            || trimmed.starts_with("from ")
            || trimmed.starts_with("class ")
            || trimmed.starts_with("def ")
            || trimmed.starts_with("self.")
    })
}

/// Find top-level scene class names: unindented `class X(...)` lines whose
/// base list mentions Scene.
fn scene_classes(code: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in code.lines() {
        if !line.starts_with("class ") {
            continue;
        }
        let rest = &line["class ".len()..];
        let Some(paren) = rest.find('(') else { continue };
        let name = rest[..paren].trim();
        let Some(close) = rest.find(')') else { continue };
        if close <= paren {
            continue;
        }
        let bases = &rest[paren + 1..close];
        let mentions_scene = bases
            .split(',')
            .any(|base| base.trim().split('.').next_back().unwrap_or("").ends_with("Scene"));
        if mentions_scene && !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            names.push(name.to_string());
        }
    }
    names
}
