//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::Value;
use std::path::PathBuf;

/// Load configuration with the following precedence (highest first):
/// 1) `ARENA_DUEL_CONFIG_JSON` env var containing raw JSON
/// 2) File pointed by `ARENA_DUEL_CONFIG_PATH` env var
/// 3) config.json in current working directory
/// 4) config.json next to the executable (application directory)
/// 5) Defaults compiled into the binary
///
/// Additionally, individual fields can be overridden by environment
/// variables with prefix `ARENA_DUEL` using "__" as a nested separator,
/// e.g. `ARENA_DUEL__PORT=8080` or `ARENA_DUEL__SERVER__TICK_MS=50`.
/// Any errors while reading/parsing are printed to stderr and defaults are
/// used.
///
/// **Note:** Validation errors from [`validate_config`] are logged to
/// stderr but are *not* propagated; `load()` always returns a `Config`.
/// Callers who need hard failure call `validate_config()` on the returned
/// config themselves (main.rs does).
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    for source in document_sources() {
        if let Some(value) = source.read() {
            merge_values(&mut merged, value);
        }
    }

    // Environment overrides with prefix ARENA_DUEL and nested separator __
    for (key, raw_value) in std::env::vars() {
        let Some(stripped) = key.strip_prefix("ARENA_DUEL__") else {
            continue;
        };
        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if segments.is_empty() {
            continue;
        }
        set_nested_value(&mut merged, &segments, parse_env_value(&raw_value));
    }

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    // Intentional warn-only behaviour; main.rs calls validate_config()
    // again and propagates errors properly.
    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

enum DocumentSource {
    InlineEnv(&'static str),
    File(PathBuf),
}

impl DocumentSource {
    fn read(&self) -> Option<Value> {
        match self {
            DocumentSource::InlineEnv(var) => {
                let raw = std::env::var(var).ok()?;
                parse_json_document(&raw, var)
            }
            DocumentSource::File(path) => {
                if path.as_os_str().is_empty() || !path.exists() {
                    return None;
                }
                match std::fs::read_to_string(path) {
                    Ok(contents) => {
                        parse_json_document(&contents, &format!("file {}", path.display()))
                    }
                    Err(err) => {
                        eprintln!("Failed to read config from {}: {}", path.display(), err);
                        None
                    }
                }
            }
        }
    }
}

/// Document sources in ascending precedence order (later sources win on a
/// per-field basis because they merge over earlier ones).
fn document_sources() -> Vec<DocumentSource> {
    let mut sources = Vec::new();
    sources.push(DocumentSource::InlineEnv("ARENA_DUEL_CONFIG_JSON"));
    if let Ok(path) = std::env::var("ARENA_DUEL_CONFIG_PATH") {
        sources.push(DocumentSource::File(PathBuf::from(path)));
    }
    sources.push(DocumentSource::File(PathBuf::from("config.json")));
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            sources.push(DocumentSource::File(exe_dir.join("config.json")));
        }
    }
    sources
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            *target_slot = source_value;
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        let items = trimmed
            .split(',')
            .map(|segment| parse_scalar(segment.trim()))
            .collect::<Vec<_>>();
        return Value::Array(items);
    }

    parse_scalar(trimmed)
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Walk (and create) the object path named by `segments`, then assign.
fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    if segments.is_empty() {
        return;
    }
    let mut cursor = target;
    for segment in &segments[..segments.len() - 1] {
        let map = ensure_object(cursor);
        cursor = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }

    let map = ensure_object(cursor);
    if let Some(last) = segments.last() {
        map.insert(last.clone(), value);
    }
}

fn ensure_object(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(serde_json::Map::new());
    }

    // SAFETY: The branch above guarantees `value` is a `Value::Object`, so
    // `as_object_mut()` will always return `Some`.
    #[allow(clippy::expect_used)]
    value
        .as_object_mut()
        .expect("value should be coerced into an object")
}
