//! File configuration for CLI defaults.
//!
//! The file is a small TOML subset: `key = value` lines, `#` comments, quoted
//! strings, integers, and optional `[logging]` and `[sources]` sections.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Log levels accepted in `[logging] level`.
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Defaults read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    /// Default artifact and metadata directory for `harvest`.
    pub(crate) output_dir: Option<PathBuf>,
    /// Default worker count (1..=100).
    pub(crate) workers: Option<u8>,
    /// Default fetch attempts (1..=10).
    pub(crate) max_retries: Option<u8>,
    /// Default fixed delay between attempts, in seconds.
    pub(crate) retry_delay_secs: Option<u64>,
    /// HTTP connect timeout in seconds.
    pub(crate) connect_timeout_secs: Option<u64>,
    /// HTTP total request timeout in seconds.
    pub(crate) read_timeout_secs: Option<u64>,
    /// Default log level when neither `-v` nor `-q` is given.
    pub(crate) log_level: Option<String>,
    /// `[sources]` entries mapping a directory name to a source label, in
    /// file order.
    pub(crate) sources: Vec<(String, String)>,
}

impl FileConfig {
    /// Validates values against the CLI's accepted ranges.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(1..=100).contains(&workers)
        {
            bail!("Invalid config value for `workers`: {workers}. Expected range: 1..=100");
        }
        if let Some(max_retries) = self.max_retries
            && !(1..=10).contains(&max_retries)
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 1..=10");
        }
        if let Some(delay) = self.retry_delay_secs
            && delay > 3600
        {
            bail!("Invalid config value for `retry_delay_secs`: {delay}. Expected range: 0..=3600");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(level) = &self.log_level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "Invalid config value for `logging.level`: '{level}'. Expected one of: {}",
                LOG_LEVELS.join(", ")
            );
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional: when absent,
/// `Ok(None)` is returned.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }

    match resolve_default_config_path() {
        Some(path) if path.is_file() => read_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    let mut section = String::new();

    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim();
            if !matches!(name, "logging" | "sources") {
                bail!("Unknown configuration section: '[{name}]' on line {line_number}");
            }
            section = name.to_string();
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = |field: &str| format!("Invalid `{field}` value on line {line_number}");

        match (section.as_str(), key) {
            ("", "output_dir") => {
                let parsed = parse_string_literal(value).with_context(|| invalid(key))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            ("", "workers") => {
                cfg.workers = Some(parse_integer_u8(value).with_context(|| invalid(key))?);
            }
            ("", "max_retries") => {
                cfg.max_retries = Some(parse_integer_u8(value).with_context(|| invalid(key))?);
            }
            ("", "retry_delay_secs") => {
                cfg.retry_delay_secs =
                    Some(parse_integer_u64(value).with_context(|| invalid(key))?);
            }
            ("", "connect_timeout_secs") => {
                cfg.connect_timeout_secs =
                    Some(parse_integer_u64(value).with_context(|| invalid(key))?);
            }
            ("", "read_timeout_secs") => {
                cfg.read_timeout_secs =
                    Some(parse_integer_u64(value).with_context(|| invalid(key))?);
            }
            ("logging", "level") => {
                let parsed =
                    parse_string_literal(value).with_context(|| invalid("logging.level"))?;
                cfg.log_level = Some(parsed.to_ascii_lowercase());
            }
            ("sources", segment) => {
                let label = parse_string_literal(value)
                    .with_context(|| invalid(&format!("sources.{segment}")))?;
                cfg.sources.push((segment.to_string(), label));
            }
            (_, unknown) => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }

    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
