// SPDX-FileCopyrightText: 2026 SmartRAG Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./smartrag.toml` > `~/.config/smartrag/smartrag.toml` > `/etc/smartrag/smartrag.toml`
//! with environment variable overrides via `SMARTRAG_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SmartRagConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/smartrag/smartrag.toml` (system-wide)
/// 3. `~/.config/smartrag/smartrag.toml` (user XDG config)
/// 4. `./smartrag.toml` (local directory)
/// 5. `SMARTRAG_*` environment variables
pub fn load_config() -> Result<SmartRagConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SmartRagConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SmartRagConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
///
/// The file must exist. Relative paths resolve against the working directory
/// only; parent directories are not searched.
pub fn load_config_from_path(path: &Path) -> Result<SmartRagConfig, figment::Error> {
    if !path.is_file() {
        return Err(figment::Error::from(format!(
            "config file `{}` does not exist",
            path.display()
        )));
    }

    Figment::new()
        .merge(Serialized::defaults(SmartRagConfig::default()))
        .merge(Toml::file_exact(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SmartRagConfig::default()))
        .merge(Toml::file("/etc/smartrag/smartrag.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("smartrag/smartrag.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("smartrag.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `SMARTRAG_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `SMARTRAG_STREAM_MAX_RETRIES` must become `stream.max_retries`.
fn env_provider() -> Env {
    Env::prefixed("SMARTRAG_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["client", "server", "stream", "auth"]
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
