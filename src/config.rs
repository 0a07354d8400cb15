//! Engine startup configuration, read from the environment with
//! defaults, per §10.3. Collected once at startup so tests can build an
//! `EngineConfig` directly instead of depending on the process
//! environment.
//!
//! Austin Shafer - 2020

use std::env;

/// Parameters the engine needs before it can call `initialize`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name to publish the listening socket under, e.g. `wayland-0`.
    pub socket_name: String,
    /// Watchdog timer period, in milliseconds (§4.1/§9). `None` disables
    /// the timer entirely.
    pub watchdog_period_ms: Option<u64>,
    /// xkb keymap selection (§4.6).
    pub xkb_rules: String,
    pub xkb_model: String,
    pub xkb_layout: String,
    pub xkb_variant: String,
    pub xkb_options: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            socket_name: "wayland-0".to_string(),
            watchdog_period_ms: Some(60),
            xkb_rules: "evdev".to_string(),
            xkb_model: "pc105".to_string(),
            xkb_layout: "us".to_string(),
            xkb_variant: String::new(),
            xkb_options: String::new(),
        }
    }
}

impl EngineConfig {
    /// Build a config by layering environment variables over the
    /// defaults. Never fails: a malformed value just falls back.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();

        EngineConfig {
            socket_name: env::var("WAYFRONT_SOCKET").unwrap_or(defaults.socket_name),
            watchdog_period_ms: match env::var("WAYFRONT_WATCHDOG_MS") {
                Ok(v) if v == "0" || v.eq_ignore_ascii_case("off") => None,
                Ok(v) => v.parse().ok().or(defaults.watchdog_period_ms),
                Err(_) => defaults.watchdog_period_ms,
            },
            xkb_rules: env::var("WAYFRONT_XKB_RULES").unwrap_or(defaults.xkb_rules),
            xkb_model: env::var("WAYFRONT_XKB_MODEL").unwrap_or(defaults.xkb_model),
            xkb_layout: env::var("WAYFRONT_XKB_LAYOUT").unwrap_or(defaults.xkb_layout),
            xkb_variant: env::var("WAYFRONT_XKB_VARIANT").unwrap_or(defaults.xkb_variant),
            xkb_options: env::var("WAYFRONT_XKB_OPTIONS").unwrap_or(defaults.xkb_options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.socket_name, "wayland-0");
        assert_eq!(cfg.watchdog_period_ms, Some(60));
    }
}
