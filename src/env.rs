//! Typed lookups over the process environment with built-in defaults.
//!
//! Every setting the flags layer can override has an entry in [`DEFAULTS`],
//! so `get` always returns something usable. Parse failures on typed getters
//! are logged and fall back to the zero value rather than aborting startup.

/// Default values for every environment setting the runtime consults.
///
/// A key missing from both the process environment and this table resolves
/// to the empty string.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("BOTVISOR", "botvisor"),
    ("BV_PROFILE", "default"),
    ("BV_LOG", "default"),
    ("BV_DEBUG", "false"),
    ("BV_API", "true"),
    ("BV_API_DEBUG", "false"),
    ("BV_API_PATH", "/api"),
    ("BV_API_ADDR", "127.0.0.1"),
    ("BV_API_PORT", "6490"),
    ("BV_CONSOLE", "true"),
    ("BV_CONSOLE_ADDR", "127.0.0.1"),
    ("BV_CONSOLE_PORT", "6492"),
];

fn default_for(key: &str) -> &'static str {
    DEFAULTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or("")
}

/// Returns the value for `key` from the process environment, falling back to
/// the defaults table.
pub fn get(key: &str) -> String {
    match std::env::var(key) {
        Ok(v) => v,
        Err(_) => default_for(key).to_string(),
    }
}

/// Returns the bool value for `key`.
///
/// A parse failure is logged and resolves to `false`.
pub fn get_bool(key: &str) -> bool {
    let raw = get(key);
    match raw.parse::<bool>() {
        Ok(v) => v,
        Err(err) => {
            log::error!("env parse bool {key}={raw:?}: {err}");
            false
        }
    }
}

/// Returns the u16 value for `key` (ports).
///
/// A parse failure is logged and resolves to `0`.
pub fn get_u16(key: &str) -> u16 {
    let raw = get(key);
    match raw.parse::<u16>() {
        Ok(v) => v,
        Err(err) => {
            log::error!("env parse u16 {key}={raw:?}: {err}");
            0
        }
    }
}
