//! Environment-driven overrides applied onto the merged configuration.

use serde_json::Value;

use crate::config::Config;
use crate::env;
use crate::error::ConfigError;

/// Settings overridable from the environment.
///
/// `parse` pushes explicitly-set environment values onto the merged
/// [`Config`] (environment wins over files) and then reads the effective
/// values back, so the parsed flags always reflect the final merge.
/// `BV_API_DEBUG`/`BV_API_PATH` land in the api-surface section; debug mode
/// (or `BV_LOG=debug`) forces surface request logging on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    /// Debug mode (`BV_DEBUG`).
    pub debug: bool,
    /// Log mode (`BV_LOG`): `default`, `verbose`, `quiet` or `debug`.
    pub log_mode: String,
    /// Robot name (`BOTVISOR`).
    pub name: String,
    /// Profile name (`BV_PROFILE`).
    pub profile: String,
    /// Mount the robot's request surface onto the api server (`BV_API`).
    pub api_enable: bool,
    /// Api server listen address (`BV_API_ADDR`).
    pub api_addr: String,
    /// Api server listen port (`BV_API_PORT`).
    pub api_port: u16,
    /// Console enable (`BV_CONSOLE`).
    pub console_enable: bool,
    /// Console listen address (`BV_CONSOLE_ADDR`).
    pub console_addr: String,
    /// Console listen port (`BV_CONSOLE_PORT`).
    pub console_port: u16,
}

/// Returns true when the key is explicitly present in the process
/// environment, as opposed to resolving through the defaults table.
fn env_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}

impl Flags {
    /// Creates flags resolved purely from the environment and defaults,
    /// before any configuration merge.
    pub fn from_env() -> Self {
        Self {
            debug: env::get_bool("BV_DEBUG"),
            log_mode: env::get("BV_LOG"),
            name: env::get("BOTVISOR"),
            profile: env::get("BV_PROFILE"),
            api_enable: env::get_bool("BV_API"),
            api_addr: env::get("BV_API_ADDR"),
            api_port: env::get_u16("BV_API_PORT"),
            console_enable: env::get_bool("BV_CONSOLE"),
            console_addr: env::get("BV_CONSOLE_ADDR"),
            console_port: env::get_u16("BV_CONSOLE_PORT"),
        }
    }

    /// Applies environment overrides onto `config` and re-reads the
    /// effective values into this struct.
    ///
    /// Only keys explicitly set in the environment override the merged
    /// file values; everything else flows file → flags.
    pub fn parse(&mut self, config: &mut Config) -> Result<(), ConfigError> {
        if env_set("BOTVISOR") {
            config.set("master", "name", Value::String(env::get("BOTVISOR")));
        }
        if env_set("BV_API") {
            config.set("api", "enable", Value::Bool(env::get_bool("BV_API")));
        }
        if env_set("BV_API_ADDR") {
            config.set("api", "addr", Value::String(env::get("BV_API_ADDR")));
        }
        if env_set("BV_API_PORT") {
            config.set("api", "port", Value::from(env::get_u16("BV_API_PORT")));
        }
        if env_set("BV_CONSOLE") {
            config.set("console", "enable", Value::Bool(env::get_bool("BV_CONSOLE")));
        }
        if env_set("BV_CONSOLE_ADDR") {
            config.set(
                "console",
                "addr",
                Value::String(env::get("BV_CONSOLE_ADDR")),
            );
        }
        if env_set("BV_CONSOLE_PORT") {
            config.set(
                "console",
                "port",
                Value::from(env::get_u16("BV_CONSOLE_PORT")),
            );
        }

        self.debug = env::get_bool("BV_DEBUG");
        self.log_mode = env::get("BV_LOG");
        self.profile = env::get("BV_PROFILE");

        let mut surface = config.api_surface()?;
        if env_set("BV_API_DEBUG") {
            surface.debug = env::get_bool("BV_API_DEBUG");
        }
        if env_set("BV_API_PATH") {
            surface.path = env::get("BV_API_PATH");
        }
        // debug mode turns on surface request logging everywhere
        if self.debug || self.log_mode == "debug" {
            surface.debug = true;
        }
        config.set(
            "master",
            "api",
            serde_json::to_value(&surface).unwrap_or(Value::Null),
        );

        let master = config.master()?;
        let server = config.server()?;
        let console = config.console()?;
        self.name = master.name;
        self.api_enable = server.enable;
        self.api_addr = server.addr;
        self.api_port = server.port;
        self.console_enable = console.enable;
        self.console_addr = console.addr;
        self.console_port = console.port;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reads_effective_config() {
        let mut cfg = Config::defaults();
        cfg.set("master", "name", Value::String("botA".into()));
        cfg.set("console", "port", Value::from(7500u64));

        let mut flags = Flags::from_env();
        flags.parse(&mut cfg).expect("parse");
        assert_eq!(flags.name, "botA");
        assert_eq!(flags.console_port, 7500);
        assert!(flags.api_enable);
    }

    #[test]
    fn test_surface_env_overrides() {
        std::env::set_var("BV_API_DEBUG", "true");
        std::env::set_var("BV_API_PATH", "/bot");
        let mut cfg = Config::defaults();
        let mut flags = Flags::from_env();
        flags.parse(&mut cfg).expect("parse");

        let surface = cfg.api_surface().expect("surface");
        assert!(surface.debug);
        assert_eq!(surface.path, "/bot");
        std::env::remove_var("BV_API_DEBUG");
        std::env::remove_var("BV_API_PATH");
    }

    #[test]
    fn test_debug_log_mode_forces_surface_debug() {
        std::env::set_var("BV_LOG", "debug");
        let mut cfg = Config::defaults();
        let mut flags = Flags::from_env();
        flags.parse(&mut cfg).expect("parse");

        assert_eq!(flags.log_mode, "debug");
        assert!(cfg.api_surface().expect("surface").debug);
        std::env::remove_var("BV_LOG");
    }

    #[test]
    fn test_env_override_wins_over_file() {
        std::env::set_var("BV_API_PORT", "8123");
        let mut cfg = Config::defaults();
        cfg.set("api", "port", Value::from(7000u64));

        let mut flags = Flags::from_env();
        flags.parse(&mut cfg).expect("parse");
        assert_eq!(flags.api_port, 8123);
        assert_eq!(cfg.get_uint("api", "port"), Some(8123));
        std::env::remove_var("BV_API_PORT");
    }
}
