//! Named configuration profiles and their layered lookup paths.

use std::path::{Path, PathBuf};

/// A named profile resolving where configuration files live.
///
/// Lookup is layered: the system dir, the per-user config dir, then the
/// dist dir, each first as a shared file and then as a per-profile file.
/// Later entries in [`Profile::config_files`] override earlier ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Profile name (e.g. `"default"`).
    pub name: String,
    /// Configuration file name inside each directory.
    pub config_filename: String,
    /// Per-user configuration directory.
    pub config_dir: PathBuf,
    /// Local-system configuration directory.
    pub config_sys_dir: PathBuf,
    /// Distribution configuration directory.
    pub config_dist_dir: PathBuf,
}

impl Profile {
    /// Creates a profile with default lookup directories.
    ///
    /// The per-user dir resolves through the platform config dir
    /// (`~/.config/botvisor` on Linux), falling back to `./.botvisor/config`
    /// when the platform dir is unavailable.
    pub fn new(name: impl Into<String>) -> Self {
        let config_dir = dirs::config_dir()
            .map(|d| d.join("botvisor"))
            .unwrap_or_else(|| PathBuf::from("./.botvisor/config"));
        Self {
            name: name.into(),
            config_filename: "config.json".to_string(),
            config_dir,
            config_sys_dir: PathBuf::from("/usr/local/etc/botvisor"),
            config_dist_dir: PathBuf::from("/etc/botvisor"),
        }
    }

    /// Returns every candidate configuration file, in merge order.
    ///
    /// For each directory the shared file comes before the per-profile one,
    /// so profile settings override shared settings from the same layer.
    pub fn config_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(6);
        for dir in [&self.config_sys_dir, &self.config_dir, &self.config_dist_dir] {
            files.push(dir.join(&self.config_filename));
            files.push(dir.join(&self.name).join(&self.config_filename));
        }
        files
    }

    /// Returns the file configuration updates are written to: the
    /// per-profile file under the per-user config dir.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(&self.name).join(&self.config_filename)
    }

    /// Returns a profile-relative directory path (e.g. the auth dir).
    pub fn path(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.config_dir.join(&self.name).join(sub)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(crate::env::get("BV_PROFILE"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_files_merge_order() {
        let mut p = Profile::new("alpha");
        p.config_dir = PathBuf::from("/u");
        p.config_sys_dir = PathBuf::from("/s");
        p.config_dist_dir = PathBuf::from("/d");

        let files = p.config_files();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/s/config.json"),
                PathBuf::from("/s/alpha/config.json"),
                PathBuf::from("/u/config.json"),
                PathBuf::from("/u/alpha/config.json"),
                PathBuf::from("/d/config.json"),
                PathBuf::from("/d/alpha/config.json"),
            ]
        );
    }

    #[test]
    fn test_profile_relative_path() {
        let mut p = Profile::new("alpha");
        p.config_dir = PathBuf::from("/u");
        assert_eq!(p.path("auth"), PathBuf::from("/u/alpha/auth"));
        assert_eq!(p.config_file(), PathBuf::from("/u/alpha/config.json"));
    }
}
