//! Standard paths used by Tomate

use std::path::PathBuf;

/// Environment variable that relocates both data and config under one root
pub const HOME_ENV: &str = "TOMATE_HOME";

/// Standard Tomate paths
pub struct Paths {
    /// Data directory (~/.local/share/tomate)
    pub data: PathBuf,
    /// Config directory (~/.config/tomate)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        if let Some(root) = std::env::var_os(HOME_ENV) {
            return Self::under(PathBuf::from(root));
        }

        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("tomate");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("tomate");

        Self { data, config }
    }

    /// Lay out data and config beneath a single root directory
    pub fn under(root: PathBuf) -> Self {
        Self {
            data: root.join("data"),
            config: root.join("config"),
        }
    }

    /// Directory holding the persisted key-value store
    pub fn store(&self) -> PathBuf {
        self.data.join("store")
    }

    /// Path of the user configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_root_layout() {
        let paths = Paths::under(PathBuf::from("/tmp/tomate-root"));
        assert_eq!(paths.data, PathBuf::from("/tmp/tomate-root/data"));
        assert_eq!(paths.store(), PathBuf::from("/tmp/tomate-root/data/store"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/tomate-root/config/config.json")
        );
    }
}
