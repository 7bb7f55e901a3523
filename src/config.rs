use envconfig::Envconfig;
use log::debug;

#[derive(Envconfig, Clone)]
pub struct ModelerConfig {
    #[envconfig(from = "MODELER_LOCALE", default = "en_US")]
    pub locale: String,

    /// Comma-separated list of publish targets.
    #[envconfig(from = "MODELER_SERVER_NAMES", default = "")]
    pub server_names: String,

    #[envconfig(from = "MODELER_SNAPSHOT_PATH", default = "snapshot.json")]
    pub snapshot_path: String,

    #[envconfig(from = "MODELER_REFRESH", default = "false")]
    pub refresh: bool,
}

impl ModelerConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "ModelerConfig loaded: locale={}, server_names={}, snapshot_path={}, refresh={}",
            config.locale, config.server_names, config.snapshot_path, config.refresh
        );
        Ok(config)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.server_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for ModelerConfig {
    fn default() -> Self {
        ModelerConfig {
            locale: crate::schema::DEFAULT_LOCALE.to_string(),
            server_names: String::new(),
            snapshot_path: "snapshot.json".to_string(),
            refresh: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::collections::HashMap;

    #[rstest]
    #[case::empty("", vec![])]
    #[case::single("local", vec!["local"])]
    #[case::trims_and_skips_blanks(" prod , ,staging", vec!["prod", "staging"])]
    fn test_server_names(#[case] raw: &str, #[case] expected: Vec<&str>) {
        let config = ModelerConfig {
            server_names: raw.to_string(),
            ..ModelerConfig::default()
        };
        assert_eq!(config.server_names(), expected);
    }

    #[test]
    fn test_defaults_from_empty_env() {
        let config = ModelerConfig::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.locale, "en_US");
        assert_eq!(config.snapshot_path, "snapshot.json");
        assert!(!config.refresh);
        assert!(config.server_names().is_empty());
    }

    #[test]
    fn test_values_from_env_map() {
        let mut env = HashMap::new();
        env.insert("MODELER_LOCALE".to_string(), "de_DE".to_string());
        env.insert("MODELER_REFRESH".to_string(), "true".to_string());
        let config = ModelerConfig::init_from_hashmap(&env).unwrap();
        assert_eq!(config.locale, "de_DE");
        assert!(config.refresh);
    }
}
