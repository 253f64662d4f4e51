use crate::config::{Cfg, WINDOW_MANAGER_NAME};
use crate::error::{Error, Result};

/// Read the user config, `$XDG_CONFIG_HOME/fluxway/fluxway.toml` with the
/// usual `$HOME/.config` fallback.
pub fn load_cfg(config_home: Option<&str>, home: Option<&str>) -> Result<Cfg> {
    if let Some(user_cfg_dir) = find_cfg_dir(config_home, home) {
        let path = format!("{user_cfg_dir}/{WINDOW_MANAGER_NAME}/{WINDOW_MANAGER_NAME}.toml");
        fluxway_utils::debug!("Attempting config read at {path}");
        let buf = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&buf)?)
    } else {
        Err(Error::ConfigDirFind)
    }
}

fn find_cfg_dir(xdg_config_home: Option<&str>, home: Option<&str>) -> Option<String> {
    xdg_config_home
        .map(ToString::to_string)
        .or_else(|| home.map(|dir| format!("{dir}/.config")))
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::path::PathBuf;

    use super::find_cfg_dir;
    use crate::config::{Cfg, WINDOW_MANAGER_NAME};

    #[test]
    fn will_read_environment_variables_to_find_config_falling_back() {
        assert!(find_cfg_dir(None, None).is_none());
        assert_eq!(
            Some("here/.config".to_string()),
            find_cfg_dir(None, Some("here"))
        );
        assert_eq!(
            Some("there".to_string()),
            find_cfg_dir(Some("there"), Some("here"))
        );
        assert_eq!(Some("there".to_string()), find_cfg_dir(Some("there"), None));
        assert!(find_cfg_dir(None, None).is_none());
    }

    #[test]
    fn can_deserialize_cfg() {
        read_cfg_from_root();
    }

    #[test]
    fn example_cfg_is_same_as_default() {
        let cfg = read_cfg_from_root();
        let default = Cfg::default();
        assert_eq!(cfg, default);
    }

    fn read_cfg_from_root() -> Cfg {
        let cfg_path = find_project_root().join(format!("{WINDOW_MANAGER_NAME}.toml"));
        let cfg = std::fs::read_to_string(cfg_path).unwrap();
        toml::from_str(&cfg).unwrap()
    }

    fn find_project_root() -> PathBuf {
        let mut dir = env::current_dir().unwrap();
        loop {
            if dir.join(format!("{WINDOW_MANAGER_NAME}.toml")).is_file() {
                return dir;
            }
            assert!(dir.pop(), "no {WINDOW_MANAGER_NAME}.toml above cwd");
        }
    }
}
