pub mod key_map;
pub mod mouse_map;

#[cfg(feature = "config-file")]
pub mod load_cfg;

use crate::cmd;
use crate::config::key_map::{
    keysym_from_name, KeyBinding, MOD_ALT, MOD_CTRL, MOD_LOGO, MOD_MOD2, MOD_MOD3, MOD_MOD5,
    MOD_SHIFT,
};
use crate::config::mouse_map::{MouseBinding, MouseContext, MouseEventKind};
use crate::error::{Error, Result};
use crate::geometry::place::{ColDir, PlacementStrategy, RowDir};
use crate::screen_config::{FocusConfig, ScreenConfig, TabsConfig};
use crate::state::view::DecorTheme;

/**
The name the compositor announces itself as. Also decides where
configuration is placed/read from.
 **/
pub const WINDOW_MANAGER_NAME: &str = "fluxway";

/**
Member cap per tab group, loosely used but attach fails past it.
 **/
pub const WS_WINDOW_LIMIT: usize = 16;

/**
Upper bound on workspaces, matching the command-language clamp.
 **/
pub const WORKSPACE_LIMIT: usize = 1000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum ModKey {
    Shift,
    Ctrl,
    Alt,
    Logo,
    Mod2,
    Mod3,
    Mod5,
}

impl ModKey {
    #[must_use]
    pub fn mask(self) -> u32 {
        match self {
            ModKey::Shift => MOD_SHIFT,
            ModKey::Ctrl => MOD_CTRL,
            ModKey::Alt => MOD_ALT,
            ModKey::Logo => MOD_LOGO,
            ModKey::Mod2 => MOD_MOD2,
            ModKey::Mod3 => MOD_MOD3,
            ModKey::Mod5 => MOD_MOD5,
        }
    }
}

#[must_use]
pub fn mods_to_mask(mods: &[ModKey]) -> u32 {
    mods.iter().fold(0, |acc, m| acc | m.mask())
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub struct Options {
    pub workspaces: usize,
    pub workspace_names: Vec<String>,
    pub terminal: String,
    pub placement: PlacementStrategy,
    pub row_dir: RowDir,
    pub col_dir: ColDir,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            workspaces: 4,
            workspace_names: Vec::new(),
            terminal: "foot".to_string(),
            placement: PlacementStrategy::RowSmart,
            row_dir: RowDir::LeftToRight,
            col_dir: ColDir::TopToBottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct Paths {
    pub keys_file: String,
    pub apps_file: String,
    pub style_file: String,
    pub style_overlay: String,
    pub menu_file: String,
    pub window_menu_file: String,
    pub slitlist_file: String,
}

/// One key binding as configured: a key (name), keycode, placeholder or
/// workspace-change trigger plus a command line for the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct KeyBindingCfg {
    pub key: Option<String>,
    pub keycode: Option<u32>,
    pub placeholder: bool,
    pub on_workspace_change: bool,
    pub mods: Vec<ModKey>,
    pub mode: Option<String>,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub struct MouseBindingCfg {
    pub context: MouseContext,
    pub event: MouseEventKind,
    pub button: u32,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub mods: Vec<ModKey>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub mode: Option<String>,
    pub command: String,
}

/// Declarative pre-map rule; the pattern string compiles at reconfigure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct AppsRuleCfg {
    pub pattern: String,
    pub workspace: Option<i32>,
    pub sticky: Option<bool>,
    pub jump: Option<bool>,
    pub minimized: Option<bool>,
    pub maximized: Option<bool>,
    pub fullscreen: Option<bool>,
    pub decor: Option<String>,
    pub layer: Option<i32>,
    pub head: Option<i32>,
    pub icon_hidden: Option<bool>,
    pub focus_hidden: Option<bool>,
    pub focus_protection: Vec<String>,
    pub match_limit: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct ScreenOverrideCfg {
    pub head: usize,
    pub focus: Option<FocusConfig>,
    pub full_maximization: Option<bool>,
    pub placement: Option<PlacementStrategy>,
    pub edge_snap_threshold: Option<i32>,
}

impl Default for ScreenOverrideCfg {
    fn default() -> Self {
        ScreenOverrideCfg {
            head: 0,
            focus: None,
            full_maximization: None,
            placement: None,
            edge_snap_threshold: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct Cfg {
    pub options: Options,
    pub focus: FocusConfig,
    pub tabs: TabsConfig,
    pub decor: DecorThemeCfg,
    pub paths: Paths,
    pub screens: Vec<ScreenOverrideCfg>,
    pub key_bindings: Vec<KeyBindingCfg>,
    pub mouse_bindings: Vec<MouseBindingCfg>,
    pub apps_rules: Vec<AppsRuleCfg>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct DecorThemeCfg {
    pub border_width: i32,
    pub title_height: i32,
    pub button_size: i32,
}

impl Default for DecorThemeCfg {
    fn default() -> Self {
        DecorThemeCfg {
            border_width: 1,
            title_height: 20,
            button_size: 16,
        }
    }
}

impl DecorThemeCfg {
    #[must_use]
    pub fn to_theme(self) -> DecorTheme {
        DecorTheme {
            border_width: self.border_width,
            title_height: self.title_height,
            button_size: self.button_size,
        }
    }
}

impl Default for Cfg {
    fn default() -> Self {
        let terminal = Options::default().terminal;
        let mut key_bindings = vec![
            binding("Escape", &[ModKey::Alt], "Exit"),
            binding("Return", &[ModKey::Alt], &format!("Exec {terminal}")),
            binding("F2", &[ModKey::Alt], "CommandDialog"),
            binding("F1", &[ModKey::Alt], "NextWindow"),
            binding("m", &[ModKey::Alt], "Maximize"),
            binding("f", &[ModKey::Alt], "Fullscreen"),
            binding("i", &[ModKey::Alt], "Minimize"),
        ];
        for i in 1..=9 {
            key_bindings.push(binding(&i.to_string(), &[ModKey::Alt], &format!("Workspace {i}")));
            key_bindings.push(binding(
                &i.to_string(),
                &[ModKey::Alt, ModKey::Ctrl],
                &format!("SendToWorkspace {i}"),
            ));
        }
        let mouse_bindings = vec![
            MouseBindingCfg {
                context: MouseContext::Titlebar,
                event: MouseEventKind::Press,
                button: 1,
                mods: Vec::new(),
                mode: None,
                command: "StartMoving".to_string(),
            },
            MouseBindingCfg {
                context: MouseContext::Window,
                event: MouseEventKind::Press,
                button: 1,
                mods: vec![ModKey::Alt],
                mode: None,
                command: "StartMoving".to_string(),
            },
            MouseBindingCfg {
                context: MouseContext::Window,
                event: MouseEventKind::Press,
                button: 3,
                mods: vec![ModKey::Alt],
                mode: None,
                command: "StartResizing NearestCornerOrEdge".to_string(),
            },
            MouseBindingCfg {
                context: MouseContext::Desktop,
                event: MouseEventKind::Press,
                button: 3,
                mods: Vec::new(),
                mode: None,
                command: "RootMenu".to_string(),
            },
            MouseBindingCfg {
                context: MouseContext::Desktop,
                event: MouseEventKind::Press,
                button: 4,
                mods: Vec::new(),
                mode: None,
                command: "PrevWorkspace".to_string(),
            },
            MouseBindingCfg {
                context: MouseContext::Desktop,
                event: MouseEventKind::Press,
                button: 5,
                mods: Vec::new(),
                mode: None,
                command: "NextWorkspace".to_string(),
            },
        ];
        Cfg {
            options: Options::default(),
            focus: FocusConfig::default(),
            tabs: TabsConfig::default(),
            decor: DecorThemeCfg::default(),
            paths: Paths::default(),
            screens: Vec::new(),
            key_bindings,
            mouse_bindings,
            apps_rules: Vec::new(),
        }
    }
}

fn binding(key: &str, mods: &[ModKey], command: &str) -> KeyBindingCfg {
    KeyBindingCfg {
        key: Some(key.to_string()),
        keycode: None,
        placeholder: false,
        on_workspace_change: false,
        mods: mods.to_vec(),
        mode: None,
        command: command.to_string(),
    }
}

impl Cfg {
    /// The merged default screen config the per-head store starts from.
    #[must_use]
    pub fn default_screen_config(&self) -> ScreenConfig {
        ScreenConfig {
            focus: self.focus,
            placement: self.options.placement,
            row_dir: self.options.row_dir,
            col_dir: self.options.col_dir,
            tabs: self.tabs,
            ..ScreenConfig::default()
        }
    }

    /// Per-head override applied on top of the defaults.
    #[must_use]
    pub fn screen_config_for(&self, head: usize) -> ScreenConfig {
        let mut out = self.default_screen_config();
        if let Some(ovr) = self.screens.iter().find(|s| s.head == head) {
            if let Some(focus) = ovr.focus {
                out.focus = focus;
            }
            if let Some(full) = ovr.full_maximization {
                out.full_maximization = full;
            }
            if let Some(placement) = ovr.placement {
                out.placement = placement;
            }
            if let Some(snap) = ovr.edge_snap_threshold {
                out.edge_snap_threshold = snap;
            }
        }
        out
    }

    /// Compile the configured key bindings into the runtime table. A key
    /// name or command that fails to resolve rejects the config as a whole
    /// rather than silently dropping the binding.
    pub fn build_key_bindings(&self) -> Result<Vec<KeyBinding>> {
        let mut out = Vec::with_capacity(self.key_bindings.len());
        for entry in &self.key_bindings {
            let resolved = cmd::resolve_line(&entry.command)
                .ok_or(Error::ConfigLogic("unresolvable key binding command"))?;
            let mods = mods_to_mask(&entry.mods);
            let binding = if entry.on_workspace_change {
                KeyBinding::change_workspace(resolved.action, resolved.arg, resolved.cmd.as_deref())
            } else if entry.placeholder {
                KeyBinding::placeholder(mods, resolved.action, resolved.arg, resolved.cmd.as_deref())
            } else if let Some(code) = entry.keycode {
                KeyBinding::keycode(code, mods, resolved.action, resolved.arg, resolved.cmd.as_deref())
            } else {
                let name = entry
                    .key
                    .as_deref()
                    .ok_or(Error::ConfigLogic("key binding without key, keycode or kind"))?;
                let sym = keysym_from_name(name)
                    .ok_or(Error::ConfigLogic("unknown key name in binding"))?;
                KeyBinding::keysym(sym, mods, resolved.action, resolved.arg, resolved.cmd.as_deref())
            };
            out.push(binding.with_mode(entry.mode.as_deref()));
        }
        Ok(out)
    }

    pub fn build_mouse_bindings(&self) -> Result<Vec<MouseBinding>> {
        let mut out = Vec::with_capacity(self.mouse_bindings.len());
        for entry in &self.mouse_bindings {
            let resolved = cmd::resolve_line(&entry.command)
                .ok_or(Error::ConfigLogic("unresolvable mouse binding command"))?;
            let mut b = MouseBinding::new(
                entry.context,
                entry.event,
                entry.button,
                mods_to_mask(&entry.mods),
                resolved.action,
                resolved.arg,
                resolved.cmd.as_deref(),
            );
            b.mode = entry.mode.clone();
            out.push(b);
        }
        Ok(out)
    }
}
