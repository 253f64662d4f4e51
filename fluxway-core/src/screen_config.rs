use crate::geometry::place::{ColDir, PlacementStrategy, RowDir};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum FocusModel {
    ClickToFocus,
    MouseFocus,
    StrictMouseFocus,
}

impl FocusModel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FocusModel::ClickToFocus => "ClickToFocus",
            FocusModel::MouseFocus => "MouseFocus",
            FocusModel::StrictMouseFocus => "StrictMouseFocus",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clicktofocus" | "clickfocus" => Some(FocusModel::ClickToFocus),
            "mousefocus" | "sloppyfocus" => Some(FocusModel::MouseFocus),
            "strictmousefocus" => Some(FocusModel::StrictMouseFocus),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub struct FocusConfig {
    pub model: FocusModel,
    pub focus_new_windows: bool,
    pub auto_raise: bool,
    pub auto_raise_delay_ms: i32,
    pub click_raises: bool,
    pub focus_same_head: bool,
    pub demands_attention_timeout_ms: i32,
    pub no_focus_while_typing_delay_ms: i32,
    pub allow_remote_actions: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        FocusConfig {
            model: FocusModel::ClickToFocus,
            focus_new_windows: true,
            auto_raise: false,
            auto_raise_delay_ms: 250,
            click_raises: true,
            focus_same_head: false,
            demands_attention_timeout_ms: 500,
            no_focus_while_typing_delay_ms: 0,
            allow_remote_actions: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum TabAttachArea {
    Window,
    Titlebar,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub struct TabsConfig {
    pub intitlebar: bool,
    pub max_over: bool,
    pub width_px: i32,
    pub attach_area: TabAttachArea,
}

impl Default for TabsConfig {
    fn default() -> Self {
        TabsConfig {
            intitlebar: true,
            max_over: false,
            width_px: 64,
            attach_area: TabAttachArea::Window,
        }
    }
}

/// Merged per-head configuration, consulted by nearly every decision.
/// Head 0 answers for heads without an explicit entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScreenConfig {
    pub focus: FocusConfig,
    pub full_maximization: bool,
    pub edge_snap_threshold: i32,
    pub opaque_move: bool,
    pub opaque_resize: bool,
    pub workspace_warping: bool,
    pub placement: PlacementStrategy,
    pub row_dir: RowDir,
    pub col_dir: ColDir,
    pub tabs: TabsConfig,
    pub toolbar_layer_num: i32,
    pub slit_layer_num: i32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            focus: FocusConfig::default(),
            full_maximization: false,
            edge_snap_threshold: 10,
            opaque_move: true,
            opaque_resize: false,
            workspace_warping: false,
            placement: PlacementStrategy::RowSmart,
            row_dir: RowDir::LeftToRight,
            col_dir: ColDir::TopToBottom,
            tabs: TabsConfig::default(),
            toolbar_layer_num: crate::state::layer::LAYER_NUM_DOCK,
            slit_layer_num: crate::state::layer::LAYER_NUM_DOCK,
        }
    }
}

/// Per-head store. Built by merging the default section with any
/// screen-specific overrides at reconfigure time.
#[derive(Debug, Default)]
pub struct ScreenConfigs {
    default: ScreenConfig,
    per_head: Vec<(usize, ScreenConfig)>,
}

impl ScreenConfigs {
    #[must_use]
    pub fn new(default: ScreenConfig) -> Self {
        ScreenConfigs {
            default,
            per_head: Vec::new(),
        }
    }

    pub fn set_for_head(&mut self, head: usize, config: ScreenConfig) {
        if let Some(slot) = self.per_head.iter_mut().find(|(h, _)| *h == head) {
            slot.1 = config;
        } else {
            self.per_head.push((head, config));
        }
    }

    /// Config for a head, falling through head 0 to the default section.
    #[must_use]
    pub fn get(&self, head: usize) -> &ScreenConfig {
        self.per_head
            .iter()
            .find(|(h, _)| *h == head)
            .or_else(|| self.per_head.iter().find(|(h, _)| *h == 0))
            .map_or(&self.default, |(_, c)| c)
    }

    #[must_use]
    pub fn default_config(&self) -> &ScreenConfig {
        &self.default
    }
}

#[cfg(test)]
mod tests {
    use super::{FocusModel, ScreenConfig, ScreenConfigs};

    #[test]
    fn focus_model_parse_round_trip() {
        for model in [
            FocusModel::ClickToFocus,
            FocusModel::MouseFocus,
            FocusModel::StrictMouseFocus,
        ] {
            assert_eq!(Some(model), FocusModel::parse(model.as_str()));
        }
        assert_eq!(Some(FocusModel::MouseFocus), FocusModel::parse("SloppyFocus"));
        assert_eq!(None, FocusModel::parse("hover"));
    }

    #[test]
    fn head_lookup_falls_back_to_zero_then_default() {
        let mut configs = ScreenConfigs::new(ScreenConfig::default());
        assert_eq!(10, configs.get(3).edge_snap_threshold);
        let mut head0 = ScreenConfig::default();
        head0.edge_snap_threshold = 20;
        configs.set_for_head(0, head0);
        // Head without an entry answers with head 0
        assert_eq!(20, configs.get(3).edge_snap_threshold);
        let mut head3 = ScreenConfig::default();
        head3.edge_snap_threshold = 5;
        configs.set_for_head(3, head3);
        assert_eq!(5, configs.get(3).edge_snap_threshold);
        assert_eq!(20, configs.get(1).edge_snap_threshold);
    }
}
