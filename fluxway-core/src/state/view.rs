use crate::geometry::{Rect, EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};
use crate::state::layer::StackLayer;
use crate::state::tabs::TabGroupId;

/// Stable view identity, equal to the view's creation sequence number.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewKind {
    /// Wayland-native toplevel.
    Native,
    /// X11 compatibility toplevel.
    Legacy,
}

// Focus protection bits, settable from apps rules.
pub const FOCUS_PROTECT_NONE: u8 = 0;
pub const FOCUS_PROTECT_GAIN: u8 = 1 << 0;
pub const FOCUS_PROTECT_REFUSE: u8 = 1 << 1;
pub const FOCUS_PROTECT_DENY: u8 = 1 << 2;

// Decoration mask bits.
pub const DECOR_BORDER: u32 = 1 << 0;
pub const DECOR_HANDLE: u32 = 1 << 1;
pub const DECOR_TITLEBAR: u32 = 1 << 2;
pub const DECOR_MENU: u32 = 1 << 3;
pub const DECOR_ICONIFY: u32 = 1 << 4;
pub const DECOR_MAXIMIZE: u32 = 1 << 5;
pub const DECOR_CLOSE: u32 = 1 << 6;
pub const DECOR_TAB: u32 = 1 << 7;

pub const DECOR_NONE: u32 = 0;
pub const DECOR_NORMAL: u32 = DECOR_BORDER
    | DECOR_HANDLE
    | DECOR_TITLEBAR
    | DECOR_MENU
    | DECOR_ICONIFY
    | DECOR_MAXIMIZE
    | DECOR_CLOSE
    | DECOR_TAB;
pub const DECOR_TINY: u32 = DECOR_BORDER | DECOR_TITLEBAR | DECOR_MENU | DECOR_ICONIFY;
pub const DECOR_TOOL: u32 = DECOR_TITLEBAR | DECOR_MENU;
pub const DECOR_BORDER_ONLY: u32 = DECOR_BORDER | DECOR_MENU;

/// Parse a `SetDecor` value: a preset name or a raw bitmask number.
#[must_use]
pub fn decor_mask_parse(value: &str) -> Option<u32> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    match v.to_ascii_lowercase().as_str() {
        "none" => return Some(DECOR_NONE),
        "normal" => return Some(DECOR_NORMAL),
        "tiny" => return Some(DECOR_TINY),
        "tool" => return Some(DECOR_TOOL),
        "border" => return Some(DECOR_BORDER_ONLY),
        _ => {}
    }
    v.parse::<u32>().ok().filter(|m| *m <= 0xff)
}

#[must_use]
pub fn decor_mask_has_frame(mask: u32) -> bool {
    mask & (DECOR_BORDER | DECOR_TITLEBAR | DECOR_HANDLE) != 0
}

/// Numeric extents of the drawn decoration. Colors and textures belong to the
/// style loader, which is external; geometry decisions only need these.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DecorTheme {
    pub border_width: i32,
    pub title_height: i32,
    pub button_size: i32,
}

impl Default for DecorTheme {
    fn default() -> Self {
        DecorTheme {
            border_width: 1,
            title_height: 20,
            button_size: 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DecorHitKind {
    None,
    Titlebar,
    Resize,
    BtnClose,
    BtnMax,
    BtnMin,
    BtnMenu,
    BtnShade,
    BtnStick,
    BtnLhalf,
    BtnRhalf,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DecorHit {
    pub kind: DecorHitKind,
    pub edges: u32,
}

impl DecorHit {
    pub const NONE: DecorHit = DecorHit {
        kind: DecorHitKind::None,
        edges: 0,
    };
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DecorState {
    pub enabled: bool,
    /// Set once the user forced decorations on/off; rules stop touching it.
    pub forced: bool,
    pub active: bool,
    pub mask: u32,
    pub title_cache: String,
    pub title_cache_width: i32,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Attention {
    pub active: bool,
    pub state: bool,
    pub interval_ms: u32,
    pub from_legacy_urgency: bool,
    pub toggle_count: u32,
}

/// Extra attributes only the X11 compatibility surface carries.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct LegacyAttrs {
    pub instance: String,
    pub role: String,
    pub wm_class: String,
    pub window_id: u32,
    pub urgent_hint: bool,
    pub has_strut_partial: bool,
    pub window_type_dock: bool,
    /// Property table the `@<prop>` pattern key and `SetXProp` act on.
    pub props: Vec<(String, String)>,
}

impl LegacyAttrs {
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&str> {
        self.props
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_prop(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.props.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            self.props.push((name.to_string(), value.to_string()));
        }
    }
}

/// Reference into the apps-rule table so per-rule match counters can be
/// adjusted when this view goes away.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AppsRuleCursor {
    pub index: usize,
    pub generation: u64,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,

    pub x: i32,
    pub y: i32,
    /// Committed content size; zero before the first commit.
    pub width: i32,
    pub height: i32,
    /// Last size requested over the protocol, the fallback for
    /// `current_width`/`current_height` before a commit lands.
    pub pending_width: i32,
    pub pending_height: i32,
    pub saved: Rect,

    pub mapped: bool,
    pub placed: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub maximized_h: bool,
    pub maximized_v: bool,
    pub fullscreen: bool,
    pub shaded: bool,
    pub in_slit: bool,

    pub workspace: i32,
    pub sticky: bool,
    /// Head the view currently sits on, recomputed from its center.
    pub head: usize,
    pub base_layer: StackLayer,
    pub tab_group: Option<TabGroupId>,
    /// Scene node toggle; a tab-group member that is not active keeps this
    /// false even on its own workspace.
    pub scene_enabled: bool,

    pub focus_protection: u8,
    pub accepts_focus: bool,
    pub transient: bool,
    pub icon_hidden: bool,
    pub focus_hidden: bool,

    pub attention: Attention,
    pub apps_rule: Option<AppsRuleCursor>,
    pub apps_rules_applied: bool,

    pub decor: DecorState,
    pub title: String,
    pub title_override: Option<String>,
    pub app_id: String,
    pub legacy: Option<LegacyAttrs>,

    pub alpha_focused: u8,
    pub alpha_unfocused: u8,
    pub alpha_set: bool,

    /// Output the foreign-toplevel handle was last announced on.
    pub foreign_output: Option<String>,
}

impl View {
    #[must_use]
    pub fn new(id: ViewId, kind: ViewKind) -> Self {
        View {
            id,
            kind,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            pending_width: 0,
            pending_height: 0,
            saved: Rect::default(),
            mapped: false,
            placed: false,
            minimized: false,
            maximized: false,
            maximized_h: false,
            maximized_v: false,
            fullscreen: false,
            shaded: false,
            in_slit: false,
            workspace: 0,
            sticky: false,
            head: 0,
            base_layer: StackLayer::Normal,
            tab_group: None,
            scene_enabled: true,
            focus_protection: FOCUS_PROTECT_NONE,
            accepts_focus: true,
            transient: false,
            icon_hidden: false,
            focus_hidden: false,
            attention: Attention::default(),
            apps_rule: None,
            apps_rules_applied: false,
            decor: DecorState {
                enabled: true,
                forced: false,
                active: false,
                mask: DECOR_NORMAL,
                title_cache: String::new(),
                title_cache_width: 0,
            },
            title: String::new(),
            title_override: None,
            app_id: String::new(),
            legacy: if kind == ViewKind::Legacy {
                Some(LegacyAttrs::default())
            } else {
                None
            },
            alpha_focused: 255,
            alpha_unfocused: 255,
            alpha_set: false,
            foreign_output: None,
        }
    }

    #[must_use]
    pub fn create_seq(&self) -> u64 {
        self.id.0
    }

    #[must_use]
    pub fn current_width(&self) -> i32 {
        if self.width > 0 {
            self.width
        } else {
            self.pending_width
        }
    }

    #[must_use]
    pub fn current_height(&self) -> i32 {
        if self.height > 0 {
            self.height
        } else {
            self.pending_height
        }
    }

    /// Title shown to the user; a user override shadows the client title.
    #[must_use]
    pub fn display_title(&self) -> &str {
        match &self.title_override {
            Some(t) => t,
            None => {
                if self.title.is_empty() {
                    "(no-title)"
                } else {
                    &self.title
                }
            }
        }
    }

    #[must_use]
    pub fn effective_title(&self) -> &str {
        self.title_override.as_deref().unwrap_or(&self.title)
    }

    /// The `name` pattern key: the legacy instance, falling back to app id.
    #[must_use]
    pub fn instance(&self) -> &str {
        match &self.legacy {
            Some(l) if !l.instance.is_empty() => &l.instance,
            _ => &self.app_id,
        }
    }

    #[must_use]
    pub fn role(&self) -> &str {
        self.legacy.as_ref().map_or("", |l| l.role.as_str())
    }

    #[must_use]
    pub fn is_urgent(&self) -> bool {
        self.attention.active || self.legacy.as_ref().is_some_and(|l| l.urgent_hint)
    }

    /// Record the pre-maximize/pre-fullscreen geometry for later restore.
    pub fn save_geometry(&mut self) {
        self.saved = Rect::new(self.x, self.y, self.current_width(), self.current_height());
    }

    /// Frame extents added by the drawn decoration: (left, top, right, bottom).
    #[must_use]
    pub fn frame_extents(&self, theme: &DecorTheme) -> (i32, i32, i32, i32) {
        if !self.decor.enabled || self.fullscreen {
            return (0, 0, 0, 0);
        }
        let b = theme.border_width;
        (b, theme.title_height + b, b, b)
    }

    /// Decorated frame box in layout coordinates.
    #[must_use]
    pub fn frame_box(&self, theme: &DecorTheme) -> Rect {
        let w = self.current_width();
        let h = self.current_height();
        let (left, top, right, bottom) = self.frame_extents(theme);
        Rect::new(
            self.x - left,
            self.y - top,
            w + left + right,
            h + top + bottom,
        )
    }

    /// Geometry-based hit test over the decoration. The content area itself
    /// reports `None`; the caller resolves surface hits separately.
    #[must_use]
    pub fn decor_hit_test(&self, theme: &DecorTheme, lx: i32, ly: i32) -> DecorHit {
        if !self.decor.enabled || self.fullscreen || !self.mapped {
            return DecorHit::NONE;
        }
        let frame = self.frame_box(theme);
        if !frame.contains(lx, ly) {
            return DecorHit::NONE;
        }
        let content = Rect::new(self.x, self.y, self.current_width(), self.current_height());
        if content.contains(lx, ly) {
            return DecorHit::NONE;
        }

        let titlebar = Rect::new(
            self.x,
            self.y - theme.title_height,
            self.current_width(),
            theme.title_height,
        );
        if titlebar.contains(lx, ly) {
            let btn = theme.button_size.min(theme.title_height);
            let rel_right = titlebar.x + titlebar.width - lx;
            // Right-edge button row: half-tiling, min, max, close (innermost first)
            let right_buttons = [
                DecorHitKind::BtnClose,
                DecorHitKind::BtnMax,
                DecorHitKind::BtnMin,
                DecorHitKind::BtnRhalf,
                DecorHitKind::BtnLhalf,
            ];
            for (i, kind) in right_buttons.iter().enumerate() {
                if rel_right <= btn * (i as i32 + 1) {
                    return DecorHit {
                        kind: *kind,
                        edges: 0,
                    };
                }
            }
            let rel_left = lx - titlebar.x;
            let left_buttons = [DecorHitKind::BtnMenu, DecorHitKind::BtnShade, DecorHitKind::BtnStick];
            for (i, kind) in left_buttons.iter().enumerate() {
                if rel_left < btn * (i as i32 + 1) {
                    return DecorHit {
                        kind: *kind,
                        edges: 0,
                    };
                }
            }
            return DecorHit {
                kind: DecorHitKind::Titlebar,
                edges: 0,
            };
        }

        // Border: resize with the matching edges
        let mut edges = 0;
        if lx < self.x {
            edges |= EDGE_LEFT;
        } else if lx >= self.x + self.current_width() {
            edges |= EDGE_RIGHT;
        }
        if ly < self.y - theme.title_height {
            edges |= EDGE_TOP;
        } else if ly >= self.y + self.current_height() {
            edges |= EDGE_BOTTOM;
        }
        if edges == 0 {
            edges = EDGE_RIGHT | EDGE_BOTTOM;
        }
        DecorHit {
            kind: DecorHitKind::Resize,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decor_mask_parse, DecorHitKind, DecorTheme, View, ViewId, ViewKind, DECOR_BORDER_ONLY,
        DECOR_NONE, DECOR_NORMAL, DECOR_TINY,
    };
    use crate::geometry::{EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};

    fn mapped_view() -> View {
        let mut v = View::new(ViewId(1), ViewKind::Native);
        v.mapped = true;
        v.x = 100;
        v.y = 100;
        v.width = 400;
        v.height = 300;
        v
    }

    #[test]
    fn current_size_falls_back_to_pending() {
        let mut v = View::new(ViewId(1), ViewKind::Native);
        v.pending_width = 640;
        v.pending_height = 480;
        assert_eq!(640, v.current_width());
        assert_eq!(480, v.current_height());
        v.width = 800;
        v.height = 600;
        assert_eq!(800, v.current_width());
        assert_eq!(600, v.current_height());
    }

    #[test]
    fn display_title_prefers_override() {
        let mut v = mapped_view();
        assert_eq!("(no-title)", v.display_title());
        v.title = "xterm".to_string();
        assert_eq!("xterm", v.display_title());
        v.title_override = Some("scratch".to_string());
        assert_eq!("scratch", v.display_title());
    }

    #[test]
    fn decor_mask_presets_and_numbers() {
        assert_eq!(Some(DECOR_NONE), decor_mask_parse("NONE"));
        assert_eq!(Some(DECOR_NORMAL), decor_mask_parse("normal"));
        assert_eq!(Some(DECOR_TINY), decor_mask_parse("Tiny"));
        assert_eq!(Some(DECOR_BORDER_ONLY), decor_mask_parse("border"));
        assert_eq!(Some(0x45), decor_mask_parse("69"));
        assert_eq!(None, decor_mask_parse("lots"));
        assert_eq!(None, decor_mask_parse("2048"));
    }

    #[test]
    fn hit_test_titlebar_buttons_and_borders() {
        let v = mapped_view();
        let theme = DecorTheme {
            border_width: 2,
            title_height: 20,
            button_size: 16,
        };
        // Middle of the titlebar drags
        assert_eq!(
            DecorHitKind::Titlebar,
            v.decor_hit_test(&theme, 300, 90).kind
        );
        // Rightmost button closes
        assert_eq!(
            DecorHitKind::BtnClose,
            v.decor_hit_test(&theme, 499, 90).kind
        );
        // Leftmost opens the window menu
        assert_eq!(DecorHitKind::BtnMenu, v.decor_hit_test(&theme, 101, 90).kind);
        // Bottom-right border corner resizes with both edges
        let hit = v.decor_hit_test(&theme, 501, 401);
        assert_eq!(DecorHitKind::Resize, hit.kind);
        assert_eq!(EDGE_RIGHT | EDGE_BOTTOM, hit.edges);
        let hit = v.decor_hit_test(&theme, 99, 79);
        assert_eq!(EDGE_LEFT | EDGE_TOP, hit.edges);
        // Content area is not a decoration hit
        assert_eq!(DecorHitKind::None, v.decor_hit_test(&theme, 300, 250).kind);
        // Outside the frame misses entirely
        assert_eq!(DecorHitKind::None, v.decor_hit_test(&theme, 700, 700).kind);
    }

    #[test]
    fn fullscreen_suppresses_decor_extents() {
        let mut v = mapped_view();
        let theme = DecorTheme::default();
        assert_ne!((0, 0, 0, 0), v.frame_extents(&theme));
        v.fullscreen = true;
        assert_eq!((0, 0, 0, 0), v.frame_extents(&theme));
    }

    #[test]
    fn save_geometry_uses_current_size() {
        let mut v = mapped_view();
        v.save_geometry();
        assert_eq!((100, 100, 400, 300), (v.saved.x, v.saved.y, v.saved.width, v.saved.height));
    }
}
