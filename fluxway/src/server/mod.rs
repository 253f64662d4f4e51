pub(crate) mod actions;
pub(crate) mod focus;
pub(crate) mod grab;
pub(crate) mod scene;
pub(crate) mod shim;
pub(crate) mod spawn;
pub(crate) mod timers;

use std::path::PathBuf;
use std::time::Instant;

use fluxway_core::apps::AppsRules;
use fluxway_core::cmd::lang::{self, CmdLangHost, ToggleStates};
use fluxway_core::cmd::Action;
use fluxway_core::config::key_map::{self, KeyBinding};
use fluxway_core::config::mouse_map::{self, MouseBinding, MouseContext, MouseEventKind};
use fluxway_core::config::Cfg;
use fluxway_core::geometry::head_map::{head_at, head_count, output_for_head, Output};
use fluxway_core::geometry::place::{Placement, PlacementStrategy};
use fluxway_core::geometry::{resize_edges, Direction, Rect};
use fluxway_core::pattern::{ClientPattern, PatternEnv};
use fluxway_core::screen_config::{ScreenConfig, ScreenConfigs};
use fluxway_core::state::layer::StackLayer;
use fluxway_core::state::view::{DecorTheme, View, ViewId, ViewKind, FOCUS_PROTECT_GAIN};
use fluxway_core::state::WmCore;
use fluxway_core::debug;

use crate::server::grab::{Grab, GrabMode};
use crate::server::scene::{Scene, SceneLayer};
use crate::server::shim::{ProtocolOp, ShimEvent, UiRequest};
use crate::server::timers::{TimerKind, Timers};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FocusReason {
    PointerMotion,
    PointerClick,
    Map,
    Activate,
    Keybinding,
    Cycle,
    Refocus,
}

/// The compositor-side server: owns the core registry and drives every
/// mutation from binding dispatch and shim events. Protocol effects and UI
/// requests are queued for the embedding to drain.
pub struct Server {
    pub core: WmCore,
    pub outputs: Vec<Output>,
    pub scene: Scene,
    pub screen_configs: ScreenConfigs,
    pub decor_theme: DecorTheme,
    pub cfg: Cfg,
    pub key_bindings: Vec<KeyBinding>,
    pub mouse_bindings: Vec<MouseBinding>,
    pub key_mode: Option<String>,
    pub cursor: (i32, i32),
    pub current_button: u32,
    pub grab: Grab,
    pub timers: Timers,
    pub apps_rules: AppsRules,
    pub config_dir: Option<PathBuf>,
    pub ops: Vec<ProtocolOp>,
    pub ui: Vec<UiRequest>,

    /// Marked-window bookmarks, keycode to creation sequence.
    pub(crate) marked: smallmap::Map<u32, u64>,
    pub(crate) toggle_states: ToggleStates,
    pub(crate) cmdlang_scope: u64,
    pub(crate) placeholder_keycode: u32,
    pub(crate) cmd_dialog_target_seq: u64,
    pub(crate) in_change_workspace: bool,
    pub(crate) now: Instant,
}

impl Server {
    pub fn new(cfg: Cfg, outputs: Vec<Output>) -> crate::error::Result<Self> {
        let key_bindings = cfg.build_key_bindings()?;
        let mouse_bindings = cfg.build_mouse_bindings()?;
        let mut core = WmCore::new();
        core.set_workspace_count(cfg.options.workspaces as i32);
        for (i, name) in cfg.options.workspace_names.iter().enumerate() {
            core.set_workspace_name(i as i32, name);
        }
        core.placement = cfg.options.placement;
        core.row_dir = cfg.options.row_dir;
        core.col_dir = cfg.options.col_dir;
        core.set_head_count(head_count(&outputs).max(1));

        let mut screen_configs = ScreenConfigs::new(cfg.default_screen_config());
        for ovr in &cfg.screens {
            screen_configs.set_for_head(ovr.head, cfg.screen_config_for(ovr.head));
        }
        let mut apps_rules = AppsRules::default();
        apps_rules.rebuild(&cfg.apps_rules);

        Ok(Server {
            core,
            outputs,
            scene: Scene::default(),
            screen_configs,
            decor_theme: cfg.decor.to_theme(),
            cfg,
            key_bindings,
            mouse_bindings,
            key_mode: None,
            cursor: (0, 0),
            current_button: 0,
            grab: Grab::default(),
            timers: Timers::default(),
            apps_rules,
            config_dir: None,
            ops: Vec::new(),
            ui: Vec::new(),
            marked: smallmap::Map::new(),
            toggle_states: ToggleStates::default(),
            cmdlang_scope: 0,
            placeholder_keycode: 0,
            cmd_dialog_target_seq: 0,
            in_change_workspace: false,
            now: Instant::now(),
        })
    }

    /// Re-read derived state from a fresh `Cfg`; the view population stays.
    pub fn reconfigure(&mut self, cfg: Cfg) -> crate::error::Result<()> {
        self.key_bindings = cfg.build_key_bindings()?;
        self.mouse_bindings = cfg.build_mouse_bindings()?;
        self.core.set_workspace_count(cfg.options.workspaces as i32);
        self.core.placement = cfg.options.placement;
        self.core.row_dir = cfg.options.row_dir;
        self.core.col_dir = cfg.options.col_dir;
        self.screen_configs = ScreenConfigs::new(cfg.default_screen_config());
        for ovr in &cfg.screens {
            self.screen_configs
                .set_for_head(ovr.head, cfg.screen_config_for(ovr.head));
        }
        self.apps_rules.rebuild(&cfg.apps_rules);
        self.decor_theme = cfg.decor.to_theme();
        self.cfg = cfg;
        for id in self.view_snapshot(|_| true) {
            self.decor_update(id);
        }
        self.apply_workspace_visibility("reconfigure");
        Ok(())
    }

    /// Advance the logical clock and run due timers.
    pub fn tick(&mut self, now: Instant) {
        self.now = now;
        for fired in self.timers.fire_due(now) {
            match fired {
                TimerKind::AttentionBlink(id) => self.attention_timer_fired(id),
                TimerKind::Delay { cmd_line, .. } => {
                    debug!("Delay: fire cmd={}", cmd_line);
                    let _ = self.execute_command_line(&cmd_line);
                }
                TimerKind::AutoRaise(id) => {
                    if self.core.view(id).is_some() {
                        self.raise_view(id, "auto-raise");
                    }
                }
            }
        }
    }

    // --- outputs & screen config ---

    pub fn outputs_changed(&mut self, outputs: Vec<Output>) {
        self.outputs = outputs;
        self.core.set_head_count(head_count(&self.outputs).max(1));
        for id in self.view_snapshot(|_| true) {
            self.update_view_head(id);
        }
        self.apply_workspace_visibility("outputs-changed");
    }

    #[must_use]
    pub fn screen_config_at(&self, x: i32, y: i32) -> &ScreenConfig {
        self.screen_configs.get(head_at(&self.outputs, x, y))
    }

    #[must_use]
    pub fn screen_config_for_view(&self, id: ViewId) -> &ScreenConfig {
        let head = self.core.view(id).map_or(0, |v| v.head);
        self.screen_configs.get(head)
    }

    #[must_use]
    pub fn head_at_cursor(&self) -> usize {
        head_at(&self.outputs, self.cursor.0, self.cursor.1)
    }

    #[must_use]
    pub fn output_box_for_head(&self, head: usize) -> Option<Rect> {
        output_for_head(&self.outputs, head).map(|o| o.full)
    }

    #[must_use]
    pub fn usable_box_for_head(&self, head: usize) -> Option<Rect> {
        output_for_head(&self.outputs, head).map(Output::usable_box)
    }

    /// Maximize/fullscreen target box for a view on its head.
    #[must_use]
    pub fn max_target_box(&self, id: ViewId, head: usize) -> Option<Rect> {
        let full_max = self.screen_configs.get(head).full_maximization;
        if full_max {
            self.output_box_for_head(head)
        } else {
            self.usable_box_for_head(head)
        }
    }

    /// Recompute which head holds the view's center and remember it; also
    /// announce the output to foreign-toplevel listeners when it moved.
    pub fn update_view_head(&mut self, id: ViewId) {
        let Some((cx, cy)) = self.core.view(id).map(|v| {
            (
                v.x + v.current_width() / 2,
                v.y + v.current_height() / 2,
            )
        }) else {
            return;
        };
        let head = head_at(&self.outputs, cx, cy);
        let output_name = output_for_head(&self.outputs, head).map(|o| o.name.clone());
        if let Some(view) = self.core.view_mut(id) {
            view.head = head;
            if let Some(name) = output_name {
                if view.foreign_output.as_deref() != Some(&name) {
                    view.foreign_output = Some(name.clone());
                    self.ops.push(ProtocolOp::ForeignOutputEnter { id, output: name });
                }
            }
        }
    }

    // --- view lifecycle ---

    pub fn surface_new(&mut self, kind: ViewKind) -> ViewId {
        let id = self.core.create_view(kind);
        self.scene.add(id, SceneLayer::Normal);
        id
    }

    pub fn handle_shim_event(&mut self, event: ShimEvent) {
        match event {
            ShimEvent::SurfaceNew { kind } => {
                self.surface_new(kind);
            }
            ShimEvent::Map { id } => self.handle_map(id),
            ShimEvent::Unmap { id } => self.handle_unmap(id),
            ShimEvent::Destroy { id } => self.handle_destroy(id),
            ShimEvent::Commit { id, w, h } => self.handle_commit(id, w, h),
            ShimEvent::TitleChanged { id, title } => self.handle_title_changed(id, &title),
            ShimEvent::AppIdChanged { id, app_id } => {
                if let Some(view) = self.core.view_mut(id) {
                    view.app_id = app_id;
                }
            }
            ShimEvent::RequestMaximize { id, on } => {
                self.set_maximized_axes(id, on, on);
            }
            ShimEvent::RequestFullscreen { id, on } => {
                self.set_fullscreen(id, on, None);
            }
            ShimEvent::RequestMinimize { id, on } => {
                self.set_minimized(id, on, "client-request");
            }
            ShimEvent::RequestActivate { id } => self.handle_request_activate(id),
            ShimEvent::RequestClose { id } => self.close_view(id, false),
            ShimEvent::UrgencyChanged { id, urgent } => self.legacy_urgency_changed(id, urgent),
            ShimEvent::RequestConfigure { id, x, y, w, h } => {
                // Legacy clients may self-position; honor it like a configure
                if let Some(view) = self.core.view_mut(id) {
                    view.x = x;
                    view.y = y;
                    view.pending_width = w;
                    view.pending_height = h;
                }
                self.ops.push(ProtocolOp::Configure { id, x, y, w, h });
                self.update_view_head(id);
            }
        }
    }

    fn handle_map(&mut self, id: ViewId) {
        self.core.map_view(id);
        let rules_applied_before = self
            .core
            .view(id)
            .is_some_and(|v| v.apps_rules_applied);
        self.apps_rules_apply_pre_map(id);
        if !rules_applied_before && self.core.view(id).is_some_and(|v| v.apps_rules_applied) {
            if let Some(cursor) = self.core.view(id).and_then(|v| v.apps_rule) {
                self.apps_rules.match_count_inc(cursor);
            }
        }
        self.place_initial(id);
        self.update_view_head(id);
        self.apply_workspace_visibility("map");

        if !self.core.view_is_visible(id) {
            return;
        }
        let cfg = self.screen_config_for_view(id);
        let mut focus_new = cfg.focus.focus_new_windows;
        if let Some(view) = self.core.view(id) {
            if view.focus_protection & FOCUS_PROTECT_GAIN != 0 {
                focus_new = true;
            } else if view.focus_protection & fluxway_core::state::view::FOCUS_PROTECT_REFUSE != 0 {
                focus_new = false;
            }
            if !view.accepts_focus {
                focus_new = false;
            }
        }
        if !focus_new {
            return;
        }
        self.focus_view(id, FocusReason::Map);
    }

    fn handle_unmap(&mut self, id: ViewId) {
        self.core.tabs_detach(id, "unmap");
        self.core.unmap_view(id);
        self.timers.cancel_for_view(id);
        self.refocus("unmap");
    }

    fn handle_destroy(&mut self, id: ViewId) {
        // Attention timers first, then registries, then the view itself
        self.timers.cancel_for_view(id);
        if let Some(cursor) = self.core.view(id).and_then(|v| v.apps_rule) {
            self.apps_rules.match_count_dec(cursor);
            self.apps_rules_save_on_close();
        }
        self.scene.remove(id);
        let was_focused = self.core.focused == Some(id);
        self.core.destroy_view(id);
        if was_focused {
            self.refocus("destroy");
        }
    }

    fn handle_commit(&mut self, id: ViewId, w: i32, h: i32) {
        let sync = {
            let Some(view) = self.core.view_mut(id) else {
                return;
            };
            let changed = view.width != w || view.height != h;
            view.width = w;
            view.height = h;
            changed && view.tab_group.is_some() && view.mapped
        };
        if sync {
            let affected = self
                .core
                .tabs_sync_geometry_from(id, true, w, h, "commit");
            for member in affected {
                self.configure_view(member);
            }
        }
        self.decor_update(id);
        self.update_view_head(id);
    }

    fn handle_title_changed(&mut self, id: ViewId, title: &str) {
        if let Some(view) = self.core.view_mut(id) {
            view.title = title.to_string();
            let announced = view.effective_title().to_string();
            self.ops.push(ProtocolOp::ForeignSetTitle {
                id,
                title: announced,
            });
        }
        self.decor_update_title_text(id);
    }

    fn handle_request_activate(&mut self, id: ViewId) {
        if self.core.view(id).is_none() {
            return;
        }
        if self.core.view(id).is_some_and(|v| v.minimized) {
            self.set_minimized(id, false, "activate");
        }
        let (sticky, workspace, head) = {
            let Some(view) = self.core.view(id) else {
                return;
            };
            (view.sticky, view.workspace, view.head)
        };
        if !sticky && workspace != self.core.workspace_current_for_head(head) {
            self.workspace_switch_on_head(head, workspace, "activate-switch");
        }
        self.focus_view(id, FocusReason::Activate);
    }

    fn legacy_urgency_changed(&mut self, id: ViewId, urgent: bool) {
        let prev = self
            .core
            .view(id)
            .and_then(|v| v.legacy.as_ref())
            .is_some_and(|l| l.urgent_hint);
        if let Some(legacy) = self.core.view_mut(id).and_then(|v| v.legacy.as_mut()) {
            legacy.urgent_hint = urgent;
        }
        if urgent == prev {
            return;
        }
        if urgent {
            let interval = self
                .screen_config_for_view(id)
                .focus
                .demands_attention_timeout_ms;
            if interval > 0 && self.core.focused != Some(id) {
                if let Some(view) = self.core.view_mut(id) {
                    view.attention.from_legacy_urgency = true;
                }
                self.attention_request(id, interval as u32, "legacy-urgent");
            }
        } else {
            let from_urgency = self
                .core
                .view(id)
                .is_some_and(|v| v.attention.active && v.attention.from_legacy_urgency);
            if from_urgency {
                self.attention_clear(id, "legacy-urgent-clear");
            }
        }
    }

    pub fn close_view(&mut self, id: ViewId, force: bool) {
        if self.core.view(id).is_some() {
            self.ops.push(ProtocolOp::SendClose { id, force });
        }
    }

    // --- attention ---

    /// Install the blink timer unless the view is focused or already
    /// blinking; a non-positive interval is a no-op.
    pub fn attention_request(&mut self, id: ViewId, interval_ms: u32, why: &str) {
        if interval_ms == 0 || self.core.focused == Some(id) {
            return;
        }
        let Some(view) = self.core.view_mut(id) else {
            return;
        };
        if view.attention.active {
            return;
        }
        view.attention.active = true;
        view.attention.state = false;
        view.attention.interval_ms = interval_ms;
        view.attention.toggle_count = 0;
        debug!("Attention: start view={:?} interval={} why={}", id, interval_ms, why);
        self.timers.arm_attention(id, interval_ms, self.now);
    }

    pub fn attention_clear(&mut self, id: ViewId, why: &str) {
        self.timers.cancel_attention(id);
        let Some(view) = self.core.view_mut(id) else {
            return;
        };
        let was_active = view.attention.active;
        view.attention = fluxway_core::state::view::Attention::default();
        if was_active {
            debug!("Attention: clear view={:?} why={}", id, why);
        }
        if self.core.focused != Some(id) {
            self.decor_set_active(id, false);
        }
    }

    fn attention_timer_fired(&mut self, id: ViewId) {
        // Stale fires on destroyed or focused views cancel themselves
        if self.core.view(id).is_none() || self.core.focused == Some(id) {
            self.timers.cancel_attention(id);
            if self.core.view(id).is_some() {
                self.attention_clear(id, "focused");
            }
            return;
        }
        let (interval, state) = {
            let Some(view) = self.core.view_mut(id) else {
                return;
            };
            if !view.attention.active || view.attention.interval_ms == 0 {
                return;
            }
            view.attention.state = !view.attention.state;
            if view.attention.toggle_count < 3 {
                view.attention.toggle_count += 1;
            }
            (view.attention.interval_ms, view.attention.state)
        };
        self.decor_set_active(id, state);
        self.timers.arm_attention(id, interval, self.now);
    }

    // --- decoration ---

    pub fn decor_set_active(&mut self, id: ViewId, active: bool) {
        if let Some(view) = self.core.view_mut(id) {
            view.decor.active = active;
        }
    }

    pub fn decor_set_enabled(&mut self, id: ViewId, enabled: bool) {
        if let Some(view) = self.core.view_mut(id) {
            view.decor.enabled = enabled;
        }
    }

    pub fn decor_update(&mut self, id: ViewId) {
        self.decor_update_title_text(id);
    }

    pub fn decor_update_title_text(&mut self, id: ViewId) {
        let Some(view) = self.core.view_mut(id) else {
            return;
        };
        let title = view.display_title().to_string();
        let width = view.current_width();
        if view.decor.title_cache != title || view.decor.title_cache_width != width {
            view.decor.title_cache = title;
            view.decor.title_cache_width = width;
        }
    }

    // --- placement ---

    fn place_initial(&mut self, id: ViewId) {
        let Some(view) = self.core.view(id) else {
            return;
        };
        if view.placed || !view.mapped {
            return;
        }
        let w = view.current_width().max(1);
        let h = view.current_height().max(1);
        let (left, top, right, bottom) = view.frame_extents(&self.decor_theme);
        let frame_w = w + left + right;
        let frame_h = h + top + bottom;

        let head = self.head_at_cursor();
        let Some(usable) = self.usable_box_for_head(head) else {
            if let Some(v) = self.core.view_mut(id) {
                v.placed = true;
            }
            return;
        };

        let strategy = self.screen_configs.get(head).placement;
        if strategy == PlacementStrategy::AutoTab {
            let anchor = self.core.focused.filter(|f| {
                *f != id
                    && self
                        .core
                        .view(*f)
                        .is_some_and(|v| v.mapped && !v.minimized)
            });
            if let Some(anchor) = anchor {
                if let Some(affected) = self.core.tabs_attach(id, anchor, "autotab") {
                    for member in affected {
                        self.configure_view(member);
                    }
                    return;
                }
            }
        }

        let occupied: Vec<Rect> = self
            .core
            .views_in_map_order()
            .filter(|v| {
                v.id != id
                    && v.placed
                    && v.scene_enabled
                    && !v.minimized
                    && v.head == head
                    && self.core.view_is_visible(v.id)
            })
            .map(|v| v.frame_box(&self.decor_theme))
            .collect();

        let placement = Placement {
            strategy,
            row_dir: self.core.row_dir,
            col_dir: self.core.col_dir,
            occupied: &occupied,
            cascade_step: self.decor_theme.title_height + self.decor_theme.border_width,
        };
        let mut cascade = self.core.place_next;
        let (frame_x, frame_y) =
            placement.place_next(usable, frame_w, frame_h, self.cursor, &mut cascade);
        self.core.place_next = cascade;

        if let Some(view) = self.core.view_mut(id) {
            view.x = frame_x + left;
            view.y = frame_y + top;
            view.placed = true;
        }
        self.configure_view(id);
    }

    // --- geometry ---

    /// Emit the protocol calls for the view's current position/size wants.
    pub fn configure_view(&mut self, id: ViewId) {
        let Some(view) = self.core.view(id) else {
            return;
        };
        // A pending request wins over the last committed size
        let w = if view.pending_width > 0 {
            view.pending_width
        } else {
            view.current_width()
        };
        let h = if view.pending_height > 0 {
            view.pending_height
        } else {
            view.current_height()
        };
        if w < 1 || h < 1 {
            return;
        }
        match view.kind {
            ViewKind::Native => self.ops.push(ProtocolOp::SetSize { id, w, h }),
            ViewKind::Legacy => self.ops.push(ProtocolOp::Configure {
                id,
                x: view.x,
                y: view.y,
                w,
                h,
            }),
        }
    }

    /// Leave fullscreen and drop maximize axes before a manual move/resize.
    pub(crate) fn view_prepare_manual_geometry(&mut self, id: ViewId) {
        if self.core.view(id).is_some_and(|v| v.fullscreen) {
            self.set_fullscreen(id, false, None);
        }
        let had_max = self
            .core
            .view(id)
            .is_some_and(|v| v.maximized || v.maximized_h || v.maximized_v);
        if !had_max {
            return;
        }
        if let Some(view) = self.core.view_mut(id) {
            view.maximized = false;
            view.maximized_h = false;
            view.maximized_v = false;
        }
        self.ops.push(ProtocolOp::SetMaximized {
            id,
            h: false,
            v: false,
        });
        self.ops.push(ProtocolOp::ForeignSetMaximized { id, on: false });
    }

    /// Move the decorated frame; content position lands inside the extents.
    pub(crate) fn view_move_frame(&mut self, id: ViewId, frame_x: i32, frame_y: i32, why: &str) -> bool {
        let Some(view) = self.core.view(id) else {
            return false;
        };
        if view.current_width() < 1 || view.current_height() < 1 {
            return false;
        }
        let (left, top, _, _) = view.frame_extents(&self.decor_theme);
        if let Some(view) = self.core.view_mut(id) {
            view.x = frame_x + left;
            view.y = frame_y + top;
            view.placed = true;
        }
        if self.core.view(id).is_some_and(|v| v.kind == ViewKind::Legacy) {
            self.configure_view(id);
        }
        let affected = self.core.tabs_sync_geometry_from(id, false, 0, 0, why);
        for member in affected {
            self.configure_view(member);
        }
        self.update_view_head(id);
        true
    }

    pub(crate) fn view_move_resize_frame(
        &mut self,
        id: ViewId,
        frame: Rect,
        why: &str,
    ) -> bool {
        let Some(view) = self.core.view(id) else {
            return false;
        };
        let (left, top, right, bottom) = view.frame_extents(&self.decor_theme);
        let w = frame.width - left - right;
        let h = frame.height - top - bottom;
        if w < 1 || h < 1 {
            return false;
        }
        if let Some(view) = self.core.view_mut(id) {
            view.x = frame.x + left;
            view.y = frame.y + top;
            view.pending_width = w;
            view.pending_height = h;
            view.placed = true;
        }
        self.configure_view(id);
        let affected = self.core.tabs_sync_geometry_from(id, true, w, h, why);
        for member in affected {
            self.configure_view(member);
        }
        self.update_view_head(id);
        true
    }

    // --- maximize / fullscreen / shade / minimize ---

    pub fn set_maximized(&mut self, id: ViewId, maximized: bool) {
        if maximized {
            self.set_maximized_axes(id, true, true);
        } else {
            self.set_maximized_axes(id, false, false);
        }
    }

    /// Independent horizontal/vertical maximize; both axes is a full
    /// maximize, neither restores the saved geometry.
    pub fn set_maximized_axes(&mut self, id: ViewId, maximized_h: bool, maximized_v: bool) {
        let Some(view) = self.core.view(id) else {
            return;
        };
        if view.fullscreen {
            // Axes stay recorded while fullscreen suspends them
            if let Some(view) = self.core.view_mut(id) {
                view.maximized_h = maximized_h;
                view.maximized_v = maximized_v;
                view.maximized = maximized_h && maximized_v;
            }
            self.ops.push(ProtocolOp::ScheduleConfigure { id });
            return;
        }
        if view.maximized_h == maximized_h && view.maximized_v == maximized_v {
            self.ops.push(ProtocolOp::ScheduleConfigure { id });
            return;
        }
        let cur_w = view.current_width();
        let cur_h = view.current_height();
        if cur_w < 1 || cur_h < 1 {
            return;
        }

        let before = self.strict_mousefocus_view_under_cursor();

        let had_axes = view.maximized_h || view.maximized_v;
        if (maximized_h || maximized_v)
            && (!had_axes || view.saved.width < 1 || view.saved.height < 1)
        {
            if let Some(view) = self.core.view_mut(id) {
                view.save_geometry();
            }
        }

        let head = self.core.view(id).map_or(0, |v| v.head);
        let Some(target) = self.max_target_box(id, head) else {
            return;
        };
        if target.is_empty() {
            self.ops.push(ProtocolOp::ScheduleConfigure { id });
            return;
        }

        let view = self.core.view(id).expect("checked above");
        let saved = view.saved;
        let (mut x, mut w) = if maximized_h {
            (target.x, target.width)
        } else {
            (saved.x, if saved.width > 0 { saved.width } else { cur_w })
        };
        let (mut y, mut h) = if maximized_v {
            (target.y, target.height)
        } else {
            (saved.y, if saved.height > 0 { saved.height } else { cur_h })
        };
        if view.decor.enabled {
            let border = self.decor_theme.border_width;
            let title_h = self.decor_theme.title_height;
            if maximized_h {
                x += border;
                w -= 2 * border;
            }
            if maximized_v {
                y += title_h + border;
                h -= title_h + 2 * border;
            }
        }
        if w < 1 || h < 1 {
            self.ops.push(ProtocolOp::ScheduleConfigure { id });
            return;
        }

        if let Some(view) = self.core.view_mut(id) {
            view.maximized_h = maximized_h;
            view.maximized_v = maximized_v;
            view.maximized = maximized_h && maximized_v;
            view.x = x;
            view.y = y;
            view.pending_width = w;
            view.pending_height = h;
        }
        self.scene.raise_to_top(id);
        let maximized = maximized_h && maximized_v;
        self.ops.push(ProtocolOp::SetMaximized {
            id,
            h: maximized_h,
            v: maximized_v,
        });
        self.configure_view(id);
        self.ops
            .push(ProtocolOp::ForeignSetMaximized { id, on: maximized });

        let affected = self.core.tabs_sync_geometry_from(
            id,
            true,
            w,
            h,
            if maximized_h { "maximize-h-set" } else { "maximize-v-set" },
        );
        for member in affected {
            self.configure_view(member);
        }
        self.update_view_head(id);
        debug!(
            "MaximizeAxes: {:?} horz={} vert={} w={} h={}",
            id, maximized_h, maximized_v, w, h
        );
        self.strict_mousefocus_recheck_after_restack(before, "maximize-axes");
    }

    pub fn set_fullscreen(&mut self, id: ViewId, fullscreen: bool, output_head: Option<usize>) {
        let Some(view) = self.core.view(id) else {
            return;
        };
        if view.fullscreen == fullscreen {
            return;
        }
        let before = self.strict_mousefocus_view_under_cursor();
        if fullscreen {
            let head = output_head.unwrap_or(view.head);
            let Some(target) = self.output_box_for_head(head) else {
                return;
            };
            if target.is_empty() {
                return;
            }
            let had_axes = view.maximized_h || view.maximized_v;
            if !had_axes || view.saved.width < 1 {
                if let Some(view) = self.core.view_mut(id) {
                    view.save_geometry();
                }
            }
            if let Some(view) = self.core.view_mut(id) {
                view.fullscreen = true;
                view.x = target.x;
                view.y = target.y;
                view.pending_width = target.width;
                view.pending_height = target.height;
            }
            self.scene.reparent(id, SceneLayer::Fullscreen);
            self.ops.push(ProtocolOp::SetFullscreen { id, on: true });
            self.configure_view(id);
        } else {
            let (base_layer, saved, max_h, max_v) = {
                let view = self.core.view(id).expect("checked above");
                (view.base_layer, view.saved, view.maximized_h, view.maximized_v)
            };
            if let Some(view) = self.core.view_mut(id) {
                view.fullscreen = false;
                if saved.width > 0 && saved.height > 0 {
                    view.x = saved.x;
                    view.y = saved.y;
                    view.pending_width = saved.width;
                    view.pending_height = saved.height;
                }
            }
            self.scene
                .reparent(id, SceneLayer::from_stack_layer(base_layer));
            self.ops.push(ProtocolOp::SetFullscreen { id, on: false });
            self.configure_view(id);
            // Suspended maximize axes re-apply on the way out
            if max_h || max_v {
                if let Some(view) = self.core.view_mut(id) {
                    view.maximized_h = false;
                    view.maximized_v = false;
                    view.maximized = false;
                }
                self.set_maximized_axes(id, max_h, max_v);
            }
        }
        self.update_view_head(id);
        self.strict_mousefocus_recheck_after_restack(
            before,
            if fullscreen { "fullscreen-on" } else { "fullscreen-off" },
        );
    }

    pub fn set_shaded(&mut self, id: ViewId, shaded: bool, why: &str) {
        let Some(view) = self.core.view_mut(id) else {
            return;
        };
        if view.shaded == shaded {
            return;
        }
        view.shaded = shaded;
        debug!("Shade: {:?} {} reason={}", id, shaded, why);
        self.ops.push(ProtocolOp::ScheduleConfigure { id });
        self.decor_update(id);
    }

    pub fn set_minimized(&mut self, id: ViewId, minimized: bool, why: &str) {
        let Some(view) = self.core.view(id) else {
            return;
        };
        if view.minimized == minimized {
            self.ops.push(ProtocolOp::ScheduleConfigure { id });
            return;
        }
        let kind = view.kind;
        if let Some(view) = self.core.view_mut(id) {
            view.minimized = minimized;
        }
        if kind == ViewKind::Legacy {
            self.ops.push(ProtocolOp::SetMinimized { id, on: minimized });
        }
        self.ops
            .push(ProtocolOp::ForeignSetMinimized { id, on: minimized });
        debug!("Minimize: {:?} {} reason={}", id, minimized, why);
        self.ops.push(ProtocolOp::ScheduleConfigure { id });
        self.apply_workspace_visibility(if minimized { "minimize-on" } else { "minimize-off" });

        if minimized {
            self.refocus(why);
            return;
        }
        if self.core.view_is_visible(id) {
            if why == "showdesktop" {
                return;
            }
            self.focus_view(id, FocusReason::Keybinding);
            return;
        }
        self.refocus(why);
    }

    pub fn set_activated(&mut self, id: ViewId, activated: bool) {
        self.ops.push(ProtocolOp::SetActivated { id, on: activated });
        self.ops
            .push(ProtocolOp::ForeignSetActivated { id, on: activated });
        self.decor_set_active(id, activated);
    }

    // --- stacking ---

    pub fn raise_view(&mut self, id: ViewId, why: &str) {
        let before = self.strict_mousefocus_view_under_cursor();
        self.scene.raise_to_top(id);
        debug!("Raise: {:?} reason={}", id, why);
        self.strict_mousefocus_recheck_after_restack(before, why);
    }

    pub fn lower_view(&mut self, id: ViewId, why: &str) {
        let before = self.strict_mousefocus_view_under_cursor();
        self.scene.lower_to_bottom(id);
        debug!("Lower: {:?} reason={}", id, why);
        self.strict_mousefocus_recheck_after_restack(before, why);
    }

    pub fn set_layer(&mut self, id: ViewId, layer_num: i32) {
        let Some(view) = self.core.view(id) else {
            return;
        };
        let fullscreen = view.fullscreen;
        let before = self.strict_mousefocus_view_under_cursor();
        let layer = StackLayer::from_num(layer_num);
        if let Some(view) = self.core.view_mut(id) {
            view.base_layer = layer;
        }
        if !fullscreen {
            self.scene.reparent(id, SceneLayer::from_stack_layer(layer));
        }
        debug!("Layer: {:?} set={} reason=keybinding", id, layer_num);
        if !fullscreen {
            self.strict_mousefocus_recheck_after_restack(before, "set-layer");
        }
    }

    // --- workspaces ---

    /// Visibility pass after any workspace/sticky change: exactly one
    /// apply per mutation, tab groups repaired afterwards.
    pub fn apply_workspace_visibility(&mut self, why: &str) {
        let ids = self.view_snapshot(|_| true);
        for id in ids {
            let visible = self.core.view_is_visible(id);
            let active = self.core.tabs_view_is_active(id);
            if let Some(view) = self.core.view_mut(id) {
                view.scene_enabled = visible && active;
            }
        }
        self.core.tabs_repair();
        debug!("Visibility: applied reason={}", why);
    }

    pub fn workspace_switch_on_head(&mut self, head: usize, workspace: i32, why: &str) {
        let before = self.core.workspace_current_for_head(head);
        self.core.workspace_switch_on_head(head, workspace);
        self.apply_workspace_visibility(why);
        if self.core.workspace_current_for_head(head) != before {
            self.fire_change_workspace_bindings();
        }
        self.refocus(why);
    }

    /// Workspace switch for command dispatch: the head under the cursor.
    pub(crate) fn hooks_workspace_switch(&mut self, workspace: i32, why: &str) {
        let head = self.head_at_cursor();
        self.workspace_switch_on_head(head, workspace, why);
    }

    #[must_use]
    pub(crate) fn hooks_workspace_current(&self) -> i32 {
        self.core.workspace_current_for_head(self.head_at_cursor())
    }

    fn fire_change_workspace_bindings(&mut self) {
        // Workspace-changed bindings must not retrigger themselves
        if self.in_change_workspace {
            return;
        }
        if let Some(index) =
            key_map::match_change_workspace(&self.key_bindings, self.key_mode.as_deref())
        {
            let binding = self.key_bindings[index].clone();
            let prev_scope = self.cmdlang_scope;
            self.cmdlang_scope = index as u64 + 1;
            self.in_change_workspace = true;
            self.exec_action(binding.action, binding.arg, binding.cmd.as_deref(), None, 0);
            self.in_change_workspace = false;
            self.cmdlang_scope = prev_scope;
        }
    }

    // --- input dispatch ---

    pub fn handle_key(&mut self, keycode: u32, sym: u32, modifiers: u32) -> bool {
        let Some(m) = key_map::match_key(
            &self.key_bindings,
            keycode,
            sym,
            modifiers,
            self.key_mode.as_deref(),
        ) else {
            return false;
        };
        let binding = self.key_bindings[m.index].clone();
        let prev_scope = self.cmdlang_scope;
        let prev_placeholder = self.placeholder_keycode;
        self.cmdlang_scope = m.index as u64 + 1;
        self.placeholder_keycode = m.placeholder_keycode;
        let handled = self.exec_action(binding.action, binding.arg, binding.cmd.as_deref(), None, 0);
        self.cmdlang_scope = prev_scope;
        self.placeholder_keycode = prev_placeholder;
        handled
    }

    pub fn handle_button(
        &mut self,
        context: MouseContext,
        event: MouseEventKind,
        button: u32,
        modifiers: u32,
        target: Option<ViewId>,
    ) -> bool {
        let Some(index) = mouse_map::match_button(
            &self.mouse_bindings,
            context,
            event,
            button,
            modifiers,
            self.key_mode.as_deref(),
        ) else {
            return false;
        };
        let binding = self.mouse_bindings[index].clone();
        let prev_scope = self.cmdlang_scope;
        let prev_button = self.current_button;
        // Scopes are partitioned so a mouse binding never shares togglecmd
        // rotation state with a key binding at the same index
        self.cmdlang_scope = (index as u64 + 1) << 32;
        self.current_button = button;
        let handled =
            self.exec_action(binding.action, binding.arg, binding.cmd.as_deref(), target, 0);
        self.cmdlang_scope = prev_scope;
        self.current_button = prev_button;
        handled
    }

    pub fn handle_motion(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
        if self.grab.mode != GrabMode::Passthrough {
            if let (Some(id), Some((fx, fy, fw, fh))) =
                (self.grab.view, self.grab.geometry_for_cursor((x, y)))
            {
                match self.grab.mode {
                    GrabMode::Move => {
                        let (fx, fy) = self.snap_frame(fx, fy, fw, fh);
                        self.view_move_frame(id, fx, fy, "grab-move");
                    }
                    GrabMode::Resize => {
                        self.grab.last_w = fw;
                        self.grab.last_h = fh;
                        self.view_move_resize_frame(id, Rect::new(fx, fy, fw, fh), "grab-resize");
                    }
                    GrabMode::Passthrough => {}
                }
            }
            return;
        }
        self.update_pointer_focus(FocusReason::PointerMotion, "pointer-motion");
    }

    /// Click focus for presses no binding consumed: focus the view under
    /// the cursor and raise it when the screen's click-raises flag is set.
    pub fn handle_click_focus(&mut self) {
        let Some(id) = self
            .scene
            .view_at(&self.core, &self.decor_theme, self.cursor.0, self.cursor.1)
        else {
            return;
        };
        self.focus_view(id, FocusReason::PointerClick);
        let click_raises = self
            .screen_config_at(self.cursor.0, self.cursor.1)
            .focus
            .click_raises;
        if click_raises {
            self.raise_view(id, "click");
        }
    }

    pub fn handle_button_release(&mut self, button: u32) {
        if self.grab.mode == GrabMode::Passthrough || button != self.grab.button {
            return;
        }
        let mode = self.grab.mode;
        let view = self.grab.view;
        let tab_attach = self.grab.tab_attach_enabled;
        self.grab.end();

        if mode == GrabMode::Move {
            if let Some(id) = view {
                if tab_attach {
                    self.drag_attach_on_release(id);
                }
                if let Some(v) = self.core.view(id) {
                    debug!("Move: {:?} x={} y={}", id, v.x, v.y);
                }
            }
        }
        self.update_pointer_focus(FocusReason::PointerMotion, "grab-end");
    }

    fn drag_attach_on_release(&mut self, id: ViewId) {
        let had_group = self.core.view(id).is_some_and(|v| v.tab_group.is_some());
        // Hit-test beneath the dragged view
        let restore = self.core.view(id).map(|v| v.scene_enabled);
        if let Some(view) = self.core.view_mut(id) {
            view.scene_enabled = false;
        }
        let anchor = self
            .scene
            .view_at(&self.core, &self.decor_theme, self.cursor.0, self.cursor.1);
        if let (Some(view), Some(enabled)) = (self.core.view_mut(id), restore) {
            view.scene_enabled = enabled;
        }

        let cfg = self.screen_config_at(self.cursor.0, self.cursor.1);
        let mut allow = anchor.is_some_and(|a| a != id);
        if allow && cfg.tabs.attach_area == fluxway_core::screen_config::TabAttachArea::Titlebar {
            let anchor_id = anchor.expect("checked above");
            let hit = self
                .core
                .view(anchor_id)
                .map(|v| v.decor_hit_test(&self.decor_theme, self.cursor.0, self.cursor.1));
            allow = hit.is_some_and(|h| {
                h.kind == fluxway_core::state::view::DecorHitKind::Titlebar
            });
        }

        if allow {
            let anchor = anchor.expect("checked above");
            if had_group {
                self.core.tabs_detach(id, "drag");
            }
            if let Some(affected) = self.core.tabs_attach(id, anchor, "drag") {
                for member in affected {
                    self.configure_view(member);
                }
                self.core.tabs_activate(id, "drag-attach");
            }
        } else if had_group {
            self.core.tabs_detach(id, "drag");
        }
    }

    // --- command execution ---

    /// Run one textual command line outside any binding (dialog, remote).
    pub fn execute_command_line(&mut self, line: &str) -> bool {
        lang::execute_line(self, line, None, 0)
    }

    pub(crate) fn resolve_target(&self, target: Option<ViewId>) -> Option<ViewId> {
        target.or(self.core.focused)
    }

    #[must_use]
    pub(crate) fn pattern_env(&self) -> PatternEnv<'_> {
        PatternEnv {
            core: &self.core,
            outputs: &self.outputs,
            cursor: Some(self.cursor),
            current_ws: self.hooks_workspace_current(),
        }
    }

    /// Snapshot of ids so bulk mutations never iterate a moving list.
    pub(crate) fn view_snapshot(&self, filter: impl Fn(&View) -> bool) -> Vec<ViewId> {
        self.core
            .views_in_map_order()
            .filter(|v| filter(v))
            .map(|v| v.id)
            .collect()
    }

    pub(crate) fn pattern_snapshot(
        &mut self,
        pattern: &str,
        filter: impl Fn(&View) -> bool,
    ) -> Vec<ViewId> {
        let compiled = ClientPattern::parse(pattern);
        let env = self.pattern_env();
        self.core
            .views_in_map_order()
            .filter(|v| filter(v) && compiled.matches(&env, v))
            .map(|v| v.id)
            .collect()
    }

    /// The exhaustive dispatcher: one arm per action. Returns whether a
    /// mutation occurred so mouse dispatch can fall through.
    pub fn exec_action(
        &mut self,
        action: Action,
        arg: i32,
        cmd: Option<&str>,
        target: Option<ViewId>,
        depth: u32,
    ) -> bool {
        let view = self.resolve_target(target);
        match action {
            Action::Exit => {
                self.ui.push(UiRequest::Terminate);
                true
            }
            Action::Restart => {
                self.ui.push(UiRequest::Restart {
                    cmd: cmd.map(str::to_string),
                });
                true
            }
            Action::Exec => {
                let Some(cmd) = cmd else { return false };
                let _ = spawn::spawn(cmd);
                true
            }
            Action::SetEnv => {
                self.set_env_cmd(cmd.unwrap_or(""));
                true
            }
            Action::CommandDialog => {
                self.ui.push(UiRequest::CommandDialog {
                    prompt: String::new(),
                    initial: String::new(),
                });
                true
            }
            Action::Reconfigure => self.reconfigure_from_disk(),
            Action::ReloadStyle => {
                self.reload_style();
                true
            }
            Action::SetStyle => {
                self.set_style(cmd.unwrap_or(""));
                true
            }
            Action::SaveRc => {
                self.save_rc();
                true
            }
            Action::SetResourceValue => {
                self.set_resource_value(cmd.unwrap_or(""));
                true
            }
            Action::SetResourceValueDialog => {
                self.ui.push(UiRequest::CommandDialog {
                    prompt: "SetResourceValue ".to_string(),
                    initial: String::new(),
                });
                true
            }
            Action::KeyMode => {
                let mode = cmd.map(str::to_string);
                self.key_mode = mode.clone();
                self.ui.push(UiRequest::KeyModeChanged { mode });
                true
            }
            Action::If => {
                let Some(cmd) = cmd.map(str::to_string) else {
                    return false;
                };
                lang::execute_if(self, &cmd, view, depth)
            }
            Action::Foreach => {
                let Some(cmd) = cmd.map(str::to_string) else {
                    return false;
                };
                lang::execute_foreach(self, &cmd, depth)
            }
            Action::ToggleCmd => {
                let Some(cmd) = cmd.map(str::to_string) else {
                    return false;
                };
                lang::execute_togglecmd(self, &cmd, view, depth)
            }
            Action::Delay => {
                let Some(cmd) = cmd.map(str::to_string) else {
                    return false;
                };
                lang::execute_delay(self, &cmd, depth)
            }
            Action::Macro => {
                let Some(cmd) = cmd.map(str::to_string) else {
                    return false;
                };
                lang::execute_macro(self, &cmd, target, depth)
            }
            Action::FocusNext => self.cycle_focus(false, false, cmd),
            Action::FocusPrev => self.cycle_focus(true, false, cmd),
            Action::FocusNextGroup => self.cycle_focus(false, true, cmd),
            Action::FocusPrevGroup => self.cycle_focus(true, true, cmd),
            Action::GotoWindow => self.goto_window(arg, cmd),
            Action::Attach => {
                self.attach_pattern(cmd.unwrap_or(""));
                true
            }
            Action::ShowDesktop => {
                self.show_desktop();
                true
            }
            Action::ArrangeWindows => {
                self.arrange_windows(arg, cmd.unwrap_or(""));
                true
            }
            Action::Unclutter => {
                self.unclutter(cmd.unwrap_or(""));
                true
            }
            Action::TabNext => {
                if let Some(id) = view {
                    if let Some(next) = self.core.tabs_pick_next(id) {
                        self.core.tabs_activate(next, "keybinding-nexttab");
                        self.focus_view(next, FocusReason::Keybinding);
                    }
                }
                true
            }
            Action::TabPrev => {
                if let Some(id) = view {
                    if let Some(prev) = self.core.tabs_pick_prev(id) {
                        self.core.tabs_activate(prev, "keybinding-prevtab");
                        self.focus_view(prev, FocusReason::Keybinding);
                    }
                }
                true
            }
            Action::TabGoto => {
                if let Some(id) = view {
                    if let Some(pick) = self.core.tabs_pick_index0(id, arg.max(0) as usize) {
                        self.core.tabs_activate(pick, "keybinding-tab");
                        self.focus_view(pick, FocusReason::Keybinding);
                    }
                }
                true
            }
            Action::TabActivate => {
                // Click-site tab picking lives with the tab bar; the active
                // member is the one to focus here
                if let Some(id) = view {
                    self.core.tabs_activate(id, "keybinding-activatetab");
                    self.focus_view(id, FocusReason::Keybinding);
                    self.raise_view(id, "activatetab");
                }
                true
            }
            Action::MoveTabLeft => {
                if let Some(id) = view {
                    self.core.tabs_move_left(id, "keybinding-movetableft");
                }
                true
            }
            Action::MoveTabRight => {
                if let Some(id) = view {
                    self.core.tabs_move_right(id, "keybinding-movetabright");
                }
                true
            }
            Action::DetachClient => {
                if let Some(id) = view {
                    self.core.tabs_detach(id, "keybinding-detachclient");
                    self.focus_view(id, FocusReason::Keybinding);
                    self.raise_view(id, "detachclient");
                }
                true
            }
            Action::ToggleMaximize => {
                if let Some(id) = view {
                    let on = self.core.view(id).is_some_and(|v| v.maximized);
                    self.set_maximized(id, !on);
                }
                true
            }
            Action::ToggleMaximizeHorizontal => {
                if let Some(id) = view {
                    self.toggle_maximize_axis(id, true);
                }
                true
            }
            Action::ToggleMaximizeVertical => {
                if let Some(id) = view {
                    self.toggle_maximize_axis(id, false);
                }
                true
            }
            Action::ToggleFullscreen => {
                if let Some(id) = view {
                    let on = self.core.view(id).is_some_and(|v| v.fullscreen);
                    self.set_fullscreen(id, !on, None);
                }
                true
            }
            Action::ToggleMinimize => {
                let min_view = view.or_else(|| {
                    let cur = self.hooks_workspace_current();
                    self.core
                        .views_in_map_order()
                        .find(|v| v.mapped && v.minimized && (v.sticky || v.workspace == cur))
                        .map(|v| v.id)
                });
                if let Some(id) = min_view {
                    let on = self.core.view(id).is_some_and(|v| v.minimized);
                    self.set_minimized(id, !on, "keybinding");
                }
                true
            }
            Action::Deiconify => {
                self.deiconify(cmd.unwrap_or(""));
                true
            }
            Action::WorkspaceSwitch => {
                self.hooks_workspace_switch(arg, "switch");
                true
            }
            Action::WorkspaceNext => {
                if arg == 0 && cmd.is_none() {
                    self.workspace_toggle_prev("switch-toggle");
                    return true;
                }
                let cur = self.hooks_workspace_current();
                let count = self.core.workspace_count();
                let ws = step_workspace(cur + arg, count, cmd == Some("nowrap"));
                self.hooks_workspace_switch(ws, "switch-next");
                true
            }
            Action::WorkspacePrev => {
                if arg == 0 && cmd.is_none() {
                    self.workspace_toggle_prev("switch-toggle");
                    return true;
                }
                let cur = self.hooks_workspace_current();
                let count = self.core.workspace_count();
                let ws = step_workspace(cur - arg, count, cmd == Some("nowrap"));
                self.hooks_workspace_switch(ws, "switch-prev");
                true
            }
            Action::AddWorkspace => {
                self.add_workspace();
                true
            }
            Action::RemoveLastWorkspace => {
                self.remove_last_workspace();
                true
            }
            Action::SetWorkspaceName => {
                self.set_workspace_name(cmd.unwrap_or(""));
                true
            }
            Action::SetWorkspaceNameDialog => {
                self.set_workspace_name_dialog();
                true
            }
            Action::SendToWorkspace => {
                self.core.move_focused_to_workspace(arg);
                self.apply_workspace_visibility("move-focused");
                true
            }
            Action::TakeToWorkspace => {
                self.core.move_focused_to_workspace(arg);
                self.hooks_workspace_switch(arg, "switch");
                true
            }
            Action::SendToRelWorkspace => {
                let cur = self.hooks_workspace_current();
                let count = self.core.workspace_count();
                self.core
                    .move_focused_to_workspace(wrap_workspace(cur + arg, count));
                self.apply_workspace_visibility("move-focused");
                true
            }
            Action::TakeToRelWorkspace => {
                let cur = self.hooks_workspace_current();
                let count = self.core.workspace_count();
                let ws = wrap_workspace(cur + arg, count);
                self.core.move_focused_to_workspace(ws);
                self.hooks_workspace_switch(ws, "switch");
                true
            }
            Action::SetHead => {
                if let Some(id) = view {
                    self.view_set_head(id, arg);
                }
                true
            }
            Action::SendToRelHead => {
                if let Some(id) = view {
                    self.view_send_to_rel_head(id, arg);
                }
                true
            }
            Action::Close | Action::Kill => {
                if let Some(id) = view {
                    self.close_view(id, action == Action::Kill);
                }
                true
            }
            Action::CloseAllWindows => {
                self.close_all_windows();
                true
            }
            Action::WindowMenu => {
                if let Some(id) = view {
                    self.ui.push(UiRequest::OpenWindowMenu {
                        id,
                        x: self.cursor.0,
                        y: self.cursor.1,
                    });
                }
                true
            }
            Action::RootMenu => {
                self.ui.push(UiRequest::OpenRootMenu {
                    x: self.cursor.0,
                    y: self.cursor.1,
                    menu_file: cmd.map(str::to_string),
                });
                true
            }
            Action::WorkspaceMenu => {
                self.ui.push(UiRequest::OpenWorkspaceMenu {
                    x: self.cursor.0,
                    y: self.cursor.1,
                });
                true
            }
            Action::ClientMenu => {
                self.ui.push(UiRequest::OpenClientMenu {
                    x: self.cursor.0,
                    y: self.cursor.1,
                    pattern: cmd.map(str::to_string),
                });
                true
            }
            Action::HideMenus => {
                self.ui.push(UiRequest::CloseMenus { why: "binding" });
                true
            }
            Action::ToggleToolbarHidden => {
                self.ui.push(UiRequest::ToggleToolbarHidden);
                true
            }
            Action::ToggleToolbarAbove => {
                self.ui.push(UiRequest::ToggleToolbarAbove);
                true
            }
            Action::ToggleSlitHidden => {
                self.ui.push(UiRequest::ToggleSlitHidden);
                true
            }
            Action::ToggleSlitAbove => {
                self.ui.push(UiRequest::ToggleSlitAbove);
                true
            }
            Action::Raise => {
                if let Some(id) = view {
                    self.raise_view(id, "binding");
                }
                true
            }
            Action::Lower => {
                if let Some(id) = view {
                    self.lower_view(id, "binding");
                }
                true
            }
            Action::RaiseLayer => {
                if let Some(id) = view {
                    self.step_layer(id, arg);
                }
                true
            }
            Action::LowerLayer => {
                if let Some(id) = view {
                    self.step_layer(id, -arg);
                }
                true
            }
            Action::SetLayer => {
                if let Some(id) = view {
                    self.set_layer(id, arg);
                }
                true
            }
            Action::Focus => {
                if let Some(id) = view {
                    self.focus_view(id, FocusReason::Keybinding);
                }
                true
            }
            Action::FocusDir => {
                if let (Some(id), Some(dir)) = (view, Direction::from_arg(arg)) {
                    if let Some(candidate) = self.pick_dir_focus_candidate(id, dir) {
                        if self.core.focused != Some(candidate) {
                            self.focus_view(candidate, FocusReason::Cycle);
                        }
                    }
                }
                true
            }
            Action::SetXProp => {
                let (Some(id), Some(cmd)) = (view, cmd) else {
                    return false;
                };
                self.set_xprop_cmd(id, cmd)
            }
            Action::ToggleShade => {
                if let Some(id) = view {
                    let on = self.core.view(id).is_some_and(|v| v.shaded);
                    self.set_shaded(id, !on, "keybinding");
                }
                true
            }
            Action::ShadeOn => {
                if let Some(id) = view {
                    self.set_shaded(id, true, "keybinding");
                }
                true
            }
            Action::ShadeOff => {
                if let Some(id) = view {
                    self.set_shaded(id, false, "keybinding");
                }
                true
            }
            Action::ToggleStick => {
                if let Some(id) = view {
                    let on = self.core.view(id).is_some_and(|v| v.sticky);
                    self.set_sticky(id, !on);
                }
                true
            }
            Action::StickOn => {
                if let Some(id) = view {
                    if !self.core.view(id).is_some_and(|v| v.sticky) {
                        self.set_sticky(id, true);
                    }
                }
                true
            }
            Action::StickOff => {
                if let Some(id) = view {
                    if self.core.view(id).is_some_and(|v| v.sticky) {
                        self.set_sticky(id, false);
                    }
                }
                true
            }
            Action::SetAlpha => {
                if let Some(id) = view {
                    self.set_alpha_cmd(id, cmd.unwrap_or(""));
                }
                true
            }
            Action::ToggleDecor => {
                if let Some(id) = view {
                    self.toggle_decor(id);
                }
                true
            }
            Action::SetDecor => {
                if let Some(id) = view {
                    self.set_decor(id, cmd.unwrap_or(""));
                }
                true
            }
            Action::SetTitle => {
                if let Some(id) = view {
                    self.set_title_override(id, cmd.unwrap_or(""), "keybinding");
                }
                true
            }
            Action::SetTitleDialog => {
                if let Some(id) = view {
                    self.set_title_dialog(id);
                }
                true
            }
            Action::MarkWindow => {
                self.mark_window(view, self.placeholder_keycode);
                true
            }
            Action::GotoMarkedWindow => {
                self.goto_marked_window(self.placeholder_keycode);
                true
            }
            Action::StartMoving => {
                if let Some(id) = view {
                    self.focus_view(id, FocusReason::Keybinding);
                    self.raise_view(id, "move");
                    let geom = self.frame_geom(id);
                    self.grab
                        .begin_move(id, self.current_button, self.cursor, geom);
                }
                true
            }
            Action::StartResizing => {
                if let Some(id) = view {
                    self.focus_view(id, FocusReason::Keybinding);
                    self.raise_view(id, "resize");
                    let frame = self
                        .core
                        .view(id)
                        .map(|v| v.frame_box(&self.decor_theme))
                        .unwrap_or_default();
                    let edges = resize_edges::from_start_resizing_args(
                        frame,
                        self.cursor.0,
                        self.cursor.1,
                        cmd.unwrap_or(""),
                    );
                    let geom = self.frame_geom(id);
                    self.grab
                        .begin_resize(id, self.current_button, edges, self.cursor, geom);
                }
                true
            }
            Action::StartTabbing => {
                if let Some(id) = view {
                    if !self.core.tabs_view_is_active(id) {
                        self.core.tabs_activate(id, "keybinding-starttabbing");
                    }
                    self.focus_view(id, FocusReason::Keybinding);
                    self.raise_view(id, "starttabbing");
                    let geom = self.frame_geom(id);
                    self.grab
                        .begin_tabbing(id, self.current_button, self.cursor, geom);
                }
                true
            }
            Action::MoveTo => {
                if let Some(id) = view {
                    return self.move_to_cmd(id, cmd.unwrap_or(""));
                }
                true
            }
            Action::MoveRel => {
                if let Some(id) = view {
                    return self.move_rel_cmd(id, arg, cmd.unwrap_or(""));
                }
                true
            }
            Action::ResizeTo => {
                if let Some(id) = view {
                    return self.resize_to_cmd(id, cmd.unwrap_or(""));
                }
                true
            }
            Action::ResizeRel => {
                if let Some(id) = view {
                    return self.resize_rel_cmd(id, arg, cmd.unwrap_or(""));
                }
                true
            }
        }
    }

    /// Snap a dragged frame to the usable-box edges of the cursor's head
    /// when it lands within the configured threshold.
    fn snap_frame(&self, fx: i32, fy: i32, fw: i32, fh: i32) -> (i32, i32) {
        let threshold = self
            .screen_config_at(self.cursor.0, self.cursor.1)
            .edge_snap_threshold;
        if threshold <= 0 {
            return (fx, fy);
        }
        let Some(usable) = self.usable_box_for_head(self.head_at_cursor()) else {
            return (fx, fy);
        };
        let mut out_x = fx;
        let mut out_y = fy;
        if (fx - usable.x).abs() <= threshold {
            out_x = usable.x;
        } else if ((fx + fw) - (usable.x + usable.width)).abs() <= threshold {
            out_x = usable.x + usable.width - fw;
        }
        if (fy - usable.y).abs() <= threshold {
            out_y = usable.y;
        } else if ((fy + fh) - (usable.y + usable.height)).abs() <= threshold {
            out_y = usable.y + usable.height - fh;
        }
        (out_x, out_y)
    }

    fn frame_geom(&self, id: ViewId) -> (i32, i32, i32, i32) {
        self.core
            .view(id)
            .map(|v| {
                let frame = v.frame_box(&self.decor_theme);
                (frame.x, frame.y, frame.width, frame.height)
            })
            .unwrap_or_default()
    }

    fn toggle_maximize_axis(&mut self, id: ViewId, horizontal: bool) {
        if self.core.view(id).is_some_and(|v| v.fullscreen) {
            self.set_fullscreen(id, false, None);
        }
        // A full maximize that lost an axis flag somewhere normalizes first
        if let Some(view) = self.core.view_mut(id) {
            if view.maximized && (!view.maximized_h || !view.maximized_v) {
                view.maximized_h = true;
                view.maximized_v = true;
            }
        }
        let (h, v) = self
            .core
            .view(id)
            .map(|view| {
                if horizontal {
                    (!view.maximized_h, view.maximized_v)
                } else {
                    (view.maximized_h, !view.maximized_v)
                }
            })
            .unwrap_or((false, false));
        self.set_maximized_axes(id, h, v);
    }
}

impl CmdLangHost for Server {
    fn exec(
        &mut self,
        action: Action,
        arg: i32,
        cmd: Option<&str>,
        target: Option<ViewId>,
        depth: u32,
    ) -> bool {
        self.exec_action(action, arg, cmd, target, depth)
    }

    fn matches(&mut self, pattern: &str, target: Option<ViewId>) -> bool {
        let Some(id) = self.resolve_target(target) else {
            return false;
        };
        let compiled = ClientPattern::parse(pattern);
        let env = self.pattern_env();
        let Some(view) = self.core.view(id) else {
            return false;
        };
        compiled.matches(&env, view)
    }

    fn view_ids(&self) -> Vec<ViewId> {
        self.core.map_order().to_vec()
    }

    fn view_create_seq(&self, id: ViewId) -> u64 {
        self.core.view(id).map_or(0, View::create_seq)
    }

    fn view_in_tab_group(&self, id: ViewId) -> bool {
        self.core.view(id).is_some_and(|v| v.tab_group.is_some())
    }

    fn tabs_view_is_active(&self, id: ViewId) -> bool {
        self.core.tabs_view_is_active(id)
    }

    fn toggle_index(&mut self, scope: u64, key: &str, len: usize) -> usize {
        self.toggle_states.next_index(scope, key, len)
    }

    fn delay_schedule(&mut self, scope: u64, key: &str, cmd_line: &str, usec: u64) -> bool {
        let msec = lang::delay_msec(usec);
        self.timers.arm_delay(scope, key, cmd_line, msec, self.now);
        true
    }

    fn cmdlang_scope(&self) -> u64 {
        self.cmdlang_scope
    }
}

pub(crate) fn wrap_workspace(ws: i32, count: i32) -> i32 {
    if count < 1 {
        return 0;
    }
    ws.rem_euclid(count)
}

fn step_workspace(ws: i32, count: i32, nowrap: bool) -> i32 {
    if nowrap {
        ws.clamp(0, count - 1)
    } else {
        wrap_workspace(ws, count)
    }
}
