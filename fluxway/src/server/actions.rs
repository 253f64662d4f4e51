//! Action implementations behind the executor: bulk window operations,
//! head moves, marked windows, title/decor/alpha mutators, workspace
//! management and the persisted rc state.

use std::path::PathBuf;

use fluxway_core::cmd::{
    ARRANGE_STACK_LEFT, ARRANGE_STACK_RIGHT, ARRANGE_STACK_TOP, ARRANGE_VERTICAL,
};
use fluxway_core::config::{WINDOW_MANAGER_NAME, WORKSPACE_LIMIT};
use fluxway_core::debug;
use fluxway_core::geometry::head_map::head_count;
use fluxway_core::geometry::place::{ColDir, Placement, PlacementStrategy, RowDir};
use fluxway_core::geometry::Rect;
use fluxway_core::rc::{self, InitUpdate};
use fluxway_core::screen_config::FocusModel;
use fluxway_core::state::layer::StackLayer;
use fluxway_core::state::view::{decor_mask_has_frame, decor_mask_parse, View, ViewId};

use crate::server::shim::{ProtocolOp, UiRequest};
use crate::server::{FocusReason, Server};

fn parse_i32(tok: &str) -> Option<i32> {
    tok.parse::<i32>().ok()
}

impl Server {
    // --- attach / bulk window ops ---

    /// `Attach [pattern]`: first visible match anchors, the rest become its
    /// tab siblings.
    pub(crate) fn attach_pattern(&mut self, pattern: &str) {
        let matches = self.pattern_snapshot(pattern, |v| v.mapped && !v.in_slit);
        let mut anchor: Option<ViewId> = None;
        let mut attached = 0usize;
        for id in matches {
            match anchor {
                None => {
                    if self.core.view(id).is_some_and(|v| v.minimized) {
                        continue;
                    }
                    anchor = Some(id);
                }
                Some(anchor_id) => {
                    if let Some(affected) = self.core.tabs_attach(id, anchor_id, "attach-cmd") {
                        for member in affected {
                            self.configure_view(member);
                        }
                        attached += 1;
                    }
                }
            }
        }
        debug!(
            "Attach: anchor={:?} attached={} pattern={}",
            anchor, attached, pattern
        );
    }

    /// Minimize every visible non-desktop view, or restore them when
    /// nothing is left to minimize.
    pub(crate) fn show_desktop(&mut self) {
        let ws = self.hooks_workspace_current();
        let ids = self.view_snapshot(|v| {
            v.mapped
                && !v.in_slit
                && (v.sticky || v.workspace == ws)
                && v.base_layer != StackLayer::Background
        });
        let any_unminimized = ids
            .iter()
            .any(|id| self.core.view(*id).is_some_and(|v| !v.minimized));
        if any_unminimized {
            for id in &ids {
                if self.core.view(*id).is_some_and(|v| !v.minimized) {
                    self.set_minimized(*id, true, "showdesktop");
                }
            }
        } else {
            for id in ids.iter().rev() {
                if self.core.view(*id).is_some_and(|v| v.minimized) {
                    self.set_minimized(*id, false, "showdesktop");
                }
            }
        }
        debug!(
            "ShowDesktop: ws={} action={} count={}",
            ws,
            if any_unminimized { "minimize" } else { "restore" },
            ids.len()
        );
    }

    fn arrange_is_stacked(method: i32) -> bool {
        method >= ARRANGE_STACK_LEFT
    }

    fn arrange_split(usable: Rect, method: i32) -> (Rect, Rect) {
        if !Self::arrange_is_stacked(method) {
            return (usable, Rect::default());
        }
        if method == ARRANGE_STACK_LEFT || method == ARRANGE_STACK_RIGHT {
            let tile_w = usable.width / 2;
            let main_w = usable.width - tile_w;
            let (tile_x, main_x) = if method == ARRANGE_STACK_LEFT {
                (usable.x, usable.x + tile_w)
            } else {
                (usable.x + main_w, usable.x)
            };
            (
                Rect::new(tile_x, usable.y, tile_w, usable.height),
                Rect::new(main_x, usable.y, main_w, usable.height),
            )
        } else {
            let tile_h = usable.height / 2;
            let main_h = usable.height - tile_h;
            let (tile_y, main_y) = if method == ARRANGE_STACK_TOP {
                (usable.y, usable.y + tile_h)
            } else {
                (usable.y + main_h, usable.y)
            };
            (
                Rect::new(usable.x, tile_y, usable.width, tile_h),
                Rect::new(usable.x, main_y, usable.width, main_h),
            )
        }
    }

    fn arrange_views_in_box(&mut self, mut ids: Vec<ViewId>, area: Rect, method: i32) {
        if ids.is_empty() || area.is_empty() {
            return;
        }
        let count = ids.len() as u32;
        let mut cols = floor_sqrt(count).max(1);
        let mut rows = count.div_ceil(cols);
        let rotate = method == ARRANGE_VERTICAL || (method == 0 && area.width < area.height);
        if rotate {
            std::mem::swap(&mut cols, &mut rows);
        }
        let cols = cols.max(1) as i32;
        let rows = rows.max(1) as i32;
        let cell_w = area.width / cols;
        let cell_h = area.height / rows;

        for i in 0..rows {
            for j in 0..cols {
                if ids.is_empty() {
                    return;
                }
                let frame_x = area.x + j * cell_w;
                let frame_y = area.y + i * cell_h;
                let frame_w = if j + 1 == cols {
                    area.x + area.width - frame_x
                } else {
                    cell_w
                };
                let frame_h = if i + 1 == rows {
                    area.y + area.height - frame_y
                } else {
                    cell_h
                };
                let cell_cx = frame_x + frame_w / 2;
                let cell_cy = frame_y + frame_h / 2;

                // Closest frame centroid wins the cell, create_seq breaking ties
                let mut best_idx = 0usize;
                let mut best_dist = i64::MAX;
                let mut best_seq = u64::MAX;
                for (k, id) in ids.iter().enumerate() {
                    let Some(view) = self.core.view(*id) else { continue };
                    let frame = view.frame_box(&self.decor_theme);
                    let (cx, cy) = frame.center();
                    let dx = i64::from(cx - cell_cx);
                    let dy = i64::from(cy - cell_cy);
                    let dist = dx * dx + dy * dy;
                    let seq = view.create_seq();
                    if dist < best_dist || (dist == best_dist && seq < best_seq) {
                        best_idx = k;
                        best_dist = dist;
                        best_seq = seq;
                    }
                }
                let pick = ids.swap_remove(best_idx);
                self.view_prepare_manual_geometry(pick);
                if self.view_move_resize_frame(
                    pick,
                    Rect::new(frame_x, frame_y, frame_w, frame_h),
                    "arrange-windows",
                ) {
                    debug!(
                        "ArrangeWindows: view={:?} x={} y={} w={} h={}",
                        pick, frame_x, frame_y, frame_w, frame_h
                    );
                }
            }
        }
    }

    /// Tile the filtered set into a near-square grid; stack variants carve
    /// out a main cell for the focused view first.
    pub(crate) fn arrange_windows(&mut self, method: i32, pattern: &str) {
        let head = self.head_at_cursor();
        let Some(usable) = self.usable_box_for_head(head) else {
            return;
        };
        let ws = self.hooks_workspace_current();
        let mut ids = self.pattern_snapshot(pattern, |v| {
            v.mapped
                && !v.minimized
                && !v.in_slit
                && (v.sticky || v.workspace == ws)
                && v.head == head
        });

        let mut main: Option<ViewId> = None;
        if Self::arrange_is_stacked(method) && !ids.is_empty() {
            let focused = self.core.focused;
            if let Some(pos) = focused.and_then(|f| ids.iter().position(|id| *id == f)) {
                main = Some(ids.remove(pos));
            } else {
                main = ids.pop();
            }
        }
        let total = ids.len() + usize::from(main.is_some());

        let (tile, main_box) = Self::arrange_split(usable, method);
        self.arrange_views_in_box(ids, tile, method);
        if let Some(main) = main {
            if !main_box.is_empty() {
                self.view_prepare_manual_geometry(main);
                self.view_move_resize_frame(main, main_box, "arrange-windows-main");
            }
        }
        debug!(
            "ArrangeWindows: head={} ws={} method={} count={} pattern={}",
            head, ws, method, total, pattern
        );
        self.strict_mousefocus_recheck("arrange-windows");
    }

    /// Move matching views off-screen, then re-place them min-overlap.
    pub(crate) fn unclutter(&mut self, pattern: &str) {
        let head = self.head_at_cursor();
        let Some(usable) = self.usable_box_for_head(head) else {
            return;
        };
        let ws = self.hooks_workspace_current();
        let ids = self.pattern_snapshot(pattern, |v| {
            v.mapped
                && !v.minimized
                && !v.in_slit
                && !v.fullscreen
                && !v.maximized
                && !v.maximized_h
                && !v.maximized_v
                && (v.sticky || v.workspace == ws)
                && v.head == head
        });
        if ids.is_empty() {
            return;
        }

        for id in &ids {
            let frame = self
                .core
                .view(*id)
                .map(|v| v.frame_box(&self.decor_theme));
            if let Some(frame) = frame {
                self.view_move_frame(*id, -frame.width, -frame.height, "unclutter-clean");
            }
        }

        let strategy = if usable.width >= usable.height {
            PlacementStrategy::RowMinOverlap
        } else {
            PlacementStrategy::ColMinOverlap
        };
        let mut placed_frames: Vec<Rect> = Vec::new();
        for id in &ids {
            let Some(frame) = self.core.view(*id).map(|v| v.frame_box(&self.decor_theme))
            else {
                continue;
            };
            let placement = Placement {
                strategy,
                row_dir: RowDir::LeftToRight,
                col_dir: ColDir::TopToBottom,
                occupied: &placed_frames,
                cascade_step: self.decor_theme.title_height,
            };
            let mut cascade = self.core.place_next;
            let (x, y) =
                placement.place_next(usable, frame.width, frame.height, self.cursor, &mut cascade);
            if self.view_move_frame(*id, x, y, "unclutter") {
                debug!("Unclutter: view={:?} x={} y={}", id, x, y);
                placed_frames.push(Rect::new(x, y, frame.width, frame.height));
            }
        }
        debug!(
            "Unclutter: head={} ws={} count={} pattern={}",
            head,
            ws,
            ids.len(),
            pattern
        );
        self.strict_mousefocus_recheck("unclutter");
    }

    pub(crate) fn strict_mousefocus_recheck(&mut self, why: &str) {
        let model = self
            .screen_config_at(self.cursor.0, self.cursor.1)
            .focus
            .model;
        if model != FocusModel::StrictMouseFocus {
            return;
        }
        self.update_pointer_focus(FocusReason::PointerMotion, why);
    }

    /// `Deiconify <mode> <dest>`.
    pub(crate) fn deiconify(&mut self, args: &str) {
        let ws = self.hooks_workspace_current();
        let head = self.head_at_cursor();

        let mut mode = DeiconifyMode::LastWorkspace;
        let mut dest = DeiconifyDest::Current;
        let mut toks = args.split_whitespace();
        if let Some(tok) = toks.next() {
            let Some(parsed) = DeiconifyMode::parse(tok) else {
                debug!("Deiconify: invalid mode={}", tok);
                return;
            };
            mode = parsed;
        }
        if let Some(tok) = toks.next() {
            let Some(parsed) = DeiconifyDest::parse(tok) else {
                debug!("Deiconify: invalid destination={}", tok);
                return;
            };
            dest = parsed;
        }
        if toks.next().is_some() {
            debug!("Deiconify: too many args: {}", args);
            return;
        }

        let workspace_limited = matches!(
            mode,
            DeiconifyMode::LastWorkspace | DeiconifyMode::AllWorkspace
        );
        let pick_one = matches!(mode, DeiconifyMode::LastWorkspace | DeiconifyMode::Last);
        let mut picks = self.view_snapshot(|v| {
            v.mapped
                && !v.in_slit
                && v.minimized
                && (!workspace_limited || v.sticky || v.workspace == ws)
        });
        if pick_one {
            picks.truncate(1);
        }
        if picks.is_empty() {
            debug!("Deiconify: head={} ws={} count=0", head, ws);
            return;
        }

        match dest {
            DeiconifyDest::Current => {
                for id in &picks {
                    if let Some(view) = self.core.view_mut(*id) {
                        if !view.sticky {
                            view.workspace = ws;
                        }
                    }
                }
            }
            DeiconifyDest::Origin => {
                let dest_ws = self.core.view(picks[0]).map_or(ws, |v| v.workspace);
                self.workspace_switch_on_head(head, dest_ws, "deiconify-origin");
            }
            DeiconifyDest::OriginQuiet => {}
        }
        for id in &picks {
            self.set_minimized(*id, false, "deiconify");
        }
        debug!(
            "Deiconify: head={} ws={} count={}",
            head,
            ws,
            picks.len()
        );
    }

    pub(crate) fn close_all_windows(&mut self) {
        let ids = self.view_snapshot(|v| v.mapped && !v.in_slit);
        debug!("CloseAllWindows: count={}", ids.len());
        for id in ids {
            self.close_view(id, false);
        }
    }

    // --- heads ---

    fn move_view_to_head(&mut self, id: ViewId, head0: usize, why: &str) {
        let Some(dst) = self.output_box_for_head(head0) else {
            return;
        };
        let Some(view) = self.core.view(id) else {
            return;
        };
        let cur_w = view.current_width();
        let cur_h = view.current_height();
        if cur_w < 1 || cur_h < 1 {
            return;
        }

        if view.fullscreen {
            if let Some(view) = self.core.view_mut(id) {
                view.x = dst.x;
                view.y = dst.y;
                view.pending_width = dst.width;
                view.pending_height = dst.height;
                view.placed = true;
            }
            self.configure_view(id);
            let affected =
                self.core
                    .tabs_sync_geometry_from(id, true, dst.width, dst.height, why);
            for member in affected {
                self.configure_view(member);
            }
            self.update_view_head(id);
            debug!("Head: move fullscreen view={:?} head={}", id, head0 + 1);
            return;
        }

        if view.maximized || view.maximized_h || view.maximized_v {
            // Recompute the maximize box on the destination head
            let Some(target) = self.max_target_box(id, head0) else {
                return;
            };
            if target.is_empty() {
                return;
            }
            let view = self.core.view(id).expect("checked above");
            let saved = view.saved;
            let (max_h, max_v, maximized) = (view.maximized_h, view.maximized_v, view.maximized);
            let (mut x, mut w) = if max_h || maximized {
                (target.x, target.width)
            } else {
                (saved.x, if saved.width > 0 { saved.width } else { cur_w })
            };
            let (mut y, mut h) = if max_v || maximized {
                (target.y, target.height)
            } else {
                (saved.y, if saved.height > 0 { saved.height } else { cur_h })
            };
            let (left, top, right, bottom) = view.frame_extents(&self.decor_theme);
            if max_h || maximized {
                x += left;
                w -= left + right;
            }
            if max_v || maximized {
                y += top;
                h -= top + bottom;
            }
            if w < 1 || h < 1 {
                return;
            }
            if let Some(view) = self.core.view_mut(id) {
                view.x = x;
                view.y = y;
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
            debug!("Head: move maximized view={:?} head={}", id, head0 + 1);
            return;
        }

        let src_head = self.core.view(id).map_or(0, |v| v.head);
        let src = self.output_box_for_head(src_head).unwrap_or(dst);
        let view = self.core.view(id).expect("checked above");
        let frame = view.frame_box(&self.decor_theme);
        let (left, _, right, _) = view.frame_extents(&self.decor_theme);
        let border = left.max(right);

        // Edge-adjacent windows re-anchor to the same edge; everything else
        // keeps its proportional position
        let new_frame_x = if src.width > 0 && dst.width > 0 {
            let d = (src.x + src.width) - (frame.x + frame.width);
            if (src.x - frame.x).abs() > border && d.abs() <= border {
                dst.x + dst.width - (frame.width + d)
            } else {
                (i64::from(dst.width) * i64::from(frame.x - src.x) / i64::from(src.width)) as i32
                    + dst.x
            }
        } else {
            dst.x
        };
        let new_frame_y = if src.height > 0 && dst.height > 0 {
            let d = (src.y + src.height) - (frame.y + frame.height);
            if (src.y - frame.y).abs() > border && d.abs() <= border {
                dst.y + dst.height - (frame.height + d)
            } else {
                (i64::from(dst.height) * i64::from(frame.y - src.y) / i64::from(src.height)) as i32
                    + dst.y
            }
        } else {
            dst.y
        };

        self.view_move_frame(id, new_frame_x, new_frame_y, why);
        debug!("Head: move view={:?} head={} reason={}", id, head0 + 1, why);
    }

    /// `SetHead N`: one-based, negative counts from the last head.
    pub(crate) fn view_set_head(&mut self, id: ViewId, head: i32) {
        let heads = head_count(&self.outputs) as i32;
        if heads < 1 {
            return;
        }
        let mut num = head;
        if num == 0 {
            num = 1;
        }
        if num < 0 {
            num += heads + 1;
        }
        let num = num.clamp(1, heads);
        self.move_view_to_head(id, (num - 1) as usize, "sethead");
    }

    pub(crate) fn view_send_to_rel_head(&mut self, id: ViewId, delta: i32) {
        let heads = head_count(&self.outputs) as i32;
        if heads < 2 {
            return;
        }
        let delta = if delta == 0 { 1 } else { delta };
        let cur = self.core.view(id).map_or(0, |v| v.head) as i32;
        let next = (cur + delta).rem_euclid(heads);
        self.move_view_to_head(
            id,
            next as usize,
            if delta > 0 { "sendtonexthead" } else { "sendtoprevhead" },
        );
    }

    // --- marked windows ---

    pub(crate) fn mark_window(&mut self, view: Option<ViewId>, keycode: u32) {
        let Some(id) = view else {
            return;
        };
        if keycode == 0 {
            debug!("MarkWindow: missing placeholder keycode (use a placeholder binding)");
            return;
        }
        let Some(seq) = self.core.view(id).map(View::create_seq) else {
            return;
        };
        self.marked.insert(keycode, seq);
        debug!("MarkWindow: keycode={} create_seq={}", keycode, seq);
    }

    pub(crate) fn goto_marked_window(&mut self, keycode: u32) {
        if keycode == 0 {
            debug!("GotoMarkedWindow: missing placeholder keycode (use a placeholder binding)");
            return;
        }
        let Some(seq) = self.marked.get(&keycode).copied() else {
            debug!("GotoMarkedWindow: no match keycode={}", keycode);
            return;
        };
        let Some(id) = self.core.find_by_create_seq(seq) else {
            self.marked.remove(&keycode);
            debug!("GotoMarkedWindow: stale keycode={} create_seq={}", keycode, seq);
            return;
        };
        if self.core.view(id).is_some_and(|v| v.minimized) {
            self.set_minimized(id, false, "goto-marked-window");
        }
        if !self.core.tabs_view_is_active(id) {
            self.core.tabs_activate(id, "goto-marked-window");
        }
        if self.core.view_is_visible(id) {
            self.focus_view(id, FocusReason::Keybinding);
        } else {
            self.refocus("goto-marked-window");
        }
        self.raise_view(id, "goto-marked-window");
    }

    // --- per-view mutators ---

    pub(crate) fn set_sticky(&mut self, id: ViewId, sticky: bool) {
        if let Some(view) = self.core.view_mut(id) {
            view.sticky = sticky;
        }
        debug!("Stick: {:?} {}", id, if sticky { "on" } else { "off" });
        self.apply_workspace_visibility(if sticky { "stick-on" } else { "stick-off" });
    }

    /// RaiseLayer/LowerLayer step counts; negative steps flip direction.
    pub(crate) fn step_layer(&mut self, id: ViewId, steps: i32) {
        if steps == 0 {
            return;
        }
        let count = steps.unsigned_abs();
        for _ in 0..count {
            let Some(before) = self.core.view(id).map(|v| v.base_layer) else {
                return;
            };
            let next = if steps > 0 { before.raised() } else { before.lowered() };
            if next == before {
                break;
            }
            self.set_layer(id, next.category());
        }
    }

    pub(crate) fn set_alpha_cmd(&mut self, id: ViewId, args: &str) {
        let args = args.trim();
        if args.is_empty() {
            if let Some(view) = self.core.view_mut(id) {
                view.alpha_focused = 255;
                view.alpha_unfocused = 255;
                view.alpha_set = false;
            }
            debug!("SetAlpha: {:?} defaults", id);
            return;
        }
        let toks: Vec<&str> = args.split_whitespace().collect();
        if toks.is_empty() || toks.len() > 2 {
            debug!("SetAlpha: invalid args (expected 0-2 values): {}", args);
            return;
        }
        let Some(view) = self.core.view(id) else { return };
        let base_f = if view.alpha_set { i32::from(view.alpha_focused) } else { 255 };
        let base_u = if view.alpha_set { i32::from(view.alpha_unfocused) } else { 255 };

        let Some((rel1, val1)) = parse_alpha_token(toks[0]) else {
            debug!("SetAlpha: invalid token: {}", toks[0]);
            return;
        };
        let (out_f, out_u) = if toks.len() == 1 {
            (
                if rel1 { base_f + val1 } else { val1 },
                if rel1 { base_u + val1 } else { val1 },
            )
        } else {
            let Some((rel2, val2)) = parse_alpha_token(toks[1]) else {
                debug!("SetAlpha: invalid token: {}", toks[1]);
                return;
            };
            (
                if rel1 { base_f + val1 } else { val1 },
                if rel2 { base_u + val2 } else { val2 },
            )
        };
        if let Some(view) = self.core.view_mut(id) {
            view.alpha_focused = out_f.clamp(0, 255) as u8;
            view.alpha_unfocused = out_u.clamp(0, 255) as u8;
            view.alpha_set = true;
        }
        debug!("SetAlpha: {:?} focused={} unfocused={}", id, out_f, out_u);
    }

    pub(crate) fn toggle_decor(&mut self, id: ViewId) {
        let before = self.strict_mousefocus_view_under_cursor();
        let enable = !self.core.view(id).is_some_and(|v| v.decor.enabled);
        if let Some(view) = self.core.view_mut(id) {
            view.decor.forced = true;
        }
        self.decor_set_enabled(id, enable);
        self.decor_update(id);
        debug!("ToggleDecor: {:?} {}", id, if enable { "on" } else { "off" });
        self.strict_mousefocus_recheck_after_restack(
            before,
            if enable { "decor-on" } else { "decor-off" },
        );
    }

    pub(crate) fn set_decor(&mut self, id: ViewId, value: &str) {
        let value = strip_braces(value.trim());
        if value.is_empty() {
            debug!("SetDecor: missing value");
            return;
        }
        let Some(mask) = decor_mask_parse(value) else {
            debug!("SetDecor: invalid value: {}", value);
            return;
        };
        let enable = decor_mask_has_frame(mask);
        let before = self.strict_mousefocus_view_under_cursor();
        if let Some(view) = self.core.view_mut(id) {
            view.decor.forced = true;
            view.decor.mask = mask;
        }
        self.decor_set_enabled(id, enable);
        self.decor_update(id);
        debug!("SetDecor: {:?} value={} enabled={} mask={:#04x}", id, value, enable, mask);
        self.strict_mousefocus_recheck_after_restack(
            before,
            if enable { "decor-on" } else { "decor-off" },
        );
    }

    /// User title override; empty text clears back to the client title.
    pub(crate) fn set_title_override(&mut self, id: ViewId, text: &str, why: &str) {
        let text = strip_braces(text.trim()).trim().to_string();
        let announced = {
            let Some(view) = self.core.view_mut(id) else {
                return;
            };
            if text.is_empty() {
                view.title_override = None;
            } else {
                view.title_override = Some(text);
            }
            view.effective_title().to_string()
        };
        self.ops.push(ProtocolOp::ForeignSetTitle {
            id,
            title: announced,
        });
        self.decor_update_title_text(id);
        debug!("Title: override updated view={:?} reason={}", id, why);
    }

    pub(crate) fn set_title_dialog(&mut self, id: ViewId) {
        let Some(seq) = self.core.view(id).map(View::create_seq) else {
            return;
        };
        self.cmd_dialog_target_seq = seq;
        self.ui.push(UiRequest::CloseMenus {
            why: "set-title-dialog",
        });
        self.ui.push(UiRequest::CommandDialog {
            prompt: "Set Title: ".to_string(),
            initial: String::new(),
        });
    }

    /// Dialog submit path for `SetTitleDialog`.
    pub fn submit_title_dialog(&mut self, text: &str) {
        let seq = std::mem::take(&mut self.cmd_dialog_target_seq);
        if seq == 0 {
            debug!("Title: set-title-dialog missing target create_seq");
            return;
        }
        let Some(id) = self.core.find_by_create_seq(seq) else {
            debug!("Title: set-title-dialog no match create_seq={}", seq);
            return;
        };
        self.set_title_override(id, text, "set-title-dialog");
    }

    pub(crate) fn set_xprop_cmd(&mut self, id: ViewId, args: &str) -> bool {
        let args = args.trim_start();
        if args.len() < 2 || args.starts_with('=') {
            return false;
        }
        let (name, value) = match args.find('=') {
            Some(eq) => (&args[..eq], &args[eq + 1..]),
            None => (args, ""),
        };
        if name.is_empty() {
            return false;
        }
        let Some(legacy) = self.core.view_mut(id).and_then(|v| v.legacy.as_mut()) else {
            return false;
        };
        legacy.set_prop(name, value);
        self.ops.push(ProtocolOp::SetXProp {
            id,
            name: name.to_string(),
            value: value.to_string(),
        });
        debug!("SetXProp: {:?} prop={} len={}", id, name, value.len());
        true
    }

    pub(crate) fn set_env_cmd(&mut self, args: &str) {
        let s = args.trim();
        if s.is_empty() {
            return;
        }
        let first_ws = s.find(char::is_whitespace).unwrap_or(s.len());
        let eq = s.find('=');
        let (name, value) = match eq {
            Some(eq) if eq < first_ws => (s[..eq].trim(), s[eq + 1..].trim()),
            _ if first_ws < s.len() => (s[..first_ws].trim(), s[first_ws..].trim()),
            _ => {
                debug!("SetEnv: expected 'NAME VALUE' or 'NAME=VALUE': {}", s);
                return;
            }
        };
        if !env_name_is_valid(name) {
            debug!("SetEnv: invalid variable name: {}", name);
            return;
        }
        std::env::set_var(name, value);
        debug!("SetEnv: set {}", name);
    }

    // --- move / resize commands ---

    pub(crate) fn move_to_cmd(&mut self, id: ViewId, args: &str) -> bool {
        let toks: Vec<&str> = args.split_whitespace().collect();
        if toks.len() < 2 {
            return false;
        }
        let (Some(x), Some(y)) = (parse_i32(toks[0]), parse_i32(toks[1])) else {
            return false;
        };
        self.view_prepare_manual_geometry(id);
        self.view_move_frame(id, x, y, "moveto")
    }

    pub(crate) fn move_rel_cmd(&mut self, id: ViewId, kind: i32, args: &str) -> bool {
        let toks: Vec<&str> = args.split_whitespace().collect();
        let (dx, dy) = match kind {
            0 => {
                if toks.len() < 2 {
                    return false;
                }
                let (Some(dx), Some(dy)) = (parse_i32(toks[0]), parse_i32(toks[1])) else {
                    return false;
                };
                (dx, dy)
            }
            _ => {
                let step = toks.first().and_then(|t| parse_i32(t)).unwrap_or(1);
                match kind {
                    1 => (step, 0),
                    2 => (-step, 0),
                    3 => (0, -step),
                    4 => (0, step),
                    _ => return false,
                }
            }
        };
        let Some(frame) = self.core.view(id).map(|v| v.frame_box(&self.decor_theme)) else {
            return false;
        };
        self.view_prepare_manual_geometry(id);
        self.view_move_frame(id, frame.x + dx, frame.y + dy, "move-rel")
    }

    pub(crate) fn resize_to_cmd(&mut self, id: ViewId, args: &str) -> bool {
        let toks: Vec<&str> = args.split_whitespace().collect();
        if toks.len() < 2 {
            return false;
        }
        let (Some(w), Some(h)) = (parse_i32(toks[0]), parse_i32(toks[1])) else {
            return false;
        };
        let Some(frame) = self.core.view(id).map(|v| v.frame_box(&self.decor_theme)) else {
            return false;
        };
        self.view_prepare_manual_geometry(id);
        self.view_move_resize_frame(id, Rect::new(frame.x, frame.y, w, h), "resizeto")
    }

    pub(crate) fn resize_rel_cmd(&mut self, id: ViewId, kind: i32, args: &str) -> bool {
        let toks: Vec<&str> = args.split_whitespace().collect();
        let (dw, dh) = match kind {
            0 => {
                if toks.len() < 2 {
                    return false;
                }
                let (Some(dw), Some(dh)) = (parse_i32(toks[0]), parse_i32(toks[1])) else {
                    return false;
                };
                (dw, dh)
            }
            1 => {
                let Some(dw) = toks.first().and_then(|t| parse_i32(t)) else {
                    return false;
                };
                (dw, 0)
            }
            2 => {
                let Some(dh) = toks.first().and_then(|t| parse_i32(t)) else {
                    return false;
                };
                (0, dh)
            }
            _ => return false,
        };
        let Some(frame) = self.core.view(id).map(|v| v.frame_box(&self.decor_theme)) else {
            return false;
        };
        self.view_prepare_manual_geometry(id);
        self.view_move_resize_frame(
            id,
            Rect::new(frame.x, frame.y, frame.width + dw, frame.height + dh),
            "resize-rel",
        )
    }

    // --- workspace management ---

    pub(crate) fn workspace_toggle_prev(&mut self, why: &str) {
        let head = self.head_at_cursor();
        let cur = self.core.workspace_current_for_head(head);
        let prev = self.core.workspace_prev_for_head(head);
        if prev == cur {
            return;
        }
        self.workspace_switch_on_head(head, prev, why);
    }

    fn workspace_names_ensure_defaults(&mut self, count: i32) {
        let count = count.clamp(1, WORKSPACE_LIMIT as i32);
        for i in 0..count {
            if !self.core.workspace_name(i).is_empty() {
                continue;
            }
            self.core.set_workspace_name(i, &format!("Workspace {}", i + 1));
        }
    }

    pub(crate) fn add_workspace(&mut self) {
        let cur = self.core.workspace_count();
        if cur >= WORKSPACE_LIMIT as i32 {
            debug!("AddWorkspace: workspace limit reached (count={})", cur);
            return;
        }
        let next = cur + 1;
        self.core.set_workspace_count(next);
        if self.core.workspace_names_len() > 0 {
            self.workspace_names_ensure_defaults(next);
        }
        debug!("Workspace: add count={}", next);
        self.save_rc();
    }

    pub(crate) fn remove_last_workspace(&mut self) {
        let cur = self.core.workspace_count();
        if cur <= 1 {
            debug!("RemoveLastWorkspace: ignored (count={})", cur);
            return;
        }
        let next = cur - 1;
        let target_ws = next - 1;
        for id in self.view_snapshot(|_| true) {
            if let Some(view) = self.core.view_mut(id) {
                if !view.sticky && view.workspace >= next {
                    view.workspace = target_ws;
                }
            }
        }
        self.core.set_workspace_count(next);
        self.apply_workspace_visibility("remove-last-workspace");
        debug!("Workspace: remove-last count={}", next);
        self.save_rc();
    }

    pub(crate) fn set_workspace_name(&mut self, args: &str) {
        let head = self.head_at_cursor();
        let ws = self.core.workspace_current_for_head(head).max(0);
        let count = self.core.workspace_count();
        self.workspace_names_ensure_defaults(count);
        let name = {
            let trimmed = args.trim();
            if trimmed.is_empty() {
                "empty"
            } else {
                trimmed
            }
        };
        if !self.core.set_workspace_name(ws, name) {
            debug!("SetWorkspaceName: failed ws={}", ws + 1);
            return;
        }
        debug!("WorkspaceName: set ws={}", ws + 1);
        self.save_rc();
    }

    pub(crate) fn set_workspace_name_dialog(&mut self) {
        let head = self.head_at_cursor();
        let ws = self.core.workspace_current_for_head(head).max(0);
        let name = self.core.workspace_name(ws);
        let initial = if name.is_empty() {
            (ws + 1).to_string()
        } else {
            name.to_string()
        };
        self.ui.push(UiRequest::CloseMenus {
            why: "set-workspace-name-dialog",
        });
        self.ui.push(UiRequest::CommandDialog {
            prompt: "SetWorkspaceName ".to_string(),
            initial,
        });
    }

    // --- rc persistence / styles ---

    #[must_use]
    fn init_file_path(&self) -> Option<PathBuf> {
        self.config_dir.as_ref().map(|dir| dir.join("init"))
    }

    /// Persist the session state keys into the init file.
    pub fn save_rc(&mut self) {
        let Some(path) = self.init_file_path() else {
            debug!("SaveRC: missing config_dir");
            return;
        };
        let ws_count = self.core.workspace_count().to_string();
        let ws_names = self.workspace_names_csv();
        let focus = self.screen_configs.default_config().focus;
        let auto_raise_delay = focus.auto_raise_delay_ms.to_string();
        let no_focus_typing = focus.no_focus_while_typing_delay_ms.to_string();
        let demands_attention = focus.demands_attention_timeout_ms.to_string();
        let updates = [
            InitUpdate { key: "session.screen0.workspaces", value: &ws_count },
            InitUpdate { key: "session.screen0.workspaceNames", value: &ws_names },
            InitUpdate { key: "session.keyFile", value: &self.cfg.paths.keys_file },
            InitUpdate { key: "session.appsFile", value: &self.cfg.paths.apps_file },
            InitUpdate { key: "session.styleFile", value: &self.cfg.paths.style_file },
            InitUpdate { key: "session.styleOverlay", value: &self.cfg.paths.style_overlay },
            InitUpdate { key: "session.menuFile", value: &self.cfg.paths.menu_file },
            InitUpdate { key: "session.screen0.windowMenu", value: &self.cfg.paths.window_menu_file },
            InitUpdate { key: "session.slitlistFile", value: &self.cfg.paths.slitlist_file },
            InitUpdate { key: "session.screen0.focusModel", value: focus.model.as_str() },
            InitUpdate {
                key: "session.screen0.autoRaise",
                value: if focus.auto_raise { "true" } else { "false" },
            },
            InitUpdate { key: "session.autoRaiseDelay", value: &auto_raise_delay },
            InitUpdate {
                key: "session.screen0.clickRaises",
                value: if focus.click_raises { "true" } else { "false" },
            },
            InitUpdate {
                key: "session.screen0.focusNewWindows",
                value: if focus.focus_new_windows { "true" } else { "false" },
            },
            InitUpdate { key: "session.screen0.noFocusWhileTypingDelay", value: &no_focus_typing },
            InitUpdate {
                key: "session.screen0.focusSameHead",
                value: if focus.focus_same_head { "true" } else { "false" },
            },
            InitUpdate { key: "session.screen0.demandsAttentionTimeout", value: &demands_attention },
            InitUpdate {
                key: "session.screen0.allowRemoteActions",
                value: if focus.allow_remote_actions { "true" } else { "false" },
            },
        ];
        match rc::update_file(&path, &updates) {
            Ok(()) => debug!("SaveRC: ok"),
            Err(err) => debug!("SaveRC: failed: {}", err),
        }
    }

    fn workspace_names_csv(&self) -> String {
        let names_len = self.core.workspace_names_len();
        if names_len == 0 {
            return String::new();
        }
        let n = (self.core.workspace_count().max(1) as usize)
            .max(names_len)
            .min(WORKSPACE_LIMIT);
        let mut out = String::new();
        for i in 0..n {
            let name = self.core.workspace_name(i as i32);
            if name.is_empty() {
                out.push_str(&format!("Workspace {}", i + 1));
            } else {
                out.push_str(name);
            }
            out.push(',');
        }
        out
    }

    /// `SetResourceValue <key> <value>`: patch one init key, reconfigure,
    /// persist.
    pub(crate) fn set_resource_value(&mut self, args: &str) {
        let Some(path) = self.init_file_path() else {
            debug!("SetResourceValue: missing config_dir");
            return;
        };
        let s = args.trim();
        if s.is_empty() {
            debug!("SetResourceValue: missing resource name");
            return;
        }
        let Some(split) = s.find(char::is_whitespace) else {
            debug!("SetResourceValue: missing value");
            return;
        };
        let key = &s[..split];
        let value = s[split..].trim();
        let _ = rc::update_file(&path, &[InitUpdate { key, value }]);
        debug!("SetResourceValue: {}", key);
        self.reconfigure_from_disk();
        self.save_rc();
    }

    /// Re-read the config file and apply it; false when nothing loads.
    pub(crate) fn reconfigure_from_disk(&mut self) -> bool {
        #[cfg(feature = "config-file")]
        {
            let loaded = fluxway_core::config::load_cfg::load_cfg(
                std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
                std::env::var("HOME").ok().as_deref(),
            );
            match loaded {
                Ok(cfg) => {
                    if let Err(err) = self.reconfigure(cfg) {
                        debug!("Reconfigure: rejected: {}", err);
                        return false;
                    }
                    debug!("Reconfigure: ok");
                    return true;
                }
                Err(err) => {
                    debug!("Reconfigure: failed: {}", err);
                    return false;
                }
            }
        }
        #[cfg(not(feature = "config-file"))]
        false
    }

    pub(crate) fn reload_style(&mut self) {
        // Style files are the theme loader's turf; the core re-applies the
        // decoration pass and persists
        for id in self.view_snapshot(|_| true) {
            self.decor_update(id);
        }
        debug!("Style: applied reason=reloadstyle");
        self.save_rc();
    }

    pub(crate) fn set_style(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            debug!("Style: setstyle missing path");
            return;
        }
        self.cfg.paths.style_file = path.to_string();
        for id in self.view_snapshot(|_| true) {
            self.decor_update(id);
        }
        debug!("Style: applied reason=setstyle path={}", path);
        if let Some(dir) = &self.config_dir {
            let init = dir.join("init");
            let _ = rc::update_file(
                &init,
                &[InitUpdate {
                    key: "session.styleFile",
                    value: path,
                }],
            );
        }
        self.save_rc();
    }

    // --- apps rules ---

    /// Apply the first matching rule's pre-map setters to a mapping view.
    pub(crate) fn apps_rules_apply_pre_map(&mut self, id: ViewId) {
        if self.core.view(id).is_some_and(|v| v.apps_rules_applied) {
            return;
        }
        let cursor = {
            let env = self.pattern_env();
            let Some(view) = self.core.view(id) else { return };
            self.apps_rules.find_match(&env, view)
        };
        if let Some(view) = self.core.view_mut(id) {
            view.apps_rules_applied = true;
        }
        let Some(cursor) = cursor else {
            return;
        };
        let Some(rule) = self.apps_rules.rule(cursor.index) else {
            return;
        };
        let workspace = rule.workspace;
        let sticky = rule.sticky;
        let jump = rule.jump;
        let minimized = rule.minimized;
        let maximized = rule.maximized;
        let fullscreen = rule.fullscreen;
        let decor_mask = rule.decor_mask;
        let layer = rule.layer;
        let head = rule.head;
        let icon_hidden = rule.icon_hidden;
        let focus_hidden = rule.focus_hidden;
        let protection = rule.focus_protection;

        if let Some(view) = self.core.view_mut(id) {
            view.apps_rule = Some(cursor);
            if let Some(ws) = workspace {
                view.workspace = ws;
            }
            if let Some(sticky) = sticky {
                view.sticky = sticky;
            }
            if let Some(hidden) = icon_hidden {
                view.icon_hidden = hidden;
            }
            if let Some(hidden) = focus_hidden {
                view.focus_hidden = hidden;
            }
            view.focus_protection = protection;
        }
        if let Some(mask) = decor_mask {
            if let Some(view) = self.core.view_mut(id) {
                view.decor.mask = mask;
                view.decor.forced = true;
            }
            self.decor_set_enabled(id, decor_mask_has_frame(mask));
        }
        if let Some(layer) = layer {
            self.set_layer(id, layer);
        }
        if let Some(head) = head {
            self.view_set_head(id, head);
        }
        if minimized == Some(true) {
            self.set_minimized(id, true, "apps-rule");
        }
        if maximized == Some(true) {
            self.set_maximized(id, true);
        }
        if fullscreen == Some(true) {
            self.set_fullscreen(id, true, None);
        }
        if jump {
            if let Some(ws) = workspace {
                self.hooks_workspace_switch(ws, "apps-rule-jump");
            }
        }
        debug!("AppsRule: applied index={} view={:?}", cursor.index, id);
    }

    /// Persist match counters when a limited-rule view closes.
    pub(crate) fn apps_rules_save_on_close(&mut self) {
        if self.cfg.paths.apps_file.is_empty() {
            return;
        }
        let path = PathBuf::from(format!("{}.counts", self.cfg.paths.apps_file));
        if let Err(err) = self.apps_rules.save_match_counts(&path) {
            debug!("AppsRules: count save failed: {}", err);
        }
    }

    /// Default config directory, `$XDG_CONFIG_HOME/fluxway`.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|dir| dir.join(WINDOW_MANAGER_NAME))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum DeiconifyMode {
    LastWorkspace,
    Last,
    AllWorkspace,
    All,
}

impl DeiconifyMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(DeiconifyMode::All),
            "allworkspace" => Some(DeiconifyMode::AllWorkspace),
            "last" => Some(DeiconifyMode::Last),
            "lastworkspace" => Some(DeiconifyMode::LastWorkspace),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum DeiconifyDest {
    Current,
    Origin,
    OriginQuiet,
}

impl DeiconifyDest {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "current" => Some(DeiconifyDest::Current),
            "origin" => Some(DeiconifyDest::Origin),
            "originquiet" => Some(DeiconifyDest::OriginQuiet),
            _ => None,
        }
    }
}

fn floor_sqrt(n: u32) -> u32 {
    let mut r = 0;
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

fn parse_alpha_token(tok: &str) -> Option<(bool, i32)> {
    if tok.is_empty() {
        return None;
    }
    let (relative, sign, rest) = match tok.as_bytes()[0] {
        b'+' => (true, 1, &tok[1..]),
        b'-' => (true, -1, &tok[1..]),
        _ => (false, 1, tok),
    };
    if rest.is_empty() {
        return None;
    }
    let v: i64 = rest.parse().ok()?;
    if !(0..=100_000).contains(&v) {
        return None;
    }
    Some((relative, sign * v as i32))
}

fn strip_braces(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('{') && s.ends_with('}') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn env_name_is_valid(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::{env_name_is_valid, floor_sqrt, parse_alpha_token, strip_braces};

    #[test]
    fn alpha_tokens() {
        assert_eq!(Some((false, 200)), parse_alpha_token("200"));
        assert_eq!(Some((true, 10)), parse_alpha_token("+10"));
        assert_eq!(Some((true, -25)), parse_alpha_token("-25"));
        assert_eq!(None, parse_alpha_token("+"));
        assert_eq!(None, parse_alpha_token("opaque"));
        assert_eq!(None, parse_alpha_token(""));
    }

    #[test]
    fn helpers() {
        assert_eq!(3, floor_sqrt(9));
        assert_eq!(3, floor_sqrt(15));
        assert_eq!(4, floor_sqrt(16));
        assert_eq!(0, floor_sqrt(0));
        assert_eq!("abc", strip_braces("{abc}"));
        assert_eq!("abc", strip_braces("abc"));
        assert_eq!("{a", strip_braces("{a"));
        assert!(env_name_is_valid("MY_VAR1"));
        assert!(env_name_is_valid("_x"));
        assert!(!env_name_is_valid("1VAR"));
        assert!(!env_name_is_valid(""));
        assert!(!env_name_is_valid("BAD-NAME"));
    }
}
