//! The focus controller: acceptance policy, refocus, cycling, directional
//! picks, and the strict-mouse-focus rechecks that follow every restack.

use fluxway_core::debug;
use fluxway_core::geometry::Direction;
use fluxway_core::pattern::ClientPattern;
use fluxway_core::screen_config::FocusModel;
use fluxway_core::state::view::{
    View, ViewId, FOCUS_PROTECT_DENY, FOCUS_PROTECT_GAIN, FOCUS_PROTECT_REFUSE,
};

use crate::server::grab::GrabMode;
use crate::server::{FocusReason, Server};

impl Server {
    /// Focus acceptance: `Gain` always permits; `Deny` always vetoes;
    /// `Refuse` vetoes new-window focus but yields to explicit activation
    /// and user keybinding intent.
    #[must_use]
    pub fn focus_request_allowed(&self, id: ViewId, reason: FocusReason) -> bool {
        let Some(view) = self.core.view(id) else {
            return false;
        };
        if !view.accepts_focus {
            return false;
        }
        if reason == FocusReason::PointerMotion {
            let model = self.screen_config_at(self.cursor.0, self.cursor.1).focus.model;
            if model == FocusModel::ClickToFocus {
                return false;
            }
        }
        if !self.refocus_candidate_allowed(view) {
            return false;
        }
        let protection = view.focus_protection;
        if protection & FOCUS_PROTECT_GAIN != 0 {
            return true;
        }
        if protection & FOCUS_PROTECT_DENY != 0 {
            return false;
        }
        if protection & FOCUS_PROTECT_REFUSE != 0 {
            // Refuse targets new-window focus; deliberate requests pass
            return matches!(
                reason,
                FocusReason::Activate | FocusReason::Keybinding | FocusReason::Cycle
            );
        }
        true
    }

    /// Candidate filter shared by refocus and direct requests: focus-hidden
    /// views never take focus, and `focus_same_head` pins candidates to the
    /// cursor's head except during a move grab.
    pub(crate) fn refocus_candidate_allowed(&self, view: &View) -> bool {
        if view.focus_hidden {
            return false;
        }
        let cfg = self.screen_config_at(self.cursor.0, self.cursor.1);
        if !cfg.focus.focus_same_head {
            return true;
        }
        if self.grab.mode == GrabMode::Move {
            return true;
        }
        view.head == self.head_at_cursor()
    }

    /// Grant focus. On acceptance the old view loses its activated state,
    /// the new one gains it, attention clears and auto-raise re-arms.
    pub fn focus_view(&mut self, id: ViewId, reason: FocusReason) -> bool {
        if self.core.focused == Some(id) {
            return true;
        }
        if !self.focus_request_allowed(id, reason) {
            if self
                .core
                .view(id)
                .is_some_and(|v| v.focus_protection & FOCUS_PROTECT_REFUSE != 0)
            {
                debug!("FocusNew: refused view={:?}", id);
            }
            return false;
        }
        let prev = self.core.focused;
        if let Some(prev) = prev {
            self.set_activated(prev, false);
            self.timers.cancel_auto_raise(prev);
        }
        self.core.focused = Some(id);
        self.set_activated(id, true);
        self.attention_clear(id, "focused");
        self.decor_set_active(id, true);

        let focus_cfg = self.screen_config_for_view(id).focus;
        if focus_cfg.auto_raise {
            self.timers
                .arm_auto_raise(id, focus_cfg.auto_raise_delay_ms, self.now);
        }
        debug!("Focus: {:?} reason={:?}", id, reason);
        true
    }

    /// Re-pick focus after the current view went away or moved off-screen.
    pub fn refocus(&mut self, why: &str) {
        if let Some(focused) = self.core.focused {
            if self.core.view_is_visible(focused) {
                return;
            }
        }
        let candidate = {
            let server: &Server = self;
            self.core
                .pick_refocus(|view| server.refocus_candidate_allowed(view))
        };
        match candidate {
            Some(id) => {
                self.focus_view(id, FocusReason::Refocus);
            }
            None => {
                if let Some(prev) = self.core.focused.take() {
                    self.set_activated(prev, false);
                }
                debug!("Refocus: cleared reason={}", why);
            }
        }
    }

    /// Strict-mouse-focus: the topmost view under the cursor owns focus.
    #[must_use]
    pub fn strict_mousefocus_view_under_cursor(&self) -> Option<ViewId> {
        let model = self.screen_config_at(self.cursor.0, self.cursor.1).focus.model;
        if model != FocusModel::StrictMouseFocus {
            return None;
        }
        self.scene
            .view_at(&self.core, &self.decor_theme, self.cursor.0, self.cursor.1)
    }

    pub fn strict_mousefocus_recheck_after_restack(
        &mut self,
        before: Option<ViewId>,
        why: &str,
    ) {
        let model = self.screen_config_at(self.cursor.0, self.cursor.1).focus.model;
        if model != FocusModel::StrictMouseFocus {
            return;
        }
        let after = self
            .scene
            .view_at(&self.core, &self.decor_theme, self.cursor.0, self.cursor.1);
        if after != before {
            self.update_pointer_focus(FocusReason::PointerMotion, why);
        }
    }

    pub(crate) fn update_pointer_focus(&mut self, reason: FocusReason, _why: &str) {
        let model = self.screen_config_at(self.cursor.0, self.cursor.1).focus.model;
        if model == FocusModel::ClickToFocus {
            return;
        }
        if self.grab.mode != GrabMode::Passthrough {
            return;
        }
        let Some(id) = self
            .scene
            .view_at(&self.core, &self.decor_theme, self.cursor.0, self.cursor.1)
        else {
            return;
        };
        if self.core.focused != Some(id) {
            self.focus_view(id, reason);
        }
    }

    /// Cycling candidates: the core list (or static `create_seq` order),
    /// mapped and not minimized, optionally collapsed to tab-group active
    /// members and filtered by a client pattern.
    fn cycle_candidates(
        &mut self,
        groups: bool,
        static_order: bool,
        pattern: Option<&str>,
    ) -> Vec<ViewId> {
        let compiled = pattern.map(ClientPattern::parse);
        let env = self.pattern_env();
        let mut ids: Vec<ViewId> = self
            .core
            .views_in_map_order()
            .filter(|v| v.mapped && !v.minimized)
            .filter(|v| !groups || self.core.tabs_view_is_active(v.id))
            .filter(|v| {
                compiled
                    .as_ref()
                    .is_none_or(|pat| pat.matches(&env, v))
            })
            .filter(|v| self.cycle_view_allowed(v))
            .map(|v| v.id)
            .collect();
        if static_order && ids.len() > 1 {
            ids.sort_by_key(|id| self.core.view(*id).map_or(0, View::create_seq));
        }
        ids
    }

    /// The cycle-candidate hook: same-head scoping matching the refocus
    /// filter, except during a move grab.
    fn cycle_view_allowed(&self, view: &View) -> bool {
        let cfg = self.screen_config_at(self.cursor.0, self.cursor.1);
        if !cfg.focus.focus_same_head {
            return true;
        }
        if self.grab.mode == GrabMode::Move {
            return true;
        }
        view.head == self.head_at_cursor()
    }

    fn parse_cycle_args(args: Option<&str>) -> (bool, bool, Option<String>) {
        let Some(args) = args else {
            return (false, false, None);
        };
        let (groups, static_order, rest) = parse_cycle_options(args);
        let pattern = if rest.trim().is_empty() {
            None
        } else {
            Some(rest.trim().to_string())
        };
        (groups, static_order, pattern)
    }

    /// `NextWindow`/`PrevWindow` and the group variants.
    pub(crate) fn cycle_focus(&mut self, rev: bool, force_groups: bool, args: Option<&str>) -> bool {
        let (mut groups, static_order, pattern) = Self::parse_cycle_args(args);
        groups |= force_groups;
        let candidates = self.cycle_candidates(groups, static_order, pattern.as_deref());
        if candidates.is_empty() {
            return true;
        }
        let start = self
            .core
            .focused
            .and_then(|f| candidates.iter().position(|id| *id == f));
        let pick = match start {
            Some(pos) => {
                let len = candidates.len();
                if len < 2 {
                    return true;
                }
                let next = if rev { (pos + len - 1) % len } else { (pos + 1) % len };
                candidates[next]
            }
            None => {
                if rev {
                    *candidates.last().expect("nonempty")
                } else {
                    candidates[0]
                }
            }
        };
        if self.core.focused == Some(pick) {
            return true;
        }
        if !groups && !self.core.tabs_view_is_active(pick) {
            self.core.tabs_activate(pick, "keybinding-cycle");
        }
        self.focus_view(pick, FocusReason::Cycle);
        true
    }

    /// `GotoWindow N [pattern]`: the N-th filtered candidate, one-based;
    /// negative indices count from the end.
    pub(crate) fn goto_window(&mut self, arg: i32, args: Option<&str>) -> bool {
        if arg == 0 {
            return true;
        }
        let (groups, static_order, pattern) = Self::parse_cycle_args(args);
        let candidates = self.cycle_candidates(groups, static_order, pattern.as_deref());
        if candidates.is_empty() {
            return true;
        }
        let len = candidates.len() as i32;
        let index = if arg > 0 { arg - 1 } else { len + arg };
        if index < 0 || index >= len {
            return true;
        }
        let pick = candidates[index as usize];
        if !groups && !self.core.tabs_view_is_active(pick) {
            self.core.tabs_activate(pick, "keybinding-gotowindow");
        }
        self.focus_view(pick, FocusReason::Cycle);
        self.raise_view(pick, "goto-window");
        true
    }

    /// Directional focus: closest visible candidate whose center sits on
    /// the given side, geometric distance, `create_seq` tie-break.
    pub(crate) fn pick_dir_focus_candidate(
        &self,
        from: ViewId,
        direction: Direction,
    ) -> Option<ViewId> {
        let origin = self.core.view(from)?;
        let (ox, oy) = center(origin);
        let mut best: Option<(i64, u64, ViewId)> = None;
        for view in self.core.views_in_map_order() {
            if view.id == from || !self.core.view_is_visible(view.id) {
                continue;
            }
            if !self.core.tabs_view_is_active(view.id) || !view.accepts_focus {
                continue;
            }
            let (cx, cy) = center(view);
            let on_side = match direction {
                Direction::Left => cx < ox,
                Direction::Right => cx > ox,
                Direction::Up => cy < oy,
                Direction::Down => cy > oy,
            };
            if !on_side {
                continue;
            }
            let dx = i64::from(cx - ox);
            let dy = i64::from(cy - oy);
            let dist = dx * dx + dy * dy;
            let seq = view.create_seq();
            let better = match &best {
                None => true,
                Some((bd, bs, _)) => dist < *bd || (dist == *bd && seq < *bs),
            };
            if better {
                best = Some((dist, seq, view.id));
            }
        }
        best.map(|(_, _, id)| id)
    }
}

fn center(view: &View) -> (i32, i32) {
    (
        view.x + view.current_width() / 2,
        view.y + view.current_height() / 2,
    )
}

/// `{groups static} pattern` option block shared by the cycle commands.
fn parse_cycle_options(s: &str) -> (bool, bool, &str) {
    let Some(open) = s.find('{') else {
        return (false, false, s);
    };
    let Some(close_rel) = s[open + 1..].find('}') else {
        return (false, false, s);
    };
    let opts = &s[open + 1..open + 1 + close_rel];
    let mut groups = false;
    let mut static_order = false;
    for tok in opts.split_whitespace() {
        if tok.eq_ignore_ascii_case("groups") {
            groups = true;
        } else if tok.eq_ignore_ascii_case("static") {
            static_order = true;
        }
    }
    (groups, static_order, &s[open + 1 + close_rel + 1..])
}
