pub mod layer;
pub mod tabs;
pub mod view;

use crate::config::WORKSPACE_LIMIT;
use crate::geometry::place::{ColDir, PlacementStrategy, RowDir};
use crate::state::tabs::TabGroup;
use crate::state::view::{View, ViewId, ViewKind};

/// The window-manager core registry: owner of every view, the map-order
/// list, tab groups, focus, and the per-head workspace registers.
pub struct WmCore {
    views: Vec<View>,
    /// Map order, oldest first. The single source of truth for iteration.
    order: Vec<ViewId>,
    pub(crate) groups: Vec<TabGroup>,
    pub focused: Option<ViewId>,
    next_seq: u64,
    pub(crate) next_group_seq: u64,

    ws_current: i32,
    ws_prev: i32,
    ws_current_by_head: Vec<i32>,
    ws_prev_by_head: Vec<i32>,
    workspace_count: i32,
    workspace_names: Vec<String>,

    pub placement: PlacementStrategy,
    pub row_dir: RowDir,
    pub col_dir: ColDir,
    pub place_next: (i32, i32),
}

impl Default for WmCore {
    fn default() -> Self {
        Self::new()
    }
}

impl WmCore {
    #[must_use]
    pub fn new() -> Self {
        WmCore {
            views: Vec::new(),
            order: Vec::new(),
            groups: Vec::new(),
            focused: None,
            next_seq: 0,
            next_group_seq: 0,
            ws_current: 0,
            ws_prev: 0,
            ws_current_by_head: vec![0],
            ws_prev_by_head: vec![0],
            workspace_count: 1,
            workspace_names: Vec::new(),
            placement: PlacementStrategy::RowSmart,
            row_dir: RowDir::LeftToRight,
            col_dir: ColDir::TopToBottom,
            place_next: (0, 0),
        }
    }

    pub fn create_view(&mut self, kind: ViewKind) -> ViewId {
        self.next_seq += 1;
        let id = ViewId(self.next_seq);
        let mut view = View::new(id, kind);
        view.workspace = self.ws_current;
        self.views.push(view);
        id
    }

    #[must_use]
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.iter_mut().find(|v| v.id == id)
    }

    /// All views in creation order, including unmapped ones.
    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    /// Map-order iteration, oldest first.
    pub fn views_in_map_order(&self) -> impl Iterator<Item = &View> {
        self.order.iter().filter_map(|id| self.view(*id))
    }

    #[must_use]
    pub fn map_order(&self) -> &[ViewId] {
        &self.order
    }

    pub fn map_view(&mut self, id: ViewId) {
        let ws = self.ws_current;
        if let Some(view) = self.view_mut(id) {
            if !view.mapped {
                view.mapped = true;
                if !view.placed {
                    view.workspace = ws;
                }
            }
        }
        if !self.order.contains(&id) {
            self.order.push(id);
        }
    }

    pub fn unmap_view(&mut self, id: ViewId) {
        if let Some(view) = self.view_mut(id) {
            view.mapped = false;
        }
        self.order.retain(|o| *o != id);
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    /// Drop a view from every registry and return it. Tab links are torn
    /// down first so the group never holds a dangling member.
    pub fn destroy_view(&mut self, id: ViewId) -> Option<View> {
        self.tabs_detach(id, "destroy");
        self.order.retain(|o| *o != id);
        if self.focused == Some(id) {
            self.focused = None;
        }
        let pos = self.views.iter().position(|v| v.id == id)?;
        Some(self.views.remove(pos))
    }

    #[must_use]
    pub fn find_by_create_seq(&self, create_seq: u64) -> Option<ViewId> {
        if create_seq == 0 {
            return None;
        }
        self.views
            .iter()
            .find(|v| v.create_seq() == create_seq)
            .map(|v| v.id)
    }

    // --- workspaces ---

    #[must_use]
    pub fn workspace_count(&self) -> i32 {
        self.workspace_count
    }

    pub fn set_workspace_count(&mut self, count: i32) {
        self.workspace_count = count.clamp(1, WORKSPACE_LIMIT as i32);
        let max = self.workspace_count - 1;
        self.ws_current = self.ws_current.min(max);
        self.ws_prev = self.ws_prev.min(max);
        for v in &mut self.ws_current_by_head {
            *v = (*v).min(max);
        }
        for v in &mut self.ws_prev_by_head {
            *v = (*v).min(max);
        }
    }

    pub fn set_head_count(&mut self, heads: usize) {
        let heads = heads.max(1);
        self.ws_current_by_head.resize(heads, self.ws_current);
        self.ws_prev_by_head.resize(heads, self.ws_prev);
    }

    #[must_use]
    pub fn head_count(&self) -> usize {
        self.ws_current_by_head.len()
    }

    #[must_use]
    pub fn workspace_current(&self) -> i32 {
        self.ws_current
    }

    #[must_use]
    pub fn workspace_current_for_head(&self, head: usize) -> i32 {
        self.ws_current_by_head
            .get(head)
            .copied()
            .unwrap_or(self.ws_current)
    }

    #[must_use]
    pub fn workspace_prev_for_head(&self, head: usize) -> i32 {
        self.ws_prev_by_head
            .get(head)
            .copied()
            .unwrap_or(self.ws_prev)
    }

    /// Switch every head to `workspace`. Reparenting of views is the
    /// caller's job; the core only moves the registers.
    pub fn workspace_switch(&mut self, workspace: i32) {
        if workspace < 0 || workspace >= self.workspace_count {
            return;
        }
        if self.ws_current != workspace {
            self.ws_prev = self.ws_current;
            self.ws_current = workspace;
        }
        for head in 0..self.ws_current_by_head.len() {
            if self.ws_current_by_head[head] != workspace {
                self.ws_prev_by_head[head] = self.ws_current_by_head[head];
                self.ws_current_by_head[head] = workspace;
            }
        }
    }

    pub fn workspace_switch_on_head(&mut self, head: usize, workspace: i32) {
        if workspace < 0 || workspace >= self.workspace_count {
            return;
        }
        if head >= self.ws_current_by_head.len() {
            return;
        }
        if self.ws_current_by_head[head] != workspace {
            self.ws_prev_by_head[head] = self.ws_current_by_head[head];
            self.ws_current_by_head[head] = workspace;
        }
        // The global fallback pair tracks the last head that switched
        if self.ws_current != workspace {
            self.ws_prev = self.ws_current;
            self.ws_current = workspace;
        }
    }

    /// Retarget the focused view without switching visibility.
    pub fn move_focused_to_workspace(&mut self, workspace: i32) {
        if workspace < 0 || workspace >= self.workspace_count {
            return;
        }
        if let Some(id) = self.focused {
            if let Some(view) = self.view_mut(id) {
                view.workspace = workspace;
            }
        }
    }

    pub fn clear_workspace_names(&mut self) {
        self.workspace_names.clear();
    }

    pub fn set_workspace_name(&mut self, workspace: i32, name: &str) -> bool {
        if workspace < 0 || workspace >= WORKSPACE_LIMIT as i32 {
            return false;
        }
        let ind = workspace as usize;
        if ind >= self.workspace_names.len() {
            self.workspace_names.resize(ind + 1, String::new());
        }
        self.workspace_names[ind] = name.to_string();
        true
    }

    #[must_use]
    pub fn workspace_name(&self, workspace: i32) -> &str {
        if workspace < 0 {
            return "";
        }
        self.workspace_names
            .get(workspace as usize)
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn workspace_names_len(&self) -> usize {
        self.workspace_names.len()
    }

    // --- visibility & focus ---

    /// A view is visible when it sits on the current workspace of its head
    /// or is sticky; minimized and unmapped views never are.
    #[must_use]
    pub fn view_is_visible(&self, id: ViewId) -> bool {
        let Some(view) = self.view(id) else {
            return false;
        };
        if !view.mapped || view.minimized {
            return false;
        }
        view.sticky || view.workspace == self.workspace_current_for_head(view.head)
    }

    /// First visible candidate in map order that the filter accepts; tab
    /// group members collapse to their active member.
    #[must_use]
    pub fn pick_refocus(&self, filter: impl Fn(&View) -> bool) -> Option<ViewId> {
        self.order
            .iter()
            .filter_map(|id| self.view(*id))
            .find(|v| {
                self.view_is_visible(v.id)
                    && self.tabs_view_is_active(v.id)
                    && v.accepts_focus
                    && filter(v)
            })
            .map(|v| v.id)
    }

    /// Next mapped, non-minimized view after `cur` in map order, wrapping.
    #[must_use]
    pub fn next_view(&self, cur: ViewId) -> Option<ViewId> {
        self.cycle_from(cur, false)
    }

    #[must_use]
    pub fn prev_view(&self, cur: ViewId) -> Option<ViewId> {
        self.cycle_from(cur, true)
    }

    fn cycle_from(&self, cur: ViewId, rev: bool) -> Option<ViewId> {
        let len = self.order.len();
        if len < 2 {
            return None;
        }
        let start = self.order.iter().position(|id| *id == cur)?;
        for step in 1..len {
            let ind = if rev {
                (start + len - step % len) % len
            } else {
                (start + step) % len
            };
            let id = self.order[ind];
            if let Some(v) = self.view(id) {
                if v.mapped && !v.minimized {
                    return Some(id);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::WmCore;
    use crate::state::view::ViewKind;

    #[test]
    fn create_map_destroy_keeps_order() {
        let mut core = WmCore::new();
        let a = core.create_view(ViewKind::Native);
        let b = core.create_view(ViewKind::Legacy);
        let c = core.create_view(ViewKind::Native);
        core.map_view(a);
        core.map_view(b);
        core.map_view(c);
        assert_eq!(vec![a, b, c], core.map_order().to_vec());
        core.destroy_view(b).unwrap();
        assert_eq!(vec![a, c], core.map_order().to_vec());
        assert!(core.view(b).is_none());
        // Unmap keeps the view but removes it from the list
        core.unmap_view(a);
        assert_eq!(vec![c], core.map_order().to_vec());
        assert!(core.view(a).is_some());
    }

    #[test]
    fn create_seq_is_monotonic_and_searchable() {
        let mut core = WmCore::new();
        let a = core.create_view(ViewKind::Native);
        let b = core.create_view(ViewKind::Native);
        assert!(core.view(a).unwrap().create_seq() < core.view(b).unwrap().create_seq());
        assert_eq!(Some(b), core.find_by_create_seq(b.0));
        assert_eq!(None, core.find_by_create_seq(0));
        assert_eq!(None, core.find_by_create_seq(999));
    }

    #[test]
    fn workspace_registers_per_head() {
        let mut core = WmCore::new();
        core.set_workspace_count(4);
        core.set_head_count(2);
        core.workspace_switch_on_head(1, 2);
        assert_eq!(0, core.workspace_current_for_head(0));
        assert_eq!(2, core.workspace_current_for_head(1));
        assert_eq!(0, core.workspace_prev_for_head(1));
        core.workspace_switch_on_head(1, 3);
        assert_eq!(2, core.workspace_prev_for_head(1));
        // Global switch hits every head and saves prev
        core.workspace_switch(1);
        assert_eq!(1, core.workspace_current_for_head(0));
        assert_eq!(1, core.workspace_current_for_head(1));
        assert_eq!(3, core.workspace_prev_for_head(1));
    }

    #[test]
    fn workspace_count_clamps_and_pulls_registers_in_range() {
        let mut core = WmCore::new();
        core.set_workspace_count(0);
        assert_eq!(1, core.workspace_count());
        core.set_workspace_count(4);
        core.workspace_switch(3);
        core.set_workspace_count(2);
        assert_eq!(1, core.workspace_current());
        // Out-of-range switches are ignored
        core.workspace_switch(5);
        assert_eq!(1, core.workspace_current());
        core.workspace_switch(-1);
        assert_eq!(1, core.workspace_current());
    }

    #[test]
    fn visibility_honors_sticky_and_head() {
        let mut core = WmCore::new();
        core.set_workspace_count(3);
        core.set_head_count(2);
        let a = core.create_view(ViewKind::Native);
        core.map_view(a);
        assert!(core.view_is_visible(a));
        core.workspace_switch(1);
        assert!(!core.view_is_visible(a));
        core.view_mut(a).unwrap().sticky = true;
        assert!(core.view_is_visible(a));
        core.view_mut(a).unwrap().sticky = false;
        core.view_mut(a).unwrap().minimized = true;
        core.workspace_switch(0);
        assert!(!core.view_is_visible(a));
    }

    #[test]
    fn move_focused_changes_workspace_only() {
        let mut core = WmCore::new();
        core.set_workspace_count(3);
        let a = core.create_view(ViewKind::Native);
        core.map_view(a);
        core.focused = Some(a);
        core.move_focused_to_workspace(2);
        assert_eq!(2, core.view(a).unwrap().workspace);
        assert_eq!(0, core.workspace_current());
    }

    #[test]
    fn next_prev_skip_minimized() {
        let mut core = WmCore::new();
        let a = core.create_view(ViewKind::Native);
        let b = core.create_view(ViewKind::Native);
        let c = core.create_view(ViewKind::Native);
        for id in [a, b, c] {
            core.map_view(id);
        }
        core.view_mut(b).unwrap().minimized = true;
        assert_eq!(Some(c), core.next_view(a));
        assert_eq!(Some(a), core.next_view(c));
        assert_eq!(Some(c), core.prev_view(a));
        let d = core.create_view(ViewKind::Native);
        assert_eq!(None, core.next_view(d));
    }

    #[test]
    fn workspace_names_round_trip() {
        let mut core = WmCore::new();
        assert_eq!(0, core.workspace_names_len());
        assert!(core.set_workspace_name(2, "mail"));
        assert_eq!("", core.workspace_name(0));
        assert_eq!("mail", core.workspace_name(2));
        assert_eq!(3, core.workspace_names_len());
        assert!(!core.set_workspace_name(-1, "x"));
        core.clear_workspace_names();
        assert_eq!(0, core.workspace_names_len());
    }
}
