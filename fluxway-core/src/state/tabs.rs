use crate::config::WS_WINDOW_LIMIT;
use crate::debug;
use crate::state::view::{View, ViewId};
use crate::state::WmCore;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TabGroupId(pub u64);

/// A cycle of views sharing position and size; exactly one member is
/// visible at a time. Members are ids only, the core list stays the owner.
#[derive(Debug, Clone)]
pub struct TabGroup {
    pub id: TabGroupId,
    pub views: heapless::Vec<ViewId, WS_WINDOW_LIMIT>,
    pub active: Option<ViewId>,
}

fn view_is_mapped_not_minimized(view: Option<&View>) -> bool {
    view.is_some_and(|v| v.mapped && !v.minimized)
}

impl WmCore {
    #[must_use]
    pub fn tab_group(&self, id: TabGroupId) -> Option<&TabGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn tab_group_mut(&mut self, id: TabGroupId) -> Option<&mut TabGroup> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// A view outside any group counts as its own active member.
    #[must_use]
    pub fn tabs_view_is_active(&self, id: ViewId) -> bool {
        let Some(view) = self.view(id) else {
            return false;
        };
        match view.tab_group {
            None => true,
            Some(group) => self.tab_group(group).is_some_and(|g| g.active == Some(id)),
        }
    }

    fn tabs_pick_active_fallback(&self, group: TabGroupId) -> Option<ViewId> {
        let g = self.tab_group(group)?;
        if let Some(active) = g.active {
            if view_is_mapped_not_minimized(self.view(active)) {
                return Some(active);
            }
        }
        for id in &g.views {
            if view_is_mapped_not_minimized(self.view(*id)) {
                return Some(*id);
            }
        }
        g.views.first().copied()
    }

    /// Attach `view` to `anchor`'s group, creating the group on demand. The
    /// new member inherits the anchor's geometry and workspace/sticky.
    /// Returns the members needing a protocol configure on success.
    pub fn tabs_attach(
        &mut self,
        view: ViewId,
        anchor: ViewId,
        reason: &str,
    ) -> Option<heapless::Vec<ViewId, WS_WINDOW_LIMIT>> {
        if view == anchor {
            return None;
        }
        if self.view(view)?.tab_group.is_some() {
            return None;
        }
        if !view_is_mapped_not_minimized(self.view(anchor)) {
            return None;
        }

        let group = match self.view(anchor)?.tab_group {
            Some(group) => group,
            None => {
                self.next_group_seq += 1;
                let id = TabGroupId(self.next_group_seq);
                let mut views = heapless::Vec::new();
                let _ = views.push(anchor);
                self.groups.push(TabGroup {
                    id,
                    views,
                    active: Some(anchor),
                });
                self.view_mut(anchor)?.tab_group = Some(id);
                id
            }
        };

        {
            let g = self.tab_group_mut(group)?;
            if crate::push_heapless!(g.views, view).is_err() {
                return None;
            }
        }

        let (ax, ay, aw, ah, aws, asticky) = {
            let a = self.view(anchor)?;
            (
                a.x,
                a.y,
                a.current_width(),
                a.current_height(),
                a.workspace,
                a.sticky,
            )
        };
        let group_len = self.tab_group(group)?.views.len();
        {
            let v = self.view_mut(view)?;
            v.tab_group = Some(group);
            v.x = ax;
            v.y = ay;
            if aw > 0 && ah > 0 {
                v.pending_width = aw;
                v.pending_height = ah;
            }
            v.workspace = aws;
            v.sticky = asticky;
            v.placed = true;
        }
        debug!(
            "Tabs: attach reason={} anchor={:?} view={:?} tabs={}",
            reason, anchor, view, group_len
        );
        let mut affected = heapless::Vec::new();
        let _ = affected.push(view);
        Some(affected)
    }

    /// Remove `view` from its group; picks a new active member and
    /// auto-destroys the group once fewer than two members remain.
    pub fn tabs_detach(&mut self, view: ViewId, reason: &str) {
        let Some(group) = self.view(view).and_then(|v| v.tab_group) else {
            return;
        };

        let was_active = self
            .tab_group(group)
            .is_some_and(|g| g.active == Some(view));
        if let Some(g) = self.tab_group_mut(group) {
            if let Some(pos) = g.views.iter().position(|id| *id == view) {
                crate::util::vec_ops::remove(&mut g.views, pos);
            }
            if was_active {
                g.active = None;
            }
        }
        if let Some(v) = self.view_mut(view) {
            v.tab_group = None;
            v.scene_enabled = true;
        }
        if was_active {
            let fallback = self.tabs_pick_active_fallback(group);
            if let Some(g) = self.tab_group_mut(group) {
                g.active = fallback;
            }
        }
        let remaining = self.tab_group(group).map_or(0, |g| g.views.len());
        debug!(
            "Tabs: detach reason={} view={:?} remaining={}",
            reason, view, remaining
        );
        self.tabs_maybe_destroy_group(group);
        self.tabs_repair();
    }

    fn tabs_maybe_destroy_group(&mut self, group: TabGroupId) {
        let len = match self.tab_group(group) {
            Some(g) => g.views.len(),
            None => return,
        };
        if len >= 2 {
            return;
        }
        if len == 1 {
            let last = self.tab_group(group).and_then(|g| g.views.first().copied());
            if let Some(last) = last {
                let visible = self.view_is_visible(last);
                if let Some(v) = self.view_mut(last) {
                    v.tab_group = None;
                    v.scene_enabled = visible;
                }
            }
        }
        self.groups.retain(|g| g.id != group);
    }

    /// Make `view` the visible member of its group.
    pub fn tabs_activate(&mut self, view: ViewId, reason: &str) {
        let Some(group) = self.view(view).and_then(|v| v.tab_group) else {
            return;
        };
        let changed = self
            .tab_group(group)
            .is_some_and(|g| g.active != Some(view));
        if changed {
            if let Some(g) = self.tab_group_mut(group) {
                g.active = Some(view);
            }
            debug!("Tabs: activate reason={} view={:?}", reason, view);
        }
        self.tabs_apply_visibility(group);
    }

    fn tabs_apply_visibility(&mut self, group: TabGroupId) {
        let active = self.tabs_pick_active_fallback(group);
        if let Some(g) = self.tab_group_mut(group) {
            if g.active != active {
                g.active = active;
            }
        }
        let members: Vec<ViewId> = self
            .tab_group(group)
            .map(|g| g.views.iter().copied().collect())
            .unwrap_or_default();
        for id in members {
            let visible_ws = {
                let Some(v) = self.view(id) else { continue };
                v.mapped && (v.sticky || v.workspace == self.workspace_current_for_head(v.head))
            };
            let enabled = visible_ws && active == Some(id);
            if let Some(v) = self.view_mut(id) {
                v.scene_enabled = enabled;
            }
        }
    }

    /// Re-synchronize workspace/sticky across each group to the picked
    /// reference member and re-apply visibility. Run after workspace
    /// reassignments or batch mutations.
    pub fn tabs_repair(&mut self) {
        let groups: Vec<TabGroupId> = self.groups.iter().map(|g| g.id).collect();
        for group in groups {
            if let Some(reference) = self.tabs_pick_active_fallback(group) {
                let (ws, sticky) = {
                    let Some(r) = self.view(reference) else {
                        continue;
                    };
                    (r.workspace, r.sticky)
                };
                let members: Vec<ViewId> = self
                    .tab_group(group)
                    .map(|g| g.views.iter().copied().collect())
                    .unwrap_or_default();
                for id in members {
                    if let Some(v) = self.view_mut(id) {
                        v.workspace = ws;
                        v.sticky = sticky;
                    }
                }
            }
            self.tabs_apply_visibility(group);
        }
    }

    fn tabs_pick_step(&self, view: ViewId, rev: bool) -> Option<ViewId> {
        let group = self.view(view)?.tab_group?;
        let start = self.tabs_pick_active_fallback(group)?;
        let g = self.tab_group(group)?;
        let len = g.views.len();
        let start_pos = g.views.iter().position(|id| *id == start)?;
        for step in 1..len {
            let pos = if rev {
                (start_pos + len - step % len) % len
            } else {
                (start_pos + step) % len
            };
            let id = g.views[pos];
            if view_is_mapped_not_minimized(self.view(id)) {
                return Some(id);
            }
        }
        None
    }

    #[must_use]
    pub fn tabs_pick_next(&self, view: ViewId) -> Option<ViewId> {
        self.tabs_pick_step(view, false)
    }

    #[must_use]
    pub fn tabs_pick_prev(&self, view: ViewId) -> Option<ViewId> {
        self.tabs_pick_step(view, true)
    }

    /// The `index`-th mapped, non-minimized member of `view`'s group.
    #[must_use]
    pub fn tabs_pick_index0(&self, view: ViewId, index: usize) -> Option<ViewId> {
        let group = self.view(view)?.tab_group?;
        let g = self.tab_group(group)?;
        g.views
            .iter()
            .filter(|id| view_is_mapped_not_minimized(self.view(**id)))
            .nth(index)
            .copied()
    }

    fn tabs_shift(&mut self, view: ViewId, left: bool, reason: &str) -> bool {
        let Some(group) = self.view(view).and_then(|v| v.tab_group) else {
            return false;
        };
        let Some(g) = self.tab_group_mut(group) else {
            return false;
        };
        let len = g.views.len();
        if len < 2 {
            return false;
        }
        let Some(pos) = g.views.iter().position(|id| *id == view) else {
            return false;
        };
        let other = if left {
            (pos + len - 1) % len
        } else {
            (pos + 1) % len
        };
        g.views.swap(pos, other);
        debug!("Tabs: shift reason={} view={:?}", reason, view);
        true
    }

    pub fn tabs_move_left(&mut self, view: ViewId, reason: &str) -> bool {
        self.tabs_shift(view, true, reason)
    }

    pub fn tabs_move_right(&mut self, view: ViewId, reason: &str) -> bool {
        self.tabs_shift(view, false, reason)
    }

    /// Copy position (and optionally size) from `source` onto every other
    /// member. Returns the members that need a protocol configure.
    pub fn tabs_sync_geometry_from(
        &mut self,
        source: ViewId,
        include_size: bool,
        width: i32,
        height: i32,
        reason: &str,
    ) -> heapless::Vec<ViewId, WS_WINDOW_LIMIT> {
        let mut affected = heapless::Vec::new();
        let Some(group) = self.view(source).and_then(|v| v.tab_group) else {
            return affected;
        };
        let (sx, sy) = {
            let Some(s) = self.view(source) else {
                return affected;
            };
            (s.x, s.y)
        };
        let members: Vec<ViewId> = self
            .tab_group(group)
            .map(|g| g.views.iter().copied().collect())
            .unwrap_or_default();
        for id in members {
            if id == source {
                continue;
            }
            if let Some(v) = self.view_mut(id) {
                v.x = sx;
                v.y = sy;
                if include_size {
                    if width < 1 || height < 1 {
                        continue;
                    }
                    v.pending_width = width;
                    v.pending_height = height;
                }
                let _ = affected.push(id);
            }
        }
        debug!("Tabs: sync-geometry reason={} source={:?}", reason, source);
        affected
    }
}

#[cfg(test)]
mod tests {
    use crate::state::view::ViewKind;
    use crate::state::WmCore;

    fn mapped(core: &mut WmCore, x: i32, y: i32, w: i32, h: i32) -> crate::state::view::ViewId {
        let id = core.create_view(ViewKind::Native);
        core.map_view(id);
        let v = core.view_mut(id).unwrap();
        v.x = x;
        v.y = y;
        v.width = w;
        v.height = h;
        id
    }

    #[test]
    fn attach_inherits_anchor_geometry() {
        let mut core = WmCore::new();
        let a = mapped(&mut core, 0, 0, 400, 300);
        let b = mapped(&mut core, 100, 100, 500, 200);
        let affected = core.tabs_attach(b, a, "test").unwrap();
        assert_eq!(1, affected.len());
        let bv = core.view(b).unwrap();
        assert_eq!((0, 0), (bv.x, bv.y));
        assert_eq!((400, 300), (bv.pending_width, bv.pending_height));
        assert!(bv.placed);
        let group = core.view(a).unwrap().tab_group.unwrap();
        let g = core.tab_group(group).unwrap();
        assert_eq!(2, g.views.len());
        assert_eq!(Some(a), g.active);
        // Activating b hides a's scene node and shows b's
        core.tabs_activate(b, "test");
        assert!(core.view(b).unwrap().scene_enabled);
        assert!(!core.view(a).unwrap().scene_enabled);
    }

    #[test]
    fn attach_refuses_self_minimized_anchor_and_double_attach() {
        let mut core = WmCore::new();
        let a = mapped(&mut core, 0, 0, 400, 300);
        let b = mapped(&mut core, 0, 0, 100, 100);
        let c = mapped(&mut core, 0, 0, 100, 100);
        assert!(core.tabs_attach(a, a, "test").is_none());
        core.view_mut(a).unwrap().minimized = true;
        assert!(core.tabs_attach(b, a, "test").is_none());
        core.view_mut(a).unwrap().minimized = false;
        assert!(core.tabs_attach(b, a, "test").is_some());
        // b already belongs to a group
        assert!(core.tabs_attach(b, c, "test").is_none());
    }

    #[test]
    fn detach_picks_new_active_and_destroys_small_groups() {
        let mut core = WmCore::new();
        let a = mapped(&mut core, 0, 0, 400, 300);
        let b = mapped(&mut core, 0, 0, 100, 100);
        let c = mapped(&mut core, 0, 0, 100, 100);
        core.tabs_attach(b, a, "test").unwrap();
        core.tabs_attach(c, a, "test").unwrap();
        let group = core.view(a).unwrap().tab_group.unwrap();
        core.tabs_detach(a, "test");
        let g = core.tab_group(group).unwrap();
        assert_eq!(2, g.views.len());
        assert!(g.active.is_some());
        assert!(core.view(a).unwrap().tab_group.is_none());
        // One member left: group auto-destroys, survivor re-enabled
        core.tabs_detach(b, "test");
        assert!(core.tab_group(group).is_none());
        assert!(core.view(c).unwrap().tab_group.is_none());
        assert!(core.view(c).unwrap().scene_enabled);
    }

    #[test]
    fn picking_skips_minimized_members() {
        let mut core = WmCore::new();
        let a = mapped(&mut core, 0, 0, 100, 100);
        let b = mapped(&mut core, 0, 0, 100, 100);
        let c = mapped(&mut core, 0, 0, 100, 100);
        core.tabs_attach(b, a, "test").unwrap();
        core.tabs_attach(c, a, "test").unwrap();
        core.view_mut(b).unwrap().minimized = true;
        assert_eq!(Some(c), core.tabs_pick_next(a));
        assert_eq!(Some(c), core.tabs_pick_prev(a));
        assert_eq!(Some(a), core.tabs_pick_index0(a, 0));
        assert_eq!(Some(c), core.tabs_pick_index0(a, 1));
        assert_eq!(None, core.tabs_pick_index0(a, 2));
    }

    #[test]
    fn sync_geometry_updates_other_members() {
        let mut core = WmCore::new();
        let a = mapped(&mut core, 0, 0, 400, 300);
        let b = mapped(&mut core, 0, 0, 100, 100);
        core.tabs_attach(b, a, "test").unwrap();
        core.view_mut(a).unwrap().x = 50;
        core.view_mut(a).unwrap().y = 60;
        let affected = core.tabs_sync_geometry_from(a, true, 640, 480, "test");
        assert_eq!(1, affected.len());
        let bv = core.view(b).unwrap();
        assert_eq!((50, 60), (bv.x, bv.y));
        assert_eq!((640, 480), (bv.pending_width, bv.pending_height));
    }

    #[test]
    fn repair_resyncs_workspace_and_sticky() {
        let mut core = WmCore::new();
        core.set_workspace_count(3);
        let a = mapped(&mut core, 0, 0, 100, 100);
        let b = mapped(&mut core, 0, 0, 100, 100);
        core.tabs_attach(b, a, "test").unwrap();
        core.view_mut(a).unwrap().workspace = 2;
        core.view_mut(a).unwrap().sticky = true;
        core.tabs_repair();
        assert_eq!(2, core.view(b).unwrap().workspace);
        assert!(core.view(b).unwrap().sticky);
    }

    #[test]
    fn move_tab_reorders_members() {
        let mut core = WmCore::new();
        let a = mapped(&mut core, 0, 0, 100, 100);
        let b = mapped(&mut core, 0, 0, 100, 100);
        let c = mapped(&mut core, 0, 0, 100, 100);
        core.tabs_attach(b, a, "test").unwrap();
        core.tabs_attach(c, a, "test").unwrap();
        assert!(core.tabs_move_right(a, "test"));
        let group = core.view(a).unwrap().tab_group.unwrap();
        let order: Vec<_> = core.tab_group(group).unwrap().views.iter().copied().collect();
        assert_eq!(vec![b, a, c], order);
        // b sits first now; moving it left wraps to the end
        assert!(core.tabs_move_left(b, "test"));
        let order: Vec<_> = core.tab_group(group).unwrap().views.iter().copied().collect();
        assert_eq!(vec![c, a, b], order);
    }
}
