//! Z-order bookkeeping over the black-box renderer: per-layer stacking
//! lists plus the point-hit query the focus models need. Drawing itself is
//! someone else's job; this is only the order and enabled state.

use fluxway_core::state::layer::StackLayer;
use fluxway_core::state::view::{DecorTheme, View, ViewId};
use fluxway_core::state::WmCore;

/// Scene layers bottom to top. Fullscreen sits above `Top`, overlay above
/// everything.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum SceneLayer {
    Background,
    Bottom,
    Normal,
    Top,
    Fullscreen,
    Overlay,
}

impl SceneLayer {
    #[must_use]
    pub fn from_stack_layer(layer: StackLayer) -> Self {
        match layer {
            StackLayer::Overlay => SceneLayer::Overlay,
            StackLayer::Top => SceneLayer::Top,
            StackLayer::Normal => SceneLayer::Normal,
            StackLayer::Bottom => SceneLayer::Bottom,
            StackLayer::Background => SceneLayer::Background,
        }
    }
}

const LAYER_ORDER: [SceneLayer; 6] = [
    SceneLayer::Background,
    SceneLayer::Bottom,
    SceneLayer::Normal,
    SceneLayer::Top,
    SceneLayer::Fullscreen,
    SceneLayer::Overlay,
];

/// Last element of each list is the topmost node of that layer.
#[derive(Debug, Default)]
pub struct Scene {
    stacks: [Vec<ViewId>; 6],
}

fn layer_index(layer: SceneLayer) -> usize {
    LAYER_ORDER.iter().position(|l| *l == layer).unwrap_or(2)
}

impl Scene {
    pub fn add(&mut self, id: ViewId, layer: SceneLayer) {
        self.remove(id);
        self.stacks[layer_index(layer)].push(id);
    }

    pub fn remove(&mut self, id: ViewId) {
        for stack in &mut self.stacks {
            stack.retain(|v| *v != id);
        }
    }

    #[must_use]
    pub fn layer_of(&self, id: ViewId) -> Option<SceneLayer> {
        for (i, stack) in self.stacks.iter().enumerate() {
            if stack.contains(&id) {
                return Some(LAYER_ORDER[i]);
            }
        }
        None
    }

    pub fn raise_to_top(&mut self, id: ViewId) {
        for stack in &mut self.stacks {
            if let Some(pos) = stack.iter().position(|v| *v == id) {
                let v = stack.remove(pos);
                stack.push(v);
                return;
            }
        }
    }

    pub fn lower_to_bottom(&mut self, id: ViewId) {
        for stack in &mut self.stacks {
            if let Some(pos) = stack.iter().position(|v| *v == id) {
                let v = stack.remove(pos);
                stack.insert(0, v);
                return;
            }
        }
    }

    pub fn reparent(&mut self, id: ViewId, layer: SceneLayer) {
        self.add(id, layer);
    }

    /// Topmost enabled view whose decorated frame contains the point.
    #[must_use]
    pub fn view_at(&self, core: &WmCore, theme: &DecorTheme, x: i32, y: i32) -> Option<ViewId> {
        for stack in self.stacks.iter().rev() {
            for id in stack.iter().rev() {
                let Some(view) = core.view(*id) else { continue };
                if !view.mapped || view.minimized || !view.scene_enabled {
                    continue;
                }
                if view.frame_box(theme).contains(x, y) {
                    return Some(*id);
                }
            }
        }
        None
    }

    /// Stacking order bottom to top, for render-order consumers.
    #[must_use]
    pub fn flatten(&self) -> Vec<ViewId> {
        self.stacks.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Scene, SceneLayer};
    use fluxway_core::state::view::{DecorTheme, ViewId, ViewKind};
    use fluxway_core::state::WmCore;

    fn view_at_origin(core: &mut WmCore) -> ViewId {
        let id = core.create_view(ViewKind::Native);
        core.map_view(id);
        let v = core.view_mut(id).unwrap();
        v.width = 100;
        v.height = 100;
        id
    }

    #[test]
    fn raise_lower_and_reparent() {
        let mut scene = Scene::default();
        let a = ViewId(1);
        let b = ViewId(2);
        scene.add(a, SceneLayer::Normal);
        scene.add(b, SceneLayer::Normal);
        assert_eq!(vec![a, b], scene.flatten());
        scene.raise_to_top(a);
        assert_eq!(vec![b, a], scene.flatten());
        scene.lower_to_bottom(a);
        assert_eq!(vec![a, b], scene.flatten());
        scene.reparent(a, SceneLayer::Top);
        assert_eq!(Some(SceneLayer::Top), scene.layer_of(a));
        // Top layer stacks above normal regardless of raise order
        assert_eq!(vec![b, a], scene.flatten());
        scene.remove(a);
        assert_eq!(None, scene.layer_of(a));
    }

    #[test]
    fn hit_test_respects_stacking_and_enabled() {
        let mut core = WmCore::new();
        let theme = DecorTheme::default();
        let a = view_at_origin(&mut core);
        let b = view_at_origin(&mut core);
        let mut scene = Scene::default();
        scene.add(a, SceneLayer::Normal);
        scene.add(b, SceneLayer::Normal);
        // b is on top of the overlap
        assert_eq!(Some(b), scene.view_at(&core, &theme, 50, 50));
        scene.raise_to_top(a);
        assert_eq!(Some(a), scene.view_at(&core, &theme, 50, 50));
        core.view_mut(a).unwrap().scene_enabled = false;
        assert_eq!(Some(b), scene.view_at(&core, &theme, 50, 50));
        core.view_mut(b).unwrap().minimized = true;
        assert_eq!(None, scene.view_at(&core, &theme, 50, 50));
        assert_eq!(None, scene.view_at(&core, &theme, 500, 500));
    }
}
