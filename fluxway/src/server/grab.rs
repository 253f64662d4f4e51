//! Pointer grab state for interactive move/resize/tab-drag. The compositor
//! feeds motion while a grab is live; commit happens on button release.

use fluxway_core::geometry::{EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};
use fluxway_core::state::view::ViewId;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GrabMode {
    Passthrough,
    Move,
    Resize,
}

#[derive(Debug)]
pub struct Grab {
    pub mode: GrabMode,
    pub view: Option<ViewId>,
    pub button: u32,
    pub edges: u32,
    /// True when the grab came from StartTabbing: release may attach.
    pub tab_attach_enabled: bool,
    pub start_cursor: (i32, i32),
    pub start_geom: (i32, i32, i32, i32),
    pub last_w: i32,
    pub last_h: i32,
}

impl Default for Grab {
    fn default() -> Self {
        Grab {
            mode: GrabMode::Passthrough,
            view: None,
            button: 0,
            edges: 0,
            tab_attach_enabled: false,
            start_cursor: (0, 0),
            start_geom: (0, 0, 0, 0),
            last_w: 0,
            last_h: 0,
        }
    }
}

impl Grab {
    pub fn begin_move(&mut self, view: ViewId, button: u32, cursor: (i32, i32), geom: (i32, i32, i32, i32)) {
        self.mode = GrabMode::Move;
        self.view = Some(view);
        self.button = button;
        self.edges = 0;
        self.tab_attach_enabled = false;
        self.start_cursor = cursor;
        self.start_geom = geom;
    }

    pub fn begin_tabbing(&mut self, view: ViewId, button: u32, cursor: (i32, i32), geom: (i32, i32, i32, i32)) {
        self.begin_move(view, button, cursor, geom);
        self.tab_attach_enabled = true;
    }

    pub fn begin_resize(
        &mut self,
        view: ViewId,
        button: u32,
        edges: u32,
        cursor: (i32, i32),
        geom: (i32, i32, i32, i32),
    ) {
        self.mode = GrabMode::Resize;
        self.view = Some(view);
        self.button = button;
        self.edges = edges;
        self.tab_attach_enabled = false;
        self.start_cursor = cursor;
        self.start_geom = geom;
        self.last_w = geom.2;
        self.last_h = geom.3;
    }

    /// New geometry for the grabbed view under the current cursor.
    #[must_use]
    pub fn geometry_for_cursor(&self, cursor: (i32, i32)) -> Option<(i32, i32, i32, i32)> {
        let (sx, sy, sw, sh) = self.start_geom;
        let dx = cursor.0 - self.start_cursor.0;
        let dy = cursor.1 - self.start_cursor.1;
        match self.mode {
            GrabMode::Passthrough => None,
            GrabMode::Move => Some((sx + dx, sy + dy, sw, sh)),
            GrabMode::Resize => {
                let mut x = sx;
                let mut y = sy;
                let mut w = sw;
                let mut h = sh;
                if self.edges & EDGE_LEFT != 0 {
                    x = sx + dx;
                    w = sw - dx;
                } else if self.edges & EDGE_RIGHT != 0 {
                    w = sw + dx;
                }
                if self.edges & EDGE_TOP != 0 {
                    y = sy + dy;
                    h = sh - dy;
                } else if self.edges & EDGE_BOTTOM != 0 {
                    h = sh + dy;
                }
                Some((x, y, w.max(1), h.max(1)))
            }
        }
    }

    pub fn end(&mut self) {
        *self = Grab::default();
    }
}
