use crate::geometry::{Rect, EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};

const DEFAULT_EDGES: u32 = EDGE_RIGHT | EDGE_BOTTOM;
const CENTER_EDGES: u32 = EDGE_LEFT | EDGE_RIGHT | EDGE_TOP | EDGE_BOTTOM;

fn test_corner(xy: i32, wh: i32, corner_size_px: i32, corner_size_pc: i32) -> bool {
    if xy < corner_size_px {
        return true;
    }
    if corner_size_pc <= 0 {
        return false;
    }
    100 * i64::from(xy) < i64::from(corner_size_pc) * i64::from(wh)
}

fn edges_from_edge_or_corner(
    frame: Rect,
    cursor_x: i32,
    cursor_y: i32,
    corner_size_px: i32,
    corner_size_pc: i32,
) -> u32 {
    if frame.is_empty() {
        return DEFAULT_EDGES;
    }
    let corner_size_px = corner_size_px.max(0);
    let corner_size_pc = corner_size_pc.max(0).min(100);

    let x = cursor_x - frame.x;
    let y = cursor_y - frame.y;
    let cx = frame.width / 2;
    let cy = frame.height / 2;

    if x < cx && test_corner(x, cx, corner_size_px, corner_size_pc) {
        if y < cy && test_corner(y, cy, corner_size_px, corner_size_pc) {
            return EDGE_LEFT | EDGE_TOP;
        }
        if test_corner(frame.height - y - 1, frame.height - cy, corner_size_px, corner_size_pc) {
            return EDGE_LEFT | EDGE_BOTTOM;
        }
    } else if test_corner(frame.width - x - 1, frame.width - cx, corner_size_px, corner_size_pc) {
        if y < cy && test_corner(y, cy, corner_size_px, corner_size_pc) {
            return EDGE_RIGHT | EDGE_TOP;
        }
        if test_corner(frame.height - y - 1, frame.height - cy, corner_size_px, corner_size_pc) {
            return EDGE_RIGHT | EDGE_BOTTOM;
        }
    }

    // Not a corner; find the nearest edge.
    if cy - (y - cy).abs() < cx - (x - cx).abs() {
        if y > cy {
            EDGE_BOTTOM
        } else {
            EDGE_TOP
        }
    } else if x > cx {
        EDGE_RIGHT
    } else {
        EDGE_LEFT
    }
}

/// Resize edges for the `StartResizing` argument grammar. `frame` is the
/// decorated frame box of the target view.
#[must_use]
pub fn from_start_resizing_args(frame: Rect, cursor_x: i32, cursor_y: i32, args: &str) -> u32 {
    let mut toks = args.split_whitespace();
    let Some(tok) = toks.next() else {
        return DEFAULT_EDGES;
    };

    match tok.to_ascii_lowercase().as_str() {
        "center" => CENTER_EDGES,
        "topleft" => EDGE_TOP | EDGE_LEFT,
        "top" => EDGE_TOP,
        "topright" => EDGE_TOP | EDGE_RIGHT,
        "left" => EDGE_LEFT,
        "right" => EDGE_RIGHT,
        "bottomleft" => EDGE_BOTTOM | EDGE_LEFT,
        "bottom" => EDGE_BOTTOM,
        "bottomright" => EDGE_BOTTOM | EDGE_RIGHT,
        "nearestcorner" => edges_from_edge_or_corner(frame, cursor_x, cursor_y, 0, 100),
        "nearestedge" => edges_from_edge_or_corner(frame, cursor_x, cursor_y, 0, 0),
        "nearestcorneroredge" => {
            let mut corner_size_px = 50;
            let mut corner_size_pc = 30;
            if let Some(tok2) = toks.next() {
                corner_size_px = 0;
                corner_size_pc = 0;
                if let Some(stripped) = tok2.strip_suffix('%') {
                    corner_size_pc = stripped.parse().unwrap_or(0);
                } else {
                    corner_size_px = tok2.parse().unwrap_or(0);
                    if let Some(tok3) = toks.next() {
                        corner_size_pc = tok3.parse().unwrap_or(0);
                    }
                }
            }
            edges_from_edge_or_corner(frame, cursor_x, cursor_y, corner_size_px, corner_size_pc)
        }
        _ => DEFAULT_EDGES,
    }
}

#[cfg(test)]
mod tests {
    use super::from_start_resizing_args;
    use crate::geometry::{Rect, EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP};

    const FRAME: Rect = Rect {
        x: 0,
        y: 0,
        width: 400,
        height: 400,
    };

    #[test]
    fn fixed_keywords() {
        assert_eq!(
            EDGE_TOP | EDGE_LEFT,
            from_start_resizing_args(FRAME, 0, 0, "TopLeft")
        );
        assert_eq!(EDGE_BOTTOM, from_start_resizing_args(FRAME, 0, 0, "bottom"));
        assert_eq!(
            EDGE_LEFT | EDGE_RIGHT | EDGE_TOP | EDGE_BOTTOM,
            from_start_resizing_args(FRAME, 0, 0, "center")
        );
        // Unknown or empty falls back to bottom-right
        assert_eq!(
            EDGE_RIGHT | EDGE_BOTTOM,
            from_start_resizing_args(FRAME, 0, 0, "")
        );
        assert_eq!(
            EDGE_RIGHT | EDGE_BOTTOM,
            from_start_resizing_args(FRAME, 0, 0, "diagonal")
        );
    }

    #[test]
    fn nearest_corner_quadrants() {
        assert_eq!(
            EDGE_TOP | EDGE_LEFT,
            from_start_resizing_args(FRAME, 10, 10, "NearestCorner")
        );
        assert_eq!(
            EDGE_BOTTOM | EDGE_RIGHT,
            from_start_resizing_args(FRAME, 390, 390, "NearestCorner")
        );
        assert_eq!(
            EDGE_TOP | EDGE_RIGHT,
            from_start_resizing_args(FRAME, 390, 10, "NearestCorner")
        );
    }

    #[test]
    fn nearest_edge_picks_the_closest_side() {
        assert_eq!(
            EDGE_TOP,
            from_start_resizing_args(FRAME, 200, 5, "NearestEdge")
        );
        assert_eq!(
            EDGE_LEFT,
            from_start_resizing_args(FRAME, 5, 200, "NearestEdge")
        );
        assert_eq!(
            EDGE_BOTTOM,
            from_start_resizing_args(FRAME, 200, 395, "NearestEdge")
        );
    }

    #[test]
    fn corner_or_edge_threshold() {
        // Inside the default 50px corner zone
        assert_eq!(
            EDGE_TOP | EDGE_LEFT,
            from_start_resizing_args(FRAME, 40, 40, "NearestCornerOrEdge")
        );
        // Center-ish cursor degrades to an edge
        assert_eq!(
            EDGE_TOP,
            from_start_resizing_args(FRAME, 200, 150, "NearestCornerOrEdge 0 0")
        );
        // Percent form widens the corner zone to the whole half
        assert_eq!(
            EDGE_TOP | EDGE_LEFT,
            from_start_resizing_args(FRAME, 150, 150, "NearestCornerOrEdge 100%")
        );
    }
}
