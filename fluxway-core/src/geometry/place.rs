use crate::geometry::Rect;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum PlacementStrategy {
    RowSmart,
    ColSmart,
    Cascade,
    UnderMouse,
    RowMinOverlap,
    ColMinOverlap,
    AutoTab,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum RowDir {
    LeftToRight,
    RightToLeft,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
pub enum ColDir {
    TopToBottom,
    BottomToTop,
}

/// Walk step for the smart/min-overlap strategies. Coarse stepping keeps the
/// scan cheap on big outputs without visibly degrading slot choice.
const SCAN_STEP: i32 = 16;

pub struct Placement<'a> {
    pub strategy: PlacementStrategy,
    pub row_dir: RowDir,
    pub col_dir: ColDir,
    /// Frame boxes of already-placed, currently visible windows.
    pub occupied: &'a [Rect],
    /// Diagonal step for cascade, typically titlebar height + border.
    pub cascade_step: i32,
}

impl Placement<'_> {
    /// Initial position for a `w`×`h` frame inside `usable`.
    /// `cascade_cursor` persists between calls and wraps at the usable box.
    /// `AutoTab` resolution happens in the caller (it needs the tab layer);
    /// here it falls back to row-smart like an anchor-less auto-tab does.
    #[must_use]
    pub fn place_next(
        &self,
        usable: Rect,
        w: i32,
        h: i32,
        cursor: (i32, i32),
        cascade_cursor: &mut (i32, i32),
    ) -> (i32, i32) {
        if usable.is_empty() || w < 1 || h < 1 {
            return (usable.x, usable.y);
        }
        match self.strategy {
            PlacementStrategy::RowSmart | PlacementStrategy::AutoTab => {
                self.scan(usable, w, h, true, false)
            }
            PlacementStrategy::ColSmart => self.scan(usable, w, h, false, false),
            PlacementStrategy::RowMinOverlap => self.scan(usable, w, h, true, true),
            PlacementStrategy::ColMinOverlap => self.scan(usable, w, h, false, true),
            PlacementStrategy::Cascade => {
                let step = self.cascade_step.max(1);
                let (mut cx, mut cy) = *cascade_cursor;
                if cx < usable.x
                    || cy < usable.y
                    || cx + w > usable.x + usable.width
                    || cy + h > usable.y + usable.height
                {
                    cx = usable.x;
                    cy = usable.y;
                }
                *cascade_cursor = (cx + step, cy + step);
                (cx, cy)
            }
            PlacementStrategy::UnderMouse => {
                let x = clamp(cursor.0 - w / 2, usable.x, usable.x + usable.width - w);
                let y = clamp(cursor.1 - h / 2, usable.y, usable.y + usable.height - h);
                (x, y)
            }
        }
    }

    fn scan(&self, usable: Rect, w: i32, h: i32, row_major: bool, min_overlap: bool) -> (i32, i32) {
        let max_x = (usable.x + usable.width - w).max(usable.x);
        let max_y = (usable.y + usable.height - h).max(usable.y);

        let xs = axis_positions(usable.x, max_x, self.row_dir == RowDir::RightToLeft);
        let ys = axis_positions(usable.y, max_y, self.col_dir == ColDir::BottomToTop);

        let mut best = (usable.x, usable.y);
        let mut best_overlap = i64::MAX;
        let (outer, inner) = if row_major { (&ys, &xs) } else { (&xs, &ys) };
        for &a in outer {
            for &b in inner {
                let (x, y) = if row_major { (b, a) } else { (a, b) };
                let frame = Rect::new(x, y, w, h);
                let overlap: i64 = self
                    .occupied
                    .iter()
                    .map(|other| frame.overlap_area(other))
                    .sum();
                if overlap == 0 {
                    return (x, y);
                }
                if min_overlap && overlap < best_overlap {
                    best_overlap = overlap;
                    best = (x, y);
                }
            }
        }
        if min_overlap {
            best
        } else {
            // No free slot for the smart strategies: first scan position
            let x = if self.row_dir == RowDir::RightToLeft {
                max_x
            } else {
                usable.x
            };
            let y = if self.col_dir == ColDir::BottomToTop {
                max_y
            } else {
                usable.y
            };
            (x, y)
        }
    }
}

fn axis_positions(lo: i32, hi: i32, reversed: bool) -> Vec<i32> {
    let mut out = Vec::new();
    let mut v = lo;
    while v < hi {
        out.push(v);
        v += SCAN_STEP;
    }
    out.push(hi);
    if reversed {
        out.reverse();
    }
    out
}

fn clamp(v: i32, lo: i32, hi: i32) -> i32 {
    if hi < lo {
        return lo;
    }
    v.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::{ColDir, Placement, PlacementStrategy, RowDir};
    use crate::geometry::Rect;

    fn placement<'a>(strategy: PlacementStrategy, occupied: &'a [Rect]) -> Placement<'a> {
        Placement {
            strategy,
            row_dir: RowDir::LeftToRight,
            col_dir: ColDir::TopToBottom,
            occupied,
            cascade_step: 24,
        }
    }

    const USABLE: Rect = Rect {
        x: 0,
        y: 0,
        width: 1000,
        height: 500,
    };

    #[test]
    fn row_smart_takes_first_free_slot() {
        let occupied = [Rect::new(0, 0, 300, 500)];
        let p = placement(PlacementStrategy::RowSmart, &occupied);
        let mut cur = (0, 0);
        let (x, y) = p.place_next(USABLE, 200, 200, (0, 0), &mut cur);
        assert_eq!(0, y);
        assert!(x >= 300, "picked x={x} inside the occupied column");
    }

    #[test]
    fn col_smart_walks_down_first() {
        let occupied = [Rect::new(0, 0, 1000, 250)];
        let p = placement(PlacementStrategy::ColSmart, &occupied);
        let mut cur = (0, 0);
        let (x, y) = p.place_next(USABLE, 200, 200, (0, 0), &mut cur);
        assert_eq!(0, x);
        assert!(y >= 250);
    }

    #[test]
    fn min_overlap_picks_least_covered_slot_when_full() {
        // Whole area covered, right half twice
        let occupied = [
            Rect::new(0, 0, 1000, 500),
            Rect::new(500, 0, 500, 500),
        ];
        let p = placement(PlacementStrategy::RowMinOverlap, &occupied);
        let mut cur = (0, 0);
        let (x, _) = p.place_next(USABLE, 200, 200, (0, 0), &mut cur);
        assert!(x + 200 <= 500 + 16, "expected a left-half slot, got x={x}");
    }

    #[test]
    fn cascade_steps_diagonally_and_wraps() {
        let p = placement(PlacementStrategy::Cascade, &[]);
        let mut cur = (0, 0);
        assert_eq!((0, 0), p.place_next(USABLE, 100, 100, (0, 0), &mut cur));
        assert_eq!((24, 24), cur);
        assert_eq!((24, 24), p.place_next(USABLE, 100, 100, (0, 0), &mut cur));
        // Push the cursor past the bottom edge: wraps back to origin
        cur = (0, 450);
        assert_eq!((0, 0), p.place_next(USABLE, 100, 100, (0, 0), &mut cur));
    }

    #[test]
    fn under_mouse_centers_and_clamps() {
        let p = placement(PlacementStrategy::UnderMouse, &[]);
        let mut cur = (0, 0);
        assert_eq!(
            (400, 150),
            p.place_next(USABLE, 200, 200, (500, 250), &mut cur)
        );
        assert_eq!((0, 0), p.place_next(USABLE, 200, 200, (-50, -50), &mut cur));
        assert_eq!(
            (800, 300),
            p.place_next(USABLE, 200, 200, (5000, 5000), &mut cur)
        );
    }

    #[test]
    fn right_to_left_rows_prefer_the_right_edge() {
        let p = Placement {
            strategy: PlacementStrategy::RowSmart,
            row_dir: RowDir::RightToLeft,
            col_dir: ColDir::TopToBottom,
            occupied: &[],
            cascade_step: 24,
        };
        let mut cur = (0, 0);
        let (x, y) = p.place_next(USABLE, 200, 200, (0, 0), &mut cur);
        assert_eq!((800, 0), (x, y));
    }
}
