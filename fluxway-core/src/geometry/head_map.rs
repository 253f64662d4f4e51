use crate::geometry::Rect;

/// A physical output as the shim reports it. `usable` is the full box minus
/// struts and panels; it falls back to `full` when nothing reserves space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub name: String,
    pub full: Rect,
    pub usable: Rect,
}

impl Output {
    #[must_use]
    pub fn new(name: &str, full: Rect) -> Self {
        Output {
            name: name.to_string(),
            full,
            usable: full,
        }
    }

    #[must_use]
    pub fn usable_box(&self) -> Rect {
        if self.usable.is_empty() {
            self.full
        } else {
            self.usable
        }
    }
}

/// Stable output ordering shared with the X11 generation of the codebase:
/// left-to-right, top-to-bottom, name as the final tie-break. Head indices
/// are positions in this ordering, not discovery order.
#[must_use]
pub fn sorted_head_indices(outputs: &[Output]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..outputs.len())
        .filter(|&i| !outputs[i].full.is_empty())
        .collect();
    order.sort_by(|&a, &b| {
        let oa = &outputs[a];
        let ob = &outputs[b];
        oa.full
            .x
            .cmp(&ob.full.x)
            .then(oa.full.y.cmp(&ob.full.y))
            .then(oa.name.cmp(&ob.name))
    });
    order
}

#[must_use]
pub fn head_count(outputs: &[Output]) -> usize {
    sorted_head_indices(outputs).len()
}

/// Output for a head index, falling back to head 0 when out of range.
#[must_use]
pub fn output_for_head(outputs: &[Output], head: usize) -> Option<&Output> {
    let order = sorted_head_indices(outputs);
    if order.is_empty() {
        return None;
    }
    let idx = if head < order.len() { head } else { 0 };
    outputs.get(order[idx])
}

/// Head index of the output containing `(x, y)`, falling back to head 0.
#[must_use]
pub fn head_at(outputs: &[Output], x: i32, y: i32) -> usize {
    let order = sorted_head_indices(outputs);
    for (head, &ind) in order.iter().enumerate() {
        if outputs[ind].full.contains(x, y) {
            return head;
        }
    }
    0
}

/// Head index for an output name; `None` if the output is gone.
#[must_use]
pub fn head_for_output(outputs: &[Output], name: &str) -> Option<usize> {
    let order = sorted_head_indices(outputs);
    order
        .iter()
        .position(|&ind| outputs[ind].name == name)
}

#[cfg(test)]
mod tests {
    use super::{head_at, head_count, head_for_output, output_for_head, Output};
    use crate::geometry::Rect;

    fn dual_head() -> Vec<Output> {
        // Discovery order is right output first; head order must flip it
        vec![
            Output::new("DP-2", Rect::new(1920, 0, 1920, 1080)),
            Output::new("DP-1", Rect::new(0, 0, 1920, 1080)),
        ]
    }

    #[test]
    fn heads_sorted_left_to_right() {
        let outputs = dual_head();
        assert_eq!(2, head_count(&outputs));
        assert_eq!("DP-1", output_for_head(&outputs, 0).unwrap().name);
        assert_eq!("DP-2", output_for_head(&outputs, 1).unwrap().name);
        // Out of range falls back to head 0
        assert_eq!("DP-1", output_for_head(&outputs, 9).unwrap().name);
    }

    #[test]
    fn head_lookup_by_position_and_name() {
        let outputs = dual_head();
        assert_eq!(0, head_at(&outputs, 10, 10));
        assert_eq!(1, head_at(&outputs, 2000, 10));
        // Off-layout falls back to head 0
        assert_eq!(0, head_at(&outputs, -50, -50));
        assert_eq!(Some(1), head_for_output(&outputs, "DP-2"));
        assert_eq!(None, head_for_output(&outputs, "HDMI-1"));
    }

    #[test]
    fn disabled_outputs_are_skipped() {
        let outputs = vec![
            Output::new("DP-1", Rect::new(0, 0, 1920, 1080)),
            Output::new("DP-3", Rect::default()),
        ];
        assert_eq!(1, head_count(&outputs));
        assert_eq!(None, head_for_output(&outputs, "DP-3"));
    }

    #[test]
    fn usable_falls_back_to_full() {
        let mut out = Output::new("DP-1", Rect::new(0, 0, 800, 600));
        assert_eq!(out.full, out.usable_box());
        out.usable = Rect::new(0, 20, 800, 580);
        assert_eq!(Rect::new(0, 20, 800, 580), out.usable_box());
    }
}
