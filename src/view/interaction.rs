//! Pointer input as plain events, plus hit-testing and selection helpers.
//!
//! Engines queue [`PointerEvent`]s while reading egui input and drain the
//! queue at the start of the next frame, before stepping their model. Tests
//! feed the same events directly.

use egui::{Pos2, Vec2};

/// Extra screen points around an entity that still count as a hit
pub const HIT_SLOP: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Primary button went down and started a drag
    Pressed(Pos2),
    /// Pointer moved while dragging
    Moved(Pos2),
    /// Drag ended
    Released(Pos2),
    /// Press and release without a drag
    Clicked(Pos2),
    /// Pointer hovering (or leaving) the canvas
    Hovered(Option<Pos2>),
    /// Scroll / trackpad pan in screen points
    Panned(Vec2),
    /// Pinch or ctrl+scroll zoom around `anchor`
    Zoomed { factor: f32, anchor: Pos2 },
}

/// What the current drag gesture is manipulating
#[derive(Debug, Clone, PartialEq)]
pub enum DragState<Id> {
    Idle,
    /// Dragging an entity (graph nodes get pinned under the pointer)
    Entity(Id),
    /// Dragging empty space; `last` is the previous pointer position
    Pan { last: Pos2 },
}

/// At most one selected entity
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<Id> {
    current: Option<Id>,
}

impl<Id> Default for Selection<Id> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<Id: PartialEq> Selection<Id> {
    pub fn get(&self) -> Option<&Id> {
        self.current.as_ref()
    }

    /// Replace the selection. Returns true if it changed.
    pub fn set(&mut self, id: Option<Id>) -> bool {
        if self.current == id {
            return false;
        }
        self.current = id;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.set(None)
    }
}

/// Nearest candidate whose rendered disc (plus [`HIT_SLOP`]) contains
/// `cursor`. Candidates are `(id, screen center, screen radius)`.
pub fn nearest_within<Id>(
    candidates: impl IntoIterator<Item = (Id, Pos2, f32)>,
    cursor: Pos2,
) -> Option<Id> {
    let mut best: Option<(Id, f32)> = None;
    for (id, center, radius) in candidates {
        let distance = center.distance(cursor);
        if distance > radius + HIT_SLOP {
            continue;
        }
        if best.as_ref().map_or(true, |(_, d)| distance < *d) {
            best = Some((id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Translate this frame's egui input on a canvas into pointer events.
///
/// Gathers every delta first so simultaneous pan and zoom on a trackpad
/// both apply.
pub fn pointer_events(ui: &egui::Ui, response: &egui::Response) -> Vec<PointerEvent> {
    let mut events = Vec::new();
    let primary = egui::PointerButton::Primary;
    let pointer = response.interact_pointer_pos();

    if response.drag_started_by(primary) {
        let origin = ui.input(|i| i.pointer.press_origin()).or(pointer);
        if let Some(origin) = origin {
            events.push(PointerEvent::Pressed(origin));
        }
    }
    if response.dragged_by(primary) {
        if let Some(pos) = pointer {
            events.push(PointerEvent::Moved(pos));
        }
    }
    if response.drag_stopped_by(primary) {
        let pos = pointer.or(response.hover_pos()).unwrap_or(response.rect.center());
        events.push(PointerEvent::Released(pos));
    }
    if response.clicked() {
        if let Some(pos) = pointer {
            events.push(PointerEvent::Clicked(pos));
        }
    }

    events.push(PointerEvent::Hovered(response.hover_pos()));

    if response.hovered() {
        let (scroll, zoom) = ui.input(|i| (i.smooth_scroll_delta, i.zoom_delta()));
        if scroll != Vec2::ZERO {
            events.push(PointerEvent::Panned(scroll));
        }
        if zoom != 1.0 {
            if let Some(anchor) = response.hover_pos() {
                events.push(PointerEvent::Zoomed { factor: zoom, anchor });
            }
        }
    }

    events
}

/// Shortest distance from `p` to the segment `a`-`b`
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_prefers_closest_hit() {
        let candidates = vec![
            ("a", Pos2::new(0.0, 0.0), 10.0),
            ("b", Pos2::new(12.0, 0.0), 10.0),
        ];
        assert_eq!(nearest_within(candidates.clone(), Pos2::new(8.0, 0.0)), Some("b"));
        assert_eq!(nearest_within(candidates, Pos2::new(2.0, 0.0)), Some("a"));
    }

    #[test]
    fn miss_returns_none() {
        let candidates = vec![("a", Pos2::new(0.0, 0.0), 10.0)];
        assert_eq!(nearest_within(candidates.clone(), Pos2::new(15.0, 0.0)), Some("a"));
        assert_eq!(nearest_within(candidates, Pos2::new(40.0, 0.0)), None);
    }

    #[test]
    fn selection_replaces_previous() {
        let mut selection = Selection::default();
        assert!(selection.set(Some(1u32)));
        assert!(selection.set(Some(2)));
        assert_eq!(selection.get(), Some(&2));
        assert_ne!(selection.get(), Some(&1));
        assert!(!selection.set(Some(2)));
        assert!(selection.clear());
        assert_eq!(selection.get(), None);
    }

    #[test]
    fn segment_distance() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(1.0, 1.0), a, a), 2f32.sqrt());
    }
}
