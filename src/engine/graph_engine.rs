//! Interactive causal graph canvas.

use super::SelectCallback;
use crate::graph::{ForceLayout, GraphData, GraphNode, GraphState};
use crate::theme;
use crate::view::interaction::{nearest_within, pointer_events, DragState, PointerEvent, Selection};
use crate::view::scene::{build_graph_scene, paint_graph_scene, paint_tooltip, SceneStyle};
use crate::view::ViewTransform;
use egui::{Pos2, Rect, Response, Sense, Vec2};
use std::collections::VecDeque;
use tracing::{debug, info};

/// World size used before the canvas has been laid out once
const INITIAL_WORLD: Vec2 = Vec2::new(800.0, 500.0);

/// Force layout, view and interaction state for one causal graph.
///
/// Each frame drains queued pointer events, advances the layout by one
/// step and redraws. The layout keeps requesting repaints until it cools
/// down, and again whenever a drag or data change re-heats it.
pub struct CausalGraphEngine {
    state: GraphState,
    layout: ForceLayout,
    view: ViewTransform,
    style: SceneStyle,
    events: VecDeque<PointerEvent>,
    drag: DragState<String>,
    selection: Selection<String>,
    hover: Option<Pos2>,
    on_select: Option<SelectCallback<GraphNode>>,
    stopped: bool,
}

impl CausalGraphEngine {
    pub fn new(data: GraphData, layout: ForceLayout) -> Self {
        let view = ViewTransform::new(INITIAL_WORLD);
        let state = GraphState::load(data, view.world_center());
        info!(
            nodes = state.node_count(),
            edges = state.edge_count(),
            dropped = state.dropped_edges(),
            "causal graph loaded"
        );
        Self {
            state,
            layout,
            view,
            style: SceneStyle::default(),
            events: VecDeque::new(),
            drag: DragState::Idle,
            selection: Selection::default(),
            hover: None,
            on_select: None,
            stopped: false,
        }
    }

    /// Swap in a new node/edge set, keeping positions of surviving ids
    pub fn replace_data(&mut self, data: GraphData) {
        self.state.replace_data(data, self.view.world_center());
        // A drag survives only if its node does; the pin goes back where it was
        let drag = std::mem::replace(&mut self.drag, DragState::Idle);
        match drag {
            DragState::Entity(id) => match self.state.get_pos(&id) {
                Some(pos) => {
                    self.state.pin(&id, pos);
                    self.drag = DragState::Entity(id);
                }
                None => {
                    debug!(%id, "dragged node removed");
                    self.state.set_alpha_target(0.0);
                }
            },
            other => self.drag = other,
        }
        let stale = self
            .selection
            .get()
            .is_some_and(|id| self.state.get(id).is_none());
        if stale {
            self.selection.clear();
            self.notify_selection();
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: ForceLayout) {
        self.layout = layout;
        self.reheat();
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub fn set_show_labels(&mut self, show: bool) {
        self.style.show_labels = show;
    }

    pub fn set_show_arrows(&mut self, show: bool) {
        self.style.show_arrows = show;
    }

    /// Called with the newly selected node (or `None`) whenever the
    /// selection changes
    pub fn on_select(&mut self, callback: impl FnMut(Option<&GraphNode>) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn selected(&self) -> Option<&GraphNode> {
        self.selection
            .get()
            .and_then(|id| self.state.get(id))
            .map(|n| &n.node)
    }

    pub fn push_event(&mut self, event: PointerEvent) {
        if !self.stopped {
            self.events.push_back(event);
        }
    }

    /// Restart the layout at full temperature
    pub fn reheat(&mut self) {
        self.state.reheat(1.0);
    }

    pub fn is_settled(&self) -> bool {
        self.layout.is_settled(&self.state)
    }

    /// Stop stepping and repainting for good
    pub fn stop(&mut self) {
        if !self.stopped {
            debug!("causal graph engine stopped");
        }
        self.stopped = true;
        self.events.clear();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Run one frame on a canvas occupying `rect`: apply queued input,
    /// then step the layout. Returns whether another frame is needed.
    pub fn frame(&mut self, rect: Rect) -> bool {
        if self.stopped {
            return false;
        }
        self.view.set_screen(rect);
        if rect.width() > 0.0 && rect.height() > 0.0 {
            self.view.set_world_size(rect.size());
        }

        while let Some(event) = self.events.pop_front() {
            self.apply(event);
        }

        let center = self.view.world_center();
        let stepped = self.layout.step(&mut self.state, center).is_some();
        stepped || !self.is_settled()
    }

    /// Allocate the canvas, feed it this frame's input and paint it
    pub fn show(&mut self, ui: &mut egui::Ui) -> Response {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        for event in pointer_events(ui, &response) {
            self.push_event(event);
        }
        let animating = self.frame(rect);

        self.style.pixels_per_point = ui.ctx().pixels_per_point();
        let painter = painter.with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, theme::bg::GRAPH);

        let hovered = self.hover.and_then(|p| self.hit_test(p));
        let scene = build_graph_scene(
            &self.state,
            &self.view,
            &self.style,
            self.selection.get().map(String::as_str),
            hovered.as_deref(),
        );
        paint_graph_scene(&painter, &scene);

        if let Some(cursor) = self.hover {
            if let Some(node) = hovered.as_deref().and_then(|id| scene.node(id)) {
                paint_tooltip(&painter, cursor, &node.tooltip);
            } else if let Some(edge) = scene.edge_at(cursor) {
                if !edge.description.is_empty() {
                    paint_tooltip(&painter, cursor, &edge.description);
                }
            }
        }

        if animating {
            ui.ctx().request_repaint();
        }
        response
    }

    /// Id of the node rendered under `screen`, if any
    pub fn hit_test(&self, screen: Pos2) -> Option<String> {
        let scale = self.view.scale();
        nearest_within(
            self.state
                .nodes()
                .map(|n| (n.id(), self.view.to_screen(n.pos), n.radius() * scale)),
            screen,
        )
        .map(str::to_string)
    }

    fn apply(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Pressed(pos) => match self.hit_test(pos) {
                Some(id) => {
                    self.state.pin(&id, self.view.to_world(pos));
                    self.state.set_alpha_target(self.layout.drag_alpha_target);
                    self.state.reheat(self.layout.drag_alpha_target);
                    debug!(%id, "drag started");
                    self.drag = DragState::Entity(id);
                }
                None => self.drag = DragState::Pan { last: pos },
            },
            PointerEvent::Moved(pos) => match &mut self.drag {
                DragState::Entity(id) => {
                    let world = self.view.to_world(pos);
                    self.state.move_pin(id, world);
                }
                DragState::Pan { last } => {
                    self.view.pan_by(pos - *last);
                    *last = pos;
                }
                DragState::Idle => {}
            },
            PointerEvent::Released(_) => {
                if let DragState::Entity(id) = &self.drag {
                    self.state.unpin(id);
                    self.state.set_alpha_target(0.0);
                }
                self.drag = DragState::Idle;
            }
            PointerEvent::Clicked(pos) => {
                let hit = self.hit_test(pos);
                if self.selection.set(hit) {
                    self.notify_selection();
                }
            }
            PointerEvent::Hovered(pos) => self.hover = pos,
            PointerEvent::Panned(delta) => self.view.pan_by(delta),
            PointerEvent::Zoomed { factor, anchor } => self.view.zoom_at(factor, anchor),
        }
    }

    fn notify_selection(&mut self) {
        if let Some(callback) = self.on_select.as_mut() {
            let node = self
                .selection
                .get()
                .and_then(|id| self.state.get(id))
                .map(|n| &n.node);
            callback(node);
        }
    }
}
