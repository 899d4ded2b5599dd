//! Agent population canvas with tick playback.

use super::SelectCallback;
use crate::agents::clock::ClockPhase;
use crate::agents::{
    Agent, AgentWorld, DataSource, PlaybackClock, PlaybackState, SimulationData, Speed,
    StanceSummary,
};
use crate::theme;
use crate::view::interaction::{nearest_within, pointer_events, PointerEvent, Selection};
use crate::view::scene::{
    agent_screen_radius, build_agent_scene, paint_agent_scene, paint_tooltip, SceneStyle,
};
use crate::view::ViewTransform;
use egui::{Pos2, Rect, Response, Sense, Vec2};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Tick playback, motion and interaction state for one agent population.
///
/// Rendering runs every frame the host asks for, but agents only move when
/// the clock says a tick is due; between ticks the engine asks for a repaint
/// after the remaining interval.
pub struct AgentSimEngine {
    agents: Vec<Agent>,
    /// Positions and velocities at load, restored by `reset`
    initial: Vec<(Pos2, Vec2)>,
    max_ticks: u32,
    summary: StanceSummary,
    source: DataSource,
    /// Stance distribution at every tick in `0..=max_ticks`
    series: Vec<StanceSummary>,
    clock: PlaybackClock,
    world: AgentWorld,
    seed: u64,
    rng: StdRng,
    view: ViewTransform,
    style: SceneStyle,
    events: VecDeque<PointerEvent>,
    pan_from: Option<Pos2>,
    selection: Selection<u32>,
    hover: Option<Pos2>,
    on_select: Option<SelectCallback<Agent>>,
    stopped: bool,
}

impl AgentSimEngine {
    pub fn new(data: SimulationData, world: AgentWorld, seed: u64) -> Self {
        let SimulationData {
            agents,
            max_ticks,
            summary,
            source,
        } = data;
        let series = (0..=max_ticks)
            .map(|tick| StanceSummary::at_tick(&agents, tick))
            .collect();
        info!(agents = agents.len(), max_ticks, source = source.label(), "agent simulation loaded");

        Self {
            initial: agents.iter().map(|a| (a.pos, a.vel)).collect(),
            agents,
            max_ticks,
            summary,
            source,
            series,
            clock: PlaybackClock::new(max_ticks),
            world,
            seed,
            rng: StdRng::seed_from_u64(seed),
            view: ViewTransform::new(world.size()),
            style: SceneStyle::default(),
            events: VecDeque::new(),
            pan_from: None,
            selection: Selection::default(),
            hover: None,
            on_select: None,
            stopped: false,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Final stance distribution reported for the run
    pub fn summary(&self) -> &StanceSummary {
        &self.summary
    }

    /// Stance distribution at every tick, indexed by tick
    pub fn stance_series(&self) -> &[StanceSummary] {
        &self.series
    }

    /// Stance distribution at the current tick
    pub fn current_summary(&self) -> StanceSummary {
        self.series
            .get(self.clock.current_tick() as usize)
            .copied()
            .unwrap_or(self.summary)
    }

    pub fn playback(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn phase(&self) -> ClockPhase {
        self.clock.phase()
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn toggle(&mut self) {
        self.clock.toggle();
    }

    pub fn seek(&mut self, tick: i64) {
        self.clock.seek(tick);
    }

    pub fn set_speed(&mut self, multiplier: u32) {
        self.clock.set_speed(multiplier);
    }

    pub fn speed(&self) -> Speed {
        self.clock.speed()
    }

    /// Back to tick 0 with the agents where they started
    pub fn reset(&mut self) {
        self.clock.reset();
        for (agent, (pos, vel)) in self.agents.iter_mut().zip(&self.initial) {
            agent.pos = *pos;
            agent.vel = *vel;
        }
        self.rng = StdRng::seed_from_u64(self.seed);
        debug!(max_ticks = self.max_ticks, "playback reset");
    }

    pub fn on_select(&mut self, callback: impl FnMut(Option<&Agent>) + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn selected(&self) -> Option<&Agent> {
        let id = self.selection.get()?;
        self.agents.iter().find(|a| a.id == *id)
    }

    pub fn push_event(&mut self, event: PointerEvent) {
        if !self.stopped {
            self.events.push_back(event);
        }
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            debug!("agent simulation engine stopped");
        }
        self.clock.pause();
        self.stopped = true;
        self.events.clear();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Run one frame at `now`: apply queued input, then advance any due
    /// ticks. Returns the delay before the next tick, `None` when idle.
    pub fn frame(&mut self, rect: Rect, now: Instant) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        self.view.set_screen(rect);

        while let Some(event) = self.events.pop_front() {
            self.apply(event);
        }
        self.advance(now)
    }

    /// Fire any ticks due at `now` without touching the view or input.
    /// Keeps playback running while the canvas is not on screen.
    pub fn advance(&mut self, now: Instant) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        let due = self.clock.poll(now);
        for _ in 0..due {
            self.world.step(&mut self.agents, &mut self.rng);
        }
        self.clock.time_until_next(now)
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> Response {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        for event in pointer_events(ui, &response) {
            self.push_event(event);
        }
        let next_tick = self.frame(rect, Instant::now());

        self.style.pixels_per_point = ui.ctx().pixels_per_point();
        let painter = painter.with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, theme::bg::AGENTS);

        let tick = self.clock.current_tick();
        let scene = build_agent_scene(
            &self.agents,
            tick,
            &self.view,
            &self.style,
            self.selection.get().copied(),
        );
        paint_agent_scene(&painter, &scene);

        if let Some(cursor) = self.hover {
            if let Some(agent) = self.hit_test(cursor).and_then(|id| self.agents.iter().find(|a| a.id == id)) {
                let text = format!("Agent #{} · {}", agent.id, agent.stance_at(tick).label());
                paint_tooltip(&painter, cursor, &text);
            }
        }

        if let Some(delay) = next_tick {
            ui.ctx().request_repaint_after(delay);
        }
        response
    }

    /// Id of the agent rendered under `screen`, if any
    pub fn hit_test(&self, screen: Pos2) -> Option<u32> {
        nearest_within(
            self.agents.iter().map(|a| {
                (
                    a.id,
                    self.view.to_screen(a.pos),
                    agent_screen_radius(a, &self.view),
                )
            }),
            screen,
        )
    }

    fn apply(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Pressed(pos) => self.pan_from = Some(pos),
            PointerEvent::Moved(pos) => {
                if let Some(last) = self.pan_from.replace(pos) {
                    self.view.pan_by(pos - last);
                }
            }
            PointerEvent::Released(_) => self.pan_from = None,
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
            let agent = self
                .selection
                .get()
                .and_then(|id| self.agents.iter().find(|a| a.id == *id));
            callback(agent);
        }
    }
}
