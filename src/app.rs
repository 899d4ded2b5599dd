//! Main application state and UI.

use crate::agents::{Agent, AgentWorld, DataSource, Speed, Stance, StanceSummary};
use crate::api::ApiClient;
use crate::data::{adapt_causal_graph, adapt_simulation};
use crate::engine::{AgentSimEngine, CausalGraphEngine};
use crate::graph::{EdgeKind, GraphNode};
use crate::settings::{Overrides, Settings, SourceConfig, Tab};
use crate::theme;
use eframe::egui::{self, RichText};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Legend, Line, Plot, PlotPoints, VLine};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Minimum time between settings writes while the user is tweaking controls
const SETTINGS_DEBOUNCE: Duration = Duration::from_secs(2);

/// Raw backend responses; `None` where a request failed or was skipped
#[derive(Debug, Default)]
pub struct Payloads {
    pub result: Option<Value>,
    pub agents: Option<Value>,
}

impl Payloads {
    fn is_empty(&self) -> bool {
        self.result.is_none() && self.agents.is_none()
    }
}

/// Fetch both payloads for a prediction. Failures are logged and leave the
/// corresponding payload empty so the adapters fall back to demo data.
pub fn fetch_payloads(api_url: &str, prediction_id: &str) -> Payloads {
    let client = match ApiClient::new(api_url) {
        Ok(client) => client,
        Err(e) => {
            warn!("{e}, using demo data");
            return Payloads::default();
        }
    };
    let result = client
        .fetch_prediction_result(prediction_id)
        .inspect_err(|e| warn!("causal graph unavailable: {e}"))
        .ok();
    let agents = client
        .fetch_prediction_agents(prediction_id)
        .inspect_err(|e| warn!("agent simulation unavailable: {e}"))
        .ok();
    Payloads { result, agents }
}

/// Run `fetch_payloads` on a background thread
fn spawn_fetch(api_url: String, prediction_id: String) -> Receiver<Payloads> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let payloads = fetch_payloads(&api_url, &prediction_id);
        // Receiver is gone if the window closed mid-fetch
        let _ = tx.send(payloads);
    });
    rx
}

/// Entity shown in the details section, last selected on either canvas
#[derive(Debug, Clone, PartialEq, Default)]
enum Focus {
    #[default]
    None,
    Node(String),
    Agent(u32),
}

struct Engines {
    graph: CausalGraphEngine,
    graph_source: DataSource,
    agents: AgentSimEngine,
}

/// Build both engines from whatever payloads arrived
fn build_engines(
    payloads: &Payloads,
    settings: &Settings,
    seed: u64,
    focus: &Rc<RefCell<Focus>>,
) -> Engines {
    let (graph_data, graph_source) = adapt_causal_graph(payloads.result.as_ref());
    let mut graph = CausalGraphEngine::new(graph_data, settings.force_layout());
    graph.set_show_labels(settings.show_labels);
    graph.set_show_arrows(settings.show_arrows);
    let node_focus = Rc::clone(focus);
    graph.on_select(move |node: Option<&GraphNode>| {
        let mut focus = node_focus.borrow_mut();
        match node {
            Some(node) => *focus = Focus::Node(node.id.clone()),
            None if matches!(*focus, Focus::Node(_)) => *focus = Focus::None,
            None => {}
        }
    });

    let sim = adapt_simulation(payloads.agents.as_ref(), seed);
    let mut agents = AgentSimEngine::new(sim, AgentWorld::default(), seed);
    agents.set_speed(settings.speed);
    let agent_focus = Rc::clone(focus);
    agents.on_select(move |agent: Option<&Agent>| {
        let mut focus = agent_focus.borrow_mut();
        match agent {
            Some(agent) => *focus = Focus::Agent(agent.id),
            None if matches!(*focus, Focus::Agent(_)) => *focus = Focus::None,
            None => {}
        }
    });

    Engines {
        graph,
        graph_source,
        agents,
    }
}

/// Main viewer application
pub struct VizApp {
    source: SourceConfig,
    /// Pending background fetch; engines are built when it resolves
    fetch: Option<Receiver<Payloads>>,
    engines: Option<Engines>,
    /// Shown when a prediction was requested but nothing came back
    notice: Option<String>,
    focus: Rc<RefCell<Focus>>,

    // Settings persistence
    settings: Settings,
    settings_dirty: bool,
    last_settings_save: Instant,
}

impl VizApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, overrides: Overrides) -> Self {
        Self::with_settings(Settings::load(), overrides)
    }

    fn with_settings(settings: Settings, overrides: Overrides) -> Self {
        let source = settings.source(&overrides);
        let mut app = Self {
            fetch: None,
            engines: None,
            notice: None,
            focus: Rc::default(),
            settings,
            settings_dirty: false,
            last_settings_save: Instant::now(),
            source,
        };

        match (app.source.prediction_id.clone(), app.source.offline) {
            (Some(id), false) => {
                info!(prediction = %id, api = %app.source.api_url, "fetching prediction");
                app.fetch = Some(spawn_fetch(app.source.api_url.clone(), id));
            }
            (Some(id), true) => {
                info!(prediction = %id, "offline, ignoring prediction and using demo data");
                app.load(Payloads::default());
            }
            (None, _) => {
                info!("no prediction selected, using demo data");
                app.load(Payloads::default());
            }
        }
        app
    }

    fn load(&mut self, payloads: Payloads) {
        if self.source.prediction_id.is_some() && !self.source.offline && payloads.is_empty() {
            self.notice = Some("Backend unavailable, showing demo data".to_string());
        }
        *self.focus.borrow_mut() = Focus::None;
        self.engines = Some(build_engines(
            &payloads,
            &self.settings,
            self.source.seed,
            &self.focus,
        ));
    }

    /// Pick up the background fetch result once it lands
    fn poll_fetch(&mut self, ctx: &egui::Context) {
        let Some(rx) = &self.fetch else {
            return;
        };
        match rx.try_recv() {
            Ok(payloads) => {
                self.fetch = None;
                self.load(payloads);
            }
            Err(TryRecvError::Empty) => {
                ctx.request_repaint_after(Duration::from_millis(100));
            }
            Err(TryRecvError::Disconnected) => {
                warn!("fetch thread exited without a result");
                self.fetch = None;
                self.load(Payloads::default());
            }
        }
    }

    /// Mark settings as needing to be saved
    fn mark_settings_dirty(&mut self) {
        self.settings_dirty = true;
    }

    /// Save settings if dirty and enough time has passed (debounce)
    fn maybe_save_settings(&mut self) {
        if self.settings_dirty && self.last_settings_save.elapsed() >= SETTINGS_DEBOUNCE {
            self.settings.save();
            self.settings_dirty = false;
            self.last_settings_save = Instant::now();
        }
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Foresight Viz");
        ui.add_space(10.0);

        self.render_status(ui);
        ui.add_space(10.0);

        let prev_tab = self.settings.tab;
        ui.horizontal(|ui| {
            for tab in [Tab::CausalGraph, Tab::Agents] {
                ui.selectable_value(&mut self.settings.tab, tab, tab.label());
            }
        });
        if self.settings.tab != prev_tab {
            self.mark_settings_dirty();
        }
        ui.separator();

        if self.engines.is_none() {
            return;
        }
        match self.settings.tab {
            Tab::CausalGraph => self.render_graph_controls(ui),
            Tab::Agents => self.render_playback_controls(ui),
        }

        ui.add_space(10.0);
        ui.separator();
        self.render_details(ui);
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        if self.fetch.is_some() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading prediction...");
            });
            return;
        }

        if let Some(id) = &self.source.prediction_id {
            ui.label(format!("Prediction: {}", truncate(id, 28)));
        }
        if let Some(engines) = &self.engines {
            source_label(ui, "Graph", engines.graph_source);
            source_label(ui, "Agents", engines.agents.source());
        }
        if let Some(notice) = &self.notice {
            ui.colored_label(theme::accent::AMBER, notice);
        }
    }

    fn render_graph_controls(&mut self, ui: &mut egui::Ui) {
        let Some(engines) = self.engines.as_mut() else {
            return;
        };
        let graph = &mut engines.graph;
        let mut changed = false;

        egui::CollapsingHeader::new("Layout")
            .default_open(true)
            .show(ui, |ui| {
                let state = graph.state();
                ui.label(format!(
                    "{} factors, {} links",
                    state.node_count(),
                    state.edge_count()
                ));
                if state.dropped_edges() > 0 {
                    ui.colored_label(
                        theme::text::MUTED,
                        format!("{} links with unknown endpoints hidden", state.dropped_edges()),
                    );
                }
                if graph.is_settled() {
                    ui.colored_label(theme::text::MUTED, "Settled");
                } else {
                    ui.colored_label(
                        theme::accent::BLUE,
                        format!("Settling (alpha {:.3})", graph.state().temperature.alpha),
                    );
                }

                ui.horizontal(|ui| {
                    if ui.button("Reheat").clicked() {
                        graph.reheat();
                    }
                    if ui.button("Reset view").clicked() {
                        graph.reset_view();
                    }
                });

                ui.add_space(5.0);
                if ui.checkbox(&mut self.settings.show_labels, "Labels").changed() {
                    graph.set_show_labels(self.settings.show_labels);
                    changed = true;
                }
                if ui.checkbox(&mut self.settings.show_arrows, "Arrows").changed() {
                    graph.set_show_arrows(self.settings.show_arrows);
                    changed = true;
                }
            });

        egui::CollapsingHeader::new("Physics")
            .default_open(false)
            .show(ui, |ui| {
                let layout = &mut self.settings.layout;
                let mut physics_changed = false;
                physics_changed |= ui
                    .add(egui::Slider::new(&mut layout.link_distance, 30.0..=400.0).text("Link distance"))
                    .changed();
                physics_changed |= ui
                    .add(egui::Slider::new(&mut layout.charge_strength, 0.0..=1500.0).text("Repulsion"))
                    .changed();
                physics_changed |= ui
                    .add(egui::Slider::new(&mut layout.collision_padding, 0.0..=40.0).text("Spacing"))
                    .changed();
                physics_changed |= ui
                    .add(egui::Slider::new(&mut layout.velocity_decay, 0.05..=0.9).text("Friction"))
                    .changed();
                if physics_changed {
                    graph.set_layout(self.settings.force_layout());
                    changed = true;
                }
            });

        ui.add_space(5.0);
        ui.label(RichText::new("Links").strong());
        for kind in [EdgeKind::Positive, EdgeKind::Negative] {
            let color = match kind {
                EdgeKind::Positive => theme::edge::POSITIVE,
                EdgeKind::Negative => theme::edge::NEGATIVE,
            };
            ui.horizontal(|ui| {
                ui.colored_label(color, "━");
                ui.label(kind.label());
            });
        }

        if changed {
            self.mark_settings_dirty();
        }
    }

    fn render_playback_controls(&mut self, ui: &mut egui::Ui) {
        let Some(engines) = self.engines.as_mut() else {
            return;
        };
        let agents = &mut engines.agents;
        let playback = agents.playback();
        let mut speed_changed = false;

        egui::CollapsingHeader::new("Playback")
            .default_open(true)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let label = if playback.playing { "⏸ Pause" } else { "▶ Play" };
                    if ui.button(label).clicked() {
                        agents.toggle();
                    }
                    if ui.button("⏮ Reset").clicked() {
                        agents.reset();
                    }
                });

                ui.horizontal(|ui| {
                    for speed in Speed::ALL {
                        if ui
                            .selectable_label(playback.speed == speed, speed.label())
                            .clicked()
                        {
                            agents.set_speed(speed.multiplier());
                            self.settings.speed = speed.multiplier();
                            speed_changed = true;
                        }
                    }
                });

                let mut tick = playback.current_tick;
                let slider = egui::Slider::new(&mut tick, 0..=playback.max_ticks).show_value(false);
                if ui.add(slider).changed() {
                    agents.seek(i64::from(tick));
                }
                ui.label(format!(
                    "Tick {} / {} · {}",
                    playback.current_tick,
                    playback.max_ticks,
                    agents.phase().label()
                ));

                if ui.button("Reset view").clicked() {
                    agents.reset_view();
                }
            });

        egui::CollapsingHeader::new("Stance")
            .default_open(true)
            .show(ui, |ui| {
                let current = agents.current_summary();
                render_stance_legend(ui, &current);
                ui.add_space(5.0);
                ui.colored_label(
                    theme::text::MUTED,
                    format!("{} agents", agents.summary().total_agents),
                );
            });

        egui::CollapsingHeader::new("Timeline")
            .default_open(true)
            .show(ui, |ui| {
                render_stance_timeline(ui, agents.stance_series(), playback.current_tick);
            });

        if speed_changed {
            self.mark_settings_dirty();
        }
    }

    fn render_details(&self, ui: &mut egui::Ui) {
        let Some(engines) = &self.engines else {
            return;
        };
        let focus = self.focus.borrow().clone();

        ui.collapsing("Details", |ui| match focus {
            Focus::Node(_) => match engines.graph.selected() {
                Some(node) => render_node_details(ui, node),
                None => {
                    ui.label("Selected factor is no longer loaded.");
                }
            },
            Focus::Agent(_) => match engines.agents.selected() {
                Some(agent) => {
                    let tick = engines.agents.playback().current_tick;
                    render_agent_details(ui, agent, tick);
                }
                None => {
                    ui.label("Selected agent is no longer loaded.");
                }
            },
            Focus::None => {
                ui.label("Click a factor or an agent");
                ui.label("to see its details.");
            }
        });
    }

    fn render_canvas(&mut self, ui: &mut egui::Ui) {
        let Some(engines) = self.engines.as_mut() else {
            ui.centered_and_justified(|ui| {
                ui.spinner();
            });
            return;
        };
        match self.settings.tab {
            Tab::CausalGraph => {
                engines.graph.show(ui);
            }
            Tab::Agents => {
                engines.agents.show(ui);
            }
        }
        if let Some(delay) = self.advance_hidden_agents(Instant::now()) {
            ui.ctx().request_repaint_after(delay);
        }
    }

    /// Keep agent playback ticking while the graph tab is shown
    fn advance_hidden_agents(&mut self, now: Instant) -> Option<Duration> {
        if self.settings.tab == Tab::Agents {
            return None;
        }
        self.engines.as_mut()?.agents.advance(now)
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let Some(engines) = self.engines.as_mut() else {
            return;
        };
        let (space, r) = ctx.input(|i| (i.key_pressed(egui::Key::Space), i.key_pressed(egui::Key::R)));
        match self.settings.tab {
            Tab::Agents if space => engines.agents.toggle(),
            Tab::CausalGraph if r => engines.graph.reheat(),
            _ => {}
        }
    }
}

fn source_label(ui: &mut egui::Ui, what: &str, source: DataSource) {
    let color = match source {
        DataSource::Backend => theme::accent::GREEN,
        DataSource::Synthetic => theme::accent::AMBER,
    };
    ui.horizontal(|ui| {
        ui.colored_label(color, "●");
        ui.label(format!("{what}: {}", source.label()));
    });
}

fn render_stance_legend(ui: &mut egui::Ui, summary: &StanceSummary) {
    for stance in Stance::ALL {
        ui.horizontal(|ui| {
            ui.colored_label(theme::stance_color(stance), "●");
            ui.label(stance.label());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("{:.0}%", summary.pct(stance) * 100.0));
            });
        });
    }
}

/// Share of each stance over the run with a marker at `tick`
fn render_stance_timeline(ui: &mut egui::Ui, series: &[StanceSummary], tick: u32) {
    Plot::new("stance_timeline")
        .height(160.0)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_y(0.0)
        .include_y(100.0)
        .show(ui, |plot_ui| {
            for stance in Stance::ALL {
                let points: Vec<[f64; 2]> = series
                    .iter()
                    .enumerate()
                    .map(|(t, s)| [t as f64, f64::from(s.pct(stance)) * 100.0])
                    .collect();
                plot_ui.line(
                    Line::new(PlotPoints::from(points))
                        .color(theme::stance_color(stance))
                        .name(stance.label()),
                );
            }
            plot_ui.vline(VLine::new(f64::from(tick)).color(theme::text::LABEL));
        });
}

fn render_node_details(ui: &mut egui::Ui, node: &GraphNode) {
    ui.label(RichText::new(&node.label).strong());
    ui.colored_label(theme::text::MUTED, &node.category);
    ui.add_space(5.0);
    ui.label(format!("Probability: {:.0}%", node.probability * 100.0));
    ui.label(format!("Confidence: {:.0}%", node.confidence * 100.0));
}

fn render_agent_details(ui: &mut egui::Ui, agent: &Agent, tick: u32) {
    let stance = agent.stance_at(tick);
    ui.label(RichText::new(format!("Agent #{}", agent.id)).strong());
    ui.horizontal(|ui| {
        ui.colored_label(theme::stance_color(stance), "●");
        ui.label(format!("{} at tick {tick}", stance.label()));
    });
    ui.add_space(5.0);

    egui::Grid::new("agent_profile")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            let rows = [
                ("Age", agent.age.to_string()),
                ("Region", agent.region.clone()),
                ("Ethnicity", agent.ethnicity.clone()),
                ("Income", agent.income_level.clone()),
                ("Education", agent.education.clone()),
                ("Influence", format!("{:.2}", agent.influence)),
                ("Connections", agent.connections.len().to_string()),
                ("Final stance", agent.stance.label().to_string()),
            ];
            for (name, value) in rows {
                ui.colored_label(theme::text::LABEL, name);
                ui.label(value);
                ui.end_row();
            }
        });

    if agent.stance_history.is_empty() {
        return;
    }
    ui.add_space(5.0);
    ui.label(RichText::new("Stance history").strong());
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::exact(48.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Tick");
            });
            header.col(|ui| {
                ui.strong("Stance");
            });
        })
        .body(|mut body| {
            for change in &agent.stance_history {
                let reached = change.tick <= tick;
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(change.tick.to_string());
                    });
                    row.col(|ui| {
                        let color = if reached {
                            theme::stance_color(change.stance)
                        } else {
                            theme::text::MUTED
                        };
                        ui.colored_label(color, change.stance.label());
                    });
                });
            }
        });
}

impl eframe::App for VizApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_fetch(ctx);
        self.maybe_save_settings();
        self.handle_shortcuts(ctx);

        // Dark theme
        ctx.set_visuals(egui::Visuals::dark());

        egui::SidePanel::left("sidebar")
            .min_width(260.0)
            .frame(
                egui::Frame::none()
                    .fill(theme::bg::PANEL)
                    .inner_margin(egui::Margin::symmetric(12.0, 8.0)),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_sidebar(ui);
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme::bg::GRAPH))
            .show(ctx, |ui| {
                self.render_canvas(ui);
            });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(engines) = self.engines.as_mut() {
            engines.graph.stop();
            engines.agents.stop();
        }
        self.fetch = None;
        if self.settings_dirty {
            debug!("saving settings on exit");
            self.settings.save();
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
