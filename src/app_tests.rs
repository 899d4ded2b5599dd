use super::*;
use crate::view::interaction::PointerEvent;
use egui::{Pos2, Rect};
use serde_json::json;

fn offline() -> Overrides {
    Overrides {
        offline: true,
        ..Default::default()
    }
}

fn canvas() -> Rect {
    Rect::from_min_size(Pos2::ZERO, egui::vec2(800.0, 500.0))
}

#[test]
fn offline_session_loads_demo_data_immediately() {
    let app = VizApp::with_settings(Settings::default(), offline());
    assert!(app.fetch.is_none());
    assert!(app.notice.is_none());

    let engines = app.engines.as_ref().expect("engines built");
    assert_eq!(engines.graph_source, DataSource::Synthetic);
    assert_eq!(engines.agents.source(), DataSource::Synthetic);
    assert_eq!(engines.graph.state().node_count(), 8);
    assert_eq!(engines.agents.agents().len(), 100);
}

#[test]
fn offline_flag_ignores_prediction_id() {
    let overrides = Overrides {
        prediction_id: Some("pred-1".into()),
        offline: true,
        ..Default::default()
    };
    let app = VizApp::with_settings(Settings::default(), overrides);
    assert!(app.fetch.is_none());
    assert!(app.engines.is_some());
}

#[test]
fn no_prediction_skips_the_backend() {
    let app = VizApp::with_settings(Settings::default(), Overrides::default());
    assert!(app.fetch.is_none());
    assert!(app.engines.is_some());
}

#[test]
fn unreachable_backend_yields_empty_payloads() {
    let payloads = fetch_payloads("http://127.0.0.1:9", "pred-1");
    assert!(payloads.is_empty());
}

#[test]
fn failed_fetch_shows_notice_and_demo_data() {
    let mut app = VizApp::with_settings(Settings::default(), offline());
    app.source.offline = false;
    app.source.prediction_id = Some("pred-1".into());
    app.load(Payloads::default());

    assert!(app.notice.is_some());
    let engines = app.engines.as_ref().expect("engines built");
    assert_eq!(engines.graph_source, DataSource::Synthetic);
}

#[test]
fn backend_payloads_drive_both_engines() {
    let payloads = Payloads {
        result: Some(json!({
            "causal_graph": {
                "nodes": [
                    {"id": "a", "label": "Inflation", "probability": 0.7},
                    {"id": "b", "label": "Turnout"}
                ],
                "edges": [{"source": "a", "target": "b", "type": "negative"}]
            }
        })),
        agents: Some(json!({
            "agents": [
                {"id": 1, "stance": "government"},
                {"id": 2, "stance": "opposition"}
            ],
            "ticks": 20
        })),
    };
    let focus = Rc::default();
    let engines = build_engines(&payloads, &Settings::default(), 7, &focus);

    assert_eq!(engines.graph_source, DataSource::Backend);
    assert_eq!(engines.graph.state().node_count(), 2);
    assert_eq!(engines.graph.state().edge_count(), 1);
    assert_eq!(engines.agents.source(), DataSource::Backend);
    assert_eq!(engines.agents.playback().max_ticks, 20);
}

#[test]
fn saved_speed_and_display_settings_apply() {
    let mut settings = Settings::default();
    settings.speed = 5;
    let app = VizApp::with_settings(settings, offline());
    let engines = app.engines.as_ref().expect("engines built");
    assert_eq!(engines.agents.speed(), Speed::X5);
}

#[test]
fn seed_override_changes_demo_population() {
    let a = VizApp::with_settings(Settings::default(), offline());
    let b = VizApp::with_settings(
        Settings::default(),
        Overrides {
            seed: Some(7),
            offline: true,
            ..Default::default()
        },
    );
    let positions = |app: &VizApp| -> Vec<Pos2> {
        let engines = app.engines.as_ref().expect("engines built");
        engines.agents.agents().iter().map(|agent| agent.pos).collect()
    };
    assert_ne!(positions(&a), positions(&b));
}

#[test]
fn agent_click_focuses_details_and_empty_click_clears() {
    let mut app = VizApp::with_settings(Settings::default(), offline());
    let engines = app.engines.as_mut().expect("engines built");
    let now = Instant::now();
    engines.agents.frame(canvas(), now);

    let agent = &engines.agents.agents()[0];
    let id = agent.id;
    let screen = engines.agents.view().to_screen(agent.pos);
    engines.agents.push_event(PointerEvent::Clicked(screen));
    engines.agents.frame(canvas(), now);
    assert_eq!(*app.focus.borrow(), Focus::Agent(id));

    // Far outside the world, nothing can be hit there
    let engines = app.engines.as_mut().expect("engines built");
    engines.agents.push_event(PointerEvent::Clicked(Pos2::new(-500.0, -500.0)));
    engines.agents.frame(canvas(), now);
    assert_eq!(*app.focus.borrow(), Focus::None);
}

#[test]
fn graph_click_focuses_node() {
    let mut app = VizApp::with_settings(Settings::default(), offline());
    let engines = app.engines.as_mut().expect("engines built");
    engines.graph.frame(canvas());

    let node = engines.graph.state().nodes().next().expect("a node");
    let id = node.id().to_string();
    let screen = engines.graph.view().to_screen(node.pos);
    engines.graph.push_event(PointerEvent::Clicked(screen));
    engines.graph.frame(canvas());

    assert_eq!(*app.focus.borrow(), Focus::Node(id));
}

#[test]
fn playback_keeps_running_on_graph_tab() {
    let mut app = VizApp::with_settings(Settings::default(), offline());
    app.settings.tab = Tab::CausalGraph;
    let start = Instant::now();
    app.engines.as_mut().expect("engines built").agents.play();

    assert!(app.advance_hidden_agents(start).is_some());
    for i in 1..=20 {
        app.advance_hidden_agents(start + Duration::from_millis(50 * i));
    }
    let engines = app.engines.as_ref().expect("engines built");
    assert_eq!(engines.agents.playback().current_tick, 20);
    assert!(engines.agents.playback().playing);
}

#[test]
fn agents_tab_leaves_ticking_to_the_canvas() {
    let mut app = VizApp::with_settings(Settings::default(), offline());
    app.settings.tab = Tab::Agents;
    let start = Instant::now();
    app.engines.as_mut().expect("engines built").agents.play();

    assert!(app.advance_hidden_agents(start).is_none());
    app.advance_hidden_agents(start + Duration::from_secs(1));
    let engines = app.engines.as_ref().expect("engines built");
    assert_eq!(engines.agents.playback().current_tick, 0);
}

#[test]
fn reload_resets_focus() {
    let mut app = VizApp::with_settings(Settings::default(), offline());
    *app.focus.borrow_mut() = Focus::Agent(3);
    app.load(Payloads::default());
    assert_eq!(*app.focus.borrow(), Focus::None);
}

#[test]
fn truncate_long_ids() {
    assert_eq!(truncate("abcdef", 3), "abc...");
    assert_eq!(truncate("abc", 3), "abc");
}
