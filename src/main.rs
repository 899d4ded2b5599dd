//! Native Foresight Viewer
//!
//! Interactive causal graph and agent simulation playback for prediction results.

mod agents;
mod api;
mod app;
mod data;
mod engine;
mod graph;
mod settings;
mod theme;
mod view;

use clap::Parser;
use eframe::egui;
use settings::Overrides;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Prediction to load from the backend
    #[arg(long = "prediction")]
    prediction: Option<String>,

    /// Backend base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Skip the backend and show demo data
    #[arg(long)]
    offline: bool,

    /// Seed for demo data and agent motion
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Overrides {
            prediction_id: args.prediction,
            api_url: args.api_url,
            offline: args.offline,
            seed: args.seed,
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let overrides = Overrides::from(Args::parse());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Foresight Viz"),
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(
        "Foresight Viz",
        options,
        Box::new(move |cc| Ok(Box::new(app::VizApp::new(cc, overrides)))),
    )
}
