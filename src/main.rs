mod app;
mod data;
mod util;

use std::path::PathBuf;

use clap::Parser;

use app::{ForceScopeApp, GraphSource};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON graph file; a synthetic graph is generated when omitted
    #[arg(long)]
    graph: Option<PathBuf>,

    #[arg(long, default_value_t = 2000)]
    nodes: usize,

    #[arg(long, default_value_t = 2)]
    links_per_node: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source = match args.graph {
        Some(path) => GraphSource::File(path),
        None => GraphSource::Synthetic {
            nodes: args.nodes,
            links_per_node: args.links_per_node,
            seed: args.seed,
        },
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "forcescope",
        options,
        Box::new(move |cc| Ok(Box::new(ForceScopeApp::new(cc, source.clone())))),
    )
}
