// What you SEE:
// • A white canvas with a status panel underneath.
// • Hold Left Mouse: draw. Enter/Space: classify the drawing.
// • C clears the canvas and the prediction. ESC quits.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sketch_classify::config::Config;
use sketch_classify::display::{render, Layout};
use sketch_classify::model::{Classifier, DenseModel};
use sketch_classify::types::FrameBuffer;
use sketch_classify::window::Drawer;
use sketch_classify::App;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Draw a shape and let a pre-trained model guess what it is.
#[derive(Parser, Debug)]
#[command(name = "sketch-classify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (JSON); defaults to ./sketch.json when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model description, overrides the config
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(path) = cli.model {
        config.model.path = path;
    }

    /* --- Model ---
       Loaded once; a failure shows up in the status panel, drawing still works. */
    let model = DenseModel::load(&config.model.path).map(|m| Arc::new(m) as Arc<dyn Classifier>);

    /* --- Window + app --- */
    // The canvas origin doesn't depend on the panel size
    let origin = Layout::new(config.canvas.width, config.canvas.height, 0).canvas_origin();
    let mut app = App::new(&config, model, origin);
    let layout = Layout::new(config.canvas.width, config.canvas.height, app.labels().len());
    let mut drawer = Drawer::new("Sketch Classifier", layout.width, layout.height)?;
    let mut screen = FrameBuffer::filled(layout.width, layout.height, 0);
    info!(width = config.canvas.width, height = config.canvas.height, "canvas ready");

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() {
        let commands = drawer.commands();
        if commands.quit {
            break;
        }

        // 1) Pointer input → strokes on the canvas
        for event in drawer.pointer_events(&layout) {
            app.handle_input(&event);
        }

        // 2) Keys
        if commands.clear {
            app.clear();
        }
        if commands.classify {
            app.request_classification();
        }

        // 3) Pick up finished predictions
        app.tick();

        // 4) Paint and present
        render(&mut screen, &layout, app.surface().buffer(), app.display());
        drawer.present(&screen)?;
    }

    Ok(())
}
