use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crkn_tv::controller::Controller;
use crkn_tv::domain::{DEFAULT_PAGE_SIZE, TVConfig, TVError};
use crkn_tv::model::{Model, Status};
use crkn_tv::record::ResultSet;
use crkn_tv::ui::TableUI;
use crkn_tv::view::display_sink;

/// Browse CRKN package and collection records in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Result object (.json) or table (.csv, .tsv, .parquet, .arrow) to show
    path: String,

    /// Rows per page, one of 100, 250 or 500
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Widest a column gets before its content is cut
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Milliseconds to wait for terminal events
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, TVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| TVError::LoadingFailed(format!("Can not expand {path}: {e}")))
}

fn init_tracing(args: &Args) -> Result<(), TVError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // The terminal belongs to the ui, logs only go to a file
    let file_layer = match &args.log_file {
        Some(path) => {
            let file = File::create(expand(path)?)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), TVError> {
    init_tracing(&args)?;

    let cfg = TVConfig::default()
        .with_event_poll_time(args.event_poll_time)
        .with_max_column_width(args.max_column_width)
        .with_page_size(args.page_size)
        .validate()?;
    info!("Starting crkn-tv with {:?}", cfg);

    let result = ResultSet::load(expand(&args.path)?)?;

    let mut terminal = ratatui::init();
    let size = terminal.size()?;

    let mut model = Model::init(&cfg, result, size.width as usize, size.height as usize);
    model.set_display_sink(display_sink(|data| {
        debug!(
            "Visible rows: {} of {}",
            data.rows.len(),
            data.data_source.len()
        )
    }));
    let ui = TableUI::new();
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;
        model.after_render();

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message);
    }

    Ok(())
}
