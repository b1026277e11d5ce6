use std::fs::File;
use std::io::stdout;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod client;
mod controller;
mod domain;
mod expansion;
mod highlight;
mod inputter;
mod layout;
mod model;
mod paginate;
mod presenter;
mod rows;
mod search;
mod sort;
mod ui;

use client::HttpBackend;
use controller::Controller;
use domain::{RsvConfig, RsvError};
use model::{Model, Status};
use ui::TableUI;

/// Search a CSV search backend by keyword and browse the matching rows.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Base url of the search backend
    #[arg(short, long, env = "RSV_BACKEND_URL", default_value = "http://localhost:8008")]
    backend_url: String,

    /// Rows per page
    #[arg(long, default_value_t = 50)]
    page_size: usize,

    /// Log file, RUST_LOG controls the level
    #[arg(long, default_value = "~/.rsv.log")]
    log_file: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Columns that get a wider default width
    #[arg(long, value_delimiter = ',', default_value = "id,name,title")]
    primary_columns: Vec<String>,

    /// Keyword to search for once the backend is up
    keyword: Option<String>,
}

impl Args {
    fn config(&self) -> RsvConfig {
        RsvConfig::default()
            .backend_url(self.backend_url.clone())
            .page_size(self.page_size.max(1))
            .event_poll_time(self.poll_ms)
            .primary_columns(self.primary_columns.clone())
    }
}

fn setup_logging(log_file: &str) -> Result<(), RsvError> {
    let path = shellexpand::full(log_file)
        .map_err(|e| RsvError::LoggingFailed(e.to_string()))?
        .into_owned();
    let file = File::create(&path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| RsvError::LoggingFailed(e.to_string()))
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = setup_logging(&args.log_file) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    info!("Starting rsv with {:?}", args);

    let mut terminal = ratatui::init();
    let result = run(&args, &mut terminal);
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();

    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args, terminal: &mut DefaultTerminal) -> Result<(), RsvError> {
    execute!(stdout(), EnableMouseCapture)?;

    let cfg = args.config();
    let backend = Arc::new(HttpBackend::new(
        &cfg.backend_url,
        Duration::from_secs(cfg.request_timeout),
    )?);

    let size = terminal.size()?;
    let mut model = Model::init(&cfg, backend, size.width.into(), size.height.into());
    if let Some(keyword) = &args.keyword {
        model.queue_search(keyword);
    }

    let mut ui = TableUI::new();
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message);
    }
    info!("Bye");

    Ok(())
}
