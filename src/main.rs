use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod fetch;
mod filter;
mod inputter;
mod model;
mod planet;
mod report;
mod ui;
mod view;

use controller::Controller;
use domain::{DEFAULT_ENDPOINT, PVConfig, PVError};
use filter::{Comparison, NumericColumn};
use model::{Model, Status};
use ui::TableUI;
use view::PlanetView;

/// Browse the Star Wars planets catalog in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Planets endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// Read the catalog payload from a JSON file instead of the endpoint
    #[arg(long)]
    file: Option<PathBuf>,

    /// Initial name filter
    #[arg(long)]
    name: Option<String>,

    /// Numeric filter column (population, orbital_period, diameter, rotation_period, surface_water)
    #[arg(long, value_parser = parse_column)]
    column: Option<NumericColumn>,

    /// Numeric filter comparison ("greater than", "equal to", "less than", >, =, <)
    #[arg(long, value_parser = parse_comparison)]
    comparison: Option<Comparison>,

    /// Numeric filter value, applies the numeric filter
    #[arg(long, value_parser = parse_value)]
    value: Option<String>,

    /// Print the filtered table and exit
    #[arg(long)]
    print: bool,

    /// Write logs to this file (the interactive view logs nowhere else)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Event poll interval in ms
    #[arg(long, default_value_t = 100)]
    poll: u64,

    /// Widest a column is drawn
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,
}

impl Args {
    fn config(&self) -> PVConfig {
        PVConfig::default()
            .with_endpoint(self.url.clone())
            .with_dataset_file(self.file.clone())
            .with_event_poll_time(self.poll)
            .with_max_column_width(self.max_column_width)
    }

    /// Puts the command line filters into `view`.
    fn apply_filters(&self, view: &mut PlanetView) -> Result<(), PVError> {
        if let Some(name) = &self.name {
            view.set_name_query(name);
        }
        if let Some(column) = self.column {
            view.set_column(column);
        }
        if let Some(comparison) = self.comparison {
            view.set_comparison(comparison);
        }
        if let Some(value) = &self.value {
            view.set_value_text(value);
            view.apply_numeric_filter()?;
        }
        Ok(())
    }
}

fn parse_column(s: &str) -> Result<NumericColumn, String> {
    s.parse().map_err(|e: PVError| e.to_string())
}

fn parse_comparison(s: &str) -> Result<Comparison, String> {
    s.parse().map_err(|e: PVError| e.to_string())
}

// Checked at parse time, the view only sees numeric values.
fn parse_value(s: &str) -> Result<String, String> {
    filter::parse_threshold(s)
        .map(|_| s.to_string())
        .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.log_file.as_deref(), args.print) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = if args.print {
        print_table(&args)
    } else {
        run(&args)
    };
    match result {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(log_file: Option<&Path>, to_stderr: bool) -> Result<(), PVError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    match log_file {
        Some(path) => {
            let file = File::create(fetch::expand_path(path)?)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None if to_stderr => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        None => registry.init(),
    }
    Ok(())
}

fn print_table(args: &Args) -> Result<(), PVError> {
    print!("{}", filtered_report(args)?);
    Ok(())
}

fn filtered_report(args: &Args) -> Result<String, PVError> {
    let config = args.config();
    let source = fetch::source_from_config(&config)?;
    let mut view = PlanetView::new(source.fetch()?);
    args.apply_filters(&mut view)?;
    info!(
        "{} of {} planets from {} match",
        view.rows().len(),
        view.dataset().len(),
        source.describe()
    );
    Ok(report::render_table(&view, config.max_column_width))
}

fn run(args: &Args) -> Result<(), PVError> {
    let config = args.config();
    let source = fetch::source_from_config(&config)?;

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), PVError> {
        let size = terminal.size()?;
        let mut model = Model::init(&config, size.width as usize, size.height as usize)?;
        let mut ui = TableUI::new();
        let controller = Controller::new(&config);

        // First frame while the catalog is fetched
        terminal.draw(|f| ui.draw(&model, f))?;
        model.load(source);
        if let Err(e) = model.configure_filters(|view| args.apply_filters(view)) {
            info!("Start up filter ignored: {e}");
        }

        while model.status != Status::QUITTING {
            terminal.draw(|f| ui.draw(&model, f))?;
            let message = controller.handle_event(&model)?;
            model.update(message)?;
        }
        info!(
            "Leaving with {} of {} planets visible",
            model.view().rows().len(),
            model.view().dataset().len()
        );
        Ok(())
    })();
    ratatui::restore();
    result
}
