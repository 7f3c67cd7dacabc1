// Entry point and console flow.
//
// - Option [1] loads the three source tables and builds the snapshot.
// - Option [2] prints the all-regions headline and daily totals.
// - Option [3] selects a county and prints its indicators.
// - Option [4] exports the aggregated views and the last selection.
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};
use once_cell::sync::OnceCell;

use covid_dashboard::output;
use covid_dashboard::reports;
use covid_dashboard::util::format_int;
use covid_dashboard::{Config, PipelineResult, Snapshot};

// Built once, read-only afterwards.
static SNAPSHOT: OnceCell<Snapshot> = OnceCell::new();

#[derive(Parser, Debug)]
#[command(version, about = "Confirmed/deaths/recovered time-series dashboard")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    confirmed: Option<PathBuf>,
    #[arg(long)]
    deaths: Option<PathBuf>,
    #[arg(long)]
    recovered: Option<PathBuf>,
    /// County selected when none is typed
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Load the snapshot before showing the menu
    #[arg(long)]
    preload: bool,
}

impl Cli {
    fn into_config(self) -> PipelineResult<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(p) = self.confirmed {
            config.confirmed_path = p;
        }
        if let Some(p) = self.deaths {
            config.deaths_path = p;
        }
        if let Some(p) = self.recovered {
            config.recovered_path = p;
        }
        if let Some(r) = self.region {
            config.default_region = Some(r);
        }
        if let Some(d) = self.output_dir {
            config.output_dir = d;
        }
        Ok(config)
    }
}

/// Read a single trimmed line after printing `prompt`. `None` once stdin
/// is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the menu. `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(resp) = read_line("Back to Menu (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn loaded() -> Option<&'static Snapshot> {
    let snapshot = SNAPSHOT.get();
    if snapshot.is_none() {
        println!("Error: No data loaded. Please load the files first (option 1).\n");
    }
    snapshot
}

/// Handle option [1]: load the tables and build the snapshot.
fn handle_load(config: &Config) {
    if SNAPSHOT.get().is_some() {
        println!("Data already loaded.\n");
        return;
    }
    match Snapshot::load(config) {
        Ok(snapshot) => {
            println!(
                "Processing dataset... ({} dates, {} counties)\n",
                format_int(snapshot.daily_totals().len()),
                format_int(snapshot.region_options().len())
            );
            let _ = SNAPSHOT.set(snapshot);
        }
        Err(e) => {
            error!("Failed to load data: {e}");
            eprintln!("Failed to load data: {e}\n");
        }
    }
}

/// Handle option [2]: headline indicators and recent daily totals.
fn handle_global() {
    let Some(snapshot) = loaded() else {
        return;
    };
    println!("All Counties\n");
    output::preview_table_rows(&reports::headline_rows(&snapshot.global_indicators()), 4);
    let totals = snapshot.daily_totals();
    let tail = &totals[totals.len().saturating_sub(10)..];
    println!("Daily Totals (last {} dates)\n", tail.len());
    output::preview_table_rows(&reports::daily_total_rows(tail), tail.len());
}

/// Handle option [3]: select a county and print everything derived from it.
fn handle_select(config: &Config) -> Option<String> {
    let snapshot = loaded()?;
    let default = config.default_region.clone().unwrap_or_default();
    let typed = read_line(&format!("Select County [{default}]: ")).unwrap_or_default();
    let region = if typed.is_empty() { default } else { typed };

    match snapshot.select_region(&region) {
        Ok(report) => {
            println!("\nNew cases: {} (as of {})\n", report.region, report.as_of);
            output::preview_table_rows(&reports::indicator_rows(&report.indicators), 4);
            println!("Total Cases: {}\n", report.region);
            output::preview_table_rows(&reports::breakdown_rows(&report.breakdown), 4);
            println!(
                "Last {} Days Confirmed Cases: {}\n",
                report.recent_series.window, report.region
            );
            let rows = reports::recent_series_rows(&report.recent_series);
            output::preview_table_rows(&rows, rows.len());
            println!(
                "Map centre: {}, {}\n",
                report.geo_center.lat, report.geo_center.long
            );
            let markers = reports::geo_marker_rows(&report.geo_markers);
            output::preview_table_rows(&markers, markers.len());
            Some(region)
        }
        Err(e) => {
            println!("No data: {e}\n");
            None
        }
    }
}

/// Handle option [4]: write CSV views and, if a county was selected, its
/// report as JSON.
fn handle_export(config: &Config, selected: Option<&str>) {
    let Some(snapshot) = loaded() else {
        return;
    };
    match output::export_views(snapshot, &config.output_dir) {
        Ok(paths) => {
            for p in paths {
                println!("(Exported {})", p.display());
            }
        }
        Err(e) => eprintln!("Write error: {e}"),
    }
    let Some(region) = selected else {
        println!();
        return;
    };
    let report = match snapshot.select_region(region) {
        Ok(report) => report,
        Err(e) => {
            warn!("Skipping selection export for {region:?}: {e}");
            println!("No data: {e}\n");
            return;
        }
    };
    let path = config
        .output_dir
        .join(format!("selection_{}.json", region.replace(' ', "_")));
    match output::write_json(&path, &report) {
        Ok(()) => println!("(Exported {})\n", path.display()),
        Err(e) => eprintln!("Write error: {e}\n"),
    }
}

fn main() {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let preload = cli.preload;
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    info!("config: {config:?}");
    if preload {
        handle_load(&config);
    }

    let mut selected: Option<String> = None;
    loop {
        println!("Select Option:");
        println!("[1] Load the files");
        println!("[2] Show all-county totals");
        println!("[3] Select county");
        println!("[4] Export reports\n");
        let Some(choice) = read_line("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&config),
            "2" => handle_global(),
            "3" => {
                if let Some(region) = handle_select(&config) {
                    selected = Some(region);
                }
            }
            "4" => {
                handle_export(&config, selected.as_deref());
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2, 3 or 4.\n"),
        }
    }
}
