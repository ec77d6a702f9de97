use chrono::Utc;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

use tread::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    network::{read_link_states, NetworkPoller, TcpProbe, LINK_STATE_DIR, LINK_WATCH_PERIOD},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TrackEvent},
    source::{DeviceSource, SampleSource, SourceKind, SyntheticSource},
    store::FileWorkoutStore,
    tracker::Tracker,
    ui,
};

const TICK_RATE_MS: u64 = 100;

/// terminal workout tracker with a live route canvas
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Records a route from a GNSS receiver (NMEA) or a synthetic path, shows distance, speed and duration live, and keeps a local log of finished workouts."
)]
pub struct Cli {
    /// where positions come from
    #[clap(short = 's', long, value_enum)]
    source: Option<SourceKind>,

    /// NMEA device or recording used by the device source
    #[clap(short = 'd', long)]
    device: Option<PathBuf>,

    /// also accept fixes the receiver marks as invalid
    #[clap(long)]
    allow_invalid_fix: bool,

    /// drop live fixes older than this many milliseconds (0 keeps all)
    #[clap(long)]
    max_age_ms: Option<u64>,

    /// replay recordings as fast as they can be read
    #[clap(long)]
    no_pacing: bool,

    /// milliseconds between synthetic samples
    #[clap(long)]
    sample_interval_ms: Option<u64>,

    /// workout log file
    #[clap(short = 'o', long)]
    workouts: Option<PathBuf>,

    /// host:port used to check connectivity
    #[clap(long)]
    probe: Option<String>,

    /// skip connectivity checks
    #[clap(long)]
    no_network: bool,

    /// log filter when TREAD_LOG is unset (error, warn, info, debug, trace)
    #[clap(long)]
    log_level: Option<String>,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Overlay command-line flags on the stored config.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(device) = &self.device {
            config.device_path = Some(device.clone());
        }
        if self.allow_invalid_fix {
            config.require_fix = false;
        }
        if let Some(ms) = self.max_age_ms {
            config.device_max_age_ms = ms;
        }
        if self.no_pacing {
            config.pace_replay = false;
        }
        if let Some(ms) = self.sample_interval_ms {
            config.sample_interval_ms = ms;
        }
        if let Some(path) = &self.workouts {
            config.workouts_path = Some(path.clone());
        }
        if let Some(probe) = &self.probe {
            config.network_probe = probe.clone();
        }
        if self.no_network {
            config.network_probe.clear();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}

fn build_source(config: &Config) -> Box<dyn SampleSource> {
    match config.source {
        SourceKind::Synthetic => Box::new(SyntheticSource::new(
            config.synthetic,
            config.sample_interval(),
        )),
        SourceKind::Device => Box::new(DeviceSource::new(
            config.device_path.clone().unwrap_or_default(),
            config.device_options(),
        )),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());

    if config.source == SourceKind::Device && config.device_path.is_none() {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::MissingRequiredArgument,
            "the device source needs --device <PATH>",
        )
        .exit();
    }

    if cli.save_config {
        config_store.save(&config)?;
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = AppDirs::log_path();
    if let Err(e) = logging::init(&log_path, &config.log_level) {
        eprintln!("logging disabled ({}): {e}", log_path.display());
    }
    info!(source = %config.source, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn canvas_for<B: Backend>(terminal: &Terminal<B>) -> io::Result<Rect> {
    let size = terminal.size()?;
    Ok(ui::canvas_area(Rect::new(0, 0, size.width, size.height)))
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, config: &Config) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    let tracker = Tracker::new(
        build_source(config),
        Box::new(FileWorkoutStore::with_path(config.workouts_path())),
        runner.sender(),
    )
    .with_stats_refresh(config.stats_refresh());

    let mut app = App::new(tracker);
    if !config.network_probe.is_empty() {
        let probe = TcpProbe::new(config.network_probe.clone(), config.network_timeout());
        let poller = NetworkPoller::spawn(probe, config.network_poll(), runner.sender())
            .watch_links(LINK_WATCH_PERIOD, || {
                read_link_states(Path::new(LINK_STATE_DIR))
            });
        app = app.with_network_poller(poller);
    }

    app.resize(canvas_for(terminal)?);
    terminal.draw(|f| ui::draw(&app, f))?;

    while !app.should_quit {
        let event = runner.step();
        if matches!(event, TrackEvent::Resize) {
            app.resize(canvas_for(terminal)?);
        }
        if app.handle_event(event, Utc::now()) {
            terminal.draw(|f| ui::draw(&app, f))?;
        }
    }

    info!("exiting");
    Ok(())
}
