use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use set_game::config::AppConfig;
use set_game::game::{FeatureRules, Game, GameSummary};
use set_game::ui::{App, LogDisplay, TableDisplay, TableView};

/// Play Set against friends and computer players.
#[derive(Parser)]
#[command(name = "set_game", about = "Concurrent Set card game")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Run without the terminal UI (computer players only, logs to stderr)
    #[arg(long)]
    headless: bool,

    /// Override number of human players
    #[arg(long)]
    humans: Option<usize>,

    /// Override number of computer players
    #[arg(long)]
    computers: Option<usize>,

    /// Override log level (e.g. "debug", "set_game=trace")
    #[arg(long)]
    log_level: Option<String>,

    /// Log every legal set on the table after each deal
    #[arg(long)]
    hints: bool,

    /// Stop a headless game after this many seconds
    #[arg(long)]
    time_limit: Option<u64>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    // Load configuration
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(humans) = cli.humans {
        config.players.human = humans;
    }
    if let Some(computers) = cli.computers {
        config.players.computer = computers;
    }
    if let Some(level) = cli.log_level {
        config.ui.log_level = level;
    }
    if cli.hints {
        config.ui.hints = true;
    }
    if cli.headless && config.players.human > 0 {
        bail!(
            "headless mode needs computer players only ({} human players configured, pass --humans 0)",
            config.players.human
        );
    }
    config.validate().context("invalid configuration")?;

    let log_file = (!cli.headless).then_some(config.ui.log_file.as_path());
    init_tracing(&config.ui.log_level, log_file)?;

    let rules = Arc::new(FeatureRules::new(
        config.table.feature_size,
        config.table.feature_count as usize,
    ));

    let summary = if cli.headless {
        run_headless(&config, rules, cli.time_limit.map(Duration::from_secs))?
    } else {
        run_terminal(&config, rules)?
    };

    for (player, score) in summary.scores.iter().enumerate() {
        let marker = if summary.winners.contains(&player) { " *" } else { "" };
        println!("{:<12} {:>3}{}", config.player_name(player), score, marker);
    }
    Ok(())
}

fn run_headless(
    config: &AppConfig,
    rules: Arc<FeatureRules>,
    time_limit: Option<Duration>,
) -> Result<GameSummary> {
    let game = Game::start(config, rules, Arc::new(LogDisplay)).context("starting game")?;

    if let Some(limit) = time_limit {
        let deadline = Instant::now() + limit;
        while !game.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(50));
        }
        if !game.is_finished() {
            info!(secs = limit.as_secs(), "time limit reached");
            game.stop();
        }
    }

    Ok(game.join()?)
}

fn run_terminal(config: &AppConfig, rules: Arc<FeatureRules>) -> Result<GameSummary> {
    let view = Arc::new(parking_lot::Mutex::new(TableView::from_config(config)));
    let display = Arc::new(TableDisplay::new(Arc::clone(&view)));
    let game = Game::start(config, rules, display).context("starting game")?;
    let mut app = App::new(game, view, config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal, even on error
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    res?;
    Ok(app.into_summary()?)
}
