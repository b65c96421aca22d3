//! tomate - Pomodoro timer with a task checklist and focus analytics
//!
//! Usage:
//!   tomate run [--mode M]        Live countdown; Ctrl-C pauses and saves
//!   tomate status                Show the saved timer state (default)
//!   tomate mode <M>              Switch to pomodoro, shortBreak or longBreak
//!   tomate reset                 Refill the current mode
//!   tomate settings [--pomodoro V] [--short-break V] [--long-break V]
//!   tomate task add|done|rm|list Manage the checklist
//!   tomate stats [--json]        Show the analytics dashboard
//!   tomate sound on|off          Toggle sound cues

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tomate::desktop::{DesktopNotifier, TerminalBell};
use tomate::schedule::IntervalSchedule;
use tomate::settings::parse_minutes;
use tomate::{
    Clock, Completion, Dashboard, FileStore, SystemClock, TimerEngine, TimerMode, TimerObserver,
    TimerSettings, TimerSnapshot, Workspace,
};
use tomate_core::{format, Config, Paths};

/// Tomate - Pomodoro timer with a task checklist and focus analytics
#[derive(Parser)]
#[command(name = "tomate")]
#[command(about = "Pomodoro timer with a task checklist and focus analytics")]
#[command(version)]
#[command(after_help = r#"MODES:
    pomodoro      focus session (default 25 min)
    shortBreak    short break (default 5 min)
    longBreak     long break (default 15 min)

EXAMPLES:
    tomate run                      # Start or resume the current countdown
    tomate run --mode short         # Switch to a short break and start it
    tomate settings --pomodoro 50   # 50-minute focus sessions
    tomate task add Write the report
    tomate task done 1              # By list position or id
    tomate stats --json

ENVIRONMENT:
    TOMATE_HOME   keep data and config under one directory
    RUST_LOG      log filter, e.g. RUST_LOG=tomate=debug
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the countdown in the foreground
    #[command(alias = "r")]
    Run {
        /// Switch to this mode before starting
        #[arg(long, short)]
        mode: Option<TimerMode>,
    },

    /// Show the saved timer state
    #[command(alias = "st")]
    Status,

    /// Switch mode (stops the countdown)
    Mode {
        /// pomodoro, shortBreak or longBreak
        mode: TimerMode,
    },

    /// Refill the current mode to its full duration
    Reset,

    /// Show or change durations (minutes, clamped to 1-120)
    Settings {
        #[arg(long, value_name = "MINS", allow_hyphen_values = true)]
        pomodoro: Option<String>,

        #[arg(long, value_name = "MINS", allow_hyphen_values = true)]
        short_break: Option<String>,

        #[arg(long, value_name = "MINS", allow_hyphen_values = true)]
        long_break: Option<String>,
    },

    /// Manage the task checklist
    #[command(alias = "t")]
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show the analytics dashboard
    Stats {
        /// Print the raw dashboard as JSON
        #[arg(long)]
        json: bool,
    },

    /// Turn sound cues on or off
    Sound {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Toggle a task between done and not done
    Done {
        /// List position or id
        task: String,
    },

    /// Delete a task
    #[command(alias = "delete")]
    Rm {
        /// List position or id
        task: String,
    },

    /// List tasks
    #[command(alias = "ls")]
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

// ANSI color codes
const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const CYAN: &str = "\x1b[0;36m";
const MAGENTA: &str = "\x1b[0;35m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn mode_color(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Focus => RED,
        TimerMode::ShortBreak => GREEN,
        TimerMode::LongBreak => CYAN,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = Paths::new();
    let config = Config::load(&paths.config_file())?;
    let store_dir = paths.store();
    let store = FileStore::new(&store_dir)
        .with_context(|| format!("Failed to open data directory: {}", store_dir.display()))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut ws = Workspace::open(store, Arc::clone(&clock));

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Run { mode } => cmd_run(&mut ws, &config, clock, mode),
        Commands::Status => cmd_status(&ws, &config, clock),
        Commands::Mode { mode } => cmd_mode(&mut ws, &config, clock, mode),
        Commands::Reset => cmd_reset(&mut ws, &config, clock),
        Commands::Settings {
            pomodoro,
            short_break,
            long_break,
        } => cmd_settings(&mut ws, &config, clock, pomodoro, short_break, long_break),
        Commands::Task { action } => cmd_task(&mut ws, action),
        Commands::Stats { json } => cmd_stats(&mut ws, json),
        Commands::Sound { state } => cmd_sound(&mut ws, &config, clock, state),
    }
}

/// Engine wired to the host's bell and, if enabled, desktop notifications
fn build_engine(config: &Config, clock: Arc<dyn Clock>) -> TimerEngine {
    let engine = TimerEngine::new(TimerSettings::default(), clock)
        .with_tick_interval(config.tick_interval())
        .with_sound(TerminalBell);
    if config.notifications {
        engine.with_notifier(DesktopNotifier::detect())
    } else {
        engine
    }
}

fn load_engine(ws: &Workspace<FileStore>, config: &Config, clock: Arc<dyn Clock>) -> TimerEngine {
    let mut engine = build_engine(config, clock);
    ws.load_timer(&mut engine);
    engine
}

fn save_engine(ws: &mut Workspace<FileStore>, engine: &TimerEngine) -> Result<()> {
    ws.save_timer(engine).context("Failed to save timer state")
}

/// Live countdown line, redrawn in place
struct TerminalView;

impl TerminalView {
    fn draw(snapshot: &TimerSnapshot) {
        let state = if snapshot.running { "running" } else { "paused" };
        let mut out = std::io::stdout().lock();
        let _ = write!(
            out,
            "\r  {} {} [{}] {}  ",
            color(mode_color(snapshot.mode), snapshot.mode.label()),
            color(BOLD, &format::clock(snapshot.remaining_seconds)),
            format::progress_bar(snapshot.progress, 30),
            color(DIM, state),
        );
        let _ = out.flush();
    }
}

impl TimerObserver for TerminalView {
    fn on_tick(&mut self, snapshot: &TimerSnapshot) {
        Self::draw(snapshot);
    }

    fn on_complete(&mut self, completion: &Completion) {
        println!();
        println!();
        println!("{} {}", color(GREEN, "[done]"), completion.mode.completion_message());
    }

    fn on_state_change(&mut self, snapshot: &TimerSnapshot) {
        if snapshot.remaining_seconds > 0 {
            Self::draw(snapshot);
        }
    }
}

fn suggested_next(mode: TimerMode) -> TimerMode {
    match mode {
        TimerMode::Focus => TimerMode::ShortBreak,
        TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
    }
}

/// Run the countdown until it completes or Ctrl-C pauses it
fn cmd_run(
    ws: &mut Workspace<FileStore>,
    config: &Config,
    clock: Arc<dyn Clock>,
    mode: Option<TimerMode>,
) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_countdown(ws, config, clock, mode))
}

async fn run_countdown(
    ws: &mut Workspace<FileStore>,
    config: &Config,
    clock: Arc<dyn Clock>,
    mode: Option<TimerMode>,
) -> Result<()> {
    let (schedule, mut ticks) = IntervalSchedule::new();
    let mut engine = build_engine(config, clock).with_schedule(schedule);
    ws.load_timer(&mut engine);

    if let Some(mode) = mode {
        if mode != engine.mode() {
            engine.switch_mode(mode);
        }
    }

    println!(
        "{}  {}",
        color(&format!("{}{}", BOLD, MAGENTA), "TOMATE"),
        color(DIM, "Ctrl-C to pause")
    );
    println!();

    engine.subscribe(TerminalView);
    if engine.is_running() {
        TerminalView::draw(&engine.snapshot());
    } else {
        engine.start();
    }
    save_engine(ws, &engine)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            tick = ticks.recv() => {
                if tick.is_none() {
                    break;
                }
                let before = engine.remaining_seconds();
                if let Some(completion) = engine.tick() {
                    ws.record_completion(&completion);
                    save_engine(ws, &engine)?;
                    println!(
                        "Completed pomodoros: {}",
                        engine.completed_focus_sessions()
                    );
                    println!(
                        "Next: tomate run --mode {}",
                        suggested_next(completion.mode)
                    );
                    break;
                }
                if engine.remaining_seconds() != before {
                    if let Err(e) = ws.save_timer(&engine) {
                        warn!(error = %e, "Failed to save timer state");
                    }
                }
            }
            _ = &mut ctrl_c => {
                engine.pause();
                save_engine(ws, &engine)?;
                println!();
                println!(
                    "{} Paused at {}. Run 'tomate run' to resume.",
                    color(CYAN, "[info]"),
                    format::clock(engine.remaining_seconds())
                );
                break;
            }
        }
    }

    Ok(())
}

/// Show the saved timer state
fn cmd_status(ws: &Workspace<FileStore>, config: &Config, clock: Arc<dyn Clock>) -> Result<()> {
    let engine = load_engine(ws, config, clock);
    let snap = engine.snapshot();
    let settings = engine.settings();

    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "TOMATE"));
    println!();
    println!(
        "  {}      {}",
        color(CYAN, "Mode:"),
        color(mode_color(snap.mode), snap.mode.label())
    );
    println!(
        "  {} {} of {}",
        color(CYAN, "Remaining:"),
        format::clock(snap.remaining_seconds),
        format::clock(snap.duration_seconds)
    );
    println!(
        "  {}  [{}] {:.0}%",
        color(CYAN, "Progress:"),
        format::progress_bar(snap.progress, 30),
        snap.progress * 100.0
    );
    println!(
        "  {}     {}",
        color(CYAN, "State:"),
        if snap.running { "running" } else { "paused" }
    );
    println!(
        "  {}     {}",
        color(CYAN, "Sound:"),
        if snap.sound_enabled { "on" } else { "off" }
    );
    println!(
        "  {}  {} / {} / {} min",
        color(CYAN, "Settings:"),
        settings.pomodoro,
        settings.short_break,
        settings.long_break
    );
    println!(
        "  {} {}",
        color(CYAN, "Pomodoros:"),
        snap.completed_focus_sessions
    );

    let tasks = ws.tasks();
    if !tasks.is_empty() {
        println!(
            "  {}     {} done, {} to go",
            color(CYAN, "Tasks:"),
            tasks.completed_count(),
            tasks.remaining_count()
        );
    }
    println!();
    println!("Run 'tomate run' to start the countdown");

    Ok(())
}

fn cmd_mode(
    ws: &mut Workspace<FileStore>,
    config: &Config,
    clock: Arc<dyn Clock>,
    mode: TimerMode,
) -> Result<()> {
    let mut engine = load_engine(ws, config, clock);
    engine.switch_mode(mode);
    save_engine(ws, &engine)?;

    println!(
        "{} Switched to {} ({})",
        color(GREEN, "[ok]"),
        mode.label(),
        format::clock(engine.duration_seconds())
    );
    Ok(())
}

fn cmd_reset(ws: &mut Workspace<FileStore>, config: &Config, clock: Arc<dyn Clock>) -> Result<()> {
    let mut engine = load_engine(ws, config, clock);
    engine.reset(None);
    save_engine(ws, &engine)?;

    println!(
        "{} {} reset to {}",
        color(GREEN, "[ok]"),
        engine.mode().label(),
        format::clock(engine.remaining_seconds())
    );
    Ok(())
}

fn cmd_settings(
    ws: &mut Workspace<FileStore>,
    config: &Config,
    clock: Arc<dyn Clock>,
    pomodoro: Option<String>,
    short_break: Option<String>,
    long_break: Option<String>,
) -> Result<()> {
    let mut engine = load_engine(ws, config, clock);
    let current = *engine.settings();

    if pomodoro.is_some() || short_break.is_some() || long_break.is_some() {
        let defaults = TimerSettings::default();
        let updated = TimerSettings {
            pomodoro: pomodoro
                .as_deref()
                .map_or(current.pomodoro, |v| parse_minutes(v, defaults.pomodoro)),
            short_break: short_break
                .as_deref()
                .map_or(current.short_break, |v| parse_minutes(v, defaults.short_break)),
            long_break: long_break
                .as_deref()
                .map_or(current.long_break, |v| parse_minutes(v, defaults.long_break)),
        };
        engine.reset(Some(updated));
        save_engine(ws, &engine)?;
        println!("{} Settings saved", color(GREEN, "[ok]"));
        println!();
    }

    let settings = engine.settings();
    for mode in TimerMode::ALL {
        println!(
            "  {} {} min",
            color(CYAN, &format!("{:<12}", mode.label())),
            settings.minutes(mode)
        );
    }
    Ok(())
}

fn cmd_task(ws: &mut Workspace<FileStore>, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::Add { text } => {
            let text = text.join(" ");
            let Some(task) = ws.add_task(&text) else {
                bail!("Task text cannot be empty");
            };
            println!("{} Added: {}", color(GREEN, "[ok]"), task.text);
        }
        TaskAction::Done { task } => {
            let id = resolve_task(ws, &task)?;
            if let Some(completed) = ws.toggle_task(&id) {
                let label = if completed { "Completed" } else { "Reopened" };
                println!("{} {}", color(GREEN, "[ok]"), label);
            }
        }
        TaskAction::Rm { task } => {
            let id = resolve_task(ws, &task)?;
            if let Some(removed) = ws.delete_task(&id) {
                println!("{} Deleted: {}", color(GREEN, "[ok]"), removed.text);
            }
        }
        TaskAction::List => {
            let tasks = ws.tasks();
            if tasks.is_empty() {
                println!("No tasks");
                println!();
                println!("Add one with: tomate task add <text>");
                return Ok(());
            }
            for (i, task) in tasks.iter().enumerate() {
                let mark = if task.completed {
                    color(GREEN, "[x]")
                } else {
                    "[ ]".to_string()
                };
                let text = format::truncate(&task.text, 60);
                let text = if task.completed { color(DIM, &text) } else { text };
                println!("  {:>2}. {} {}", i + 1, mark, text);
            }
            println!();
            println!(
                "{} done, {} to go",
                tasks.completed_count(),
                tasks.remaining_count()
            );
        }
    }
    Ok(())
}

fn resolve_task(ws: &Workspace<FileStore>, ident: &str) -> Result<String> {
    match ws.tasks().resolve(ident) {
        Some(id) => Ok(id),
        None => bail!("No task '{}'. Run 'tomate task list' to see them.", ident),
    }
}

fn cmd_stats(ws: &mut Workspace<FileStore>, json: bool) -> Result<()> {
    let dash = ws.dashboard();

    if json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
        return Ok(());
    }

    print_dashboard(&dash);
    Ok(())
}

fn print_dashboard(dash: &Dashboard) {
    let week = &dash.current_week;

    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "FOCUS ANALYTICS"));
    println!();
    println!(
        "{}",
        color(BOLD, &format!("Week of {}", week.week_start.format("%b %d")))
    );
    println!(
        "  {}   {}",
        color(CYAN, "Focus time:"),
        format::minutes(week.total_focus_time_minutes)
    );
    println!(
        "  {}    {}",
        color(CYAN, "Pomodoros:"),
        week.total_pomodoros_completed
    );
    println!(
        "  {}  {} completed, {} remaining",
        color(CYAN, "Task events:"),
        week.total_completed_tasks,
        week.total_remaining_tasks
    );
    println!();

    println!("{}", color(BOLD, "Last 7 days"));
    let max = dash.max_daily_focus().max(1);
    for day in &dash.daily {
        println!(
            "  {}  [{}] {:>7}  {} pomodoros",
            day.date.format("%a %d"),
            format::progress_bar(day.focus_time_minutes as f64 / max as f64, 20),
            format::minutes(day.focus_time_minutes),
            day.pomodoros_completed
        );
    }
    println!();

    println!("{}", color(BOLD, "Right now"));
    println!(
        "  {}        {} done, {} to go ({}%)",
        color(CYAN, "Tasks:"),
        dash.live.completed,
        dash.live.remaining,
        dash.live.completion_rate()
    );
    println!(
        "  {}    {} completed in total",
        color(CYAN, "Pomodoros:"),
        dash.completed_pomodoros
    );
}

fn cmd_sound(
    ws: &mut Workspace<FileStore>,
    config: &Config,
    clock: Arc<dyn Clock>,
    state: Toggle,
) -> Result<()> {
    let mut engine = load_engine(ws, config, clock);
    let enabled = matches!(state, Toggle::On);
    engine.set_sound_enabled(enabled);
    save_engine(ws, &engine)?;

    println!(
        "{} Sound {}",
        color(GREEN, "[ok]"),
        if enabled { "on" } else { "off" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_with_tty() {
        let result = color(RED, "test");
        assert!(result.contains("test"));
    }

    #[test]
    fn test_cli_parses_mode_aliases() {
        let cli = Cli::try_parse_from(["tomate", "run", "--mode", "short"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Run {
                mode: Some(TimerMode::ShortBreak)
            })
        ));
        assert!(Cli::try_parse_from(["tomate", "mode", "nap"]).is_err());
    }

    #[test]
    fn test_cli_settings_accepts_raw_text() {
        let cli =
            Cli::try_parse_from(["tomate", "settings", "--pomodoro", "12min", "--long-break", "-5"])
                .unwrap();
        match cli.command {
            Some(Commands::Settings {
                pomodoro,
                short_break,
                long_break,
            }) => {
                assert_eq!(pomodoro.as_deref(), Some("12min"));
                assert_eq!(short_break, None);
                assert_eq!(long_break.as_deref(), Some("-5"));
            }
            _ => panic!("expected settings"),
        }
    }

    #[test]
    fn test_suggested_next_alternates() {
        assert_eq!(suggested_next(TimerMode::Focus), TimerMode::ShortBreak);
        assert_eq!(suggested_next(TimerMode::LongBreak), TimerMode::Focus);
    }
}
