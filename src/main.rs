use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskboard::app::{self, App};
use taskboard::board::Board;
use taskboard::config::{Config, CONFIG_FILE};
use taskboard::interchange;
use taskboard::reminder;
use taskboard::store::{TaskFilter, TaskStore};
use taskboard::task::Priority;

#[derive(Parser)]
#[command(name = "taskboard", version, about = "Kanban task board backed by a local SQLite file")]
struct Cli {
    /// Config file to read
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Task database, overriding the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,
    /// Print the board
    List {
        /// Only tasks whose title or description contains this text
        #[arg(short, long, default_value = "")]
        search: String,
        /// Only tasks with this priority (Low, Medium, High)
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Write every task to a CSV file
    Export { file: PathBuf },
    /// Append the tasks of a CSV file
    Import { file: PathBuf },
    /// Run one reminder scan
    Remind,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Init) = cli.command {
        if Config::init(&cli.config)? {
            println!("Wrote default config to {}", cli.config.display());
        } else {
            println!("{} already exists.", cli.config.display());
        }
        return Ok(());
    }

    let mut config = Config::load(&cli.config)?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    init_logging(&config)?;

    let store = TaskStore::open(&config.database_path)?;
    info!(db = %store.path().display(), "task store ready");

    match cli.command {
        None => run_board(store, config)?,
        Some(Commands::List { search, priority }) => {
            let filter = TaskFilter::text(search).with_priority(priority);
            print_board(&Board::from_tasks(&store.list(&filter)?));
        }
        Some(Commands::Export { file }) => {
            let count = interchange::export(&store, &file)?;
            println!("Exported {count} tasks to {}", file.display());
        }
        Some(Commands::Import { file }) => {
            let count = interchange::import(&store, &file)?;
            println!("Imported {count} tasks from {}", file.display());
        }
        Some(Commands::Remind) => {
            let now = Local::now().naive_local();
            let hits = reminder::scan(&store, now, config.reminder_window())?;
            if hits.is_empty() {
                println!("No reminders due.");
            }
            for hit in hits {
                println!("{}", hit.message());
            }
        }
        Some(Commands::Init) => {}
    }
    Ok(())
}

fn init_logging(config: &Config) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_board(store: TaskStore, config: Config) -> io::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, config);
    let result = app::run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("board closed");
    result
}

fn print_board(board: &Board) {
    for column in &board.columns {
        println!("{} ({}):", column.status.label(), column.cards.len());
        for card in &column.cards {
            println!("- [{}] {:<3} {}", card.task_id, card.priority.marker(), card.label);
        }
    }
}
