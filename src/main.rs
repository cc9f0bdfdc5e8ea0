use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tnote_lib::client::{obtain_session, ExecLauncher, SessionClient};
use tnote_lib::config::BootstrapConfig;
use tnote_lib::errors::AppError;
use tnote_lib::models::Note;

#[derive(Parser)]
#[command(name = "tnote")]
#[command(about = "Scratch notes that live only as long as you need them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a note to memory (starts a session if none is running)
    Add {
        /// Note text
        #[arg(required = true)]
        text: Vec<String>,

        /// Create the note already pinned
        #[arg(long)]
        pin: bool,
    },

    /// List all notes
    List,

    /// Remove a note (accepts an ID, 'first' or 'last')
    Remove { selector: String },

    /// Remove all notes and end the session
    Clear,

    /// Pin a note
    Pin { selector: String },

    /// Unpin a note
    Unpin { selector: String },

    /// Show details of a single note
    Show { selector: String },

    #[command(hide = true)]
    Daemon,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Commands::Daemon = cli.command {
        tnote_lib::run_daemon();
    }

    if let Err(error) = tnote_lib::init_client_tracing() {
        eprintln!("failed to initialise logging: {}", error);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(run_command(cli.command)) {
        Ok(()) => Ok(()),
        Err(AppError::NoActiveSession) => {
            println!("No active session.");
            Ok(())
        }
        Err(AppError::SessionEnded(_)) => {
            println!("Session ended.");
            Ok(())
        }
        Err(error) if error.is_selector_error() => {
            println!("Error: {}", describe(&error));
            Ok(())
        }
        Err(error) => {
            eprintln!("Error: {}", describe(&error));
            std::process::exit(1);
        }
    }
}

async fn run_command(command: Commands) -> Result<(), AppError> {
    let may_create = matches!(command, Commands::Add { .. });
    let config = BootstrapConfig::default();
    let launcher = ExecLauncher::current_exe()?;
    let mut session: SessionClient = obtain_session(&config, &launcher, may_create).await?;

    match command {
        Commands::Add { text, pin } => {
            let reply = session.add(&text.join(" "), pin).await?;
            print_message(reply.message);
        }
        Commands::List => print_table(&session.list().await?),
        Commands::Remove { selector } => print_message(session.remove(&selector).await?.message),
        Commands::Clear => println!("{}", session.clear().await?.message),
        Commands::Pin { selector } => print_message(session.pin(&selector).await?.message),
        Commands::Unpin { selector } => print_message(session.unpin(&selector).await?.message),
        Commands::Show { selector } => print_note(&session.show(&selector).await?),
        Commands::Daemon => {}
    }
    Ok(())
}

fn describe(error: &AppError) -> String {
    match error {
        AppError::EmptyStore => "list is empty".to_string(),
        AppError::InvalidSelector(_) => "invalid ID format (use a number, 'first' or 'last')".to_string(),
        AppError::NotFound(id) => format!("note with ID {} not found", id),
        AppError::DaemonStartTimeout => "timeout waiting for daemon to start".to_string(),
        other => other.to_string(),
    }
}

fn print_message(message: Option<String>) {
    if let Some(message) = message {
        println!("{}", message);
    }
}

fn print_table(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes found.");
        return;
    }

    let id_width = notes
        .iter()
        .map(|note| note.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    println!("{:<id_width$}  P  CREATED   NOTE", "ID");
    for note in notes {
        println!(
            "{:<id_width$}  {}  {}  {}",
            note.id,
            if note.pinned { "*" } else { " " },
            note.created_at.with_timezone(&Local).format("%H:%M:%S"),
            note.text
        );
    }
}

fn print_note(note: &Note) {
    println!("ID:      {}", note.id);
    println!("Pinned:  {}", note.pinned);
    println!("Created: {}", note.created_at.with_timezone(&Local).to_rfc2822());
    println!("Text:    {}", note.text);
}
