//! physio - Personal rehabilitation exercise tracker

use std::collections::HashMap;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use physio::db::Database;
use physio::exercises::Exercise;
use physio::timer::SideStrategy;
use physio::tui::App;

#[derive(Parser)]
#[command(name = "physio")]
#[command(author, version, about = "Personal rehabilitation exercise tracker")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "PHYSIO_DB", default_value = "physio.db", global = true)]
    db: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui,

    /// Manage prescribed exercises
    Exercise {
        #[command(subcommand)]
        action: ExerciseAction,
    },

    /// Manage exercise categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Time an exercise in the terminal (commands on stdin)
    Run {
        /// Exercise id (see `exercise list`)
        id: i64,
    },

    /// Show completed exercises
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change timer defaults
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Add the built-in starter exercises
    Seed,
}

#[derive(Subcommand)]
enum ExerciseAction {
    /// Add an exercise
    Add {
        name: String,

        #[arg(short, long, default_value = "3")]
        sets: i32,

        /// Reps per set (timed with secs_per_rep)
        #[arg(short, long)]
        reps: Option<i32>,

        /// Hold per set, seconds
        #[arg(long)]
        hold: Option<i32>,

        /// Fixed block per set, seconds
        #[arg(long)]
        duration: Option<i32>,

        /// Rest between phases, seconds (default from settings)
        #[arg(long)]
        rest: Option<i32>,

        /// Exercise both sides
        #[arg(long)]
        paired: bool,

        /// alternate | sequential
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<SideStrategy>,

        /// Category name, created if missing
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Change fields of an existing exercise
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        sets: Option<i32>,

        #[arg(short, long)]
        reps: Option<i32>,

        #[arg(long)]
        hold: Option<i32>,

        #[arg(long)]
        duration: Option<i32>,

        #[arg(long)]
        rest: Option<i32>,

        /// true | false
        #[arg(long)]
        paired: Option<bool>,

        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<SideStrategy>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List exercises
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Remove an exercise and its history
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum CategoryAction {
    Add { name: String },
    List,
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Set one value, e.g. `settings set default_rest_secs 45`
    Set { key: String, value: String },
}

fn parse_strategy(s: &str) -> Result<SideStrategy, String> {
    SideStrategy::parse(s).ok_or_else(|| format!("expected alternate or sequential, got {}", s))
}

fn init_logging(verbose: bool, tui: bool) {
    // Keep the TUI screen clean unless asked for more
    let default = match (verbose, tui) {
        (true, _) => "physio=debug",
        (false, true) => "physio=warn",
        (false, false) => "physio=info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let tui = matches!(cli.command, None | Some(Commands::Tui));
    init_logging(cli.verbose, tui);

    let db = Database::open(&cli.db)?;

    match cli.command {
        Some(Commands::Exercise { action }) => exercise_command(&db, action)?,

        Some(Commands::Category { action }) => match action {
            CategoryAction::Add { name } => {
                let id = db.add_category(&name)?;
                println!("Added category: {} (id: {})", name, id);
            }
            CategoryAction::List => {
                for c in db.get_categories()? {
                    println!("{:4} | {}", c.id.unwrap_or_default(), c.name);
                }
            }
            CategoryAction::Remove { id } => {
                if !db.delete_category(id)? {
                    bail!("no category with id {}", id);
                }
                println!("Removed category {}", id);
            }
        },

        Some(Commands::Run { id }) => physio::runner::run_exercise(&db, id).await?,

        Some(Commands::History { limit, json }) => {
            let progress: Vec<_> = db.get_progress(None)?.into_iter().take(limit).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                let names: HashMap<i64, String> = db
                    .get_exercises(None)?
                    .into_iter()
                    .filter_map(|e| e.id.map(|id| (id, e.name)))
                    .collect();
                println!("Recent sessions:");
                println!("{:-<60}", "");
                for p in &progress {
                    println!(
                        "{} | {:24} | {} sets | {}",
                        p.completed_at.format("%Y-%m-%d %H:%M"),
                        names.get(&p.exercise_id).map(String::as_str).unwrap_or("?"),
                        p.completed_sets,
                        p.duration_secs
                            .map(|s| physio::tui::format_clock(s.max(0) as u32))
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }

        Some(Commands::Settings { action }) => {
            let mut settings = db.load_settings()?;
            if let Some(SettingsAction::Set { key, value }) = action {
                settings.set(&key, &value)?;
                db.save_settings(&settings)?;
            }
            for (key, value) in settings.entries() {
                println!("{} = {}", key, value);
            }
        }

        Some(Commands::Seed) => {
            let added = db.seed_starter()?;
            println!("Added {} starter exercises", added);
        }

        Some(Commands::Tui) | None => {
            let mut app = App::new(db)?;
            app.run()?;
        }
    }

    Ok(())
}

fn exercise_command(db: &Database, action: ExerciseAction) -> Result<()> {
    match action {
        ExerciseAction::Add {
            name,
            sets,
            reps,
            hold,
            duration,
            rest,
            paired,
            strategy,
            category,
            notes,
        } => {
            let category_id = category.as_deref().map(|c| db.ensure_category(c)).transpose()?;
            let exercise = Exercise {
                category_id,
                reps,
                hold_secs: hold,
                duration_secs: duration,
                rest_secs: rest,
                is_paired: paired,
                side_strategy: strategy,
                notes,
                ..Exercise::new(name, sets)
            };

            // Reject what the timer could never run
            let settings = db.load_settings()?;
            exercise.timer_config(&settings)?;

            let id = db.add_exercise(&exercise)?;
            println!("Added: {} - {} (id: {})", exercise.name, exercise.prescription(), id);
        }

        ExerciseAction::Edit {
            id,
            name,
            sets,
            reps,
            hold,
            duration,
            rest,
            paired,
            strategy,
            category,
            notes,
        } => {
            let Some(mut exercise) = db.get_exercise(id)? else {
                bail!("no exercise with id {}", id);
            };
            if let Some(name) = name {
                exercise.name = name;
            }
            if let Some(sets) = sets {
                exercise.sets = sets;
            }
            if let Some(paired) = paired {
                exercise.is_paired = paired;
            }
            if let Some(category) = category {
                exercise.category_id = Some(db.ensure_category(&category)?);
            }
            exercise.reps = reps.or(exercise.reps);
            exercise.hold_secs = hold.or(exercise.hold_secs);
            exercise.duration_secs = duration.or(exercise.duration_secs);
            exercise.rest_secs = rest.or(exercise.rest_secs);
            exercise.side_strategy = strategy.or(exercise.side_strategy);
            exercise.notes = notes.or(exercise.notes);

            let settings = db.load_settings()?;
            exercise.timer_config(&settings)?;

            db.update_exercise(&exercise)?;
            println!("Updated: {} - {} (id: {})", exercise.name, exercise.prescription(), id);
        }

        ExerciseAction::List { category } => {
            let category_id = match category {
                Some(name) => {
                    let found = db.get_categories()?.into_iter().find(|c| c.name == name);
                    match found.and_then(|c| c.id) {
                        Some(id) => Some(id),
                        None => bail!("no category named {}", name),
                    }
                }
                None => None,
            };
            for e in db.get_exercises(category_id)? {
                println!(
                    "{:4} | {:24} | {}",
                    e.id.unwrap_or_default(),
                    e.name,
                    e.prescription()
                );
            }
        }

        ExerciseAction::Remove { id } => {
            if !db.delete_exercise(id)? {
                bail!("no exercise with id {}", id);
            }
            println!("Removed exercise {}", id);
        }
    }
    Ok(())
}
