use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use hackdeck::classify::{event_status, filter_by_city, partition_programs, ProgramBoard};
use hackdeck::config::Endpoints;
use hackdeck::countdown::{countdown_targets, project, Countdowns};
use hackdeck::fetcher::Fetcher;
use hackdeck::models::{parse_start_date, FeedItem, UserId};
use hackdeck::store::Store;
use hackdeck::viewer;

#[derive(Parser)]
#[command(name = "hackdeck")]
#[command(about = "Hack Club programs, hackathons and coding stats in your terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List YSWS programs, upcoming first
    Programs {
        /// Include programs whose deadline has passed
        #[arg(short, long)]
        all: bool,
    },
    /// List hackathons
    Events {
        /// Only show events whose city contains this text
        #[arg(short, long)]
        city: Option<String>,
    },
    /// Show Hackatime coding stats
    Stats {
        #[arg(short, long)]
        user: Option<String>,
        /// Count from this date (YYYY-MM-DD)
        #[arg(short, long)]
        since: Option<String>,
    },
    /// Save your Hackatime user id
    Login { id: String },
    /// Forget the saved user id
    Logout,
    /// Interactive dashboard (the default)
    Dash {
        #[arg(short, long)]
        since: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Dash { since: None });

    // The dashboard owns the terminal; log lines would tear its screen.
    if !matches!(command, Commands::Dash { .. }) {
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    }

    let fetcher = Fetcher::new(Endpoints::from_env())?;

    match command {
        Commands::Programs { all } => {
            let now = Utc::now();
            let items = fetcher
                .fetch_programs(now)
                .await
                .context("Failed to load programs. Run the command again to retry")?;
            let board = partition_programs(items);
            let countdowns = project(&countdown_targets(&board), now);
            print!("{}", program_listing(&board, &countdowns, all));
        }
        Commands::Events { city } => {
            let events = fetcher
                .fetch_hackathons()
                .await
                .context("Failed to load hackathons. Run the command again to retry")?;
            let now = Utc::now();
            let query = city.unwrap_or_default();
            let filtered = filter_by_city(&events, &query);

            println!("{} of {} hackathons:", filtered.len(), events.len());
            for event in filtered {
                println!(
                    "  [{}] {}  {} - {}  {}, {}",
                    event_status(event, now).label(),
                    event.name,
                    event.starts_at.format("%Y-%m-%d"),
                    event.ends_at.format("%Y-%m-%d"),
                    event.location.city().unwrap_or("Online"),
                    event.location.country().unwrap_or("")
                );
                if let Some(website) = &event.website {
                    println!("      {}", website);
                }
            }
        }
        Commands::Stats { user, since } => {
            let since = parse_since(since.as_deref())?;
            let user = match user {
                Some(raw) => UserId::parse(&raw)?,
                None => match Store::new()?.load_user_id()? {
                    Some(id) => id,
                    None => bail!("No user id saved. Run `hackdeck login <id>` first."),
                },
            };
            let stats = fetcher
                .fetch_stats(&user, since)
                .await
                .context("Failed to load stats. Run the command again to retry")?;

            println!("{}", stats.username);
            println!("  Total:         {}", stats.human_readable_total);
            println!("  Daily average: {}", stats.human_readable_daily_average);
            for language in &stats.languages {
                println!("  {:<16} {:>5.1}%  {}", language.name, language.percent, language.text);
            }
        }
        Commands::Login { id } => {
            let id = UserId::parse(&id)?;
            Store::new()?.save_user_id(&id)?;
            println!("Saved user id {}", id);
        }
        Commands::Logout => {
            Store::new()?.forget_user_id()?;
            println!("Forgot saved user id");
        }
        Commands::Dash { since } => {
            let since = parse_since(since.as_deref())?;
            viewer::run_dashboard(fetcher, Store::new()?, since).await?;
        }
    }

    Ok(())
}

fn parse_since(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    Ok(raw.map(parse_start_date).transpose()?)
}

fn program_listing(board: &ProgramBoard, countdowns: &Countdowns, all: bool) -> String {
    let mut out = String::new();
    if board.is_empty() {
        out.push_str("No programs available at the moment.\n");
        return out;
    }
    out.push_str(&format!("Upcoming ({}):\n", board.upcoming.len()));
    for item in &board.upcoming {
        write_program(&mut out, item, countdowns.get(&item.key).map(String::as_str));
    }
    if all {
        out.push_str(&format!("\nPassed ({}):\n", board.passed.len()));
        for item in &board.passed {
            write_program(&mut out, item, None);
        }
    } else if !board.passed.is_empty() {
        out.push_str(&format!("\n{} passed programs hidden (use --all)\n", board.passed.len()));
    }
    out
}

fn write_program(out: &mut String, item: &FeedItem, countdown: Option<&str>) {
    out.push_str(&format!("\n  {}\n", item.title));
    match countdown {
        Some(remaining) => out.push_str(&format!("    Deadline: {} ({} left)\n", item.deadline, remaining)),
        None => out.push_str(&format!("    Deadline: {}\n", item.deadline)),
    }
    out.push_str(&format!("    {}\n", item.link));
    if !item.discussion_link.is_empty() {
        out.push_str(&format!("    Discussion: {}\n", item.discussion_link));
    }
    let wrapped = textwrap::fill(&item.description, 76);
    out.push_str(&textwrap::indent(&wrapped, "    "));
    out.push('\n');
}
