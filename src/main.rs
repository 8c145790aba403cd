use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};

use oppdash::api::ApiClient;
use oppdash::models::{FacetSelection, ScrapeRequest, StipendTier};
use oppdash::{filter, normalize, tui};

#[derive(Parser)]
#[command(name = "oppdash")]
#[command(about = "Opportunity dashboard - browse, filter and track scraped postings")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    backend: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive dashboard (default)
    Dash,

    /// Fetch opportunities once and print the matching ones
    Fetch {
        /// Substring to search in title, company and skills
        #[arg(short, long)]
        search: Option<String>,

        /// Source platform, exact match
        #[arg(long)]
        source: Option<String>,

        /// Region (India, International, Remote)
        #[arg(long)]
        location: Option<String>,

        /// Stipend tier (all, paid, 10k, 20k, 50k, unpaid)
        #[arg(long, default_value = "all")]
        stipend: String,

        /// Organization type, exact match
        #[arg(long)]
        org: Option<String>,

        /// Role type, exact match
        #[arg(long)]
        role: Option<String>,

        /// Number of rows to print
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Trigger a scraper run on the backend
    Trigger {
        /// Restrict the run to these regions
        #[arg(long)]
        region: Vec<String>,

        /// Restrict the run to these topics
        #[arg(long)]
        topic: Vec<String>,

        /// Restrict the run to these sources
        #[arg(long)]
        source: Vec<String>,
    },

    /// Show whether the background scraper is running
    Status,

    /// Print the scraper log tail
    Logs,

    /// Delete all scraped records and logs on the backend
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.backend)?;

    match cli.command.unwrap_or(Commands::Dash) {
        Commands::Dash => tui::run_dash(client),

        Commands::Fetch {
            search,
            source,
            location,
            stipend,
            org,
            role,
            limit,
        } => {
            let stipend = StipendTier::parse(&stipend).ok_or_else(|| {
                anyhow!("Unknown stipend tier '{stipend}'. Use all, paid, 10k, 20k, 50k or unpaid")
            })?;
            let facets = FacetSelection {
                search: search.unwrap_or_default(),
                source,
                location,
                stipend,
                org,
                role,
            };

            let records = normalize::normalize(client.fetch_opportunities()?);
            let view = filter::view(&records, &facets);

            if view.is_empty() {
                println!("No opportunities found matching your criteria.");
                return Ok(());
            }

            println!(
                "{:<6} {:<30} {:<20} {:<13} {:<16} {:<12}",
                "SCORE", "ROLE", "COMPANY", "REGION", "STIPEND", "SOURCE"
            );
            println!("{}", "-".repeat(100));
            for r in view.iter().take(limit) {
                let score = r
                    .match_score
                    .map(|s| format!("{s:.0}%"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<6} {:<30} {:<20} {:<13} {:<16} {:<12}",
                    score,
                    truncate(&r.role_title, 28),
                    truncate(&r.company_name, 18),
                    truncate(&r.location_type, 11),
                    truncate(&r.stipend, 14),
                    truncate(&r.source_platform, 10),
                );
            }
            println!("\nShowing {} of {} opportunities", view.len().min(limit), records.len());
            Ok(())
        }

        Commands::Trigger {
            region,
            topic,
            source,
        } => {
            let request = ScrapeRequest {
                regions: some_if_nonempty(region),
                topics: some_if_nonempty(topic),
                sources: some_if_nonempty(source),
            };
            let body = if request.is_empty() {
                None
            } else {
                Some(&request)
            };
            let ack = client.trigger_scrape(body)?;
            println!("{}", ack.message.unwrap_or(ack.status));
            Ok(())
        }

        Commands::Status => {
            let running = client.scrape_status()?;
            println!("{}", if running { "running" } else { "idle" });
            Ok(())
        }

        Commands::Logs => {
            for line in client.fetch_logs()? {
                println!("{line}");
            }
            Ok(())
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear without --yes (this deletes all scraped records and logs)");
            }
            let ack = client.clear_data()?;
            let message = ack.message.unwrap_or_default();
            if ack.status == "error" {
                if message.is_empty() {
                    bail!("Clear failed");
                }
                bail!("{message}");
            }
            if message.is_empty() {
                println!("{}", ack.status);
            } else {
                println!("{message}");
            }
            Ok(())
        }
    }
}

fn some_if_nonempty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values) }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
