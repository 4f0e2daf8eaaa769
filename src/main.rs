use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::ProgressBar;
use tracing::warn;

use magpie::aggregator::client::HubClient;
use magpie::config::Config;
use magpie::extractor::MediaExtractor;
use magpie::grab::{run_chain, tiers_for, GrabContext};
use magpie::item::truncate_chars;
use magpie::platform::{extract_username, is_profile_url, Platform};
use magpie::task::{GrabStatus, ProfileTask, TaskHandle, TaskStore};
use magpie::web;

/// Magpie: multi-platform social profile grabber.
///
/// Resolves a profile URL to its platform, walks the account's content
/// through aggregator APIs with a generic-extraction fallback, and serves
/// the same pipeline over a polling JSON API.
#[derive(Parser)]
#[command(name = "magpie", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Grab one profile from the command line
    Grab {
        /// Profile URL
        url: String,

        /// Stop after this many items (0 = everything)
        #[arg(long, default_value = "0")]
        max_items: usize,

        /// Print the full task record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show what a URL resolves to without fetching anything
    Resolve {
        /// URL to inspect
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("magpie=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            if config.api_key.is_empty() {
                warn!("MAGPIE_API_KEY not set — aggregator tiers will fail over to the extractor");
            }
            web::run_server(config, port, &bind).await?;
        }

        Commands::Grab {
            url,
            max_items,
            json,
        } => {
            let config = Config::load()?;
            let Some(platform) = Platform::detect(&url) else {
                anyhow::bail!("Unrecognized or unsupported URL: {url}");
            };

            let hub = Arc::new(HubClient::new(&config.api_base_url, &config.api_key)?);
            let extractor = Arc::new(MediaExtractor::new(
                config.extractor_bin.clone(),
                config.extractor_timeout,
            ));
            let tasks = Arc::new(TaskStore::new(config.task_ttl));
            let task_id = tasks.create(ProfileTask::new(&url, platform)).await;

            let ctx = GrabContext {
                url: url.clone(),
                platform,
                username: extract_username(&url, platform),
                max_items,
                task: TaskHandle::new(tasks.clone(), task_id.clone()),
            };
            let tiers = tiers_for(platform, hub, extractor);
            let worker = tokio::spawn(async move { run_chain(&ctx, &tiers).await });

            // Same polling loop a web client would run, against the
            // in-process store.
            let spinner = ProgressBar::new_spinner();
            spinner.enable_steady_tick(Duration::from_millis(120));
            loop {
                if let Some(snapshot) = tasks.get(&task_id).await {
                    spinner.set_message(format!(
                        "{} — {}",
                        snapshot.status.as_str(),
                        snapshot.message
                    ));
                    if snapshot.status.is_terminal() {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            worker.await?;
            spinner.finish_and_clear();

            let task = tasks.get(&task_id).await.context("task record vanished")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
                return Ok(());
            }
            print_summary(&task);
        }

        Commands::Resolve { url } => match Platform::detect(&url) {
            Some(platform) => {
                println!("{} {}", "Platform:".bold(), platform.display_name());
                println!(
                    "{} {}",
                    "Username:".bold(),
                    extract_username(&url, platform).unwrap_or_else(|| "-".to_string())
                );
                println!("{} {}", "Profile URL:".bold(), is_profile_url(&url));
            }
            None => println!("{}", "Unrecognized URL".red()),
        },
    }

    Ok(())
}

fn print_summary(task: &ProfileTask) {
    if task.status != GrabStatus::Completed {
        println!("{} {}", "Failed:".red().bold(), task.message);
        return;
    }

    if let Some(profile) = &task.profile {
        println!(
            "{} (@{})",
            profile.nickname.bold(),
            profile.username
        );
        println!(
            "{} followers · {} following · {} items on profile",
            profile.followers, profile.following, profile.video_count
        );
        if !profile.signature.is_empty() {
            println!("{}", profile.signature.dimmed());
        }
        println!();
    }

    println!(
        "{} {} items from {}",
        "Collected".green().bold(),
        task.total,
        task.platform.display_name()
    );
    for item in task.videos.iter().take(10) {
        println!(
            "  [{}] {}",
            format!("{:?}", item.kind).to_lowercase(),
            truncate_chars(&item.title, 60)
        );
        if !item.url.is_empty() {
            println!("      {}", item.url.dimmed());
        }
    }
    if task.videos.len() > 10 {
        println!("  … and {} more", task.videos.len() - 10);
    }
}
