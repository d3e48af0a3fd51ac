//! CLI administration tool for seo-redirect.
//!
//! Manages the mapping table and the operator review of the redirect log
//! without going through the HTTP service.
//!
//! # Usage
//!
//! ```bash
//! # List mappings
//! cargo run --bin admin -- mapping list
//!
//! # Add an exact mapping
//! cargo run --bin admin -- mapping add /oldpage /newpage
//!
//! # Add a pattern mapping
//! cargo run --bin admin -- mapping add '^/archive/(\d+)/(.*)$' '/blog/$2' --pattern
//!
//! # Remove a mapping
//! cargo run --bin admin -- mapping remove 12
//!
//! # Most frequent unhandled URLs of the last 30 days
//! cargo run --bin admin -- log unhandled --days 30 --limit 20
//!
//! # Mark a URL handled once a mapping exists for it
//! cargo run --bin admin -- log handle http://site/oldpage --user alice
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` or `DB_*` (required): PostgreSQL connection
//! - `PORTAL_ID` (optional): default portal for every command (default: 0)

use seo_redirect::application::services::LogService;
use seo_redirect::config::Config;
use seo_redirect::domain::entities::{NewMappingRule, RuleKind};
use seo_redirect::domain::repositories::MappingRepository;
use seo_redirect::infrastructure::persistence::{PgMappingRepository, PgRedirectLogRepository};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use regex::Regex;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing seo-redirect.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Portal to operate on (defaults to `PORTAL_ID` or 0)
    #[arg(short, long, global = true)]
    portal: Option<i32>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage URL mappings
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },

    /// Review the redirect log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Mapping management subcommands.
#[derive(Subcommand)]
enum MappingAction {
    /// List all mappings
    List,

    /// Add a mapping
    Add {
        /// Source URL, path, or regular expression
        source: String,

        /// Target URL or path (`$1` / `$name` substitutions for patterns)
        target: String,

        /// Treat the source as a regular expression
        #[arg(long)]
        pattern: bool,

        /// Do not write redirect log records for this mapping
        #[arg(long)]
        no_logging: bool,

        /// Evaluation order among pattern mappings
        #[arg(long, default_value_t = 0)]
        sort_order: i32,
    },

    /// Remove a mapping
    Remove {
        /// Mapping ID
        id: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Redirect log subcommands.
#[derive(Subcommand)]
enum LogAction {
    /// Most frequent URLs that found no mapping
    Unhandled {
        /// Look back this many days (from midnight UTC)
        #[arg(short, long, default_value_t = 30)]
        days: u64,

        /// Maximum number of URLs
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },

    /// Mark every unhandled record of a URL as handled
    Handle {
        /// Incoming URL as listed by `log unhandled`
        url: String,

        /// Operator name recorded with the records
        #[arg(short, long, default_value = "admin")]
        user: String,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = Config::load_database_url()?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let portal_id = match cli.portal {
        Some(id) => id,
        None => std::env::var("PORTAL_ID")
            .ok()
            .map(|v| v.parse::<i32>())
            .transpose()
            .context("PORTAL_ID must be an integer")?
            .unwrap_or(0),
    };

    match cli.command {
        Commands::Mapping { action } => handle_mapping_action(action, &pool, portal_id).await?,
        Commands::Log { action } => handle_log_action(action, &pool, portal_id).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Dispatches mapping management commands.
async fn handle_mapping_action(action: MappingAction, pool: &PgPool, portal_id: i32) -> Result<()> {
    let repo = Arc::new(PgMappingRepository::new(Arc::new(pool.clone())));

    match action {
        MappingAction::List => list_mappings(repo, portal_id).await?,
        MappingAction::Add {
            source,
            target,
            pattern,
            no_logging,
            sort_order,
        } => {
            let new_rule = NewMappingRule {
                portal_id,
                source,
                target,
                kind: RuleKind::from_uses_pattern(pattern),
                logging_enabled: !no_logging,
                sort_order,
            };
            add_mapping(repo, new_rule).await?;
        }
        MappingAction::Remove { id, yes } => remove_mapping(repo, id, yes).await?,
    }

    Ok(())
}

/// Lists exact mappings, then pattern mappings in evaluation order.
///
/// # Output Format
///
/// ```text
/// 📋 Mappings (portal 0)
///
///   ID   Kind     Log  Source                                   Target
///   ──────────────────────────────────────────────────────────────────────
///   1    exact    yes  /oldpage                                 /newpage
///   2    pattern  no   ^/archive/(\d+)/(.*)$                    /blog/$2
/// ```
async fn list_mappings(repo: Arc<PgMappingRepository>, portal_id: i32) -> Result<()> {
    println!(
        "{}",
        format!("📋 Mappings (portal {})", portal_id)
            .bright_blue()
            .bold()
    );
    println!();

    let mut rules = repo
        .list_rules(portal_id, RuleKind::Exact)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list mappings: {}", e))?;
    rules.extend(
        repo.list_rules(portal_id, RuleKind::Pattern)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list mappings: {}", e))?,
    );

    if rules.is_empty() {
        println!("{}", "  No mappings found".yellow());
        println!();
        println!(
            "  Create one with: {} admin mapping add <source> <target>",
            "cargo run --bin".bright_cyan()
        );
        return Ok(());
    }

    println!(
        "  {:<4} {:<8} {:<4} {:<40} {}",
        "ID".bright_white().bold(),
        "Kind".bright_white().bold(),
        "Log".bright_white().bold(),
        "Source".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "─".repeat(90).bright_black());

    for rule in &rules {
        let kind = match rule.kind {
            RuleKind::Exact => "exact".normal(),
            RuleKind::Pattern => "pattern".magenta(),
        };
        let logging = if rule.logging_enabled {
            "yes".green()
        } else {
            "no".red()
        };

        println!(
            "  {:<4} {:<8} {:<4} {:<40} {}",
            rule.id.to_string().bright_black(),
            kind,
            logging,
            rule.source.cyan(),
            rule.target
        );
    }

    println!();
    println!("  Total: {}", rules.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

/// Adds a mapping after validating pattern sources.
async fn add_mapping(repo: Arc<PgMappingRepository>, new_rule: NewMappingRule) -> Result<()> {
    println!("{}", "➕ Add Mapping".bright_blue().bold());
    println!();

    if new_rule.kind == RuleKind::Pattern {
        Regex::new(&new_rule.source).context("Source is not a valid regular expression")?;
    }

    let rule = repo
        .create(new_rule)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create mapping: {}", e))?;

    println!("  ID:     {}", rule.id.to_string().bright_black());
    println!("  Source: {}", rule.source.cyan());
    println!("  Target: {}", rule.target.bright_white());
    println!();
    println!("{}", "✅ Mapping created successfully!".green().bold());
    println!(
        "{}",
        "   Running services pick it up on their next mapping refresh.".bright_black()
    );
    println!();

    Ok(())
}

/// Removes a mapping with confirmation prompt.
async fn remove_mapping(repo: Arc<PgMappingRepository>, id: i64, skip_confirm: bool) -> Result<()> {
    println!("{}", "🗑️  Remove Mapping".bright_blue().bold());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove mapping {}?", id))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let removed = repo
        .delete(id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to remove mapping: {}", e))?;

    if removed {
        println!("{}", "✅ Mapping removed".green().bold());
    } else {
        println!("{}", "⚠️  No mapping with this ID".yellow());
    }
    println!();

    Ok(())
}

/// Dispatches redirect log commands.
async fn handle_log_action(action: LogAction, pool: &PgPool, portal_id: i32) -> Result<()> {
    let service = LogService::new(Arc::new(PgRedirectLogRepository::new(Arc::new(
        pool.clone(),
    ))));

    match action {
        LogAction::Unhandled { days, limit } => {
            println!(
                "{}",
                format!("🔍 Unhandled URLs, last {} days (portal {})", days, portal_id)
                    .bright_blue()
                    .bold()
            );
            println!();

            let urls = service
                .top_unhandled_urls(portal_id, days, limit)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read redirect log: {}", e))?;

            if urls.is_empty() {
                println!("{}", "  Nothing unhandled".green());
                println!();
                return Ok(());
            }

            println!(
                "  {:>8}  {}",
                "Count".bright_white().bold(),
                "URL".bright_white().bold()
            );
            println!("  {}", "─".repeat(75).bright_black());
            for url in &urls {
                println!(
                    "  {:>8}  {}",
                    url.occurrences.to_string().bright_yellow(),
                    url.url.cyan()
                );
            }
            println!();
        }
        LogAction::Handle { url, user } => {
            let updated = service
                .mark_handled(&url, &user)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to mark url handled: {}", e))?;

            println!(
                "{} {} {}",
                "✅ Marked".green().bold(),
                updated.to_string().bright_white().bold(),
                "log records handled".green().bold()
            );
            println!();
        }
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let mappings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redirect_mappings")
                .fetch_one(pool)
                .await?;

            let log_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM redirect_log")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL:  {}", version.bright_white());
            println!("  Mappings:    {}", mappings.to_string().bright_green().bold());
            println!("  Log records: {}", log_records.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}
