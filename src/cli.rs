use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};
use crate::logging;

/// Pull recent Last.fm scrobbles into dated Markdown notes
#[derive(Parser)]
#[command(name = "scrobble-sync", version, about, long_about = None)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one window of scrobbles, stage them and render notes
    Sync {
        /// Window length in hours, ending at --to (or now)
        #[arg(long)]
        hours: Option<u64>,
        /// Window start as Unix seconds
        #[arg(long)]
        from: Option<i64>,
        /// Window end as Unix seconds
        #[arg(long)]
        to: Option<i64>,
        /// Maximum tracks to request (service cap is 200)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Re-render notes from the staging table without fetching
    Render,
    /// Show resolved paths, config and credential presence
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let report = match cli.command {
        Command::Sync {
            hours,
            from,
            to,
            limit,
        } => commands::sync::run(&commands::sync::SyncOptions {
            hours,
            from,
            to,
            limit,
        })?,
        Command::Render => commands::render::run()?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
