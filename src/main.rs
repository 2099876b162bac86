mod cli;
mod logging;

use std::process;

use anyhow::Context;
use capture_index::{config, AnchorMode, ListPageRequest, ListPageResponse, PageEngine};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use tracing::error;

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match config::load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(command) => PageEngine::new(config)
            .context("building page engine")
            .and_then(|engine| run(&engine, command)),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(engine: &PageEngine, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Page {
            collection,
            count,
            anchor,
            exclusive,
            human,
        } => {
            let request = ListPageRequest {
                collection: Some(collection),
                count: Some(count),
                anchor,
                anchor_mode: Some(if exclusive {
                    AnchorMode::Exclusive
                } else {
                    AnchorMode::Inclusive
                }),
            };
            let response = engine.list_page(&request)?;
            if human {
                print_page(&response);
            } else {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Commands::Collections => {
            for collection in engine.collections() {
                println!("{}\t{}", collection.id.cyan(), collection.display_name);
            }
        }
        Commands::Resolve {
            collection,
            year,
            month,
            day,
            file_name,
        } => {
            let path = engine.artifact_path(&collection, &year, &month, &day, &file_name)?;
            println!("{}", path.display());
        }
        Commands::PrintConfig => println!("Configuration: {:#?}", engine.config()),
    }
    Ok(())
}

fn print_page(response: &ListPageResponse) {
    if let Some(next) = &response.next {
        println!("{} {}", "newer:".dimmed(), next.to_string().yellow());
    }
    if response.events.is_empty() {
        println!("{}", "no capture events".red());
    }
    for event in &response.events {
        println!("{}", event.time.to_string().green());
        for file in &event.files {
            println!("  {}", file);
        }
    }
    if let Some(prev) = &response.prev {
        println!("{} {}", "older:".dimmed(), prev.to_string().yellow());
    }
}
