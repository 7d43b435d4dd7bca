use clap::Parser;
use ddex_core::{Aggregator, TagMap, ValidationStatus};
use ddex_lsp::cli::{self, Cli, Command};
use ddex_lsp::config::DdexConfig;
use ddex_lsp::document::{load_mapping, read_document};
use ddex_lsp::server::Backend;
use std::path::Path;
use std::process::ExitCode;
use tower_lsp_server::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command.unwrap_or(Command::Serve)).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::Serve => {
            let stdin = tokio::io::stdin();
            let stdout = tokio::io::stdout();

            let (service, socket) = LspService::new(Backend::new);
            Server::new(stdin, stdout, socket).serve(service).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { file, format } => {
            let content = read_document(&file).await?;
            let settings = DdexConfig::default().validation.aggregator_config();
            let evaluation = Aggregator::new(settings).evaluate(Some(&content), &[]);

            println!("{}", cli::render_check(&evaluation, format)?);
            Ok(if evaluation.status == ValidationStatus::Invalid {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Tags { file, map } => {
            let content = read_document(&file).await?;
            let map = load_mapping(&map).await?;

            let out = cli::render_tags(&content, &map);
            if !out.is_empty() {
                println!("{}", out);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve {
            file,
            line,
            column,
            map,
        } => {
            let content = read_document(&file).await?;
            let map = optional_mapping(map.as_deref()).await?;

            match cli::render_resolve(&content, line, column, &map) {
                Some(out) => {
                    println!("{}", out);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No tag at {}:{}", line, column);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

async fn optional_mapping(path: Option<&Path>) -> ddex_core::Result<TagMap> {
    match path {
        Some(path) => load_mapping(path).await,
        None => Ok(TagMap::new()),
    }
}
