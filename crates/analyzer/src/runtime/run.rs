//! Run: read the files, drive a parse session, print the timeline.

use std::io::Write;
use std::path::PathBuf;
use serde::Serialize;
use tracing::{error, info};

use super::cli::Cli;
use crate::conf::AnalyzerConfig;
use crate::parser::formats::ProjectParser;
use crate::parser::traits::*;
use crate::registry::{ParserRegistry, RegistrationInfo};
use crate::session::ParseSession;

#[derive(Debug, Serialize)]
struct ParserListing {
    registrations: Vec<RegistrationInfo>,
    aux_parsers: Vec<AuxLogParserInfo>,
}

pub fn run(cli: &Cli, config: &AnalyzerConfig, registry: &ParserRegistry) -> Result<(), Box<dyn std::error::Error>> {
    if cli.list_parsers {
        return print_json(&parser_listing(registry), cli.pretty);
    }

    let files = read_files(&cli.files)?;
    let mut session = ParseSession::new(registry, config);
    let outcomes = session.ingest_batch(&files);
    for ((name, _), outcome) in files.iter().zip(&outcomes) {
        info!(file = %name, ?outcome, "Ingested");
    }

    let timeline = session.finish();
    print_json(&timeline, cli.pretty)
}

fn parser_listing(registry: &ParserRegistry) -> ParserListing {
    let aux_parsers = [ParserKind::MaaEndProject, ParserKind::LoguruProject]
        .into_iter()
        .filter_map(ProjectParser::for_kind)
        .map(|p| p.aux_log_parser_info())
        .collect();

    ParserListing {
        registrations: registry.registrations(),
        aux_parsers,
    }
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<(String, String)>, std::io::Error> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|e| {
                error!("Failed to read {}: {}", path.display(), e);
                e
            })?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            Ok((path.display().to_string(), content))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}
