//! Parse session: one batch of files through the registry and correlator.
//!
//! Primary logs contribute tasks and controllers, auxiliary logs contribute
//! entries, and files no parser claims are kept as raw lines. `finish`
//! correlates every collected entry against every collected task.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::conf::AnalyzerConfig;
use crate::correlate::{Clock, CorrelationSummary, Correlator, SystemClock};
use crate::parser::formats::ProjectParser;
use crate::parser::model::{ControllerInfo, TaskInfo};
use crate::parser::metrics::{MetricsSnapshot, ParsingMetrics};
use crate::parser::traits::*;
use crate::registry::{ParserRegistry, ResolvedParser};

/// What one ingested file produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum FileOutcome {
    Project {
        kind: ParserKind,
        tasks: usize,
        events: usize,
        controllers: usize,
    },
    Aux {
        kind: ParserKind,
        entries: usize,
    },
    Unhandled {
        lines: usize,
    },
}

/// A file kept as raw, searchable-only content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnhandledFile {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub line_count: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub tasks: Vec<TaskInfo>,
    pub controllers: Vec<ControllerInfo>,
    pub entries: Vec<AuxLogEntry>,
    pub unhandled_files: Vec<UnhandledFile>,
    pub summary: CorrelationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

pub struct ParseSession<'r, C: Clock = SystemClock> {
    registry: &'r ParserRegistry,
    correlator: Correlator<C>,
    metrics: Option<ParsingMetrics>,
    /// First primary log's parser; its aux parser handles matching aux files
    project: Option<&'r ProjectParser>,
    /// First primary log's base date, fallback for aux files ingested later
    base_date: Option<String>,
    tasks: Vec<TaskInfo>,
    controllers: Vec<ControllerInfo>,
    entries: Vec<AuxLogEntry>,
    unhandled: Vec<UnhandledFile>,
}

impl<'r> ParseSession<'r, SystemClock> {
    pub fn new(registry: &'r ParserRegistry, config: &AnalyzerConfig) -> Self {
        Self::with_clock(registry, config, SystemClock)
    }
}

impl<'r, C: Clock> ParseSession<'r, C> {
    pub fn with_clock(registry: &'r ParserRegistry, config: &AnalyzerConfig, clock: C) -> Self {
        Self {
            registry,
            correlator: Correlator::with_clock(config.correlation.clone(), clock),
            metrics: config.metrics.enabled.then(ParsingMetrics::new),
            project: None,
            base_date: None,
            tasks: Vec::new(),
            controllers: Vec::new(),
            entries: Vec::new(),
            unhandled: Vec::new(),
        }
    }

    pub fn base_date(&self) -> Option<&str> {
        self.base_date.as_deref()
    }

    pub fn ingest(&mut self, file_name: &str, content: &str) -> FileOutcome {
        let resolved = self.registry.resolve(file_name, content);
        self.ingest_resolved(file_name, content, resolved)
    }

    /// Ingest several files, primary logs first so their base date reaches
    /// every auxiliary file. Outcomes are returned in input order.
    pub fn ingest_batch<N, T>(&mut self, files: &[(N, T)]) -> Vec<FileOutcome>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        let registry = self.registry;
        let resolved: Vec<_> = files
            .iter()
            .map(|(name, content)| registry.resolve(name.as_ref(), content.as_ref()))
            .collect();

        let mut outcomes: Vec<Option<FileOutcome>> = vec![None; files.len()];
        let project_first = resolved
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Some(ResolvedParser::Project(_))))
            .chain(
                resolved
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| !matches!(r, Some(ResolvedParser::Project(_)))),
            )
            .map(|(idx, r)| (idx, *r))
            .collect::<Vec<_>>();

        for (idx, parser) in project_first {
            let (name, content) = &files[idx];
            outcomes[idx] = Some(self.ingest_resolved(name.as_ref(), content.as_ref(), parser));
        }

        outcomes.into_iter().flatten().collect()
    }

    fn ingest_resolved(
        &mut self,
        file_name: &str,
        content: &str,
        resolved: Option<ResolvedParser<'r>>,
    ) -> FileOutcome {
        let lines: Vec<&str> = content.lines().collect();

        match resolved {
            Some(ResolvedParser::Project(parser)) => self.ingest_project(parser, file_name, &lines),
            Some(ResolvedParser::Aux(parser)) => {
                let config = ParseConfig::new(file_name).with_base_date(self.base_date.clone());
                let result = match self.project {
                    Some(project) if project.aux_log_parser_info().kind == parser.kind() => {
                        project.parse_aux_log(&lines, &config)
                    }
                    _ => parser.parse(&lines, &config),
                };

                let entries = result.entries.len();
                if let Some(metrics) = &self.metrics {
                    metrics.record_file(ParserRole::Aux, lines.len(), entries);
                }
                self.entries.extend(result.entries);
                FileOutcome::Aux {
                    kind: parser.kind(),
                    entries,
                }
            }
            None => {
                warn!(file = file_name, lines = lines.len(), "No parser for file, keeping raw lines");
                if let Some(metrics) = &self.metrics {
                    metrics.record_unhandled();
                }
                self.unhandled.push(UnhandledFile {
                    file_name: file_name.to_string(),
                    line_count: lines.len(),
                    lines: lines.iter().map(|l| l.to_string()).collect(),
                });
                FileOutcome::Unhandled { lines: lines.len() }
            }
        }
    }

    fn ingest_project(&mut self, parser: &'r ProjectParser, file_name: &str, lines: &[&str]) -> FileOutcome {
        let result = parser.parse_main_log(lines, &ParseConfig::new(file_name));

        if self.project.is_none() {
            self.project = Some(parser);
        }
        if self.base_date.is_none() {
            self.base_date = result.base_date.clone();
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_file(ParserRole::Project, lines.len(), result.lines_recognized);
        }

        let outcome = FileOutcome::Project {
            kind: parser.kind(),
            tasks: result.tasks.len(),
            events: result.events.len(),
            controllers: result.controllers.len(),
        };
        self.tasks.extend(result.tasks);
        self.controllers.extend(result.controllers);
        outcome
    }

    /// Correlate and hand back everything collected.
    pub fn finish(mut self) -> Timeline {
        let summary = self.correlator.annotate(&mut self.entries, &self.tasks);

        let metrics = self.metrics.map(|m| {
            m.record_correlation(&summary);
            m.snapshot()
        });

        info!(
            tasks = self.tasks.len(),
            entries = self.entries.len(),
            matched = summary.total_matched(),
            unhandled = self.unhandled.len(),
            "Timeline assembled"
        );
        debug!(base_date = ?self.base_date, "Session finished");

        Timeline {
            tasks: self.tasks,
            controllers: self.controllers,
            entries: self.entries,
            unhandled_files: self.unhandled,
            summary,
            metrics,
        }
    }
}
