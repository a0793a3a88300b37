/// Dialect parsers and the closed sets they are dispatched through

pub mod maa_framework;
pub mod maaend;
pub mod loguru;

pub use maaend::{MaaEndAuxParser, MaaEndProjectParser};
pub use loguru::{LoguruAuxParser, LoguruProjectParser};

use super::traits::*;

/// Auxiliary parsers known to the registry.
#[derive(Debug, Clone, Copy)]
pub enum AuxParser {
    MaaEnd(MaaEndAuxParser),
    Loguru(LoguruAuxParser),
}

/// Project (main log) parsers known to the registry.
#[derive(Debug, Clone, Copy)]
pub enum ProjectParser {
    MaaEnd(MaaEndProjectParser),
    Loguru(LoguruProjectParser),
}

impl ProjectParser {
    pub fn for_kind(kind: ParserKind) -> Option<Self> {
        match kind {
            ParserKind::MaaEndProject => Some(ProjectParser::MaaEnd(MaaEndProjectParser::default())),
            ParserKind::LoguruProject => Some(ProjectParser::Loguru(LoguruProjectParser::default())),
            ParserKind::MaaEndAux | ParserKind::LoguruAux => None,
        }
    }
}

impl From<MaaEndAuxParser> for AuxParser {
    fn from(p: MaaEndAuxParser) -> Self {
        AuxParser::MaaEnd(p)
    }
}

impl From<LoguruAuxParser> for AuxParser {
    fn from(p: LoguruAuxParser) -> Self {
        AuxParser::Loguru(p)
    }
}

impl From<MaaEndProjectParser> for ProjectParser {
    fn from(p: MaaEndProjectParser) -> Self {
        ProjectParser::MaaEnd(p)
    }
}

impl From<LoguruProjectParser> for ProjectParser {
    fn from(p: LoguruProjectParser) -> Self {
        ProjectParser::Loguru(p)
    }
}

impl LogFileMatcher for AuxParser {
    fn kind(&self) -> ParserKind {
        match self {
            AuxParser::MaaEnd(p) => p.kind(),
            AuxParser::Loguru(p) => p.kind(),
        }
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        match self {
            AuxParser::MaaEnd(p) => p.file_patterns(),
            AuxParser::Loguru(p) => p.file_patterns(),
        }
    }

    fn sniff(&self, content: &str) -> bool {
        match self {
            AuxParser::MaaEnd(p) => p.sniff(content),
            AuxParser::Loguru(p) => p.sniff(content),
        }
    }
}

impl AuxLogParser for AuxParser {
    fn parse(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult {
        match self {
            AuxParser::MaaEnd(p) => p.parse(lines, config),
            AuxParser::Loguru(p) => p.parse(lines, config),
        }
    }
}

impl LogFileMatcher for ProjectParser {
    fn kind(&self) -> ParserKind {
        match self {
            ProjectParser::MaaEnd(p) => p.kind(),
            ProjectParser::Loguru(p) => p.kind(),
        }
    }

    fn file_patterns(&self) -> &'static [&'static str] {
        match self {
            ProjectParser::MaaEnd(p) => p.file_patterns(),
            ProjectParser::Loguru(p) => p.file_patterns(),
        }
    }

    fn sniff(&self, content: &str) -> bool {
        match self {
            ProjectParser::MaaEnd(p) => p.sniff(content),
            ProjectParser::Loguru(p) => p.sniff(content),
        }
    }
}

impl ProjectLogParser for ProjectParser {
    fn parse_main_log(&self, lines: &[&str], config: &ParseConfig) -> MainLogResult {
        match self {
            ProjectParser::MaaEnd(p) => p.parse_main_log(lines, config),
            ProjectParser::Loguru(p) => p.parse_main_log(lines, config),
        }
    }

    fn parse_aux_log(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult {
        match self {
            ProjectParser::MaaEnd(p) => p.parse_aux_log(lines, config),
            ProjectParser::Loguru(p) => p.parse_aux_log(lines, config),
        }
    }

    fn aux_log_parser_info(&self) -> AuxLogParserInfo {
        match self {
            ProjectParser::MaaEnd(p) => p.aux_log_parser_info(),
            ProjectParser::Loguru(p) => p.aux_log_parser_info(),
        }
    }
}
