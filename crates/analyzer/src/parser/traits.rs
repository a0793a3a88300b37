pub use super::model::{
    AuxLogEntry, AuxLogParserInfo, AuxParseResult, MainLogResult, ParseConfig, ParseError,
    ParserKind, ParserRole,
};

/// How a parser claims files: static name patterns plus optional sniffing.
pub trait LogFileMatcher: Send + Sync {
    fn kind(&self) -> ParserKind;

    /// Glob patterns matched against the file's base name
    fn file_patterns(&self) -> &'static [&'static str];

    /// Content sniffing, consulted when no pattern matches
    fn sniff(&self, _content: &str) -> bool {
        false
    }
}

pub trait AuxLogParser: LogFileMatcher {
    /// parse the lines of one auxiliary log file
    fn parse(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult;
}

pub trait ProjectLogParser: LogFileMatcher {
    /// parse the MaaFramework main log of the project
    fn parse_main_log(&self, lines: &[&str], config: &ParseConfig) -> MainLogResult;

    /// parse an auxiliary log of the same project
    fn parse_aux_log(&self, lines: &[&str], config: &ParseConfig) -> AuxParseResult;

    fn aux_log_parser_info(&self) -> AuxLogParserInfo;
}
