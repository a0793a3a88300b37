use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pattern::{base_name, FilePatternSet, RegistryError};
use crate::conf::ParsersConfig;
use crate::parser::formats::{
    AuxParser, LoguruAuxParser, LoguruProjectParser, MaaEndAuxParser, MaaEndProjectParser,
    ProjectParser,
};
use crate::parser::traits::*;

/// Resolution priority. Higher wins; equal priorities fall back to
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(10);
    pub const MEDIUM: Priority = Priority(50);
    pub const HIGH: Priority = Priority(100);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::MEDIUM
    }
}

#[derive(Debug)]
struct Registration<P> {
    parser: P,
    priority: Priority,
    enabled: bool,
    /// Registration order across both collections
    seq: usize,
    patterns: FilePatternSet,
}

impl<P: LogFileMatcher> Registration<P> {
    fn new(parser: P, priority: Priority, seq: usize) -> Result<Self, RegistryError> {
        let patterns = FilePatternSet::new(parser.file_patterns())?;
        Ok(Self {
            parser,
            priority,
            enabled: true,
            seq,
            patterns,
        })
    }

    fn claims(&self, file_name: &str, content: &str) -> bool {
        self.enabled && (self.patterns.matches(file_name) || self.parser.sniff(content))
    }

    fn info(&self) -> RegistrationInfo {
        RegistrationInfo {
            kind: self.parser.kind(),
            role: self.parser.kind().role(),
            priority: self.priority,
            enabled: self.enabled,
            file_patterns: self.patterns.globs().map(str::to_string).collect(),
        }
    }
}

/// The parser that owns a file.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedParser<'a> {
    Project(&'a ProjectParser),
    Aux(&'a AuxParser),
}

impl ResolvedParser<'_> {
    pub fn kind(&self) -> ParserKind {
        match self {
            ResolvedParser::Project(p) => p.kind(),
            ResolvedParser::Aux(p) => p.kind(),
        }
    }

    pub fn role(&self) -> ParserRole {
        match self {
            ResolvedParser::Project(_) => ParserRole::Project,
            ResolvedParser::Aux(_) => ParserRole::Aux,
        }
    }
}

/// Serializable view of one registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationInfo {
    pub kind: ParserKind,
    pub role: ParserRole,
    pub priority: Priority,
    pub enabled: bool,
    pub file_patterns: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ParserRegistry {
    projects: Vec<Registration<ProjectParser>>,
    aux: Vec<Registration<AuxParser>>,
    next_seq: usize,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every shipped parser, shaped by the `[parsers]` config.
    ///
    /// Both projects claim the MaaFramework main log; the preferred project
    /// (MaaEnd unless configured otherwise) gets the higher priority.
    pub fn builtin(config: &ParsersConfig) -> Result<Self, RegistryError> {
        let preferred = config
            .preferred_project
            .unwrap_or(ParserKind::MaaEndProject);
        let priority_for = |kind: ParserKind| {
            if kind == preferred {
                Priority::HIGH
            } else {
                Priority::MEDIUM
            }
        };

        let mut registry = Self::new();
        registry.register(MaaEndProjectParser::default(), priority_for(ParserKind::MaaEndProject))?;
        registry.register(LoguruProjectParser::default(), priority_for(ParserKind::LoguruProject))?;
        registry.register_aux_parser(MaaEndAuxParser)?;
        registry.register_aux_parser(LoguruAuxParser)?;

        for kind in &config.disabled {
            registry.set_enabled(*kind, false);
        }

        debug!(preferred = preferred.as_str(), disabled = config.disabled.len(), "Built parser registry");
        Ok(registry)
    }

    pub fn register(
        &mut self,
        parser: impl Into<ProjectParser>,
        priority: Priority,
    ) -> Result<(), RegistryError> {
        let registration = Registration::<ProjectParser>::new(parser.into(), priority, self.next_seq)?;
        self.next_seq += 1;
        self.projects.push(registration);
        Ok(())
    }

    pub fn register_aux_parser(&mut self, parser: impl Into<AuxParser>) -> Result<(), RegistryError> {
        self.register_aux_parser_with_priority(parser, Priority::default())
    }

    pub fn register_aux_parser_with_priority(
        &mut self,
        parser: impl Into<AuxParser>,
        priority: Priority,
    ) -> Result<(), RegistryError> {
        let registration = Registration::<AuxParser>::new(parser.into(), priority, self.next_seq)?;
        self.next_seq += 1;
        self.aux.push(registration);
        Ok(())
    }

    /// Enable or disable every registration of `kind`. Returns how many changed.
    pub fn set_enabled(&mut self, kind: ParserKind, enabled: bool) -> usize {
        let mut changed = 0;
        for r in self.projects.iter_mut().filter(|r| r.parser.kind() == kind) {
            r.enabled = enabled;
            changed += 1;
        }
        for r in self.aux.iter_mut().filter(|r| r.parser.kind() == kind) {
            r.enabled = enabled;
            changed += 1;
        }
        changed
    }

    /// Pick the parser that owns `file_name`.
    ///
    /// Enabled registrations claim a file when a pattern matches its base
    /// name or the parser's sniffing accepts `content`. The highest priority
    /// wins, then the earliest registration. `None` means the file should be
    /// kept as raw lines.
    pub fn resolve(&self, file_name: &str, content: &str) -> Option<ResolvedParser<'_>> {
        let projects = self
            .projects
            .iter()
            .filter(|r| r.claims(file_name, content))
            .map(|r| (r.priority, r.seq, ResolvedParser::Project(&r.parser)));
        let aux = self
            .aux
            .iter()
            .filter(|r| r.claims(file_name, content))
            .map(|r| (r.priority, r.seq, ResolvedParser::Aux(&r.parser)));

        let resolved = projects
            .chain(aux)
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
            .map(|(_, _, parser)| parser);

        match &resolved {
            Some(parser) => debug!(file = base_name(file_name), parser = parser.kind().as_str(), "Resolved parser"),
            None => debug!(file = base_name(file_name), "No parser claims file"),
        }
        resolved
    }

    /// The highest-priority enabled project whose auxiliary parser is `aux_kind`.
    pub fn project_for_aux(&self, aux_kind: ParserKind) -> Option<&ProjectParser> {
        self.projects
            .iter()
            .filter(|r| r.enabled && r.parser.aux_log_parser_info().kind == aux_kind)
            .max_by(|a, b| a.priority.cmp(&b.priority).then_with(|| b.seq.cmp(&a.seq)))
            .map(|r| &r.parser)
    }

    /// All registrations in registration order
    pub fn registrations(&self) -> Vec<RegistrationInfo> {
        let mut infos: Vec<(usize, RegistrationInfo)> = self
            .projects
            .iter()
            .map(|r| (r.seq, r.info()))
            .chain(self.aux.iter().map(|r| (r.seq, r.info())))
            .collect();
        infos.sort_by_key(|(seq, _)| *seq);
        infos.into_iter().map(|(_, info)| info).collect()
    }

    pub fn len(&self) -> usize {
        self.projects.len() + self.aux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MAIN_LINE: &str = "[2025-06-14 11:37:29.601][INF][Px1][Tx1] hello";
    const LOGURU_LINE: &str = "2025-06-14 11:37:29.612 | INFO | agent:run:3 - x";

    #[test]
    fn test_higher_priority_registered_later_wins() {
        let mut registry = ParserRegistry::new();
        registry.register(LoguruProjectParser::default(), Priority::MEDIUM).unwrap();
        registry.register(MaaEndProjectParser::default(), Priority::HIGH).unwrap();

        let resolved = registry.resolve("maa.log", "").unwrap();
        assert_eq!(resolved.kind(), ParserKind::MaaEndProject);
    }

    #[test]
    fn test_equal_priority_first_registered_wins() {
        let mut registry = ParserRegistry::new();
        registry.register(LoguruProjectParser::default(), Priority::MEDIUM).unwrap();
        registry.register(MaaEndProjectParser::default(), Priority::MEDIUM).unwrap();

        for _ in 0..10 {
            let resolved = registry.resolve("maa.log", MAIN_LINE).unwrap();
            assert_eq!(resolved.kind(), ParserKind::LoguruProject);
        }
    }

    #[test]
    fn test_disabled_registrations_are_skipped() {
        let mut registry = ParserRegistry::new();
        registry.register(MaaEndProjectParser::default(), Priority::HIGH).unwrap();
        registry.register(LoguruProjectParser::default(), Priority::LOW).unwrap();
        assert_eq!(registry.set_enabled(ParserKind::MaaEndProject, false), 1);

        let resolved = registry.resolve("maa.log", "").unwrap();
        assert_eq!(resolved.kind(), ParserKind::LoguruProject);

        registry.set_enabled(ParserKind::LoguruProject, false);
        assert!(registry.resolve("maa.log", "").is_none());
    }

    #[rstest]
    #[case("debug/maa.log", "", ParserKind::MaaEndProject)]
    #[case("maa.bak.log", "", ParserKind::MaaEndProject)]
    #[case("go-service-20250614.log", "", ParserKind::MaaEndAux)]
    #[case("agent.log", "", ParserKind::LoguruAux)]
    #[case("renamed.txt", MAIN_LINE, ParserKind::MaaEndProject)]
    #[case("renamed.txt", LOGURU_LINE, ParserKind::LoguruAux)]
    fn test_builtin_resolution(#[case] file: &str, #[case] content: &str, #[case] expected: ParserKind) {
        let registry = ParserRegistry::builtin(&ParsersConfig::default()).unwrap();
        assert_eq!(registry.resolve(file, content).map(|p| p.kind()), Some(expected));
    }

    #[test]
    fn test_builtin_preferred_project() {
        let config = ParsersConfig {
            preferred_project: Some(ParserKind::LoguruProject),
            ..Default::default()
        };
        let registry = ParserRegistry::builtin(&config).unwrap();
        let resolved = registry.resolve("maa.log", "").unwrap();
        assert_eq!(resolved.kind(), ParserKind::LoguruProject);
        assert_eq!(resolved.role(), ParserRole::Project);
    }

    #[test]
    fn test_builtin_disabled_kinds() {
        let config = ParsersConfig {
            disabled: vec![ParserKind::LoguruAux],
            ..Default::default()
        };
        let registry = ParserRegistry::builtin(&config).unwrap();
        assert!(registry.resolve("agent.log", "").is_none());
        assert!(registry.project_for_aux(ParserKind::LoguruAux).is_some());
    }

    #[test]
    fn test_unclaimed_file_resolves_to_none() {
        let registry = ParserRegistry::builtin(&ParsersConfig::default()).unwrap();
        assert!(registry.resolve("notes.txt", "hello world").is_none());
    }

    #[test]
    fn test_aux_priority_competes_with_projects() {
        let mut registry = ParserRegistry::new();
        registry.register(MaaEndProjectParser::default(), Priority::LOW).unwrap();
        registry
            .register_aux_parser_with_priority(LoguruAuxParser, Priority::HIGH)
            .unwrap();

        let content = format!("{}\n{}", MAIN_LINE, LOGURU_LINE);
        let resolved = registry.resolve("mixed.txt", &content).unwrap();
        assert_eq!(resolved.role(), ParserRole::Aux);
    }

    #[test]
    fn test_registrations_in_order() {
        let registry = ParserRegistry::builtin(&ParsersConfig::default()).unwrap();
        let kinds: Vec<_> = registry.registrations().into_iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParserKind::MaaEndProject,
                ParserKind::LoguruProject,
                ParserKind::MaaEndAux,
                ParserKind::LoguruAux,
            ]
        );
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_project_for_aux() {
        let registry = ParserRegistry::builtin(&ParsersConfig::default()).unwrap();
        let project = registry.project_for_aux(ParserKind::MaaEndAux).unwrap();
        assert_eq!(project.kind(), ParserKind::MaaEndProject);
    }
}
