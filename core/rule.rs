use crate::command_runner::CommandTemplate;
use crate::config::{FilterValue, RuleConfig};
use crate::file_finder::ImageStore;
use crate::selector::{FileList, FilterSpec, Parity};
use crate::CoreError;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A compiled rule: the command to run, the folders to run it on and the
/// files to leave out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub command: CommandTemplate,
    pub folders: Vec<String>,
    pub filters: Vec<FilterSpec>,
}

/// The result of evaluating a rule against one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderCandidates {
    pub alias: String,
    pub path: PathBuf,
    pub files: FileList,
    pub candidates: FileList,
}

impl FolderCandidates {
    pub fn excluded(&self) -> usize {
        self.files.len() - self.candidates.len()
    }
}

impl Rule {
    /// Validates a configured rule. Non-numeric first/last positions and an
    /// empty executable are rejected here so that a bad rule never starts
    /// running. Unknown `exclude` keywords only produce a warning.
    pub fn compile(config: &RuleConfig) -> Result<Self, CoreError> {
        let command = CommandTemplate::parse(&config.command)?;

        let mut filters = Vec::new();
        for ex in &config.exclude {
            match Parity::parse(ex) {
                Some(parity) => filters.push(FilterSpec::Parity(parity)),
                None => tracing::warn!(value = %ex, "ignoring unknown exclude value"),
            }
        }
        for value in &config.exclude_first {
            filters.push(FilterSpec::FromStart(position("excludeFirst", value)?));
        }
        for value in &config.exclude_last {
            filters.push(FilterSpec::FromEnd(position("excludeLast", value)?));
        }

        Ok(Rule {
            command,
            folders: config.imagefolder.clone(),
            filters,
        })
    }

    /// Removes every file matched by any filter. Filters look at positions in
    /// `files` itself, so overlapping filters never shift each other.
    pub fn candidates(&self, files: &[PathBuf]) -> FileList {
        let excluded: BTreeSet<usize> = self
            .filters
            .iter()
            .flat_map(|filter| filter.matching_indices(files.len()))
            .collect();
        files
            .iter()
            .enumerate()
            .filter(|(i, _)| !excluded.contains(i))
            .map(|(_, file)| file.clone())
            .collect()
    }

    pub fn candidates_in(
        &self,
        alias: &str,
        store: &dyn ImageStore,
    ) -> Result<FolderCandidates, CoreError> {
        let path = store.resolve_folder(alias)?;
        let files = store.list_ordered_files(&path)?;
        let candidates = self.candidates(&files);
        Ok(FolderCandidates {
            alias: alias.to_string(),
            path,
            files,
            candidates,
        })
    }
}

fn position(group: &'static str, value: &FilterValue) -> Result<i64, CoreError> {
    value
        .as_position()
        .ok_or_else(|| CoreError::InvalidFilterValue {
            group,
            value: value.to_string(),
        })
}

pub fn compile_rules(rules: &[RuleConfig]) -> Vec<Result<Rule, CoreError>> {
    rules.iter().map(Rule::compile).collect()
}

/// Candidate sets of every target folder of `rule`, in the order the folders
/// are listed.
pub fn evaluate(rule: &Rule, store: &dyn ImageStore) -> Result<Vec<FolderCandidates>, CoreError> {
    rule.folders
        .iter()
        .map(|alias| rule.candidates_in(alias, store))
        .collect()
}
