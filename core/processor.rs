use crate::command_runner::Dispatch;
use crate::file_finder::ImageStore;
use crate::rule::Rule;
use crate::CoreError;

/// Sink for operator-visible messages.
pub trait Reporter {
    /// An aborted folder, a skipped rule, or the end-of-run summary of a failed run.
    fn report_failure(&mut self, message: &str);

    /// A command that ran but did not succeed.
    fn report_warning(&mut self, message: &str) {
        let _ = message;
    }
}

/// Keeps every reported message in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    pub failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl Reporter for MemoryReporter {
    fn report_failure(&mut self, message: &str) {
        self.failures.push(message.to_string());
    }

    fn report_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub invocations: usize,
    pub failed_invocations: usize,
    pub aborted_folders: usize,
    pub skipped_rules: usize,
    /// Diagnostics in the order they occurred.
    pub messages: Vec<String>,
}

impl Default for RunOutcome {
    fn default() -> Self {
        RunOutcome {
            success: true,
            invocations: 0,
            failed_invocations: 0,
            aborted_folders: 0,
            skipped_rules: 0,
            messages: Vec::new(),
        }
    }
}

impl RunOutcome {
    fn fail(&mut self, message: String) {
        self.success = false;
        self.messages.push(message);
    }

    pub fn summary(&self) -> String {
        if self.success {
            return format!(
                "Image manipulation finished: {} {} run.",
                self.invocations,
                plural(self.invocations, "command", "commands")
            );
        }
        format!(
            "Image manipulation failed: {} of {} {} failed, {} {} aborted, {} {} skipped.",
            self.failed_invocations,
            self.invocations,
            plural(self.invocations, "command", "commands"),
            self.aborted_folders,
            plural(self.aborted_folders, "folder", "folders"),
            self.skipped_rules,
            plural(self.skipped_rules, "rule", "rules"),
        )
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Runs every rule over every one of its folders, one command at a time.
///
/// A rule that failed to compile is skipped. An error while resolving a
/// folder or launching a command abandons the rest of that folder only. A
/// command that exits non-zero is recorded and the next file is processed.
pub struct Pipeline<'a> {
    store: &'a dyn ImageStore,
    dispatcher: &'a mut dyn Dispatch,
    reporter: &'a mut dyn Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        store: &'a dyn ImageStore,
        dispatcher: &'a mut dyn Dispatch,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Pipeline {
            store,
            dispatcher,
            reporter,
        }
    }

    pub fn run(&mut self, rules: &[Result<Rule, CoreError>]) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        for (index, compiled) in rules.iter().enumerate() {
            let number = index + 1;
            let rule = match compiled {
                Ok(rule) => rule,
                Err(e) => {
                    outcome.skipped_rules += 1;
                    tracing::error!(rule = number, error = %e, "rule skipped");
                    self.fail(&mut outcome, format!("Rule {} was not run: {}", number, e));
                    continue;
                }
            };

            let _span = tracing::debug_span!("rule", number).entered();
            for alias in &rule.folders {
                if let Err(e) = self.run_folder(rule, alias, &mut outcome) {
                    outcome.aborted_folders += 1;
                    tracing::error!(folder = %alias, error = %e, "folder aborted");
                    self.fail(
                        &mut outcome,
                        format!(
                            "Error during image manipulation of folder '{}' (rule {}): {}",
                            alias, number, e
                        ),
                    );
                }
            }
        }

        if !outcome.success {
            self.reporter.report_failure(&outcome.summary());
        }
        outcome
    }

    fn run_folder(
        &mut self,
        rule: &Rule,
        alias: &str,
        outcome: &mut RunOutcome,
    ) -> Result<(), CoreError> {
        let folder = rule.candidates_in(alias, self.store)?;
        tracing::debug!(
            folder = %folder.path.display(),
            command = ?rule.command.tokens(),
            filters = ?rule.filters,
            files = folder.files.len(),
            excluded = folder.excluded(),
            "processing folder"
        );

        for file in &folder.candidates {
            let command = rule.command.render(file);
            let result = self.dispatcher.dispatch(&command)?;
            outcome.invocations += 1;
            if !result.success() {
                outcome.failed_invocations += 1;
                let message = result.describe_failure();
                tracing::warn!("{}", message);
                self.reporter.report_warning(&message);
                outcome.fail(message);
            }
        }
        Ok(())
    }

    fn fail(&mut self, outcome: &mut RunOutcome, message: String) {
        self.reporter.report_failure(&message);
        outcome.fail(message);
    }
}
