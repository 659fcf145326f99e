use crate::command_runner::CommandTemplate;
use crate::config::RuleConfig;
use crate::file_finder::ImageStore;
use anyhow::Result;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

/// Locates `program` the way process spawning does: paths containing a
/// separator are taken as-is, bare names are looked up on `PATH`.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

#[cfg(windows)]
fn executable_names(program: &str) -> impl Iterator<Item = String> {
    [program.to_string(), format!("{}.exe", program)].into_iter()
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> impl Iterator<Item = String> {
    std::iter::once(program.to_string())
}

fn check_command(command: &str) -> (bool, String) {
    let template = match CommandTemplate::parse(command) {
        Ok(t) => t,
        Err(e) => return (false, format!("{}", e)),
    };
    let executable = template.executable();
    match find_executable(executable) {
        Some(path) => (true, format!("{}: OK ({})", executable, path.display())),
        None => (
            false,
            format!("{}: Not found. Install it or use an absolute path", executable),
        ),
    }
}

fn check_folder(alias: &str, store: &dyn ImageStore) -> (bool, String) {
    match store.resolve_folder(alias) {
        Ok(path) => (true, format!("folder '{}': OK ({})", alias, path.display())),
        Err(e) => (false, format!("folder '{}': {}", alias, e)),
    }
}

/// Verifies that every configured executable and folder can be found. No
/// command is run.
pub fn check_dependencies(rules: &[RuleConfig], store: &dyn ImageStore) -> Result<()> {
    println!("Checking dependencies:");
    let mut all_ok = true;
    let mut checked_commands = HashSet::new();
    let mut checked_folders = HashSet::new();

    if rules.is_empty() {
        println!("No rules configured.");
        return Ok(());
    }

    for rule in rules {
        let mut results = Vec::new();
        if checked_commands.insert(rule.command.as_str()) {
            results.push(check_command(&rule.command));
        }
        for alias in &rule.imagefolder {
            if checked_folders.insert(alias.as_str()) {
                results.push(check_folder(alias, store));
            }
        }
        for (found, message) in results {
            println!("  {}", message);
            if !found {
                all_ok = false;
            }
        }
    }

    if !all_ok {
        anyhow::bail!("One or more configured commands or folders are missing.");
    } else {
        println!("All checked dependencies seem satisfied.");
    }
    Ok(())
}
