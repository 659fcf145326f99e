use crate::CoreError;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, Stdio};

/// Marker replaced by the image path in every command token.
pub const PLACEHOLDER: &str = "IMAGE_FILE";
/// Separator between the tokens of a configured command.
pub const TOKEN_SEPARATOR: &str = "|";

/// A pre-split command line. The first token is the executable, no shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    tokens: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        Self::from_tokens(raw.split(TOKEN_SEPARATOR).map(str::to_string).collect())
            .map_err(|e| match e {
                CoreError::InvalidCommandTemplate { reason, .. } => {
                    CoreError::InvalidCommandTemplate {
                        template: raw.to_string(),
                        reason,
                    }
                }
                other => other,
            })
    }

    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, CoreError> {
        match tokens.first() {
            Some(executable) if !executable.trim().is_empty() => Ok(Self { tokens }),
            _ => Err(CoreError::InvalidCommandTemplate {
                template: tokens.join(TOKEN_SEPARATOR),
                reason: "the executable token is empty".to_string(),
            }),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn executable(&self) -> &str {
        &self.tokens[0]
    }

    pub fn render(&self, file_path: &Path) -> Vec<OsString> {
        render_tokens(&self.tokens, PLACEHOLDER, file_path.as_os_str())
    }
}

/// Replaces every occurrence of `placeholder` inside every token. The path is
/// spliced in as an `OsStr`, so non-UTF-8 file names reach the process intact.
pub fn render_tokens(tokens: &[String], placeholder: &str, file_path: &OsStr) -> Vec<OsString> {
    tokens
        .iter()
        .map(|token| {
            if placeholder.is_empty() {
                return OsString::from(token);
            }
            let mut rendered = OsString::with_capacity(token.len());
            let mut pieces = token.split(placeholder);
            if let Some(first) = pieces.next() {
                rendered.push(first);
            }
            for piece in pieces {
                rendered.push(file_path);
                rendered.push(piece);
            }
            rendered
        })
        .collect()
}

/// Human-readable form of a rendered command, for logs and messages.
pub fn command_line(command: &[OsString]) -> String {
    command
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub command: Vec<OsString>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn describe_failure(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("The error code was {}", code),
            None => "The process was terminated by a signal".to_string(),
        };
        let mut message = format!(
            "A problem occurred while calling command '{}'. {}",
            command_line(&self.command),
            status
        );
        if !self.stderr.is_empty() {
            message.push_str(":\n");
            message.push_str(&self.stderr);
        }
        message
    }
}

/// Runs one rendered command and waits for it.
pub trait Dispatch {
    fn dispatch(&mut self, command: &[OsString]) -> Result<InvocationResult, CoreError>;
}

#[derive(Debug, Default)]
pub struct ProcessDispatcher;

impl Dispatch for ProcessDispatcher {
    fn dispatch(&mut self, command: &[OsString]) -> Result<InvocationResult, CoreError> {
        run_command(command)
    }
}

/// Records rendered commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRunDispatcher {
    pub planned: Vec<Vec<OsString>>,
}

impl Dispatch for DryRunDispatcher {
    fn dispatch(&mut self, command: &[OsString]) -> Result<InvocationResult, CoreError> {
        tracing::info!(command = %command_line(command), "dry run");
        self.planned.push(command.to_vec());
        Ok(InvocationResult {
            command: command.to_vec(),
            exit_code: Some(0),
            stderr: String::new(),
        })
    }
}

pub fn run_command(command: &[OsString]) -> Result<InvocationResult, CoreError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| CoreError::InvalidCommandTemplate {
            template: String::new(),
            reason: "the command is empty".to_string(),
        })?;
    let line = command_line(command);
    tracing::debug!(command = %line, "running");

    let mut cmd = Command::new(program);
    cmd.args(args);

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::piped());

    let process = cmd.spawn().map_err(|source| CoreError::ProcessLaunch {
        command: line.clone(),
        source,
    })?;

    let output = process
        .wait_with_output()
        .map_err(|source| CoreError::ProcessInterrupted {
            command: line,
            source,
        })?;

    Ok(InvocationResult {
        command: command.to_vec(),
        exit_code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Renders `template` for `file_path` and runs it.
pub fn invoke(
    template: &[String],
    placeholder: &str,
    file_path: &OsStr,
) -> Result<InvocationResult, CoreError> {
    run_command(&render_tokens(template, placeholder, file_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn parse_splits_on_pipe_only() {
        let template = CommandTemplate::parse("convert|IMAGE_FILE|-rotate|90|IMAGE_FILE").unwrap();
        assert_eq!(
            template.tokens(),
            ["convert", "IMAGE_FILE", "-rotate", "90", "IMAGE_FILE"]
        );
        assert_eq!(template.executable(), "convert");

        let spaced = CommandTemplate::parse("/opt/my tool|a b").unwrap();
        assert_eq!(spaced.tokens(), ["/opt/my tool", "a b"]);
    }

    #[test]
    fn parse_rejects_empty_executable() {
        for raw in ["", "|IMAGE_FILE", "  |x"] {
            let err = CommandTemplate::parse(raw).unwrap_err();
            match err {
                CoreError::InvalidCommandTemplate { template, .. } => assert_eq!(template, raw),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn render_substitutes_embedded_placeholders() {
        let template = CommandTemplate::parse("tool|--file=IMAGE_FILE").unwrap();
        assert_eq!(
            template.render(Path::new("/x/1.tif")),
            ["tool", "--file=/x/1.tif"]
        );

        let twice = render_tokens(
            &tokens(&["cp", "IMAGE_FILE:IMAGE_FILE"]),
            PLACEHOLDER,
            OsStr::new("/a"),
        );
        assert_eq!(twice, ["cp", "/a:/a"]);
    }

    #[test]
    fn render_is_idempotent_and_leaves_plain_templates_alone() {
        let template = CommandTemplate::parse("echo|hello|world").unwrap();
        let first = template.render(Path::new("/img/001.tif"));
        let second = template.render(Path::new("/img/001.tif"));
        assert_eq!(first, second);
        assert_eq!(first, ["echo", "hello", "world"]);
    }

    #[test]
    fn failure_description_carries_command_and_code() {
        let result = InvocationResult {
            command: args(&["tool", "/x/1.tif"]),
            exit_code: Some(2),
            stderr: "bad input".to_string(),
        };
        assert!(!result.success());
        let message = result.describe_failure();
        assert!(message.contains("'tool /x/1.tif'"));
        assert!(message.contains("The error code was 2"));
        assert!(message.ends_with("bad input"));
    }

    #[test]
    fn dry_run_records_without_running() {
        let mut dispatcher = DryRunDispatcher::default();
        let result = dispatcher
            .dispatch(&args(&["/does/not/exist", "/x/1.tif"]))
            .unwrap();
        assert!(result.success());
        assert_eq!(dispatcher.planned, vec![args(&["/does/not/exist", "/x/1.tif"])]);
    }

    #[test]
    fn missing_executable_is_a_launch_error() {
        let err = invoke(
            &tokens(&["/nonexistent/imanip-test-tool", "IMAGE_FILE"]),
            PLACEHOLDER,
            OsStr::new("/x/1.tif"),
        )
        .unwrap_err();
        match err {
            CoreError::ProcessLaunch { command, .. } => {
                assert_eq!(command, "/nonexistent/imanip-test-tool /x/1.tif")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_classified() {
        let ok = invoke(&tokens(&["true"]), PLACEHOLDER, OsStr::new("/x")).unwrap();
        assert!(ok.success());
        assert_eq!(ok.exit_code, Some(0));

        let failed = invoke(
            &tokens(&["sh", "-c", "echo oops >&2; exit 2"]),
            PLACEHOLDER,
            OsStr::new("/x"),
        )
        .unwrap();
        assert!(!failed.success());
        assert_eq!(failed.exit_code, Some(2));
        assert_eq!(failed.stderr, "oops");
    }

    #[cfg(unix)]
    #[test]
    fn file_path_is_passed_as_a_single_argument() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("scan 01.tif");
        let copy = dir.path().join("copy.tif");
        std::fs::write(&image, b"data").unwrap();

        let template = CommandTemplate::parse(&format!("cp|IMAGE_FILE|{}", copy.display())).unwrap();
        let result = run_command(&template.render(&image)).unwrap();
        assert!(result.success(), "{}", result.describe_failure());
        assert_eq!(std::fs::read(&copy).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn killed_process_is_a_failure_without_exit_code() {
        let killed = invoke(
            &tokens(&["sh", "-c", "kill -9 $$"]),
            PLACEHOLDER,
            OsStr::new("/x"),
        )
        .unwrap();
        assert!(!killed.success());
        assert_eq!(killed.exit_code, None);
        assert!(
            killed
                .describe_failure()
                .contains("The process was terminated by a signal")
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_passed_through_unchanged() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/scans/\xff\xfe-01.tif");
        let rendered = render_tokens(&tokens(&["tool", "--in=IMAGE_FILE"]), PLACEHOLDER, raw);
        assert_eq!(rendered[0], "tool");
        assert_eq!(rendered[1].as_bytes(), b"--in=/scans/\xff\xfe-01.tif");

        let template = CommandTemplate::parse("tool|IMAGE_FILE").unwrap();
        assert_eq!(template.render(Path::new(raw))[1].as_bytes(), raw.as_bytes());
    }
}
