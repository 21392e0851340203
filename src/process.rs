use crate::error::AcquireError;
use log::debug;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Runs a program to completion, capturing stdout and stderr.
///
/// A program that cannot be found maps to [`AcquireError::CommandMissing`];
/// a non-zero exit maps to [`AcquireError::CommandFailed`]. A missing working
/// directory is an i/o error, not a missing program.
pub fn run_command(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> Result<Output, AcquireError> {
    let rendered = format!("{} {}", program, args.join(" "));
    debug!("Running command: {}", rendered);

    let mut command = Command::new(program);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        if !dir.is_dir() {
            return Err(AcquireError::Io(io::Error::new(
                ErrorKind::NotFound,
                format!("working directory {} does not exist", dir.display()),
            )));
        }
        command.current_dir(dir);
    }

    let output = match command.output() {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AcquireError::CommandMissing {
                command: program.to_owned(),
            })
        }
        Err(e) => return Err(AcquireError::Io(e)),
    };

    if output.status.success() {
        Ok(output)
    } else {
        Err(AcquireError::from_command_failure(
            rendered,
            output.status.code().unwrap_or(-1),
            &output.stderr,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let result = run_command("definitely-not-a-real-program", &[], None);
        assert!(matches!(result, Err(AcquireError::CommandMissing { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_working_directory_is_not_a_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");

        let result = run_command("true", &[], Some(missing.as_path()));

        match result {
            Err(AcquireError::Io(e)) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("expected i/o error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_keeps_stderr() {
        let args = vec!["-c".to_string(), "echo boom >&2; exit 4".to_string()];
        match run_command("sh", &args, None) {
            Err(AcquireError::CommandFailed {
                status,
                stderr_suffix,
                ..
            }) => {
                assert_eq!(status, 4);
                assert_eq!(stderr_suffix, ": boom");
            }
            other => panic!("expected command failure, got {:?}", other),
        }
    }
}
