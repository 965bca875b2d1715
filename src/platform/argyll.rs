//! ArgyllCMS command-line tools
//!
//! Wraps `dispwin`, `targen` and `dispread`. Commands go through a
//! [`CommandRunner`] so tests can record them instead of spawning processes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::config::PatchCounts;

#[derive(Debug, Error)]
pub enum ArgyllError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{step} failed ({})", describe_code(.code))]
    CommandFailed { step: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs
pub trait CommandRunner {
    /// Runs a command with its output captured
    fn output(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError>;

    /// Runs a command attached to the terminal, returning its exit status
    fn status(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError>;

    /// Sets the working directory for subsequent commands
    fn set_current_dir(&mut self, dir: &Path);
}

/// Runs programs with `std::process::Command`
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Directory holding the Argyll executables; `PATH` is used when unset
    pub tool_dir: Option<PathBuf>,
    /// Working directory for spawned commands
    pub current_dir: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new(tool_dir: Option<PathBuf>) -> Self {
        // Relative tool paths must survive a change of working directory
        let tool_dir = tool_dir.map(|dir| std::path::absolute(&dir).unwrap_or(dir));
        Self {
            tool_dir,
            current_dir: None,
        }
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let executable = match &self.tool_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        };
        let mut command = Command::new(executable);
        command.args(args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl CommandRunner for SystemRunner {
    fn output(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError> {
        let output = self
            .command(program, args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ArgyllError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn status(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError> {
        let status = self
            .command(program, args)
            .status()
            .map_err(|source| ArgyllError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            ..Default::default()
        })
    }

    fn set_current_dir(&mut self, dir: &Path) {
        self.current_dir = Some(dir.to_path_buf());
    }
}

/// A display as listed by `dispwin -?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub number: usize,
    pub description: String,
}

/// Extracts `N = 'description'` lines from `dispwin` usage output
pub fn parse_display_list(output: &str) -> Vec<DisplayInfo> {
    output
        .lines()
        .filter_map(|line| {
            let (number, description) = line.trim().split_once('=')?;
            let number = number.trim();
            if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let description = description.trim().trim_matches('\'');
            if description.is_empty() {
                return None;
            }
            Some(DisplayInfo {
                number: number.parse().ok()?,
                description: description.to_string(),
            })
        })
        .collect()
}

/// Argument list for `targen`
pub fn targen_args(base: &str, patches: &PatchCounts) -> Vec<String> {
    let mut args = vec!["-v".to_string(), "-d3".to_string(), "-f0".to_string()];
    if patches.include_gray() {
        args.push(format!("-g{}", patches.gray));
    }
    if patches.include_color() {
        args.push(format!("-s{}", patches.color));
    }
    args.push(base.to_string());
    args
}

/// Front end for the Argyll tools used by calibration
pub struct Argyll<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> Argyll<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs subsequent commands inside `dir`
    pub fn work_in(&mut self, dir: &Path) {
        self.runner.set_current_dir(dir);
    }

    /// Lists displays known to `dispwin`
    ///
    /// `dispwin -?` prints usage and exits non-zero, so the status is ignored.
    pub fn list_displays(&mut self) -> Result<Vec<DisplayInfo>, ArgyllError> {
        let args = vec!["-?".to_string()];
        announce("Listing Display Devices", "dispwin", &args);
        let output = self.runner.output("dispwin", &args)?;
        let combined = format!("{}{}", output.stdout, output.stderr);
        tracing::debug!("dispwin usage output:\n{}", combined);
        Ok(parse_display_list(&combined))
    }

    /// Generates the test patch set `<base>.ti1`
    pub fn generate_patches(&mut self, base: &str, patches: &PatchCounts) -> Result<(), ArgyllError> {
        self.run_step("Generating Test Patches", "targen", targen_args(base, patches))
    }

    /// Clears the display's calibration so it is measured in a linear state
    pub fn reset_display(&mut self, display: usize) -> Result<(), ArgyllError> {
        self.run_step(
            "Setting Display to Linear State",
            "dispwin",
            vec![format!("-d{display}"), "-c".to_string()],
        )
    }

    /// Measures the patches of `<base>.ti1` into `<base>.ti3`
    pub fn measure_patches(&mut self, display: usize, base: &str) -> Result<(), ArgyllError> {
        self.run_step(
            "Measuring Patches",
            "dispread",
            vec![
                "-v".to_string(),
                "-yl".to_string(),
                format!("-d{display}"),
                base.to_string(),
            ],
        )
    }

    /// Loads a `.cal` file into the display's video LUT
    pub fn load_calibration(&mut self, display: usize, path: &Path) -> Result<bool, ArgyllError> {
        let args = vec![format!("-d{display}"), path.display().to_string()];
        tracing::debug!("Running command: dispwin {}", args.join(" "));
        Ok(self.runner.output("dispwin", &args)?.success)
    }

    /// Saves the display's active video LUT to a `.cal` file
    pub fn save_calibration(&mut self, display: usize, path: &Path) -> Result<bool, ArgyllError> {
        let args = vec![
            format!("-d{display}"),
            "-s".to_string(),
            path.display().to_string(),
        ];
        tracing::debug!("Running command: dispwin {}", args.join(" "));
        Ok(self.runner.output("dispwin", &args)?.success)
    }

    fn run_step(&mut self, step: &str, program: &str, args: Vec<String>) -> Result<(), ArgyllError> {
        announce(step, program, &args);
        let output = self.runner.status(program, &args)?;
        if !output.success {
            tracing::error!(step, code = ?output.code, "Command failed");
            return Err(ArgyllError::CommandFailed {
                step: step.to_string(),
                code: output.code,
            });
        }
        Ok(())
    }
}

fn announce(step: &str, program: &str, args: &[String]) {
    println!("\n=== {step} ===");
    println!("Running command: {} {}", program, args.join(" "));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every command and replies with canned outputs
    #[derive(Debug, Default)]
    pub(crate) struct RecordingRunner {
        pub calls: Vec<(String, Vec<String>)>,
        pub replies: Vec<CommandOutput>,
        pub current_dir: Option<PathBuf>,
    }

    impl RecordingRunner {
        pub fn succeeding() -> Self {
            Self::default()
        }

        fn reply(&mut self, program: &str, args: &[String]) -> CommandOutput {
            self.calls.push((program.to_string(), args.to_vec()));
            if self.replies.is_empty() {
                CommandOutput {
                    success: true,
                    code: Some(0),
                    ..Default::default()
                }
            } else {
                self.replies.remove(0)
            }
        }
    }

    impl CommandRunner for RecordingRunner {
        fn output(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError> {
            Ok(self.reply(program, args))
        }

        fn status(&mut self, program: &str, args: &[String]) -> Result<CommandOutput, ArgyllError> {
            Ok(self.reply(program, args))
        }

        fn set_current_dir(&mut self, dir: &Path) {
            self.current_dir = Some(dir.to_path_buf());
        }
    }

    const USAGE: &str = "Load or test display calibration, Version 2.3.1\n\
usage: dispwin [options] [calfile]\n\
 -v                   Verbose mode\n\
 -d n                 Choose the display from the following list (default 1)\n\
    1 = 'Monitor 1, Output DP-1 at 0, 0, width 2560, height 1440'\n\
    2 = 'Monitor 2, Output HDMI-1 at 2560, 0, width 1920, height 1080'\n\
 -dweb[:port]         Display via a web server at port (default 8080)\n";

    #[test]
    fn parses_display_list() {
        let displays = parse_display_list(USAGE);

        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].number, 1);
        assert_eq!(
            displays[1].description,
            "Monitor 2, Output HDMI-1 at 2560, 0, width 1920, height 1080"
        );
    }

    #[test]
    fn list_displays_merges_streams() {
        let mut runner = RecordingRunner::succeeding();
        runner.replies.push(CommandOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: USAGE.to_string(),
        });

        let mut argyll = Argyll::new(runner);
        let displays = argyll.list_displays().unwrap();

        assert_eq!(displays.len(), 2);
        assert_eq!(argyll.runner().calls[0], ("dispwin".to_string(), vec!["-?".to_string()]));
    }

    #[test]
    fn builds_targen_arguments() {
        let both = PatchCounts::new(64, 32).unwrap();
        assert_eq!(targen_args("cal", &both), vec!["-v", "-d3", "-f0", "-g64", "-s32", "cal"]);

        let gray_only = PatchCounts::new(16, 0).unwrap();
        assert_eq!(targen_args("cal", &gray_only), vec!["-v", "-d3", "-f0", "-g16", "cal"]);
    }

    #[test]
    fn runs_calibration_steps_in_order() {
        let mut argyll = Argyll::new(RecordingRunner::succeeding());
        argyll.reset_display(2).unwrap();
        argyll.measure_patches(2, "cal_monitor_2").unwrap();

        let calls = &argyll.runner().calls;
        assert_eq!(calls[0], ("dispwin".to_string(), vec!["-d2".to_string(), "-c".to_string()]));
        assert_eq!(calls[1].0, "dispread");
        assert_eq!(calls[1].1, vec!["-v", "-yl", "-d2", "cal_monitor_2"]);
    }

    #[test]
    fn failed_step_is_an_error() {
        let mut runner = RecordingRunner::succeeding();
        runner.replies.push(CommandOutput {
            success: false,
            code: Some(3),
            ..Default::default()
        });

        let mut argyll = Argyll::new(runner);
        let err = argyll.reset_display(1).unwrap_err();
        assert!(matches!(err, ArgyllError::CommandFailed { code: Some(3), .. }));
        assert_eq!(err.to_string(), "Setting Display to Linear State failed (exit code 3)");
    }
}
