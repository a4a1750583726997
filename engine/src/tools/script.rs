//! Script execution tool
//!
//! Runs a script inside the sandbox root with the configured interpreter.
//! The child gets the sandbox root as its working directory, a null stdin
//! and a hard wall-clock limit. On unix it is placed in its own process
//! group so a timeout kills everything it spawned, not just the
//! interpreter.

use async_trait::async_trait;
use sdk::types::{ToolError, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::schema::{parse_args, FunctionDeclaration, ParamType};
use super::Tool;
use crate::config::ScriptConfig;
use crate::sandbox::SandboxRoot;

pub const RUN_SCRIPT: &str = "run_python_file";

/// How scripts are launched
#[derive(Debug, Clone)]
pub struct ScriptSettings {
    /// Program the script path is passed to
    pub interpreter: String,

    /// Required file extension, without the dot
    pub extension: String,

    /// Wall-clock limit for the whole run
    pub timeout: Duration,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&ScriptConfig> for ScriptSettings {
    fn from(config: &ScriptConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            extension: config.extension.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunScriptParams {
    file_path: String,
    #[serde(default)]
    args: Vec<String>,
}

/// `run_python_file(file_path, args=[])`
pub struct RunScriptTool {
    declaration: FunctionDeclaration,
    settings: ScriptSettings,
}

impl RunScriptTool {
    pub fn new(settings: ScriptSettings) -> Self {
        let declaration = FunctionDeclaration::new(
            RUN_SCRIPT,
            format!(
                "Executes a .{} file within the working directory and returns its output. Accepts optional command-line arguments.",
                settings.extension
            ),
        )
        .required(
            "file_path",
            ParamType::String,
            "The path of the script to execute, relative to the working directory.",
        )
        .optional(
            "args",
            ParamType::array_of(ParamType::String),
            "Optional list of command-line arguments to pass to the script.",
        );

        Self {
            declaration,
            settings,
        }
    }

    /// Run `file_path` with `args` and report its output.
    ///
    /// A non-zero exit code is reported in the output, not as an error.
    pub async fn run(&self, root: &SandboxRoot, file_path: &str, args: &[String]) -> ToolResult {
        let path = root.resolve(file_path).map_err(|e| {
            warn!("Refusing to execute {:?}: {}", file_path, e);
            super::refusal(e, "execute")
        })?;

        if !path.exists() {
            return Err(ToolError::not_found(format!(
                "File \"{}\" not found.",
                file_path
            )));
        }

        // Judged on the requested name, so an in-root symlink named `x.py`
        // runs whatever it points at
        let has_extension = Path::new(file_path)
            .extension()
            .is_some_and(|ext| ext.to_string_lossy() == self.settings.extension);
        if !has_extension {
            let message = if self.settings.extension == "py" {
                format!("\"{}\" is not a Python file.", file_path)
            } else {
                format!("\"{}\" is not a .{} file.", file_path, self.settings.extension)
            };
            return Err(ToolError::not_found(message));
        }

        info!(
            "Executing script: {} {} {:?}",
            self.settings.interpreter,
            path.display(),
            args
        );

        self.execute(root.path(), &path, args).await
    }

    async fn execute(&self, work_dir: &Path, script: &Path, args: &[String]) -> ToolResult {
        let mut command = Command::new(&self.settings.interpreter);
        command
            .arg(script)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| ToolError::execution_failed(format!("executing script: {}", e)))?;

        let pid = child.id();
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let collected = tokio::time::timeout(self.settings.timeout, async {
            tokio::try_join!(
                child.wait(),
                read_stream(stdout.as_mut()),
                read_stream(stderr.as_mut())
            )
        })
        .await;

        match collected {
            Ok(Ok((status, out, err))) => {
                debug!("Script finished with {}", status);
                Ok(format_output(status, &out, &err))
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(ToolError::execution_failed(format!("executing script: {}", e)))
            }
            Err(_) => {
                warn!(
                    "Script timed out after {:?}, killing process group",
                    self.settings.timeout
                );
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                // Reap the interpreter so no zombie is left behind
                if let Err(e) = child.kill().await {
                    debug!("Reaping timed out script failed: {}", e);
                }
                Err(ToolError::timeout(format!(
                    "executing script: Process timed out after {}",
                    format_duration(self.settings.timeout)
                )))
            }
        }
    }
}

#[async_trait]
impl Tool for RunScriptTool {
    fn declaration(&self) -> &FunctionDeclaration {
        &self.declaration
    }

    async fn call(&self, root: &SandboxRoot, args: Map<String, Value>) -> ToolResult {
        let params: RunScriptParams = parse_args(RUN_SCRIPT, args)?;
        self.run(root, &params.file_path, &params.args).await
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<&mut R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!("killpg({}) failed: {}", raw, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn format_duration(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{} seconds", timeout.as_secs())
    } else {
        format!("{} ms", timeout.as_millis())
    }
}

fn format_output(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let mut sections = Vec::new();
    if stdout.is_empty() && stderr.is_empty() {
        sections.push("No output produced.".to_string());
    } else {
        sections.push(format!("STDOUT:\n{}", stdout.trim_end()));
        sections.push(format!("STDERR:\n{}", stderr.trim_end()));
    }

    if let Some(code) = status.code() {
        if code != 0 {
            sections.push(format!("Process exited with code {}", code));
        }
    } else {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                sections.push(format!("Process terminated by signal {}", signal));
            }
        }
    }

    sections.join("\n")
}
