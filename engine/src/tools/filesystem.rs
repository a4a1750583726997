//! Filesystem tools
//!
//! Listing, reading and writing inside the sandbox root. Every path is
//! resolved through [`SandboxRoot::resolve`] before any I/O, and every
//! failure comes back as a [`ToolError`] for the model to read.

use async_trait::async_trait;
use sdk::types::{ToolError, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

use super::schema::{parse_args, FunctionDeclaration, ParamType};
use super::Tool;
use crate::sandbox::SandboxRoot;

pub const LIST_DIR: &str = "get_files_info";
pub const READ_FILE: &str = "get_file_content";
pub const WRITE_FILE: &str = "write_file";

/// Default read cap in characters
pub const DEFAULT_MAX_READ_CHARS: usize = 10_000;

fn resolve(root: &SandboxRoot, verb: &str, path: &str) -> Result<PathBuf, ToolError> {
    root.resolve(path).map_err(|e| {
        warn!("Refusing to {} {:?}: {}", verb, path, e);
        super::refusal(e, verb)
    })
}

/// List the immediate entries of `directory`.
///
/// One line per entry, in the order the platform enumerates them.
pub async fn get_files_info(root: &SandboxRoot, directory: &str) -> ToolResult {
    let path = resolve(root, "list", directory)?;

    let is_dir = fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(ToolError::not_found(format!(
            "\"{}\" is not a directory",
            directory
        )));
    }

    info!("Listing directory: {}", path.display());

    let mut entries = fs::read_dir(&path)
        .await
        .map_err(|e| ToolError::io(format!("listing \"{}\"", directory), &e))?;

    let mut lines = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return Err(ToolError::io(format!("listing \"{}\"", directory), &e)),
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        // Symlinks are described, not followed
        let line = match entry.metadata().await {
            Ok(meta) => format!(
                "- {}: file_size={} bytes, is_dir={}",
                name,
                meta.len(),
                meta.is_dir()
            ),
            Err(e) => format!("- {}: Error reading file info ({})", name, e),
        };
        lines.push(line);
    }

    debug!("Listed {} entries in {}", lines.len(), path.display());
    Ok(lines.join("\n"))
}

/// Read a regular file, truncated to `max_chars` characters.
pub async fn get_file_content(root: &SandboxRoot, file_path: &str, max_chars: usize) -> ToolResult {
    let path = resolve(root, "read", file_path)?;

    let is_file = fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Err(ToolError::not_found(format!(
            "File not found or is not a regular file: \"{}\"",
            file_path
        )));
    }

    info!("Reading file: {}", path.display());

    let bytes = fs::read(&path)
        .await
        .map_err(|e| ToolError::io(format!("reading file \"{}\"", file_path), &e))?;
    let content = String::from_utf8_lossy(&bytes);

    debug!("Read {} bytes from {}", bytes.len(), path.display());

    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => Ok(format!(
            "{}[...File \"{}\" truncated at {} characters]",
            &content[..cut],
            file_path,
            max_chars
        )),
        None => Ok(content.into_owned()),
    }
}

/// Create or overwrite a file, creating missing parent directories.
pub async fn write_file(root: &SandboxRoot, file_path: &str, content: &str) -> ToolResult {
    let path = resolve(root, "write to", file_path)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ToolError::io(format!("creating directories for \"{}\"", file_path), &e))?;
    }

    let written = content.chars().count();
    info!("Writing {} characters to: {}", written, path.display());

    fs::write(&path, content)
        .await
        .map_err(|e| ToolError::io(format!("writing to file \"{}\"", file_path), &e))?;

    Ok(format!(
        "Successfully wrote to \"{}\" ({} characters written)",
        file_path, written
    ))
}

#[derive(Debug, Deserialize)]
struct ListDirParams {
    #[serde(default = "current_dir")]
    directory: String,
}

fn current_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize)]
struct ReadFileParams {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileParams {
    file_path: String,
    content: String,
}

/// `get_files_info(directory=".")`
pub struct ListDirTool {
    declaration: FunctionDeclaration,
}

impl ListDirTool {
    pub fn new() -> Self {
        Self {
            declaration: FunctionDeclaration::new(
                LIST_DIR,
                "Lists files in the specified directory along with their sizes, constrained to the working directory.",
            )
            .optional(
                "directory",
                ParamType::String,
                "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself.",
            ),
        }
    }
}

impl Default for ListDirTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn declaration(&self) -> &FunctionDeclaration {
        &self.declaration
    }

    async fn call(&self, root: &SandboxRoot, args: Map<String, Value>) -> ToolResult {
        let params: ListDirParams = parse_args(LIST_DIR, args)?;
        get_files_info(root, &params.directory).await
    }
}

/// `get_file_content(file_path)`
pub struct ReadFileTool {
    declaration: FunctionDeclaration,
    max_chars: usize,
}

impl ReadFileTool {
    pub fn new(max_chars: usize) -> Self {
        Self {
            declaration: FunctionDeclaration::new(
                READ_FILE,
                format!(
                    "Reads the contents of the specified file, constrained to the working directory. Output is truncated after {} characters.",
                    max_chars
                ),
            )
            .required(
                "file_path",
                ParamType::String,
                "The path of the file to read, relative to the working directory.",
            ),
            max_chars,
        }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_READ_CHARS)
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn declaration(&self) -> &FunctionDeclaration {
        &self.declaration
    }

    async fn call(&self, root: &SandboxRoot, args: Map<String, Value>) -> ToolResult {
        let params: ReadFileParams = parse_args(READ_FILE, args)?;
        get_file_content(root, &params.file_path, self.max_chars).await
    }
}

/// `write_file(file_path, content)`
pub struct WriteFileTool {
    declaration: FunctionDeclaration,
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self {
            declaration: FunctionDeclaration::new(
                WRITE_FILE,
                "Writes content to a file, creating it and any missing parent directories, constrained to the working directory. Overwrites existing files.",
            )
            .required(
                "file_path",
                ParamType::String,
                "The path of the file to write, relative to the working directory.",
            )
            .required(
                "content",
                ParamType::String,
                "The full text to write into the file.",
            ),
        }
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn declaration(&self) -> &FunctionDeclaration {
        &self.declaration
    }

    async fn call(&self, root: &SandboxRoot, args: Map<String, Value>) -> ToolResult {
        let params: WriteFileParams = parse_args(WRITE_FILE, args)?;
        write_file(root, &params.file_path, &params.content).await
    }
}
