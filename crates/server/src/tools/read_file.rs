use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use toolbridge_core::tool::{Error as ToolError, Tool, ToolResult};

#[derive(Deserialize, JsonSchema)]
pub struct ReadFileParameters {
    #[schemars(description = "Full path to the file to read")]
    file_path: String,
    #[schemars(description = "1-based line to start reading from, default to 1.")]
    start_line: Option<usize>,
    #[schemars(description = "Number of lines to read, default to the rest of the file.")]
    line_count: Option<usize>,
}

/// A tool for reading file content from disk.
///
/// Failures are plain tool errors. Register it wrapped in
/// [`Recovering`](toolbridge_core::tool::Recovering) to report them to the
/// model instead of aborting the turn.
pub struct ReadFileTool {
    parameter_schema: Value,
}

impl ReadFileTool {
    /// Creates a new read file tool.
    #[inline]
    pub fn new() -> Self {
        ReadFileTool {
            parameter_schema: schema_for!(ReadFileParameters).to_value(),
        }
    }
}

impl Default for ReadFileTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ReadFileTool {
    type Input = ReadFileParameters;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file on disk"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn call(&self, input: ReadFileParameters) -> ToolResult {
        let start_line = input.start_line.unwrap_or(1);
        if start_line == 0 {
            return Err(ToolError::invalid_input()
                .with_reason("`start_line` must be 1-based"));
        }

        debug!("reading {}", input.file_path);
        let file = File::open(&input.file_path).map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::NotFound => {
                    format!("File not found at path: {}", input.file_path)
                }
                ErrorKind::PermissionDenied => {
                    format!("Permission denied: {}", input.file_path)
                }
                _ => format!("Failed to read {}: {err}", input.file_path),
            };
            ToolError::execution_error().with_reason(reason)
        })?;
        read_section(file, start_line, input.line_count)
    }
}

fn read_section<R: Read>(
    reader: R,
    start_line: usize,
    line_count: Option<usize>,
) -> ToolResult {
    let lines = BufReader::new(reader)
        .lines()
        .skip(start_line - 1)
        .take(line_count.unwrap_or(usize::MAX));

    let mut content = String::new();
    for line in lines {
        let line = line.map_err(|err| {
            ToolError::execution_error().with_reason(err.to_string())
        })?;
        content.push_str(&line);
        content.push('\n');
    }
    Ok(content)
}
