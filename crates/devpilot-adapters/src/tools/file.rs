//! The `file_manage` tool: read, write, delete and list on the local
//! filesystem.

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use devpilot_contracts::message::Arguments;
use devpilot_core::traits::ToolAdapter;

use super::string_arg;

const INVALID_OPERATION: &str = "Invalid operation. Use 'read', 'write', 'delete', or 'list'";

#[derive(Debug, Clone, Copy, Default)]
pub struct FileManageTool;

impl FileManageTool {
    pub fn new() -> Self {
        Self
    }

    async fn perform(&self, operation: &str, path: &str, content: Option<&str>) -> std::io::Result<String> {
        match operation {
            "read" => fs::read_to_string(path).await,
            "write" => {
                let content = content.ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "'content' is required for write",
                    )
                })?;
                fs::write(path, content).await?;
                Ok(format!("Successfully wrote to {path}"))
            }
            "delete" => {
                fs::remove_file(path).await?;
                Ok(format!("Successfully deleted {path}"))
            }
            "list" => {
                let mut entries = fs::read_dir(path).await?;
                let mut names = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
                names.sort();
                Ok(names.join("\n"))
            }
            _ => Ok(INVALID_OPERATION.to_string()),
        }
    }
}

#[async_trait]
impl ToolAdapter for FileManageTool {
    async fn invoke(&self, arguments: &Arguments) -> String {
        let operation = string_arg(arguments, "operation").unwrap_or_default();
        let Some(path) = string_arg(arguments, "path") else {
            return "Error performing file operation: missing 'path' argument".to_string();
        };
        info!(operation = %operation, path = %path, "file operation");

        match self
            .perform(operation, path, string_arg(arguments, "content"))
            .await
        {
            Ok(result) => result,
            Err(e) => format!("Error performing file operation: {e}"),
        }
    }
}
