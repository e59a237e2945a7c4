use anyhow::Context;
use async_trait::async_trait;
use ignore::WalkBuilder;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{require_str, DispatcherTool, ToolContext};
use crate::error::{ErrorCategory, ToolError};

/// File operations scoped to the working directory
pub struct FileTool;

const NAME: &str = "file";

impl FileTool {
    fn resolve(ctx: &ToolContext<'_>, path: &str) -> PathBuf {
        if path.starts_with('/') {
            PathBuf::from(path)
        } else {
            ctx.working_dir.join(path)
        }
    }

    fn optional_str<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
        params.get(key).and_then(Value::as_str)
    }

    async fn create(params: &Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value, ToolError> {
        let filename = require_str(NAME, params, "filename")?;
        let path = Self::resolve(ctx, filename);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.context("Failed to create parent directory")?;
        }

        let content = Self::optional_str(params, "content").unwrap_or("");
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to create {}", filename))?;

        Ok(json!(format!("Created {}", filename)))
    }

    async fn write(
        params: &Map<String, Value>,
        ctx: &ToolContext<'_>,
        append: bool,
    ) -> Result<Value, ToolError> {
        let filename = require_str(NAME, params, "filename")?;
        let content = Self::optional_str(params, "content")
            .ok_or_else(|| ToolError::invalid_params(NAME, "missing 'content'"))?;
        let path = Self::resolve(ctx, filename);

        if append {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("Failed to open {}", filename))?;
            file.write_all(content.as_bytes())
                .await
                .context("Failed to append to file")?;
            file.write_all(b"\n").await.context("Failed to append to file")?;
            Ok(json!(format!("Appended to {}", filename)))
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.context("Failed to create parent directory")?;
            }
            fs::write(&path, format!("{}\n", content))
                .await
                .with_context(|| format!("Failed to write {}", filename))?;
            Ok(json!(format!("Successfully wrote to {}", filename)))
        }
    }

    async fn read(params: &Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value, ToolError> {
        let filename = require_str(NAME, params, "filename")?;
        let path = Self::resolve(ctx, filename);

        if !path.exists() {
            return Err(ToolError::Failed(anyhow::anyhow!("File not found: {}", filename)));
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", filename))?;
        Ok(Value::String(content))
    }

    async fn delete(params: &Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value, ToolError> {
        let filename = require_str(NAME, params, "filename")?;
        let force = params.get("force").and_then(Value::as_bool).unwrap_or(false);
        let path = Self::resolve(ctx, filename);

        if !path.exists() {
            if force {
                return Ok(json!(format!("{} did not exist", filename)));
            }
            return Err(ToolError::Failed(anyhow::anyhow!("File not found: {}", filename)));
        }

        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete {}", filename))?;
        Ok(json!(format!("Deleted {}", filename)))
    }

    async fn list(params: &Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value, ToolError> {
        let directory = Self::optional_str(params, "directory").unwrap_or(".");
        let path = Self::resolve(ctx, directory);

        let mut entries = fs::read_dir(&path)
            .await
            .with_context(|| format!("Failed to list {}", directory))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        Ok(Value::String(names.join("\n")))
    }

    /// Paths under `directory` whose file name contains `search_term`, case-insensitively
    async fn search(params: &Map<String, Value>, ctx: &ToolContext<'_>) -> Result<Value, ToolError> {
        let term = require_str(NAME, params, "search_term")?.to_lowercase();
        let directory = Self::optional_str(params, "directory").unwrap_or(".");
        let root = Self::resolve(ctx, directory);

        if !root.is_dir() {
            return Err(ToolError::Failed(anyhow::anyhow!(
                "Directory not found: {}",
                directory
            )));
        }

        let matches = tokio::task::spawn_blocking(move || {
            let walker = WalkBuilder::new(&root)
                .hidden(false)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .build();

            let mut matches = Vec::new();
            for entry in walker.filter_map(|e| e.ok()) {
                if entry.depth() == 0 {
                    continue;
                }
                if entry.file_name().to_string_lossy().to_lowercase().contains(&term) {
                    let path = entry.path();
                    let shown = path.strip_prefix(&root).unwrap_or(path);
                    matches.push(shown.display().to_string());
                }
            }
            matches.sort();
            matches
        })
        .await
        .context("File search task failed")?;

        Ok(Value::String(matches.join("\n")))
    }
}

#[async_trait]
impl DispatcherTool for FileTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Creates, writes, appends, reads, deletes, lists and searches files relative to the working directory."
    }

    fn actions(&self) -> &[&'static str] {
        &["create", "write", "append", "read", "delete", "list", "search"]
    }

    async fn dispatch(
        &self,
        action: &str,
        args: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        let result = match action {
            "create" => Self::create(&args, ctx).await,
            "write" => Self::write(&args, ctx, false).await,
            "append" => Self::write(&args, ctx, true).await,
            "read" => Self::read(&args, ctx).await,
            "delete" => Self::delete(&args, ctx).await,
            "list" => Self::list(&args, ctx).await,
            "search" => Self::search(&args, ctx).await,
            other => Err(ToolError::UnknownAction {
                tool: NAME.to_string(),
                action: other.to_string(),
            }),
        };

        result.map_err(|e| match e {
            ToolError::Failed(e) => ToolError::classified(ErrorCategory::FileOperation, e),
            other => other,
        })
    }
}
