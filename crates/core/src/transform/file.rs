//! Transforms loaded from a directory of stylesheets and executables.
//!
//! - `*.xsl` / `*.xslt` files are applied with the configured XSLT processor,
//!   invoked as `<xslt_command> <stylesheet> -`.
//! - Any other file must be executable and is run directly.
//!
//! In both cases the feed is piped to stdin and stdout is the result.

use super::{Transform, TransformProvider};
use crate::Error;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Transform provider resolving names to files in a directory.
#[derive(Debug, Clone)]
pub struct FileTransforms {
    path: PathBuf,
    xslt_command: String,
}

impl FileTransforms {
    /// Creates a provider loading transform files from `path`.
    pub fn new(path: impl Into<PathBuf>, xslt_command: impl Into<String>) -> Self {
        Self { path: path.into(), xslt_command: xslt_command.into() }
    }

    fn resolve_path(&self, name: &str) -> Result<PathBuf, Error> {
        let unresolvable = |reason: &str| Error::TransformResolution { name: name.to_string(), reason: reason.into() };

        if name.is_empty() {
            return Err(unresolvable("empty transform name"));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(unresolvable("transform names must be plain file names"));
        }

        Ok(self.path.join(name))
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xsl") || ext.eq_ignore_ascii_case("xslt"))
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[async_trait]
impl TransformProvider for FileTransforms {
    async fn get(&self, name: &str) -> Result<Box<dyn Transform>, Error> {
        let path = self.resolve_path(name)?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| Error::TransformResolution {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        if !metadata.is_file() {
            return Err(Error::TransformResolution {
                name: name.to_string(),
                reason: format!("{} is not a file", path.display()),
            });
        }

        let transform = if is_stylesheet(&path) {
            CommandTransform::new(name, &self.xslt_command, vec![path.into_os_string(), OsString::from("-")])
        } else if is_executable(&metadata) {
            CommandTransform::new(name, path, Vec::new())
        } else {
            return Err(Error::TransformResolution {
                name: name.to_string(),
                reason: format!("{} is neither a stylesheet nor executable", path.display()),
            });
        };

        tracing::debug!("resolved transform {} -> {:?}", name, transform.program);
        Ok(Box::new(transform))
    }
}

/// A transform that pipes content through an external command.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    name: String,
    program: OsString,
    args: Vec<OsString>,
}

impl CommandTransform {
    pub fn new(name: impl Into<String>, program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self { name: name.into(), program: program.into(), args }
    }

    fn failed(&self, reason: impl Into<String>) -> Error {
        Error::TransformExecution { name: self.name.clone(), reason: reason.into() }
    }
}

#[async_trait]
impl Transform for CommandTransform {
    async fn process(&mut self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failed(format!("failed to start {:?}: {}", self.program, e)))?;

        // Feed stdin concurrently so a command producing output before it has
        // read all of its input cannot deadlock on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_vec();
            tokio::spawn(async move {
                let result = stdin.write_all(&input).await;
                drop(stdin);
                result
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.failed(format!("failed waiting for {:?}: {}", self.program, e)))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // Commands may legitimately stop reading early.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(self.failed(format!("failed writing input: {e}"))),
                Err(e) => return Err(self.failed(format!("input writer failed: {e}"))),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failed(format!("{} ({})", output.status, stderr.trim())));
        }

        Ok(output.stdout)
    }
}
