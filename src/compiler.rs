//! Cross-compilation of the client program.
//!
//! The real implementation shells out to the Go toolchain with `GOOS`/`GOARCH`
//! set for the requested target. The `Compiler` trait exists so the
//! orchestrator can be exercised against a stub without spawning processes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::BuildError;
use crate::target::BuildTarget;

/// The client program staged into every workspace before compilation.
pub const CLIENT_SOURCE: &str = r#"package main

import (
	"fmt"
	"os"
)

func main() {
	hostname, err := os.Hostname()
	if err != nil {
		hostname = "unknown"
	}
	fmt.Printf("smelter client reporting from %s\n", hostname)
}
"#;

/// Name the source program is staged under inside the workspace.
pub const SOURCE_FILE: &str = "client.go";

/// Produces a platform-specific executable inside a build workspace.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile the client program for `target`, returning the absolute path
    /// of the produced artifact inside `workspace`.
    async fn compile(&self, workspace: &Path, target: BuildTarget)
        -> Result<PathBuf, BuildError>;
}

/// The Go toolchain, invoked as a subprocess.
pub struct GoToolchain {
    go_bin: String,
}

impl GoToolchain {
    /// `go_bin` is the binary to invoke, either a bare name resolved via
    /// `PATH` or an absolute path.
    pub fn new(go_bin: impl Into<String>) -> Self {
        Self {
            go_bin: go_bin.into(),
        }
    }
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new("go")
    }
}

#[async_trait]
impl Compiler for GoToolchain {
    async fn compile(
        &self,
        workspace: &Path,
        target: BuildTarget,
    ) -> Result<PathBuf, BuildError> {
        let source_path = workspace.join(SOURCE_FILE);
        tokio::fs::write(&source_path, CLIENT_SOURCE)
            .await
            .map_err(|source| BuildError::SourceWrite {
                path: source_path.clone(),
                source,
            })?;

        let artifact = workspace.join(format!("client{}", target.artifact_extension()));

        tracing::debug!(
            toolchain = %self.go_bin,
            platform = %target,
            os = target.toolchain_os(),
            arch = target.toolchain_arch(),
            "invoking cross-compiler"
        );

        // No wait bound: a hung toolchain holds its request worker until the
        // process exits.
        let output = Command::new(&self.go_bin)
            .arg("build")
            .arg("-o")
            .arg(&artifact)
            .arg(&source_path)
            .current_dir(workspace)
            .env("GOOS", target.toolchain_os())
            .env("GOARCH", target.toolchain_arch())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| BuildError::ToolchainLaunch {
                toolchain: self.go_bin.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = if stderr.trim().is_empty() {
                format!("toolchain exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(BuildError::CompileFailed { target, diagnostic });
        }

        Ok(artifact)
    }
}
