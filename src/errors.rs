//! Typed errors for the build-orchestration path.
//!
//! One enum covers the whole request pipeline; each variant names the stage
//! that produced it, so the HTTP layer can map caller errors to 400 and
//! everything else to 500 without inspecting strings.

use std::path::PathBuf;

use thiserror::Error;

use crate::target::BuildTarget;

/// Errors from a single build request, tagged by originating stage.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The requested platform selector is not in the supported set. Raised
    /// during validation, before any side effect occurs.
    #[error("unsupported target platform '{0}'")]
    InvalidTarget(String),

    /// The OS entropy source could not supply the 16 bytes behind a request
    /// identifier.
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(#[source] getrandom::Error),

    #[error("failed to append to client registry at {path}: {source}")]
    RegistryAppend {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read client registry at {path}: {source}")]
    RegistryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to allocate build workspace: {0}")]
    WorkspaceAllocate(#[source] std::io::Error),

    #[error("failed to stage build source at {path}: {source}")]
    SourceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The toolchain subprocess could not be launched at all.
    #[error("failed to launch build toolchain '{toolchain}': {source}")]
    ToolchainLaunch {
        toolchain: String,
        #[source]
        source: std::io::Error,
    },

    /// The toolchain ran and exited non-zero; `diagnostic` carries its
    /// stderr output. Never retried.
    #[error("cross-compilation for '{target}' failed: {diagnostic}")]
    CompileFailed {
        target: BuildTarget,
        diagnostic: String,
    },

    #[error("failed to read built artifact at {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// True when the failure is the caller's fault rather than a
    /// server-side one.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, BuildError::InvalidTarget(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_target_carries_selector() {
        let err = BuildError::InvalidTarget("amiga".to_string());
        assert!(err.is_caller_error());
        assert!(err.to_string().contains("amiga"));
    }

    #[test]
    fn compile_failed_carries_diagnostic() {
        let err = BuildError::CompileFailed {
            target: BuildTarget::Linux,
            diagnostic: "undefined: fmt.Pritnln".to_string(),
        };
        assert!(!err.is_caller_error());
        match &err {
            BuildError::CompileFailed { target, diagnostic } => {
                assert_eq!(*target, BuildTarget::Linux);
                assert!(diagnostic.contains("Pritnln"));
            }
            _ => panic!("Expected CompileFailed variant"),
        }
        assert!(err.to_string().contains("linux"));
    }

    #[test]
    fn toolchain_launch_preserves_io_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "go not found");
        let err = BuildError::ToolchainLaunch {
            toolchain: "go".to_string(),
            source: io_err,
        };
        match &err {
            BuildError::ToolchainLaunch { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected ToolchainLaunch variant"),
        }
    }

    #[test]
    fn registry_append_carries_path() {
        let err = BuildError::RegistryAppend {
            path: PathBuf::from("/var/lib/smelter/clients.jsonl"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("clients.jsonl"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn all_variants_implement_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BuildError::InvalidTarget("x".into()));
        assert_std_error(&BuildError::WorkspaceAllocate(std::io::Error::other("x")));
    }
}
