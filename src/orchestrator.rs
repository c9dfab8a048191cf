//! The build request pipeline.

use std::sync::Arc;

use uuid::Uuid;

use crate::compiler::Compiler;
use crate::errors::BuildError;
use crate::ident;
use crate::registry::{ClientRecord, ClientRegistry};
use crate::target::BuildTarget;
use crate::workspace::Workspace;

/// A finished build, ready to hand to the caller as a download.
///
/// `bytes` holds the whole artifact; it is read out of the workspace before
/// the workspace is released, since nothing in the workspace survives the
/// request.
#[derive(Debug)]
pub struct BuiltArtifact {
    pub request_id: Uuid,
    pub target: BuildTarget,
    /// `{platform}-{request_id}` plus the platform extension, the name the
    /// download is served under.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Sequences one build request: validate, issue an identifier, record it,
/// stage a workspace, compile, collect the artifact.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ClientRegistry>,
    compiler: Arc<dyn Compiler>,
}

impl Orchestrator {
    pub fn new(registry: Arc<ClientRegistry>, compiler: Arc<dyn Compiler>) -> Self {
        Self { registry, compiler }
    }

    /// Run one build request end to end.
    ///
    /// An unrecognized selector fails before any side effect: no identifier
    /// is drawn, nothing is appended to the registry, no workspace is
    /// created. Once validation passes, the registry record is written
    /// before compilation starts, so every served artifact has a record even
    /// if delivery to the caller later fails. The workspace is released on
    /// every path out of this function.
    pub async fn handle_build_request(
        &self,
        raw_target: &str,
    ) -> Result<BuiltArtifact, BuildError> {
        let target: BuildTarget = raw_target.parse()?;

        let request_id = ident::generate()?;
        self.registry
            .append(&ClientRecord::new(request_id, target))
            .await?;
        tracing::info!(%request_id, platform = %target, "recorded build request");

        let workspace = Workspace::acquire()?;
        let artifact_path = self.compiler.compile(workspace.path(), target).await?;

        let bytes = tokio::fs::read(&artifact_path)
            .await
            .map_err(|source| BuildError::ArtifactRead {
                path: artifact_path.clone(),
                source,
            })?;

        let filename = format!("{target}-{request_id}{}", target.artifact_extension());
        tracing::info!(%request_id, %filename, size = bytes.len(), "build complete");

        Ok(BuiltArtifact {
            request_id,
            target,
            filename,
            bytes,
        })
    }
}
