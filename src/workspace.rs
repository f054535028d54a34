//! Per-invocation workspace on disk.
//!
//! Each invocation owns a private directory named by the hex SHA-256 of its
//! raw id. The raw id itself is only ever handed to the sandbox helper, which
//! must hash it to locate the workspace; a helper cannot derive directory
//! names it was not given.

use crate::error::{Error, Result};
use crate::protocol::InvocationRequest;
use rand::Rng;
use serde_bytes::ByteBuf;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

const RAW_ID_SIZE: usize = 16;

/// A created workspace holding the four input files.
pub struct Workspace {
    raw_id: String,
    path: PathBuf,
}

impl Workspace {
    /// Creates `<root>/<workspace_id>` and writes `code`, `input`,
    /// `arguments` and `options` into it. Fails if the directory already
    /// exists. If population fails part-way, the directory is removed before
    /// the error is returned.
    pub async fn create(root: &Path, request: &InvocationRequest) -> Result<Workspace> {
        let (raw_id, workspace_id) = generate_ids();
        let path = root.join(&workspace_id);
        let mut dir = tokio::fs::DirBuilder::new();
        dir.mode(0o755);
        dir.create(&path).await.map_err(Error::Workspace)?;

        let workspace = Workspace { raw_id, path };
        if let Err(e) = workspace.write_inputs(request).await {
            workspace.remove().await;
            return Err(Error::Workspace(e));
        }
        Ok(workspace)
    }

    /// The capability handed to the sandbox helper.
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_inputs(&self, request: &InvocationRequest) -> std::io::Result<()> {
        tokio::fs::write(self.path.join("code"), &request.code).await?;
        tokio::fs::write(self.path.join("input"), &request.input).await?;
        tokio::fs::write(self.path.join("arguments"), null_join(&request.arguments)).await?;
        tokio::fs::write(self.path.join("options"), null_join(&request.options)).await?;
        Ok(())
    }

    /// Recursively removes the workspace. Removal failures are logged and
    /// swallowed; they must not change the invocation outcome.
    pub async fn remove(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
        }
    }
}

/// 128 bits of randomness, hex-encoded, plus the hex SHA-256 of that hex
/// string. The former addresses the workspace for the helper, the latter
/// names the directory.
fn generate_ids() -> (String, String) {
    let raw: [u8; RAW_ID_SIZE] = rand::thread_rng().gen();
    let raw_id = hex::encode(raw);
    let workspace_id = hex::encode(Sha256::digest(raw_id.as_bytes()));
    (raw_id, workspace_id)
}

/// Concatenates the elements, each followed by a single NUL byte.
fn null_join(args: &[ByteBuf]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(args.iter().map(|a| a.len() + 1).sum());
    for arg in args {
        buf.extend_from_slice(arg);
        buf.push(0);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> InvocationRequest {
        InvocationRequest {
            language: "python".to_string(),
            code: ByteBuf::from(&b"print(1+1)\n"[..]),
            input: ByteBuf::from(&b"stdin here"[..]),
            arguments: vec![ByteBuf::from(&b"a"[..]), ByteBuf::from(&b"bc"[..])],
            options: vec![ByteBuf::from(&b"-x"[..])],
            timeout: 10,
        }
    }

    #[test]
    fn ids_have_the_documented_shape() {
        let (raw_id, workspace_id) = generate_ids();
        assert_eq!(raw_id.len(), RAW_ID_SIZE * 2);
        assert_eq!(workspace_id.len(), 64);
        assert_eq!(workspace_id, hex::encode(Sha256::digest(raw_id.as_bytes())));
    }

    #[test]
    fn ids_are_unique() {
        let (a, _) = generate_ids();
        let (b, _) = generate_ids();
        assert_ne!(a, b);
    }

    #[test]
    fn null_join_terminates_every_element() {
        let args = vec![ByteBuf::from(&b"a"[..]), ByteBuf::from(&b"bc"[..])];
        assert_eq!(null_join(&args), b"a\0bc\0");
        assert_eq!(null_join(&[]), b"");
    }

    #[tokio::test]
    async fn create_writes_the_four_input_files() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(root.path(), &request()).await.unwrap();

        assert_eq!(workspace.path().parent().unwrap(), root.path());
        let read = |name: &'static str| std::fs::read(workspace.path().join(name)).unwrap();
        assert_eq!(read("code"), b"print(1+1)\n");
        assert_eq!(read("input"), b"stdin here");
        assert_eq!(read("arguments"), b"a\0bc\0");
        assert_eq!(read("options"), b"-x\0");

        workspace.remove().await;
        assert!(!workspace.path().exists());
    }

    #[tokio::test]
    async fn concurrent_workspaces_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::create(root.path(), &request()).await.unwrap();
        let b = Workspace::create(root.path(), &request()).await.unwrap();
        assert_ne!(a.path(), b.path());
        a.remove().await;
        b.remove().await;
    }

    #[tokio::test]
    async fn create_fails_when_the_root_is_missing() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nonexistent");
        assert!(Workspace::create(&missing, &request()).await.is_err());
    }
}
