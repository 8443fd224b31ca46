//! Filesystem-rooted transport
//!
//! A local directory stands in for the remote root: `/in/orders.xml` on the server maps
//! to `<root>/in/orders.xml`.

use super::traits::{Transport, TransportResult, TransportSession};
use crate::config::ServerConfig;
use crate::domain::directory::join_remote;
use crate::domain::TransportError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Transport for `protocol = "local"` servers
#[derive(Debug, Default, Clone)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn connect(&self, server: &ServerConfig) -> TransportResult<Box<dyn TransportSession>> {
        let root = server
            .root
            .as_deref()
            .ok_or_else(|| TransportError::ConnectionFailed {
                host: server.id.to_string(),
                message: "no root directory configured".to_string(),
            })?;
        let root = PathBuf::from(root);

        match tokio::fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(TransportError::ConnectionFailed {
                    host: root.display().to_string(),
                    message: "root is not a directory".to_string(),
                })
            }
            Err(e) => {
                return Err(TransportError::ConnectionFailed {
                    host: root.display().to_string(),
                    message: e.to_string(),
                })
            }
        }

        tracing::debug!(server = %server.id, root = %root.display(), "Local session opened");
        Ok(Box::new(LocalSession { root }))
    }
}

/// Session over a local root directory
#[derive(Debug)]
pub struct LocalSession {
    root: PathBuf,
}

impl LocalSession {
    fn resolve(&self, remote: &str) -> TransportResult<PathBuf> {
        let relative = Path::new(remote.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(TransportError::NotFound(remote.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl TransportSession for LocalSession {
    async fn list_directories(&mut self, path: &str) -> TransportResult<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![path.to_string()];

        while let Some(remote) = pending.pop() {
            let local = self.resolve(&remote)?;
            let mut entries =
                tokio::fs::read_dir(&local)
                    .await
                    .map_err(|e| TransportError::ListFailed {
                        path: remote.clone(),
                        message: e.to_string(),
                    })?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                TransportError::ListFailed {
                    path: remote.clone(),
                    message: e.to_string(),
                }
            })? {
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    let child = join_remote(&remote, &entry.file_name().to_string_lossy());
                    found.push(child.clone());
                    pending.push(child);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    async fn list_files(&mut self, path: &str) -> TransportResult<Vec<String>> {
        let local = self.resolve(path)?;
        let mut entries = tokio::fs::read_dir(&local)
            .await
            .map_err(|e| TransportError::ListFailed {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TransportError::ListFailed {
                path: path.to_string(),
                message: e.to_string(),
            })?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn download(&mut self, remote_path: &str) -> TransportResult<Vec<u8>> {
        let local = self.resolve(remote_path)?;
        tokio::fs::read(&local).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TransportError::NotFound(remote_path.to_string()),
            _ => TransportError::DownloadFailed {
                path: remote_path.to_string(),
                message: e.to_string(),
            },
        })
    }

    async fn upload(&mut self, data: &[u8], remote_path: &str) -> TransportResult<()> {
        let local = self.resolve(remote_path)?;
        tokio::fs::write(&local, data)
            .await
            .map_err(|e| TransportError::UploadFailed {
                path: remote_path.to_string(),
                message: e.to_string(),
            })
    }

    async fn make_dir(&mut self, path: &str) -> TransportResult<()> {
        let local = self.resolve(path)?;
        tokio::fs::create_dir_all(&local)
            .await
            .map_err(|e| TransportError::UploadFailed {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    async fn disconnect(self: Box<Self>) -> TransportResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use crate::domain::ServerId;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn server(root: &Path) -> ServerConfig {
        ServerConfig {
            id: ServerId::from_str("local").unwrap(),
            protocol: Protocol::Local,
            host: String::new(),
            port: None,
            username: None,
            password: None,
            private_key_path: None,
            root: Some(root.to_string_lossy().to_string()),
            directories: vec![],
        }
    }

    #[tokio::test]
    async fn test_connect_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let result = LocalTransport::new()
            .connect(&server(&dir.path().join("missing")))
            .await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_upload_list_download() {
        let dir = TempDir::new().unwrap();
        let mut session = LocalTransport::new().connect(&server(dir.path())).await.unwrap();

        session.make_dir("/out/archive").await.unwrap();
        session.upload(b"<a/>", "/out/a.xml").await.unwrap();

        assert_eq!(session.list_files("/out").await.unwrap(), vec!["a.xml"]);
        assert_eq!(
            session.list_directories("/").await.unwrap(),
            vec!["/out", "/out/archive"]
        );
        assert_eq!(session.download("/out/a.xml").await.unwrap(), b"<a/>".to_vec());
        assert!(matches!(
            session.download("/out/missing.xml").await,
            Err(TransportError::NotFound(_))
        ));
        session.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let mut session = LocalTransport::new().connect(&server(dir.path())).await.unwrap();
        assert!(session.download("/../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let mut session = LocalTransport::new().connect(&server(dir.path())).await.unwrap();
        assert!(matches!(
            session.upload(b"x", "/nowhere/a.xml").await,
            Err(TransportError::UploadFailed { .. })
        ));
    }
}
