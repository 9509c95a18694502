use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::models::ConfigDocument;
use crate::ports::cert_store::{CertError, CertFuture, CertificateStore, validate_cert_name};
use crate::ports::config_store::{ConfigStore, StoreFuture, StoreResult};

/// File locations derived from one data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub document: PathBuf,
    pub caddyfile: PathBuf,
    pub certs_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            document: dir.join("config.json"),
            caddyfile: dir.join("Caddyfile"),
            certs_dir: dir.join("certs"),
        }
    }
}

/// ConfigStore and CertificateStore backed by plain files
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: DataPaths,
}

impl FileStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    async fn load_document_inner(&self) -> StoreResult<ConfigDocument> {
        match fs::read_to_string(&self.paths.document).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.paths.document.display(), "No stored document, using initial one");
                Ok(ConfigDocument::initial())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_caddyfile_inner(&self) -> StoreResult<String> {
        match fs::read_to_string(&self.paths.caddyfile).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_inner(&self) -> Result<Vec<String>, CertError> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.paths.certs_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn save_cert_inner(&self, name: &str, contents: &[u8]) -> Result<(), CertError> {
        let name = validate_cert_name(name)?;
        fs::create_dir_all(&self.paths.certs_dir).await?;
        write_atomic(&self.paths.certs_dir.join(name), contents).await?;
        tracing::info!(file = %name, "Stored certificate file");
        Ok(())
    }

    async fn delete_cert_inner(&self, name: &str) -> Result<(), CertError> {
        let name = validate_cert_name(name)?;
        match fs::remove_file(self.paths.certs_dir.join(name)).await {
            Ok(()) => {
                tracing::info!(file = %name, "Deleted certificate file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CertError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await
}

impl ConfigStore for FileStore {
    fn load_document<'a>(&'a self) -> StoreFuture<'a, ConfigDocument> {
        Box::pin(self.load_document_inner())
    }

    fn save_document<'a>(&'a self, doc: &'a ConfigDocument) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let content = serde_json::to_vec_pretty(doc)?;
            write_atomic(&self.paths.document, &content).await?;
            Ok(())
        })
    }

    fn read_caddyfile<'a>(&'a self) -> StoreFuture<'a, String> {
        Box::pin(self.read_caddyfile_inner())
    }

    fn write_caddyfile<'a>(&'a self, content: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            write_atomic(&self.paths.caddyfile, content.as_bytes()).await?;
            Ok(())
        })
    }
}

impl CertificateStore for FileStore {
    fn list<'a>(&'a self) -> CertFuture<'a, Vec<String>> {
        Box::pin(self.list_inner())
    }

    fn save<'a>(&'a self, name: &'a str, contents: &'a [u8]) -> CertFuture<'a, ()> {
        Box::pin(self.save_cert_inner(name, contents))
    }

    fn delete<'a>(&'a self, name: &'a str) -> CertFuture<'a, ()> {
        Box::pin(self.delete_cert_inner(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::Domain;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> FileStore {
        FileStore::new(DataPaths::new(temp_dir.path()))
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::new("/srv/caddygen");
        assert_eq!(paths.document, PathBuf::from("/srv/caddygen/config.json"));
        assert_eq!(paths.caddyfile, PathBuf::from("/srv/caddygen/Caddyfile"));
        assert_eq!(paths.certs_dir, PathBuf::from("/srv/caddygen/certs"));
    }

    #[tokio::test]
    async fn test_missing_files_use_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);

        let doc = store.load_document().await.expect("Failed to load document");
        assert_eq!(doc.general.http_port.port(), Some(80));
        assert_eq!(doc.general.https_port.port(), Some(443));
        assert!(doc.domains.is_empty());

        let text = store.read_caddyfile().await.expect("Failed to read Caddyfile");
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_document_and_caddyfile_persist() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        let doc = ConfigDocument::builder()
            .domain(Domain::new("d1", "example.com"))
            .build();

        store.save_document(&doc).await.expect("Failed to save document");
        store
            .write_caddyfile("example.com {\n}\n")
            .await
            .expect("Failed to write Caddyfile");

        let loaded = store.load_document().await.expect("Failed to load document");
        assert_eq!(loaded.domains[0].host, "example.com");
        assert_eq!(
            store.read_caddyfile().await.expect("Failed to read Caddyfile"),
            "example.com {\n}\n"
        );
        assert!(!temp_dir.path().join("Caddyfile.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        fs::write(&store.paths().document, "{broken")
            .await
            .expect("Failed to write document");

        assert!(store.load_document().await.is_err());
    }

    #[tokio::test]
    async fn test_certificate_lifecycle() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);

        assert!(store.list().await.expect("Failed to list").is_empty());

        store.save("b.pem", b"cert").await.expect("Failed to save b.pem");
        store.save("a.key", b"key").await.expect("Failed to save a.key");
        assert_eq!(
            store.list().await.expect("Failed to list"),
            vec!["a.key".to_string(), "b.pem".to_string()]
        );

        store.delete("b.pem").await.expect("Failed to delete b.pem");
        assert!(matches!(store.delete("b.pem").await, Err(CertError::NotFound(_))));
        assert!(matches!(
            store.save("../escape.pem", b"x").await,
            Err(CertError::InvalidName(_))
        ));
        assert!(matches!(store.delete("x/y").await, Err(CertError::InvalidName(_))));
    }
}
