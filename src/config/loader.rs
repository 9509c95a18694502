use std::path::Path;
use thiserror::Error;
use tokio::fs;

use crate::config::models::ConfigDocument;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// On-disk encoding of a configuration document, picked from the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// Parse a document from text in the given format.
pub fn parse_document(content: &str, format: DocumentFormat) -> ConfigResult<ConfigDocument> {
    let doc = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    };
    Ok(doc)
}

pub async fn load_document<P: AsRef<Path>>(path: P) -> ConfigResult<ConfigDocument> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await?;
    let doc = parse_document(&content, DocumentFormat::from_path(path))?;
    tracing::debug!(
        path = %path.display(),
        domains = doc.domains.len(),
        handlers = doc.handlers.len(),
        "Loaded configuration document"
    );
    Ok(doc)
}

/// Write the document as pretty-printed JSON.
pub async fn save_document<P: AsRef<Path>>(path: P, doc: &ConfigDocument) -> ConfigResult<()> {
    let content = serde_json::to_string_pretty(doc)?;
    fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::Domain;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_json_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"general": {"enabled": true, "http_port": 8080},
                "domains": [{"id": "d1", "fromDomain": "example.com", "enabled": "true"}]}"#,
        )
        .await
        .expect("Failed to write config");

        let doc = load_document(&path).await.expect("Failed to load document");
        assert!(doc.general.enabled);
        assert_eq!(doc.general.http_port.port(), Some(8080));
        assert_eq!(doc.domains[0].host, "example.com");
    }

    #[tokio::test]
    async fn test_load_yaml_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.yml");
        fs::write(
            &path,
            "general:\n  enabled: true\ndomains:\n  - id: d1\n    fromDomain: example.com\n    enabled: true\n",
        )
        .await
        .expect("Failed to write config");

        let doc = load_document(&path).await.expect("Failed to load document");
        assert_eq!(doc.domains.len(), 1);
        assert!(doc.domains[0].enabled);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.json");
        let doc = ConfigDocument::builder()
            .domain(Domain::new("d1", "example.com"))
            .build();

        save_document(&path, &doc).await.expect("Failed to save document");
        let loaded = load_document(&path).await.expect("Failed to load document");
        assert_eq!(loaded.domains[0].id, "d1");
        assert_eq!(loaded.domains[0].host, "example.com");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = load_document(temp_dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let result = parse_document("{not json", DocumentFormat::Json);
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.YAML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("config")), DocumentFormat::Json);
    }
}
