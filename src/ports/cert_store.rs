use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CertError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Names must be a plain file name
    #[error("Invalid certificate file name: {0}")]
    InvalidName(String),

    #[error("Certificate file not found: {0}")]
    NotFound(String),
}

pub type CertResult<T> = Result<T, CertError>;

pub type CertFuture<'a, T> = Pin<Box<dyn Future<Output = CertResult<T>> + Send + 'a>>;

/// Storage for certificate, key and CA files referenced by the compiled output
pub trait CertificateStore: Send + Sync + 'static {
    /// File names, sorted
    fn list<'a>(&'a self) -> CertFuture<'a, Vec<String>>;

    fn save<'a>(&'a self, name: &'a str, contents: &'a [u8]) -> CertFuture<'a, ()>;

    fn delete<'a>(&'a self, name: &'a str) -> CertFuture<'a, ()>;
}

/// Check that `name` is a plain file name and return it.
pub fn validate_cert_name(name: &str) -> CertResult<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        Err(CertError::InvalidName(name.to_string()))
    } else {
        Ok(name)
    }
}
