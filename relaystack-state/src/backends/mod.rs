//! Backend implementations for state storage

mod local;
mod s3;

pub use local::LocalBackend;
pub use s3::S3Backend;

use crate::backend::{BackendConfig, BackendError, BackendResult, StateBackend};

/// Create a backend from configuration
///
/// Dispatches to the appropriate backend implementation based on the
/// backend_type in the configuration.
pub async fn create_backend(config: &BackendConfig) -> BackendResult<Box<dyn StateBackend>> {
    match config.backend_type.as_str() {
        "local" => {
            let backend = LocalBackend::from_config(config)?;
            Ok(Box::new(backend))
        }
        "s3" => {
            let backend = S3Backend::from_config(config).await?;
            Ok(Box::new(backend))
        }
        other => Err(BackendError::unsupported_backend(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_backend() {
        let config = BackendConfig {
            backend_type: "azure".to_string(),
            attributes: Default::default(),
        };

        let result = create_backend(&config).await;
        match result {
            Err(BackendError::UnsupportedBackend(name)) => assert_eq!(name, "azure"),
            other => panic!("Expected UnsupportedBackend error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn local_backend_dispatch() {
        let config = BackendConfig {
            backend_type: "local".to_string(),
            attributes: Default::default(),
        };

        assert!(create_backend(&config).await.is_ok());
    }
}
