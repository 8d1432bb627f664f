//! Storage gateway factory.

use std::sync::Arc;

use medley_core::config::{Config, StorageBackendKind};

use crate::memory::InMemoryGateway;
use crate::s3::S3Gateway;
use crate::traits::{StorageError, StorageGateway, StorageResult};

/// Construct the storage gateway selected by configuration.
pub fn create_storage_gateway(config: &Config) -> StorageResult<Arc<dyn StorageGateway>> {
    match config.storage_backend {
        StorageBackendKind::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3 bucket not configured".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3 region not configured".to_string()))?;
            let gateway = S3Gateway::new(bucket, region, config.s3_endpoint.clone())?;
            Ok(Arc::new(gateway))
        }
        StorageBackendKind::Memory => Ok(Arc::new(InMemoryGateway::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_selected_by_default() {
        let gateway = create_storage_gateway(&Config::default()).unwrap();
        assert_eq!(gateway.provider(), "memory");
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let config = Config {
            storage_backend: StorageBackendKind::S3,
            s3_region: Some("us-east-1".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            create_storage_gateway(&config),
            Err(StorageError::ConfigError(_))
        ));
    }
}
