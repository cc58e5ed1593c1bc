//! S3 backend. A container maps to a bucket.

use object_store::ObjectStore;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::path::Path;
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{S3ConfigSnafu, StorageError};

use super::{BackendConfig, StorageProvider, no_retry_config};

/// Bucket resolved from a container URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Region taken from path- or virtual-style HTTPS URLs.
    pub region: Option<String>,
    pub bucket: String,
    pub key: Option<Path>,
}

impl StorageProvider {
    /// Build an S3 store for one bucket.
    ///
    /// Storage options are applied after the URL region, so an explicit
    /// `aws_region` wins. An `aws_endpoint` option switches to path-style
    /// requests for S3-compatible services.
    pub(super) fn construct_s3(
        config: S3Config,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_retry(no_retry_config());

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }

        let mut endpoint = None;
        for (key, value) in options {
            let key: AmazonS3ConfigKey = key.parse().context(S3ConfigSnafu)?;
            if key == AmazonS3ConfigKey::Endpoint {
                endpoint = Some(value.trim_end_matches('/').to_string());
            }
            builder = builder.with_config(key, value.clone());
        }

        if endpoint.is_some() {
            builder = builder.with_virtual_hosted_style_request(false);
        }

        let canonical_url = match (&endpoint, &config.region) {
            (Some(endpoint), _) => format!("{endpoint}/{}", config.bucket),
            (None, Some(region)) => format!("https://s3.{region}.amazonaws.com/{}", config.bucket),
            (None, None) => format!("s3://{}", config.bucket),
        };

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(builder.build().context(S3ConfigSnafu)?);

        Ok(Self {
            config: BackendConfig::S3(config),
            object_store,
            canonical_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_config(region: Option<&str>) -> S3Config {
        S3Config {
            region: region.map(str::to_string),
            bucket: "processed".to_string(),
            key: None,
        }
    }

    #[test]
    fn test_endpoint_comes_from_options() {
        let options = HashMap::from([
            ("aws_endpoint".to_string(), "http://localhost:9000/".to_string()),
            ("aws_region".to_string(), "us-east-1".to_string()),
            ("aws_allow_http".to_string(), "true".to_string()),
        ]);

        let provider = StorageProvider::construct_s3(bucket_config(None), &options).unwrap();
        assert_eq!(provider.canonical_url(), "http://localhost:9000/processed");
    }

    #[test]
    fn test_region_from_url_without_options() {
        let provider =
            StorageProvider::construct_s3(bucket_config(Some("eu-west-1")), &HashMap::new())
                .unwrap();
        assert_eq!(
            provider.canonical_url(),
            "https://s3.eu-west-1.amazonaws.com/processed"
        );
    }

    #[test]
    fn test_unknown_option_rejected() {
        let options = HashMap::from([("not_an_s3_key".to_string(), "x".to_string())]);
        let result = StorageProvider::construct_s3(bucket_config(None), &options);
        assert!(matches!(result, Err(StorageError::S3Config { .. })));
    }
}
