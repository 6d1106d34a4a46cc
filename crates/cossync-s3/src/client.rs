//! Storage client construction.

use std::time::Duration;

use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use cossync_core::{SyncConfig, SyncError, SyncResult};
use http::Uri;
use tracing::info;

/// Credential provider name reported to the SDK.
const PROVIDER_NAME: &str = "cossync";

/// Check that `endpoint` is an absolute `http` or `https` URL.
pub fn validate_endpoint(endpoint: &str) -> SyncResult<Uri> {
    let uri: Uri = endpoint
        .parse()
        .map_err(|e| SyncError::ConnectionSetup(format!("invalid endpoint {endpoint:?}: {e}")))?;
    match (uri.scheme_str(), uri.authority()) {
        (Some("http" | "https"), Some(authority)) if !authority.host().is_empty() => Ok(uri),
        _ => Err(SyncError::ConnectionSetup(format!(
            "endpoint {endpoint:?} must be an absolute http(s) URL"
        ))),
    }
}

/// Build an S3 client from the run configuration.
///
/// No network traffic happens here; a malformed endpoint is the only
/// failure.
pub fn build_client(config: &SyncConfig) -> SyncResult<aws_sdk_s3::Client> {
    let endpoint = config.resolved_endpoint();
    validate_endpoint(&endpoint)?;

    let credentials = Credentials::new(
        config.secret_id.clone(),
        config.secret_key.clone(),
        None,
        None,
        PROVIDER_NAME,
    );
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(timeout)
        .operation_timeout(timeout)
        .build();

    let s3_config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(endpoint.clone())
        .force_path_style(config.path_style)
        .timeout_config(timeout_config)
        .build();

    info!(
        endpoint = %endpoint,
        region = %config.region,
        path_style = config.path_style,
        "configured storage client"
    );

    Ok(aws_sdk_s3::Client::from_conf(s3_config))
}
