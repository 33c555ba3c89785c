//! AWS session setup from the configured profile and region.

use aws_config::{BehaviorVersion, SdkConfig};
use aws_types::region::Region;

use super::config::AwsSettings;

/// Load the shared SDK configuration for `settings`.
///
/// Credentials resolve through the standard provider chain scoped to the
/// named profile; nothing is fetched until the first request.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    log_info!(
        "Creating AWS session for profile '{}' in region '{}'",
        settings.profile,
        settings.region
    );

    aws_config::defaults(BehaviorVersion::latest())
        .profile_name(&settings.profile)
        .region(Region::new(settings.region.clone()))
        .load()
        .await
}
