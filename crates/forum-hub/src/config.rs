//! Hub configuration

use std::time::Duration;

/// What happens when an identity that is already online registers again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateLoginPolicy {
    /// Evict the previous connection; the new one takes over the identity
    #[default]
    ReplaceExisting,
    /// Refuse the new connection while the identity is online
    RejectNew,
}

impl std::str::FromStr for DuplicateLoginPolicy {
    type Err = HubConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" | "replace_existing" => Ok(Self::ReplaceExisting),
            "reject" | "reject_new" => Ok(Self::RejectNew),
            other => Err(HubConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Pending frames per connection before the consumer is considered dead
    pub outbound_queue_capacity: usize,
    /// Deadline for persisting one message, independent of any request
    pub persist_timeout: Duration,
    /// Deadline for the recency lookup behind a presence view
    pub sort_timeout: Duration,
    /// Largest inbound text frame accepted, in bytes
    pub max_message_size: usize,
    /// Duplicate login handling
    pub duplicate_login: DuplicateLoginPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: 256,
            persist_timeout: Duration::from_secs(3),
            sort_timeout: Duration::from_secs(2),
            max_message_size: 64 * 1024, // 64KB
            duplicate_login: DuplicateLoginPolicy::default(),
        }
    }
}

impl HubConfig {
    /// Create a builder for constructing a validated `HubConfig`
    pub fn builder() -> HubConfigBuilder {
        HubConfigBuilder::new()
    }
}

/// Errors that can occur when building a `HubConfig`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubConfigError {
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid duplicate login policy '{0}', expected replace/reject")]
    InvalidPolicy(String),
}

/// Validated builder for `HubConfig`
///
/// Unset fields fall back to [`HubConfig::default`].
#[derive(Debug, Clone, Default)]
pub struct HubConfigBuilder {
    outbound_queue_capacity: Option<usize>,
    persist_timeout: Option<Duration>,
    sort_timeout: Option<Duration>,
    max_message_size: Option<usize>,
    duplicate_login: Option<DuplicateLoginPolicy>,
}

const MAX_TIMEOUT: Duration = Duration::from_secs(60);

fn check_timeout(name: &str, timeout: Duration) -> Result<Duration, HubConfigError> {
    if timeout.is_zero() {
        return Err(HubConfigError::InvalidTimeout(format!(
            "{name} must be greater than 0"
        )));
    }
    if timeout > MAX_TIMEOUT {
        return Err(HubConfigError::InvalidTimeout(format!(
            "{name} cannot exceed 60 seconds"
        )));
    }
    Ok(timeout)
}

impl HubConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outbound queue capacity (must be between 1 and 65,536)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Result<Self, HubConfigError> {
        if capacity == 0 {
            return Err(HubConfigError::InvalidSize(
                "outbound_queue_capacity must be at least 1".to_string(),
            ));
        }
        if capacity > 65_536 {
            return Err(HubConfigError::InvalidSize(
                "outbound_queue_capacity cannot exceed 65,536".to_string(),
            ));
        }
        self.outbound_queue_capacity = Some(capacity);
        Ok(self)
    }

    /// Set the persistence deadline (must be between 1ms and 60s)
    pub fn persist_timeout(mut self, timeout: Duration) -> Result<Self, HubConfigError> {
        self.persist_timeout = Some(check_timeout("persist_timeout", timeout)?);
        Ok(self)
    }

    /// Set the recency lookup deadline (must be between 1ms and 60s)
    pub fn sort_timeout(mut self, timeout: Duration) -> Result<Self, HubConfigError> {
        self.sort_timeout = Some(check_timeout("sort_timeout", timeout)?);
        Ok(self)
    }

    /// Set the maximum inbound frame size (must be between 1KB and 16MB)
    pub fn max_message_size(mut self, size: usize) -> Result<Self, HubConfigError> {
        if size < 1024 {
            return Err(HubConfigError::InvalidSize(
                "max_message_size must be at least 1KB (1024 bytes)".to_string(),
            ));
        }
        if size > 16 * 1024 * 1024 {
            return Err(HubConfigError::InvalidSize(
                "max_message_size cannot exceed 16MB (16,777,216 bytes)".to_string(),
            ));
        }
        self.max_message_size = Some(size);
        Ok(self)
    }

    pub fn duplicate_login(mut self, policy: DuplicateLoginPolicy) -> Self {
        self.duplicate_login = Some(policy);
        self
    }

    /// Build the `HubConfig` (uses defaults for unset fields)
    pub fn build(self) -> HubConfig {
        let defaults = HubConfig::default();

        HubConfig {
            outbound_queue_capacity: self
                .outbound_queue_capacity
                .unwrap_or(defaults.outbound_queue_capacity),
            persist_timeout: self.persist_timeout.unwrap_or(defaults.persist_timeout),
            sort_timeout: self.sort_timeout.unwrap_or(defaults.sort_timeout),
            max_message_size: self.max_message_size.unwrap_or(defaults.max_message_size),
            duplicate_login: self.duplicate_login.unwrap_or(defaults.duplicate_login),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.persist_timeout, Duration::from_secs(3));
        assert_eq!(config.sort_timeout, Duration::from_secs(2));
        assert_eq!(config.max_message_size, 64 * 1024);
        assert_eq!(config.duplicate_login, DuplicateLoginPolicy::ReplaceExisting);
    }

    #[test]
    fn test_builder_uses_defaults_for_unset_fields() {
        let config = HubConfig::builder()
            .outbound_queue_capacity(8)
            .unwrap()
            .duplicate_login(DuplicateLoginPolicy::RejectNew)
            .build();

        assert_eq!(config.outbound_queue_capacity, 8);
        assert_eq!(config.duplicate_login, DuplicateLoginPolicy::RejectNew);
        assert_eq!(config.persist_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_builder_rejects_out_of_range_values() {
        assert!(HubConfig::builder().outbound_queue_capacity(0).is_err());
        assert!(HubConfig::builder().outbound_queue_capacity(70_000).is_err());
        assert!(HubConfig::builder().persist_timeout(Duration::ZERO).is_err());
        assert!(
            HubConfig::builder()
                .sort_timeout(Duration::from_secs(61))
                .is_err()
        );
        assert!(HubConfig::builder().max_message_size(10).is_err());
        assert!(
            HubConfig::builder()
                .max_message_size(32 * 1024 * 1024)
                .is_err()
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "replace".parse::<DuplicateLoginPolicy>().unwrap(),
            DuplicateLoginPolicy::ReplaceExisting
        );
        assert_eq!(
            "REJECT".parse::<DuplicateLoginPolicy>().unwrap(),
            DuplicateLoginPolicy::RejectNew
        );
        assert!(matches!(
            "kick".parse::<DuplicateLoginPolicy>(),
            Err(HubConfigError::InvalidPolicy(_))
        ));
    }
}
