//! Deployment configuration
//!
//! The original deployment read process environment variables at module load
//! and substituted empty strings for anything missing, which turned a
//! misconfigured deploy into a running-but-nonfunctional service. Here the
//! configuration is an explicit struct: the recognized inputs are enumerated,
//! `from_env` reads exactly those keys (empty-string fallback preserved), and
//! `validate` reports problems at build time instead.

use thiserror::Error;

use relaystack_core::resource::RemovalPolicy;

use crate::naming;
use crate::types;

/// Recognized process-configuration keys, read once at graph-build time.
pub const ENV_CERT_ARN: &str = "CERT_ARN";
pub const ENV_CLIENT_SIDE_ID_PROD: &str = "LD_CLIENT_SIDE_ID_Prod";
pub const ENV_CLIENT_SIDE_ID_STAGING: &str = "LD_CLIENT_SIDE_ID_Staging";
pub const ENV_LD_ENV_STAGING: &str = "LD_ENV_Staging";
pub const ENV_LD_ENV_PROD: &str = "LD_ENV_Prod";
pub const ENV_LD_PREFIX_STAGING: &str = "LD_PREFIX_Staging";
pub const ENV_LD_PREFIX_PROD: &str = "LD_PREFIX_Prod";

/// Whether the service's load balancer terminates TLS.
///
/// Intent is explicit: an HTTP-only deployment says so, instead of being
/// inferred from an empty certificate identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpsMode {
    Disabled,
    Enabled { certificate_arn: String },
}

/// LaunchDarkly relay settings injected into every replica.
///
/// All values default to the empty string, matching the contract of the
/// relay image: unset environments are tolerated, the relay just serves
/// nothing for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayEnv {
    pub client_side_id_prod: String,
    pub client_side_id_staging: String,
    pub env_prod: String,
    pub env_staging: String,
    pub prefix_prod: String,
    pub prefix_staging: String,
}

impl RelayEnv {
    /// True when no LaunchDarkly environment is wired at all
    pub fn is_empty(&self) -> bool {
        self.env_prod.is_empty()
            && self.env_staging.is_empty()
            && self.client_side_id_prod.is_empty()
            && self.client_side_id_staging.is_empty()
    }
}

/// Everything the topology builder needs, in one explicit struct
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Prefix for generated physical names
    pub stack_name: String,
    pub region: String,
    /// Upper bound on the zones the network spans; the effective count is
    /// capped by what the region actually offers.
    pub max_availability_zones: u32,
    pub https: HttpsMode,
    pub desired_count: u32,
    pub cpu_units: u32,
    pub memory_mib: u32,
    pub container_port: u16,
    pub enable_logging: bool,
    pub redirect_http: bool,
    /// Removal policy for the flag-store table. Defaults to `Destroy`: the
    /// table is a replicated cache rebuildable from the upstream flag
    /// source, and easy teardown wins. Flip to `Retain` before putting
    /// anything authoritative in it: destroy means data loss.
    pub table_removal: RemovalPolicy,
    pub relay: RelayEnv,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            stack_name: "ld-relay".to_string(),
            region: "us-east-1".to_string(),
            max_availability_zones: 3,
            https: HttpsMode::Disabled,
            desired_count: 3,
            cpu_units: 4096,
            memory_mib: 16384,
            container_port: 8030,
            enable_logging: true,
            redirect_http: true,
            table_removal: RemovalPolicy::Destroy,
            relay: RelayEnv::default(),
        }
    }
}

/// Build-time configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid stack name '{0}': lowercase alphanumeric and hyphens, max 40 chars")]
    InvalidStackName(String),

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("max_availability_zones must be at least 1")]
    ZeroAvailabilityZones,

    #[error(
        "HTTPS requested but the certificate ARN is empty; \
         use HttpsMode::Disabled for an intentionally HTTP-only deployment"
    )]
    MissingCertificateArn,

    #[error("certificate ARN '{0}' is not a valid ARN")]
    MalformedCertificateArn(String),

    #[error("desired_count must be at least 1")]
    ZeroReplicas,
}

/// Non-fatal findings surfaced at validate time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No LaunchDarkly environment configured: the service will run but
    /// serve no flags. Valid as a bootstrap deploy, surprising otherwise.
    NoRelayEnvironments,
    /// An environment is wired to the table without a key prefix, so its
    /// entries collide with any other prefix-less environment.
    MissingPrefix { environment: &'static str },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::NoRelayEnvironments => write!(
                f,
                "no LaunchDarkly environment configured; replicas will start but serve no flags"
            ),
            ConfigWarning::MissingPrefix { environment } => write!(
                f,
                "{} environment is configured without a table key prefix",
                environment
            ),
        }
    }
}

fn env_or_default(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

impl DeployConfig {
    /// Read the recognized process-configuration keys, everything else at
    /// defaults. A missing or empty `CERT_ARN` means HTTP-only; the graph
    /// still builds without any certificate configured.
    pub fn from_env() -> Self {
        let cert_arn = env_or_default(ENV_CERT_ARN);
        let https = if cert_arn.is_empty() {
            HttpsMode::Disabled
        } else {
            HttpsMode::Enabled {
                certificate_arn: cert_arn,
            }
        };

        Self {
            https,
            relay: RelayEnv {
                client_side_id_prod: env_or_default(ENV_CLIENT_SIDE_ID_PROD),
                client_side_id_staging: env_or_default(ENV_CLIENT_SIDE_ID_STAGING),
                env_prod: env_or_default(ENV_LD_ENV_PROD),
                env_staging: env_or_default(ENV_LD_ENV_STAGING),
                prefix_prod: env_or_default(ENV_LD_PREFIX_PROD),
                prefix_staging: env_or_default(ENV_LD_PREFIX_STAGING),
            },
            ..Self::default()
        }
    }

    /// Check the configuration, returning warnings for the non-fatal
    /// findings. Errors here are what the original deployment deferred to
    /// an opaque failure inside the provisioning engine or the container.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        if !naming::is_valid_stack_name(&self.stack_name) {
            return Err(ConfigError::InvalidStackName(self.stack_name.clone()));
        }
        if !types::is_valid_region(&self.region) {
            return Err(ConfigError::UnknownRegion(self.region.clone()));
        }
        if self.max_availability_zones == 0 {
            return Err(ConfigError::ZeroAvailabilityZones);
        }
        if self.desired_count == 0 {
            return Err(ConfigError::ZeroReplicas);
        }
        if let HttpsMode::Enabled { certificate_arn } = &self.https {
            if certificate_arn.is_empty() {
                return Err(ConfigError::MissingCertificateArn);
            }
            if !types::is_valid_arn(certificate_arn) {
                return Err(ConfigError::MalformedCertificateArn(
                    certificate_arn.clone(),
                ));
            }
        }

        let mut warnings = Vec::new();
        if self.relay.is_empty() {
            warnings.push(ConfigWarning::NoRelayEnvironments);
        } else {
            if !self.relay.env_prod.is_empty() && self.relay.prefix_prod.is_empty() {
                warnings.push(ConfigWarning::MissingPrefix {
                    environment: "prod",
                });
            }
            if !self.relay.env_staging.is_empty() && self.relay.prefix_staging.is_empty() {
                warnings.push(ConfigWarning::MissingPrefix {
                    environment: "staging",
                });
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KEYS: &[&str] = &[
        ENV_CERT_ARN,
        ENV_CLIENT_SIDE_ID_PROD,
        ENV_CLIENT_SIDE_ID_STAGING,
        ENV_LD_ENV_STAGING,
        ENV_LD_ENV_PROD,
        ENV_LD_PREFIX_STAGING,
        ENV_LD_PREFIX_PROD,
    ];

    #[test]
    fn from_env_with_nothing_set_is_http_only() {
        temp_env::with_vars_unset(ALL_KEYS.to_vec(), || {
            let config = DeployConfig::from_env();
            assert_eq!(config.https, HttpsMode::Disabled);
            assert!(config.relay.is_empty());
            assert_eq!(config.relay.env_prod, "");
            assert_eq!(config.relay.prefix_staging, "");
        });
    }

    #[test]
    fn from_env_reads_recognized_keys() {
        temp_env::with_vars(
            [
                (
                    ENV_CERT_ARN,
                    Some("arn:aws:acm:us-east-1:123456789012:certificate/abc"),
                ),
                (ENV_LD_ENV_PROD, Some("prod-env-id")),
                (ENV_LD_PREFIX_PROD, Some("prod-")),
            ],
            || {
                let config = DeployConfig::from_env();
                assert_eq!(
                    config.https,
                    HttpsMode::Enabled {
                        certificate_arn:
                            "arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string()
                    }
                );
                assert_eq!(config.relay.env_prod, "prod-env-id");
                assert_eq!(config.relay.prefix_prod, "prod-");
            },
        );
    }

    #[test]
    fn empty_cert_arn_env_builds_http_only() {
        temp_env::with_var(ENV_CERT_ARN, Some(""), || {
            let config = DeployConfig::from_env();
            assert_eq!(config.https, HttpsMode::Disabled);
            assert!(config.validate().is_ok());
        });
    }

    #[test]
    fn https_with_empty_arn_is_a_build_time_error() {
        let config = DeployConfig {
            https: HttpsMode::Enabled {
                certificate_arn: String::new(),
            },
            ..DeployConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::MissingCertificateArn
        );
    }

    #[test]
    fn https_with_malformed_arn_is_rejected() {
        let config = DeployConfig {
            https: HttpsMode::Enabled {
                certificate_arn: "not-an-arn".to_string(),
            },
            ..DeployConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedCertificateArn(_))
        ));
    }

    #[test]
    fn empty_relay_settings_warn_but_pass() {
        let config = DeployConfig::default();
        let warnings = config.validate().unwrap();
        assert!(warnings.contains(&ConfigWarning::NoRelayEnvironments));
    }

    #[test]
    fn environment_without_prefix_warns() {
        let config = DeployConfig {
            relay: RelayEnv {
                env_prod: "prod-env-id".to_string(),
                ..RelayEnv::default()
            },
            ..DeployConfig::default()
        };
        let warnings = config.validate().unwrap();
        assert!(warnings.contains(&ConfigWarning::MissingPrefix {
            environment: "prod"
        }));
    }

    #[test]
    fn zero_zones_rejected() {
        let config = DeployConfig {
            max_availability_zones: 0,
            ..DeployConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::ZeroAvailabilityZones
        );
    }

    #[test]
    fn unknown_region_rejected() {
        let config = DeployConfig {
            region: "mars-north-1".to_string(),
            ..DeployConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownRegion(_))
        ));
    }
}
