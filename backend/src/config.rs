use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    circle::CircleStrategy, explore::FailurePolicy, models::TransportMode,
    route_client::DEFAULT_MAPS_API_BASE,
};

const DEFAULT_QUESTS_PATH: &str = "backend/data/quests.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreConfig {
    pub api_key: String,
    pub routing_base_url: String,
    pub geocoding_base_url: String,
    pub quests_path: PathBuf,
    pub circle_strategy: CircleStrategy,
    pub failure_policy: FailurePolicy,
    pub transport_mode: TransportMode,
    /// No timeout unless set.
    pub route_timeout: Option<Duration>,
    /// City the map viewport starts on, if known.
    pub home_city: Option<String>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            routing_base_url: DEFAULT_MAPS_API_BASE.to_string(),
            geocoding_base_url: DEFAULT_MAPS_API_BASE.to_string(),
            quests_path: PathBuf::from(DEFAULT_QUESTS_PATH),
            circle_strategy: CircleStrategy::default(),
            failure_policy: FailurePolicy::default(),
            transport_mode: TransportMode::default(),
            route_timeout: None,
            home_city: None,
        }
    }
}

impl ExploreConfig {
    /// Read configuration from the process environment.
    ///
    /// Recognised variables: `GOOGLE_MAPS_API_KEY`, `ROUTING_API_BASE`,
    /// `GEOCODING_API_BASE`, `QUESTS_JSON`, `CIRCLE_STRATEGY`,
    /// `FAILURE_POLICY`, `DEFAULT_TRANSPORT_MODE`, `ROUTE_TIMEOUT_SECS` and
    /// `HOME_CITY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let lookup = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_key = lookup("GOOGLE_MAPS_API_KEY").unwrap_or_else(|| {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set, routing requests will be rejected");
            String::new()
        });

        Ok(Self {
            api_key,
            routing_base_url: lookup("ROUTING_API_BASE").unwrap_or(defaults.routing_base_url),
            geocoding_base_url: lookup("GEOCODING_API_BASE")
                .unwrap_or(defaults.geocoding_base_url),
            quests_path: lookup("QUESTS_JSON")
                .map(PathBuf::from)
                .unwrap_or(defaults.quests_path),
            circle_strategy: parse_var(&lookup, "CIRCLE_STRATEGY")?
                .unwrap_or(defaults.circle_strategy),
            failure_policy: parse_var(&lookup, "FAILURE_POLICY")?
                .unwrap_or(defaults.failure_policy),
            transport_mode: parse_var(&lookup, "DEFAULT_TRANSPORT_MODE")?
                .unwrap_or(defaults.transport_mode),
            route_timeout: parse_var::<u64>(&lookup, "ROUTE_TIMEOUT_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            home_city: lookup("HOME_CITY"),
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
                var,
                reason: err.to_string(),
                value,
            })
        })
        .transpose()
}
