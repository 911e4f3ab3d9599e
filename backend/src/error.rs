use thiserror::Error;

use crate::{config::ConfigError, quests::QuestLoadError, route_client::RoutingError};

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load quests: {0}")]
    Quests(#[from] QuestLoadError),
    #[error("failed to build routing client: {0}")]
    Routing(#[from] RoutingError),
}
