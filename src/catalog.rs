//! Static JSON inputs: the categorized channel database and the map of
//! target collection names to collection ids.
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::ConfigError;
use crate::model::Channel;

/// `{"CATEGORY": ["channel id", ...], ...}`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ChannelDatabase(HashMap<String, Vec<String>>);

impl ChannelDatabase {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Channels of one category, in file order, blank ids dropped.
    pub fn channels(&self, category: &str) -> Result<Vec<Channel>, ConfigError> {
        let ids = self
            .0
            .get(category)
            .ok_or_else(|| ConfigError::UnknownCategory(category.to_string()))?;
        Ok(ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| Channel {
                id: id.to_string(),
                category: category.to_string(),
            })
            .collect())
    }
}

/// `{"music": "PL...", "mix": "PL..."}`
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CollectionMap(HashMap<String, String>);

impl CollectionMap {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn resolve(&self, name: &str) -> Result<&str, ConfigError> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCollection(name.to_string()))
    }
}
