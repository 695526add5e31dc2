use crate::config::InputConfig;
use crate::processing::build_model;
use crate::topology::{TopologyDocument, TopologyError};
use crate::types::{Datasets, EducationRecord, MapModel};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info};

/// The datasets could not be turned into a map. Every cause is handled the
/// same way: the map stays in its loading presentation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data unavailable: request for {location} failed: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("data unavailable: could not read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("data unavailable: {location} is not the expected JSON: {source}")]
    Malformed {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("data unavailable: invalid topology: {0}")]
    Topology(#[from] TopologyError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Http(String),
    File(PathBuf),
}

impl DataSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            DataSource::Http(location.to_string())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            DataSource::File(PathBuf::from(path))
        }
    }

    fn location(&self) -> String {
        match self {
            DataSource::Http(url) => url.clone(),
            DataSource::File(path) => path.display().to_string(),
        }
    }

    async fn fetch_bytes(&self, client: &reqwest::Client) -> Result<Vec<u8>, DataError> {
        let http_err = |source| DataError::Http {
            location: self.location(),
            source,
        };
        match self {
            DataSource::Http(url) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(http_err)?;
                let body = response.bytes().await.map_err(http_err)?;
                Ok(body.to_vec())
            }
            DataSource::File(path) => tokio::fs::read(path).await.map_err(|source| DataError::Io {
                location: self.location(),
                source,
            }),
        }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, client: &reqwest::Client) -> Result<T, DataError> {
        let bytes = self.fetch_bytes(client).await?;
        debug!(location = %self.location(), bytes = bytes.len(), "fetched dataset");
        serde_json::from_slice(&bytes).map_err(|source| DataError::Malformed {
            location: self.location(),
            source,
        })
    }
}

/// Fetch both datasets concurrently. Fails if either one fails; there is no
/// retry and no partial result.
pub async fn load_datasets(input: &InputConfig) -> Result<Datasets, DataError> {
    let client = reqwest::Client::new();
    let education_source = DataSource::parse(&input.education);
    let topology_source = DataSource::parse(&input.topology);

    info!(
        education = %education_source.location(),
        topology = %topology_source.location(),
        "loading datasets"
    );

    let (education, topology) = tokio::try_join!(
        education_source.fetch_json::<Vec<EducationRecord>>(&client),
        topology_source.fetch_json::<TopologyDocument>(&client),
    )?;

    info!(records = education.len(), arcs = topology.arcs.len(), "datasets loaded");
    Ok(Datasets { education, topology })
}

/// Load and project in one step.
pub async fn load_model(input: &InputConfig) -> Result<MapModel, DataError> {
    let datasets = load_datasets(input).await?;
    Ok(build_model(&datasets)?)
}

/// One-way `NotLoaded -> Loaded` flag that owns the loaded model.
#[derive(Debug, Default)]
pub struct Readiness {
    model: OnceLock<Arc<MapModel>>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip to loaded. Returns `false` if already loaded; the first model stays.
    pub fn mark_loaded(&self, model: MapModel) -> bool {
        self.model.set(Arc::new(model)).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn model(&self) -> Option<Arc<MapModel>> {
        self.model.get().cloned()
    }
}
