use std::{
    collections::BTreeMap,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{utils::StorageLayout, FrostvaultError, FrostvaultResult};

use super::{Domain, DomainKind};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Owns the domain table and its durable record.
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    layout: StorageLayout,
    domains: BTreeMap<String, Domain>,
}

/// The on-disk shape of `domains.json`.
#[derive(Debug, Serialize, Deserialize)]
struct DomainRecord {
    domains: BTreeMap<String, Domain>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DomainRegistry {
    /// Creates an empty registry for the storage under `layout`.
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            domains: BTreeMap::new(),
        }
    }

    /// Creates the four default domains under `<base>/domains` along with their directories.
    pub async fn initialize_defaults(&mut self) -> FrostvaultResult<()> {
        let mut domains = BTreeMap::new();
        for kind in DomainKind::ALL {
            let domain = Domain::with_default_policy(kind, self.layout.domain_dir(kind.as_str()));
            domains.insert(domain.get_name().clone(), domain);
        }

        validate(&domains)?;

        for domain in domains.values() {
            let path = domain.get_path();
            fs::create_dir_all(path)
                .await
                .map_err(FrostvaultError::at(path))?;
            tracing::info!(
                "domain {} available at {} ({})",
                domain.get_name(),
                path.display(),
                domain.get_reset_policy()
            );
        }

        self.domains = domains;
        Ok(())
    }

    /// Writes the domain table to `domains.json`, replacing the previous record atomically.
    pub async fn save(&self) -> FrostvaultResult<()> {
        let record = DomainRecord {
            domains: self.domains.clone(),
        };
        let contents = serde_json::to_vec_pretty(&record)?;
        frostutils::write_atomic(self.layout.domains_file(), contents).await?;
        tracing::debug!("saved domain table to {}", self.layout.domains_file().display());
        Ok(())
    }

    /// Reads the domain table from `domains.json`.
    ///
    /// ## Errors
    /// - `NotInitialized` if the record does not exist
    /// - `CorruptState` if it cannot be parsed
    /// - `InvalidDomainLayout` if two domains share or nest paths
    pub async fn load(&mut self) -> FrostvaultResult<()> {
        let path = self.layout.domains_file();
        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FrostvaultError::NotInitialized(
                    self.layout.base().to_path_buf(),
                ));
            }
            Err(e) => return Err(FrostvaultError::storage(&path, e)),
        };

        let record: DomainRecord = serde_json::from_slice(&contents)
            .map_err(|source| FrostvaultError::CorruptState { path, source })?;

        validate(&record.domains)?;
        self.domains = record.domains;
        Ok(())
    }

    /// Returns the domain called `name`.
    pub fn get(&self, name: &str) -> FrostvaultResult<&Domain> {
        self.domains
            .get(name)
            .ok_or_else(|| FrostvaultError::DomainNotFound(name.to_string()))
    }

    /// Returns the domain of the given kind, if the table has one.
    pub fn by_kind(&self, kind: DomainKind) -> Option<&Domain> {
        self.domains.values().find(|d| *d.get_kind() == kind)
    }

    /// All domains, in kind order.
    pub fn domains(&self) -> Vec<&Domain> {
        let mut domains: Vec<_> = self.domains.values().collect();
        domains.sort_by_key(|d| *d.get_kind());
        domains
    }

    /// The frozen domains, in kind order.
    pub fn frozen(&self) -> Vec<&Domain> {
        self.domains()
            .into_iter()
            .filter(|d| d.is_frozen())
            .collect()
    }

    /// Maps each of the named domains to its live path. Unknown names are skipped.
    pub fn paths_of<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, PathBuf> {
        names
            .into_iter()
            .filter_map(|name| self.domains.get(name))
            .map(|d| (d.get_name().clone(), d.get_path().clone()))
            .collect()
    }

    /// Maps each frozen domain's name to its live path.
    pub fn frozen_paths(&self) -> BTreeMap<String, PathBuf> {
        let frozen = self.frozen();
        self.paths_of(frozen.iter().map(|d| d.get_name().as_str()))
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Whether a domain record exists on disk.
    pub fn record_exists(&self) -> bool {
        self.layout.domains_file().exists()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks that names match their keys and that every path is absolute, unique and not nested in
/// another domain's path.
fn validate(domains: &BTreeMap<String, Domain>) -> FrostvaultResult<()> {
    let mut seen: Vec<(&str, PathBuf)> = Vec::with_capacity(domains.len());

    for (key, domain) in domains {
        if key != domain.get_name() {
            return Err(FrostvaultError::InvalidDomainLayout(format!(
                "domain recorded under {} is named {}",
                key,
                domain.get_name()
            )));
        }

        let path = frostutils::normalize_absolute(domain.get_path()).map_err(|e| {
            FrostvaultError::InvalidDomainLayout(format!("domain {}: {}", key, e))
        })?;

        if let Some((other, _)) = seen
            .iter()
            .find(|(_, other_path)| frostutils::paths_overlap(other_path, &path))
        {
            return Err(FrostvaultError::InvalidDomainLayout(format!(
                "domain {} at {} overlaps domain {}",
                key,
                path.display(),
                other
            )));
        }

        seen.push((key.as_str(), path));
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
