//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use serde::Deserialize;
use storefront_pricing::memory::{InMemoryStore, StoreFixture};
use storefront_pricing::service::PricingService;

use crate::config::CliConfig;
use crate::output::Output;

const CONFIG_NAMES: [&str; 3] = ["pricing.toml", ".pricing.toml", "pricing.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Where the configuration was loaded from, if anywhere.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

/// A fixture file holds one store or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Many(Vec<StoreFixture>),
    One(Box<StoreFixture>),
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            (CliConfig::load(path)?, Some(PathBuf::from(path)))
        } else {
            match find_config(&cwd) {
                Some(path) => {
                    let config = CliConfig::load(&path.to_string_lossy())?;
                    (config, Some(path))
                }
                None => (CliConfig::default(), None),
            }
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Fixture path from the argument or the config file.
    pub fn fixture_path(&self, arg: Option<&str>) -> Result<PathBuf> {
        match arg.or(self.config.fixture.as_deref()) {
            Some(path) => Ok(self.resolve_path(path)),
            None => bail!("No fixture given. Pass --fixture or set `fixture` in pricing.toml."),
        }
    }

    /// Load store fixtures and apply configured shipping.
    pub fn load_store(&self, fixture: Option<&str>) -> Result<InMemoryStore> {
        let path = self.fixture_path(fixture)?;
        let fixtures = read_fixtures(&path)?;

        let mut store = InMemoryStore::new().with_default_shipping(self.config.shipping.policy()?);
        for fixture in fixtures {
            let overrides = [fixture.slug.as_str(), fixture.store_id().as_str()]
                .into_iter()
                .find(|key| self.config.stores.contains_key(*key))
                .map(str::to_string);
            let id = fixture.store_id().clone();
            store.insert_fixture(fixture);
            if let Some(key) = overrides {
                store = store.with_shipping(id, self.config.shipping_for(&key)?);
            }
        }
        tracing::debug!(fixture = %path.display(), "loaded store fixtures");
        Ok(store)
    }

    /// Pricing service over the fixture, using configured engine policies.
    pub fn service(&self, fixture: Option<&str>) -> Result<PricingService<InMemoryStore>> {
        Ok(PricingService::new(self.load_store(fixture)?).with_config(self.config.engine))
    }
}

/// Find config file in directory tree.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Read and validate store fixtures. The first invalid store fails the load.
pub fn read_fixtures(path: &Path) -> Result<Vec<StoreFixture>> {
    let fixtures = parse_fixtures(path)?;
    for fixture in &fixtures {
        fixture
            .validate()
            .with_context(|| format!("Invalid store {} in {}", fixture.slug, path.display()))?;
    }
    Ok(fixtures)
}

/// Read one or many store fixtures from a JSON file without validating them.
pub fn parse_fixtures(path: &Path) -> Result<Vec<StoreFixture>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
    let parsed: FixtureFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture: {}", path.display()))?;
    Ok(match parsed {
        FixtureFile::Many(list) => list,
        FixtureFile::One(one) => vec![*one],
    })
}
