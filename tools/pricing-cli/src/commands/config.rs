//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CliConfig};
use crate::context::{parse_fixtures, Context};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { fixture, force } => init_config(fixture.as_deref(), force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Current Configuration");

    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    if let Some(ref fixture) = ctx.config.fixture {
        ctx.output.kv("fixture", fixture);
    }

    ctx.output.info("");
    ctx.output.info("[engine]");
    ctx.output.kv(
        "untracked_inventory",
        &format!("{:?}", ctx.config.engine.untracked_inventory),
    );
    ctx.output
        .kv("coupon_basis", &format!("{:?}", ctx.config.engine.coupon_basis));

    ctx.output.info("");
    ctx.output.info("[shipping]");
    ctx.output.kv(
        "free_shipping_threshold",
        &ctx.config.shipping.free_shipping_threshold,
    );
    ctx.output.kv("flat_rate", &ctx.config.shipping.flat_rate);
    ctx.output.kv("currency", &ctx.config.shipping.currency);

    if !ctx.config.stores.is_empty() {
        ctx.output.info("");
        ctx.output.info("Store overrides:");
        for store in ctx.config.stores.keys() {
            ctx.output.list_item(store);
        }
    }

    Ok(())
}

async fn init_config(fixture: Option<&str>, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("pricing.toml");

    if config_path.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            ctx.output.warn("Left existing config untouched");
            return Ok(());
        }
    }

    fs::write(&config_path, generate_default_config(fixture))?;
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let (errors, warnings) = check(&ctx.config, ctx);

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

fn check(config: &CliConfig, ctx: &Context) -> (Vec<String>, Vec<String>) {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = config.shipping.policy() {
        errors.push(format!("shipping: {:#}", e));
    }

    for (store, over) in &config.stores {
        if over.is_empty() {
            warnings.push(format!("stores.{} overrides nothing", store));
        } else if let Err(e) = config.shipping_for(store) {
            errors.push(format!("stores.{}: {:#}", store, e));
        }
    }

    match &config.fixture {
        None => warnings.push("no fixture set; commands will need --fixture".to_string()),
        Some(path) => match parse_fixtures(&ctx.resolve_path(path)) {
            Ok(fixtures) => {
                for fixture in &fixtures {
                    if let Err(e) = fixture.validate() {
                        errors.push(format!("fixture store {}: {}", fixture.slug, e));
                    }
                }
                for key in config.stores.keys() {
                    let known = fixtures
                        .iter()
                        .any(|f| &f.slug == key || f.store_id().as_str() == key);
                    if !known {
                        warnings.push(format!("stores.{} matches no store in the fixture", key));
                    }
                }
            }
            Err(e) => errors.push(format!("fixture: {:#}", e)),
        },
    }

    (errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreOverride;
    use crate::output::Output;

    fn ctx_in(dir: &std::path::Path, config: CliConfig) -> Context {
        Context {
            config,
            config_path: None,
            output: Output::new(true),
            cwd: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_check_reports_bad_override_and_missing_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CliConfig {
            fixture: Some("missing.json".to_string()),
            ..Default::default()
        };
        config.stores.insert(
            "demo".to_string(),
            StoreOverride {
                free_shipping_threshold: Some("lots".to_string()),
                flat_rate: None,
            },
        );
        config.stores.insert("quiet".to_string(), StoreOverride::default());

        let ctx = ctx_in(dir.path(), config.clone());
        let (errors, warnings) = check(&config, &ctx);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("stores.demo")));
        assert!(errors.iter().any(|e| e.starts_with("fixture")));
        assert!(warnings.iter().any(|w| w.contains("overrides nothing")));
    }

    #[test]
    fn test_check_reports_invalid_fixture_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("store.json"),
            r#"[{
                "slug": "good",
                "catalog": { "store_id": "store-1", "version": 1 }
            }, {
                "slug": "bad",
                "catalog": {
                    "store_id": "store-2",
                    "version": 1,
                    "products": {
                        "tee": {
                            "id": "tee", "name": "Tee", "type": "VARIABLE",
                            "price": { "amount_minor": 4000, "currency": "ILS" }
                        }
                    },
                    "variants": {
                        "tee-purple": {
                            "id": "tee-purple", "product_id": "tee", "sku": "T-P",
                            "options": { "Color": "Purple" }
                        }
                    }
                },
                "rules": [{
                    "id": "huge", "name": "Huge",
                    "value": { "type": "PERCENTAGE", "basis_points": 15000 }
                }]
            }]"#,
        )
        .unwrap();
        let config = CliConfig {
            fixture: Some("store.json".to_string()),
            ..Default::default()
        };
        let ctx = ctx_in(dir.path(), config.clone());
        let (errors, _) = check(&config, &ctx);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("fixture store bad"));
        assert!(errors[0].contains("tee-purple"));
    }

    #[test]
    fn test_check_defaults_only_warn() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::default();
        let ctx = ctx_in(dir.path(), config.clone());
        let (errors, warnings) = check(&config, &ctx);
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_init_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_in(dir.path(), CliConfig::default());
        init_config(Some("store.json"), true, &ctx).await.unwrap();

        let written = CliConfig::load(&dir.path().join("pricing.toml").to_string_lossy()).unwrap();
        assert_eq!(written.fixture.as_deref(), Some("store.json"));
    }
}
