//! `uhpm doctor`: diagnose configuration and storage.

use uhpm_config::AppConfig;
use uhpm_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("UHPM Doctor: System Diagnostics");
    println!("===============================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  [ok]   Config file found: {}", config_path.display());
    } else {
        println!("  [warn] No config file, defaults in use (run `uhpm onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            println!("\n  1 blocking issue found.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured for '{}'", config.default_provider);
    } else {
        println!("  [fail] No API key: set GEMINI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    println!(
        "  [info] Model: {} (temperature {}, max tokens {})",
        config.default_model, config.default_temperature, config.default_max_tokens
    );

    let router = uhpm_providers::build_from_config(&config);
    println!("  [info] Providers: {}", router.list().join(", "));
    if let Some(provider) = router.default() {
        let (healthy, line) = reachability(provider.as_ref()).await;
        println!("{line}");
        if !healthy {
            issues += 1;
        }
    } else {
        println!("  [fail] Default provider '{}' is not registered", router.default_name());
        issues += 1;
    }

    if config.memory.backend == "file" {
        let dir = config.memory.persist_dir();
        if dir.is_dir() {
            println!("  [ok]   Memory directory exists: {}", dir.display());
        } else {
            println!("  [warn] Memory directory will be created on first use: {}", dir.display());
        }
    } else {
        println!("  [info] Memory backend: {}", config.memory.backend);
    }

    println!(
        "  [info] Pipeline timeout {}s, context k={}",
        config.pipeline.timeout_secs, config.pipeline.context_k
    );

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// StubProvider the provider and render the doctor line for it.
async fn reachability(provider: &dyn Provider) -> (bool, String) {
    match provider.health_check().await {
        Ok(true) => (true, format!("  [ok]   Provider '{}' reachable", provider.name())),
        Ok(false) => (
            false,
            format!("  [warn] Provider '{}' answered with an error status", provider.name()),
        ),
        Err(e) => (
            false,
            format!("  [fail] Provider '{}' unreachable: {e}", provider.name()),
        ),
    }
}
