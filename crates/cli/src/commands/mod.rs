pub mod doctor;
pub mod memory;
pub mod onboard;
pub mod plan;
pub mod run;
pub mod serve;

use uhpm_config::AppConfig;

/// Load the config, or explain how to fix it.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Fail early with setup instructions when no key is available.
pub(crate) fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    GEMINI_API_KEY=...   (default provider)");
    eprintln!("    OPENAI_API_KEY=...   (with UHPM_PROVIDER=openai)");
    eprintln!("    UHPM_API_KEY=...     (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
