//! `uhpm onboard`: first-time setup.

use uhpm_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("UHPM: First-Time Setup");
    println!("======================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    let persist_dir = AppConfig::default().memory.persist_dir();
    if !persist_dir.exists() {
        std::fs::create_dir_all(&persist_dir)?;
        println!("Created memory directory: {}", persist_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Created config.toml at: {}", config_path.display());
        println!("\nNext steps:");
        println!("   1. Set GEMINI_API_KEY or edit {} and add api_key", config_path.display());
        println!("   2. Run: uhpm doctor");
        println!("   3. Run: uhpm run --task \"Analyse my product\" --product-text \"...\"\n");
    }

    println!("Setup complete.\n");

    Ok(())
}
