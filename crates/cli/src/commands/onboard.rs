//! `apeiron onboard` - First-time setup.

use apeiron_config::AppConfig;

pub async fn run() -> super::CommandResult {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("Apeiron — First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set GEMINI_API_KEY or add api_key to {}", config_path.display());
    println!("   2. Run: apeiron topics");
    println!("   3. Run: apeiron oracle quantum-computing\n");

    Ok(())
}
