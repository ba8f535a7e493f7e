//! `archtalk doctor` — Diagnose setup and backend health.

use archtalk_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 ArchTalk Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults — run `archtalk onboard`");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config and run doctor again.");
            return Ok(());
        }
    };

    if config.use_mcp {
        println!("  ✅ Gateway mode ({})", config.mcp.server_url);
    } else if config.has_api_key() {
        println!("  ✅ Direct mode, API key configured");
    } else {
        println!("  ❌ Direct mode without an API key — add api_key to config.toml");
        issues += 1;
    }

    if AppConfig::data_dir().exists() {
        println!("  ✅ Data directory exists");
    } else {
        println!("  ⚠️  No data directory — run `archtalk onboard`");
        issues += 1;
    }

    match archtalk_providers::build_from_config(&config) {
        Ok(backend) => match backend.transport.health_check().await {
            Ok(true) => println!("  ✅ Backend reachable ({})", backend.mode()),
            Ok(false) => {
                println!("  ❌ Backend not reachable ({})", backend.mode());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Backend check failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Could not build backend: {e}");
            issues += 1;
        }
    }

    for warning in super::config_cmd::warnings(&config) {
        println!("  ⚠️  {warning}");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
