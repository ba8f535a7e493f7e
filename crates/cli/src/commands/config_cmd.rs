//! `archtalk config` — Configuration management commands.

use archtalk_config::AppConfig;

/// Things that load fine but are probably mistakes.
pub fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();

    if !config.use_mcp && !config.has_api_key() {
        warnings.push("Direct mode without an API key (set api_key or ARCHTALK_API_KEY)");
    }

    if config.npcs.is_empty() {
        warnings.push("No NPC prompts under [npcs]; every NPC will use default_prompt");
    }

    if config.reply_delay() >= config.conversation_timeout() {
        warnings.push("reply_delay_ms is not shorter than response_timeout");
    }

    if config.min_char_length > 256 {
        warnings.push("min_char_length is longer than a chat line");
    }

    warnings
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            if config.use_mcp {
                println!("   Mode:      gateway ({})", config.mcp.server_url);
                println!("   Model:     {} / {}", config.mcp.provider, config.mcp.model);
            } else {
                println!("   Mode:      direct");
                println!("   Model:     {}", config.chatgpt_engine);
            }
            println!("   NPCs:      {}", config.npcs.len());
            println!("   History:   {} pairs", config.max_conversation_pairs);
            println!("   Timeout:   {} ms", config.response_timeout);
            println!("   Cooldown:  {} ms", config.chat_cooldown);
            println!("   Memory:    {}", config.npc_memory_duration);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
