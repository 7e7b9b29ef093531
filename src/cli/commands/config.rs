use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::error::Result;

pub fn execute(command: ConfigCommand) -> Result<()> {
    let config_path = Config::config_file_path()?;

    match command {
        ConfigCommand::Init => {
            Config::create_sample(&config_path)?;
            println!("✓ Created {}", config_path.display());
            println!("  Set auth.client_id and api.base_url before signing in");
        }
        ConfigCommand::Show => {
            println!("Config file path: {}", config_path.display());
            if !config_path.exists() {
                println!("Status: File does not exist");
                println!("\nTo create a sample config file, run:");
                println!("  flashcards config init");
            }

            match Config::load() {
                Ok(config) => {
                    println!("\nAuth:");
                    println!("  Authority:    {}", config.auth.authority());
                    println!("  Client id:    {}", or_unset(&config.auth.client_id));
                    println!("  API scope:    {}", config.auth.token_request().scopes.join(" "));
                    println!("  Redirect URI: {}", config.auth.redirect_uri);
                    println!("  Bypass:       {}", config.auth.bypass_enabled());
                    println!("\nAPI:");
                    println!("  Base URL:     {}", or_unset(&config.api.base_url));

                    if let Err(e) = config.validate() {
                        println!("\nIncomplete: {}", e);
                    }
                }
                Err(e) => {
                    println!("Valid: No");
                    println!("Error: {}", e);
                }
            }
        }
    }

    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
