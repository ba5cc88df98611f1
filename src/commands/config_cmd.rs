use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("server_url: {}", config.server_url.value);
                        println!("  source: {}", config.server_url.source);
                        println!();

                        match &config.email {
                            Some(email) => {
                                println!("email: {}", email.value);
                                println!("  source: {}", email.source);
                            }
                            None => println!("email: (not set)"),
                        }
                        println!(
                            "password: {}",
                            if config.password.is_some() {
                                "(set)"
                            } else {
                                "(not set)"
                            }
                        );
                        println!();

                        match &config.timezone_offset_minutes {
                            Some(offset) => {
                                println!("timezone_offset_minutes: {}", offset.value);
                                println!("  source: {}", offset.source);
                            }
                            None => println!("timezone_offset_minutes: (local time zone)"),
                        }
                        println!();

                        println!("realtime.heartbeat_secs: {}", config.realtime.heartbeat_secs);
                        println!(
                            "realtime.reconnect_initial_ms: {}",
                            config.realtime.reconnect_initial_ms
                        );
                        println!(
                            "realtime.reconnect_max_ms: {}",
                            config.realtime.reconnect_max_ms
                        );
                    }
                }
                Ok(())
            }
        }
    }
}
