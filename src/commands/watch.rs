use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use grocer_core::WsConnector;

use super::connect;
use super::lists::print_list;
use crate::config::Config;

#[derive(Args)]
pub struct WatchCommand {
    /// Hide checked items
    #[arg(long)]
    pub unchecked: bool,
}

impl WatchCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = connect(config).await?;
        let mut updates = client.subscribe();

        let channel = client.start_realtime(
            WsConnector,
            &config.server_url.value,
            config.realtime.to_realtime_config(),
        );

        println!("Watching for changes (Ctrl-C to stop)\n");
        for list in client.lists() {
            print_list(&list, self.unchecked);
        }

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                update = updates.recv() => match update {
                    Ok(update) => {
                        println!("--- lists updated ---\n");
                        for list in &update.lists {
                            print_list(list, self.unchecked);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} update(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        channel.teardown().await;
        Ok(())
    }
}
