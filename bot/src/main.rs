//! Zooscape agent binary.
//!
//! Owns everything the decision core treats as external: configuration,
//! logging, identity, and the transport seam. Messages arrive as JSON
//! lines on stdin and action replies leave as JSON lines on stdout, so a
//! network transport (or a test harness) can drive the bot as a child
//! process:
//!
//! ```text
//! > {"type":"registered","botId":"..."}
//! > {"type":"state","state":{...}}
//! < {"action":4}
//! > {"type":"disconnect"}
//! ```
//!
//! Logs go to stderr; stdout carries only replies. EOF and `disconnect`
//! both shut the service down cleanly (exit code 0), configuration or I/O
//! faults exit non-zero.

mod config;
mod wire;

use std::io::{self, BufRead, Write};

use anyhow::Context;
use mcts::BotService;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zoo_core::BotAction;

use config::BotConfig;
use wire::GameStateDto;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Inbound {
    /// Registration acknowledgement carrying our assigned id.
    Registered {
        #[serde(rename = "botId")]
        bot_id: String,
    },
    /// One full world state; answered with an action.
    State { state: GameStateDto },
    /// The runtime is done with us.
    Disconnect,
}

#[derive(Debug, Serialize)]
struct Outbound {
    action: i32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("bot=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let config = BotConfig::from_env();
    info!(
        nickname = %config.bot_nickname,
        endpoint = %config.hub_url(),
        "configuration loaded"
    );

    let service = BotService::new(config.mcts_config());
    run(&service, io::stdin().lock(), io::stdout().lock())?;

    service.stop();
    info!("bot stopped");
    Ok(())
}

/// Message loop over the transport seam. Returns on EOF or `disconnect`.
fn run(
    service: &BotService,
    input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line.context("reading inbound message")?;
        if line.trim().is_empty() {
            continue;
        }
        let message: Inbound = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, "skipping malformed message");
                continue;
            }
        };

        match message {
            Inbound::Registered { bot_id } => {
                info!(%bot_id, "registered");
                service.set_id(bot_id);
            }
            Inbound::State { state } => {
                let state = state.into_state();
                let action = match service.best_action(&state) {
                    Ok(result) => result.best_action,
                    Err(error) => {
                        warn!(%error, tick = state.tick, "search refused state");
                        BotAction::None
                    }
                };
                serde_json::to_writer(
                    &mut output,
                    &Outbound {
                        action: action.to_wire(),
                    },
                )
                .context("writing action reply")?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
            Inbound::Disconnect => {
                info!("disconnect received");
                break;
            }
        }
    }
    Ok(())
}
