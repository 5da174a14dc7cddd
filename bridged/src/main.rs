mod config;
mod logging;

use agent_session::{AgentSession, Event, SessionCommand};
use anyhow::{Context, Result};
use clap::Parser;
use packet::CodecRegistry;
use tokio::sync::mpsc;

use config::{BridgeConfig, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BridgeConfig::load(cli).context("loading configuration")?;
    logging::init(&config.log_filter, config.log_format);

    tracing::info!(agent_path = %config.agent_path.display(), "starting bridge");

    let registry = CodecRegistry::with_defaults();
    let hints = config.interface_hints();
    let mut session = AgentSession::new(config.tx_attempts, hints.clone());

    let (commands_tx, commands_rx) = mpsc::channel::<SessionCommand>(32);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<Event>();

    let log_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            log_event(event, &registry);
        }
    });

    let stop_on_ctrl_c = commands_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, stopping agent link");
            let _ = stop_on_ctrl_c.send(SessionCommand::Stop).await;
        }
    });

    let result = agent_session::run(
        &mut session,
        &config.agent_path,
        &hints,
        commands_rx,
        events_tx,
    )
    .await;

    drop(commands_tx);
    let _ = log_task.await;

    result.context("agent link session ended with an error")
}

fn log_event(event: Event, registry: &CodecRegistry) {
    match event {
        Event::Connected(info) => {
            tracing::info!(
                mac = %info.mac,
                mtu = info.mtu,
                index = info.index,
                name = %info.name,
                "connected"
            );
        }
        Event::ReceivedFrame(frame) => match frame.resolve(registry) {
            Ok(Some(datagram)) => tracing::info!(
                src = %datagram.source,
                dst = %datagram.destination,
                headers = datagram.headers.len(),
                "received_frame"
            ),
            Ok(None) => tracing::info!(
                ethertype = format_args!("{:#06x}", frame.ethertype),
                bytes = frame.payload.len(),
                "received_frame"
            ),
            Err(e) => tracing::warn!(
                ethertype = format_args!("{:#06x}", frame.ethertype),
                "received_frame with unparsable payload: {e}"
            ),
        },
        Event::Disconnected => tracing::info!("disconnected"),
    }
}
