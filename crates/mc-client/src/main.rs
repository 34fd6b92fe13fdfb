use mc_client::event::MapEvent;
use mc_client::Session;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("mc_client=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).map(String::as_str).unwrap_or("127.0.0.1");
    let port: u16 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(25565);
    let player_name = args.get(3).cloned().unwrap_or_else(|| "RustBot".to_string());

    info!(host, port, %player_name, "connecting");

    let stream = Session::connect(host, port).await?;
    let handle = Session::login_as(stream, host, port, &player_name).await?;

    handle.handlers.set_on_state(|event| {
        info!(from = ?event.from, to = ?event.to, "state transition");
    });
    handle.handlers.set_on_chat(|event| {
        info!(position = event.position, json = %event.json_data, "chat message");
    });
    handle.handlers.set_on_map(|event| match event {
        MapEvent::ChunkData { chunk_x, chunk_z, column } => {
            info!(chunk_x, chunk_z, sections = column.sections.len(), "chunk column");
        }
        MapEvent::ChunkBulk { chunks } => {
            info!(columns = chunks.len(), "chunk bulk");
        }
        MapEvent::MultiBlockChange { chunk_x, chunk_z, records } => {
            info!(chunk_x, chunk_z, records = records.len(), "multi block change");
        }
        MapEvent::BlockChange { block_state, .. } => {
            info!(block_state, "block change");
        }
        MapEvent::BlockAction { block_type, .. } => {
            info!(block_type, "block action");
        }
        MapEvent::BlockBreakAnimation { entity_id, destroy_stage, .. } => {
            info!(entity_id, destroy_stage, "block break animation");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, closing session");
        }
        _ = wait_until_closed(&handle) => {
            warn!("session closed by peer");
        }
    }

    handle.close();
    Ok(())
}

async fn wait_until_closed(handle: &mc_client::SessionHandle) {
    while handle.is_alive() {
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
}
