mod config;
mod events;
mod server;

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use config::ServerConfig;
use reckon::{PacketLossSimulation, PhysicsBackend};
use server::GameServer;

#[derive(Parser)]
#[command(name = "reckon-server")]
#[command(about = "Authoritative server for predicted player movement")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = reckon::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = reckon::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 32)]
    max_clients: usize,

    #[arg(long, default_value_t = reckon::DEFAULT_TIMEOUT_SECS, help = "Seconds of silence before a client is dropped")]
    timeout: u64,

    #[arg(long, default_value_t = PhysicsBackend::Rapier, help = "Physics backend (rapier, point-mass)")]
    backend: PhysicsBackend,

    #[arg(long, help = "Enable packet loss simulation on outgoing states")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,

    #[arg(long, default_value_t = 0.0, help = "Packet duplication percentage (0-100)")]
    duplicate_percent: f32,

    #[arg(long, default_value_t = 0, help = "Minimum latency in ms")]
    min_latency: u32,

    #[arg(long, default_value_t = 0, help = "Maximum latency in ms")]
    max_latency: u32,

    #[arg(long, default_value_t = 0, help = "Jitter in ms")]
    jitter: u32,

    #[arg(long, help = "Stop after this many seconds")]
    duration: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    anyhow::ensure!(args.tick_rate > 0, "tick rate must be positive");
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let packet_loss = args.simulate_packet_loss.then(|| PacketLossSimulation {
        enabled: true,
        loss_percent: args.loss_percent,
        duplicate_percent: args.duplicate_percent,
        min_latency_ms: args.min_latency,
        max_latency_ms: args.max_latency,
        jitter_ms: args.jitter,
    });

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        timeout_secs: args.timeout,
        backend: args.backend,
        packet_loss,
        ..Default::default()
    };

    let mut server = GameServer::new(&bind_addr, config)
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    log::info!(
        "Server started on {} ({} Hz, {} physics)",
        server.local_addr(),
        args.tick_rate,
        args.backend
    );
    if let Some(secs) = args.duration {
        let running = server.running();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            running.store(false, Ordering::SeqCst);
        });
    }
    server.run();

    let stats = server.stats();
    log::info!(
        "Server shutting down: {} inputs, {} states, {} stale, {} malformed, {} from ended sessions, {:.1}% dropped",
        stats.inputs_received,
        stats.states_sent,
        stats.stale_dropped,
        stats.malformed_dropped,
        stats.foreign_session_dropped,
        server.network_stats().drop_percent()
    );

    Ok(())
}
