mod net;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::TypedValueParser;

use net::{ClientConfig, InputScript, NetworkClient};
use reckon::{PacketLossSimulation, PhysicsBackend, PredictionConfig};

#[derive(Parser)]
#[command(name = "reckon-client")]
#[command(about = "Predicting client for server-authoritative player movement")]
struct Args {
    #[arg(
        short,
        long,
        default_value = "127.0.0.1:9000",
        help = "Server address to connect to"
    )]
    server: String,

    #[arg(short, long, default_value_t = reckon::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = reckon::DEFAULT_BUFFER_SIZE,
          value_parser = clap::value_parser!(u16).range(1..=1024).map(usize::from),
          help = "Ticks of input and state history kept for rewinding")]
    buffer_size: usize,

    #[arg(long, help = "Never rewind to server states")]
    no_error_correction: bool,

    #[arg(long, help = "Snap to corrected positions instead of blending")]
    no_smoothing: bool,

    #[arg(long, help = "Resend every input since the last acknowledged tick")]
    redundant_input: bool,

    #[arg(long, default_value_t = PhysicsBackend::Rapier, help = "Physics backend (rapier, point-mass)")]
    backend: PhysicsBackend,

    #[arg(long, default_value_t = InputScript::Square, help = "Input script (idle, square, zigzag, random)")]
    script: InputScript,

    #[arg(long, help = "Stop after this many ticks")]
    ticks: Option<u64>,

    #[arg(long, default_value_t = 2000, help = "Connect timeout per attempt in ms")]
    connect_timeout: u64,

    #[arg(long, default_value_t = 5)]
    reconnect_attempts: u32,

    #[arg(long, help = "Enable packet loss simulation on outgoing inputs")]
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
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    anyhow::ensure!(args.tick_rate > 0, "tick rate must be positive");
    let server_addr: SocketAddr = args
        .server
        .parse()
        .with_context(|| format!("invalid server address '{}'", args.server))?;

    let packet_loss = args.simulate_packet_loss.then(|| PacketLossSimulation {
        enabled: true,
        loss_percent: args.loss_percent,
        duplicate_percent: args.duplicate_percent,
        min_latency_ms: args.min_latency,
        max_latency_ms: args.max_latency,
        jitter_ms: args.jitter,
    });

    let config = ClientConfig {
        server_addr,
        prediction: PredictionConfig {
            buffer_size: args.buffer_size,
            tick_rate: args.tick_rate,
            error_correction: !args.no_error_correction,
            // Blending only exists on top of corrections.
            correction_smoothing: !args.no_error_correction && !args.no_smoothing,
            redundant_input: args.redundant_input,
        },
        backend: args.backend,
        connect_timeout: Duration::from_millis(args.connect_timeout),
        reconnect_attempts: args.reconnect_attempts,
        packet_loss,
        ..Default::default()
    };

    let mut client = NetworkClient::new(config, args.script).context("failed to bind socket")?;
    client.connect()?;
    client.run(args.ticks)?;

    let stats = client.stats();
    log::info!(
        "Client finished: {} ticks, {} corrections ({} snapped, {} ticks replayed), {} resyncs, {} reconnects, {} malformed states, {} from ended sessions, {:.1}% dropped",
        stats.ticks,
        stats.corrections,
        stats.snaps,
        stats.replayed_ticks,
        stats.resyncs,
        stats.reconnects,
        stats.malformed_states,
        stats.foreign_states,
        client.network_stats().drop_percent()
    );

    Ok(())
}
