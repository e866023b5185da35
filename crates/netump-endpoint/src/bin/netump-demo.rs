use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};

use netump_endpoint::{
    EndpointHandler, ErrorCorrectionMode, NetUmpEndpoint, SessionStatus, StartConfig,
};

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    /// Invite the remote endpoint.
    Initiator,
    /// Wait to be invited.
    Listener,
}

#[derive(Parser)]
#[command(name = "netump-demo", about = "NetUMP (MIDI 2.0 over Ethernet) demo endpoint")]
struct Cli {
    /// Session role
    #[arg(value_enum)]
    role: Role,

    /// Remote endpoint address (required for an initiator)
    #[arg(short, long)]
    remote: Option<SocketAddr>,

    /// Local UDP port to bind
    #[arg(short, long, default_value_t = 5004)]
    port: u16,

    /// Endpoint name advertised in invitations
    #[arg(short, long, default_value = "netump-demo")]
    name: String,

    /// Send a test note every N milliseconds while the session is open
    /// (0 disables)
    #[arg(long, default_value_t = 1000)]
    note_interval: u64,

    /// Disable forward error correction on transmit
    #[arg(long)]
    no_fec: bool,
}

struct PrintHandler;

impl EndpointHandler for PrintHandler {
    fn on_ump(&mut self, ump: &[u32]) {
        let words: Vec<String> = ump.iter().map(|word| format!("{word:08X}")).collect();
        tracing::info!(words = words.join(" "), "UMP received");
    }

    fn on_connected(&mut self, endpoint_name: &str) {
        tracing::info!(peer = endpoint_name, "peer connected");
    }

    fn on_disconnected(&mut self) {
        tracing::info!("session ended");
    }
}

fn main() {
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        netump_endpoint::logging::init_json();
    } else {
        netump_endpoint::logging::init();
    }

    let cli = Cli::parse();

    let mut endpoint = NetUmpEndpoint::new(PrintHandler);
    if let Err(e) = endpoint.set_endpoint_name(&cli.name) {
        eprintln!("invalid endpoint name: {e}");
        std::process::exit(1);
    }
    if cli.no_fec {
        endpoint.select_error_correction_mode(ErrorCorrectionMode::None);
    }

    let config = match cli.role {
        Role::Initiator => {
            let Some(remote) = cli.remote else {
                eprintln!("an initiator requires --remote");
                std::process::exit(1);
            };
            StartConfig::initiator(remote, cli.port)
        }
        Role::Listener => StartConfig::listener(cli.port),
    };

    if let Err(e) = endpoint.start(config) {
        tracing::error!("failed to start endpoint: {e}");
        std::process::exit(1);
    }
    tracing::info!(local = ?endpoint.local_addr(), "endpoint running");

    // The millisecond tick loop; a sleep-driven timer is accurate enough
    // for a demo since all protocol delays count ticks, not wall clock.
    let mut last_note = Instant::now();
    let mut note_on = true;
    loop {
        endpoint.tick();

        if endpoint.read_and_reset_connection_lost() {
            tracing::warn!("connection lost");
        }
        if endpoint.read_and_reset_peer_closed() {
            tracing::warn!("peer closed the session");
        }

        if cli.note_interval > 0
            && endpoint.status() == SessionStatus::Opened
            && last_note.elapsed() >= Duration::from_millis(cli.note_interval)
        {
            // Alternate note-on / note-off on middle C.
            let word = if note_on { 0x2090_3C64 } else { 0x2080_3C00 };
            if endpoint.send_ump(&[word]) {
                note_on = !note_on;
                last_note = Instant::now();
            }
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}
