//! Agora forum connection hub.
//!
//! Users and sessions live in in-memory stores that start empty, so without
//! `--demo` every connection is rejected with 401. Demo mode seeds alice, bob
//! and carol and logs a ready-to-use URL for each.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin agora-server
//! cargo run --bin agora-server -- --host 0.0.0.0 --port 3000 --demo
//! ```

use std::{sync::Arc, time::Duration};

use agora_server::{
    config::HubConfig,
    domain::Timestamp,
    infrastructure::repository::inmemory::{
        InMemoryForumRepository, InMemorySessionRepository, seed_demo,
    },
    ui::{AppState, Server},
};
use agora_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "agora-server")]
#[command(about = "Real-time connection hub for the Agora forum", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Frames buffered per connection before a slow client is evicted
    #[arg(long, default_value = "256")]
    queue_capacity: usize,

    /// Largest inbound WebSocket frame in bytes
    #[arg(long, default_value = "4096")]
    max_frame_bytes: usize,

    /// Milliseconds the writer may keep flushing after a connection is torn down
    #[arg(long, default_value = "1000")]
    close_grace_ms: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seed demo users and print their session tokens.
    /// The stores start empty, so this is the only way to get accounts that can connect
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger(
        &[env!("CARGO_PKG_NAME"), "agora-shared", "tower_http"],
        &args.log_level,
    );

    let config = match (HubConfig {
        outbound_queue_capacity: args.queue_capacity,
        max_frame_bytes: args.max_frame_bytes,
        close_grace: Duration::from_millis(args.close_grace_ms),
    })
    .validate()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // 1. Repositories (in-memory stores)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let forum = Arc::new(InMemoryForumRepository::new(clock.clone()));
    let sessions = Arc::new(InMemorySessionRepository::new(clock.clone()));

    if args.demo {
        match seed_demo(&forum, &sessions, Timestamp::new(clock.now_millis())).await {
            Ok(accounts) => {
                for account in accounts {
                    tracing::info!(
                        "Demo user {} (id {}): ws://{}:{}/ws?token={}",
                        account.user.username,
                        account.user.id,
                        args.host,
                        args.port,
                        account.session.id
                    );
                }
            }
            Err(e) => {
                tracing::error!("Failed to seed demo data: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        tracing::warn!("Stores are empty: every connection will get 401. Pass --demo to seed users");
    }

    // 2. MessagePusher + UseCases
    let state = AppState::new(forum, sessions, config);

    // 3. Run the server
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
