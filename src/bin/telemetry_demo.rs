use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;

use inferbench::channel::{Marker, Receiver, Sender};
use inferbench::config::{ChannelConfig, Framing};
use inferbench::power::PowerWindow;

/// Sends start/end marker pairs followed by `done_transmit`, optionally to
/// an in-process receiver.
#[derive(Parser)]
#[command(name = "telemetry_demo")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value = "5005")]
    port: u16,

    /// Marker pairs to send
    #[arg(long, default_value = "10")]
    pairs: usize,

    /// Pause between pairs in milliseconds
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Spawn a receiver in this process instead of targeting a remote one
    #[arg(long)]
    local: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = ChannelConfig {
        host: args.host,
        port: args.port,
        framing: Framing::Newline,
        stop_on_end: false,
        ..ChannelConfig::default()
    };

    let receiver_task = if args.local {
        config.port = 0;
        let receiver = Receiver::bind(&config)?;
        config.port = receiver.local_addr()?.port();
        Some(tokio::spawn(async move {
            let mut session = receiver.accept().await?;
            session.run(None).await
        }))
    } else {
        None
    };

    let mut sender = Sender::connect_with(&config).await?;
    for n in 0..args.pairs {
        sender.send(&Marker::ProfileStart).await?;
        sender.send(&Marker::ProfileEnd).await?;
        info!("sent pair {}", n + 1);
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }
    sender.send(&Marker::Done).await?;
    sender.close().await?;

    if let Some(task) = receiver_task {
        let receipts = task.await??;
        println!("Receiver recorded {} markers", receipts.len());
        match PowerWindow::from_receipts(&receipts) {
            Ok(Some(window)) => println!("First window: {:.3}s", window.duration_secs()),
            Ok(None) => println!("No complete window received"),
            // both markers of a pair can land in one read
            Err(e) => println!("First window unusable: {}", e),
        }
    }

    Ok(())
}
