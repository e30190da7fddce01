use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rtspipe::{Server, ServerConfig};

#[derive(Parser)]
#[command(
    name = "rtspipe-server",
    about = "RTSP server streaming a piped H.264 elementary stream"
)]
struct Args {
    /// Bind address (host:port)
    #[arg(long, short, default_value = "0.0.0.0:8554")]
    bind: String,

    /// Read the H.264 stream from this file instead of standard input
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Public host to advertise in the SDP (defaults to the request host)
    #[arg(long)]
    public_host: Option<String>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = ServerConfig {
        public_host: args.public_host,
        ..ServerConfig::default()
    };

    let mut server = match args.input {
        Some(path) => Server::with_source_and_config(
            &args.bind,
            Arc::new(move || Ok(Box::new(File::open(&path)?) as Box<dyn Read + Send>)),
            config,
        ),
        None => Server::with_source_and_config(
            &args.bind,
            Arc::new(|| Ok(Box::new(std::io::stdin()) as Box<dyn Read + Send>)),
            config,
        ),
    };

    if let Err(e) = server.start() {
        eprintln!("Failed to start server: {}", e);
        std::process::exit(1);
    }

    println!("RTSP server on {}", args.bind);

    // Stdin may be the media stream, so there is no console to wait on.
    // Run until killed.
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}
