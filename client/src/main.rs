use clap::Parser;
use client::network::Client;
use log::info;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    host: String,

    /// Server port to connect to
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Connecting to: {}", address);

    let client = match Client::connect(&address).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Cannot connect to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    client
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    println!("Client disconnected");
    Ok(())
}
