use clap::Parser;
use log::{info, warn};
use server::bluffer;
use server::directory::Directory;
use server::game::GameRegistry;
use server::network::Server;
use server::questions::QuestionBank;
use std::path::PathBuf;
use std::sync::Arc;

/// Main-method of the application.
/// Parses command-line arguments, then runs the game server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Port to listen on
        port: u16,
        /// Path of the JSON question bank used by Bluffer
        questions: PathBuf,
        /// IP address to bind to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
    }

    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    // The bank is re-read for every game; a bad file only rejects STARTGAME
    match QuestionBank::load(&args.questions) {
        Ok(bank) => info!(
            "Loaded {} questions from {}",
            bank.len(),
            args.questions.display()
        ),
        Err(e) => warn!("{}", e),
    }

    let games =
        GameRegistry::new().register(bluffer::NAME, bluffer::constructor(args.questions));
    let directory = Arc::new(Directory::new(games));

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, directory).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            println!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    Ok(())
}
