//! MLLP listener binary: receives HL7 messages and answers each with an
//! application-accept acknowledgment.
//!
//! Point a publisher (or netcat with MLLP-wrapped bytes) at the configured
//! port; received messages are written to the log.

use clap::Parser;
use log::info;

use hl7_vitals_mllp::MllpServer;

#[derive(Parser)]
#[command(name = "mllp-listener", about = "Receive HL7 messages over MLLP")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 2575)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let server = MllpServer::bind(&format!("{}:{}", args.host, args.port)).await?;
    server
        .run(|message| {
            info!("received message:\n{}", message.replace('\r', "\n"));
        })
        .await?;
    Ok(())
}
