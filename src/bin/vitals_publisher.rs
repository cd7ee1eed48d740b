//! Vital-signs publisher binary: steps a simulated ICU device and sends one
//! ORU^R01 message per tick over MLLP, to stdout, or both.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::info;

use hl7_vitals_mllp::message;
use hl7_vitals_mllp::sim::{DeviceModel, MonitorModel, PumpModel, VentilatorModel};
use hl7_vitals_mllp::{MllpClient, OruBuilder};

#[derive(Clone, Copy, ValueEnum)]
enum Device {
    Monitor,
    Ventilator,
    Pump,
}

#[derive(Parser)]
#[command(name = "vitals-publisher", about = "Simulate an ICU device feed over MLLP")]
struct Args {
    /// Which device model to simulate.
    #[arg(long, value_enum, default_value = "monitor")]
    device: Device,
    #[arg(long)]
    mllp_host: Option<String>,
    #[arg(long)]
    mllp_port: Option<u16>,
    /// Print each message to stdout.
    #[arg(long)]
    stdout: bool,
    /// Seconds between messages.
    #[arg(long, default_value_t = 1.0)]
    interval: f64,
    /// Number of messages to send (0 = run until interrupted).
    #[arg(long, default_value_t = 0)]
    count: u64,
    #[arg(long, default_value = "123456")]
    patient_id: String,
    /// HL7 XPN format: LAST^FIRST.
    #[arg(long, default_value = "DOE^JOHN")]
    patient_name: String,
    /// Overrides the model's default device id.
    #[arg(long)]
    device_id: Option<String>,
    /// Random seed for a reproducible walk.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if !args.stdout && (args.mllp_host.is_none() || args.mllp_port.is_none()) {
        return Err("choose an output: --stdout or --mllp-host/--mllp-port".into());
    }

    let (mut model, sending_app): (Box<dyn DeviceModel>, &str) = match args.device {
        Device::Monitor => (Box::new(MonitorModel::new(args.seed)), "MONITOR_SIM"),
        Device::Ventilator => (Box::new(VentilatorModel::new(args.seed)), "VENTILATOR_SIM"),
        Device::Pump => (Box::new(PumpModel::new(args.seed)), "PUMP_SIM"),
    };
    let device_id = args
        .device_id
        .clone()
        .unwrap_or_else(|| model.default_device_id().to_string());

    let mut builder = OruBuilder::new().sending_app(sending_app);
    let mut client = match (&args.mllp_host, args.mllp_port) {
        (Some(host), Some(port)) => Some(MllpClient::new(host.clone(), port)),
        _ => None,
    };

    let mut sent = 0u64;
    loop {
        model.step();
        let now = message::now_timestamp();
        let observations = model.observations(&builder, &now);
        let msg = builder.build_message(
            &args.patient_id,
            &args.patient_name,
            &device_id,
            &observations,
            Some(&now),
        );

        if args.stdout {
            println!("{}", msg);
        }
        if let Some(client) = client.as_mut() {
            match client.send(&msg).await? {
                Some(ack) => info!("ack received:\n{}", ack.replace('\r', "\n")),
                None => info!("no ack received"),
            }
        }

        sent += 1;
        if args.count != 0 && sent >= args.count {
            break;
        }
        tokio::time::sleep(Duration::from_secs_f64(args.interval.max(0.05))).await;
    }

    if let Some(client) = client.as_mut() {
        client.close();
    }
    Ok(())
}
