/*!
# HL7 v2 vital-signs messaging over MLLP.

This crate builds HL7 v2.5 ORU^R01 messages from typed vital-sign
observations and carries them over MLLP, HL7's minimal framing protocol for
TCP transports (`0x0B` + message + `0x1C 0x0D`). Both ends of the exchange
are covered: a publisher connection that sends framed messages and collects
acknowledgments, and a listener that extracts messages from the byte stream
and answers each with an `MSA|AA` ack.

The pieces compose bottom-up: [`message`] renders fields, segments and whole
messages as text; [`codec::MllpCodec`] is a [tokio codec] that frames and
unframes payload bytes; [`client::MllpClient`] and [`server::MllpServer`]
own the connection lifecycles on top of it. [`sim`] adds random-walk device
models (monitor, ventilator, infusion pump) that feed the publisher binary.

[tokio codec]: https://docs.rs/tokio-util/latest/tokio_util/codec/index.html

## Example: publisher

```no_run
use hl7_vitals_mllp::{MllpClient, OruBuilder};

#[tokio::main]
async fn main() -> hl7_vitals_mllp::Result<()> {
    let mut builder = OruBuilder::new().sending_app("MONITOR_SIM");
    let message = builder.build_message("123456", "DOE^JOHN", "MONITOR^ICU-01", &[], None);

    let mut client = MllpClient::new("127.0.0.1", 2575);
    match client.send(&message).await? {
        Some(ack) => println!("ack received: {:?}", ack),
        None => println!("no ack received"),
    }
    Ok(())
}
```

## Example: listener

```no_run
use hl7_vitals_mllp::MllpServer;

#[tokio::main]
async fn main() -> hl7_vitals_mllp::Result<()> {
    let server = MllpServer::bind("127.0.0.1:2575").await?;
    server
        .run(|message| println!("received: {:?}", message))
        .await
}
```

## Concurrency

A client send is synchronous end-to-end (write, then one bounded read for
the ack); a connection must not be driven by concurrent senders, which
`&mut self` enforces. The listener serves each accepted connection from its
own task with its own receive buffer. An acknowledgment read timing out is a
normal outcome, never an error; cancellation is closing the connection.
*/

pub mod client;
pub mod codec;
pub mod error;
pub mod message;
pub mod server;
pub mod sim;

pub use client::MllpClient;
pub use codec::MllpCodec;
pub use error::{MllpError, Result};
pub use message::{ack_message, control_id, ControlIdSequence, Field, Metric, OruBuilder, Units};
pub use server::MllpServer;
