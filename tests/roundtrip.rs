//! End-to-end publisher/listener exchanges over a real socket.

use std::time::Duration;

use hl7_vitals_mllp::sim::{DeviceModel, MonitorModel};
use hl7_vitals_mllp::{message, MllpClient, MllpServer, OruBuilder};

async fn start_listener() -> u16 {
    let server = MllpServer::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    tokio::spawn(server.run(|_message| {}));
    port
}

fn vitals_message(builder: &mut OruBuilder) -> String {
    let mut model = MonitorModel::new(Some(7));
    model.step();
    let now = message::now_timestamp();
    let observations = model.observations(builder, &now);
    builder.build_message("123456", "DOE^JOHN", "MONITOR^ICU-01", &observations, Some(&now))
}

#[tokio::test]
async fn ack_echoes_the_message_control_id() {
    let port = start_listener().await;

    let mut builder = OruBuilder::new();
    let msg = vitals_message(&mut builder);
    let control = message::control_id(&msg).unwrap().to_string();

    let mut client = MllpClient::new("127.0.0.1", port).timeout(Duration::from_secs(5));
    let ack = client
        .send(&msg)
        .await
        .unwrap()
        .expect("listener should ack");

    let msa = ack.split('\r').nth(1).unwrap();
    assert_eq!(msa, format!("MSA|AA|{}", control));
    assert!(client.is_connected(), "keep-alive holds the link open");

    client.close();
    client.close(); // idempotent
    assert!(!client.is_connected());
}

#[tokio::test]
async fn consecutive_sends_reuse_one_connection() {
    let port = start_listener().await;

    let mut builder = OruBuilder::new();
    let mut client = MllpClient::new("127.0.0.1", port).timeout(Duration::from_secs(5));

    for _ in 0..3 {
        let msg = vitals_message(&mut builder);
        let ack = client.send(&msg).await.unwrap().unwrap();
        assert!(ack.contains("MSA|AA|MSG"));
        assert!(client.is_connected());
    }
}

#[tokio::test]
async fn without_keepalive_every_send_closes_the_connection() {
    let port = start_listener().await;

    let mut builder = OruBuilder::new();
    let mut client = MllpClient::new("127.0.0.1", port)
        .timeout(Duration::from_secs(5))
        .keepalive(false);

    for _ in 0..2 {
        let msg = vitals_message(&mut builder);
        let ack = client.send(&msg).await.unwrap();
        assert!(ack.unwrap().contains("MSA|AA|"));
        assert!(!client.is_connected());
    }
}

#[tokio::test]
async fn silent_peer_yields_no_ack() {
    // Accepts the connection but never writes back.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let mut client = MllpClient::new("127.0.0.1", port).timeout(Duration::from_millis(200));
    let mut builder = OruBuilder::new();
    let msg = vitals_message(&mut builder);

    let ack = client.send(&msg).await.unwrap();
    assert_eq!(ack, None, "a read timeout is no-ack, not an error");
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // Bind then drop to find a port nothing is listening on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut client = MllpClient::new("127.0.0.1", port).timeout(Duration::from_secs(1));
    let mut builder = OruBuilder::new();
    let msg = vitals_message(&mut builder);

    assert!(client.send(&msg).await.is_err());
    assert!(
        !client.is_connected(),
        "a failed send leaves the client cleanly disconnected"
    );
}
