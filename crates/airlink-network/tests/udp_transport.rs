//! Integration tests for UdpTransport
//!
//! These tests run a fake device on a loopback UDP socket and exercise the
//! reply, timeout and invalid-reply paths with real network I/O.

use airlink_core::SessionKey;
use airlink_network::{Transport, TransportError, UdpTransport, UdpTransportConfig};
use airlink_protocol::{
    Envelope, EnvelopeCodec, MessageType, PackCipher, bind_request, parse_bind_reply,
    parse_scan_reply, scan_request,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::udp::UdpFramed;

const CID: &str = "f4911e7aca7b";
const KEY: &str = "Ab1Cd2Ef3Gh4Ij5K";

fn transport(timeout_ms: u64) -> UdpTransport {
    UdpTransport::new(UdpTransportConfig {
        timeout: Duration::from_millis(timeout_ms),
        ..Default::default()
    })
}

fn generic_reply(payload: serde_json::Value) -> Envelope {
    let pack = PackCipher::generic().encrypt(&payload).unwrap();
    let mut envelope = Envelope::device_pack("", 0, pack);
    envelope.cid = Some(CID.to_string());
    envelope
}

/// Spawn a fake device that answers scans and binds, then return its address.
async fn spawn_fake_device() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let mut framed = UdpFramed::new(socket, EnvelopeCodec::new());

    tokio::spawn(async move {
        while let Some(Ok((request, from))) = framed.next().await {
            let reply = if request.is(MessageType::Scan) {
                generic_reply(json!({"t": "dev", "cid": CID, "mac": CID, "name": "office"}))
            } else if request.is(MessageType::Bind) && request.mac.as_deref() == Some(CID) {
                generic_reply(json!({"t": "bindok", "mac": CID, "key": KEY}))
            } else {
                continue;
            };
            framed.send((reply, from)).await.unwrap();
        }
    });

    addr
}

#[tokio::test]
async fn test_scan_and_bind_with_fake_device() {
    let addr = spawn_fake_device().await;
    let transport = transport(1000);

    let reply = transport.send(scan_request(), addr).await.unwrap().unwrap();
    let identity = parse_scan_reply(&reply, addr).unwrap();
    assert_eq!(identity.cid, CID);
    assert_eq!(identity.name.as_deref(), Some("office"));

    let reply = transport
        .send(bind_request(&identity.cid), addr)
        .await
        .unwrap()
        .unwrap();
    let key = parse_bind_reply(&reply).unwrap();
    assert_eq!(key, KEY.parse::<SessionKey>().unwrap());
}

#[tokio::test]
async fn test_silent_device_times_out() {
    // Bound but never reads, so no reply ever comes back.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();

    let started = std::time::Instant::now();
    let result = transport(100).send(scan_request(), addr).await.unwrap();

    assert!(result.is_none());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_invalid_reply_is_an_error() {
    let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = device.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 256];
        let (_, from) = device.recv_from(&mut buf).await.unwrap();
        device.send_to(b"{not json", from).await.unwrap();
    });

    let result = transport(1000).send(scan_request(), addr).await;
    assert!(matches!(result, Err(TransportError::Protocol(_))));
}

#[tokio::test]
async fn test_each_exchange_uses_a_fresh_socket() {
    let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = device.local_addr().unwrap();
    let transport = transport(200);

    let first = tokio::spawn({
        let transport = transport.clone();
        async move { transport.send(scan_request(), addr).await }
    });
    let second = tokio::spawn(async move { transport.send(scan_request(), addr).await });

    let mut buf = [0u8; 256];
    let (_, first_from) = device.recv_from(&mut buf).await.unwrap();
    let (_, second_from) = device.recv_from(&mut buf).await.unwrap();
    assert_ne!(first_from.port(), second_from.port());

    assert!(first.await.unwrap().unwrap().is_none());
    assert!(second.await.unwrap().unwrap().is_none());
}

#[tokio::test]
async fn test_discover_collects_replies() {
    let addr = spawn_fake_device().await;

    let replies = transport(1000)
        .discover(addr, Duration::from_millis(200))
        .await
        .unwrap();

    assert_eq!(replies.len(), 1);
    let (reply, from) = &replies[0];
    assert_eq!(*from, addr);
    assert_eq!(parse_scan_reply(reply, *from).unwrap().cid, CID);
}
