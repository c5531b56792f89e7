//! End-to-end protocol scenarios over a scripted byte channel
//!
//! The mock channel plays the terminal's side of the dialog: each
//! frame write consumes one script entry and queues its chunks for
//! delivery, exactly as the device would reply on the line.

use async_trait::async_trait;
use bytes::Bytes;
use payterm_core::core::codec::{push_numeric, push_text, put_fixed};
use payterm_core::{
    build_approval_request, build_frame, decode_response, ApprovalRequest, ByteChannel, EventType,
    JobCode, LinkConfig, LinkError, LinkEvent, ResponsePayload, TerminalLink, TransactionKind,
    TransportError, ACK, NACK,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Chunks the terminal sends back after one request frame write.
type ScriptEntry = Vec<Vec<u8>>;

#[derive(Clone, Default)]
struct MockHandle {
    script: Arc<Mutex<VecDeque<ScriptEntry>>>,
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    connected: Arc<AtomicBool>,
}

impl MockHandle {
    fn reply(&self, entry: ScriptEntry) {
        self.script.lock().unwrap().push_back(entry);
    }

    /// Deliver bytes unprompted, as the device does for events.
    fn inject(&self, chunk: &[u8]) {
        self.inbound.lock().unwrap().push_back(chunk.to_vec());
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    /// Writes that are request frames, not handshake bytes.
    fn frame_writes(&self) -> usize {
        self.writes().iter().filter(|w| w.len() > 1).count()
    }
}

struct MockChannel {
    handle: MockHandle,
}

fn mock_channel() -> (MockChannel, MockHandle) {
    let handle = MockHandle::default();
    (
        MockChannel {
            handle: handle.clone(),
        },
        handle,
    )
}

#[async_trait]
impl ByteChannel for MockChannel {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.handle.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.handle.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.connected.load(Ordering::SeqCst)
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.handle.writes.lock().unwrap().push(data.to_vec());

        // Handshake bytes from the engine do not advance the script
        if data.len() == 1 && (data[0] == ACK || data[0] == NACK) {
            return Ok(data.len());
        }

        let entry = self.handle.script.lock().unwrap().pop_front();
        if let Some(chunks) = entry {
            let mut inbound = self.handle.inbound.lock().unwrap();
            for chunk in chunks {
                inbound.push_back(chunk);
            }
        }
        Ok(data.len())
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        if let Some(chunk) = self.handle.inbound.lock().unwrap().pop_front() {
            return Ok(Bytes::from(chunk));
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(Bytes::new())
    }

    fn connection_info(&self) -> String {
        "mock terminal".to_string()
    }
}

fn test_config() -> LinkConfig {
    LinkConfig::default()
        .ack_timeout_ms(100)
        .response_timeout_ms(300)
        .max_retries(3)
}

fn approval_response_payload(response: u8, amount: u64, issuer: &[u8], acquirer: &[u8]) -> Vec<u8> {
    let mut p = Vec::with_capacity(161);
    p.push(response);
    p.push(b'I');
    push_text(&mut p, "123456******7890", 20, b' ');
    push_numeric(&mut p, amount, 10).unwrap();
    push_numeric(&mut p, 0, 8).unwrap();
    push_numeric(&mut p, 0, 8).unwrap();
    push_numeric(&mut p, 0, 2).unwrap();
    push_text(&mut p, "A0012345", 12, b' ');
    push_text(&mut p, "20260806", 8, b' ');
    push_text(&mut p, "101502", 6, b' ');
    push_text(&mut p, "TXN0000000000001", 20, b' ');
    push_text(&mut p, "MERCHANT0000001", 15, b' ');
    push_text(&mut p, "T000000001", 10, b' ');
    for region_src in [issuer, acquirer] {
        let mut region = vec![b' '; 20];
        put_fixed(&mut region, region_src);
        p.extend_from_slice(&region);
    }
    assert_eq!(p.len(), 161);
    p
}

fn approval_response_frame(response: u8, amount: u64, issuer: &[u8], acquirer: &[u8]) -> Vec<u8> {
    let payload = approval_response_payload(response, amount, issuer, acquirer);
    build_frame("TERM0001", JobCode::ApprovalResponse, &payload).unwrap()
}

async fn connect_mock() -> (TerminalLink, MockHandle) {
    let (channel, handle) = mock_channel();
    let link = TerminalLink::connect_channel(Box::new(channel), test_config())
        .await
        .unwrap();
    (link, handle)
}

#[tokio::test]
async fn clean_approval_round_trip() {
    let (link, handle) = connect_mock().await;

    let response = approval_response_frame(b'O', 5000, b"11KB CARD", b"22SHINHAN");
    handle.reply(vec![vec![ACK], response]);

    let request = ApprovalRequest::simple(TransactionKind::Credit, 5000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let parsed = link.send_packet(&frame, true).await.unwrap().unwrap();
    assert!(parsed.is_valid);
    assert_eq!(parsed.job, JobCode::ApprovalResponse);

    let decoded = match decode_response(&parsed).unwrap() {
        ResponsePayload::Approval(approval) => approval,
        other => panic!("expected approval, got {other:?}"),
    };
    assert_eq!(decoded.approved_amount, 5000);
    assert!(!decoded.is_rejected);

    // the engine acknowledged receipt of the response
    let writes = handle.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], frame);
    assert_eq!(writes[1], vec![ACK]);
}

#[tokio::test]
async fn nack_then_success_on_retry() {
    let (link, handle) = connect_mock().await;

    handle.reply(vec![vec![NACK]]);
    let response = approval_response_frame(b'O', 1000, b"11KB CARD", b"22SHINHAN");
    handle.reply(vec![vec![ACK], response]);

    let request = ApprovalRequest::simple(TransactionKind::Credit, 1000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let parsed = link.send_packet(&frame, true).await.unwrap().unwrap();
    assert!(parsed.is_valid);
    assert_eq!(handle.frame_writes(), 2);
}

#[tokio::test]
async fn exhausted_retries_fail_with_reason() {
    let (link, handle) = connect_mock().await;

    for _ in 0..3 {
        handle.reply(vec![vec![NACK]]);
    }

    let request = ApprovalRequest::simple(TransactionKind::Credit, 1000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let err = link.send_packet(&frame, true).await.unwrap_err();
    assert!(matches!(err, LinkError::MaxRetriesExceeded(3)));

    // exactly the configured attempt count, nothing after
    assert_eq!(handle.writes().len(), 3);
    assert_eq!(handle.frame_writes(), 3);
}

#[tokio::test]
async fn ack_timeout_retries_then_succeeds() {
    let (link, handle) = connect_mock().await;

    handle.reply(vec![]); // silence: no handshake at all
    handle.reply(vec![vec![ACK]]);

    let request = ApprovalRequest::simple(TransactionKind::Credit, 1000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let result = link.send_packet(&frame, false).await.unwrap();
    assert!(result.is_none());
    assert_eq!(handle.frame_writes(), 2);
}

#[tokio::test]
async fn response_timeout_does_not_resend() {
    let (link, handle) = connect_mock().await;

    handle.reply(vec![vec![ACK]]); // handshake, then silence

    let request = ApprovalRequest::simple(TransactionKind::Credit, 1000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let err = link.send_packet(&frame, true).await.unwrap_err();
    assert!(matches!(err, LinkError::ResponseTimeout));
    assert_eq!(handle.frame_writes(), 1);
}

#[tokio::test]
async fn rejected_transaction_maps_error_table() {
    let (link, handle) = connect_mock().await;

    let response = approval_response_frame(b'X', 0, b"DECLINED", b"-07SOME TEXT");
    handle.reply(vec![vec![ACK], response]);

    let request = ApprovalRequest::simple(TransactionKind::Credit, 5000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let parsed = link.send_packet(&frame, true).await.unwrap().unwrap();
    let decoded = match decode_response(&parsed).unwrap() {
        ResponsePayload::Approval(approval) => approval,
        other => panic!("expected approval record, got {other:?}"),
    };

    // a declined card is a decoded outcome, not a protocol failure
    assert!(decoded.is_rejected);
    assert_eq!(decoded.reject_code.as_deref(), Some("07"));
    assert_eq!(decoded.reject_message.as_deref(), Some("Pick up card"));
}

#[tokio::test]
async fn response_with_noise_and_split_chunks() {
    let (link, handle) = connect_mock().await;

    let response = approval_response_frame(b'O', 700, b"11KB CARD", b"22SHINHAN");
    let (head, tail) = response.split_at(40);
    let mut noisy_head = vec![0xFF, 0x00, 0x7E];
    noisy_head.extend_from_slice(head);
    handle.reply(vec![vec![ACK], noisy_head, tail.to_vec()]);

    let request = ApprovalRequest::simple(TransactionKind::Credit, 700);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let parsed = link.send_packet(&frame, true).await.unwrap().unwrap();
    assert!(parsed.is_valid);
    assert_eq!(parsed.job, JobCode::ApprovalResponse);
}

#[tokio::test]
async fn corrupted_response_is_nacked() {
    let (link, handle) = connect_mock().await;

    let mut corrupted = approval_response_frame(b'O', 700, b"11KB CARD", b"22SHINHAN");
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;
    handle.reply(vec![vec![ACK], corrupted]);

    let request = ApprovalRequest::simple(TransactionKind::Credit, 700);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    // the corrupted frame is discarded, so the response wait times out
    let err = link.send_packet(&frame, true).await.unwrap_err();
    assert!(matches!(err, LinkError::ResponseTimeout));

    // engine pushed a NACK back at the device
    assert!(handle.writes().iter().any(|w| w == &vec![NACK]));
}

#[tokio::test]
async fn unsolicited_event_reaches_subscribers_without_ack() {
    let (link, handle) = connect_mock().await;
    let mut events = link.subscribe();

    let frame = build_frame("TERM0001", JobCode::EventResponse, b"1").unwrap();
    handle.inject(&frame);

    let event = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match events.recv().await.unwrap() {
                LinkEvent::Event(frame) => break frame,
                _ => continue,
            }
        }
    })
    .await
    .unwrap();

    let decoded = match decode_response(&event).unwrap() {
        ResponsePayload::Event(event) => event,
        other => panic!("expected event, got {other:?}"),
    };
    assert_eq!(decoded.event, EventType::CardInserted);

    // spontaneous notifications bypass the handshake entirely
    assert!(handle.writes().is_empty());
}

#[tokio::test]
async fn unexpected_packet_is_surfaced_not_dropped() {
    let (link, handle) = connect_mock().await;
    let mut events = link.subscribe();

    let frame = build_frame("TERM0001", JobCode::DeviceCheck, b"0000").unwrap();
    handle.inject(&frame);

    let unexpected = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match events.recv().await.unwrap() {
                LinkEvent::UnexpectedPacket(frame) => break frame,
                _ => continue,
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(unexpected.job, JobCode::DeviceCheck);
}

#[tokio::test]
async fn send_while_disconnected_fails_fast() {
    let (link, handle) = connect_mock().await;
    link.disconnect().await.unwrap();
    assert!(!link.is_connected());

    let request = ApprovalRequest::simple(TransactionKind::Credit, 1000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let err = link.send_packet(&frame, true).await.unwrap_err();
    assert!(matches!(err, LinkError::NotConnected));
    assert_eq!(handle.frame_writes(), 0);
}

#[tokio::test]
async fn disconnect_rejects_outstanding_send() {
    let (link, handle) = connect_mock().await;
    let link = Arc::new(link);

    handle.reply(vec![vec![ACK]]); // ACK arrives, response never does

    let request = ApprovalRequest::simple(TransactionKind::Credit, 1000);
    let frame = build_approval_request("TERM0001", &request).unwrap();

    let sender = {
        let link = link.clone();
        tokio::spawn(async move { link.send_packet(&frame, true).await })
    };

    tokio::time::sleep(Duration::from_millis(80)).await;
    link.disconnect().await.unwrap();

    let err = sender.await.unwrap().unwrap_err();
    assert!(matches!(err, LinkError::Disconnecting));
}

#[tokio::test]
async fn disconnect_emits_event() {
    let (link, _handle) = connect_mock().await;
    let mut events = link.subscribe();

    link.disconnect().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, LinkEvent::Disconnected));
}
