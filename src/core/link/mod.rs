//! Protocol engine driving the terminal link
//!
//! Owns the connect/disconnect lifecycle, the serialized
//! send/ACK/response state machine with bounded retries, and the
//! receive reassembler that turns the inbound byte stream into
//! validated frames.

use crate::config::LinkConfig;
use crate::core::codec::{JobCode, ParsedFrame};
use crate::core::transport::{ByteChannel, SerialConfig, SerialTransport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

mod reassembly;

pub use reassembly::{Reassembler, RxItem};

/// Positive handshake byte
pub const ACK: u8 = 0x06;
/// Negative handshake byte
pub const NACK: u8 = 0x15;

/// Protocol engine errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Operation attempted while disconnected
    #[error("not connected")]
    NotConnected,

    /// All send attempts failed
    #[error("max retries exceeded after {0} attempts")]
    MaxRetriesExceeded(u32),

    /// ACK received but no response frame arrived in time
    #[error("response timeout")]
    ResponseTimeout,

    /// The link was disconnected while a send was outstanding
    #[error("disconnecting")]
    Disconnecting,

    /// Channel-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outbound notifications from the engine.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Channel opened
    Connected,
    /// Channel closed
    Disconnected,
    /// Unsolicited device-originated frame
    Event(ParsedFrame),
    /// Valid frame received with no request outstanding
    UnexpectedPacket(ParsedFrame),
}

/// The single in-flight wait.
///
/// Sends are serialized, so at most one of these exists at a time; the
/// reassembler resolves it unconditionally (no correlation id is
/// carried on the wire). The response sender is installed together
/// with the handshake wait so that a response arriving immediately
/// after the ACK cannot slip past the slot.
enum Pending {
    /// Awaiting the single-byte ACK/NACK handshake
    Handshake {
        ack: oneshot::Sender<bool>,
        response: Option<oneshot::Sender<ParsedFrame>>,
    },
    /// Awaiting a full response frame
    Response(oneshot::Sender<ParsedFrame>),
}

type PendingSlot = Arc<parking_lot::Mutex<Option<Pending>>>;

/// Protocol engine for a TL3600-class payment terminal.
pub struct TerminalLink {
    config: LinkConfig,
    channel: Arc<tokio::sync::Mutex<Box<dyn ByteChannel>>>,
    connected: Arc<AtomicBool>,
    event_tx: broadcast::Sender<LinkEvent>,
    pending: PendingSlot,
    /// Serializes `send_packet` callers
    send_gate: tokio::sync::Mutex<()>,
    pump: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TerminalLink {
    /// Open a serial connection to the terminal.
    ///
    /// Line parameters come from the configuration; `baud` overrides
    /// the configured baud rate when given.
    pub async fn connect(
        port: &str,
        baud: Option<u32>,
        config: LinkConfig,
    ) -> Result<Self, LinkError> {
        let serial = SerialConfig::new(port, baud.unwrap_or(config.baud_rate))
            .data_bits(config.data_bits)
            .stop_bits(config.stop_bits)
            .parity(config.parity);
        Self::connect_channel(Box::new(SerialTransport::new(serial)), config).await
    }

    /// Open the link over an arbitrary byte channel.
    pub async fn connect_channel(
        mut channel: Box<dyn ByteChannel>,
        config: LinkConfig,
    ) -> Result<Self, LinkError> {
        channel.connect().await?;
        tracing::info!(info = %channel.connection_info(), "terminal link connected");

        let (event_tx, _) = broadcast::channel(256);
        let link = Self {
            config,
            channel: Arc::new(tokio::sync::Mutex::new(channel)),
            connected: Arc::new(AtomicBool::new(true)),
            event_tx: event_tx.clone(),
            pending: Arc::new(parking_lot::Mutex::new(None)),
            send_gate: tokio::sync::Mutex::new(()),
            pump: parking_lot::Mutex::new(None),
        };

        let handle = tokio::spawn(Self::pump_loop(
            link.channel.clone(),
            link.connected.clone(),
            link.pending.clone(),
            event_tx.clone(),
        ));
        *link.pump.lock() = Some(handle);

        let _ = event_tx.send(LinkEvent::Connected);
        Ok(link)
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Subscribe to engine notifications
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.event_tx.subscribe()
    }

    /// Engine configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Close the link.
    ///
    /// Any outstanding send is rejected with [`LinkError::Disconnecting`]
    /// and its timers are released.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Dropping the pending senders rejects the waiters
        self.pending.lock().take();

        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }

        {
            let mut channel = self.channel.lock().await;
            let _ = channel.disconnect().await;
        }

        tracing::info!("terminal link disconnected");
        let _ = self.event_tx.send(LinkEvent::Disconnected);
        Ok(())
    }

    /// Send a built frame to the terminal.
    ///
    /// Retries the write/handshake cycle up to the configured attempt
    /// bound on NACK or ACK timeout. When `expect_response` is set, a
    /// checksum-valid response frame is awaited after the ACK and
    /// acknowledged back with an ACK byte before being returned. A
    /// response timeout does NOT resend: after a delivered request the
    /// terminal may already have charged the card.
    pub async fn send_packet(
        &self,
        frame: &[u8],
        expect_response: bool,
    ) -> Result<Option<ParsedFrame>, LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }

        let _gate = self.send_gate.lock().await;
        let max_attempts = self.config.max_retries.max(1);

        for attempt in 1..=max_attempts {
            let (ack_tx, ack_rx) = oneshot::channel();
            let (response_tx, response_rx) = oneshot::channel();
            *self.pending.lock() = Some(Pending::Handshake {
                ack: ack_tx,
                response: expect_response.then_some(response_tx),
            });

            {
                let mut channel = self.channel.lock().await;
                channel.send(frame).await?;
            }
            tracing::debug!(attempt, frame = %hex::encode(frame), "frame written");

            match tokio::time::timeout(self.config.ack_timeout(), ack_rx).await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    tracing::warn!(attempt, "terminal NACKed frame");
                    continue;
                }
                Ok(Err(_)) => return Err(LinkError::Disconnecting),
                Err(_) => {
                    tracing::warn!(attempt, "handshake timeout");
                    self.pending.lock().take();
                    continue;
                }
            }

            if !expect_response {
                return Ok(None);
            }

            match tokio::time::timeout(self.config.response_timeout(), response_rx).await {
                Ok(Ok(response)) => {
                    // Acknowledge receipt before handing the frame up
                    let mut channel = self.channel.lock().await;
                    channel.send(&[ACK]).await?;
                    return Ok(Some(response));
                }
                Ok(Err(_)) => return Err(LinkError::Disconnecting),
                Err(_) => {
                    self.pending.lock().take();
                    return Err(LinkError::ResponseTimeout);
                }
            }
        }

        Err(LinkError::MaxRetriesExceeded(max_attempts))
    }

    /// Receive pump: polls the channel and feeds the reassembler.
    async fn pump_loop(
        channel: Arc<tokio::sync::Mutex<Box<dyn ByteChannel>>>,
        connected: Arc<AtomicBool>,
        pending: PendingSlot,
        event_tx: broadcast::Sender<LinkEvent>,
    ) {
        let mut reassembler = Reassembler::new();

        loop {
            if !connected.load(Ordering::SeqCst) {
                break;
            }

            let chunk = {
                let mut channel = channel.lock().await;
                channel.receive().await
            };

            match chunk {
                Ok(bytes) if !bytes.is_empty() => {
                    for item in reassembler.feed(&bytes) {
                        Self::dispatch(item, &channel, &pending, &event_tx).await;
                    }
                }
                Ok(_) => {
                    // No data, let senders at the channel
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                }
                Err(TransportError::Disconnected) => {
                    connected.store(false, Ordering::SeqCst);
                    pending.lock().take();
                    let _ = event_tx.send(LinkEvent::Disconnected);
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "channel receive failed");
                    connected.store(false, Ordering::SeqCst);
                    pending.lock().take();
                    let _ = event_tx.send(LinkEvent::Disconnected);
                    break;
                }
            }
        }
    }

    /// React to one reassembled item.
    async fn dispatch(
        item: RxItem,
        channel: &Arc<tokio::sync::Mutex<Box<dyn ByteChannel>>>,
        pending: &PendingSlot,
        event_tx: &broadcast::Sender<LinkEvent>,
    ) {
        match item {
            RxItem::Handshake(positive) => {
                let mut slot = pending.lock();
                match slot.take() {
                    Some(Pending::Handshake { ack, response }) => {
                        if positive {
                            // Hand the slot over to the response wait
                            *slot = response.map(Pending::Response);
                        }
                        let _ = ack.send(positive);
                    }
                    other => {
                        tracing::debug!(positive, "stray handshake byte ignored");
                        *slot = other;
                    }
                }
            }
            RxItem::Invalid => {
                tracing::warn!("invalid frame received, NACKing");
                let mut channel = channel.lock().await;
                if let Err(e) = channel.send(&[NACK]).await {
                    tracing::warn!(error = %e, "failed to write NACK");
                }
            }
            RxItem::Frame(frame) => {
                if frame.job == JobCode::EventResponse {
                    // Spontaneous device notification, outside the
                    // request/response handshake; no ACK is sent
                    let _ = event_tx.send(LinkEvent::Event(frame));
                    return;
                }

                let waiter = {
                    let mut slot = pending.lock();
                    match slot.take() {
                        Some(Pending::Response(tx)) => Some(tx),
                        other => {
                            *slot = other;
                            None
                        }
                    }
                };

                match waiter {
                    Some(tx) => {
                        let _ = tx.send(frame);
                    }
                    None => {
                        tracing::debug!(job = frame.job.name(), "frame with no request outstanding");
                        let _ = event_tx.send(LinkEvent::UnexpectedPacket(frame));
                    }
                }
            }
        }
    }
}

impl Drop for TerminalLink {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}
