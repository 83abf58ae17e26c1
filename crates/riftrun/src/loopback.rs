//! In-process loopback channel.
//!
//! Connects a [`crate::client::Client`] to an [`crate::server::EngineHost`]
//! inside one process over tokio mpsc channels. This is the transport the
//! test suite runs on; socket transports plug in behind the same traits.

use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::transport;
use crate::transport::Endpoint;
use crate::transport::Transport;

/// The client half of a loopback channel.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// The host half of a loopback channel.
pub struct LoopbackEndpoint {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// Creates a connected client/host channel pair.
pub fn pair() -> (LoopbackTransport, LoopbackEndpoint) {
    let (tx_req, rx_req) = mpsc::unbounded_channel();
    let (tx_rep, rx_rep) = mpsc::unbounded_channel();

    let client = LoopbackTransport {
        tx: tx_req,
        rx: Mutex::new(rx_rep),
    };
    let host = LoopbackEndpoint {
        tx: tx_rep,
        rx: Mutex::new(rx_req),
    };
    (client, host)
}

#[async_trait::async_trait]
impl Transport for LoopbackTransport {
    async fn call(&self, payload: &[u8]) -> transport::Result<Vec<u8>> {
        // Hold the receiver across send+recv so concurrent callers cannot
        // steal each other's replies; the host answers strictly in order.
        let mut rx = self.rx.lock().await;
        self.tx
            .send(payload.to_vec())
            .map_err(|_| transport::Error::ConnectionLost("host channel closed".into()))?;
        rx.recv()
            .await
            .ok_or_else(|| transport::Error::ConnectionLost("host channel closed".into()))
    }
}

#[async_trait::async_trait]
impl Endpoint for LoopbackEndpoint {
    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn send(&self, payload: &[u8]) -> transport::Result<()> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| transport::Error::ConnectionLost("client channel closed".into()))
    }
}
