//! Device connection lifecycle.
//!
//! A [`Connection`] pairs one protocol with one transport and runs a
//! single background reader task for as long as the transport is open.
//! The reader assembles reply lines and stores the protocol's verdicts
//! in a shared slot; the foreground polls that slot under a timeout.
//!
//! Send attempts survive one transport fault: a failed write or a
//! silent device earns exactly one disconnect-reconnect-retransmit
//! cycle before the error is handed back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use matrixkit_core::{ConnectionError, Error, Result, Verdict, VerdictSlot};

use crate::communication::Communicator;
use crate::protocol::Protocol;

/// Upper bound for opening a transport and seeing the first verdict.
pub const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound for a command acknowledgement.
pub const MAX_COMMAND_TIMEOUT: Duration = Duration::from_millis(100);

/// Poll interval while waiting on the verdict slot.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Reader task sleep when no data is pending.
const READER_IDLE_DELAY: Duration = Duration::from_millis(10);

/// One protocol bound to one transport.
pub struct Connection {
    protocol: Arc<dyn Protocol>,
    communicator: Arc<Mutex<Box<dyn Communicator>>>,
    verdict: Arc<VerdictSlot>,
    cancel: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Connection {
    /// Pair a protocol with a transport. Nothing is opened yet.
    pub fn new(protocol: Arc<dyn Protocol>, communicator: Box<dyn Communicator>) -> Self {
        Self {
            protocol,
            communicator: Arc::new(Mutex::new(communicator)),
            verdict: Arc::new(VerdictSlot::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    /// The protocol this connection speaks.
    pub fn protocol(&self) -> &dyn Protocol {
        self.protocol.as_ref()
    }

    /// The transport target, for status lines.
    pub fn describe(&self) -> String {
        self.communicator.lock().describe()
    }

    /// Whether the transport holds an open handle.
    pub fn is_connected(&self) -> bool {
        self.communicator.lock().is_connected()
    }

    /// Open the transport and wait for the protocol to call the link up.
    ///
    /// The open and the verdict wait count against one deadline.
    /// `Pending` means the transport opened but the device never said
    /// anything decisive. A no-op returning `Success` when already
    /// connected.
    pub async fn connect(&mut self) -> Result<Verdict> {
        if self.is_connected() {
            return Ok(Verdict::Success);
        }

        let deadline = Instant::now() + MAX_CONNECT_TIMEOUT;

        self.communicator.lock().connect(MAX_CONNECT_TIMEOUT)?;

        self.cancel.store(false, Ordering::SeqCst);
        self.spawn_reader();
        self.verdict.clear();
        if let Some(verdict) = self.protocol.on_connect() {
            self.verdict.set(verdict);
        }

        Ok(self.wait_verdict(deadline).await)
    }

    /// Tear down the reader task and close the transport.
    ///
    /// Safe to call when already disconnected. The reader join is
    /// bounded; a stuck reader is abandoned with a warning.
    pub async fn disconnect(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);

        if let Err(e) = self.communicator.lock().disconnect() {
            tracing::debug!("disconnect: {}", e);
        }

        if let Some(handle) = self.reader.take() {
            if tokio::time::timeout(MAX_CONNECT_TIMEOUT, handle).await.is_err() {
                tracing::warn!("reader task did not stop within {:?}", MAX_CONNECT_TIMEOUT);
            }
        }
    }

    /// Transmit one encoded command and wait for the device's verdict.
    ///
    /// Reconnects first when the transport is down. A write failure or a
    /// verdict timeout triggers one reconnect-and-retransmit; after that
    /// the failure is returned.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut allow_retry = true;

        loop {
            if !self.is_connected() {
                match self.connect().await {
                    Ok(Verdict::Success) => {}
                    Ok(_) => {
                        tracing::warn!("reconnect didn't succeed, trying to send anyway");
                    }
                    Err(e) => return Err(e),
                }
            }

            self.verdict.clear();

            if let Err(e) = self.write_all(data) {
                if allow_retry {
                    tracing::warn!("connection lost ({}), reconnecting and retrying", e);
                    self.disconnect().await;
                    allow_retry = false;
                    continue;
                }
                return Err(e);
            }

            let deadline = Instant::now() + MAX_COMMAND_TIMEOUT;
            match self.wait_verdict(deadline).await {
                Verdict::Success => return Ok(()),
                Verdict::Error => return Err(ConnectionError::Device.into()),
                Verdict::Pending => {
                    if allow_retry {
                        tracing::warn!("no reaction from device, reconnecting and retrying");
                        self.disconnect().await;
                        allow_retry = false;
                        continue;
                    }
                    return Err(ConnectionError::Timeout {
                        timeout_ms: MAX_COMMAND_TIMEOUT.as_millis() as u64,
                    }
                    .into());
                }
            }
        }
    }

    /// Write the whole frame, tolerating short writes.
    fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut communicator = self.communicator.lock();
        let mut written = 0;
        while written < data.len() {
            match communicator.send(&data[written..]) {
                Ok(0) => {
                    return Err(Error::from(ConnectionError::Io {
                        reason: "transport accepted no bytes".to_string(),
                    }))
                }
                Ok(n) => written += n,
                Err(e) => return Err(e),
            }
        }
        communicator.flush()
    }

    /// Poll the verdict slot until it is decisive or `deadline` passes.
    async fn wait_verdict(&self, deadline: Instant) -> Verdict {
        loop {
            let verdict = self.verdict.get();
            if verdict != Verdict::Pending || Instant::now() >= deadline {
                return verdict;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Start the background reader for the current transport handle.
    fn spawn_reader(&mut self) {
        let communicator = self.communicator.clone();
        let protocol = self.protocol.clone();
        let verdict = self.verdict.clone();
        let cancel = self.cancel.clone();

        self.reader = Some(tokio::spawn(async move {
            let mut pending: Vec<u8> = Vec::new();

            while !cancel.load(Ordering::SeqCst) {
                let chunk = communicator.lock().receive();
                match chunk {
                    Ok(data) if !data.is_empty() => {
                        // Devices mix CR and LF terminators freely.
                        for byte in data {
                            pending.push(if byte == b'\r' { b'\n' } else { byte });
                        }
                        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                            let mut line: Vec<u8> = pending.drain(..=pos).collect();
                            line.pop();
                            if !line.is_empty() {
                                tracing::trace!("device: {}", String::from_utf8_lossy(&line));
                                if let Some(v) = protocol.on_receive(&line) {
                                    verdict.set(v);
                                }
                            }
                        }
                    }
                    Ok(_) => {
                        tokio::time::sleep(READER_IDLE_DELAY).await;
                    }
                    Err(e) => {
                        tracing::debug!("receive failed: {}", e);
                        tokio::time::sleep(READER_IDLE_DELAY).await;
                    }
                }
            }
        }));
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        if let Err(e) = self.communicator.lock().disconnect() {
            tracing::debug!("disconnect on drop: {}", e);
        }
    }
}
