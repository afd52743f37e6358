use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::TransportError;

use super::{Carriage, Completion, Transport};

/// Builds an [`HttpTransport`] with the per-transport options a production client
/// needs beyond the default `reqwest::blocking::Client`: request timeout, TLS peer
/// verification, a CA bundle, and a client certificate/key pair for mutual TLS.
#[derive(Default)]
pub struct HttpTransportBuilder {
    timeout: Option<Duration>,
    no_ssl_verify_peer: bool,
    ca_bundle: Option<Vec<u8>>,
    client_identity: Option<(Vec<u8>, Vec<u8>)>,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        HttpTransportBuilder::default()
    }

    /// Caps how long a single synchronous `call` (or one `start`ed worker) may block.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disables TLS certificate verification. Only ever useful against a server with
    /// a self-signed certificate in a trusted test environment.
    pub fn no_ssl_verify_peer(mut self, disable: bool) -> Self {
        self.no_ssl_verify_peer = disable;
        self
    }

    /// Trusts `pem` as an additional CA bundle, in place of (or alongside) the host's
    /// default trust store.
    pub fn ca_bundle(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_bundle = Some(pem.into());
        self
    }

    /// Presents `cert_pem`/`key_pem` (a PEM-encoded certificate and private key) for
    /// mutual TLS.
    pub fn client_identity(mut self, cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        self.client_identity = Some((cert_pem.into(), key_pem.into()));
        self
    }

    pub fn build(self) -> crate::Result<HttpTransport> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if self.no_ssl_verify_peer {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(pem) = &self.ca_bundle {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| TransportError::Network(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some((cert_pem, key_pem)) = &self.client_identity {
            let identity = reqwest::Identity::from_pkcs8_pem(cert_pem, key_pem)
                .map_err(|e| TransportError::Network(e.to_string()))?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(HttpTransport {
            client,
            pending: Mutex::new(Vec::new()),
        })
    }
}

/// An HTTP transport built on a blocking client. `call` is a plain synchronous POST;
/// `start` upgrades the base emulation to a real worker thread per outstanding call, and
/// `finish_async` joins them against a deadline, giving genuine (if coarse) concurrency
/// and a real timeout rather than call-then-immediately-complete.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    pending: Mutex<Vec<mpsc::Receiver<()>>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: reqwest::blocking::Client::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn call(&self, carriage: &Carriage, request_xml: &str) -> crate::Result<String> {
        let http = carriage.as_http()?;

        let mut request = self
            .client
            .post(&http.url)
            .header("Content-Type", "text/xml")
            .header("User-Agent", &http.user_agent)
            .body(request_xml.to_string());
        for (key, value) in &http.headers {
            request = request.header(key, value);
        }

        log::debug!("sending request to {}", http.url);
        let response = request.send().map_err(|e| {
            log::warn!("request to {} failed: {}", http.url, e);
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.as_u16() != 200 {
            log::warn!("{} returned HTTP status {}", http.url, status);
            return Err(TransportError::HttpStatus(status.as_u16()).into());
        }

        let body = response
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        log::debug!("received {} byte response from {}", body.len(), http.url);
        Ok(body)
    }

    fn start(&self, carriage: &Carriage, request_xml: String, completion: Completion) {
        let client = self.client.clone();
        let carriage = carriage.clone();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let worker = HttpTransport {
                client,
                pending: Mutex::new(Vec::new()),
            };
            completion(worker.call(&carriage, &request_xml));
            let _ = tx.send(());
        });

        self.pending.lock().unwrap().push(rx);
    }

    fn finish_async(&self, timeout: Duration) -> crate::Result<()> {
        let deadline = Instant::now() + timeout;
        let receivers = std::mem::take(&mut *self.pending.lock().unwrap());

        let mut timed_out = 0;
        for rx in receivers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if rx.recv_timeout(remaining).is_err() {
                timed_out += 1;
            }
        }

        if timed_out > 0 {
            log::warn!("{} outstanding call(s) did not complete before the deadline", timed_out);
            Err(TransportError::Timeout.into())
        } else {
            Ok(())
        }
    }
}
