//! Pluggable transports (`C6`) and the in-process `DirectTransport` (`C8`).

#[cfg(feature = "http")]
mod http;
mod direct;

#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportBuilder};
pub use direct::DirectTransport;

use std::time::Duration;

use crate::error::TransportError;

/// Per-call transport configuration. Transports define their own variant; a client
/// must pass the one matching the transport it was built with.
#[derive(Clone, Debug)]
pub enum Carriage {
    Http(HttpCarriage),
    Direct,
}

#[derive(Clone, Debug)]
pub struct HttpCarriage {
    pub url: String,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl Carriage {
    pub fn http(url: impl Into<String>) -> Self {
        Carriage::Http(HttpCarriage {
            url: url.into(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: Vec::new(),
        })
    }

    pub fn direct() -> Self {
        Carriage::Direct
    }

    pub(crate) fn as_http(&self) -> std::result::Result<&HttpCarriage, TransportError> {
        match self {
            Carriage::Http(http) => Ok(http),
            _ => Err(TransportError::CarriageType),
        }
    }

    pub(crate) fn as_direct(&self) -> std::result::Result<(), TransportError> {
        match self {
            Carriage::Direct => Ok(()),
            _ => Err(TransportError::CarriageType),
        }
    }
}

/// A completion callback: delivered once with the transport-level result of one
/// `start`ed call.
pub type Completion = Box<dyn FnOnce(crate::Result<String>) + Send>;

/// A collaborator that moves request/response XML between a client and a server.
///
/// The default `start`/`finish_async` pair emulates asynchrony by running `call`
/// synchronously and delivering the result immediately; transports that can do
/// better (see [`HttpTransport`]) override them.
pub trait Transport: Send + Sync {
    fn call(&self, carriage: &Carriage, request_xml: &str) -> crate::Result<String>;

    fn start(&self, carriage: &Carriage, request_xml: String, completion: Completion) {
        completion(self.call(carriage, &request_xml));
    }

    fn finish_async(&self, _timeout: Duration) -> crate::Result<()> {
        Ok(())
    }
}
