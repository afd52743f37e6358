//! A small XML-RPC runtime: a dynamic [`Value`] tree, a lossless XML codec, a method
//! [`registry::Registry`] with dispatch, pluggable [`transport::Transport`]s, and a
//! [`client::Client`] façade tying a transport to call/response encoding.

mod client;
mod codec;
mod error;
mod params;
mod registry;
mod transport;
mod util;
mod value;

pub use client::{Call, Client, ClientBuilder, Outcome, RpcHandle};
pub use codec::{
    parse_method_call, parse_method_response, write_method_call, write_method_response,
    MethodOutcome,
};
pub use error::{codes, Error, Fault, Result};
pub use params::ParamList;
pub use registry::{Method, Registry, Signature};
pub use transport::{Carriage, Completion, DirectTransport, HttpCarriage, Transport};
#[cfg(feature = "http")]
pub use transport::{HttpTransport, HttpTransportBuilder};
pub use value::{DateTime, Members, Value};
