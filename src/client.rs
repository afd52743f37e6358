//! The client façade (`C9`): ties a [`Transport`] and a carriage parameter to the
//! codec, and tracks asynchronous calls through an [`RpcHandle`].

use std::sync::{Arc, Mutex};

use crate::codec::{parse_method_response, write_method_call};
use crate::error::{codes, HandleError};
use crate::transport::{Carriage, Transport};
use crate::{Fault, Value};

/// A method name plus its ordered parameters, ready to be sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub method: String,
    pub params: Vec<Value>,
}

impl Call {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Call {
            method: method.into(),
            params,
        }
    }
}

/// The result of a completed call: either the method's return value or a fault.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success(Value),
    Fault(Fault),
}

impl Outcome {
    pub fn into_result(self) -> std::result::Result<Value, Fault> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::Fault(f) => Err(f),
        }
    }
}

/// Builds a [`Client`] from a carriage parameter and a transport.
pub struct ClientBuilder {
    carriage: Carriage,
}

impl ClientBuilder {
    pub fn new(carriage: Carriage) -> Self {
        ClientBuilder { carriage }
    }

    pub fn build(self, transport: impl Transport + 'static) -> Client {
        Client {
            transport: Arc::new(transport),
            carriage: self.carriage,
            outstanding: Mutex::new(Vec::new()),
        }
    }
}

/// Sends calls over a transport, encoding/decoding via the codec.
pub struct Client {
    transport: Arc<dyn Transport>,
    carriage: Carriage,
    /// Handles `start`ed but not yet known to be finished, so `finish_async` can mark
    /// the ones the transport didn't complete in time as `TIMEOUT`.
    outstanding: Mutex<Vec<RpcHandle>>,
}

impl Client {
    /// Performs `call` synchronously and returns its outcome.
    pub fn call(&self, call: Call) -> crate::Result<Outcome> {
        let request = write_method_call(&call.method, &call.params)?;
        let response = self.transport.call(&self.carriage, &request)?;
        Ok(match parse_method_response(&response)? {
            Ok(value) => Outcome::Success(value),
            Err(fault) => Outcome::Fault(fault),
        })
    }

    /// Starts `call` asynchronously, returning a handle that settles once the
    /// transport delivers a completion.
    pub fn start(&self, call: Call) -> crate::Result<RpcHandle> {
        let handle = RpcHandle::new();
        handle.mark_in_progress()?;

        let request = write_method_call(&call.method, &call.params)?;
        let state = Arc::clone(&handle.state);
        self.transport.start(
            &self.carriage,
            request,
            Box::new(move |result| {
                let settled = match result {
                    Ok(response) => match parse_method_response(&response) {
                        Ok(Ok(value)) => HandleState::Succeeded(value),
                        Ok(Err(fault)) => HandleState::Failed(fault),
                        Err(e) => HandleState::Failed(Fault::new(codes::PARSE, e.to_string())),
                    },
                    Err(e) => HandleState::Failed(Fault::new(codes::TRANSPORT, e.to_string())),
                };
                // A completion arriving after `finish_async` already reported this
                // handle as TIMEOUT must not resurrect it (spec: "no further
                // completion is delivered").
                let mut state = state.lock().unwrap();
                if !matches!(&*state, HandleState::Timeout) {
                    *state = settled;
                }
            }),
        );

        self.outstanding.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    /// Drains all calls `start`ed on this client's transport (see
    /// [`Transport::finish_async`]), then marks every handle the transport didn't
    /// complete in time as `TIMEOUT`.
    pub fn finish_async(&self, timeout: std::time::Duration) -> crate::Result<()> {
        let result = self.transport.finish_async(timeout);

        let outstanding = std::mem::take(&mut *self.outstanding.lock().unwrap());
        for handle in outstanding {
            handle.mark_timed_out();
        }

        result
    }
}

#[derive(Clone)]
enum HandleState {
    Initial,
    InProgress,
    Succeeded(Value),
    Failed(Fault),
    Timeout,
}

/// Tracks one asynchronous call through `INITIAL -> IN_PROGRESS -> {SUCCEEDED,FAILED}`.
/// Once in a terminal state, a handle never leaves it.
#[derive(Clone)]
pub struct RpcHandle {
    state: Arc<Mutex<HandleState>>,
}

impl RpcHandle {
    fn new() -> Self {
        RpcHandle {
            state: Arc::new(Mutex::new(HandleState::Initial)),
        }
    }

    fn mark_in_progress(&self) -> crate::Result<()> {
        let mut state = self.state.lock().unwrap();
        match &*state {
            HandleState::Initial => {
                *state = HandleState::InProgress;
                Ok(())
            }
            _ => Err(HandleError::AlreadyRun.into()),
        }
    }

    /// Settles the handle as `TIMEOUT` if it's still `IN_PROGRESS`; a no-op if a
    /// completion already settled it first.
    fn mark_timed_out(&self) {
        let mut state = self.state.lock().unwrap();
        if matches!(&*state, HandleState::InProgress) {
            *state = HandleState::Timeout;
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            &*self.state.lock().unwrap(),
            HandleState::Succeeded(_) | HandleState::Failed(_) | HandleState::Timeout
        )
    }

    pub fn is_successful(&self) -> crate::Result<bool> {
        match &*self.state.lock().unwrap() {
            HandleState::Succeeded(_) => Ok(true),
            HandleState::Failed(_) | HandleState::Timeout => Ok(false),
            _ => Err(HandleError::NotFinished.into()),
        }
    }

    pub fn get_result(&self) -> crate::Result<Value> {
        match &*self.state.lock().unwrap() {
            HandleState::Succeeded(v) => Ok(v.clone()),
            HandleState::Failed(_) | HandleState::Timeout => Err(HandleError::NotSuccessful.into()),
            _ => Err(HandleError::NotFinished.into()),
        }
    }

    pub fn get_fault(&self) -> crate::Result<Fault> {
        match &*self.state.lock().unwrap() {
            HandleState::Failed(f) => Ok(f.clone()),
            HandleState::Timeout => Ok(Fault::new(codes::TRANSPORT, "call timed out")),
            HandleState::Succeeded(_) => Err(HandleError::NoFault.into()),
            _ => Err(HandleError::NotFinished.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_method_response;
    use crate::registry::{Registry, Signature};
    use crate::transport::{Completion, DirectTransport};

    /// A transport whose calls never complete on their own; `finish_async` always
    /// times out, and a test can fire the stashed completion afterwards to simulate a
    /// late-arriving result racing against the timeout.
    #[derive(Clone, Default)]
    struct NeverCompletingTransport {
        completion: Arc<Mutex<Option<Completion>>>,
    }

    impl Transport for NeverCompletingTransport {
        fn call(&self, _carriage: &Carriage, _request_xml: &str) -> crate::Result<String> {
            unreachable!("this transport only supports start/finish_async")
        }

        fn start(&self, _carriage: &Carriage, _request_xml: String, completion: Completion) {
            *self.completion.lock().unwrap() = Some(completion);
        }

        fn finish_async(&self, _timeout: std::time::Duration) -> crate::Result<()> {
            Err(crate::error::TransportError::Timeout.into())
        }
    }

    fn sample_add_client(registry: Registry) -> Client {
        ClientBuilder::new(Carriage::direct()).build(DirectTransport::new(registry))
    }

    fn sample_add_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                "sample.add",
                |params| Ok(Value::int(params.get_int(0)? + params.get_int(1)?)),
                vec![Signature::new("int", vec!["int", "int"])],
                "",
            )
            .unwrap();
        registry
    }

    #[test]
    fn call_returns_success_outcome() {
        let registry = sample_add_registry();
        let client = sample_add_client(registry);
        let outcome = client
            .call(Call::new("sample.add", vec![Value::int(2), Value::int(3)]))
            .unwrap();
        assert_eq!(outcome, Outcome::Success(Value::int(5)));
    }

    #[test]
    fn call_returns_fault_outcome() {
        let registry = sample_add_registry();
        let client = sample_add_client(registry);
        let outcome = client.call(Call::new("nosuchmethod", vec![])).unwrap();
        match outcome {
            Outcome::Fault(f) => assert_eq!(f.code, codes::NO_SUCH_METHOD),
            other => panic!("expected a fault outcome, got {:?}", other),
        }
    }

    #[test]
    fn start_settles_the_handle_synchronously_on_direct_transport() {
        let registry = sample_add_registry();
        let client = sample_add_client(registry);
        let handle = client
            .start(Call::new("sample.add", vec![Value::int(4), Value::int(6)]))
            .unwrap();

        assert!(handle.is_finished());
        assert!(handle.is_successful().unwrap());
        assert_eq!(handle.get_result().unwrap(), Value::int(10));
        assert!(handle.get_fault().is_err());
    }

    #[test]
    fn handle_invariants_hold() {
        let handle = RpcHandle::new();
        assert!(!handle.is_finished());
        assert!(handle.is_successful().is_err());
        handle.mark_in_progress().unwrap();
        assert!(matches!(
            handle.mark_in_progress().unwrap_err(),
            crate::Error::Handle(HandleError::AlreadyRun)
        ));
    }

    #[test]
    fn finish_async_times_out_a_call_the_transport_never_completed() {
        let client = ClientBuilder::new(Carriage::direct()).build(NeverCompletingTransport::default());
        let handle = client
            .start(Call::new("sample.add", vec![Value::int(1), Value::int(2)]))
            .unwrap();

        assert!(!handle.is_finished());
        client.finish_async(std::time::Duration::from_millis(1)).unwrap_err();

        assert!(handle.is_finished());
        assert!(!handle.is_successful().unwrap());
        assert_eq!(handle.get_fault().unwrap().code, codes::TRANSPORT);
    }

    #[test]
    fn a_completion_arriving_after_timeout_does_not_resurrect_the_handle() {
        let transport = NeverCompletingTransport::default();
        let completion_slot = Arc::clone(&transport.completion);
        let client = ClientBuilder::new(Carriage::direct()).build(transport);
        let handle = client
            .start(Call::new("sample.add", vec![Value::int(1), Value::int(2)]))
            .unwrap();

        client.finish_async(std::time::Duration::from_millis(1)).unwrap_err();
        assert!(handle.is_finished());

        let late_completion = completion_slot.lock().unwrap().take().unwrap();
        late_completion(Ok(write_method_response(&Ok(Value::int(3))).unwrap()));

        assert!(!handle.is_successful().unwrap());
        assert_eq!(handle.get_fault().unwrap().code, codes::TRANSPORT);
    }
}
