use std::sync::Arc;

use crate::registry::Registry;

use super::{Carriage, Transport};

/// An in-process transport that delivers requests straight to a [`Registry`], with no
/// network involved. Keeps the base synchronous `start`/`finish_async` emulation,
/// since it never blocks on I/O in the first place.
pub struct DirectTransport {
    registry: Arc<Registry>,
}

impl DirectTransport {
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        DirectTransport {
            registry: registry.into(),
        }
    }
}

impl Transport for DirectTransport {
    fn call(&self, carriage: &Carriage, request_xml: &str) -> crate::Result<String> {
        carriage.as_direct()?;
        log::debug!("dispatching {} byte request in-process", request_xml.len());
        Ok(self.registry.process_call(request_xml))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{parse_method_response, write_method_call};
    use crate::registry::Signature;
    use crate::Value;

    #[test]
    fn delegates_to_the_registry() {
        let mut registry = Registry::new();
        registry
            .register(
                "sample.add",
                |params| Ok(Value::int(params.get_int(0)? + params.get_int(1)?)),
                vec![Signature::new("int", vec!["int", "int"])],
                "",
            )
            .unwrap();

        let transport = DirectTransport::new(registry);
        let request = write_method_call("sample.add", &[Value::int(2), Value::int(3)]).unwrap();
        let response = transport.call(&Carriage::direct(), &request).unwrap();
        assert_eq!(parse_method_response(&response).unwrap(), Ok(Value::int(5)));
    }

    #[test]
    fn rejects_a_mismatched_carriage() {
        let registry = Registry::new();
        let transport = DirectTransport::new(registry);
        let err = transport.call(&Carriage::http("http://example.com"), "").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Transport(crate::error::TransportError::CarriageType)
        ));
    }
}
