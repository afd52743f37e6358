//! A server-side method table and dispatcher (the `C5` component).

use std::collections::HashMap;

use crate::codec::{parse_method_call, write_method_response, MethodOutcome};
use crate::error::{codes, RegistryError};
use crate::params::ParamList;
use crate::{Error, Fault, Value};

/// A type-letter description of one overload a registered method accepts: the return
/// type followed by each parameter's type, using [`Value::tag_name`] spellings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub return_type: &'static str,
    pub params: Vec<&'static str>,
}

impl Signature {
    pub fn new(return_type: &'static str, params: Vec<&'static str>) -> Self {
        Signature {
            return_type,
            params,
        }
    }

    fn matches(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(expected, arg)| *expected == arg.tag_name())
    }
}

type Handler = Box<dyn Fn(&ParamList) -> crate::Result<Value> + Send + Sync>;

/// A registered method: its handler, optional signatures for dispatch-time checking,
/// and a help string surfaced through `system.methodHelp`.
pub struct Method {
    handler: Handler,
    signatures: Vec<Signature>,
    help: String,
}

impl Method {
    fn matches_any_signature(&self, args: &[Value]) -> bool {
        self.signatures.is_empty() || self.signatures.iter().any(|sig| sig.matches(args))
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("signatures", &self.signatures)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

/// Maps method names to handlers and dispatches parsed requests to them.
///
/// `system.listMethods`, `system.methodSignature` and `system.methodHelp` are answered
/// directly by the registry rather than stored as ordinary entries, since a handler
/// closure has no way to borrow the table that holds it.
#[derive(Default)]
pub struct Registry {
    methods: HashMap<String, Method>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            methods: HashMap::new(),
        }
    }

    /// Registers `name` with `handler`. Fails with [`RegistryError::DuplicateMethod`]
    /// if the name is already registered or collides with a `system.*` built-in.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&ParamList) -> crate::Result<Value> + Send + Sync + 'static,
        signatures: Vec<Signature>,
        help: impl Into<String>,
    ) -> std::result::Result<(), RegistryError> {
        let name = name.into();
        if name.starts_with("system.") || self.methods.contains_key(&name) {
            return Err(RegistryError::DuplicateMethod(name));
        }
        self.methods.insert(
            name,
            Method {
                handler: Box::new(handler),
                signatures,
                help: help.into(),
            },
        );
        Ok(())
    }

    /// Parses `request_xml`, dispatches it, and returns well-formed `methodResponse`
    /// XML. Never fails: any error along the way is encoded as a fault response.
    pub fn process_call(&self, request_xml: &str) -> String {
        let outcome = match parse_method_call(request_xml) {
            Ok((name, params)) => self.dispatch(&name, params),
            Err(e) => {
                log::debug!("failed to parse request: {}", e);
                Err(Fault::new(codes::PARSE, e.to_string()))
            }
        };

        write_method_response(&outcome).unwrap_or_else(|e| {
            log::warn!("failed to encode methodResponse: {}", e);
            write_method_response(&Err(Fault::new(codes::INTERNAL, e.to_string())))
                .expect("a Fault built from a String always encodes")
        })
    }

    fn dispatch(&self, name: &str, params: Vec<Value>) -> MethodOutcome {
        match name {
            "system.listMethods" => Ok(self.list_methods()),
            "system.methodSignature" => self.method_signature(&ParamList::from(params)),
            "system.methodHelp" => self.method_help(&ParamList::from(params)),
            _ => self.dispatch_user_method(name, params),
        }
    }

    fn dispatch_user_method(&self, name: &str, params: Vec<Value>) -> MethodOutcome {
        let method = match self.methods.get(name) {
            Some(method) => method,
            None => {
                log::debug!("no such method: {}", name);
                return Err(Fault::new(
                    codes::NO_SUCH_METHOD,
                    format!("method `{}` is not registered", name),
                ));
            }
        };

        if !method.matches_any_signature(&params) {
            log::debug!("no matching signature for `{}`", name);
            return Err(Fault::new(
                codes::TYPE,
                format!("no matching signature for `{}`", name),
            ));
        }

        let params = ParamList::from(params);
        match (method.handler)(&params) {
            Ok(value) => Ok(value),
            Err(Error::Fault(fault)) => Err(fault),
            Err(e) => {
                log::debug!("handler for `{}` failed: {}", name, e);
                Err(Fault::new(codes::INTERNAL, e.to_string()))
            }
        }
    }

    fn list_methods(&self) -> Value {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.extend([
            "system.listMethods",
            "system.methodSignature",
            "system.methodHelp",
        ]);
        names.sort_unstable();
        Value::array(names.into_iter().map(Value::string).collect())
    }

    fn method_signature(&self, params: &ParamList) -> MethodOutcome {
        let name = params
            .get_string(0)
            .map_err(|e| Fault::new(codes::TYPE, e.to_string()))?;
        let method = self
            .methods
            .get(&name)
            .ok_or_else(|| Fault::new(codes::NO_SUCH_METHOD, format!("method `{}` not found", name)))?;

        if method.signatures.is_empty() {
            return Ok(Value::string("undef"));
        }

        let signatures = method
            .signatures
            .iter()
            .map(|sig| {
                let mut types = vec![Value::string(sig.return_type)];
                types.extend(sig.params.iter().map(|p| Value::string(*p)));
                Value::array(types)
            })
            .collect();
        Ok(Value::array(signatures))
    }

    fn method_help(&self, params: &ParamList) -> MethodOutcome {
        let name = params
            .get_string(0)
            .map_err(|e| Fault::new(codes::TYPE, e.to_string()))?;
        let method = self
            .methods
            .get(&name)
            .ok_or_else(|| Fault::new(codes::NO_SUCH_METHOD, format!("method `{}` not found", name)))?;
        Ok(Value::string(method.help.clone()))
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::codec::parse_method_response;

    fn sample_add_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                "sample.add",
                |params| {
                    let a = params.get_int(0)?;
                    let b = params.get_int(1)?;
                    Ok(Value::int(a + b))
                },
                vec![Signature::new("int", vec!["int", "int"])],
                "Adds two integers.",
            )
            .unwrap();
        registry
    }

    #[test]
    fn dispatches_to_a_registered_method() {
        let registry = sample_add_registry();
        let request = crate::codec::write_method_call(
            "sample.add",
            &[Value::int(5), Value::int(7)],
        )
        .unwrap();
        let response = registry.process_call(&request);
        let outcome = parse_method_response(&response).unwrap();
        assert_eq!(outcome, Ok(Value::int(12)));
    }

    #[test]
    fn wrong_arity_is_a_type_fault() {
        let registry = sample_add_registry();
        let request = crate::codec::write_method_call("sample.add", &[]).unwrap();
        let response = registry.process_call(&request);
        let outcome = parse_method_response(&response).unwrap();
        assert_eq!(outcome.unwrap_err().code, codes::TYPE);
    }

    #[test]
    fn unknown_method_is_a_no_such_method_fault() {
        let registry = sample_add_registry();
        let request = crate::codec::write_method_call("nosuchmethod", &[]).unwrap();
        let response = registry.process_call(&request);
        let outcome = parse_method_response(&response).unwrap();
        let fault = outcome.unwrap_err();
        assert_eq!(fault.code, codes::NO_SUCH_METHOD);
        assert!(!fault.description.is_empty());
    }

    #[test]
    fn malformed_request_is_a_parse_fault() {
        let registry = sample_add_registry();
        let response = registry.process_call("not xml at all");
        let outcome = parse_method_response(&response).unwrap();
        assert_eq!(outcome.unwrap_err().code, codes::PARSE);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = sample_add_registry();
        let err = registry
            .register("sample.add", |_| Ok(Value::nil()), vec![], "")
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMethod(name) if name == "sample.add"));
    }

    #[test]
    fn system_list_methods_includes_user_methods() {
        let registry = sample_add_registry();
        let request = crate::codec::write_method_call("system.listMethods", &[]).unwrap();
        let response = registry.process_call(&request);
        let outcome = parse_method_response(&response).unwrap().unwrap();
        let names: Vec<_> = outcome
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(names.contains(&"sample.add"));
        assert!(names.contains(&"system.listMethods"));
    }

    #[test]
    fn system_method_signature_reports_undef_when_unset() {
        let mut registry = Registry::new();
        registry
            .register("no.sig", |_| Ok(Value::nil()), vec![], "")
            .unwrap();
        let request =
            crate::codec::write_method_call("system.methodSignature", &[Value::string("no.sig")])
                .unwrap();
        let response = registry.process_call(&request);
        let outcome = parse_method_response(&response).unwrap().unwrap();
        assert_eq!(outcome.as_str().unwrap(), "undef");
    }

    /// Dispatcher totality: `process_call` must return well-formed response XML for
    /// any input, never panic, regardless of what garbage `b` is.
    #[quickcheck]
    fn process_call_never_panics_on_arbitrary_input(b: String) -> bool {
        let registry = sample_add_registry();
        let response = registry.process_call(&b);
        parse_method_response(&response).is_ok()
    }

    /// A handler returning an uninitialized placeholder `Value` cannot be encoded as a
    /// `methodResponse`; `process_call` must still produce well-formed XML (an
    /// `INTERNAL` fault) instead of panicking in `write_method_response(&outcome).expect(..)`.
    #[quickcheck]
    fn process_call_reports_an_uninitialized_handler_result_as_an_internal_fault(
        params: Vec<Value>,
    ) -> bool {
        let mut registry = Registry::new();
        registry
            .register("broken", |_| Ok(Value::uninit()), vec![], "")
            .unwrap();

        let request = crate::codec::write_method_call("broken", &params).unwrap();
        let response = registry.process_call(&request);
        parse_method_response(&response)
            .is_ok_and(|outcome| outcome.unwrap_err().code == codes::INTERNAL)
    }
}
