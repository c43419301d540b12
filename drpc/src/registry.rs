// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Maps `Service.Method` names to opaque byte-in/byte-out handlers.
//!
//! The outer map (service name -> method map) allows concurrent lookup and
//! insertion via a `RwLock`. The inner method map is effectively frozen after
//! startup: it's only ever mutated under the same outer write lock that
//! installs it, so concurrent `resolve` calls never race a `register` that
//! mutates an existing service's methods.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::Error;

/// A handler is a pure function from a request body to a reply body or an
/// error; the error is projected onto the wire as the response's `Error`
/// field and is never fatal to the connection.
pub type Handler = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, Error> + Send + Sync>;

#[derive(Default)]
struct Service {
    methods: HashMap<String, Handler>,
}

/// A two-level mapping: service name -> (method name -> handler).
/// Registration is append-only; a duplicate `Service.Method` registration
/// fails and leaves the registry unchanged.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `service_method`, which must contain at
    /// least one `.`; the split point is the rightmost `.`.
    pub fn register(
        &self,
        service_method: &str,
        handler: impl Fn(&[u8]) -> Result<Vec<u8>, Error> + Send + Sync + 'static,
    ) -> Result<(), Error> {
        let (service_name, method_name) = split_service_method(service_method)?;

        let mut services = self.services.write().unwrap();
        let service = services.entry(service_name.to_string()).or_default();

        if service.methods.contains_key(method_name) {
            return Err(Error::DuplicateRegistration(service_method.to_string()));
        }

        service
            .methods
            .insert(method_name.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Resolves `service_method` to its handler, failing with
    /// [`Error::UnknownService`] or [`Error::UnknownMethod`].
    pub fn resolve(&self, service_method: &str) -> Result<Handler, Error> {
        let (service_name, method_name) = split_service_method(service_method)?;

        let services = self.services.read().unwrap();
        let service = services
            .get(service_name)
            .ok_or_else(|| Error::UnknownService(service_name.to_string()))?;

        service
            .methods
            .get(method_name)
            .cloned()
            .ok_or_else(|| Error::UnknownMethod(method_name.to_string()))
    }
}

fn split_service_method(service_method: &str) -> Result<(&str, &str), Error> {
    let dot = service_method
        .rfind('.')
        .ok_or_else(|| Error::IllFormedMethod(service_method.to_string()))?;
    Ok((&service_method[..dot], &service_method[dot + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve() {
        let registry = ServiceRegistry::new();
        registry
            .register("Math.Add", |body| Ok(body.to_vec()))
            .unwrap();

        let handler = registry.resolve("Math.Add").unwrap();
        assert_eq!(handler(b"hi").unwrap(), b"hi".to_vec());
    }

    #[test]
    fn duplicate_registration_fails_and_keeps_first() {
        let registry = ServiceRegistry::new();
        registry
            .register("X.Y", |_| Ok(vec![1]))
            .unwrap();

        let err = registry.register("X.Y", |_| Ok(vec![2])).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)));

        let handler = registry.resolve("X.Y").unwrap();
        assert_eq!(handler(b"").unwrap(), vec![1]);
    }

    #[test]
    fn unknown_service_and_method() {
        let registry = ServiceRegistry::new();
        registry.register("Math.Add", |_| Ok(vec![])).unwrap();

        assert!(matches!(
            registry.resolve("Other.Add"),
            Err(Error::UnknownService(_))
        ));
        assert!(matches!(
            registry.resolve("Math.Sub"),
            Err(Error::UnknownMethod(_))
        ));
    }

    #[test]
    fn ill_formed_service_method() {
        let registry = ServiceRegistry::new();
        assert!(matches!(
            registry.register("NoDot", |_| Ok(vec![])),
            Err(Error::IllFormedMethod(_))
        ));
    }

    #[test]
    fn rightmost_dot_splits_service_and_method() {
        let registry = ServiceRegistry::new();
        registry
            .register("a.b.Add", |_| Ok(vec![9]))
            .unwrap();
        let handler = registry.resolve("a.b.Add").unwrap();
        assert_eq!(handler(b"").unwrap(), vec![9]);
    }
}
