//! Router capability and the default route table.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::envelope::Identifier;
use crate::error::RouteError;

/// What a router asks the handler to send back.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReply {
    /// Type of the reply envelope.
    pub message_type: Identifier,
    /// Payload of the reply; `None` omits `d`.
    pub data: Option<Value>,
}

impl RouteReply {
    /// Reply without a payload.
    #[must_use]
    pub fn new(message_type: impl Into<Identifier>) -> Self {
        Self {
            message_type: message_type.into(),
            data: None,
        }
    }

    /// Sets the payload; a JSON `null` leaves it absent.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data).filter(|value| !value.is_null());
        self
    }
}

/// Business logic invoked with a validated type and payload.
///
/// `Ok(None)` means the message was handled and nothing is sent back.
pub trait Router: Send + Sync {
    /// Handles one validated message.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`]; it reaches the caller unchanged.
    fn route(
        &self,
        message_type: &Identifier,
        data: Option<Value>,
    ) -> Result<Option<RouteReply>, RouteError>;
}

impl<F> Router for F
where
    F: Fn(&Identifier, Option<Value>) -> Result<Option<RouteReply>, RouteError> + Send + Sync,
{
    fn route(
        &self,
        message_type: &Identifier,
        data: Option<Value>,
    ) -> Result<Option<RouteReply>, RouteError> {
        self(message_type, data)
    }
}

/// Handler for a single registered message type.
pub trait RouteHandler: Send + Sync {
    /// Handles the payload of one message.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`].
    fn handle(&self, data: Option<Value>) -> Result<Option<RouteReply>, RouteError>;
}

impl<F> RouteHandler for F
where
    F: Fn(Option<Value>) -> Result<Option<RouteReply>, RouteError> + Send + Sync,
{
    fn handle(&self, data: Option<Value>) -> Result<Option<RouteReply>, RouteError> {
        self(data)
    }
}

/// Router dispatching on the message type.
///
/// Handlers can be registered while the table is serving.
#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<HashMap<Identifier, Arc<dyn RouteHandler>>>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `message_type`, replacing any previous one.
    pub fn register<H>(&self, message_type: impl Into<Identifier>, handler: H)
    where
        H: RouteHandler + 'static,
    {
        self.write().insert(message_type.into(), Arc::new(handler));
    }

    /// Removes the handler for `message_type`, returning whether one existed.
    pub fn unregister(&self, message_type: &Identifier) -> bool {
        self.write().remove(message_type).is_some()
    }

    /// Returns `true` when a handler is registered for `message_type`.
    #[must_use]
    pub fn contains(&self, message_type: &Identifier) -> bool {
        self.read().contains_key(message_type)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Identifier, Arc<dyn RouteHandler>>> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Identifier, Arc<dyn RouteHandler>>> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Router for RouteTable {
    fn route(
        &self,
        message_type: &Identifier,
        data: Option<Value>,
    ) -> Result<Option<RouteReply>, RouteError> {
        // Clone the handler out so it runs without holding the lock.
        let handler = self.read().get(message_type).cloned();
        match handler {
            Some(handler) => handler.handle(data),
            None => Err(RouteError::unknown_message_type(message_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo(data: Option<Value>) -> Result<Option<RouteReply>, RouteError> {
        Ok(Some(RouteReply::new("echo").with_data(data.unwrap_or(Value::Null))))
    }

    #[test]
    fn dispatches_by_message_type() {
        let table = RouteTable::new();
        table.register("echo", echo);

        let reply = table
            .route(&Identifier::from("echo"), Some(json!("hi")))
            .expect("routed")
            .expect("reply");
        assert_eq!(reply, RouteReply::new("echo").with_data(json!("hi")));
    }

    #[test]
    fn unknown_types_are_route_errors() {
        let table = RouteTable::new();
        let error = table
            .route(&Identifier::from("nope"), None)
            .expect_err("unregistered");
        assert_eq!(error.message(), "unknown message type 'nope'");
    }

    #[test]
    fn registering_twice_replaces_the_handler() {
        let table = RouteTable::new();
        table.register(1_i64, echo);
        table.register(1_i64, |_: Option<Value>| -> Result<Option<RouteReply>, RouteError> {
            Ok(None)
        });

        assert_eq!(table.len(), 1);
        let reply = table.route(&Identifier::from(1_i64), None).expect("routed");
        assert!(reply.is_none());
    }

    #[test]
    fn unregister_removes_the_route() {
        let table = RouteTable::new();
        table.register("echo", echo);
        assert!(table.unregister(&Identifier::from("echo")));
        assert!(!table.contains(&Identifier::from("echo")));
        assert!(table.is_empty());
    }

    #[test]
    fn closures_are_routers() {
        let router = |message_type: &Identifier,
                      _data: Option<Value>|
         -> Result<Option<RouteReply>, RouteError> {
            Ok(Some(RouteReply::new(message_type.clone())))
        };
        let reply = Router::route(&router, &Identifier::from("ping"), None)
            .expect("routed")
            .expect("reply");
        assert_eq!(reply.message_type, Identifier::from("ping"));
    }
}
