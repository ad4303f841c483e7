//! Routes the daemon serves out of the box.

use jmp_protocol::{RouteError, RouteReply, RouteTable};
use serde_json::Value;

/// Message type of the built-in echo route.
pub const ECHO_TYPE: &str = "echo";

/// Replies with an `echo` message carrying the request payload.
pub fn echo(data: Option<Value>) -> Result<Option<RouteReply>, RouteError> {
    let reply = RouteReply::new(ECHO_TYPE);
    Ok(Some(match data {
        Some(data) => reply.with_data(data),
        None => reply,
    }))
}

/// Builds the route table served by the `jmpd` binary.
#[must_use]
pub fn builtin_routes() -> RouteTable {
    let routes = RouteTable::new();
    routes.register(ECHO_TYPE, echo);
    routes
}
