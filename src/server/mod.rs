//! # Server Module
//!
//! HTTP hosting on `may_minihttp` coroutines.
//!
//! [`AppService`] parses each raw request into a [`ParsedRequest`], answers the
//! mock-only `/health` and `/mock/azure/stats` surfaces itself, resolves
//! everything else through the router and hands it to the dispatcher.
//! [`HttpServer`] binds the service and returns a [`ServerHandle`].

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_form, parse_query_params, parse_request, ParsedRequest};
pub use response::{encode_body, static_header, status_reason, write_handler_response, HeaderLines};
pub use service::{health_endpoint, AppService, CLEAR_PATH, HEALTH_PATH, RESET_PATH, STATS_PATH};
