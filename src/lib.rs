//! # mockzure
//!
//! **mockzure** is a local stand-in for three cloud API families, served on
//! `may` coroutines:
//!
//! - a **resource-management** API (subscriptions, resource groups, virtual
//!   machines, long-running operation status),
//! - a **directory** API (users, service principals),
//! - an **OIDC/OAuth2 identity provider** (discovery, authorization-code flow,
//!   client credentials, userinfo).
//!
//! Routes come from the API description files under `specs/`; responses come
//! from an in-memory data file. API writes are never persisted; the mock-only
//! `/mock/azure/data/{clear,reset}` endpoints empty or reload the records.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Loads description files and compiles operations into routes
//! - **[`router`]** - Path matching with exact-path precedence and 405 detection
//! - **[`dispatcher`]** - Per-family handler table and middleware chain
//! - **[`handlers`]** - Resource-management and directory handlers
//! - **[`mappers`]** - Family response mappers shaping payloads like the real APIs
//! - **[`security`]** - Service-principal credentials and scoped permissions
//! - **[`identity`]** - The OAuth2/OIDC state machine
//! - **[`store`]** - In-memory record snapshots with clear and reset
//! - **[`config`]** - The data file
//! - **[`context`]** - Explicit construction of all of the above
//! - **[`server`]** - HTTP hosting on `may_minihttp`
//! - **[`middleware`]** - Request logging with credential masking
//! - **[`telemetry`]** - `tracing-subscriber` setup
//! - **[`cli`]** - The `mockzure` binary
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService<br/>(may_minihttp)
//!     participant Router
//!     participant Dispatcher
//!     participant Handler as FamilyHandler
//!     participant Gate as AuthorizationGate
//!     participant Mapper as FamilyResponseMapper
//!
//!     Client->>Server: GET /subscriptions/s/resourceGroups/rg-dev/providers/Microsoft.Compute/virtualMachines/web-01
//!     Server->>Router: resolve(GET, path)
//!     alt no pattern matches
//!         Router-->>Client: 404 NotFound
//!     else pattern matches, method does not
//!         Router-->>Client: 405 MethodNotAllowed
//!     end
//!     Router-->>Server: RouteMatch (family, operationId, params)
//!     Server->>Dispatcher: dispatch(HandlerRequest)
//!     Dispatcher->>Handler: handlers[family]
//!     Handler->>Gate: authenticate(Authorization)
//!     Gate-->>Handler: principal or anonymous
//!     Handler->>Gate: permitted(scope, verb)
//!     alt denied
//!         Handler-->>Client: 403 AuthorizationFailed
//!     end
//!     Handler->>Mapper: map(request, scoped data)
//!     Mapper-->>Client: 200 JSON / 204 / 404 ResourceNotFound
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use mockzure::config::MockConfig;
//! use mockzure::context::MockContext;
//! use mockzure::server::{AppService, HttpServer};
//! use mockzure::spec::DirectorySpecSource;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let specs = DirectorySpecSource::new("specs").load()?;
//! let config = MockConfig::load(Path::new("config.yaml"))?;
//! let context = Arc::new(MockContext::build(config, specs.documents));
//! let handle = HttpServer(AppService::new(context)).start("127.0.0.1:8090")?;
//! handle.wait_ready()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime Considerations
//!
//! mockzure uses the `may` coroutine runtime, not tokio. Every request runs on
//! its connection's coroutine; all data is in memory so nothing blocks. The
//! coroutine stack size is set with `MOCKZURE_STACK_SIZE`.
//!
//! ## Not for production
//!
//! Identity tokens are unsigned and bearer tokens are guessable. See the
//! [`identity`] and [`security`] module docs.

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod identity;
pub mod ids;
pub mod mappers;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod security;
pub mod server;
pub mod spec;
pub mod store;
pub mod telemetry;

pub use context::MockContext;
pub use spec::{build_routes, Family, RouteMeta, SpecDocument};
