//! # Router Module
//!
//! Path matching and route resolution for every mocked API family.
//!
//! ## Architecture
//!
//! 1. **Compilation**: each description-file path such as `/users/{user-id}` is
//!    compiled into a [`PathPattern`]: literal segments plus named captures.
//!    Malformed patterns fail with a [`CompileError`] and the route is skipped.
//!
//! 2. **Registration**: [`Router::new`] partitions routes into exact paths
//!    (hash lookup) and parameterized routes grouped by their literal prefix.
//!
//! 3. **Resolution**: [`Router::resolve`] answers [`Resolution::Matched`],
//!    [`Resolution::NotFound`] or [`Resolution::MethodNotAllowed`]. An exact
//!    route always outranks a parameterized one for the same concrete path.
//!
//! ## Example
//!
//! ```rust
//! use mockzure::router::{Resolution, Router};
//! use mockzure::spec::{build_routes, Family, OperationDescriptor, SpecDocument};
//! use http::Method;
//!
//! let doc = SpecDocument {
//!     family: Family::Directory,
//!     name: "users".into(),
//!     operations: vec![OperationDescriptor::new("/users/{user-id}", "get", Some("GetUser"))],
//! };
//! let router = Router::new(build_routes(&[doc]));
//! match router.resolve(&Method::GET, "/users/42") {
//!     Resolution::Matched(m) => assert_eq!(m.get_path_param("user-id"), Some("42")),
//!     _ => unreachable!(),
//! }
//! ```

mod core;
mod pattern;

pub use core::{ParamVec, Resolution, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use pattern::{normalize_path, CompileError, PathPattern};
