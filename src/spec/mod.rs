//! # Spec Module
//!
//! Turns API description files into the flat route list the router consumes.
//!
//! ## Overview
//!
//! - [`SpecSource`] supplies decoded [`SpecDocument`]s, one per file, each
//!   tagged with its owning [`Family`]. [`DirectorySpecSource`] reads the
//!   conventional `specs/{arm,graph,identity}` layout; Swagger 2.0 documents
//!   are walked as JSON, OpenAPI 3 documents go through `oas3`.
//! - [`build_routes`] compiles every operation into a [`RouteMeta`]. Missing
//!   operation ids are synthesized from method and path, and malformed
//!   operations are logged and skipped so one bad path never blocks the rest.
//!
//! The routing core only ever sees [`SpecDocument`]s; it never parses file syntax.

mod build;
mod load;
mod types;

pub use build::{build_routes, compile_operation, synthesize_operation_id, ROUTABLE_METHODS};
pub use load::{
    document_from_value, is_placeholder, DirectorySpecSource, LoadSummary, LoadedSpecs,
    SpecSource,
};
pub use types::{Family, OperationDescriptor, RouteMeta, SpecDocument};
