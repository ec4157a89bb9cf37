//! # CLI Module
//!
//! The `mockzure` binary's commands.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Load the description files and the data file, build the context and serve
//! until SIGINT or SIGTERM:
//!
//! ```bash
//! mockzure serve --config config.yaml --specs specs --addr 0.0.0.0:8090
//! ```
//!
//! Every flag falls back to its `MOCKZURE_*` environment variable, then to the
//! default (see [`runtime_config`](crate::runtime_config)).
//!
//! ### `routes`
//!
//! Print the compiled route table, identity routes included:
//!
//! ```bash
//! mockzure routes --specs specs
//! # GET /subscriptions/{subscriptionId}/resourcegroups -> resource_management/ResourceGroups_List
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{route_lines, run_cli, Cli, Commands};
