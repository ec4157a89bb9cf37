//! Unit tests for CLI commands

use crate::cli::{route_lines, Cli, Commands};
use crate::spec::{build_routes, Family, OperationDescriptor, SpecDocument};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_serve_flags() {
    let cli = Cli::try_parse_from([
        "mockzure",
        "serve",
        "--config",
        "data.json",
        "--specs",
        "/srv/specs",
        "--addr",
        "127.0.0.1:9999",
    ])
    .unwrap();

    match cli.command {
        Commands::Serve {
            config,
            specs,
            addr,
        } => {
            assert_eq!(config, PathBuf::from("data.json"));
            assert_eq!(specs, PathBuf::from("/srv/specs"));
            assert_eq!(addr, "127.0.0.1:9999");
        }
        Commands::Routes { .. } => panic!("Expected Serve command"),
    }
}

#[test]
fn test_routes_command_exists() {
    let cli = Cli::try_parse_from(["mockzure", "routes", "--specs", "specs"]).unwrap();
    assert!(matches!(cli.command, Commands::Routes { .. }));
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["mockzure", "generate"]).is_err());
}

#[test]
fn test_route_lines_format() {
    let doc = SpecDocument {
        family: Family::ResourceManagement,
        name: "compute".into(),
        operations: vec![OperationDescriptor::new(
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}",
            "get",
            Some("ResourceGroups_Get"),
        )],
    };
    let lines = route_lines(&build_routes(&[doc]));
    assert_eq!(
        lines,
        vec![
            "GET /subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName} -> resource_management/ResourceGroups_Get"
        ]
    );
}
