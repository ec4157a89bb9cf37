//! # Context Module
//!
//! [`MockContext`] owns every long-lived component: the record store, the
//! authorization gate, the OAuth2 server, the router and the dispatcher.
//!
//! [`MockContext::build`] is the only place these are wired together. There
//! are no globals; the server, the CLI and the tests each build their own
//! context and pass it by `Arc`.

use crate::config::MockConfig;
use crate::dispatcher::Dispatcher;
use crate::handlers::{DirectoryHandler, ResourceManagementHandler};
use crate::identity::{builtin_document, IdentityHandler, OAuth2Server};
use crate::mappers::{DirectoryMapper, ResourceManagerMapper};
use crate::middleware::TracingMiddleware;
use crate::router::Router;
use crate::security::AuthorizationGate;
use crate::spec::{build_routes, Family, SpecDocument};
use crate::store::{DataAccess, MockStore, StoreSnapshot};
use crate::telemetry::RedactionLevel;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Counts reported once the context is built.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContextSummary {
    pub routes: usize,
    pub documents: usize,
    pub resource_groups: usize,
    pub virtual_machines: usize,
    pub users: usize,
    pub service_principals: usize,
    pub clients: usize,
}

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct MockContext {
    pub store: Arc<MockStore>,
    pub gate: Arc<AuthorizationGate>,
    pub oauth: Arc<OAuth2Server>,
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
    pub summary: ContextSummary,
}

impl MockContext {
    /// Build a context with credential masking in request logs.
    #[must_use]
    pub fn build(config: MockConfig, documents: Vec<SpecDocument>) -> Self {
        Self::build_with_redaction(config, documents, RedactionLevel::Credentials)
    }

    /// Build a context from the decoded data file and the loaded description
    /// documents. The identity document is always added.
    ///
    /// Callers without a `client_id` are skipped with a warning. Without a
    /// data file path, a data reset restores the records passed in here.
    #[must_use]
    pub fn build_with_redaction(
        config: MockConfig,
        documents: Vec<SpecDocument>,
        redaction: RedactionLevel,
    ) -> Self {
        Self::assemble(config, documents, redaction, None)
    }

    /// Read the data file at `path` and build a context whose data reset
    /// re-reads that file.
    ///
    /// # Errors
    ///
    /// Fails if the data file cannot be read or decoded.
    pub fn load(
        path: &Path,
        documents: Vec<SpecDocument>,
        redaction: RedactionLevel,
    ) -> anyhow::Result<Self> {
        let config = MockConfig::load(path)?;
        Ok(Self::assemble(
            config,
            documents,
            redaction,
            Some(path.to_path_buf()),
        ))
    }

    fn assemble(
        config: MockConfig,
        mut documents: Vec<SpecDocument>,
        redaction: RedactionLevel,
        data_file: Option<PathBuf>,
    ) -> Self {
        let MockConfig {
            resource_groups,
            vms,
            users,
            service_accounts,
            clients,
            auth,
        } = config;

        let gate = Arc::new(AuthorizationGate::new(auth.reject_invalid_credentials));
        for account in service_accounts {
            let (principal, secret) = account.into_parts();
            if secret.is_empty() {
                warn!(
                    application_id = %principal.application_id,
                    "Service account has no secret, Basic and client_credentials will be refused"
                );
            }
            gate.register(principal, &secret);
        }

        let mut store = MockStore::new(StoreSnapshot::new(
            resource_groups,
            vms,
            users,
            gate.principals(),
        ));
        if let Some(path) = data_file {
            store = store.with_data_file(path);
        }
        let store = Arc::new(store);

        let oauth = Arc::new(OAuth2Server::new());
        let mut registered_clients = 0;
        for caller in clients {
            let client_id = caller.client_id.clone();
            match oauth.register_caller(caller) {
                Ok(_) => registered_clients += 1,
                Err(e) => warn!(client_id = %client_id, error = %e, "Skipping invalid client"),
            }
        }

        let document_count = documents.len();
        documents.push(builtin_document());
        let router = Arc::new(Router::new(build_routes(&documents)));

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(
            Family::ResourceManagement,
            Arc::new(ResourceManagementHandler::new(
                Arc::clone(&gate),
                Arc::clone(&store),
                Arc::new(ResourceManagerMapper),
            )),
        );
        dispatcher.register(
            Family::Directory,
            Arc::new(DirectoryHandler::new(
                Arc::clone(&gate),
                Arc::clone(&store),
                Arc::new(DirectoryMapper),
            )),
        );
        dispatcher.register(
            Family::Identity,
            Arc::new(IdentityHandler::new(
                Arc::clone(&oauth),
                Arc::clone(&gate),
                Arc::clone(&store),
            )),
        );
        dispatcher.add_middleware(Arc::new(TracingMiddleware::new(redaction)));

        let snapshot = store.snapshot();
        let stats = snapshot.stats();
        let summary = ContextSummary {
            routes: router.len(),
            documents: document_count,
            resource_groups: snapshot.resource_groups().len(),
            virtual_machines: stats.total_vms,
            users: stats.total_users,
            service_principals: gate.principals().len(),
            clients: registered_clients,
        };
        info!(
            routes = summary.routes,
            documents = summary.documents,
            virtual_machines = summary.virtual_machines,
            users = summary.users,
            service_principals = summary.service_principals,
            clients = summary.clients,
            "Mock context built"
        );

        Self {
            store,
            gate,
            oauth,
            router,
            dispatcher: Arc::new(dispatcher),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use crate::spec::OperationDescriptor;

    #[test]
    fn test_build_wires_all_families() {
        let config = MockConfig::parse(
            r#"
users: [{id: u-1, displayName: Alice}]
serviceAccounts:
  - applicationId: app-1
    secret: s
clients:
  - client_id: web
  - client_id: ""
"#,
            ConfigFormat::Yaml,
        )
        .unwrap();
        let documents = vec![SpecDocument {
            family: Family::Directory,
            name: "users".into(),
            operations: vec![OperationDescriptor::new("/users", "get", Some("ListUsers"))],
        }];

        let ctx = MockContext::build(config, documents);
        assert!(ctx.dispatcher.has_handler(Family::ResourceManagement));
        assert!(ctx.dispatcher.has_handler(Family::Directory));
        assert!(ctx.dispatcher.has_handler(Family::Identity));
        assert_eq!(ctx.summary.documents, 1);
        assert_eq!(ctx.summary.routes, 1 + builtin_document().operations.len());
        assert_eq!(ctx.summary.service_principals, 1);
        assert_eq!(ctx.summary.clients, 1);
        assert!(ctx.gate.principal("app-1").is_some());
        assert_eq!(ctx.store.stats().total_users, 1);
    }

    #[test]
    fn test_load_keeps_data_file_for_reset() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"users: [{id: u-1}, {id: u-2}]\n").unwrap();
        file.flush().unwrap();

        let ctx = MockContext::load(file.path(), Vec::new(), RedactionLevel::Credentials).unwrap();
        assert_eq!(ctx.store.data_file(), Some(file.path()));
        assert_eq!(ctx.summary.users, 2);

        assert!(MockContext::load(
            Path::new("/nonexistent/mockzure.yaml"),
            Vec::new(),
            RedactionLevel::Credentials
        )
        .is_err());
    }
}
