//! Shared runtime state handed to commands
//!
//! [`RuntimeContext`] bundles the AWS session and the object store. It is
//! built once by [`bootstrap`], attached to the execution [`Context`], and
//! only ever read afterwards.

use std::sync::{Arc, OnceLock};

use llama_core::{Error, ObjectStore, Result, RuntimeConfig};
use llama_s3::Session;
use tracing::Instrument;

use crate::output::OutputConfig;

/// Session and store shared by every command
pub struct RuntimeContext {
    session: Session,
    store: Arc<dyn ObjectStore>,
}

impl RuntimeContext {
    pub fn new(session: Session, store: Arc<dyn ObjectStore>) -> Self {
        Self { session, store }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The process's object store, concurrency limited if configured
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("session", &self.session)
            .field("store_limit", &self.store.concurrency_limit())
            .finish()
    }
}

/// Build the session, then the store, stopping at the first failure
pub async fn bootstrap(config: &RuntimeConfig) -> Result<RuntimeContext> {
    async {
        let session = Session::new(config.region.as_deref(), config.debug_provider).await?;
        let store = llama_s3::open_store(&session, &config.store, config.store_concurrency)?;
        Ok::<_, Error>(RuntimeContext::new(session, store))
    }
    .instrument(tracing::info_span!("global-init"))
    .await
}

/// Execution context passed by reference into every command
#[derive(Debug, Default)]
pub struct Context {
    output: OutputConfig,
    runtime: OnceLock<RuntimeContext>,
}

impl Context {
    pub fn new(output: OutputConfig) -> Self {
        Self {
            output,
            runtime: OnceLock::new(),
        }
    }

    /// Output settings from the global flags
    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Attach the runtime; a second attach is rejected
    pub fn attach(&self, runtime: RuntimeContext) -> Result<()> {
        self.runtime
            .set(runtime)
            .map_err(|_| Error::General("runtime context already attached".into()))
    }

    /// The attached runtime
    ///
    /// Fails with `Error::RuntimeNotAttached` when called before [`Context::attach`].
    pub fn runtime(&self) -> Result<&RuntimeContext> {
        self.runtime.get().ok_or(Error::RuntimeNotAttached)
    }
}
