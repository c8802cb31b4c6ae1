//! Server bring-up: load, resolve, bind, then listen.

use crate::activity::{tracing_sink, LogSink, YELLOW, RESET};
use crate::app::{base_url, bind_listener, serve, MockApp, ServerHandle};
use crate::binder::BindOptions;
use crate::config::{ConfigError, ServerConfig};
use crate::error::StartupError;
use crate::hooks::HookMap;
use crate::registry::{ApiDescription, Registry};
use crate::schema::{load_formats, FakerGenerator, FormatMap, LocalResolver, ReferenceResolver};
use std::sync::Arc;
use tracing::info;

/// Start a mock server for `config`, logging activity through `tracing`.
pub async fn launch(config: &ServerConfig, hooks: HookMap) -> Result<ServerHandle, StartupError> {
    let sink = (!config.silent).then(tracing_sink);
    launch_with_sink(config, hooks, sink).await
}

/// Start a mock server writing activity to `sink` (`None` is silent).
///
/// Startup completes (description loaded, references resolved, routes bound and
/// logged) before the listener accepts its first connection.
pub async fn launch_with_sink(
    config: &ServerConfig,
    hooks: HookMap,
    sink: Option<LogSink>,
) -> Result<ServerHandle, StartupError> {
    config.validate()?;
    let definition = config
        .definition
        .as_deref()
        .ok_or(ConfigError::MissingDefinition)?;

    let api = ApiDescription::from_file(definition)?;
    let definitions = api.decode_definitions()?;
    info!(
        "Loaded {} with {} resources and {} definitions",
        definition.display(),
        api.resources.len(),
        definitions.len()
    );

    let formats = match config.formats {
        Some(ref path) => load_formats(path)?,
        None => FormatMap::new(),
    };

    let resolver = match config.reference_directory() {
        Some(directory) => LocalResolver::with_directory(directory),
        None => LocalResolver::new(),
    };
    let (refs, definitions) = resolver.resolve(&definitions)?;

    let registry = Registry::new(api.resources, definitions);
    let generator = FakerGenerator::new().with_formats(formats);
    let options = BindOptions {
        statuses: config.statuses.clone(),
        force_example: config.force_example,
    };
    let app = MockApp::build(
        Arc::new(registry),
        Arc::new(refs),
        Arc::new(generator),
        &options,
        &hooks,
        sink,
    )?;

    let listener = bind_listener(&config.host, config.port).await?;
    let app = Arc::new(app);
    let logger = app.logger().clone();
    let handle = serve(app, listener)?;

    logger.log(&format!(
        "Endpoint:\n  {YELLOW}{}{RESET}\n",
        base_url(handle.local_addr())
    ));
    Ok(handle)
}
