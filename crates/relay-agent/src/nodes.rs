//! Runtime wiring for the serve mode.

use std::sync::Arc;

use anyhow::Result;

use relay_agent::{
    ArtifactFetcher, BackendArtifacts, ComfyUiClient, DeliveryChannel, GatewayState, JobProbe,
    JobRegistry, JobService, LineChannel, Materializer, ProbeRouter, RuntimeSettings,
    TranscriberClient, run_http,
};

/// Build the full stack from settings and run the gateway until shutdown.
///
/// Monitors are in-memory only: jobs still polling when the process exits are
/// lost and will never be delivered. Known limitation of the fire-and-forget
/// design; the external backends keep the results either way.
pub async fn run_serve_mode(bind: Option<String>, settings: RuntimeSettings) -> Result<()> {
    let monitor_config = settings.monitor.to_config();

    let synth = Arc::new(ComfyUiClient::from_settings(&settings.backends));
    let transcriber = Arc::new(TranscriberClient::from_settings(&settings.backends));
    let probes: Vec<Arc<dyn JobProbe>> = vec![
        Arc::clone(&synth) as Arc<dyn JobProbe>,
        Arc::clone(&transcriber) as Arc<dyn JobProbe>,
    ];
    let router = Arc::new(ProbeRouter::new(probes, monitor_config.probe_timeout));

    let registry = Arc::new(JobRegistry::new());
    let fetcher: Arc<dyn ArtifactFetcher> = Arc::new(BackendArtifacts::new(
        Arc::clone(&synth),
        Arc::clone(&transcriber),
    ));
    let materializer = Arc::new(Materializer::new(
        fetcher,
        settings.media.dir.clone(),
        settings.media.public_base_url.clone(),
        settings.media.resolved_preview_image_url(),
        monitor_config.materialize_retries,
    ));

    let channel: Arc<dyn DeliveryChannel> = Arc::new(LineChannel::new(
        &settings.line.api_base,
        &settings.line.channel_access_token,
    ));

    let service = Arc::new(JobService::new(
        registry,
        router,
        materializer,
        Arc::clone(&channel),
        monitor_config,
    ));

    let state = GatewayState {
        service,
        channel,
        synth,
        transcriber,
        media_dir: settings.media.dir.clone(),
        webhook_secret: settings.line.webhook_secret.clone(),
    };

    let bind = bind.unwrap_or_else(|| settings.gateway.bind.clone());
    run_http(state, &bind).await
}
