use anyhow::{anyhow, Context, Result};
use ses_reputation_guard::action::SesSendingController;
use ses_reputation_guard::certificate::{self, HttpCertificateSource};
use ses_reputation_guard::config::{Config, ConfirmStrategy};
use ses_reputation_guard::handshake::{SnsApiConfirmer, SubscribeUrlConfirmer, SubscriptionConfirmer};
use ses_reputation_guard::http_server::{self, ServerState};
use ses_reputation_guard::{telemetry, Dispatcher, SignatureVerifier, TrustContext};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let format = config.as_ref().map(|c| c.log_format).unwrap_or_default();
    if let Err(e) = telemetry::init(format) {
        eprintln!("failed to initialise logging: {e}");
    }

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(anyhow::Error::new(e).context("loading configuration")),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;

    let cert_host = match &config.cert_host {
        Some(host) => host.clone(),
        None => {
            let region = aws
                .region()
                .ok_or_else(|| anyhow!("no AWS region configured and SNS_CERT_HOST is unset"))?;
            certificate::resolve_sns_cert_host(region.as_ref()).await?
        }
    };
    info!(cert_host = %cert_host, topic = %config.topic_arn, "trusting SNS signing certificates");

    let certificates = HttpCertificateSource::new(config.fetch_timeout)
        .context("building certificate HTTP client")?;
    let verifier = SignatureVerifier::new(
        Arc::new(TrustContext::new(cert_host.clone(), config.topic_arn.clone())),
        Arc::new(certificates),
    )
    .with_key_cache(config.cert_cache_ttl);

    let confirmer: Arc<dyn SubscriptionConfirmer> = match config.confirm_strategy {
        ConfirmStrategy::Api => Arc::new(SnsApiConfirmer::new(aws_sdk_sns::Client::new(&aws))),
        ConfirmStrategy::SubscribeUrl => Arc::new(
            SubscribeUrlConfirmer::new(cert_host, config.fetch_timeout)
                .context("building SubscribeURL HTTP client")?,
        ),
    };
    let sending = Arc::new(SesSendingController::new(aws_sdk_ses::Client::new(&aws)));
    let state = ServerState::new(verifier, Dispatcher::new(confirmer, sending));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, path = http_server::REPUTATION_ALARM_PATH, "SNS receiver listening");

    http_server::serve(listener, state, shutdown_signal())
        .await
        .context("serving HTTP")?;
    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
