//! Axum signaling server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lens_api::{create_router, metrics, ApiConfig, AppState};
use lens_media::{DetectorConfig, PipelineConfig, YoloDetector};
use lens_rtc::{LoopbackFactory, SessionManager};
use lens_sink::{DetectionSink, SinkConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("lens=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting lens-api");

    // Load configuration
    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    // Load the detection model up front so a bad model path fails fast
    let detector_config = DetectorConfig::from_env();
    let detector = match YoloDetector::new(detector_config) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            error!("Failed to load detection model: {}", e);
            std::process::exit(1);
        }
    };

    // Detection event sink is optional; without SINK_URL detections are
    // only drawn on the outbound video
    let publisher = match SinkConfig::from_env() {
        Some(sink_config) => match DetectionSink::spawn(sink_config) {
            Ok(sink) => {
                info!("Detection sink enabled");
                Some(Arc::new(sink) as Arc<dyn lens_media::BatchPublisher>)
            }
            Err(e) => {
                error!("Failed to start detection sink: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("SINK_URL not set, detection publishing disabled");
            None
        }
    };

    let pipeline_config = PipelineConfig {
        decimation_factor: config.decimation_factor,
        ..PipelineConfig::default()
    };

    let manager = Arc::new(SessionManager::new(
        Arc::new(LoopbackFactory),
        detector,
        publisher,
        pipeline_config,
    ));

    // Initialize metrics
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    // Create router
    let app = create_router(AppState::new(config.clone(), Arc::clone(&manager)), metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Close every live session before exiting
    manager.shutdown_all().await;

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
