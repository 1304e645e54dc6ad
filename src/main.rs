use srgan_enhancer::pipeline::StatsMonitor;
use srgan_enhancer::{
    AppError, Configuration, ContainerBounds, EnhancementPipeline, EnhancementSession,
    ProgressEvent,
};
use std::env;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, error, info, warn};

const CONFIG_ENV: &str = "ENHANCER_CONFIG";

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

async fn log_progress(mut progress_rx: broadcast::Receiver<ProgressEvent>) {
    loop {
        match progress_rx.recv().await {
            Ok(ProgressEvent::Advanced { request_id, state }) => {
                info!(
                    "[{}] {:>3}% {}",
                    request_id,
                    state.percent,
                    state.stage.description()
                );
            }
            Ok(ProgressEvent::Settled {
                request_id,
                succeeded,
            }) => {
                info!("[{}] settled (succeeded: {})", request_id, succeeded);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Progress logger skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn run(configuration: Configuration, input: PathBuf) -> Result<(), AppError> {
    let stats = StatsMonitor::new();
    let pipeline = EnhancementPipeline::builder(configuration)
        .observer(Box::new(stats.clone()))
        .build()?;
    info!("Using {} backend", pipeline.backend_name());

    let progress = tokio::spawn(log_progress(pipeline.subscribe()));

    let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = tokio::fs::read(&input).await?;

    let mut session = EnhancementSession::new(pipeline, ContainerBounds::new(0.0, 0.0));
    session.select_image(name, mime_type_for(&input), bytes)?;
    let outcome = session.enhance().await.map(|result| {
        (
            result.enhanced_image.clone(),
            result.elapsed_millis,
            result.speed_rating(),
        )
    });
    progress.abort();
    let (enhanced, elapsed_millis, rating) = outcome?;

    let download_name = session
        .download_name()
        .unwrap_or_else(|| "enhanced-image".to_string());
    let output = input.with_file_name(download_name);
    tokio::fs::write(&output, &enhanced).await?;

    let change = session
        .size_change_percent()
        .map(|percent| format!("{:+.1}%", percent))
        .unwrap_or_else(|| "n/a".to_string());
    info!(
        "Wrote {} in {}ms ({:?}, size change {})",
        output.display(),
        elapsed_millis,
        rating,
        change
    );
    info!("Session stats: {:?}", stats.stats());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = env::var_os(CONFIG_ENV).map(PathBuf::from);
    let configuration = Configuration::load(config_path.as_deref())?;
    init_logging(configuration.level()?);

    let Some(input) = env::args_os().nth(1).map(PathBuf::from) else {
        error!("Usage: srgan-enhancer <image>");
        return Err(AppError::NoImageSelected);
    };

    if let Err(e) = run(configuration, input).await {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}
