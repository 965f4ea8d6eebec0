use anyhow::{bail, Context, Result};
use sheet_reports::{fetch::HttpSource, telemetry, Config, UpdatePipeline};
use std::{env, sync::Arc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use warp::{reject::Rejection, reply::Reply, Filter};

const SUCCESS_REPLY: &str = "Plots updated successfully!";

fn main() -> Result<()> {
    // ─── 1) config + logging ─────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config =
        Config::load(&config_path).with_context(|| format!("loading config {}", config_path))?;
    telemetry::init(&config.log_file)?;

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) dispatch ─────────────────────────────────────────────────
    match env::args().nth(1).as_deref() {
        None | Some("run") => {
            let message = run_update(config)?;
            info!("{}", message);
            Ok(())
        }
        Some("serve") => {
            let port: u16 = env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080);
            tokio::runtime::Runtime::new()
                .context("starting tokio runtime")?
                .block_on(serve(config, port))
        }
        Some(other) => bail!("unknown command {:?}; expected `run` or `serve`", other),
    }
}

/// One blocking update run.
fn run_update(config: Config) -> Result<&'static str> {
    let pipeline = UpdatePipeline::new(config, HttpSource::default())?;
    pipeline.run()?;
    Ok(SUCCESS_REPLY)
}

/// Run an update on the blocking pool and turn the outcome into the reply
/// text. Only one update runs at a time.
async fn trigger<F>(update: F, lock: Arc<Mutex<()>>) -> Result<String, Rejection>
where
    F: Fn() -> Result<&'static str> + Send + 'static,
{
    let _guard = lock.lock().await;
    let outcome = tokio::task::spawn_blocking(move || update()).await;
    Ok(match outcome {
        Ok(Ok(message)) => message.to_string(),
        Ok(Err(e)) => {
            warn!("update failed: {:#}", e);
            format!("ERROR: {}", e)
        }
        Err(e) => format!("ERROR: {}", e),
    })
}

fn routes<F>(update: F) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    F: Fn() -> Result<&'static str> + Clone + Send + Sync + 'static,
{
    let lock = Arc::new(Mutex::new(()));

    let health = warp::path("health").and(warp::get()).map(|| {
        warp::reply::json(&serde_json::json!({
            "status": "healthy",
            "service": "sheet-reports"
        }))
    });

    let run = warp::path::end()
        .and(warp::get())
        .and_then(move || trigger(update.clone(), Arc::clone(&lock)));

    health.or(run)
}

async fn serve(config: Config, port: u16) -> Result<()> {
    let config = Arc::new(config);
    let update = move || run_update((*config).clone());

    info!("Server starting on port {}", port);
    info!("Update endpoint: GET http://localhost:{}/", port);
    warp::serve(routes(update)).run(([0, 0, 0, 0], port)).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn test_success_reply() {
        let api = routes(|| Ok(SUCCESS_REPLY));
        let resp = warp::test::request().method("GET").path("/").reply(&api).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body(), "Plots updated successfully!");
    }

    #[tokio::test]
    async fn test_failure_reply_carries_message() {
        let api = routes(|| Err(anyhow!("2 of 6 reports failed")));
        let resp = warp::test::request().method("GET").path("/").reply(&api).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body(), "ERROR: 2 of 6 reports failed");
    }

    #[tokio::test]
    async fn test_health() {
        let api = routes(|| Ok(SUCCESS_REPLY));
        let resp = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&api)
            .await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "healthy");
    }
}
