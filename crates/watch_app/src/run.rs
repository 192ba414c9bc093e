use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use watch_engine::{
    ExtractSettings, FetchSettings, ListingExtractor, ObservationStore, ReqwestFetcher, RunReport,
    Scanner, TelegramNotifier,
};
use watch_logging::{watch_error, watch_info};

use crate::config::Config;

/// Scans every configured topic and raises the change marker if any record changed.
pub async fn execute(config: &Config) -> anyhow::Result<RunReport> {
    let extractor = ListingExtractor::new(ExtractSettings::default())
        .context("building listing extractor")?;
    let notifier =
        TelegramNotifier::new(config.telegram.clone()).context("building notifier")?;
    let scanner = Scanner::new(
        Arc::new(ReqwestFetcher::new(FetchSettings::default())),
        Arc::new(extractor),
        Arc::new(ObservationStore::new(config.data_dir.clone())),
        Arc::new(notifier),
    );

    watch_info!(
        "Scanning {} topics, state in {:?}",
        config.topics.len(),
        config.data_dir
    );
    let report = scanner.run_topics(&config.topics).await;

    for failure in &report.failures {
        watch_error!("Topic {:?} failed: {}", failure.topic, failure.error);
    }
    watch_info!(
        "Run finished: {} scanned, {} failed, {} skipped",
        report.reports.len(),
        report.failures.len(),
        report.skipped.len()
    );

    if report.any_changed() {
        raise_change_marker(&config.change_marker)?;
    }
    Ok(report)
}

/// Creates (or truncates) the empty marker file watched by the commit workflow.
pub fn raise_change_marker(path: &Path) -> anyhow::Result<()> {
    File::create(path).with_context(|| format!("creating change marker {path:?}"))?;
    watch_info!("State changed; raised marker {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;
    use watch_core::Topic;
    use watch_engine::TelegramSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn mock_server(page_images: &[&str]) -> MockServer {
        let server = MockServer::start().await;
        let items: String = page_images
            .iter()
            .map(|src| format!(r#"<div class="feeditem"><div class="pic"><img src="{src}"></div></div>"#))
            .collect();
        Mock::given(method("GET"))
            .and(path("/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!("<html><body>{items}</body></html>"), "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;
        server
    }

    fn config(server: &MockServer, temp: &TempDir) -> Config {
        let mut telegram = TelegramSettings::new("token", "1");
        telegram.api_base = server.uri();
        Config {
            topics: vec![Topic::new("sofas", format!("{}/list", server.uri()))],
            telegram,
            data_dir: temp.path().join("data"),
            change_marker: temp.path().join("push_me"),
        }
    }

    #[tokio::test]
    async fn changed_state_raises_marker() {
        let server = mock_server(&["imgA", "imgB"]).await;
        let temp = TempDir::new().unwrap();
        let config = config(&server, &temp);

        let report = execute(&config).await.unwrap();

        assert!(report.is_success());
        assert!(report.any_changed());
        assert_eq!(fs::read_to_string(&config.change_marker).unwrap(), "");
        assert!(config.data_dir.join("sofas.json").exists());
    }

    #[tokio::test]
    async fn unchanged_state_leaves_marker_absent() {
        let server = mock_server(&["imgA"]).await;
        let temp = TempDir::new().unwrap();
        let config = config(&server, &temp);
        fs::create_dir_all(&config.data_dir).unwrap();
        fs::write(config.data_dir.join("sofas.json"), r#"["imgA"]"#).unwrap();

        let report = execute(&config).await.unwrap();

        assert!(report.is_success());
        assert!(!config.change_marker.exists());
    }

    #[test]
    fn marker_is_truncated_not_appended() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("push_me");
        fs::write(&marker, "stale").unwrap();
        raise_change_marker(&marker).unwrap();
        assert_eq!(fs::read_to_string(&marker).unwrap(), "");
    }
}
