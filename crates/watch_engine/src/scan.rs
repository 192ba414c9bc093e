use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use watch_core::{failure_message, new_items_message, start_message, Topic, NO_NEW_ITEMS};
use watch_logging::{watch_error, watch_info, watch_warn};

use crate::{
    decode_html, Extractor, FetchError, Fetcher, Notifier, NotifyError, ObservationStore,
    ParseError, StoreError,
};

/// Terminal failure of one topic's scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    State(#[from] StoreError),
    #[error("{0}")]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicReport {
    pub topic: String,
    pub new_items: Vec<String>,
    pub changed: bool,
}

#[derive(Debug)]
pub struct TopicFailure {
    pub topic: String,
    pub error: ScanError,
    /// The record was rewritten before the failure (e.g. the summary was not delivered).
    pub state_changed: bool,
}

/// Aggregated outcome of one run over all configured topics.
#[derive(Debug, Default)]
pub struct RunReport {
    pub reports: Vec<TopicReport>,
    pub failures: Vec<TopicFailure>,
    pub skipped: Vec<String>,
}

impl RunReport {
    /// True when any topic's record changed, i.e. the change marker should be raised.
    /// Failed topics count when their record was written before they failed.
    pub fn any_changed(&self) -> bool {
        self.reports.iter().any(|report| report.changed)
            || self.failures.iter().any(|failure| failure.state_changed)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the fetch, extract, reconcile, notify pipeline for topics.
#[derive(Clone)]
pub struct Scanner {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    store: Arc<ObservationStore>,
    notifier: Arc<dyn Notifier>,
}

impl Scanner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        store: Arc<ObservationStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            notifier,
        }
    }

    /// Scans one topic. On failure a best-effort report is sent to the
    /// channel before the error is returned.
    pub async fn scan_topic(&self, topic: &Topic) -> Result<TopicReport, ScanError> {
        let mut state_changed = false;
        self.scan_tracked(topic, &mut state_changed).await
    }

    async fn scan_tracked(
        &self,
        topic: &Topic,
        state_changed: &mut bool,
    ) -> Result<TopicReport, ScanError> {
        match self.run_pipeline(topic, state_changed).await {
            Ok(report) => Ok(report),
            Err(err) => {
                watch_error!("Topic {:?} failed: {}", topic.name, err);
                if let Err(notify_err) = self.notifier.notify(&failure_message(&err.to_string())).await {
                    watch_warn!(
                        "Topic {:?}: failure report not delivered: {}",
                        topic.name,
                        notify_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        topic: &Topic,
        state_changed: &mut bool,
    ) -> Result<TopicReport, ScanError> {
        self.notifier
            .notify(&start_message(&topic.name, &topic.url))
            .await?;

        let page = self.fetcher.fetch(&topic.url).await?;
        let decoded = decode_html(
            &page.bytes,
            page.metadata.content_type.as_deref(),
            Some(&page.metadata.final_url),
        );
        // Interstitials are often served with an error status.
        self.extractor.check_interstitial(&decoded.html)?;
        page.ensure_success()?;
        let images = self.extractor.extract(&decoded.html)?;
        watch_info!(
            "Topic {:?}: {} images on page ({})",
            topic.name,
            images.len(),
            decoded.encoding_label
        );

        let outcome = self.store.reconcile(&topic.name, &images)?;
        *state_changed = outcome.changed;

        if outcome.new_items.is_empty() {
            self.notifier.notify(NO_NEW_ITEMS).await?;
        } else {
            self.notifier
                .notify(&new_items_message(&outcome.new_items))
                .await?;
        }

        Ok(TopicReport {
            topic: topic.name.clone(),
            new_items: outcome.new_items,
            changed: outcome.changed,
        })
    }

    /// Scans every enabled topic concurrently. A failing topic does not
    /// affect the others; its error is collected in the report.
    pub async fn run_topics(&self, topics: &[Topic]) -> RunReport {
        let mut report = RunReport::default();
        let mut enabled = Vec::new();
        for topic in topics {
            if topic.is_enabled() {
                enabled.push(topic);
            } else {
                watch_info!("Topic {:?} is disabled. Skipping.", topic.name);
                report.skipped.push(topic.name.clone());
            }
        }

        let results = join_all(
            enabled
                .iter()
                .map(|topic| async move {
                    let mut state_changed = false;
                    let result = self.scan_tracked(topic, &mut state_changed).await;
                    (topic.name.clone(), state_changed, result)
                }),
        )
        .await;

        for (topic, state_changed, result) in results {
            match result {
                Ok(topic_report) => report.reports.push(topic_report),
                Err(error) => report.failures.push(TopicFailure {
                    topic,
                    error,
                    state_changed,
                }),
            }
        }
        report
    }
}
