//! Listing watch engine: fetch, extract, persist and notify.
mod decode;
mod extract;
mod fetch;
mod notify;
mod scan;
mod store;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use extract::{ExtractSettings, Extractor, ListingExtractor, ParseError, BOT_DETECTION_TITLE};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use notify::{Notifier, NotifyError, TelegramNotifier, TelegramSettings, TELEGRAM_API_BASE};
pub use scan::{RunReport, ScanError, Scanner, TopicFailure, TopicReport};
pub use store::{ObservationStore, StoreError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
