use scraper::{Html, Selector};

/// Title served by the bot-detection interstitial instead of the listing page.
pub const BOT_DETECTION_TITLE: &str = "ShieldSquare Captcha";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("bot detection page served (title {title:?})")]
    BotDetected { title: String },
    #[error("no listing elements matched {selector:?}")]
    NoListings { selector: String },
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Produces the ordered image references found inside listing elements.
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<Vec<String>, ParseError>;

    /// Fails when the page is a bot-detection substitute. Runs before the
    /// response status is checked, since such pages often come with a 403.
    fn check_interstitial(&self, _html: &str) -> Result<(), ParseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSettings {
    pub listing_selector: String,
    pub picture_selector: String,
    pub image_selector: String,
    pub image_attr: String,
    pub bot_title: String,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            listing_selector: ".feeditem".to_string(),
            picture_selector: ".pic".to_string(),
            image_selector: "img".to_string(),
            image_attr: "src".to_string(),
            bot_title: BOT_DETECTION_TITLE.to_string(),
        }
    }
}

/// Selector-driven extractor for feed style listing pages:
/// - fails when the first `<title>`, ignoring surrounding whitespace, equals
///   the bot-detection marker
/// - fails when no listing element exists at all
/// - otherwise collects the image attribute of the first image inside each
///   picture element of each listing, in document order.
#[derive(Debug)]
pub struct ListingExtractor {
    title: Selector,
    listing: Selector,
    listing_source: String,
    picture: Selector,
    image: Selector,
    image_attr: String,
    bot_title: String,
}

impl ListingExtractor {
    pub fn new(settings: ExtractSettings) -> Result<Self, ParseError> {
        Ok(Self {
            title: parse_selector("title")?,
            listing: parse_selector(&settings.listing_selector)?,
            listing_source: settings.listing_selector,
            picture: parse_selector(&settings.picture_selector)?,
            image: parse_selector(&settings.image_selector)?,
            image_attr: settings.image_attr,
            bot_title: settings.bot_title,
        })
    }

    fn reject_interstitial(&self, doc: &Html) -> Result<(), ParseError> {
        if let Some(title) = doc.select(&self.title).next() {
            let text = title.text().collect::<String>();
            if text.trim() == self.bot_title {
                return Err(ParseError::BotDetected { title: text });
            }
        }
        Ok(())
    }
}

impl Extractor for ListingExtractor {
    fn check_interstitial(&self, html: &str) -> Result<(), ParseError> {
        self.reject_interstitial(&Html::parse_document(html))
    }

    fn extract(&self, html: &str) -> Result<Vec<String>, ParseError> {
        let doc = Html::parse_document(html);
        self.reject_interstitial(&doc)?;

        let mut listings = doc.select(&self.listing).peekable();
        if listings.peek().is_none() {
            return Err(ParseError::NoListings {
                selector: self.listing_source.clone(),
            });
        }

        let mut images = Vec::new();
        for listing in listings {
            for picture in listing.select(&self.picture) {
                let src = picture
                    .select(&self.image)
                    .next()
                    .and_then(|img| img.value().attr(&self.image_attr))
                    .map(str::trim)
                    .filter(|src| !src.is_empty());
                if let Some(src) = src {
                    images.push(src.to_string());
                }
            }
        }
        Ok(images)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|err| ParseError::InvalidSelector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}
