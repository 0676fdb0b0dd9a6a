//! The public member listing page: one block per member with a link to the
//! member's site wrapping its logo image.

use landscape_recon::config::WebpageConfig;
use landscape_recon::model::OrganizationRecord;
use landscape_recon::source::{CandidateSource, SourceKind};
use landscape_recon::SourceError;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::http::HttpClient;

pub struct MemberWebpage {
    label: String,
    url: String,
    selector: String,
    client: HttpClient,
}

impl MemberWebpage {
    pub fn new(label: impl Into<String>, url: impl Into<String>, selector: impl Into<String>, client: HttpClient) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            selector: selector.into(),
            client,
        }
    }

    pub fn from_config(config: &WebpageConfig, client: HttpClient) -> Self {
        Self::new("webpage", config.url.clone(), config.selector.clone(), client)
    }

    /// Candidates from the page's member blocks. Blocks without a named
    /// image are ignored.
    pub fn parse(&self, html: &str) -> Result<Vec<OrganizationRecord>, SourceError> {
        let parse_err = |message: String| SourceError::Parse {
            source_label: self.label.clone(),
            message,
        };
        let block = Selector::parse(&self.selector).map_err(|e| parse_err(format!("selector '{}': {e}", self.selector)))?;
        let link = Selector::parse("a[href]").map_err(|e| parse_err(e.to_string()))?;
        let image = Selector::parse("img").map_err(|e| parse_err(e.to_string()))?;
        let base = Url::parse(&self.url).ok();

        let document = Html::parse_document(html);
        let records: Vec<_> = document
            .select(&block)
            .filter_map(|el| self.to_record(el, &link, &image, base.as_ref()))
            .collect();
        debug!(source = %self.label, candidates = records.len(), "member page parsed");
        Ok(records)
    }

    fn to_record(&self, block: ElementRef<'_>, link: &Selector, image: &Selector, base: Option<&Url>) -> Option<OrganizationRecord> {
        let anchor = block.select(link).next()?;
        let img = anchor.select(image).next().or_else(|| block.select(image).next())?;
        let name = img.value().attr("alt")?;
        let mut record = OrganizationRecord::new(name).ok()?;

        if let Some(href) = anchor.value().attr("href").map(|h| absolutize(base, h)) {
            if let Err(err) = record.set_website(&href) {
                debug!(name, error = %err, "member page link rejected");
            }
        }
        if let Some(src) = img.value().attr("src").map(|s| absolutize(base, s)) {
            if let Err(err) = record.set_logo(&src) {
                debug!(name, error = %err, "member page logo rejected");
            }
        }
        Some(record)
    }
}

fn absolutize(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href.trim()).ok()) {
        Some(url) => url.to_string(),
        None => href.trim().to_string(),
    }
}

impl CandidateSource for MemberWebpage {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Webpage
    }

    fn fetch(&self) -> Result<Vec<OrganizationRecord>, SourceError> {
        let html = self.client.get_text(&self.url).map_err(|e| SourceError::Fetch {
            source_label: self.label.clone(),
            message: e.to_string(),
        })?;
        self.parse(&html)
    }
}
