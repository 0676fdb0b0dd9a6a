//! `landscape-sources`: concrete candidate sources and logo hosting.
//!
//! Everything here does I/O: files for peer landscapes and the company
//! database export, blocking HTTP for the member webpage and logos. Loading
//! is lazy; the engine asks each source for its bulk fetch at most once.

pub mod company_db;
pub mod http;
pub mod logos;
pub mod peer;
pub mod text;
pub mod webpage;

use std::path::Path;

use landscape_recon::source::{CandidateSource, SourceSet};
use landscape_recon::RunConfig;

pub use company_db::CompanyDbExport;
pub use http::{FetchError, HttpClient};
pub use logos::LogoDownloader;
pub use peer::PeerLandscape;
pub use text::read_lossy;
pub use webpage::MemberWebpage;

/// Every source a config names, ready for [`SourceSet::new`] to order.
pub fn configured_sources(config: &RunConfig, config_path: &Path, client: &HttpClient) -> Vec<Box<dyn CandidateSource>> {
    let mut sources: Vec<Box<dyn CandidateSource>> = Vec::new();
    for peer in &config.peers {
        sources.push(Box::new(PeerLandscape::from_config(peer, config_path)));
    }
    if let Some(ref web) = config.webpage {
        sources.push(Box::new(MemberWebpage::from_config(web, client.clone())));
    }
    if let Some(ref db) = config.company_db {
        sources.push(Box::new(CompanyDbExport::from_config(db, config_path)));
    }
    sources
}

pub fn source_set(config: &RunConfig, config_path: &Path, client: &HttpClient) -> SourceSet {
    SourceSet::new(configured_sources(config, config_path, client))
}

/// The configured logo host, if logo hosting is enabled.
pub fn logo_downloader(config: &RunConfig, config_path: &Path, client: &HttpClient) -> Option<LogoDownloader> {
    config
        .logos
        .as_ref()
        .map(|logos| LogoDownloader::from_config(logos, config_path, client.clone()))
}
