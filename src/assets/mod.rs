//! Asset acquisition
//!
//! Downloads testlet and collector executables onto the agent.

mod downloader;

pub use downloader::AssetDownloader;
