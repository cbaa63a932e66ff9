//! # grab
//!
//! Downloads a file over HTTP/HTTPS, splitting it into byte-range chunks
//! fetched concurrently when the server allows it, and streaming it in one
//! request otherwise.
//!
//! - [`probe`] learns size, name and range support of a resource
//! - [`downloader`] picks a strategy and drives the [`pool`] of chunk fetches
//! - [`metadata`] records chunks that could not be fetched

pub mod chunk;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod hashing;
pub mod metadata;
pub mod mime;
pub mod output;
pub mod pool;
pub mod probe;
pub mod retry;
pub mod transfer;
pub mod utils;

pub use chunk::{Chunk, ChunkLayout};
pub use config::GrabConfig;
pub use downloader::{DownloadReport, Downloader};
pub use error::GrabError;
pub use metadata::TransferMetadata;
pub use retry::RetryPolicy;
pub use transfer::Transfer;
