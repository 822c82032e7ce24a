#![deny(clippy::all, clippy::pedantic)]
#![deny(missing_docs)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]
//! # makaba
//!
//! makaba is a convenient wrapper library around the makaba imageboard's JSON API.
//!
//! This library can:
//! - resolve every [`Board`] of the server and select one,
//! - list, filter and rank [`Thread`]s,
//! - fetch the [`Post`]s of a thread,
//! - collect attached [`File`]s by [`Category`] and download them,
//!   one by one or through a fixed pool of workers.
//!
//! Every request is single-shot: there are no retries, caches or rate limits.
//!
//! ## Example: Downloading every video of the most viewed thread.
//!
//! ```no_run
//! # type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
//! use makaba::{media::Category, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .board("b")
//!         .concurrent(true)
//!         .workers(4)
//!         .build()
//!         .await?;
//!
//!     let top = client.top_threads(None, "views", 1).await?;
//!     for thread in &top {
//!         let report = client
//!             .download_thread_media(thread, "downloads", Category::VIDEO)
//!             .await?;
//!         if let Some(report) = report {
//!             println!("{} files, {} failed", report.paths().len(), report.failures().len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`Board`]:    crate::board::Board
//! [`Thread`]:   crate::thread::Thread
//! [`Post`]:     crate::thread::Post
//! [`File`]:     crate::file::File
//! [`Category`]: crate::media::Category

/// Client module contains [`Client`] for querying boards, threads and media.
pub mod client;

/// Contains [`Error`]s that can be thrown by the libary.
///
/// [`Error`]: crate::error::Error
pub mod error;

pub mod media;

pub(crate) mod models;

pub mod rank;

pub(crate) mod result;

/// Contains [`Session`], the HTTP transport every request goes through.
///
/// [`Session`]: crate::session::Session
pub mod session;

pub use client::{Client, ClientBuilder, ThreadQuery};
pub use error::Error;
pub use models::*;
pub use result::Result;
