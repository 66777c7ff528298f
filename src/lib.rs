//! Yomiru: fetches manga chapters through a translation/colorization backend
//! and keeps the resulting pages on local storage for reading.

pub mod client;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod models;
pub mod reader;
pub mod settings;
pub mod storage;
pub mod traits;
pub mod utils;

pub use client::{ApiClient, ClientConfig};
pub use error::{Result, YomiruError};
pub use reader::ReaderSession;
pub use traits::ChapterProcessor;
