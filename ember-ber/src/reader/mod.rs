//! Streaming (byte-fed) BER reader
//!
//! The reader consumes bytes in arbitrarily sized chunks and reports
//! containers and items to a [`ReaderHandler`] as soon as they are
//! complete. Feeding one byte at a time and feeding a whole document at
//! once produce the same sequence of events.

pub mod config;
pub mod handler;
pub mod async_reader;

pub use config::ReaderConfig;
pub use handler::{EventCollector, ReaderEvent, ReaderHandler};
pub use async_reader::AsyncBerReader;
