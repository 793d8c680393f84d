#![warn(missing_docs)]
//! Test surfaces: an in-memory proxy backend that records every call, a
//! static viewer pool and a JSONL sink for call logs.

mod recording;
mod viewers;

use anyhow::Result;
use holostack_core::SimTick;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub use recording::*;
pub use viewers::*;

/// A proxy call stamped with the tick it happened on.
#[derive(Debug, Serialize)]
pub struct CallRecord<'a> {
    /// Tick of the update context when the call was made.
    pub tick: SimTick,
    /// The call itself.
    pub call: &'a ProxyCall,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append one record.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
