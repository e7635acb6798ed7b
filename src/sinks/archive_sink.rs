//! The archive-writer sink: the simplest possible `Sink`, wrapping
//! [`Archive::write`].

use async_trait::async_trait;
use tracing::error;

use crate::archive::Archive;
use crate::fanout::Sink;
use crate::message::Message;

pub struct ArchiveSink {
    archive: Archive,
}

impl ArchiveSink {
    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }
}

#[async_trait]
impl Sink for ArchiveSink {
    async fn accept(&self, msg: Message) {
        if let Err(err) = self.archive.write(&msg) {
            error!(error = %err, "archive write failed, record dropped");
        }
    }
}
