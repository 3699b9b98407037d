use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

use super::recognizer::{RecognitionError, RecognitionEvent, SpeechRecognizer};
use crate::capture::FeedError;

/// Recognizer fed by recognition results the client pushes
///
/// The client runs speech recognition next to its microphone; clones share
/// one feed, like `RemoteCapture`.
#[derive(Clone)]
pub struct RemoteRecognizer {
    sender: Arc<Mutex<Option<mpsc::Sender<RecognitionEvent>>>>,
    buffer: usize,
}

impl RemoteRecognizer {
    pub fn new(buffer: usize) -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            buffer: buffer.max(1),
        }
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.sender).is_some()
    }

    /// Forward one recognition result from the client
    pub async fn push(&self, event: RecognitionEvent) -> Result<(), FeedError> {
        let sender = lock(&self.sender)
            .clone()
            .ok_or(FeedError::NotListening)?;

        sender.send(event).await.map_err(|_| FeedError::NotListening)
    }

    fn set_sender(&self, sender: Option<mpsc::Sender<RecognitionEvent>>) {
        *lock(&self.sender) = sender;
    }
}

impl Default for RemoteRecognizer {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl SpeechRecognizer for RemoteRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>, RecognitionError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.set_sender(Some(tx));
        debug!("Remote recognizer listening");
        Ok(rx)
    }

    async fn stop(&mut self) {
        self.set_sender(None);
    }

    fn name(&self) -> &str {
        "remote"
    }
}

type SenderSlot = Option<mpsc::Sender<RecognitionEvent>>;

fn lock(slot: &Mutex<SenderSlot>) -> MutexGuard<'_, SenderSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
