// Per-take event loop
//
// One task per take owns the chunk, recognition, and tick receivers and
// folds them into buffers. None of the handlers await, so a burst on one
// channel never holds up the others. The controller drives shutdown through
// the command channel: FreezeTimer, then Finish.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::transcript::TranscriptBuffer;
use crate::capture::MediaChunk;
use crate::speech::RecognitionEvent;

/// Counters readable while a take is in progress
#[derive(Debug, Default)]
pub struct LiveCounters {
    elapsed_seconds: AtomicU64,
    media_chunks: AtomicUsize,
    transcript_segments: AtomicUsize,
}

impl LiveCounters {
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds.load(Ordering::SeqCst)
    }

    pub fn media_chunks(&self) -> usize {
        self.media_chunks.load(Ordering::SeqCst)
    }

    pub fn transcript_segments(&self) -> usize {
        self.transcript_segments.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.elapsed_seconds.store(0, Ordering::SeqCst);
        self.media_chunks.store(0, Ordering::SeqCst);
        self.transcript_segments.store(0, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopCommand {
    /// Count ticks already delivered, then ignore the timer
    FreezeTimer,
    /// Drain whatever is buffered and return
    Finish,
}

#[derive(Debug, Default)]
pub(crate) struct LoopOutput {
    pub chunks: Vec<MediaChunk>,
    pub transcript: TranscriptBuffer,
}

pub(crate) struct RecordingLoop {
    pub chunks: mpsc::Receiver<MediaChunk>,
    pub speech: Option<mpsc::Receiver<RecognitionEvent>>,
    pub ticks: mpsc::Receiver<()>,
    pub commands: mpsc::Receiver<LoopCommand>,
    pub counters: std::sync::Arc<LiveCounters>,
}

impl RecordingLoop {
    pub(crate) async fn run(self) -> LoopOutput {
        let RecordingLoop {
            mut chunks,
            mut speech,
            mut ticks,
            mut commands,
            counters,
        } = self;

        let mut output = LoopOutput::default();
        let mut ticking = true;
        let mut capture_open = true;
        let mut speech_open = speech.is_some();

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(LoopCommand::FreezeTimer) => {
                        if ticking {
                            freeze_timer(&mut ticks, &counters);
                            ticking = false;
                        }
                    }
                    Some(LoopCommand::Finish) | None => {
                        if ticking {
                            freeze_timer(&mut ticks, &counters);
                        }
                        drain(&mut chunks, &mut speech, &mut output, &counters);
                        break;
                    }
                },

                tick = ticks.recv(), if ticking => match tick {
                    Some(()) => {
                        counters.elapsed_seconds.fetch_add(1, Ordering::SeqCst);
                    }
                    None => {
                        debug!("Timer source closed");
                        ticking = false;
                    }
                },

                chunk = chunks.recv(), if capture_open => match chunk {
                    Some(chunk) => on_chunk(&mut output, &counters, chunk),
                    None => {
                        info!("Capture device closed its stream");
                        capture_open = false;
                    }
                },

                event = next_event(&mut speech), if speech_open => match event {
                    Some(event) => on_recognition(&mut output, &counters, event),
                    None => {
                        info!("Speech recognizer closed its stream");
                        speech_open = false;
                    }
                },
            }
        }

        info!(
            "Take complete: {}s, {} chunks, {} transcript segments",
            counters.elapsed_seconds(),
            output.chunks.len(),
            output.transcript.len()
        );

        output
    }
}

async fn next_event(speech: &mut Option<mpsc::Receiver<RecognitionEvent>>) -> Option<RecognitionEvent> {
    match speech {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

fn freeze_timer(ticks: &mut mpsc::Receiver<()>, counters: &LiveCounters) {
    ticks.close();
    while ticks.try_recv().is_ok() {
        counters.elapsed_seconds.fetch_add(1, Ordering::SeqCst);
    }
}

fn drain(
    chunks: &mut mpsc::Receiver<MediaChunk>,
    speech: &mut Option<mpsc::Receiver<RecognitionEvent>>,
    output: &mut LoopOutput,
    counters: &LiveCounters,
) {
    while let Ok(chunk) = chunks.try_recv() {
        on_chunk(output, counters, chunk);
    }

    if let Some(rx) = speech {
        while let Ok(event) = rx.try_recv() {
            on_recognition(output, counters, event);
        }
    }
}

fn on_chunk(output: &mut LoopOutput, counters: &LiveCounters, chunk: MediaChunk) {
    // Recorders emit empty chunks around pauses; they carry no data
    if chunk.is_empty() {
        return;
    }
    output.chunks.push(chunk);
    counters
        .media_chunks
        .store(output.chunks.len(), Ordering::SeqCst);
}

fn on_recognition(output: &mut LoopOutput, counters: &LiveCounters, event: RecognitionEvent) {
    if !event.is_final {
        debug!("Discarding interim result ({} chars)", event.text.len());
        return;
    }

    if output.transcript.push_final(&event.text) {
        counters
            .transcript_segments
            .store(output.transcript.len(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Harness {
        chunks: mpsc::Sender<MediaChunk>,
        speech: mpsc::Sender<RecognitionEvent>,
        ticks: mpsc::Sender<()>,
        commands: mpsc::Sender<LoopCommand>,
        counters: Arc<LiveCounters>,
        task: tokio::task::JoinHandle<LoopOutput>,
    }

    fn spawn_loop() -> Harness {
        let (chunk_tx, chunk_rx) = mpsc::channel(16);
        let (speech_tx, speech_rx) = mpsc::channel(16);
        let (tick_tx, tick_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let counters = Arc::new(LiveCounters::default());

        let task = tokio::spawn(
            RecordingLoop {
                chunks: chunk_rx,
                speech: Some(speech_rx),
                ticks: tick_rx,
                commands: cmd_rx,
                counters: Arc::clone(&counters),
            }
            .run(),
        );

        Harness {
            chunks: chunk_tx,
            speech: speech_tx,
            ticks: tick_tx,
            commands: cmd_tx,
            counters,
            task,
        }
    }

    #[tokio::test]
    async fn test_ticks_after_freeze_are_not_counted() {
        let h = spawn_loop();
        h.ticks.send(()).await.unwrap();
        h.ticks.send(()).await.unwrap();
        h.commands.send(LoopCommand::FreezeTimer).await.unwrap();

        // The freeze closes the receiver, so later ticks are refused
        tokio::task::yield_now().await;
        let _ = h.ticks.send(()).await;

        h.commands.send(LoopCommand::Finish).await.unwrap();
        h.task.await.unwrap();
        assert_eq!(h.counters.elapsed_seconds(), 2);
    }

    #[tokio::test]
    async fn test_finish_drains_buffered_chunks_and_finals() {
        let h = spawn_loop();
        h.chunks.send(MediaChunk::new(vec![1u8])).await.unwrap();
        h.chunks.send(MediaChunk::new(Vec::new())).await.unwrap();
        h.chunks.send(MediaChunk::new(vec![2u8])).await.unwrap();
        h.speech.send(RecognitionEvent::interim("Hel")).await.unwrap();
        h.speech.send(RecognitionEvent::final_text("Hello")).await.unwrap();

        h.commands.send(LoopCommand::Finish).await.unwrap();
        let output = h.task.await.unwrap();

        let data: Vec<Vec<u8>> = output.chunks.iter().map(|c| c.data.clone()).collect();
        assert_eq!(data, vec![vec![1u8], vec![2u8]]);
        assert_eq!(output.transcript.segments(), &["Hello".to_string()]);
        assert_eq!(h.counters.media_chunks(), 2);
    }

    #[tokio::test]
    async fn test_closed_device_channels_do_not_end_the_take() {
        let h = spawn_loop();
        drop(h.chunks);
        drop(h.speech);

        h.ticks.send(()).await.unwrap();
        h.commands.send(LoopCommand::Finish).await.unwrap();
        let output = h.task.await.unwrap();

        assert!(output.chunks.is_empty());
        assert_eq!(h.counters.elapsed_seconds(), 1);
    }
}
