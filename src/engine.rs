//! Subtitle engine: the message-driven coordinator.
//!
//! One task owns every per-video buffer. Callers talk to it through an mpsc
//! channel; request/response pairs use oneshot channels. Debounce timers
//! are lightweight spawned sleeps that message the engine back, and flush
//! pipelines run as spawned tasks so other videos' messages keep flowing
//! while one video persists or waits on the annotation service.

use crate::annotator::Annotator;
use crate::buffer::{BufferRegistry, PushOutcome};
use crate::detector::detect_unknown_words;
use crate::indexer::{build_word_index, word_index_to_record};
use crate::known_words;
use crate::settings::{self, EngineConfig};
use crate::store::Store;
use crate::types::{SubtitleSegment, VideoCache};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub enum EngineMessage {
    /// Push one segment for a video. Acknowledged once buffered.
    Subtitle {
        video_id: String,
        segment: SubtitleSegment,
        ack: oneshot::Sender<()>,
    },
    /// Read the persisted cache for a video.
    GetVideoData {
        video_id: String,
        reply: oneshot::Sender<Option<VideoCache>>,
    },
    /// Internal: a debounce timer expired.
    FlushTimer { video_id: String, generation: u64 },
    /// Flush all non-empty buffers and wait for in-flight pipelines.
    Drain { done: oneshot::Sender<()> },
    /// Stop the engine loop.
    Shutdown,
}

/// Cloneable front door to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    /// Fire-and-forget segment push, acknowledged by the engine once the
    /// segment is buffered (or its batch flushed).
    pub async fn push_segment(&self, video_id: &str, segment: SubtitleSegment) -> Result<()> {
        let (ack, acked) = oneshot::channel();
        self.tx
            .send(EngineMessage::Subtitle {
                video_id: video_id.to_string(),
                segment,
                ack,
            })
            .await
            .map_err(|_| anyhow!("engine is not running"))?;
        acked.await.map_err(|_| anyhow!("engine is not running"))?;
        Ok(())
    }

    pub async fn get_video_data(&self, video_id: &str) -> Result<Option<VideoCache>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineMessage::GetVideoData {
                video_id: video_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| anyhow!("engine is not running"))?;
        response.await.map_err(|_| anyhow!("engine is not running"))
    }

    /// Flush everything pending and wait for all in-flight pipelines.
    pub async fn drain(&self) -> Result<()> {
        let (done, finished) = oneshot::channel();
        self.tx
            .send(EngineMessage::Drain { done })
            .await
            .map_err(|_| anyhow!("engine is not running"))?;
        finished.await.map_err(|_| anyhow!("engine is not running"))
    }

    /// Drain and stop the engine.
    pub async fn shutdown(&self) -> Result<()> {
        self.drain().await?;
        let _ = self.tx.send(EngineMessage::Shutdown).await;
        Ok(())
    }
}

pub struct Engine {
    config: EngineConfig,
    store: Arc<Store>,
    registry: BufferRegistry,
    rx: mpsc::Receiver<EngineMessage>,
    tx: mpsc::Sender<EngineMessage>,
    in_flight: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Spawn the engine task and return its handle.
    pub fn spawn(store: Arc<Store>, config: EngineConfig) -> EngineHandle {
        let (tx, rx) = mpsc::channel(64);
        let engine = Engine {
            registry: BufferRegistry::new(config.flush_threshold),
            config,
            store,
            rx,
            tx: tx.clone(),
            in_flight: Vec::new(),
        };

        tokio::spawn(engine.run());
        EngineHandle { tx }
    }

    async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                EngineMessage::Subtitle {
                    video_id,
                    segment,
                    ack,
                } => {
                    self.on_segment(video_id, segment);
                    let _ = ack.send(());
                }
                EngineMessage::FlushTimer {
                    video_id,
                    generation,
                } => {
                    if let Some(batch) = self.registry.on_timer(&video_id, generation) {
                        debug!(
                            "Debounce flush for video {} ({} segments)",
                            video_id,
                            batch.len()
                        );
                        self.spawn_flush(video_id, batch);
                    }
                }
                EngineMessage::GetVideoData { video_id, reply } => {
                    let cache = load_cache(&self.store, &video_id).await;
                    let _ = reply.send(cache);
                }
                EngineMessage::Drain { done } => {
                    for (video_id, batch) in self.registry.drain_all() {
                        debug!(
                            "Drain flush for video {} ({} segments)",
                            video_id,
                            batch.len()
                        );
                        self.spawn_flush(video_id, batch);
                    }
                    for handle in self.in_flight.drain(..) {
                        let _ = handle.await;
                    }
                    let _ = done.send(());
                }
                EngineMessage::Shutdown => break,
            }

            self.in_flight.retain(|handle| !handle.is_finished());
        }

        debug!("Engine loop stopped");
    }

    fn on_segment(&mut self, video_id: String, segment: SubtitleSegment) {
        match self.registry.push(&video_id, segment) {
            PushOutcome::Flush(batch) => {
                debug!(
                    "Threshold flush for video {} ({} segments)",
                    video_id,
                    batch.len()
                );
                self.spawn_flush(video_id, batch);
            }
            PushOutcome::ArmTimer(generation) => {
                let tx = self.tx.clone();
                let debounce = self.config.debounce;
                tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    let _ = tx
                        .send(EngineMessage::FlushTimer {
                            video_id,
                            generation,
                        })
                        .await;
                });
            }
            PushOutcome::Buffered => {}
        }
    }

    fn spawn_flush(&mut self, video_id: String, batch: Vec<SubtitleSegment>) {
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            run_flush(store, config, video_id, batch).await;
        });
        self.in_flight.push(handle);
    }
}

/// The flush pipeline: reconciliation → index → detect → annotate-merge →
/// persist. Every failure is recovered locally; the worst case is stale or
/// missing derived data, never a crash.
async fn run_flush(
    store: Arc<Store>,
    config: EngineConfig,
    video_id: String,
    batch: Vec<SubtitleSegment>,
) {
    let prior = load_cache(&store, &video_id).await;

    // Redundancy heuristic: skip when the prior cache already covers most
    // of this batch (count-based, an idempotence approximation).
    if let Some(prior) = &prior {
        if prior.segments.len() as u64 * 100 >= batch.len() as u64 * config.redundancy_percent {
            debug!(
                "Skipping redundant flush for video {} (cached {} segments, batch {})",
                video_id,
                prior.segments.len(),
                batch.len()
            );
            return;
        }
    }

    let index = build_word_index(&batch);
    let known = known_words::load_snapshot(&store).await;
    let unknown = detect_unknown_words(&index, &known);

    // Carry the prior annotation map; new entries overwrite, entries for
    // words not re-requested are preserved.
    let mut annotations = prior
        .map(|cache| cache.annotations)
        .unwrap_or_default();

    if !unknown.is_empty() {
        if let Some(api_key) = settings::get_api_key(&store).await {
            let app_settings = settings::get_settings(&store).await;
            let annotator = Annotator::new(
                &app_settings.annotation_base_url,
                &api_key,
                &app_settings.annotation_model,
            );
            match annotator.annotate(&unknown, config.annotation_limit).await {
                Ok(new_annotations) => {
                    debug!(
                        "Merged {} annotations for video {}",
                        new_annotations.len(),
                        video_id
                    );
                    annotations.extend(new_annotations);
                }
                Err(e) => {
                    // The index and statistics are persisted regardless.
                    warn!("Annotation failed for video {}: {:#}", video_id, e);
                }
            }
        }
    }

    let cache = VideoCache {
        video_id: video_id.clone(),
        word_index: word_index_to_record(&index),
        unknown_stats: unknown,
        segments: batch,
        annotations,
        timestamp: chrono::Utc::now().timestamp_millis(),
    };

    match save_cache(&store, &cache).await {
        Ok(()) => info!(
            "Indexed video {}: {} segments, {} unknown words",
            video_id,
            cache.segments.len(),
            cache.unknown_stats.len()
        ),
        Err(e) => warn!("Failed to persist cache for video {}: {:#}", video_id, e),
    }
}

async fn load_cache(store: &Store, video_id: &str) -> Option<VideoCache> {
    let value = store.get_one(&VideoCache::store_key(video_id)).await?;
    match serde_json::from_value(value) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!("Discarding malformed cache for video {}: {}", video_id, e);
            None
        }
    }
}

async fn save_cache(store: &Store, cache: &VideoCache) -> Result<()> {
    store
        .set_one(
            &VideoCache::store_key(&cache.video_id),
            serde_json::to_value(cache)?,
        )
        .await
}
