use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::Path;
use std::sync::Arc;
use sublex::cli::{Cli, Command, KnownAction};
use sublex::engine::Engine;
use sublex::known_words::KnownWords;
use sublex::settings::{self, EngineConfig};
use sublex::srt;
use sublex::store::Store;
use sublex::types::VideoCache;

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.debug);

    let store = Arc::new(Store::open(&args.store).await?);

    match args.command {
        Command::Ingest { video, file } => ingest(store, &video, &file).await,
        Command::Report { video, limit } => report(&store, &video, limit).await,
        Command::Known { action } => manage_known(store, action).await,
        Command::SetApiKey { api_key } => {
            settings::set_api_key(&store, &api_key).await?;
            println!("API key saved");
            Ok(())
        }
    }
}

async fn ingest(store: Arc<Store>, video_id: &str, path: &Path) -> Result<()> {
    let segments = srt::read_srt_file(path).await?;
    if segments.is_empty() {
        println!("No cues found in {:?}", path);
        return Ok(());
    }
    info!("Loaded {} cues from {:?}", segments.len(), path);

    // Whole file as one batch: keep the threshold above the cue count so
    // the final drain indexes everything in a single flush.
    let config = EngineConfig {
        flush_threshold: segments.len() + 1,
        ..EngineConfig::default()
    };

    let engine = Engine::spawn(Arc::clone(&store), config);
    for segment in segments {
        engine.push_segment(video_id, segment).await?;
    }
    engine.shutdown().await?;

    report(&store, video_id, 20).await
}

async fn report(store: &Store, video_id: &str, limit: usize) -> Result<()> {
    let cache = load_cache(store, video_id)
        .await
        .with_context(|| format!("no indexed data for video '{}'", video_id))?;

    let indexed_at = chrono::DateTime::from_timestamp_millis(cache.timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown time".to_string());

    println!(
        "Video '{}': {} segments, {} unknown words (indexed {})",
        video_id,
        cache.segments.len(),
        cache.unknown_stats.len(),
        indexed_at
    );

    for (rank, stats) in cache.unknown_stats.iter().take(limit).enumerate() {
        println!(
            "{:>3}. {:<20} {:>4}x  first at {}",
            rank + 1,
            stats.word,
            stats.count,
            format_position(stats.first_occurrence)
        );
        if let Some(annotation) = cache.annotations.get(&stats.word) {
            println!(
                "     {} {} - {}",
                annotation.ipa, annotation.translation, annotation.meaning
            );
        }
    }

    Ok(())
}

async fn manage_known(store: Arc<Store>, action: KnownAction) -> Result<()> {
    let mut known = KnownWords::load(Arc::clone(&store)).await;

    match action {
        KnownAction::Add { words } => {
            for word in &words {
                known.add(word).await?;
            }
            println!("{} known words", known.len());
        }
        KnownAction::Remove { words } => {
            for word in &words {
                known.remove(word).await?;
            }
            println!("{} known words", known.len());
        }
        KnownAction::Import { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read word list {:?}", file))?;
            known.import(content.split_whitespace()).await?;
            println!("{} known words after import", known.len());
        }
        KnownAction::Export => {
            for word in known.export() {
                println!("{}", word);
            }
        }
    }

    Ok(())
}

async fn load_cache(store: &Store, video_id: &str) -> Option<VideoCache> {
    let value = store.get_one(&VideoCache::store_key(video_id)).await?;
    serde_json::from_value(value).ok()
}

/// Format a millisecond offset as mm:ss (or h:mm:ss past the hour).
fn format_position(ms: i64) -> String {
    let total_seconds = ms / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_position() {
        assert_eq!(format_position(0), "00:00");
        assert_eq!(format_position(83_500), "01:23");
        assert_eq!(format_position(3_723_000), "1:02:03");
    }
}
