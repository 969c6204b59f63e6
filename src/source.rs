//! Channel catalog retrieval and the ingestion driver that feeds the index.

use anyhow::{Context, Result, anyhow};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::index::IndexStore;
use crate::models::{Category, ChannelRecord};

pub type Batch = Vec<ChannelRecord>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces channel records for a category in bounded batches.
///
/// The returned stream is lazy. A failure is yielded as an `Err` item, after which
/// consumers stop pulling.
pub trait ChannelSource: Send + Sync {
  fn fetch_batches(&self, category: Category, batch_size: usize) -> BoxStream<'_, Result<Batch>>;
}

/// One entry of an Xtream Codes `get_*_streams` listing.
#[derive(Debug, Deserialize)]
struct XtreamStream {
  #[serde(default)]
  stream_id: Option<serde_json::Value>,
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  container_extension: Option<String>,
}

impl XtreamStream {
  /// Providers send ids as numbers or strings.
  fn id(&self) -> Option<String> {
    match self.stream_id.as_ref()? {
      serde_json::Value::Number(n) => Some(n.to_string()),
      serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
      _ => None,
    }
  }
}

fn parse_streams(body: &str) -> Result<Vec<XtreamStream>> {
  serde_json::from_str(body).context("Failed to parse stream listing JSON")
}

/// Xtream Codes `player_api.php` catalog source.
pub struct XtreamSource {
  client: Client,
  base_url: String,
  username: String,
  password: String,
}

impl XtreamSource {
  pub fn new(base_url: &str, username: &str, password: &str) -> Self {
    Self {
      client: Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      username: username.to_string(),
      password: password.to_string(),
    }
  }

  fn action_for(category: Category) -> Option<&'static str> {
    match category {
      Category::Live => Some("get_live_streams"),
      Category::Vod | Category::Movie => Some("get_vod_streams"),
      Category::Series => None,
    }
  }

  fn playable_url(&self, category: Category, stream_id: &str, extension: Option<&str>) -> String {
    match category {
      Category::Live => format!("{}/live/{}/{}/{}.ts", self.base_url, self.username, self.password, stream_id),
      _ => format!(
        "{}/movie/{}/{}/{}.{}",
        self.base_url,
        self.username,
        self.password,
        stream_id,
        extension.filter(|e| !e.is_empty()).unwrap_or("mp4")
      ),
    }
  }

  fn to_records(&self, category: Category, streams: Vec<XtreamStream>) -> Vec<ChannelRecord> {
    let mut skipped = 0usize;
    let records: Vec<ChannelRecord> = streams
      .into_iter()
      .filter_map(|stream| {
        let Some(id) = stream.id() else {
          skipped += 1;
          return None;
        };
        let name = stream.name.as_deref().unwrap_or("").trim().to_string();
        let url = self.playable_url(category, &id, stream.container_extension.as_deref());
        Some(ChannelRecord { id, name, playable_url: url, category })
      })
      .collect();
    if skipped > 0 {
      warn!(category = %category, skipped, "ingest: skipped streams without an id");
    }
    records
  }

  async fn fetch_body(&self, action: &str) -> Result<String> {
    let endpoint = format!("{}/player_api.php", self.base_url);
    let url = Url::parse_with_params(
      &endpoint,
      &[("username", self.username.as_str()), ("password", self.password.as_str()), ("action", action)],
    )
    .with_context(|| format!("Invalid provider URL: {}", self.base_url))?;

    debug!(endpoint = %endpoint, action, "ingest: requesting streams");
    let response = self
      .client
      .get(url)
      .timeout(REQUEST_TIMEOUT)
      .send()
      .await
      .with_context(|| format!("Request to {} failed", endpoint))?
      .error_for_status()
      .context("Provider returned an error status")?;
    response.text().await.context("Failed to read provider response body")
  }

  async fn fetch_category(&self, category: Category) -> Result<Vec<ChannelRecord>> {
    let action = Self::action_for(category)
      .ok_or_else(|| anyhow!("{} channels are not supported by the Xtream source", category))?;
    let body = self.fetch_body(action).await?;
    let streams = parse_streams(&body)?;
    info!(category = %category, count = streams.len(), "ingest: retrieved streams");
    Ok(self.to_records(category, streams))
  }
}

impl ChannelSource for XtreamSource {
  fn fetch_batches(&self, category: Category, batch_size: usize) -> BoxStream<'_, Result<Batch>> {
    let batch_size = batch_size.max(1);
    stream::once(self.fetch_category(category))
      .flat_map(move |result| {
        let items: Vec<Result<Batch>> = match result {
          Ok(records) => records.chunks(batch_size).map(|chunk| Ok(chunk.to_vec())).collect(),
          Err(e) => vec![Err(e)],
        };
        stream::iter(items)
      })
      .boxed()
  }
}

/// Progress notifications sent from the ingestion task to the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
  BatchCommitted { category: Category, count: usize, total: usize },
  BatchRejected { category: Category, reason: String },
  Finished { category: Category, total: usize },
  Failed { category: Category, message: String },
}

/// Pull every batch of `category` from `source` into `store`.
///
/// A source error ends this category's stream; a rejected batch is skipped. Data
/// committed before either stays in place. Returns the number of committed records.
pub async fn ingest(
  source: &dyn ChannelSource,
  store: &dyn IndexStore,
  category: Category,
  batch_size: usize,
  progress: &mpsc::UnboundedSender<IngestEvent>,
) -> usize {
  let mut batches = source.fetch_batches(category, batch_size);
  let mut total = 0;

  while let Some(batch) = batches.next().await {
    let batch = match batch {
      Ok(batch) => batch,
      Err(e) => {
        error!(category = %category, committed = total, "ingest: source failed: {:#}", e);
        let _ = progress.send(IngestEvent::Failed { category, message: format!("{:#}", e) });
        return total;
      }
    };

    match store.upsert_many(batch) {
      Ok(count) => {
        total += count;
        debug!(category = %category, count, total, "ingest: batch committed");
        let _ = progress.send(IngestEvent::BatchCommitted { category, count, total });
      }
      Err(e) => {
        warn!(category = %category, err = %e, "ingest: batch rejected");
        let _ = progress.send(IngestEvent::BatchRejected { category, reason: e.to_string() });
      }
    }
  }

  info!(category = %category, total, "ingest: finished");
  let _ = progress.send(IngestEvent::Finished { category, total });
  total
}

/// Ingest several categories one after another.
pub async fn ingest_all(
  source: &dyn ChannelSource,
  store: &dyn IndexStore,
  categories: &[Category],
  batch_size: usize,
  progress: &mpsc::UnboundedSender<IngestEvent>,
) -> usize {
  let mut total = 0;
  for category in categories {
    total += ingest(source, store, *category, batch_size, progress).await;
  }
  total
}
