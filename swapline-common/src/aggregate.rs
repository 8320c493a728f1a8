//! Merges many independent, asynchronous reads into one list.
//!
//! Each registered [`ItemSource`] is fetched on its own and tracks its own [`SourceStatus`]. A
//! failing source keeps the items of its last successful fetch so one broken read does not blank
//! the whole view. The merged list is ordered most-recent-first and de-duplicated by key.

use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    hash::Hash,
    ops::Range,
    sync::Arc,
};

use async_trait::async_trait;
use futures03::{
    future::join_all,
    stream::{self, StreamExt, TryStreamExt},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::errors::ChainError;

/// An item shown in an aggregated list.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Ord + Debug + Send + Sync;

    /// Identity used to de-duplicate items reported by several sources.
    fn key(&self) -> Self::Key;

    /// Recency, e.g. a creation index or proposal id. Higher is more recent.
    fn ordinal(&self) -> u64;
}

#[async_trait]
pub trait ItemSource<T>: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<T>, ChainError>;
}

/// A contract exposing its items through a length and an index accessor, e.g.
/// `allPairsLength()` / `allPairs(i)` or `proposalCount()` / `proposals(i)`.
#[async_trait]
pub trait IndexedReader<T>: Send + Sync {
    async fn count(&self) -> Result<u64, ChainError>;

    async fn item_at(&self, index: u64) -> Result<T, ChainError>;
}

/// Which indices an [`IndexedSource`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexWindow {
    /// Every index up to the current count.
    #[default]
    All,
    /// The `take` highest indices after skipping the `skip` highest ones.
    Newest { skip: u64, take: u64 },
}

impl IndexWindow {
    /// The window for the `index`-th page of `size` items, newest first.
    pub fn page(index: u64, size: u64) -> Self {
        IndexWindow::Newest { skip: index.saturating_mul(size), take: size }
    }

    fn range(&self, count: u64) -> Range<u64> {
        match *self {
            IndexWindow::All => 0..count,
            IndexWindow::Newest { skip, take } => {
                let end = count.saturating_sub(skip);
                end.saturating_sub(take)..end
            }
        }
    }
}

/// Reads issued at once when no concurrency is configured.
pub const DEFAULT_READ_CONCURRENCY: usize = 16;

/// Adapts an [`IndexedReader`] into an [`ItemSource`] reading a window of indices below the
/// current count, at most `concurrency` at a time.
pub struct IndexedSource<R> {
    name: String,
    reader: R,
    window: IndexWindow,
    concurrency: usize,
}

impl<R> IndexedSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            window: IndexWindow::All,
            concurrency: DEFAULT_READ_CONCURRENCY,
        }
    }

    pub fn with_window(mut self, window: IndexWindow) -> Self {
        self.window = window;
        self
    }

    /// Caps in-flight reads. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

#[async_trait]
impl<T, R> ItemSource<T> for IndexedSource<R>
where
    T: Send + 'static,
    R: IndexedReader<T>,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<T>, ChainError> {
        let count = self.reader.count().await?;
        let range = self.window.range(count);
        debug!(source = %self.name, count, start = range.start, end = range.end, "Reading indexed items");
        stream::iter(range.map(|index| self.reader.item_at(index)))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Never fetched.
    Idle,
    Loading,
    Loaded { count: usize },
    Failed { error: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

/// One page of the merged list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub index: usize,
    /// Number of items across all pages.
    pub total: usize,
    pub has_more: bool,
}

struct SourceState<T> {
    status: SourceStatus,
    items: Vec<T>,
    /// Bumped on every refresh; only the fetch started last may write back.
    generation: u64,
}

pub struct ViewModelAggregator<T: Record> {
    sources: Vec<Arc<dyn ItemSource<T>>>,
    state: RwLock<HashMap<String, SourceState<T>>>,
}

impl<T: Record> Default for ViewModelAggregator<T> {
    fn default() -> Self {
        Self { sources: Vec::new(), state: RwLock::new(HashMap::new()) }
    }
}

impl<T: Record> ViewModelAggregator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source. Registering a second source with the same name replaces the first.
    pub fn with_source(mut self, source: Arc<dyn ItemSource<T>>) -> Self {
        self.sources
            .retain(|existing| existing.name() != source.name());
        self.state.get_mut().insert(
            source.name().to_string(),
            SourceState { status: SourceStatus::Idle, items: Vec::new(), generation: 0 },
        );
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources
            .iter()
            .map(|source| source.name())
            .collect()
    }

    /// Fetches every source concurrently.
    #[instrument(skip_all, fields(sources = self.sources.len()))]
    pub async fn refresh_all(&self) {
        join_all(
            self.sources
                .iter()
                .map(|source| self.refresh_source(source.as_ref())),
        )
        .await;
    }

    /// Fetches a single source again, e.g. after the user asked to retry it.
    pub async fn refresh(&self, name: &str) -> Result<(), AggregateError> {
        let source = self
            .sources
            .iter()
            .find(|source| source.name() == name)
            .ok_or_else(|| AggregateError::UnknownSource(name.to_string()))?;
        self.refresh_source(source.as_ref())
            .await;
        Ok(())
    }

    async fn refresh_source(&self, source: &dyn ItemSource<T>) {
        let name = source.name();
        let generation = {
            let mut state = self.state.write().await;
            let Some(entry) = state.get_mut(name) else {
                return;
            };
            entry.generation += 1;
            entry.status = SourceStatus::Loading;
            entry.generation
        };

        let fetched = source.fetch().await;

        let mut state = self.state.write().await;
        let Some(entry) = state.get_mut(name) else {
            return;
        };
        if entry.generation != generation {
            debug!(source = name, generation, latest = entry.generation, "Discarding superseded fetch");
            return;
        }
        match fetched {
            Ok(items) => {
                debug!(source = name, count = items.len(), "Source loaded");
                entry.status = SourceStatus::Loaded { count: items.len() };
                entry.items = items;
            }
            Err(err) => {
                warn!(source = name, %err, kept = entry.items.len(), "Source failed");
                entry.status = SourceStatus::Failed { error: err.to_string() };
            }
        }
    }

    pub async fn status(&self, name: &str) -> Option<SourceStatus> {
        self.state
            .read()
            .await
            .get(name)
            .map(|entry| entry.status.clone())
    }

    /// All items, most recent first and without duplicates.
    ///
    /// Ties in recency are broken by key, so the order is stable across refreshes.
    pub async fn items(&self) -> Vec<T> {
        let state = self.state.read().await;
        let mut merged: Vec<T> = self
            .sources
            .iter()
            .filter_map(|source| state.get(source.name()))
            .flat_map(|entry| entry.items.iter().cloned())
            .collect();
        drop(state);

        merged.sort_by(|a, b| {
            b.ordinal()
                .cmp(&a.ordinal())
                .then_with(|| a.key().cmp(&b.key()))
        });
        let mut seen = HashSet::new();
        merged.retain(|item| seen.insert(item.key()));
        merged
    }

    /// The `index`-th page of `size` items. A zero page size yields an empty page.
    pub async fn page(&self, index: usize, size: usize) -> Page<T> {
        let items = self.items().await;
        let total = items.len();
        if size == 0 {
            return Page { items: Vec::new(), index, total, has_more: total > 0 };
        }

        let start = index.saturating_mul(size).min(total);
        let end = start.saturating_add(size).min(total);
        Page { items: items[start..end].to_vec(), index, total, has_more: end < total }
    }

    pub async fn is_loading(&self) -> bool {
        self.state
            .read()
            .await
            .values()
            .any(|entry| entry.status == SourceStatus::Loading)
    }

    /// Failed sources and their error messages, in registration order.
    pub async fn errors(&self) -> Vec<(String, String)> {
        let state = self.state.read().await;
        self.sources
            .iter()
            .filter_map(|source| match state.get(source.name()) {
                Some(SourceState { status: SourceStatus::Failed { error }, .. }) => {
                    Some((source.name().to_string(), error.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tokio::sync::oneshot;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Proposal {
        id: u64,
        title: String,
    }

    impl Record for Proposal {
        type Key = u64;

        fn key(&self) -> u64 {
            self.id
        }

        fn ordinal(&self) -> u64 {
            self.id
        }
    }

    fn proposal(id: u64) -> Proposal {
        Proposal { id, title: format!("Proposal #{id}") }
    }

    /// Returns the scripted responses one after another, repeating the last one.
    struct ScriptedSource {
        name: String,
        responses: Vec<Result<Vec<Proposal>, ChainError>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(name: &str, responses: Vec<Result<Vec<Proposal>, ChainError>>) -> Arc<Self> {
            Arc::new(Self { name: name.to_string(), responses, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl ItemSource<Proposal> for ScriptedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> Result<Vec<Proposal>, ChainError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses[call.min(self.responses.len() - 1)].clone()
        }
    }

    fn ids(items: &[Proposal]) -> Vec<u64> {
        items.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_merges_most_recent_first_without_duplicates() {
        let aggregator = ViewModelAggregator::<Proposal>::new()
            .with_source(ScriptedSource::new("governor", vec![Ok(vec![proposal(1), proposal(3)])]))
            .with_source(ScriptedSource::new("archive", vec![Ok(vec![proposal(2), proposal(3)])]));

        aggregator.refresh_all().await;

        assert_eq!(ids(&aggregator.items().await), vec![3, 2, 1]);
        assert_eq!(aggregator.status("governor").await, Some(SourceStatus::Loaded { count: 2 }));
        assert!(!aggregator.is_loading().await);
        assert!(aggregator.errors().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_source_keeps_previous_items() {
        let flaky = ScriptedSource::new(
            "flaky",
            vec![Ok(vec![proposal(5)]), Err(ChainError::Request("timeout".to_string()))],
        );
        let aggregator = ViewModelAggregator::<Proposal>::new()
            .with_source(flaky)
            .with_source(ScriptedSource::new("stable", vec![Ok(vec![proposal(4)])]));

        aggregator.refresh_all().await;
        aggregator.refresh_all().await;

        assert_eq!(ids(&aggregator.items().await), vec![5, 4]);
        assert!(matches!(aggregator.status("flaky").await, Some(SourceStatus::Failed { .. })));
        assert_eq!(
            aggregator.errors().await,
            vec![("flaky".to_string(), "Chain request failed: timeout".to_string())]
        );
    }

    #[tokio::test]
    async fn test_refresh_single_source() {
        let retried = ScriptedSource::new(
            "retried",
            vec![Err(ChainError::Request("timeout".to_string())), Ok(vec![proposal(9)])],
        );
        let untouched = ScriptedSource::new("untouched", vec![Ok(vec![proposal(1)])]);
        let aggregator = ViewModelAggregator::<Proposal>::new()
            .with_source(retried)
            .with_source(untouched.clone());
        aggregator.refresh_all().await;

        aggregator
            .refresh("retried")
            .await
            .unwrap();

        assert_eq!(ids(&aggregator.items().await), vec![9, 1]);
        assert_eq!(untouched.calls.load(Ordering::SeqCst), 1);
        assert!(aggregator.errors().await.is_empty());
        assert_eq!(
            aggregator.refresh("missing").await,
            Err(AggregateError::UnknownSource("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_idle_before_first_refresh() {
        let aggregator = ViewModelAggregator::<Proposal>::new()
            .with_source(ScriptedSource::new("governor", vec![Ok(vec![proposal(1)])]));

        assert_eq!(aggregator.status("governor").await, Some(SourceStatus::Idle));
        assert!(aggregator.items().await.is_empty());
    }

    #[rstest]
    #[case::first(0, 2, vec![5, 4], true)]
    #[case::middle(1, 2, vec![3, 2], true)]
    #[case::last(2, 2, vec![1], false)]
    #[case::past_end(7, 2, vec![], false)]
    #[case::everything(0, 10, vec![5, 4, 3, 2, 1], false)]
    #[case::zero_size(0, 0, vec![], true)]
    #[tokio::test]
    async fn test_page(
        #[case] index: usize,
        #[case] size: usize,
        #[case] expected: Vec<u64>,
        #[case] has_more: bool,
    ) {
        let items = (1..=5).map(proposal).collect();
        let aggregator = ViewModelAggregator::<Proposal>::new()
            .with_source(ScriptedSource::new("governor", vec![Ok(items)]));
        aggregator.refresh_all().await;

        let page = aggregator.page(index, size).await;

        assert_eq!(ids(&page.items), expected);
        assert_eq!(page.total, 5);
        assert_eq!(page.has_more, has_more);
    }

    /// Records the indices read and the peak number of reads in flight.
    struct CountingReader {
        items: Vec<Proposal>,
        touched: Mutex<Vec<u64>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingReader {
        fn new(len: u64) -> Arc<Self> {
            Arc::new(Self {
                items: (0..len).map(proposal).collect(),
                touched: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IndexedReader<Proposal> for Arc<CountingReader> {
        async fn count(&self) -> Result<u64, ChainError> {
            Ok(self.items.len() as u64)
        }

        async fn item_at(&self, index: u64) -> Result<Proposal, ChainError> {
            self.touched
                .lock()
                .unwrap()
                .push(index);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight
                .fetch_sub(1, Ordering::SeqCst);
            self.items
                .get(index as usize)
                .cloned()
                .ok_or_else(|| ChainError::Revert(format!("index {index} out of range")))
        }
    }

    #[rstest]
    #[case::all(IndexWindow::All, vec![0, 1, 2, 3, 4])]
    #[case::first_page(IndexWindow::page(0, 2), vec![3, 4])]
    #[case::second_page(IndexWindow::page(1, 2), vec![1, 2])]
    #[case::partial_last_page(IndexWindow::page(2, 2), vec![0])]
    #[case::past_end(IndexWindow::page(3, 2), vec![])]
    #[case::oversized(IndexWindow::Newest { skip: 0, take: 50 }, vec![0, 1, 2, 3, 4])]
    #[tokio::test]
    async fn test_indexed_source_reads_only_window(#[case] window: IndexWindow, #[case] expected: Vec<u64>) {
        let reader = CountingReader::new(5);
        let source = IndexedSource::new("pairs", reader.clone()).with_window(window);

        let items = ItemSource::<Proposal>::fetch(&source)
            .await
            .unwrap();

        assert_eq!(ItemSource::<Proposal>::name(&source), "pairs");
        assert_eq!(ids(&items), expected);
        let mut touched = reader.touched.lock().unwrap().clone();
        touched.sort_unstable();
        assert_eq!(touched, expected);
    }

    #[tokio::test]
    async fn test_indexed_source_bounds_in_flight_reads() {
        let reader = CountingReader::new(40);
        let source = IndexedSource::new("pairs", reader.clone()).with_concurrency(3);

        let items = ItemSource::<Proposal>::fetch(&source)
            .await
            .unwrap();

        assert_eq!(items.len(), 40);
        let peak = reader.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak in-flight reads was {peak}");
    }

    #[tokio::test]
    async fn test_indexed_source_stops_on_first_failure() {
        struct Truncated(Arc<CountingReader>);

        #[async_trait]
        impl IndexedReader<Proposal> for Truncated {
            async fn count(&self) -> Result<u64, ChainError> {
                Ok(self.0.items.len() as u64 + 1)
            }

            async fn item_at(&self, index: u64) -> Result<Proposal, ChainError> {
                self.0.item_at(index).await
            }
        }

        let source = IndexedSource::new("pairs", Truncated(CountingReader::new(2)));

        let err = ItemSource::<Proposal>::fetch(&source)
            .await
            .unwrap_err();

        assert_eq!(err, ChainError::Revert("index 2 out of range".to_string()));
    }

    /// The first fetch waits for the gate and returns one item; later fetches return two at once.
    struct GatedSource {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    impl GatedSource {
        fn new(gate: oneshot::Receiver<()>) -> Arc<Self> {
            Arc::new(Self { gate: Mutex::new(Some(gate)), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl ItemSource<Proposal> for GatedSource {
        fn name(&self) -> &str {
            "gated"
        }

        async fn fetch(&self) -> Result<Vec<Proposal>, ChainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Ok(vec![proposal(1), proposal(2)]);
            }
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.await.unwrap();
            }
            Ok(vec![proposal(1)])
        }
    }

    #[tokio::test]
    async fn test_is_loading_while_fetching() {
        let (open, gate) = oneshot::channel();
        let aggregator = ViewModelAggregator::<Proposal>::new().with_source(GatedSource::new(gate));

        let observe = async {
            tokio::task::yield_now().await;
            let loading = aggregator.is_loading().await;
            open.send(()).unwrap();
            loading
        };
        let ((), loading) = tokio::join!(aggregator.refresh_all(), observe);

        assert!(loading);
        assert!(!aggregator.is_loading().await);
    }

    #[tokio::test]
    async fn test_slow_earlier_fetch_does_not_overwrite_newer_one() {
        let (open, gate) = oneshot::channel();
        let aggregator = ViewModelAggregator::<Proposal>::new().with_source(GatedSource::new(gate));

        let retry = async {
            while !aggregator.is_loading().await {
                tokio::task::yield_now().await;
            }
            aggregator
                .refresh("gated")
                .await
                .unwrap();
            let after_retry = aggregator.items().await;
            open.send(()).unwrap();
            after_retry
        };
        let (first, after_retry) = tokio::join!(aggregator.refresh("gated"), retry);
        first.unwrap();

        assert_eq!(ids(&after_retry), vec![2, 1]);
        assert_eq!(ids(&aggregator.items().await), vec![2, 1]);
        assert_eq!(aggregator.status("gated").await, Some(SourceStatus::Loaded { count: 2 }));
        assert!(!aggregator.is_loading().await);
    }
}
