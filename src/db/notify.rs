//! Change notification and live queries over the cache tables.

use futures::future::BoxFuture;
use futures::Stream;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Tables of the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Exercises,
    Routines,
    RoutineExercises,
    Progress,
}

impl Table {
    fn index(self) -> usize {
        match self {
            Table::Users => 0,
            Table::Exercises => 1,
            Table::Routines => 2,
            Table::RoutineExercises => 3,
            Table::Progress => 4,
        }
    }
}

/// Per-table write counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableVersions([u64; 5]);

impl TableVersions {
    pub fn get(&self, table: Table) -> u64 {
        self.0[table.index()]
    }

    fn bump(&mut self, table: Table) {
        self.0[table.index()] += 1;
    }
}

/// Broadcasts "table changed" events to every open live query.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: Arc<watch::Sender<TableVersions>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TableVersions::default());
        Self { tx: Arc::new(tx) }
    }

    /// Marks the given tables as written.
    pub fn notify(&self, tables: &[Table]) {
        self.tx.send_modify(|versions| {
            for table in tables {
                versions.bump(*table);
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<TableVersions> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

type FetchFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, sqlx::Error>> + Send + Sync>;

/// A query that re-evaluates whenever one of the tables it reads changes.
///
/// The first call to [`LiveQuery::next`] yields the current rows
/// immediately; every later call waits for a write to one of the watched
/// tables. Each live query owns its receiver, so any number of them can
/// watch the same rows independently.
pub struct LiveQuery<T> {
    rx: watch::Receiver<TableVersions>,
    tables: &'static [Table],
    seen: Option<TableVersions>,
    fetch: FetchFn<T>,
}

impl<T: Send + 'static> LiveQuery<T> {
    pub fn new<F, Fut>(notifier: &ChangeNotifier, tables: &'static [Table], fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, sqlx::Error>> + Send + 'static,
    {
        Self {
            rx: notifier.subscribe(),
            tables,
            seen: None,
            fetch: Box::new(move || Box::pin(fetch())),
        }
    }

    /// Waits for the next result set.
    ///
    /// Returns `None` once every [`ChangeNotifier`] clone has been dropped.
    /// Queries built by the repositories keep a clone alive in their fetch
    /// closure, so they end only when the query itself is dropped.
    pub async fn next(&mut self) -> Option<Result<Vec<T>, sqlx::Error>> {
        match self.seen {
            None => {
                self.seen = Some(*self.rx.borrow_and_update());
            }
            Some(seen) => loop {
                if self.rx.changed().await.is_err() {
                    return None;
                }
                let current = *self.rx.borrow_and_update();
                if self.tables.iter().any(|t| current.get(*t) != seen.get(*t)) {
                    self.seen = Some(current);
                    break;
                }
            },
        }

        Some((self.fetch)().await)
    }

    /// Converts the query into a stream of result sets.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>, sqlx::Error>> {
        futures::stream::unfold(self, |mut query| async move {
            query.next().await.map(|item| (item, query))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn counting_query(
        notifier: &ChangeNotifier,
        tables: &'static [Table],
    ) -> (LiveQuery<u64>, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let query = LiveQuery::new(notifier, tables, move || {
            let counter = counter.clone();
            async move { Ok(vec![counter.fetch_add(1, Ordering::SeqCst)]) }
        });
        (query, calls)
    }

    #[tokio::test]
    async fn test_first_next_is_immediate() {
        let notifier = ChangeNotifier::new();
        let (mut query, _) = counting_query(&notifier, &[Table::Routines]);

        let rows = query.next().await.unwrap().unwrap();
        assert_eq!(rows, vec![0]);
    }

    #[tokio::test]
    async fn test_reruns_on_watched_table_only() {
        let notifier = ChangeNotifier::new();
        let (mut query, calls) = counting_query(&notifier, &[Table::Progress]);
        query.next().await.unwrap().unwrap();

        notifier.notify(&[Table::Exercises]);
        let pending = tokio::time::timeout(Duration::from_millis(50), query.next()).await;
        assert!(pending.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        notifier.notify(&[Table::Progress]);
        let rows = query.next().await.unwrap().unwrap();
        assert_eq!(rows, vec![1]);
    }

    #[tokio::test]
    async fn test_independent_subscriptions() {
        let notifier = ChangeNotifier::new();
        let (mut a, _) = counting_query(&notifier, &[Table::Routines]);
        let (mut b, _) = counting_query(&notifier, &[Table::Routines]);
        a.next().await.unwrap().unwrap();
        b.next().await.unwrap().unwrap();

        notifier.notify(&[Table::Routines]);

        // Both observers see the same write; consuming it in one does not
        // consume it in the other.
        assert_eq!(a.next().await.unwrap().unwrap(), vec![1]);
        assert_eq!(b.next().await.unwrap().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_ends_when_notifier_dropped() {
        let notifier = ChangeNotifier::new();
        let (mut query, _) = counting_query(&notifier, &[Table::Users]);
        query.next().await.unwrap().unwrap();

        drop(notifier);
        assert!(query.next().await.is_none());
    }

    #[test]
    fn test_versions_bump() {
        let notifier = ChangeNotifier::new();
        notifier.notify(&[Table::Users, Table::Users, Table::Progress]);
        let versions = *notifier.subscribe().borrow();
        assert_eq!(versions.get(Table::Users), 2);
        assert_eq!(versions.get(Table::Progress), 1);
        assert_eq!(versions.get(Table::Routines), 0);
    }
}
