//! Guarded list/watch templates shared by every discovery collection
//! (spec S4.6).
//!
//! A collaborator publishes snapshots through a [`SnapshotPublisher`]; the
//! facade exposes them to RPC callers through [`watch_stream`]. The
//! subscription is atomic: the first item a caller observes is always the
//! snapshot current as of the moment it subscribed (or the very next
//! published one), so there is no `List`-then-`Watch` race where an update
//! lands in the gap between the two calls — matching the
//! `watch::Sender`/`Receiver` pattern `turbomcp-server`'s `TaskStorage` uses
//! to let a caller block on a specific task's result without separately
//! polling for it first.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use crate::types::{
    ActiveClientSnapshot, PromptSnapshot, ResourceSnapshot, RuntimeStatusSnapshot, ToolSnapshot,
};

/// A versioned value that can be compared by its wire version token.
pub trait Versioned {
    /// The opaque version token (spec GLOSSARY "ETag").
    fn etag(&self) -> &str;
}

impl Versioned for ToolSnapshot {
    fn etag(&self) -> &str {
        &self.etag
    }
}

impl Versioned for ResourceSnapshot {
    fn etag(&self) -> &str {
        &self.etag
    }
}

impl Versioned for PromptSnapshot {
    fn etag(&self) -> &str {
        &self.etag
    }
}

impl Versioned for ActiveClientSnapshot {
    fn etag(&self) -> &str {
        &self.etag
    }
}

impl Versioned for RuntimeStatusSnapshot {
    fn etag(&self) -> &str {
        &self.etag
    }
}

/// Publishing half of a guarded collection (spec S4.6 "version advance").
///
/// Wraps a [`tokio::sync::watch::Sender`]; publishing a snapshot with the
/// same etag as the current value is a no-op; the watch channel only wakes
/// subscribers when the value actually changes.
#[derive(Debug)]
pub struct SnapshotPublisher<S> {
    sender: watch::Sender<S>,
}

impl<S: Versioned + Clone + Send + Sync + 'static> SnapshotPublisher<S> {
    /// Start a new publisher seeded with an initial snapshot.
    #[must_use]
    pub fn new(initial: S) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self { sender }
    }

    /// Publish a new snapshot. No-ops (does not wake subscribers) if its
    /// etag equals the etag currently held.
    pub fn publish(&self, snapshot: S) {
        self.sender.send_if_modified(|current| {
            if current.etag() == snapshot.etag() {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// The current snapshot, without subscribing.
    #[must_use]
    pub fn current(&self) -> S {
        self.sender.borrow().clone()
    }

    /// Subscribe for streaming; see [`watch_stream`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }
}

/// Build a caller-facing watch stream from a subscription and the caller's
/// last-observed etag (spec S4.6).
///
/// Semantics:
/// - `last_etag` is `None` (the caller has never observed this collection,
///   or sent an empty `last_etag` field): the stream's first item is the
///   current snapshot, emitted immediately.
/// - `last_etag` is `Some` and matches the current snapshot's etag: that
///   snapshot is skipped and the stream waits for the next distinct one,
///   so a reconnecting caller that is already current does not receive a
///   redundant duplicate.
/// - `last_etag` is `Some` and does not match: the current snapshot is
///   emitted immediately, same as the `None` case.
///
/// After the first item, every subsequently published distinct snapshot is
/// forwarded in order; the stream never terminates on its own and ends only
/// when the publisher is dropped or the caller disconnects (backpressure is
/// bounded by the watch channel's single-slot "latest value wins"
/// semantics: a slow caller observes the newest snapshot, not a queued
/// backlog of every intermediate one).
pub fn watch_stream<S>(
    receiver: watch::Receiver<S>,
    last_etag: Option<String>,
) -> impl Stream<Item = S>
where
    S: Versioned + Clone + Send + Sync + 'static,
{
    let stream = WatchStream::new(receiver);
    let mut emitted_any = false;
    stream.filter_map(move |snapshot| {
        if !emitted_any {
            emitted_any = true;
            if let Some(last_etag) = &last_etag {
                if snapshot.etag() == last_etag {
                    return None;
                }
            }
        }
        Some(snapshot)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Snap(String);

    impl Versioned for Snap {
        fn etag(&self) -> &str {
            &self.0
        }
    }

    #[tokio::test]
    async fn fresh_subscriber_gets_current_snapshot_immediately() {
        let publisher = SnapshotPublisher::new(Snap("v1".into()));
        let stream = watch_stream(publisher.subscribe(), None);
        tokio::pin!(stream);
        let first = stream.next().await.unwrap();
        assert_eq!(first.0, "v1");
    }

    #[tokio::test]
    async fn matching_last_etag_skips_the_duplicate() {
        let publisher = SnapshotPublisher::new(Snap("v1".into()));
        let stream = watch_stream(publisher.subscribe(), Some("v1".into()));
        tokio::pin!(stream);

        publisher.publish(Snap("v2".into()));
        let first = stream.next().await.unwrap();
        assert_eq!(first.0, "v2");
    }

    #[tokio::test]
    async fn stale_last_etag_gets_current_immediately() {
        let publisher = SnapshotPublisher::new(Snap("v2".into()));
        let stream = watch_stream(publisher.subscribe(), Some("v1".into()));
        tokio::pin!(stream);
        let first = stream.next().await.unwrap();
        assert_eq!(first.0, "v2");
    }

    #[tokio::test]
    async fn publishing_same_etag_does_not_wake_subscribers() {
        let publisher = SnapshotPublisher::new(Snap("v1".into()));
        let mut receiver = publisher.subscribe();
        receiver.mark_unchanged();
        publisher.publish(Snap("v1".into()));
        assert!(receiver.has_changed().is_ok_and(|changed| !changed));
    }

    #[tokio::test]
    async fn subsequent_snapshots_stream_in_order() {
        let publisher = SnapshotPublisher::new(Snap("v1".into()));
        let stream = watch_stream(publisher.subscribe(), None);
        tokio::pin!(stream);

        assert_eq!(stream.next().await.unwrap().0, "v1");
        publisher.publish(Snap("v2".into()));
        assert_eq!(stream.next().await.unwrap().0, "v2");
        publisher.publish(Snap("v3".into()));
        assert_eq!(stream.next().await.unwrap().0, "v3");
    }
}
