use std::fmt::Debug;

use futures::stream::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Observable value backed by a `watch` channel.
///
/// Every watcher sees the current value first, then each subsequent change.
/// Writes are crate-private; consumers only read or watch.
#[derive(Clone)]
pub struct Property<T: Clone + Send + Sync + 'static> {
    tx: watch::Sender<T>,
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Property<T> {
    /// Create a new property holding `initial`.
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, rx }
    }

    /// Mutate the value in place and notify watchers unconditionally.
    pub(crate) fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(mutate);
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Stream of values: the current one immediately, then every change.
    pub fn watch(&self) -> impl Stream<Item = T> + Send + use<T> {
        WatchStream::new(self.rx.clone())
    }
}

impl<T: Clone + Send + Sync + Debug + 'static> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn watch_yields_current_then_changes() {
        let property = Property::new(1u32);
        let mut stream = Box::pin(property.watch());

        assert_eq!(stream.next().await, Some(1));

        property.update(|value| *value = 2);
        assert_eq!(stream.next().await, Some(2));
    }

    #[test]
    fn update_mutates_in_place() {
        let property = Property::new(vec![1, 2]);
        property.update(|values| values.push(3));
        assert_eq!(property.get(), vec![1, 2, 3]);
    }
}
