use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::RwLock;

use anyhow::Result;
use log::debug;
use log::error;
use tokio::task::JoinHandle;

use crate::event::Event;
use crate::subscriber::Subscriber;

type AsyncSubscriber<E> =
    Box<dyn Fn(E) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;
type Subscribers = Arc<RwLock<HashMap<TypeId, Vec<Box<dyn Any + Send + Sync>>>>>;

/// Type-keyed publish/subscribe hub. Handlers run on the ambient tokio runtime.
pub struct EventBus {
    subscribers: Subscribers,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register_callback<E, F, Fut>(&self, callback: F) -> &Self
    where
        E: Event,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let wrapped_sub: AsyncSubscriber<E> = Box::new(move |event| Box::pin(callback(event)));

        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Box::new(wrapped_sub));
        self
    }

    pub fn register_subscriber<E, S>(&self, subscriber: Arc<S>) -> &Self
    where
        E: Event,
        S: Subscriber<E> + Send + Sync + 'static,
    {
        self.register_callback(move |event: E| {
            let h = subscriber.clone();
            async move { h.callback(event).await }
        })
    }

    /// Runs every subscriber of `E` concurrently on a spawned task.
    ///
    /// Returns `None` if nothing is subscribed to `E`.
    pub fn publish<E: Event>(&self, event: E) -> Option<JoinHandle<()>> {
        let subs = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let subs_list = subs.get(&TypeId::of::<E>())?;
        let futures: Vec<_> = subs_list
            .iter()
            .filter_map(|subs_box| subs_box.downcast_ref::<AsyncSubscriber<E>>())
            .map(|sub| sub(event.clone()))
            .collect();

        let name = event.event_name();
        debug!("Publishing {name} to {} subscriber(s)", futures.len());
        Some(tokio::spawn(async move {
            for result in futures::future::join_all(futures).await {
                if let Err(e) = result {
                    error!("Subscriber of {name} failed: {e:?}");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    #[derive(Clone)]
    struct Ping(usize);
    impl Event for Ping {}

    #[derive(Clone)]
    struct Unrelated;
    impl Event for Unrelated {}

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let total = total.clone();
            bus.register_callback(move |event: Ping| {
                let total = total.clone();
                async move {
                    total.fetch_add(event.0, Ordering::SeqCst);
                    Ok(())
                }
            });
        }
        bus.register_callback(|_: Ping| async { anyhow::bail!("one failing subscriber") });

        bus.publish(Ping(2)).unwrap().await.unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.register_callback(|_: Ping| async { Ok(()) });
        assert!(bus.publish(Unrelated).is_none());
    }
}
