//! Cluster stats observer chain.
//!
//! Observers are callbacks registered at startup. Every tick the full batch is
//! delivered to each of them in registration order. An observer that errors or
//! panics is logged and skipped; the rest of the chain, and later ticks, still run.

use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

use crate::health::stats::ClusterStats;

/// Failure reported by an observer.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ObserverError(pub String);

type ObserverFn = Box<dyn Fn(&[ClusterStats]) -> Result<(), ObserverError> + Send + Sync>;

/// Ordered list of stats observers.
#[derive(Default)]
pub struct ObserverChain {
    observers: Vec<(String, ObserverFn)>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer to the chain.
    pub fn register<F>(&mut self, name: impl Into<String>, observer: F) -> &mut Self
    where
        F: Fn(&[ClusterStats]) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.observers.push((name.into(), Box::new(observer)));
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Hand `stats` to every observer. Returns the number of observers that failed.
    pub fn deliver(&self, stats: &[ClusterStats]) -> usize {
        let mut failures = 0;
        for (name, observer) in &self.observers {
            match catch_unwind(AssertUnwindSafe(|| observer(stats))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!(observer = %name, error = %e, "Stats observer failed");
                }
                Err(_) => {
                    failures += 1;
                    tracing::error!(observer = %name, "Stats observer panicked");
                }
            }
        }
        failures
    }
}

impl std::fmt::Debug for ObserverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|(name, _)| name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_failures_do_not_stop_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut chain = ObserverChain::new();

        let s = seen.clone();
        chain.register("first", move |stats| {
            s.lock().unwrap().push(("first", stats.len()));
            Ok(())
        });
        chain.register("failing", |_| Err(ObserverError("boom".into())));
        chain.register("panicking", |_| panic!("observer bug"));
        let s = seen.clone();
        chain.register("last", move |stats| {
            s.lock().unwrap().push(("last", stats.len()));
            Ok(())
        });

        assert_eq!(chain.len(), 4);
        assert_eq!(chain.deliver(&[]), 2);
        assert_eq!(chain.deliver(&[]), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 0), ("last", 0), ("first", 0), ("last", 0)]
        );
    }

    #[test]
    fn test_registration_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain = ObserverChain::new();
        for name in ["a", "b", "c"] {
            let counter = counter.clone();
            let order = order.clone();
            chain.register(name, move |_| {
                order.lock().unwrap().push((name, counter.fetch_add(1, Ordering::SeqCst)));
                Ok(())
            });
        }
        assert_eq!(chain.deliver(&[]), 0);
        assert_eq!(*order.lock().unwrap(), vec![("a", 0), ("b", 1), ("c", 2)]);
    }
}
