//! Deferred values: results that only exist once a provider operation completes
//!
//! A `Deferred<T>` is a cloneable handle over a single shared resolution.
//! Every clone observes the same outcome, the underlying computation runs at
//! most once, and failures travel as [`Failure`] so one cause can fan out to
//! any number of dependents.
//!
//! ```text
//! provider response ──► Resolver::resolve ──► Deferred<Value>
//!                                                │ map / try_map
//!                                                ▼
//!                                           Deferred<U> ──► zip / all ──► ...
//! ```
//!
//! Transforms are demand driven: a `map` closure runs when something awaits
//! the mapped value (a resource input, a binding, an export), and never more
//! than once no matter how many consumers share the handle.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::error::{Failure, SkyError};

use super::dependencies::{Dependencies, NodeId};

/// Outcome of a deferred value
pub type Resolution<T> = Result<T, Failure>;

/// Handle to a value that becomes available after an asynchronous operation
pub struct Deferred<T> {
    inner: Shared<BoxFuture<'static, Resolution<T>>>,
    dependencies: Dependencies,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// Write side of a pending deferred value.
///
/// Consumed by `resolve` or `fail`, so a value is delivered at most once.
/// Dropping it unresolved fails every consumer with [`SkyError::Unresolved`].
pub struct Resolver<T> {
    sender: oneshot::Sender<Resolution<T>>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        // A closed receiver only means nobody holds the value any more.
        let _ = self.sender.send(Ok(value));
    }

    pub fn fail(self, failure: Failure) {
        let _ = self.sender.send(Err(failure));
    }

    pub fn complete(self, resolution: Resolution<T>) {
        let _ = self.sender.send(resolution);
    }
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap an arbitrary future together with the entries it derives from
    pub fn from_future<F>(dependencies: Dependencies, future: F) -> Self
    where
        F: Future<Output = Resolution<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
            dependencies,
        }
    }

    /// An already-known value with no upstream dependencies
    pub fn resolved(value: T) -> Self {
        Self::from_future(Dependencies::none(), futures::future::ready(Ok(value)))
    }

    /// A value that will never arrive because of `error`
    pub fn failed(error: SkyError) -> Self {
        Self::from_failure(Failure::new(error))
    }

    pub fn from_failure(failure: Failure) -> Self {
        Self::from_future(Dependencies::none(), futures::future::ready(Err(failure)))
    }

    /// A pending value filled in later through the returned [`Resolver`]
    ///
    /// `what` names the value in the error reported if the resolver is dropped.
    pub fn channel(what: &str, dependencies: Dependencies) -> (Resolver<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        let what = what.to_string();
        let deferred = Self::from_future(dependencies, async move {
            match receiver.await {
                Ok(resolution) => resolution,
                Err(_) => Err(Failure::new(SkyError::Unresolved { what })),
            }
        });
        (Resolver { sender }, deferred)
    }

    /// Entries this value was derived from
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Record additional upstream entries (e.g. a node's own identity)
    pub fn with_dependency(mut self, id: NodeId) -> Self {
        self.dependencies = self.dependencies.union(&Dependencies::single(id));
        self
    }

    /// Apply a pure function once the value resolves.
    ///
    /// `f` runs at most once, and never when the source fails: the result
    /// then fails with the same cause.
    pub fn map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let source = self.inner.clone();
        Deferred::from_future(self.dependencies.clone(), async move { source.await.map(f) })
    }

    /// Like [`map`](Self::map) for transforms that can reject the value
    pub fn try_map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U, SkyError> + Send + 'static,
    {
        let source = self.inner.clone();
        Deferred::from_future(self.dependencies.clone(), async move {
            let value = source.await?;
            f(value).map_err(Failure::new)
        })
    }

    /// Chain into another deferred value chosen from the resolved one.
    ///
    /// The chosen value is only known at resolution time, so `reaches` names
    /// the entries it may come from; they join the result's dependencies. A
    /// chosen value derived from anything else fails with
    /// `UndeclaredDependency`.
    pub fn and_then<U, F>(&self, reaches: &Dependencies, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        let source = self.inner.clone();
        let dependencies = self.dependencies.union(reaches);
        let declared = dependencies.clone();
        Deferred::from_future(dependencies, async move {
            let value = source.await?;
            let chosen = f(value);
            let outside = chosen
                .dependencies
                .iter()
                .find(|id| !declared.contains(id.as_str()));
            if let Some(outside) = outside {
                return Err(Failure::new(SkyError::UndeclaredDependency {
                    dependency: outside.to_string(),
                    declared: declared.iter().map(NodeId::as_str).collect::<Vec<_>>().join(", "),
                }));
            }
            chosen.inner.await
        })
    }

    /// Wait for the value (or its failure)
    pub async fn resolve(&self) -> Resolution<T> {
        self.inner.clone().await
    }

    /// The outcome if it is already known, without waiting
    pub fn peek(&self) -> Option<Resolution<T>> {
        self.inner.peek().cloned()
    }

    pub fn is_settled(&self) -> bool {
        self.inner.peek().is_some()
    }

    pub(crate) fn shared(&self) -> Shared<BoxFuture<'static, Resolution<T>>> {
        self.inner.clone()
    }
}

impl<T> fmt::Debug for Deferred<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.peek() {
            None => "pending".to_string(),
            Some(Ok(value)) => format!("resolved({:?})", value),
            Some(Err(failure)) => format!("failed({})", failure.code()),
        };
        f.debug_struct("Deferred")
            .field("state", &state)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
