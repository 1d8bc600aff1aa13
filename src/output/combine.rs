//! Combinators joining several deferred values into one
//!
//! All combinators are fail-fast: the result fails as soon as any input
//! fails, with that input's cause. The remaining inputs are not cancelled;
//! the operations behind them keep running and their results are discarded
//! by this combination only. Dependencies of every input are preserved.

use futures::future::try_join_all;

use super::deferred::Deferred;
use super::dependencies::Dependencies;

/// Join two values into a tuple
pub fn zip<A, B>(a: &Deferred<A>, b: &Deferred<B>) -> Deferred<(A, B)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let (fa, fb) = (a.shared(), b.shared());
    let dependencies = a.dependencies().union(b.dependencies());
    Deferred::from_future(dependencies, async move { futures::try_join!(fa, fb) })
}

/// Join three values into a tuple
pub fn zip3<A, B, C>(a: &Deferred<A>, b: &Deferred<B>, c: &Deferred<C>) -> Deferred<(A, B, C)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
{
    let (fa, fb, fc) = (a.shared(), b.shared(), c.shared());
    let dependencies = a
        .dependencies()
        .union(b.dependencies())
        .union(c.dependencies());
    Deferred::from_future(dependencies, async move { futures::try_join!(fa, fb, fc) })
}

/// Join any number of values of the same type, keeping input order
pub fn all<'a, T, I>(values: I) -> Deferred<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = &'a Deferred<T>>,
{
    let mut dependencies = Dependencies::none();
    let mut futures = Vec::new();
    for value in values {
        dependencies = dependencies.union(value.dependencies());
        futures.push(value.shared());
    }
    Deferred::from_future(dependencies, async move { try_join_all(futures).await })
}
