//! Resource inputs: a literal known at declaration time or a deferred value

use crate::output::{Deferred, Dependencies, Resolution};

#[derive(Clone)]
pub enum Input<T> {
    Literal(T),
    Deferred(Deferred<T>),
}

impl<T> Input<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn literal(value: T) -> Self {
        Self::Literal(value)
    }

    /// Upstream entries this input waits on (none for literals)
    pub fn dependencies(&self) -> Dependencies {
        match self {
            Self::Literal(_) => Dependencies::none(),
            Self::Deferred(value) => value.dependencies().clone(),
        }
    }

    /// The literal value, if known at declaration time
    pub fn as_literal(&self) -> Option<&T> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    pub async fn resolve(&self) -> Resolution<T> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Deferred(value) => value.resolve().await,
        }
    }
}

impl<T> From<Deferred<T>> for Input<T> {
    fn from(value: Deferred<T>) -> Self {
        Self::Deferred(value)
    }
}

impl<T: Clone> From<&Deferred<T>> for Input<T> {
    fn from(value: &Deferred<T>) -> Self {
        Self::Deferred(value.clone())
    }
}

impl From<&str> for Input<String> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Input<String> {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
