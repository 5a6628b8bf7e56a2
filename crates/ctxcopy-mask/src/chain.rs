//! Ordered chains of named strategies
//!
//! Each strategy is a pure function returning an optional result. A chain
//! tries its strategies in order and returns the first success. Overlap
//! resolution and XML boundary checks are both expressed this way.

use tracing::trace;

/// One named step in a [`StrategyChain`]
pub struct Strategy<I: ?Sized, O> {
    pub name: &'static str,
    pub run: fn(&I) -> Option<O>,
}

impl<I: ?Sized, O> Clone for Strategy<I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: ?Sized, O> Copy for Strategy<I, O> {}

impl<I: ?Sized, O> std::fmt::Debug for Strategy<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Strategies tried in order until one produces a result
#[derive(Debug)]
pub struct StrategyChain<I: ?Sized, O> {
    strategies: Vec<Strategy<I, O>>,
}

impl<I: ?Sized, O> Default for StrategyChain<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized, O> StrategyChain<I, O> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy to the end of the chain
    pub fn then(mut self, name: &'static str, run: fn(&I) -> Option<O>) -> Self {
        self.strategies.push(Strategy { name, run });
        self
    }

    /// Run the chain, returning the first result and the strategy that produced it
    pub fn resolve(&self, input: &I) -> Option<(&'static str, O)> {
        self.strategies.iter().find_map(|strategy| {
            let output = (strategy.run)(input)?;
            trace!("Strategy '{}' succeeded", strategy.name);
            Some((strategy.name, output))
        })
    }

    /// Run the chain, discarding the strategy name
    pub fn run(&self, input: &I) -> Option<O> {
        self.resolve(input).map(|(_, output)| output)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
