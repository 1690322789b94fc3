//! HTTP parameter pollution guard.
//!
//! A request like `?sort=price&sort=name` carries two values for one key.
//! Downstream handlers that expect a single string would otherwise see an
//! array or whichever value the parser happened to keep, which attackers use
//! to slip values past validation. This stage collapses every repeated query
//! key to its last occurrence and publishes the result as the exchange's
//! single-value parameter map. Keys on the allowlist additionally keep all
//! of their values, in order, in the multi-value map.
//!
//! Runs after sanitization so the collapsed values are already clean. Never
//! errors and never rejects a request.

use crate::context::Exchange;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Outcome, Request};
use std::collections::{HashMap, HashSet};

/// Middleware that collapses duplicate query parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamGuardMiddleware {
    allowlist: HashSet<String>,
}

impl ParamGuardMiddleware {
    /// Creates a guard with an empty allowlist. Every duplicated key
    /// collapses to its last value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a guard whose allowlisted keys also retain all values.
    #[must_use]
    pub fn with_allowlist<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowlist: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the key keeps all of its values.
    #[must_use]
    pub fn is_allowlisted(&self, key: &str) -> bool {
        self.allowlist.contains(key)
    }
}

impl Middleware for ParamGuardMiddleware {
    fn name(&self) -> &'static str {
        "param-guard"
    }

    fn process<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let mut single: HashMap<String, String> = HashMap::new();
            let mut multi: HashMap<String, Vec<String>> = HashMap::new();

            for (key, value) in exchange.raw_query() {
                // Last occurrence wins for the single-value view.
                single.insert(key.clone(), value.clone());
                if self.allowlist.contains(key) {
                    multi.entry(key.clone()).or_default().push(value.clone());
                }
            }

            exchange.set_query_params(single);
            exchange.set_multi_params(multi);

            next.run(exchange, request).await
        })
    }
}
