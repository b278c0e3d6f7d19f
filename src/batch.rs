//! Multi-symbol batch fetches against one resolved provider

use anyhow::Result;
use futures::future::join_all;

use crate::core::{Provider, Quote};

/// Fetches quotes for every symbol concurrently against the same provider.
///
/// One symbol's failure never aborts another's fetch; each slot carries its
/// own result. Output order matches input order.
pub async fn fetch_quotes(
    provider: &dyn Provider,
    symbols: &[String],
) -> Vec<(String, Result<Option<Quote>>)> {
    let fetches = symbols.iter().map(|symbol| async move {
        let result = provider.get_quote(symbol).await;
        (symbol.clone(), result)
    });

    join_all(fetches).await
}
