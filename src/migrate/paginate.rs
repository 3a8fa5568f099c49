//! `nextLink` pagination
//!
//! Collections come back as `{ "value": [...], "nextLink": "..." }`. The
//! stream below fetches a page only when the previous one is exhausted.

use super::resources::Page;
use crate::client::{Transport, fetch};

use eyre::Result;
use futures::stream::{self, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Lazily walk a collection starting at `url`.
///
/// Records are yielded in server order and decoded into `R`. A record that
/// does not decode is logged and skipped. A failed page fetch ends the stream
/// with that error; nothing is retried here.
///
/// The stream is single-pass: call again to start over.
pub fn paginate<'a, T, R>(transport: &'a T, url: String) -> impl Stream<Item = Result<R>> + 'a
where
    T: Transport,
    R: DeserializeOwned + 'a,
{
    stream::try_unfold(Some(url), move |next| async move {
        let Some(url) = next else {
            return Ok(None);
        };

        log::debug!("Fetching page {}", url);
        let page: Page = fetch(transport, &url).await?;

        let records: Vec<R> = page
            .value
            .into_iter()
            .filter_map(|record| decode_record(record, &url))
            .collect();
        let next = page.next_link.filter(|link| !link.trim().is_empty());

        Ok::<_, eyre::Report>(Some((records, next)))
    })
    .map_ok(|records| stream::iter(records.into_iter().map(Ok::<R, eyre::Report>)))
    .try_flatten()
}

fn decode_record<R: DeserializeOwned>(record: Value, url: &str) -> Option<R> {
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<no id>")
        .to_string();
    match serde_json::from_value(record) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("Skipping malformed record {} from {}: {}", id, url, e);
            None
        }
    }
}
