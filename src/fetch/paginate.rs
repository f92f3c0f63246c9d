use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::error::Result;
use crate::fetch::{AccessToken, EsiClient};

/// Fetch every page of a paginated resource concurrently.
///
/// A metadata probe discovers the page count, then one worker per page
/// downloads and decodes it under the client's retry budget. Results
/// fan into a channel sized to the page count, so no worker ever
/// blocks on a full buffer; the first page error aborts the whole
/// fetch and no partial data escapes.
pub async fn fetch_all<T>(client: &EsiClient, url: &str, token: &AccessToken) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let meta = client.probe(url, token).await?;
    log::debug!(
        "{}: {} pages, cached until {}",
        url,
        meta.pages,
        meta.expires
    );

    if meta.pages == 0 {
        return Ok(Vec::new());
    }

    let (tx, rx) = mpsc::channel(meta.pages as usize);
    for page in 1..=meta.pages {
        let tx = tx.clone();
        let client = client.clone();
        let url = url.to_string();
        let token = token.clone();
        tokio::spawn(async move {
            let result = fetch_page_with_retry::<Vec<T>>(&client, &url, page, &token).await;
            // The coordinator may have bailed on an earlier error and
            // dropped the receiver; a failed send is fine.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    drain_pages(rx, meta.pages).await
}

async fn fetch_page_with_retry<T>(
    client: &EsiClient,
    url: &str,
    page: u32,
    token: &AccessToken,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let retry = client.retry;
    let mut attempt = 0;
    loop {
        match client.fetch_page::<T>(url, Some(page), token).await {
            Ok(result) => return Ok(result.records),
            Err(err) if attempt < retry.attempts => {
                attempt += 1;
                log::warn!(
                    "page {} of {} failed (attempt {} of {}): {}",
                    page,
                    url,
                    attempt,
                    retry.attempts + 1,
                    err
                );
                sleep(retry.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Receive exactly `pages` page results, concatenating payloads in
/// arrival order and short-circuiting on the first error. Pages
/// complete out of order, so the final sequence carries no positional
/// guarantee; downstream consumers aggregate by key.
async fn drain_pages<T>(mut rx: mpsc::Receiver<Result<Vec<T>>>, pages: u32) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for _ in 0..pages {
        match rx.recv().await {
            Some(Ok(page)) => records.extend(page),
            Some(Err(err)) => return Err(err),
            None => break,
        }
    }
    Ok(records)
}
