//! Shared types and pagination infrastructure for the YouTube API client.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

/// One page of a list response: the items plus the continuation token for the
/// next page, if any.
type PageResult<T> = eyre::Result<(VecDeque<T>, Option<String>)>;

type PageFuture<'a, T> = Pin<Box<dyn Future<Output = PageResult<T>> + Send + 'a>>;

type PageFetcher<'a, T> = Box<dyn Fn(Option<String>) -> PageFuture<'a, T> + Send + 'a>;

/// Where the stream currently is in the page sequence.
enum FetchState<'a, T> {
    /// The next request to issue; `None` means the first page.
    Fetch(Option<String>),
    /// A page request is in flight.
    InFlight(PageFuture<'a, T>),
    /// No continuation token was returned (or an error ended the stream).
    Drained,
}

/// A stream over every item of a paginated YouTube list endpoint.
///
/// Items are yielded one by one; when the buffered page runs out the next one
/// is requested with the continuation token the API returned. Only forward
/// pagination is supported, and the remote collection is never assumed to fit
/// in a single page.
pub struct PagedStream<'a, T> {
    fetch: PageFetcher<'a, T>,
    buffered: VecDeque<T>,
    state: FetchState<'a, T>,
}

impl<'a, T> PagedStream<'a, T> {
    /// Creates a stream around `fetch`, which maps a continuation token (or
    /// `None` for the first page) to one page of results.
    ///
    /// Nothing is requested until the stream is first polled.
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(Option<String>) -> Fut + Send + 'a,
        Fut: Future<Output = PageResult<T>> + Send + 'a,
    {
        Self {
            fetch: Box::new(move |token| -> PageFuture<'a, T> { Box::pin(fetch(token)) }),
            buffered: VecDeque::new(),
            state: FetchState::Fetch(None),
        }
    }
}

impl<'a, T: Unpin> Stream for PagedStream<'a, T> {
    type Item = eyre::Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            match std::mem::replace(&mut this.state, FetchState::Drained) {
                FetchState::Drained => return Poll::Ready(None),
                FetchState::Fetch(token) => {
                    this.state = FetchState::InFlight((this.fetch)(token));
                }
                FetchState::InFlight(mut page) => match page.as_mut().poll(cx) {
                    Poll::Ready(Ok((items, next_token))) => {
                        this.buffered = items;
                        this.state = match next_token {
                            Some(token) => FetchState::Fetch(Some(token)),
                            None => FetchState::Drained,
                        };
                    }
                    Poll::Ready(Err(e)) => {
                        // state stays Drained; the stream ends after this error
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Pending => {
                        this.state = FetchState::InFlight(page);
                        return Poll::Pending;
                    }
                },
            }
        }
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn yields_items_across_continuation_tokens() {
        let stream = PagedStream::new(|token| async move {
            match token.as_deref() {
                None => Ok((VecDeque::from([1, 2]), Some("page2".to_string()))),
                Some("page2") => Ok((VecDeque::from([3]), None)),
                Some(other) => eyre::bail!("unexpected page token {other}"),
            }
        });
        let mut stream = std::pin::pin!(stream);

        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item.unwrap());
        }
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn ends_after_a_page_error() {
        let stream = PagedStream::new(|token| async move {
            match token {
                None => Ok((VecDeque::from(["a"]), Some("boom".to_string()))),
                Some(_) => eyre::bail!("server fell over"),
            }
        });
        let mut stream = std::pin::pin!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_pages_are_skipped() {
        let stream = PagedStream::new(|token| async move {
            match token.as_deref() {
                None => Ok((VecDeque::new(), Some("page2".to_string()))),
                _ => Ok((VecDeque::from([7]), None)),
            }
        });
        let mut stream = std::pin::pin!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap(), 7);
        assert!(stream.next().await.is_none());
    }
}
