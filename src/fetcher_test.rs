#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use proptest::prelude::*;
    use tokio_stream::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use crate::config::ImageRequestOptions;
    use crate::errors::{BridgeError, ProviderFailure};
    use crate::fetcher::MediaFetcher;
    use crate::mock_provider::{MockMediaProvider, MockResponse};
    use crate::types::{AssetRef, ContentMode, ImageArtifact, MediaResult, TargetSize};

    fn fetcher() -> (Arc<MockMediaProvider>, MediaFetcher) {
        let provider = Arc::new(MockMediaProvider::new());
        let fetcher = MediaFetcher::new(Arc::clone(&provider) as _);
        (provider, fetcher)
    }

    fn artifact(degraded: bool) -> ImageArtifact {
        ImageArtifact::new(Bytes::from_static(b"pixels"), 32, 32, degraded)
    }

    fn asset() -> AssetRef {
        AssetRef::new("asset-1")
    }

    fn image_stream(
        fetcher: &MediaFetcher,
    ) -> crate::stream::ResultStream<ImageArtifact> {
        fetcher.request_image(
            &asset(),
            TargetSize::new(64, 64),
            ContentMode::Default,
            ImageRequestOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_image_error_ends_stream() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Error(ProviderFailure::new(1, "mock error")));

        let events: Vec<_> = image_stream(&fetcher).collect().await;
        assert_eq!(
            events,
            vec![MediaResult::Failure(BridgeError::Provider(
                ProviderFailure::new(1, "mock error")
            ))]
        );
    }

    #[tokio::test]
    async fn test_image_empty_result_maps_to_fetch_failed() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Empty);

        let events: Vec<_> = image_stream(&fetcher).collect().await;
        assert_eq!(events, vec![MediaResult::Failure(BridgeError::FetchFailed)]);
    }

    #[tokio::test]
    async fn test_image_progress_then_final_artifact() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Progress(0.1));
        provider.enqueue(MockResponse::Progress(0.5));
        provider.enqueue(MockResponse::Image(artifact(false)));

        let events: Vec<_> = image_stream(&fetcher).collect().await;
        assert_eq!(
            events,
            vec![
                MediaResult::Processing(0.1),
                MediaResult::Processing(0.5),
                MediaResult::Success(artifact(false)),
            ]
        );
    }

    #[tokio::test]
    async fn test_image_degraded_then_final_yields_two_successes() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Image(artifact(true)));
        provider.enqueue(MockResponse::Image(artifact(false)));

        let events: Vec<_> = image_stream(&fetcher).collect().await;
        assert_eq!(
            events,
            vec![
                MediaResult::Success(artifact(true)),
                MediaResult::Success(artifact(false)),
            ]
        );
    }

    #[tokio::test]
    async fn test_image_degraded_artifact_keeps_stream_open() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Image(artifact(true)));

        let mut stream = image_stream(&fetcher);
        assert_eq!(
            stream.next().await,
            Some(MediaResult::Success(artifact(true)))
        );

        let mut next = task::spawn(stream.next());
        assert_pending!(next.poll());
    }

    #[tokio::test]
    async fn test_image_progress_error_ends_stream() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::ProgressError(ProviderFailure::new(2, "network")));

        let events: Vec<_> = image_stream(&fetcher).collect().await;
        assert_eq!(
            events,
            vec![MediaResult::Failure(BridgeError::Provider(
                ProviderFailure::new(2, "network")
            ))]
        );
    }

    #[tokio::test]
    async fn test_image_request_cancelled_on_drop() {
        let (provider, fetcher) = fetcher();

        let stream = image_stream(&fetcher);
        assert_eq!(provider.cancel_count(), 0);
        drop(stream);
        assert_eq!(provider.cancel_count(), 1);
        assert!(provider.last_cancelled().is_some());
    }

    #[tokio::test]
    async fn test_image_no_cancel_after_natural_completion() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Image(artifact(false)));

        let events: Vec<_> = image_stream(&fetcher).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(provider.cancel_count(), 0);
    }

    #[tokio::test]
    async fn test_data_success_completes_immediately() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Progress(0.3));
        provider.enqueue(MockResponse::Data(Bytes::from_static(b"blob")));

        let events: Vec<_> = fetcher
            .request_data(&asset(), ImageRequestOptions::default())
            .collect()
            .await;
        assert_eq!(
            events,
            vec![
                MediaResult::Processing(0.3),
                MediaResult::Success(Bytes::from_static(b"blob")),
            ]
        );
    }

    #[tokio::test]
    async fn test_data_empty_result_maps_to_fetch_failed() {
        let (provider, fetcher) = fetcher();
        provider.enqueue(MockResponse::Empty);

        let events: Vec<_> = fetcher
            .request_data(&asset(), ImageRequestOptions::default())
            .collect()
            .await;
        assert_eq!(events, vec![MediaResult::Failure(BridgeError::FetchFailed)]);
    }

    #[tokio::test]
    async fn test_data_request_cancelled_on_drop() {
        let (provider, fetcher) = fetcher();

        let stream = fetcher.request_data(&asset(), ImageRequestOptions::default());
        drop(stream);
        assert_eq!(provider.cancel_count(), 1);
    }

    proptest! {
        // Progress values pass through with no transformation beyond the
        // type narrowing into Processing.
        #[test]
        fn prop_progress_forwarded_untransformed(progress in 0.0f32..=1.0) {
            let provider = Arc::new(MockMediaProvider::new());
            provider.enqueue(MockResponse::Progress(progress));
            let fetcher = MediaFetcher::new(Arc::clone(&provider) as _);

            let mut stream = fetcher.request_image(
                &AssetRef::new("asset-1"),
                TargetSize::new(64, 64),
                ContentMode::Default,
                ImageRequestOptions::default(),
            );
            let mut next = task::spawn(stream.next());
            let event = assert_ready!(next.poll());
            prop_assert_eq!(event, Some(MediaResult::Processing(progress)));
        }
    }
}
