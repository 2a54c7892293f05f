#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    use tokio::time::sleep;

    use crate::mock_provider::MockExportHandle;
    use crate::poller::{PollControl, PollPublisher, ProgressPoller};
    use crate::provider::ExportHandle;
    use crate::types::ExportStatus;

    fn counting_publisher(count: Arc<AtomicUsize>) -> PollPublisher {
        Arc::new(move |_snapshot| {
            count.fetch_add(1, Ordering::SeqCst);
            PollControl::Continue
        })
    }

    fn weak(handle: &Arc<MockExportHandle>) -> Weak<dyn ExportHandle> {
        Arc::downgrade(&(Arc::clone(handle) as Arc<dyn ExportHandle>))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_sample_attached_handle() {
        let handle = MockExportHandle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            counting_publisher(Arc::clone(&count)),
        );

        poller.attach(weak(&handle));
        sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(poller.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publisher_sees_handle_state() {
        let handle = MockExportHandle::new();
        handle.begin_export();
        handle.script_export(vec![(ExportStatus::Exporting, 0.25)]);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_publisher = Arc::clone(&seen);
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            Arc::new(move |snapshot| {
                assert_eq!(snapshot.status, ExportStatus::Exporting);
                assert_eq!(snapshot.progress, 0.25);
                seen_in_publisher.fetch_add(1, Ordering::SeqCst);
                PollControl::Stop
            }),
        );

        poller.attach(weak(&handle));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_stops_timer() {
        let handle = MockExportHandle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            counting_publisher(Arc::clone(&count)),
        );

        poller.attach(weak(&handle));
        sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        poller.detach();
        assert!(!poller.is_attached());
        sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reattach_replaces_previous_timer() {
        let handle = MockExportHandle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            counting_publisher(Arc::clone(&count)),
        );

        poller.attach(weak(&handle));
        poller.attach(weak(&handle));
        sleep(Duration::from_millis(250)).await;
        // One timer, not two: samples arrive at the single-period rate.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_dropped_mid_flight_stops_timer() {
        let handle = MockExportHandle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            counting_publisher(Arc::clone(&count)),
        );

        poller.attach(weak(&handle));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(handle);
        sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!poller.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_control_ends_timer() {
        let handle = MockExportHandle::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_in_publisher = Arc::clone(&count);
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            Arc::new(move |_snapshot| {
                count_in_publisher.fetch_add(1, Ordering::SeqCst);
                PollControl::Stop
            }),
        );

        poller.attach(weak(&handle));
        sleep(Duration::from_millis(400)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!poller.is_attached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_dead_weak_starts_no_timer() {
        let count = Arc::new(AtomicUsize::new(0));
        let poller = ProgressPoller::new(
            Duration::from_millis(100),
            counting_publisher(Arc::clone(&count)),
        );

        let dead = {
            let handle = MockExportHandle::new();
            weak(&handle)
        };
        poller.attach(dead);
        assert!(!poller.is_attached());
        sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
