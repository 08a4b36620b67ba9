
    use super::*;
    use std::task::Poll;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_send_waits_for_receiver() {
        let (tx, mut rx) = channel::<u32>();

        let blocked = tokio::time::timeout(Duration::from_millis(20), tx.send(1)).await;
        assert!(blocked.is_err(), "send must not complete without a receiver");

        let handle = tokio::spawn(async move { rx.recv().await });
        tx.send(2).await.unwrap();

        // The abandoned first value was never parked in the channel.
        assert_eq!(handle.await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_round_trip_across_tasks() {
        let (tx, mut rx) = channel::<String>();

        let responder = tokio::spawn(async move { tx.send("pong".to_string()).await });

        assert_eq!(rx.recv().await.as_deref(), Some("pong"));
        assert!(responder.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_returns_value() {
        let (tx, rx) = channel::<u32>();
        drop(rx);

        assert_eq!(tx.send(7).await, Err(7));
    }

    #[tokio::test]
    async fn test_pending_send_fails_when_receiver_dropped() {
        let (tx, mut rx) = channel::<u32>();

        // Post a slot, then abandon the receiver entirely.
        let _ = tokio::time::timeout(Duration::from_millis(5), rx.recv()).await;
        drop(rx);

        assert_eq!(tx.send(3).await, Err(3));
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_senders_dropped() {
        let (tx, mut rx) = channel::<u32>();
        let extra = tx.clone();
        drop(tx);
        drop(extra);

        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_is_cancel_safe() {
        let (tx, mut rx) = channel::<u32>();
        let sender = tokio::spawn(async move { tx.send(5).await });

        {
            let mut recv = std::pin::pin!(rx.recv());
            // First poll posts the slot; nothing has been sent yet.
            let first = std::future::poll_fn(|cx| Poll::Ready(recv.as_mut().poll(cx))).await;
            assert_eq!(first, Poll::Pending);

            // The sender fills the slot while the recv future sits unpolled.
            assert_eq!(sender.await.unwrap(), Ok(()));
        }

        // Dropping the future kept the value that was already handed over.
        assert_eq!(rx.recv().await, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_recv_accepts_nothing() {
        let (tx, mut rx) = channel::<u32>();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), rx.recv()).await;
        assert!(timed_out.is_err());

        // Nobody is inside recv, so the send must keep waiting.
        let blocked = tokio::time::timeout(Duration::from_millis(10), tx.send(7)).await;
        assert!(blocked.is_err(), "send completed without a listening receiver");

        let late = tx.clone();
        let sender = tokio::spawn(async move { late.send(8).await });
        assert_eq!(rx.recv().await, Some(8));
        assert_eq!(sender.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_cloned_senders_share_receiver() {
        let (tx, mut rx) = channel::<u32>();
        let tx2 = tx.clone();

        let first = tokio::spawn(async move { tx.send(1).await });
        assert_eq!(rx.recv().await, Some(1));
        first.await.unwrap().unwrap();

        let second = tokio::spawn(async move { tx2.send(2).await });
        assert_eq!(rx.recv().await, Some(2));
        second.await.unwrap().unwrap();
    }
