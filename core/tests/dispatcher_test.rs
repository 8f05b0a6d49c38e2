use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use cluegetter_core::bus::{broadcast_channel, instance_channel, Dispatcher, LocalTransport, Transport};
use cluegetter_core::module::{ModuleBuilder, ModuleRegistry};

const RECV_WINDOW: Duration = Duration::from_secs(2);
const QUIET_WINDOW: Duration = Duration::from_millis(200);

fn queue_module(name: &str, operation: &str, capacity: usize) -> (Arc<dyn cluegetter_core::Module>, mpsc::Receiver<Vec<u8>>) {
    let (tx, rx) = mpsc::channel(capacity);
    let module = ModuleBuilder::new(name)
        .enable(|| true)
        .rpc_queue(operation, tx)
        .build();
    (Arc::new(module), rx)
}

#[tokio::test]
async fn broadcast_and_directed_channels_reach_the_module_queue() {
    let transport = Arc::new(LocalTransport::new());
    let registry = ModuleRegistry::new();
    let (module, mut rx) = queue_module("quotas", "quotas!sync", 16);
    registry.register(module).expect("register");

    let dispatcher = Dispatcher::new(transport.clone(), 3);
    dispatcher.start(&registry).await.expect("start");

    transport
        .publish(&broadcast_channel("quotas!sync"), b"everyone".to_vec())
        .await
        .expect("publish");
    let got = timeout(RECV_WINDOW, rx.recv()).await.expect("delivered");
    assert_eq!(got, Some(b"everyone".to_vec()));

    transport
        .publish(&instance_channel(3, "quotas!sync"), b"just-us".to_vec())
        .await
        .expect("publish");
    let got = timeout(RECV_WINDOW, rx.recv()).await.expect("delivered");
    assert_eq!(got, Some(b"just-us".to_vec()));

    // Directed at another instance: nobody here is subscribed.
    transport
        .publish(&instance_channel(9, "quotas!sync"), b"elsewhere".to_vec())
        .await
        .expect("publish");
    assert!(timeout(QUIET_WINDOW, rx.recv()).await.is_err());
    let stats = transport
        .stats(&instance_channel(9, "quotas!sync"))
        .expect("stats");
    assert_eq!(stats.no_subscriber, 1);
}

#[tokio::test]
async fn order_within_one_queue_matches_delivery_order() {
    let transport = Arc::new(LocalTransport::new());
    let registry = ModuleRegistry::new();
    let (module, mut rx) = queue_module("quotas", "quotas!sync", 16);
    registry.register(module).expect("register");
    Dispatcher::new(transport.clone(), 0)
        .start(&registry)
        .await
        .expect("start");

    let channel = broadcast_channel("quotas!sync");
    for i in 0..8u8 {
        transport
            .publish(&channel, vec![i])
            .await
            .expect("publish");
    }
    for i in 0..8u8 {
        let got = timeout(RECV_WINDOW, rx.recv()).await.expect("delivered");
        assert_eq!(got, Some(vec![i]));
    }
}

#[tokio::test]
async fn full_queue_blocks_only_its_own_channel() {
    let transport = Arc::new(LocalTransport::new());
    let registry = ModuleRegistry::new();
    // Capacity one and never drained until the end: the pump for this
    // channel must wait, nothing may be dropped.
    let (slow, mut slow_rx) = queue_module("slow", "slow!work", 1);
    let (fast, mut fast_rx) = queue_module("fast", "fast!work", 16);
    registry.register(slow).expect("register");
    registry.register(fast).expect("register");
    Dispatcher::new(transport.clone(), 0)
        .start(&registry)
        .await
        .expect("start");

    for i in 0..4u8 {
        transport
            .publish(&broadcast_channel("slow!work"), vec![i])
            .await
            .expect("publish");
    }
    transport
        .publish(&broadcast_channel("fast!work"), b"through".to_vec())
        .await
        .expect("publish");

    // The unrelated channel flows while the slow queue is saturated.
    let got = timeout(RECV_WINDOW, fast_rx.recv()).await.expect("delivered");
    assert_eq!(got, Some(b"through".to_vec()));

    // Draining the slow queue releases every payload, in order.
    for i in 0..4u8 {
        let got = timeout(RECV_WINDOW, slow_rx.recv()).await.expect("delivered");
        assert_eq!(got, Some(vec![i]));
    }
}

#[tokio::test]
async fn disabled_modules_are_not_subscribed() {
    let transport = Arc::new(LocalTransport::new());
    let registry = ModuleRegistry::new();
    let (tx, mut rx) = mpsc::channel(4);
    registry
        .register(Arc::new(
            ModuleBuilder::new("dormant")
                .rpc_queue("dormant!tick", tx)
                .build(),
        ))
        .expect("register");
    Dispatcher::new(transport.clone(), 0)
        .start(&registry)
        .await
        .expect("start");

    transport
        .publish(&broadcast_channel("dormant!tick"), b"tick".to_vec())
        .await
        .expect("publish");
    assert!(timeout(QUIET_WINDOW, rx.recv()).await.is_err());
}
