use std::time::Duration;

use tokio::time::timeout;

use cluegetter_core::supervisor::spawn_supervised;
use cluegetter_core::CluegetterError;

#[tokio::test]
async fn worker_errors_are_contained() {
    let handle = spawn_supervised("test.failing", async {
        Err(CluegetterError::Decode("bad envelope".to_string()))
    });
    // The supervisor completes normally; the error went to the log.
    handle.await.expect("supervisor task");
}

#[tokio::test]
async fn worker_panics_are_contained() {
    let handle = spawn_supervised("test.panicking", async {
        assert!(false, "defective worker");
        Ok(())
    });
    handle.await.expect("supervisor task");

    // Work spawned afterwards is unaffected.
    let (tx, rx) = tokio::sync::oneshot::channel();
    spawn_supervised("test.healthy", async move {
        let _ = tx.send(42u8);
        Ok(())
    });
    let got = timeout(Duration::from_secs(2), rx).await.expect("delivered");
    assert_eq!(got, Ok(42));
}
