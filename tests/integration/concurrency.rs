//! Mutual exclusion between update transactions.

use crate::common::{installed_1_0_0, release_1_2_0, serve_release};
use keepup_cli::core::{KeepupError, find_kind};
use keepup_cli::update::{Confirmation, ProjectLock, TransactionOutcome, UpdateTransaction};
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn test_second_transaction_is_rejected_while_locked() {
    let mut server = mockito::Server::new_async().await;
    serve_release(&mut server, "v1.2.0", release_1_2_0()).await;
    let project = installed_1_0_0(&server);
    project.write("keepup.toml", "lock_timeout_secs = 0\n");
    let config = project.config();

    let held = ProjectLock::acquire(&config.lock_path(), Duration::from_secs(1)).await.unwrap();

    let err = UpdateTransaction::open(config.clone())
        .unwrap()
        .run(Confirmation::Preapproved)
        .await
        .unwrap_err();
    assert!(matches!(find_kind(&err), Some(KeepupError::UpdateInProgress { .. })));
    assert_eq!(project.read("app.bin"), "app 1.0.0");

    drop(held);
    let outcome =
        UpdateTransaction::open(config).unwrap().run(Confirmation::Preapproved).await.unwrap();
    assert!(matches!(outcome, TransactionOutcome::Committed(_)));
}

#[tokio::test]
#[serial]
async fn test_waiting_transaction_runs_after_release() {
    let mut server = mockito::Server::new_async().await;
    serve_release(&mut server, "v1.2.0", release_1_2_0()).await;
    let project = installed_1_0_0(&server);
    let config = project.config();

    let held = ProjectLock::acquire(&config.lock_path(), Duration::from_secs(1)).await.unwrap();
    let waiter = tokio::spawn({
        let config = config.clone();
        async move { UpdateTransaction::open(config)?.run(Confirmation::Preapproved).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(held);

    let outcome = waiter.await.unwrap().unwrap();
    assert!(matches!(outcome, TransactionOutcome::Committed(_)));
    assert_eq!(project.read("app.bin"), "app 1.2.0");
}
