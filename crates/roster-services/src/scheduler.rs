//! Background summaries.
//!
//! Every period each scheduler opens a read-only transaction as the system
//! principal and logs what it finds: the client scheduler counts live
//! clients and reads the first page, the contact scheduler counts contacts.
//! Both stop mid-transaction when their service is stopped.

use std::time::Duration;

use futures::FutureExt as _;
use roster_core::{RequestContext, TickerService};
use roster_db::{ClientRepo, ContactRepo, DbError, TransactionalExecutor};
use roster_types::Paging;
use tokio_util::sync::CancellationToken;

/// Registry name of the client scheduler.
pub const CLIENT_SCHEDULER: &str = "ClientScheduler";

/// Registry name of the contact scheduler.
pub const CONTACT_SCHEDULER: &str = "ContactScheduler";

/// Build the client scheduler as a stoppable [`TickerService`].
pub fn client_scheduler(executor: TransactionalExecutor, period: Duration) -> TickerService {
    TickerService::new(CLIENT_SCHEDULER, period, move |stop: CancellationToken| {
        let executor = executor.clone();
        async move {
            let ctx = RequestContext::system().with_cancellation(stop);
            match summarise(&executor, &ctx).await {
                Ok((count, page)) => {
                    tracing::info!(clients = count, first_page = page, "Client summary");
                }
                Err(DbError::Cancelled) => tracing::debug!("Client summary cancelled"),
                Err(e) => tracing::warn!(error = %e, "Client summary failed"),
            }
        }
    })
}

/// Build the contact scheduler as a stoppable [`TickerService`].
pub fn contact_scheduler(executor: TransactionalExecutor, period: Duration) -> TickerService {
    TickerService::new(CONTACT_SCHEDULER, period, move |stop: CancellationToken| {
        let executor = executor.clone();
        async move {
            let ctx = RequestContext::system().with_cancellation(stop);
            let counted = executor
                .run(&ctx, |conn| async move { ContactRepo::new(conn).count().await }.boxed())
                .await;
            match counted {
                Ok(count) => tracing::info!(contacts = count, "Contact summary"),
                Err(DbError::Cancelled) => tracing::debug!("Contact summary cancelled"),
                Err(e) => tracing::warn!(error = %e, "Contact summary failed"),
            }
        }
    })
}

async fn summarise(
    executor: &TransactionalExecutor,
    ctx: &RequestContext,
) -> Result<(i64, usize), DbError> {
    executor
        .run(ctx, |conn| {
            async move {
                let mut repo = ClientRepo::new(conn);
                let count = repo.count().await?;
                let page = repo.find_all(Paging::default()).await?;
                Ok::<_, DbError>((count, page.len()))
            }
            .boxed()
        })
        .await
}
