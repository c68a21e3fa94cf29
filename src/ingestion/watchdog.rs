use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use super::coordinator::CoordinatorCtx;

/// Polls for documents stuck in `processing` past the configured
/// lease and re-enqueues them; their source bytes are still held in
/// `pending_sources` since the worker only removes an entry once a
/// job reaches a terminal state.
pub(crate) async fn run(ctx: Arc<CoordinatorCtx>) {
    let interval = Duration::from_secs((ctx.ingestion_cfg.lease_seconds / 4).max(1));
    loop {
        sleep(interval).await;

        let stale = match ctx.document_repo.list_stale_processing(ctx.ingestion_cfg.lease_seconds as i64).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "watchdog failed to list stale documents");
                continue;
            }
        };

        for document in stale {
            if !ctx.pending_sources.contains_key(&document.id) {
                // Source bytes are gone (process restarted since the
                // job was claimed); the worker itself will fail it
                // with "source no longer available" once it re-pops.
                continue;
            }
            info!(document_id = %document.id, "watchdog reclaiming stale ingestion job");
            let _ = ctx.document_repo.touch(document.id).await;
            let _ = ctx.sender.try_send(document.id);
        }
    }
}
