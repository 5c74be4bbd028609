//! Runs session requests against the memo store and turns the results back into
//! session outcomes.

use client_core::{MemoSnapshot, SyncCoordinator, SyncError};
use map_controller::{SyncFailure, SyncOutcome, SyncRequest};
use tracing::debug;

/// Executes one request. Mutations yield their own outcome followed by the
/// outcome of the reload they trigger. A load overtaken by a newer one yields
/// nothing, so stale data never reaches the session.
pub async fn execute(coordinator: &SyncCoordinator, request: SyncRequest) -> Vec<SyncOutcome> {
    debug!(request = request.name(), "executing sync request");
    match request {
        SyncRequest::Load { limit } => loaded(coordinator.read(limit).await).into_iter().collect(),
        SyncRequest::Create(draft) => match coordinator.create(&draft).await {
            Ok(mutation) => std::iter::once(SyncOutcome::Created(mutation.value))
                .chain(loaded(mutation.reload))
                .collect(),
            Err(err) => vec![SyncOutcome::CreateFailed(failure(&err))],
        },
        SyncRequest::UpdateLocation { memo_id, position } => {
            match coordinator.update_location(&memo_id, position).await {
                Ok(mutation) => std::iter::once(SyncOutcome::LocationUpdated { memo_id })
                    .chain(loaded(mutation.reload))
                    .collect(),
                Err(err) => vec![SyncOutcome::UpdateFailed {
                    memo_id,
                    failure: failure(&err),
                }],
            }
        }
        SyncRequest::Delete { memo_id } => match coordinator.delete(&memo_id).await {
            Ok(mutation) => std::iter::once(SyncOutcome::Deleted { memo_id })
                .chain(loaded(mutation.reload))
                .collect(),
            Err(err) => vec![SyncOutcome::DeleteFailed {
                memo_id,
                failure: failure(&err),
            }],
        },
    }
}

fn loaded(result: Result<MemoSnapshot, SyncError>) -> Option<SyncOutcome> {
    match result {
        Ok(snapshot) => Some(SyncOutcome::Loaded {
            memos: snapshot.memos,
            total_items: snapshot.total_items,
        }),
        Err(err) if err.is_superseded() => {
            debug!("{err}; dropping outcome");
            None
        }
        Err(err) => Some(SyncOutcome::LoadFailed(failure(&err))),
    }
}

fn failure(err: &SyncError) -> SyncFailure {
    SyncFailure::new(err.to_string(), err.code())
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
