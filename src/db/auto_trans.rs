//! Run a unit of work inside a transaction context.
//!
//! Without these wrappers every caller has to keep the work's error around
//! and finalize the context on every exit path, including panics:
//!
//! ```ignore
//! let mut tc = TransContext::new(&ds, RequestStyle::ReadWrite, trace_id).await?;
//! let outcome = AssertUnwindSafe(async { run(&mut tc).await }).catch_unwind().await;
//! match outcome {
//!     Ok(result) => {
//!         tc.complete(result.as_ref().err()).await;
//!         result
//!     }
//!     Err(payload) => {
//!         tc.complete_with_panic(None::<&DaoError>, Some(payload)).await;
//!         unreachable!()
//!     }
//! }
//! ```
//!
//! [`auto_trans`] and [`auto_trans_with_result`] do exactly that.

use crate::db::transaction::{MET_RECOVER, TransContext};
use crate::error::{DaoError, DaoResult};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

/// Run `work` in a context built by `creator`, without a business result.
///
/// If `creator` fails its error is returned and no work runs. Otherwise the
/// context is committed when `work` returns `Ok`, rolled back when it returns
/// `Err` (the same error is returned), and rolled back before the panic is
/// resumed when `work` panics.
///
/// # Example
///
/// ```ignore
/// auto_trans(
///     || TransContext::new(&ds, RequestStyle::ReadWrite, "req-1"),
///     |tc| Box::pin(async move {
///         tc.execute("UPDATE account SET balance = balance - 1 WHERE id = ?", &[Value::Int(7)])
///             .await?;
///         Ok::<_, DaoError>(())
///     }),
/// )
/// .await?;
/// ```
pub async fn auto_trans<C, Fut, W, E>(creator: C, work: W) -> Result<(), E>
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = DaoResult<TransContext>>,
    W: for<'c> FnOnce(&'c mut TransContext) -> BoxFuture<'c, Result<(), E>>,
    E: From<DaoError> + fmt::Display + Sync,
{
    auto_trans_with_result(creator, work).await
}

/// Like [`auto_trans`], but `work` produces a value that is passed through.
pub async fn auto_trans_with_result<C, Fut, W, T, E>(creator: C, work: W) -> Result<T, E>
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = DaoResult<TransContext>>,
    W: for<'c> FnOnce(&'c mut TransContext) -> BoxFuture<'c, Result<T, E>>,
    E: From<DaoError> + fmt::Display + Sync,
{
    let tc = creator().await.map_err(E::from)?;
    wrap_trans(tc, work).await
}

async fn wrap_trans<W, T, E>(mut tc: TransContext, work: W) -> Result<T, E>
where
    W: for<'c> FnOnce(&'c mut TransContext) -> BoxFuture<'c, Result<T, E>>,
    E: fmt::Display + Sync,
{
    // `work` itself runs inside the guard; it may panic before returning.
    let outcome = AssertUnwindSafe(async { work(&mut tc).await })
        .catch_unwind()
        .await;
    match outcome {
        Ok(result) => {
            tc.complete(result.as_ref().err()).await;
            result
        }
        Err(payload) => {
            tc.complete(Some(MET_RECOVER)).await;
            panic::resume_unwind(payload)
        }
    }
}
