use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::api::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    Pending,
    Success,
    Failed,
}

/// Observable state of an asynchronous operation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OpState<T> {
    pub pending: bool,
    pub error: Option<Error>,
    pub value: Option<T>,
}

impl<T> OpState<T> {
    fn idle(pending: bool) -> OpState<T> {
        OpState {
            pending,
            error: None,
            value: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.pending, &self.error, &self.value) {
            (true, _, _) => Phase::Pending,
            (false, Some(_), _) => Phase::Failed,
            (false, None, Some(_)) => Phase::Success,
            (false, None, None) => Phase::Idle,
        }
    }
}

/// Tracks pending/error/value for an operation triggered by the user.
///
/// Invocations may overlap: nothing is queued or cancelled, and whichever
/// invocation settles resets `pending` and overwrites the outcome. Callers
/// that need the latest invocation to win must serialize invocations.
/// Dropping an in-flight invocation also resets `pending`.
#[derive(Debug)]
pub struct AsyncOp<T> {
    state: Arc<Mutex<OpState<T>>>,
}

impl<T> Clone for AsyncOp<T> {
    fn clone(&self) -> AsyncOp<T> {
        AsyncOp {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone> AsyncOp<T> {
    pub fn new() -> AsyncOp<T> {
        AsyncOp::with_pending(false)
    }

    fn with_pending(pending: bool) -> AsyncOp<T> {
        AsyncOp {
            state: Arc::new(Mutex::new(OpState::idle(pending))),
        }
    }

    pub fn state(&self) -> OpState<T> {
        self.state.lock().clone()
    }

    pub fn pending(&self) -> bool {
        self.state.lock().pending
    }

    pub fn error(&self) -> Option<Error> {
        self.state.lock().error.clone()
    }

    pub fn value(&self) -> Option<T> {
        self.state.lock().value.clone()
    }

    pub async fn execute<F>(&self, action: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        {
            let mut state = self.state.lock();
            state.pending = true;
            state.error = None;
        }
        let _settle = ResetPending(&self.state);
        let res = action.await;
        let mut state = self.state.lock();
        state.pending = false;
        match &res {
            Ok(v) => {
                state.value = Some(v.clone());
                state.error = None;
            }
            Err(e) => {
                state.value = None;
                state.error = Some(e.clone());
            }
        }
        res
    }
}

impl<T: Clone> Default for AsyncOp<T> {
    fn default() -> AsyncOp<T> {
        AsyncOp::new()
    }
}

struct ResetPending<'a, T>(&'a Mutex<OpState<T>>);

impl<'a, T> Drop for ResetPending<'a, T> {
    fn drop(&mut self) {
        self.0.lock().pending = false;
    }
}

type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, Error>> + Send + Sync>;

/// An `AsyncOp` bound to a loading action, which runs it on first use.
///
/// Starts out pending, as there is no state to show before the first load.
pub struct AsyncLoad<T> {
    op: AsyncOp<T>,
    load: Loader<T>,
    started: AtomicBool,
}

impl<T: 'static + Clone + Send> AsyncLoad<T> {
    pub fn new<F, Fut>(load: F) -> AsyncLoad<T>
    where
        F: 'static + Send + Sync + Fn() -> Fut,
        Fut: 'static + Send + Future<Output = Result<T, Error>>,
    {
        AsyncLoad {
            op: AsyncOp::with_pending(true),
            load: Box::new(move || load().boxed()),
            started: AtomicBool::new(false),
        }
    }

    /// Triggers the load if it never was, and returns the resulting state.
    ///
    /// Once the load has been triggered, returns the current state without
    /// waiting, even if it is still pending.
    pub async fn get(&self) -> OpState<T> {
        if !self.started.swap(true, Ordering::SeqCst) {
            let _ = self.op.execute((self.load)()).await;
        }
        self.op.state()
    }

    /// Runs the load again, whether or not it already ran
    pub async fn reload(&self) -> Result<T, Error> {
        self.started.store(true, Ordering::SeqCst);
        self.op.execute((self.load)()).await
    }

    pub fn state(&self) -> OpState<T> {
        self.op.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn starts_idle() {
        let op = AsyncOp::<u32>::new();
        assert_eq!(op.state(), OpState::idle(false));
        assert_eq!(op.state().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn pending_while_running_then_success() {
        let op = AsyncOp::new();
        let (send, recv) = oneshot::channel::<u32>();
        let running = op.execute(async move { Ok(recv.await.unwrap()) });
        let observe = async {
            tokio::task::yield_now().await;
            assert!(op.pending());
            assert_eq!(op.state().phase(), Phase::Pending);
            send.send(4).unwrap();
        };
        let (res, ()) = tokio::join!(running, observe);
        assert_eq!(res, Ok(4));
        assert_eq!(
            op.state(),
            OpState {
                pending: false,
                error: None,
                value: Some(4),
            }
        );
        assert_eq!(op.state().phase(), Phase::Success);
    }

    #[tokio::test]
    async fn failure_clears_value() {
        let op = AsyncOp::new();
        op.execute(async { Ok(1) }).await.unwrap();
        let err = Error::PermissionDenied(String::from("not yours"));
        assert_eq!(op.execute(async { Err(err.clone()) }).await, Err(err.clone()));
        assert_eq!(
            op.state(),
            OpState {
                pending: false,
                error: Some(err),
                value: None,
            }
        );
        assert_eq!(op.state().phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn reinvocation_clears_error() {
        let op = AsyncOp::new();
        let _ = op.execute(async { Err(Error::MessageRequired) }).await;
        let (send, recv) = oneshot::channel::<()>();
        let running = op.execute(async move {
            recv.await.unwrap();
            Ok(2)
        });
        let observe = async {
            tokio::task::yield_now().await;
            assert!(op.pending());
            assert_eq!(op.error(), None);
            send.send(()).unwrap();
        };
        let (res, ()) = tokio::join!(running, observe);
        assert_eq!(res, Ok(2));
        assert_eq!(op.value(), Some(2));
    }

    #[tokio::test]
    async fn overlapping_invocations_last_settled_wins() {
        let op = AsyncOp::new();
        let (send_a, recv_a) = oneshot::channel::<()>();
        let (send_b, recv_b) = oneshot::channel::<()>();
        let a = op.execute(async move {
            recv_a.await.unwrap();
            Ok("a")
        });
        let b = op.execute(async move {
            recv_b.await.unwrap();
            Ok("b")
        });
        let drive = async {
            tokio::task::yield_now().await;
            send_b.send(()).unwrap();
            while op.pending() {
                tokio::task::yield_now().await;
            }
            // the first settlement resets pending even though `a` still runs
            assert!(!op.pending());
            assert_eq!(op.value(), Some("b"));
            send_a.send(()).unwrap();
        };
        tokio::join!(a, b, drive);
        assert_eq!(op.value(), Some("a"));
    }

    #[tokio::test]
    async fn dropping_invocation_resets_pending() {
        let op = AsyncOp::<u32>::new();
        let (_send, recv) = oneshot::channel::<u32>();
        let running = op.execute(async move { Ok(recv.await.unwrap()) });
        tokio::select! {
            _ = running => unreachable!(),
            _ = tokio::task::yield_now() => {}
        }
        assert!(!op.pending());
    }

    #[tokio::test]
    async fn load_runs_once_on_first_use() {
        let calls = Arc::new(AtomicUsize::new(0));
        let load = {
            let calls = calls.clone();
            AsyncLoad::new(move || {
                let calls = calls.clone();
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) }
            })
        };
        assert!(load.state().pending);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(load.get().await.value, Some(0));
        assert_eq!(load.get().await.value, Some(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(load.reload().await, Ok(1));
        assert_eq!(load.state().value, Some(1));
    }

    #[tokio::test]
    async fn load_failure_is_captured() {
        let load = AsyncLoad::<u32>::new(|| async { Err(Error::Network(String::from("down"))) });
        let state = load.get().await;
        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(state.error, Some(Error::Network(String::from("down"))));
    }
}
