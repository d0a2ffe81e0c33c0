//! The deferred render queue.
//!
//! `set_state` never renders synchronously. Components that need a render
//! put a weak reference on a thread-local FIFO, and the host drains it
//! with [`flush`] once the current batch of synchronous work is done,
//! the equivalent of the browser's end-of-microtask checkpoint. Any number
//! of same-turn writes therefore coalesce into one pass per component,
//! and passes run in the order they were scheduled.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use crate::RenderError;
use crate::component::ComponentCore;

thread_local! {
    static QUEUE: RefCell<VecDeque<Weak<ComponentCore>>> = RefCell::new(VecDeque::new());
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
}

pub(crate) fn enqueue(core: &Rc<ComponentCore>) {
    QUEUE.with(|q| q.borrow_mut().push_back(Rc::downgrade(core)));
}

/// Drains the render queue, running one pass per scheduled component.
///
/// Components scheduled while the drain is running (writes made from
/// `render`/`rendered` hooks or change listeners) are picked up by the
/// same drain, so a quiet queue on return means every pending change has
/// rendered. A failing hook stops the drain and propagates; the rest of
/// the queue stays put for the next call.
///
/// Calling this from inside a hook is a no-op: the pass in progress must
/// finish on a single consistent snapshot, so nested drains defer to the
/// outer one.
pub fn flush() -> Result<(), RenderError> {
    if FLUSHING.with(Cell::get) {
        log::warn!("flush re-entered from inside a render pass; deferring to the outer drain");
        return Ok(());
    }
    FLUSHING.with(|f| f.set(true));
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            FLUSHING.with(|f| f.set(false));
        }
    }
    let _guard = Guard;

    loop {
        let next = QUEUE.with(|q| q.borrow_mut().pop_front());
        let Some(weak) = next else { break };
        if let Some(core) = weak.upgrade() {
            ComponentCore::render_pass(&core)?;
        }
    }
    Ok(())
}

/// True if any live component still has a queued render.
pub fn has_pending() -> bool {
    QUEUE.with(|q| {
        q.borrow()
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|core| core.render_pending()))
    })
}

/// Completion token shared by every write coalesced into one render pass.
#[derive(Default, Debug)]
pub(crate) struct PassToken {
    done: Cell<bool>,
    wakers: RefCell<Vec<Waker>>,
}

impl PassToken {
    pub(crate) fn complete(&self) {
        self.done.set(true);
        for waker in self.wakers.borrow_mut().drain(..) {
            waker.wake();
        }
    }
}

/// Future returned by [`crate::Component::set_state`]. Completes once the
/// render pass carrying the write has finished (or immediately, for
/// writes that changed nothing). Polling requires the queue to actually
/// drain, so block on it only after [`flush`].
#[derive(Clone, Debug)]
pub struct RenderReceipt(Rc<PassToken>);

impl RenderReceipt {
    pub(crate) fn pending(token: Rc<PassToken>) -> Self {
        Self(token)
    }

    pub(crate) fn ready() -> Self {
        let token = PassToken::default();
        token.done.set(true);
        Self(Rc::new(token))
    }

    /// True once the pass that carries these changes has completed.
    pub fn is_complete(&self) -> bool {
        self.0.done.get()
    }
}

impl Future for RenderReceipt {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0.done.get() {
            Poll::Ready(())
        } else {
            self.0.wakers.borrow_mut().push(cx.waker().clone());
            Poll::Pending
        }
    }
}
