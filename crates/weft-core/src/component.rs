//! Component instances and the two-phase render protocol.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};

use crate::scheduler::{self, PassToken, RenderReceipt};
use crate::{
    Behavior, Changed, HookPhase, Patch, RenderError, State, StateError, compose_default_state,
    effects,
};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Flags: u8 {
        /// Attached to a live render surface.
        const CONNECTED      = 1 << 0;
        /// A render is queued but has not run yet.
        const RENDER_PENDING = 1 << 1;
        /// A render pass is in flight right now.
        const RENDERING      = 1 << 2;
        /// At least one pass has completed.
        const HAS_RENDERED   = 1 << 3;
    }
}

new_key_type! {
    /// Handle for removing a change listener.
    pub struct ListenerKey;
}

type Listener = Rc<dyn Fn(&State, &Changed)>;

pub(crate) struct ComponentCore {
    behaviors: Vec<Box<dyn Behavior>>,
    state: RefCell<State>,
    last_rendered: RefCell<Option<State>>,
    flags: Cell<Flags>,
    /// Completion token for the next pass; minted lazily, taken when the
    /// pass starts so later writes bind to a fresh one.
    next_pass: RefCell<Option<Rc<PassToken>>>,
    listeners: RefCell<SlotMap<ListenerKey, Listener>>,
}

/// What a `render`/`rendered` hook gets to see: the pass's snapshot, the
/// keys that differ from the previously rendered snapshot, and whether
/// this is the component's very first pass (the safe point for one-time
/// external setup).
pub struct RenderContext<'a> {
    component: &'a Component,
    pub state: &'a State,
    pub changed: &'a Changed,
    pub first_render: bool,
}

impl RenderContext<'_> {
    /// The component being rendered. Writes made through it commit
    /// immediately but render in the next pass.
    pub fn component(&self) -> &Component {
        self.component
    }
}

/// A component instance: an ordered behavior list plus the state those
/// behaviors share. Cheap to clone (a handle).
#[derive(Clone)]
pub struct Component(Rc<ComponentCore>);

impl Component {
    /// Builds a component from its behavior list (index 0 is the base).
    ///
    /// Default-state contributions are merged in list order and resolved
    /// to an effects fixed point, so derived keys are consistent before
    /// the first write. Fails if the behaviors' effects cycle.
    pub fn new(behaviors: Vec<Box<dyn Behavior>>) -> Result<Self, StateError> {
        let defaults = compose_default_state(&behaviors);
        let (state, changed) = State::default().apply(&defaults);
        let state = effects::resolve(&behaviors, state, changed)?;
        Ok(Self(Rc::new(ComponentCore {
            behaviors,
            state: RefCell::new(state),
            last_rendered: RefCell::new(None),
            flags: Cell::new(Flags::empty()),
            next_pass: RefCell::new(None),
            listeners: RefCell::new(SlotMap::with_key()),
        })))
    }

    /// Read-only snapshot of the current state.
    pub fn state(&self) -> State {
        self.0.state.borrow().clone()
    }

    /// Single-key read, cheaper than cloning the whole snapshot.
    pub fn get(&self, key: &'static str) -> Option<crate::Value> {
        self.0.state.borrow().get(key).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.0.flags.get().contains(Flags::CONNECTED)
    }

    pub fn has_rendered(&self) -> bool {
        self.0.flags.get().contains(Flags::HAS_RENDERED)
    }

    /// Merges `patch`, resolves effects to a fixed point, and commits.
    ///
    /// If the settled state differs from the last rendered snapshot and
    /// the component is connected, exactly one render is queued; writes
    /// made before the queue drains coalesce into that pass. The returned
    /// receipt completes when the pass carrying these changes has run.
    /// A write that changes nothing returns an already-complete receipt
    /// and schedules nothing.
    ///
    /// Divergent effects fail the call and leave state untouched.
    pub fn set_state(&self, patch: Patch) -> Result<RenderReceipt, StateError> {
        let (proposed, changed) = self.0.state.borrow().apply(&patch);
        if changed.is_empty() {
            return Ok(RenderReceipt::ready());
        }
        let settled = effects::resolve(&self.0.behaviors, proposed, changed)?;
        *self.0.state.borrow_mut() = settled;

        let dirty = {
            let state = self.0.state.borrow();
            !state.diff(self.0.last_rendered.borrow().as_ref()).is_empty()
        };
        if !dirty {
            // written back to exactly what's on screen
            return Ok(RenderReceipt::ready());
        }
        Ok(RenderReceipt::pending(self.ensure_scheduled()))
    }

    /// Marks the component attached to a live surface. The first render
    /// (or a catch-up render, if state moved while detached) is scheduled
    /// on the shared queue and runs at the next [`scheduler::flush`];
    /// attachment never renders synchronously.
    pub fn connect(&self) {
        let mut flags = self.0.flags.get();
        flags.insert(Flags::CONNECTED);
        self.0.flags.set(flags);

        let dirty = !self.has_rendered() || {
            let state = self.0.state.borrow();
            !state.diff(self.0.last_rendered.borrow().as_ref()).is_empty()
        };
        if dirty {
            self.ensure_scheduled();
        }
    }

    /// Detaches the component. A pass already queued still completes
    /// harmlessly; new writes commit but stop scheduling renders until
    /// [`Component::connect`] runs again.
    pub fn disconnect(&self) {
        let mut flags = self.0.flags.get();
        flags.remove(Flags::CONNECTED);
        self.0.flags.set(flags);
    }

    /// Renders this component's pending changes right now instead of
    /// waiting for the queue drain (which will then skip it). Ignored
    /// with a warning when called from one of the component's own hooks.
    pub fn render_changes(&self) -> Result<(), RenderError> {
        ComponentCore::render_pass(&self.0)
    }

    /// Registers a listener invoked after every completed render pass
    /// with that pass's snapshot and changed set. Listeners run outside
    /// the pass: writes they make schedule a fresh one.
    pub fn on_change(&self, listener: impl Fn(&State, &Changed) + 'static) -> ListenerKey {
        self.0.listeners.borrow_mut().insert(Rc::new(listener))
    }

    /// Removes a change listener. Returns false if it was already gone.
    pub fn remove_change_listener(&self, key: ListenerKey) -> bool {
        self.0.listeners.borrow_mut().remove(key).is_some()
    }

    /// Queues a render (if connected and not already queued) and returns
    /// the token the resulting pass will complete.
    fn ensure_scheduled(&self) -> Rc<PassToken> {
        let token = self
            .0
            .next_pass
            .borrow_mut()
            .get_or_insert_with(|| Rc::new(PassToken::default()))
            .clone();
        let mut flags = self.0.flags.get();
        if flags.contains(Flags::CONNECTED) && !flags.contains(Flags::RENDER_PENDING) {
            flags.insert(Flags::RENDER_PENDING);
            self.0.flags.set(flags);
            scheduler::enqueue(&self.0);
            log::trace!("render queued");
        }
        token
    }
}

impl ComponentCore {
    pub(crate) fn render_pending(&self) -> bool {
        self.flags.get().contains(Flags::RENDER_PENDING)
    }

    /// One render pass: diff, `render` hooks in behavior order, snapshot
    /// bookkeeping, `rendered` hooks, change listeners. The receipt token
    /// is completed and the in-flight flag cleared on every exit path, so
    /// a failing hook cannot wedge the component.
    pub(crate) fn render_pass(core: &Rc<ComponentCore>) -> Result<(), RenderError> {
        let mut flags = core.flags.get();
        if flags.contains(Flags::RENDERING) {
            log::warn!("render re-entered from one of this component's own hooks; ignored");
            return Ok(());
        }
        // anything scheduled from here on belongs to the next pass
        flags.remove(Flags::RENDER_PENDING);
        core.flags.set(flags);

        let snapshot = core.state.borrow().clone();
        let changed = snapshot.diff(core.last_rendered.borrow().as_ref());
        let token = core.next_pass.borrow_mut().take();

        if changed.is_empty() && core.flags.get().contains(Flags::HAS_RENDERED) {
            // state reverted before the drain reached us
            if let Some(token) = token {
                token.complete();
            }
            return Ok(());
        }
        let first_render = !core.flags.get().contains(Flags::HAS_RENDERED);
        log::debug!(
            "render pass: {} changed key(s), first_render={first_render}",
            changed.len()
        );

        flags = core.flags.get();
        flags.insert(Flags::RENDERING);
        core.flags.set(flags);

        struct PassGuard<'a> {
            core: &'a ComponentCore,
            token: Option<Rc<PassToken>>,
        }
        impl Drop for PassGuard<'_> {
            fn drop(&mut self) {
                let mut flags = self.core.flags.get();
                flags.remove(Flags::RENDERING);
                self.core.flags.set(flags);
                if let Some(token) = &self.token {
                    token.complete();
                }
            }
        }
        let guard = PassGuard { core, token };

        let component = Component(core.clone());
        let ctx = RenderContext {
            component: &component,
            state: &snapshot,
            changed: &changed,
            first_render,
        };

        for behavior in &core.behaviors {
            behavior.render(&ctx).map_err(|source| RenderError {
                behavior: behavior.name(),
                phase: HookPhase::Render,
                source,
            })?;
        }

        // the pass is applied: record it before post-render hooks, so
        // their writes diff against what is actually on screen
        let mut flags = core.flags.get();
        flags.insert(Flags::HAS_RENDERED);
        core.flags.set(flags);
        *core.last_rendered.borrow_mut() = Some(snapshot.clone());

        for behavior in &core.behaviors {
            behavior.rendered(&ctx).map_err(|source| RenderError {
                behavior: behavior.name(),
                phase: HookPhase::Rendered,
                source,
            })?;
        }

        drop(guard);

        // listeners run outside the pass; clone handles first so one may
        // remove itself (or others) without poisoning the iteration
        let listeners: Vec<Listener> = core.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(&snapshot, &changed);
        }
        Ok(())
    }
}
