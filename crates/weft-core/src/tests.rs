#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::patch;
    use crate::*;

    /// `total = a + b`, recomputed whenever either input moves.
    struct Sum;

    impl Behavior for Sum {
        fn name(&self) -> &'static str {
            "sum"
        }
        fn default_state(&self) -> Patch {
            patch! { a: 0, b: 0, total: 0 }
        }
        fn state_effects(&self, state: &State, changed: &Changed) -> Patch {
            if !(changed.contains("a") || changed.contains("b")) {
                return Patch::new();
            }
            let a = state.get_int("a").unwrap_or(0);
            let b = state.get_int("b").unwrap_or(0);
            patch! { total: a + b }
        }
    }

    /// Records every pass: the changed set and the first_render flag.
    struct Probe {
        passes: Rc<RefCell<Vec<(Changed, bool)>>>,
    }

    impl Behavior for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }
        fn default_state(&self) -> Patch {
            patch! { a: 0, b: 0 }
        }
        fn render(&self, ctx: &RenderContext<'_>) -> Result<(), HookError> {
            self.passes
                .borrow_mut()
                .push((ctx.changed.clone(), ctx.first_render));
            Ok(())
        }
    }

    fn probed() -> (Component, Rc<RefCell<Vec<(Changed, bool)>>>) {
        let passes = Rc::new(RefCell::new(Vec::new()));
        let component = Component::new(vec![Box::new(Probe {
            passes: passes.clone(),
        })])
        .unwrap();
        (component, passes)
    }

    #[test]
    fn same_turn_writes_coalesce_into_one_pass() {
        let (c, passes) = probed();
        c.connect();
        flush().unwrap();
        passes.borrow_mut().clear();

        c.set_state(patch! { a: 1 }).unwrap();
        c.set_state(patch! { b: 2 }).unwrap();
        flush().unwrap();

        let passes = passes.borrow();
        assert_eq!(passes.len(), 1);
        assert!(passes[0].0.contains("a"));
        assert!(passes[0].0.contains("b"));
    }

    #[test]
    fn first_render_flag_only_on_first_pass() {
        let (c, passes) = probed();
        c.connect();
        flush().unwrap();
        c.set_state(patch! { a: 1 }).unwrap();
        flush().unwrap();

        let firsts: Vec<bool> = passes.borrow().iter().map(|(_, f)| *f).collect();
        assert_eq!(firsts, vec![true, false]);
    }

    #[test]
    fn effects_settle_synchronously_inside_set_state() {
        let c = Component::new(vec![Box::new(Sum)]).unwrap();
        c.set_state(patch! { a: 1, b: 2 }).unwrap();
        // before any render
        assert_eq!(c.state().get_int("total"), Some(3));
    }

    #[test]
    fn settled_state_is_a_fixed_point() {
        let behaviors: Vec<Box<dyn Behavior>> = vec![Box::new(Sum)];
        let (state, changed) = State::default().apply(&patch! { a: 1, b: 2 });
        let settled = effects::resolve(&behaviors, state, changed).unwrap();
        assert_eq!(settled.get_int("total"), Some(3));

        // feed every key back in as changed: nothing further may move
        let again = effects::resolve(&behaviors, settled.clone(), settled.diff(None)).unwrap();
        assert!(again.diff(Some(&settled)).is_empty());
    }

    #[test]
    fn divergent_effects_fail_loudly_and_commit_nothing() {
        struct Runaway;
        impl Behavior for Runaway {
            fn name(&self) -> &'static str {
                "runaway"
            }
            fn default_state(&self) -> Patch {
                patch! { ping: 0, n: 0 }
            }
            fn state_effects(&self, state: &State, changed: &Changed) -> Patch {
                if state.get_int("ping").unwrap_or(0) > 0
                    && (changed.contains("ping") || changed.contains("n"))
                {
                    patch! { n: state.get_int("n").unwrap_or(0) + 1 }
                } else {
                    Patch::new()
                }
            }
        }

        let c = Component::new(vec![Box::new(Runaway)]).unwrap();
        let err = c.set_state(patch! { ping: 1 }).unwrap_err();
        assert!(matches!(
            err,
            StateError::EffectsDiverged {
                rounds: EFFECT_ROUND_LIMIT,
                ..
            }
        ));
        assert_eq!(c.state().get_int("ping"), Some(0));
        assert_eq!(c.state().get_int("n"), Some(0));
    }

    #[test]
    fn construction_resolves_effects_over_defaults() {
        struct Seeded;
        impl Behavior for Seeded {
            fn name(&self) -> &'static str {
                "seeded"
            }
            fn default_state(&self) -> Patch {
                patch! { a: 2, b: 3, total: 0 }
            }
            fn state_effects(&self, state: &State, changed: &Changed) -> Patch {
                Sum.state_effects(state, changed)
            }
        }
        let c = Component::new(vec![Box::new(Seeded)]).unwrap();
        assert_eq!(c.state().get_int("total"), Some(5));
    }

    #[test]
    fn no_op_writes_schedule_nothing() {
        struct Plain;
        impl Behavior for Plain {
            fn name(&self) -> &'static str {
                "plain"
            }
            fn default_state(&self) -> Patch {
                patch! { label: "x", items: Value::list(vec![1.into(), 2.into()]) }
            }
        }
        let (probe, passes) = {
            let passes = Rc::new(RefCell::new(Vec::new()));
            let c = Component::new(vec![
                Box::new(Plain),
                Box::new(Probe {
                    passes: passes.clone(),
                }),
            ])
            .unwrap();
            (c, passes)
        };
        probe.connect();
        flush().unwrap();
        passes.borrow_mut().clear();

        let empty = probe.set_state(patch!()).unwrap();
        assert!(empty.is_complete());

        // strings compare by value
        let same_label = probe.set_state(patch! { label: "x" }).unwrap();
        assert!(same_label.is_complete());

        // lists compare by reference: write the same handle back
        let items = probe.get("items").unwrap();
        let same_items = probe.set_state(Patch::new().with("items", items)).unwrap();
        assert!(same_items.is_complete());

        flush().unwrap();
        assert!(passes.borrow().is_empty());
    }

    #[test]
    fn hook_order_is_stable_across_passes() {
        struct Named {
            name: &'static str,
            order: Rc<RefCell<Vec<&'static str>>>,
        }
        impl Behavior for Named {
            fn name(&self) -> &'static str {
                self.name
            }
            fn default_state(&self) -> Patch {
                patch! { tick: 0 }
            }
            fn render(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
                self.order.borrow_mut().push(self.name);
                Ok(())
            }
        }

        let order = Rc::new(RefCell::new(Vec::new()));
        let named = |name: &'static str| {
            Box::new(Named {
                name,
                order: order.clone(),
            }) as Box<dyn Behavior>
        };
        let c = Component::new(vec![named("base"), named("middle"), named("outer")]).unwrap();
        c.connect();
        flush().unwrap();
        assert_eq!(*order.borrow(), vec!["base", "middle", "outer"]);

        order.borrow_mut().clear();
        c.set_state(patch! { tick: 1 }).unwrap();
        flush().unwrap();
        assert_eq!(*order.borrow(), vec!["base", "middle", "outer"]);
    }

    #[test]
    fn write_during_rendered_yields_exactly_one_more_pass() {
        struct Chain {
            passes: Rc<Cell<usize>>,
        }
        impl Behavior for Chain {
            fn name(&self) -> &'static str {
                "chain"
            }
            fn default_state(&self) -> Patch {
                patch! { step: 0 }
            }
            fn render(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
                self.passes.set(self.passes.get() + 1);
                Ok(())
            }
            fn rendered(&self, ctx: &RenderContext<'_>) -> Result<(), HookError> {
                if ctx.state.get_int("step") == Some(1) {
                    ctx.component().set_state(patch! { step: 2 })?;
                }
                Ok(())
            }
        }

        let passes = Rc::new(Cell::new(0));
        let c = Component::new(vec![Box::new(Chain {
            passes: passes.clone(),
        })])
        .unwrap();
        c.connect();
        flush().unwrap();
        passes.set(0);

        c.set_state(patch! { step: 1 }).unwrap();
        flush().unwrap();
        assert_eq!(passes.get(), 2);
        assert_eq!(c.state().get_int("step"), Some(2));
    }

    #[test]
    fn write_during_render_commits_now_but_renders_next_pass() {
        struct MidRender {
            snapshots: Rc<RefCell<Vec<(i64, i64)>>>,
        }
        impl Behavior for MidRender {
            fn name(&self) -> &'static str {
                "mid_render"
            }
            fn default_state(&self) -> Patch {
                patch! { step: 0 }
            }
            fn render(&self, ctx: &RenderContext<'_>) -> Result<(), HookError> {
                if ctx.state.get_int("step") == Some(1) {
                    ctx.component().set_state(patch! { step: 2 })?;
                }
                let pass_view = ctx.state.get_int("step").unwrap_or(-1);
                let committed = ctx.component().state().get_int("step").unwrap_or(-1);
                self.snapshots.borrow_mut().push((pass_view, committed));
                Ok(())
            }
        }

        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let c = Component::new(vec![Box::new(MidRender {
            snapshots: snapshots.clone(),
        })])
        .unwrap();
        c.connect();
        flush().unwrap();
        snapshots.borrow_mut().clear();

        c.set_state(patch! { step: 1 }).unwrap();
        flush().unwrap();

        // pass 1 keeps its snapshot (1) while the commit (2) waits its turn
        assert_eq!(*snapshots.borrow(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn failed_render_does_not_poison_the_component() {
        struct Flaky {
            fail: Rc<Cell<bool>>,
            renders: Rc<Cell<usize>>,
        }
        impl Behavior for Flaky {
            fn name(&self) -> &'static str {
                "flaky"
            }
            fn default_state(&self) -> Patch {
                patch! { n: 0 }
            }
            fn render(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
                if self.fail.get() {
                    return Err("render exploded".into());
                }
                self.renders.set(self.renders.get() + 1);
                Ok(())
            }
        }

        let fail = Rc::new(Cell::new(true));
        let renders = Rc::new(Cell::new(0));
        let c = Component::new(vec![Box::new(Flaky {
            fail: fail.clone(),
            renders: renders.clone(),
        })])
        .unwrap();
        c.connect();

        let err = flush().unwrap_err();
        assert_eq!(err.behavior, "flaky");
        assert_eq!(err.phase, HookPhase::Render);
        assert!(!c.has_rendered());

        fail.set(false);
        let receipt = c.set_state(patch! { n: 1 }).unwrap();
        flush().unwrap();
        assert!(receipt.is_complete());
        assert_eq!(renders.get(), 1);
        assert!(c.has_rendered());
    }

    #[test]
    fn failed_rendered_still_records_the_pass_as_applied() {
        struct FlakyRendered {
            fail: Rc<Cell<bool>>,
        }
        impl Behavior for FlakyRendered {
            fn name(&self) -> &'static str {
                "flaky_rendered"
            }
            fn default_state(&self) -> Patch {
                patch! { n: 0 }
            }
            fn rendered(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
                if self.fail.get() {
                    return Err("measure exploded".into());
                }
                Ok(())
            }
        }

        let fail = Rc::new(Cell::new(true));
        let c = Component::new(vec![Box::new(FlakyRendered { fail: fail.clone() })]).unwrap();
        c.connect();

        let err = flush().unwrap_err();
        assert_eq!(err.phase, HookPhase::Rendered);
        // the render phase finished, so the snapshot counts as on screen
        assert!(c.has_rendered());
        let receipt = c.set_state(patch! { n: 0 }).unwrap();
        assert!(receipt.is_complete());
    }

    #[test]
    fn open_scenario() {
        struct OpenProbe {
            opens: Rc<Cell<usize>>,
        }
        impl Behavior for OpenProbe {
            fn name(&self) -> &'static str {
                "open_probe"
            }
            fn default_state(&self) -> Patch {
                patch! { open: false }
            }
            fn render(&self, ctx: &RenderContext<'_>) -> Result<(), HookError> {
                if ctx.changed.contains("open") && !ctx.first_render {
                    self.opens.set(self.opens.get() + 1);
                }
                Ok(())
            }
        }

        let opens = Rc::new(Cell::new(0));
        let c = Component::new(vec![Box::new(OpenProbe {
            opens: opens.clone(),
        })])
        .unwrap();
        c.connect();
        flush().unwrap();

        let receipt = c.set_state(patch! { open: true }).unwrap();
        assert!(!receipt.is_complete());
        flush().unwrap();
        pollster::block_on(receipt.clone());
        assert!(receipt.is_complete());
        assert_eq!(opens.get(), 1);
        assert_eq!(c.state().get_bool("open"), Some(true));
    }

    #[test]
    fn later_behaviors_win_default_key_conflicts() {
        struct A;
        impl Behavior for A {
            fn name(&self) -> &'static str {
                "a"
            }
            fn default_state(&self) -> Patch {
                patch! { mode: "a", only_a: 1 }
            }
        }
        struct B;
        impl Behavior for B {
            fn name(&self) -> &'static str {
                "b"
            }
            fn default_state(&self) -> Patch {
                patch! { mode: "b" }
            }
        }

        let c = Component::new(vec![Box::new(A), Box::new(B)]).unwrap();
        assert_eq!(c.state().get_str("mode"), Some("b"));
        assert_eq!(c.state().get_int("only_a"), Some(1));
    }

    #[test]
    fn change_listeners_fire_per_pass_and_can_be_removed() {
        let (c, _passes) = probed();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let key = c.on_change({
            let seen = seen.clone();
            move |state, changed| {
                seen.borrow_mut()
                    .push((state.get_int("a"), changed.contains("a")));
            }
        });

        c.connect();
        flush().unwrap();
        c.set_state(patch! { a: 7 }).unwrap();
        flush().unwrap();
        assert_eq!(*seen.borrow(), vec![(Some(0), true), (Some(7), true)]);

        assert!(c.remove_change_listener(key));
        assert!(!c.remove_change_listener(key));
        c.set_state(patch! { a: 8 }).unwrap();
        flush().unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn writes_before_connect_render_on_the_catch_up_pass() {
        let (c, passes) = probed();
        let receipt = c.set_state(patch! { a: 1 }).unwrap();
        assert!(!receipt.is_complete());

        flush().unwrap();
        assert!(!c.has_rendered());

        c.connect();
        assert!(!c.has_rendered()); // deterministic: renders on next drain
        flush().unwrap();
        assert!(c.has_rendered());
        assert!(receipt.is_complete());
        assert_eq!(passes.borrow().len(), 1);
    }

    #[test]
    fn disconnected_components_commit_but_do_not_schedule() {
        let (c, passes) = probed();
        c.connect();
        flush().unwrap();
        passes.borrow_mut().clear();

        c.disconnect();
        c.set_state(patch! { a: 5 }).unwrap();
        flush().unwrap();
        assert!(passes.borrow().is_empty());
        assert_eq!(c.state().get_int("a"), Some(5));

        c.connect();
        flush().unwrap();
        assert_eq!(passes.borrow().len(), 1);
        assert!(passes.borrow()[0].0.contains("a"));
    }

    #[test]
    fn render_changes_renders_now_and_the_drain_skips_it() {
        let (c, passes) = probed();
        c.connect();
        c.render_changes().unwrap();
        assert!(c.has_rendered());
        assert_eq!(passes.borrow().len(), 1);

        flush().unwrap();
        assert_eq!(passes.borrow().len(), 1);
    }

    #[test]
    fn nested_flush_defers_to_the_outer_drain() {
        struct Nested {
            renders: Rc<Cell<usize>>,
        }
        impl Behavior for Nested {
            fn name(&self) -> &'static str {
                "nested"
            }
            fn render(&self, _ctx: &RenderContext<'_>) -> Result<(), HookError> {
                self.renders.set(self.renders.get() + 1);
                flush()?; // no-op from inside a pass
                Ok(())
            }
        }

        let renders = Rc::new(Cell::new(0));
        let c = Component::new(vec![Box::new(Nested {
            renders: renders.clone(),
        })])
        .unwrap();
        c.connect();
        flush().unwrap();
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn has_pending_tracks_the_queue() {
        let (c, _passes) = probed();
        assert!(!has_pending());
        c.connect();
        assert!(has_pending());
        flush().unwrap();
        assert!(!has_pending());
    }

    #[test]
    fn value_strict_equality() {
        assert!(Value::from(1).same(&Value::from(1)));
        assert!(!Value::from(1).same(&Value::from(2)));
        assert!(Value::from("x").same(&Value::from("x")));
        assert!(!Value::from(f64::NAN).same(&Value::from(f64::NAN)));

        let list = Value::list(vec![1.into()]);
        assert!(list.same(&list.clone()));
        assert!(!list.same(&Value::list(vec![1.into()])));
    }

    #[test]
    fn apply_diffs_against_the_original_snapshot() {
        let (state, _) = State::default().apply(&patch! { a: 1 });
        // write away and back within one patch: net unchanged
        let patch = Patch::new().with("a", 2).with("a", 1);
        let (next, changed) = state.apply(&patch);
        assert!(changed.is_empty());
        assert_eq!(next.get_int("a"), Some(1));
    }
}
