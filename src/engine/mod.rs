//! Transition resolution and sequencing.
//!
//! [`respond`] decides which active states handle an event; the sequencer
//! turns the chosen transitions into ordered exit and entry steps. Both are
//! pure over the machine model. Only the crate-internal run functions execute
//! hooks and actions.

mod responder;
mod sequence;

pub use responder::{respond, Response};
pub use sequence::{entry_sequence, plan, plan_start, Sequence, SequenceError, Step, StepKind};

pub(crate) use sequence::{run, run_start};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Region, StateSpec, States, Transitions};
    use crate::core::{Action, KeyFn, Signature};
    use crate::event_enum;
    use crate::machine::{ActiveSet, Machine, Transition};

    event_enum! {
        enum Ev {
            OpenDoor,
            CloseDoor,
            Loop,
            Sibling,
            Across,
            Down,
            DownLocal,
            Up,
            UpLocal,
            Stay,
            Reset,
        }
    }

    type Log = Vec<String>;

    fn active_names<C>(machine: &Machine<Ev, C>, active: &ActiveSet) -> Vec<String> {
        active
            .signatures(machine.tree())
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn door() -> Machine<Ev, Log> {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().leaf("closed").leaf("opened")),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("closed"))
            .on("closed", Ev::OpenDoor, Transition::external("opened"))
            .on("opened", Ev::CloseDoor, Transition::external("closed"));
        Machine::build(states, transitions).unwrap()
    }

    #[test]
    fn door_start_enters_initial_leaf() {
        let machine = door();
        let start = plan_start(&machine, &Log::new()).unwrap();

        assert!(start.exits.is_empty());
        assert_eq!(start.entry_names(), vec!["top-entry", "top-Initial", "closed-entry"]);
        assert_eq!(active_names(&machine, &start.active), vec!["closed", "top"]);
    }

    #[test]
    fn door_opens() {
        let machine = door();
        let start = plan_start(&machine, &Log::new()).unwrap();

        let open = plan(&machine, &start.active, &Ev::OpenDoor, &Log::new()).unwrap();

        assert_eq!(open.exit_names(), vec!["closed-exit"]);
        assert_eq!(open.entry_names(), vec!["closed-OpenDoor", "opened-entry"]);
        assert_eq!(active_names(&machine, &open.active), vec!["opened", "top"]);
    }

    #[test]
    fn unhandled_event_is_identity() {
        let machine = door();
        let start = plan_start(&machine, &Log::new()).unwrap();

        let result = plan(&machine, &start.active, &Ev::CloseDoor, &Log::new()).unwrap();

        assert!(result.is_empty());
        assert_eq!(result.active, start.active);
    }

    fn logging(name: &'static str) -> StateSpec<Ev, Log> {
        StateSpec::leaf()
            .on_enter(Action::new("log-enter", move |_, log: &mut Log| {
                log.push(format!("enter {name}"))
            }))
            .on_exit(Action::new("log-exit", move |_, log: &mut Log| {
                log.push(format!("exit {name}"))
            }))
    }

    #[test]
    fn self_loop_exits_and_reenters() {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().state("goal", logging("goal"))),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("goal"))
            .on("goal", Ev::Loop, Transition::external("goal"));
        let machine = Machine::build(states, transitions).unwrap();

        let mut log = Log::new();
        let (start, result) = run_start(&machine, &mut log);
        result.unwrap();
        log.clear();

        let (looped, result) = run(&machine, &start.active, &Ev::Loop, &mut log);
        result.unwrap();

        assert_eq!(looped.exit_names(), vec!["goal-exit"]);
        assert_eq!(looped.entry_names(), vec!["goal-Loop", "goal-entry"]);
        assert_eq!(looped.active, start.active);
        assert_eq!(log, vec!["exit goal", "enter goal"]);
    }

    // top ─┬─ a ─┬─ a1
    //      │     └─ a2
    //      └─ b ─── b1
    fn nested() -> Machine<Ev, Log> {
        let states = States::new().state(
            "top",
            StateSpec::composite(
                States::new()
                    .state("a", StateSpec::composite(States::new().leaf("a1").leaf("a2")))
                    .state("b", StateSpec::composite(States::new().leaf("b1"))),
            ),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("a"))
            .initial("a", Transition::external("a1"))
            .initial("b", Transition::external("b1"))
            .on("a1", Ev::Sibling, Transition::external("a2"))
            .on("a1", Ev::Across, Transition::external("b1"))
            .on("a", Ev::Down, Transition::external("a2"))
            .on("a", Ev::DownLocal, Transition::local("a2"))
            .on("a1", Ev::Up, Transition::external("a"))
            .on("a1", Ev::UpLocal, Transition::local("a"))
            .on("a1", Ev::Stay, Transition::internal());
        Machine::build(states, transitions).unwrap()
    }

    fn planned(event: Ev) -> (Vec<String>, Vec<String>, Vec<String>) {
        let machine = nested();
        let start = plan_start(&machine, &Log::new()).unwrap();
        let sequence = plan(&machine, &start.active, &event, &Log::new()).unwrap();
        (
            sequence.exit_names().into_iter().map(String::from).collect(),
            sequence.entry_names().into_iter().map(String::from).collect(),
            active_names(&machine, &sequence.active),
        )
    }

    #[test]
    fn nested_start_follows_initials() {
        let machine = nested();
        let start = plan_start(&machine, &Log::new()).unwrap();
        assert_eq!(
            start.entry_names(),
            vec!["top-entry", "top-Initial", "a-entry", "a-Initial", "a1-entry"]
        );
    }

    #[test]
    fn sibling_transition_stays_inside_parent() {
        let (exits, entries, active) = planned(Ev::Sibling);
        assert_eq!(exits, vec!["a1-exit"]);
        assert_eq!(entries, vec!["a1-Sibling", "a2-entry"]);
        assert_eq!(active, vec!["a", "a2", "top"]);
    }

    #[test]
    fn cousin_transition_exits_to_common_ancestor() {
        let (exits, entries, active) = planned(Ev::Across);
        assert_eq!(exits, vec!["a1-exit", "a-exit"]);
        assert_eq!(entries, vec!["a1-Across", "b-entry", "b1-entry"]);
        assert_eq!(active, vec!["b", "b1", "top"]);
    }

    #[test]
    fn external_to_descendant_reenters_source() {
        let (exits, entries, _) = planned(Ev::Down);
        assert_eq!(exits, vec!["a1-exit", "a-exit"]);
        assert_eq!(entries, vec!["a-Down", "a-entry", "a2-entry"]);
    }

    #[test]
    fn local_to_descendant_keeps_source() {
        let (exits, entries, active) = planned(Ev::DownLocal);
        assert_eq!(exits, vec!["a1-exit"]);
        assert_eq!(entries, vec!["a-DownLocal", "a2-entry"]);
        assert_eq!(active, vec!["a", "a2", "top"]);
    }

    #[test]
    fn external_to_ancestor_reenters_target() {
        let (exits, entries, _) = planned(Ev::Up);
        assert_eq!(exits, vec!["a1-exit", "a-exit"]);
        assert_eq!(entries, vec!["a1-Up", "a-entry", "a-Initial", "a1-entry"]);
    }

    #[test]
    fn local_to_ancestor_keeps_target() {
        let (exits, entries, active) = planned(Ev::UpLocal);
        assert_eq!(exits, vec!["a1-exit"]);
        assert_eq!(entries, vec!["a1-UpLocal", "a-Initial", "a1-entry"]);
        assert_eq!(active, vec!["a", "a1", "top"]);
    }

    #[test]
    fn internal_runs_only_the_action() {
        let (exits, entries, active) = planned(Ev::Stay);
        assert!(exits.is_empty());
        assert_eq!(entries, vec!["a1-Stay"]);
        assert_eq!(active, vec!["a", "a1", "top"]);
    }

    #[test]
    fn plan_invokes_nothing() {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().state("goal", logging("goal"))),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("goal"))
            .on(
                "goal",
                Ev::Loop,
                Transition::external("goal")
                    .with_action(Action::new("panic", |_, _: &mut Log| panic!("must not run"))),
            );
        let machine = Machine::build(states, transitions).unwrap();
        let log = Log::new();

        let start = plan_start(&machine, &log).unwrap();
        let looped = plan(&machine, &start.active, &Ev::Loop, &log).unwrap();

        assert_eq!(looped.entry_names(), vec!["goal-Loop", "goal-entry"]);
        assert!(log.is_empty());
    }

    // top ─── par ─┬─ par[0].l ─┬─ par[0].l1
    //              │            └─ par[0].l2
    //              └─ par[1].r ─┬─ par[1].r1
    //                           └─ par[1].r2
    fn parallel() -> Machine<Ev, Log> {
        let left = Region::new(
            States::new().state("l", StateSpec::composite(States::new().leaf("l1").leaf("l2"))),
            Transitions::new()
                .initial("l", Transition::external("l1"))
                .on("l1", Ev::Sibling, Transition::external("l2"))
                .on("l1", Ev::Stay, Transition::external("l2")),
        );
        let right = Region::new(
            States::new().state("r", StateSpec::composite(States::new().leaf("r1").leaf("r2"))),
            Transitions::new()
                .initial("r", Transition::external("r1"))
                .on("r1", Ev::Up, Transition::external("r2")),
        );
        let states = States::new().state(
            "top",
            StateSpec::composite(
                States::new()
                    .state("par", StateSpec::orthogonal(vec![left, right]))
                    .leaf("idle"),
            ),
        );
        let l1: Signature = "par[0].l1".parse().unwrap();
        let r1: Signature = "par[1].r1".parse().unwrap();
        let r2: Signature = "par[1].r2".parse().unwrap();
        let transitions = Transitions::new()
            .initial("top", Transition::external("par"))
            .on(l1.clone(), Ev::Across, Transition::external(r2.clone()))
            .on(l1, Ev::Up, Transition::external("idle"))
            .on(r1, Ev::Stay, Transition::external("idle"))
            .on("idle", Ev::Down, Transition::external(r2))
            .on("par", Ev::Reset, Transition::external("idle"));
        Machine::build(states, transitions).unwrap()
    }

    #[test]
    fn orthogonal_start_enters_every_region() {
        let machine = parallel();
        let start = plan_start(&machine, &Log::new()).unwrap();

        assert_eq!(
            active_names(&machine, &start.active),
            vec!["par", "par[0].l", "par[0].l1", "par[1].r", "par[1].r1", "top"]
        );
        assert_eq!(start.entry_names()[..3], ["top-entry", "top-Initial", "par-entry"]);
    }

    #[test]
    fn one_region_moves_alone() {
        let machine = parallel();
        let start = plan_start(&machine, &Log::new()).unwrap();

        let moved = plan(&machine, &start.active, &Ev::Sibling, &Log::new()).unwrap();

        assert_eq!(moved.exit_names(), vec!["par[0].l1-exit"]);
        assert_eq!(moved.entry_names(), vec!["par[0].l1-Sibling", "par[0].l2-entry"]);
        assert_eq!(
            active_names(&machine, &moved.active),
            vec!["par", "par[0].l", "par[0].l2", "par[1].r", "par[1].r1", "top"]
        );
    }

    #[test]
    fn cross_region_transition_reenters_orthogonal() {
        let machine = parallel();
        let start = plan_start(&machine, &Log::new()).unwrap();

        let crossed = plan(&machine, &start.active, &Ev::Across, &Log::new()).unwrap();

        let exits = crossed.exit_names();
        assert_eq!(exits.len(), 5);
        assert_eq!(exits.last(), Some(&"par-exit"));
        let entries = crossed.entry_names();
        assert_eq!(entries[..2], ["par[0].l1-Across", "par-entry"]);
        assert!(entries.contains(&"par[0].l-Initial"));
        assert_eq!(entries.last(), Some(&"par[1].r2-entry"));
        assert!(!entries.contains(&"par[1].r-Initial"));
        assert_eq!(
            active_names(&machine, &crossed.active),
            vec!["par", "par[0].l", "par[0].l1", "par[1].r", "par[1].r2", "top"]
        );
    }

    #[test]
    fn response_inside_an_exited_orthogonal_state_is_dropped() {
        let machine = parallel();
        let start = plan_start(&machine, &Log::new()).unwrap();

        // Up: region 0 leaves `par`, region 1 would move r1 -> r2.
        // Stay: region 0 would move l1 -> l2, region 1 leaves `par`.
        for (event, action) in [(Ev::Up, "par[0].l1-Up"), (Ev::Stay, "par[1].r1-Stay")] {
            let left = plan(&machine, &start.active, &event, &Log::new()).unwrap();

            assert_eq!(active_names(&machine, &left.active), vec!["idle", "top"]);
            assert_eq!(left.exit_names().len(), 5);
            assert_eq!(left.exit_names().last(), Some(&"par-exit"));
            assert_eq!(left.entry_names(), vec![action, "idle-entry"]);
        }
    }

    #[test]
    fn entering_deep_region_state_fills_other_regions() {
        let machine = parallel();
        let start = plan_start(&machine, &Log::new()).unwrap();
        let idle = plan(&machine, &start.active, &Ev::Reset, &Log::new()).unwrap();
        assert_eq!(active_names(&machine, &idle.active), vec!["idle", "top"]);

        let down = plan(&machine, &idle.active, &Ev::Down, &Log::new()).unwrap();

        assert_eq!(down.exit_names(), vec!["idle-exit"]);
        assert_eq!(
            active_names(&machine, &down.active),
            vec!["par", "par[0].l", "par[0].l1", "par[1].r", "par[1].r2", "top"]
        );
    }

    #[test]
    fn initial_choice_observes_earlier_actions() {
        // The action on `top`'s Go transition writes the log; `next`'s initial
        // choice keys on it while the same sequence is running.
        let states = States::new().state(
            "top",
            StateSpec::composite(
                States::new()
                    .leaf("idle")
                    .state("next", StateSpec::composite(States::new().leaf("fast").leaf("slow"))),
            ),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("idle"))
            .on(
                "idle",
                Ev::Down,
                Transition::external("next")
                    .with_action(Action::new("mark", |_, log: &mut Log| log.push("fast".into()))),
            )
            .initial(
                "next",
                Transition::choice([("fast", "fast")])
                    .with_default("slow")
                    .with_key(KeyFn::new(|_, log: &Log| log.last().cloned().unwrap_or_default())),
            );
        let machine = Machine::build(states, transitions).unwrap();

        let planned_start = plan_start(&machine, &Log::new()).unwrap();
        let planned = plan(&machine, &planned_start.active, &Ev::Down, &Log::new()).unwrap();
        assert_eq!(planned.entry_names().last(), Some(&"slow-entry"));

        let mut log = Log::new();
        let (start, _) = run_start(&machine, &mut log);
        let (ran, result) = run(&machine, &start.active, &Ev::Down, &mut log);
        result.unwrap();
        assert_eq!(ran.entry_names().last(), Some(&"fast-entry"));
    }

    #[test]
    fn entry_sequence_of_leaf_is_single_step() {
        let machine = door();
        let closed = machine.state(&Signature::local("closed")).unwrap();

        let steps = entry_sequence(&machine, closed, None, &Log::new()).unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind, StepKind::Enter(closed));
    }

    #[test]
    fn missing_initial_is_reported_at_runtime() {
        let states = States::new().state("top", StateSpec::composite(States::new().leaf("a")));
        let machine: Machine<Ev, Log> = Machine::build(states, Transitions::new()).unwrap();

        let err = plan_start(&machine, &Log::new()).unwrap_err();
        assert_eq!(
            err,
            SequenceError::MissingInitial {
                state: "top".into()
            }
        );
    }

    #[test]
    fn initial_self_target_is_reported_instead_of_looping() {
        let states = States::new().state("top", StateSpec::composite(States::new().leaf("a")));
        let transitions = Transitions::new().initial("top", Transition::external("top"));
        let machine: Machine<Ev, Log> = Machine::build(states, transitions).unwrap();

        let err = plan_start(&machine, &Log::new()).unwrap_err();
        assert!(matches!(err, SequenceError::InitialNotDescendant { .. }));
    }

    #[test]
    fn failed_run_keeps_executed_steps() {
        let states = States::new().state(
            "top",
            StateSpec::composite(States::new().leaf("a").state("b", StateSpec::composite(States::new().leaf("b1")))),
        );
        let transitions = Transitions::new()
            .initial("top", Transition::external("a"))
            .on("a", Ev::Across, Transition::external("b"));
        let machine: Machine<Ev, Log> = Machine::build(states, transitions).unwrap();

        let mut log = Log::new();
        let (start, _) = run_start(&machine, &mut log);
        let (partial, result) = run(&machine, &start.active, &Ev::Across, &mut log);

        assert!(matches!(result, Err(SequenceError::MissingInitial { .. })));
        assert_eq!(partial.exit_names(), vec!["a-exit"]);
        assert_eq!(partial.entry_names(), vec!["a-Across", "b-entry"]);
    }
}
