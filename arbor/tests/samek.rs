//! Conformance tests for the blocking flavor against the classic Samek
//! statechart: root `s0` with children `s1` and `s2`, `s1` holding `s11`,
//! `s2` holding `s21` which holds `s211`, driven by the event alphabet
//! `a..h`. The guard flag `foo` is set by the `h` handler on `s21` and
//! cleared by `s11`'s exit action.

use arbor::blocking::{Chart, ChartBuilder, Machine};
use arbor::prelude::*;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum SamekEvent {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl arbor::Event for SamekEvent {
    type Tag = SamekEvent;

    fn tag(&self) -> SamekEvent {
        *self
    }
}

const ALPHABET: [SamekEvent; 8] = [
    SamekEvent::A,
    SamekEvent::B,
    SamekEvent::C,
    SamekEvent::D,
    SamekEvent::E,
    SamekEvent::F,
    SamekEvent::G,
    SamekEvent::H,
];

#[derive(Default)]
struct Samek {
    foo: u8,
    calls: Vec<String>,
}

impl Samek {
    fn with_foo(foo: u8) -> Self {
        Self {
            foo,
            calls: Vec::new(),
        }
    }

    fn record(&mut self, call: &str) {
        self.calls.push(call.to_owned());
    }
}

struct Fixture {
    chart: Chart<SamekEvent, Samek>,
    s0: StateId,
    s1: StateId,
    s11: StateId,
    s2: StateId,
    s21: StateId,
    s211: StateId,
}

fn samek() -> Fixture {
    let mut builder = ChartBuilder::<SamekEvent, Samek>::new(ALPHABET);

    let s0 = builder.state("s0");
    let s1 = builder.state("s1");
    let s11 = builder.state("s11");
    let s2 = builder.state("s2");
    let s21 = builder.state("s21");
    let s211 = builder.state("s211");

    builder.nest(s0, s1);
    builder.nest(s1, s11);
    builder.nest(s0, s2);
    builder.nest(s2, s21);
    builder.nest(s21, s211);

    builder.entry(s0, move |samek| {
        samek.record("s0:entry");
        s1
    });
    builder.exit(s0, |samek| samek.record("s0:exit"));
    builder.on(s0, SamekEvent::E, move |_, samek| {
        samek.record("s0:run:e");
        Transition(s211)
    });

    builder.entry(s1, move |samek| {
        samek.record("s1:entry");
        s11
    });
    builder.exit(s1, |samek| samek.record("s1:exit"));
    builder.on(s1, SamekEvent::A, |_, samek: &mut Samek| {
        samek.record("s1:run:a");
        SelfTransition
    });
    builder.on(s1, SamekEvent::B, move |_, samek| {
        samek.record("s1:run:b");
        Transition(s11)
    });
    builder.on(s1, SamekEvent::C, move |_, samek| {
        samek.record("s1:run:c");
        Transition(s2)
    });
    builder.on(s1, SamekEvent::D, move |_, samek| {
        samek.record("s1:run:d");
        Transition(s0)
    });
    builder.on(s1, SamekEvent::F, move |_, samek| {
        samek.record("s1:run:f");
        Transition(s211)
    });

    builder.entry(s11, move |samek| {
        samek.record("s11:entry");
        s11
    });
    builder.exit(s11, |samek| {
        if samek.foo == 1 {
            samek.foo = 0;
        }
        samek.record("s11:exit");
    });
    builder.on(s11, SamekEvent::G, move |_, samek| {
        samek.record("s11:run:g");
        Transition(s211)
    });

    builder.entry(s2, move |samek| {
        samek.record("s2:entry");
        s21
    });
    builder.exit(s2, |samek| samek.record("s2:exit"));
    builder.on(s2, SamekEvent::C, move |_, samek| {
        samek.record("s2:run:c");
        Transition(s1)
    });
    builder.on(s2, SamekEvent::F, move |_, samek| {
        samek.record("s2:run:f");
        Transition(s11)
    });

    builder.entry(s21, move |samek| {
        samek.record("s21:entry");
        s211
    });
    builder.exit(s21, |samek| samek.record("s21:exit"));
    builder.on(s21, SamekEvent::B, move |_, samek| {
        samek.record("s21:run:b");
        Transition(s211)
    });
    builder.on(s21, SamekEvent::H, |_, samek: &mut Samek| {
        samek.record("s21:run:h");
        if samek.foo == 0 {
            samek.foo = 1;
            SelfTransition
        } else {
            NoTransition
        }
    });

    builder.entry(s211, move |samek| {
        samek.record("s211:entry");
        s211
    });
    builder.exit(s211, |samek| samek.record("s211:exit"));
    builder.on(s211, SamekEvent::D, move |_, samek| {
        samek.record("s211:run:d");
        Transition(s21)
    });
    builder.on(s211, SamekEvent::G, move |_, samek| {
        samek.record("s211:run:g");
        Transition(s0)
    });

    let chart = builder.finish().expect("samek chart builds");
    Fixture {
        chart,
        s0,
        s1,
        s11,
        s2,
        s21,
        s211,
    }
}

fn dispatch_from(
    fixture: &Fixture,
    from: StateId,
    event: SamekEvent,
    foo: u8,
) -> (StateId, Samek) {
    let mut samek = Samek::with_foo(foo);
    let leaf = fixture
        .chart
        .dispatch(from, &event, &mut samek)
        .expect("dispatch succeeds");
    (leaf, samek)
}

#[test]
fn initial_entries_descend_to_the_initial_leaf() {
    let fixture = samek();
    let mut samek = Samek::default();

    let leaf = fixture
        .chart
        .initial_entries(fixture.s0, &mut samek)
        .unwrap();

    assert_eq!(leaf, fixture.s11);
    assert_eq!(samek.calls, ["s0:entry", "s1:entry", "s11:entry"]);
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn a_at_s11_self_transitions_on_s1(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::A, foo);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(samek.foo, 0);
    assert_eq!(
        samek.calls,
        ["s1:run:a", "s11:exit", "s1:exit", "s1:entry", "s11:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn b_at_s11_re_enters_the_leaf(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::B, foo);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(samek.foo, 0);
    assert_eq!(samek.calls, ["s1:run:b", "s11:exit", "s11:entry"]);
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn c_at_s11_crosses_to_the_s2_subtree(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::C, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 0);
    assert_eq!(
        samek.calls,
        ["s1:run:c", "s11:exit", "s1:exit", "s2:entry", "s21:entry", "s211:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn d_at_s11_exits_to_the_root_without_entries(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::D, foo);

    assert_eq!(leaf, fixture.s0);
    assert_eq!(samek.foo, 0);
    assert_eq!(samek.calls, ["s1:run:d", "s11:exit", "s1:exit"]);
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn e_at_s11_is_claimed_by_the_root(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::E, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 0);
    assert_eq!(
        samek.calls,
        ["s0:run:e", "s11:exit", "s1:exit", "s2:entry", "s21:entry", "s211:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn f_at_s11_targets_the_deep_leaf(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::F, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 0);
    assert_eq!(
        samek.calls,
        ["s1:run:f", "s11:exit", "s1:exit", "s2:entry", "s21:entry", "s211:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn g_at_s11_is_handled_by_the_leaf_itself(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::G, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 0);
    assert_eq!(
        samek.calls,
        ["s11:run:g", "s11:exit", "s1:exit", "s2:entry", "s21:entry", "s211:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn h_at_s11_is_unhandled(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s11, SamekEvent::H, foo);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(samek.foo, foo);
    assert!(samek.calls.is_empty());
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn a_at_s211_is_unhandled(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::A, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, foo);
    assert!(samek.calls.is_empty());
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn b_at_s211_re_enters_the_leaf_from_s21(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::B, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, foo);
    assert_eq!(samek.calls, ["s21:run:b", "s211:exit", "s211:entry"]);
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn c_at_s211_crosses_to_the_s1_subtree(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::C, foo);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(samek.foo, foo);
    assert_eq!(
        samek.calls,
        ["s2:run:c", "s211:exit", "s21:exit", "s2:exit", "s1:entry", "s11:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn d_at_s211_exits_to_its_parent(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::D, foo);

    assert_eq!(leaf, fixture.s21);
    assert_eq!(samek.foo, foo);
    assert_eq!(samek.calls, ["s211:run:d", "s211:exit"]);
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn e_at_s211_re_enters_the_s2_subtree(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::E, foo);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, foo);
    assert_eq!(
        samek.calls,
        ["s0:run:e", "s211:exit", "s21:exit", "s2:exit", "s2:entry", "s21:entry", "s211:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn f_at_s211_crosses_to_s11(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::F, foo);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(samek.foo, foo);
    assert_eq!(
        samek.calls,
        ["s2:run:f", "s211:exit", "s21:exit", "s2:exit", "s1:entry", "s11:entry"]
    );
}

#[yare::parameterized(flag_clear = { 0 }, flag_set = { 1 })]
fn g_at_s211_exits_to_the_root_without_entries(foo: u8) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::G, foo);

    assert_eq!(leaf, fixture.s0);
    assert_eq!(samek.foo, foo);
    assert_eq!(samek.calls, ["s211:run:g", "s211:exit", "s21:exit", "s2:exit"]);
}

#[test]
fn h_at_s211_with_flag_clear_self_transitions_on_s21() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::H, 0);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 1);
    assert_eq!(
        samek.calls,
        ["s21:run:h", "s211:exit", "s21:exit", "s21:entry", "s211:entry"]
    );
}

#[test]
fn h_at_s211_with_flag_set_is_consumed() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s211, SamekEvent::H, 1);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 1);
    assert_eq!(samek.calls, ["s21:run:h"]);
}

#[test]
fn b_at_s21_enters_the_initial_leaf_without_exits() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s21, SamekEvent::B, 0);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.calls, ["s21:run:b", "s211:entry"]);
}

#[test]
fn c_at_s21_crosses_to_the_s1_subtree() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s21, SamekEvent::C, 0);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(
        samek.calls,
        ["s2:run:c", "s21:exit", "s2:exit", "s1:entry", "s11:entry"]
    );
}

#[test]
fn e_at_s21_re_enters_the_s2_subtree() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s21, SamekEvent::E, 0);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(
        samek.calls,
        ["s0:run:e", "s21:exit", "s2:exit", "s2:entry", "s21:entry", "s211:entry"]
    );
}

#[test]
fn f_at_s21_crosses_to_s11() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s21, SamekEvent::F, 0);

    assert_eq!(leaf, fixture.s11);
    assert_eq!(
        samek.calls,
        ["s2:run:f", "s21:exit", "s2:exit", "s1:entry", "s11:entry"]
    );
}

#[test]
fn h_at_s21_with_flag_clear_self_transitions() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s21, SamekEvent::H, 0);

    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 1);
    assert_eq!(samek.calls, ["s21:run:h", "s21:exit", "s21:entry", "s211:entry"]);
}

#[test]
fn h_at_s21_with_flag_set_is_consumed() {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s21, SamekEvent::H, 1);

    assert_eq!(leaf, fixture.s21);
    assert_eq!(samek.foo, 1);
    assert_eq!(samek.calls, ["s21:run:h"]);
}

#[yare::parameterized(
    a = { SamekEvent::A },
    b = { SamekEvent::B },
    c = { SamekEvent::C },
    d = { SamekEvent::D },
    f = { SamekEvent::F },
    g = { SamekEvent::G },
    h = { SamekEvent::H }
)]
fn everything_but_e_is_ignored_at_s0(event: SamekEvent) {
    let fixture = samek();

    let (leaf, samek) = dispatch_from(&fixture, fixture.s0, event, 0);

    assert_eq!(leaf, fixture.s0);
    assert_eq!(samek.foo, 0);
    assert!(samek.calls.is_empty());
}

#[test]
fn topology_reflects_the_declared_nesting() {
    let fixture = samek();
    let topology = fixture.chart.topology();

    assert_eq!(topology.parent(fixture.s0), None);
    assert_eq!(topology.parent(fixture.s11), Some(fixture.s1));
    assert_eq!(topology.parent(fixture.s21), Some(fixture.s2));
    assert_eq!(topology.children(fixture.s0), &[fixture.s1, fixture.s2]);
    assert_eq!(
        topology.path_to_root(fixture.s211),
        vec![fixture.s211, fixture.s21, fixture.s2, fixture.s0]
    );

    let lca = topology
        .lca(
            &topology.path_to_root(fixture.s211),
            &topology.path_to_root(fixture.s11),
        )
        .unwrap();
    assert_eq!(lca, fixture.s0);
}

#[test]
fn machine_runs_the_full_journey() {
    let fixture = samek();
    let mut samek = Samek::default();
    let mut machine = Machine::new(&fixture.chart, fixture.s0);

    assert_eq!(machine.current(), None);
    assert_eq!(machine.init(&mut samek).unwrap(), fixture.s11);

    let leaf = machine.handle(&SamekEvent::B, &mut samek).unwrap();
    assert_eq!(leaf, fixture.s11);

    let leaf = machine.handle(&SamekEvent::G, &mut samek).unwrap();
    assert_eq!(leaf, fixture.s211);

    let leaf = machine.handle(&SamekEvent::H, &mut samek).unwrap();
    assert_eq!(leaf, fixture.s211);
    assert_eq!(samek.foo, 1);

    let leaf = machine.handle(&SamekEvent::G, &mut samek).unwrap();
    assert_eq!(leaf, fixture.s0);

    let leaf = machine.handle(&SamekEvent::G, &mut samek).unwrap();
    assert_eq!(leaf, fixture.s0);
    assert_eq!(samek.foo, 1);
    assert_eq!(machine.current(), Some(fixture.s0));
}
