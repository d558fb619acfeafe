use assert_approx_eq::assert_approx_eq;

use crate::constraint::{ConstraintError, LatencyHistory, HISTORY_DEPTH};
use crate::extension::standard::AnalysisResult;
use crate::model::ident::ElemId;
use crate::model::Application;
use crate::tests::{chain_app, link_id, task_id};
use crate::time::Latency;

fn constrained_chain(n: u32) -> (Application, String) {
    let mut app = chain_app(0, n);
    app.declare_constraint(task_id(0, 0), task_id(0, n - 1), 100.0)
        .unwrap();
    app.resolve_constraint_paths();
    app.create_element_constraints();
    let path = app
        .constraint(task_id(0, 0), task_id(0, n - 1))
        .unwrap()
        .paths()
        .next()
        .unwrap()
        .name()
        .to_string();
    (app, path)
}

#[test]
fn declared_constraints_start_without_paths() {
    let mut app = chain_app(0, 3);
    app.declare_constraint(task_id(0, 0), task_id(0, 2), 50.0)
        .unwrap();
    let c = app.constraint(task_id(0, 0), task_id(0, 2)).unwrap();
    assert_eq!(c.paths().count(), 0);
    assert_eq!(c.latency(), None);
    assert_eq!(c.violation(), None);
    assert!(!c.violated());
}

#[test]
fn paths_alternate_tasks_and_links() {
    let (app, path) = constrained_chain(3);
    let c = app.constraint(task_id(0, 0), task_id(0, 2)).unwrap();
    let p = c.path(&path).unwrap();

    let expected: Vec<ElemId> = vec![
        task_id(0, 0).into(),
        link_id(0, 0, 0, 1).into(),
        task_id(0, 1).into(),
        link_id(0, 1, 1, 2).into(),
        task_id(0, 2).into(),
    ];
    assert_eq!(p.elements(), expected.as_slice());
    // wcets: tasks 2 + 3 + 4, links 1 + 1
    assert_eq!(p.sum_wcets(), 11);
}

#[test]
fn element_constraints_match_the_path() {
    let (app, path) = constrained_chain(3);
    let p = app
        .constraint(task_id(0, 0), task_id(0, 2))
        .unwrap()
        .path(&path)
        .unwrap();

    assert_eq!(p.element_constraints().len(), p.elements().len());
    let first = p.element_constraints().first().unwrap();
    let last = p.element_constraints().last().unwrap();
    assert_eq!(first.predecessor(), None);
    assert_eq!(first.successor(), Some(link_id(0, 0, 0, 1).into()));
    assert_eq!(last.successor(), None);
    assert_eq!(last.predecessor(), Some(link_id(0, 1, 1, 2).into()));
}

#[test]
fn recording_before_element_constraints_is_an_error() {
    let mut app = chain_app(0, 2);
    app.declare_constraint(task_id(0, 0), task_id(0, 1), 50.0)
        .unwrap();
    app.resolve_constraint_paths();
    let c = app.constraint_mut(task_id(0, 0), task_id(0, 1)).unwrap();
    let path = c.paths().next().unwrap().name().to_string();
    assert!(matches!(
        c.record_latency(&path, 10.0),
        Err(ConstraintError::ElementConstraintsMissing(_))
    ));
}

#[test]
fn recording_against_an_unknown_path_is_an_error() {
    let (mut app, _) = constrained_chain(2);
    let c = app.constraint_mut(task_id(0, 0), task_id(0, 1)).unwrap();
    assert!(matches!(
        c.record_latency("no-such-path", 10.0),
        Err(ConstraintError::UnknownPath(_))
    ));
}

#[test]
fn recorded_latency_propagates_to_the_path_start() {
    let (mut app, path) = constrained_chain(4);
    let c = app.constraint_mut(task_id(0, 0), task_id(0, 3)).unwrap();
    c.record_latency(&path, 64.0).unwrap();

    let p = c.path(&path).unwrap();
    assert_eq!(p.latency(), Some(64.0));
    for ec in p.element_constraints() {
        assert_eq!(ec.history().latest(), 64.0);
    }
}

#[test]
fn violation_state_follows_the_latest_value() {
    let (mut app, path) = constrained_chain(2);
    let c = app.constraint_mut(task_id(0, 0), task_id(0, 1)).unwrap();

    c.record_latency(&path, 120.0).unwrap();
    assert!(c.violated());
    assert_eq!(c.violation(), Some(20.0));

    c.record_latency(&path, 80.0).unwrap();
    assert!(!c.violated());
    assert_eq!(c.violation(), Some(-20.0));
}

#[test]
fn propagation_is_idempotent() {
    let (mut app, path) = constrained_chain(3);
    let c = app.constraint_mut(task_id(0, 0), task_id(0, 2)).unwrap();

    c.record_latency(&path, 120.0).unwrap();
    let violated = c.violated();
    let violation = c.violation();
    c.record_latency(&path, 120.0).unwrap();
    assert_eq!(c.violated(), violated);
    assert_eq!(c.violation(), violation);
}

#[test]
fn history_is_bounded_and_fifo() {
    let mut history = LatencyHistory::new();
    assert_eq!(history.capacity(), HISTORY_DEPTH + 1);

    for v in 1..=(HISTORY_DEPTH as u64 + 2) {
        history.record(v as Latency);
    }
    // depth+2 values recorded into depth+1 slots: the first one is gone
    assert_eq!(history.latest(), (HISTORY_DEPTH + 2) as Latency);
    assert_eq!(history.get(HISTORY_DEPTH).unwrap(), 2.0);
}

#[test]
fn history_beyond_the_depth_is_an_error() {
    let history = LatencyHistory::new();
    assert_eq!(history.get(HISTORY_DEPTH).unwrap(), Latency::INFINITY);
    assert_eq!(
        history.get(HISTORY_DEPTH + 1),
        Err(ConstraintError::HistoryOutOfRange {
            index: HISTORY_DEPTH + 1,
            depth: HISTORY_DEPTH,
        })
    );
}

#[test]
fn unmeasured_history_slots_are_infinite() {
    let mut history = LatencyHistory::new();
    history.record(5.0);
    assert_eq!(history.get(0).unwrap(), 5.0);
    assert_eq!(history.get(1).unwrap(), 0.0);
    assert_eq!(history.get(2).unwrap(), Latency::INFINITY);
}

#[test]
fn slack_percentage_tracks_the_history() {
    let (mut app, path) = constrained_chain(2);
    let elem: ElemId = task_id(0, 1).into();
    app.task_mut(task_id(0, 1))
        .unwrap()
        .extensions
        .attach(AnalysisResult::new(2, 30, 100, 0, 0), AnalysisResult::ATTACH);

    app.constraint_mut(task_id(0, 0), task_id(0, 1))
        .unwrap()
        .record_latency(&path, 90.0)
        .unwrap();

    // (response time - path latency) / bound = (30 - 90) / 100
    let slack = app
        .slack_percentage(task_id(0, 0), task_id(0, 1), &path, elem, 0)
        .unwrap();
    assert_approx_eq!(slack, -0.6);

    // one step back in history the path was unmeasured
    let previous = app
        .slack_percentage(task_id(0, 0), task_id(0, 1), &path, elem, 1)
        .unwrap();
    assert_approx_eq!(previous, 0.3);
}

#[test]
fn slack_needs_an_analysis_result() {
    let (app, path) = constrained_chain(2);
    let elem: ElemId = task_id(0, 1).into();
    assert_eq!(
        app.slack_percentage(task_id(0, 0), task_id(0, 1), &path, elem, 0),
        Err(ConstraintError::MissingAnalysisResult(elem))
    );
}

#[test]
fn tighten_pulls_bounds_down_to_the_achieved_latency() {
    let (mut app, path) = constrained_chain(2);
    app.constraint_mut(task_id(0, 0), task_id(0, 1))
        .unwrap()
        .record_latency(&path, 60.0)
        .unwrap();

    assert!(app.tighten_constraints());
    assert_eq!(
        app.constraint(task_id(0, 0), task_id(0, 1)).unwrap().bound(),
        60.0
    );

    // a second pass has nothing left to tighten
    assert!(!app.tighten_constraints());

    // a later, worse measurement never loosens the bound
    app.constraint_mut(task_id(0, 0), task_id(0, 1))
        .unwrap()
        .record_latency(&path, 75.0)
        .unwrap();
    assert!(!app.tighten_constraints());
    assert_eq!(
        app.constraint(task_id(0, 0), task_id(0, 1)).unwrap().bound(),
        60.0
    );
}

#[test]
fn redeclaring_resets_the_life_cycle() {
    let (mut app, path) = constrained_chain(2);
    app.constraint_mut(task_id(0, 0), task_id(0, 1))
        .unwrap()
        .record_latency(&path, 120.0)
        .unwrap();
    assert!(app.constraint(task_id(0, 0), task_id(0, 1)).unwrap().violated());

    // re-resolving paths discards measurement state
    app.resolve_constraint_paths();
    let c = app.constraint(task_id(0, 0), task_id(0, 1)).unwrap();
    assert_eq!(c.latency(), None);
    assert!(!c.violated());
    assert!(c.path(&path).unwrap().element_constraints().is_empty());
}

#[test]
fn constraints_against_unknown_tasks_are_rejected() {
    let mut app = chain_app(0, 2);
    assert!(app
        .declare_constraint(task_id(0, 0), task_id(0, 9), 10.0)
        .is_err());
}

#[test]
fn zero_path_constraints_are_legal() {
    // two disconnected tasks: declaring is fine, resolution finds nothing
    let mut app = chain_app(0, 2);
    app.add_task(crate::model::Task::new(task_id(0, 5))).unwrap();
    app.declare_constraint(task_id(0, 0), task_id(0, 5), 10.0)
        .unwrap();
    app.resolve_constraint_paths();
    app.create_element_constraints();
    let c = app.constraint(task_id(0, 0), task_id(0, 5)).unwrap();
    assert_eq!(c.paths().count(), 0);
}
