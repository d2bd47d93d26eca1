use super::*;
use crate::config::tests::sample as sample_config;
use crate::error::CancelReason;
use crate::validation::ValidationState;

const STATUSES: [Option<Status>; 5] = [
    None,
    Some(Status::Passed),
    Some(Status::Skipped),
    Some(Status::Canceled),
    Some(Status::Failed),
];

fn step(name: &str, status: Status, duration: f64) -> Step {
    Step {
        name: name.to_string(),
        status: Some(status),
        duration,
        items: Vec::new(),
    }
}

fn expected_aggregate(statuses: &[Option<Status>]) -> Status {
    if statuses.contains(&Some(Status::Failed)) {
        Status::Failed
    } else if statuses.contains(&Some(Status::Canceled)) {
        Status::Canceled
    } else {
        Status::Passed
    }
}

#[test]
fn aggregate_follows_precedence_for_all_three_child_sequences() {
    for a in STATUSES {
        for b in STATUSES {
            for c in STATUSES {
                let children = [a, b, c];
                assert_eq!(
                    Status::aggregate(children),
                    expected_aggregate(&children),
                    "children {children:?}"
                );
            }
        }
    }
}

#[test]
fn aggregate_ignores_child_order() {
    let mut children = vec![
        Some(Status::Passed),
        Some(Status::Canceled),
        Some(Status::Skipped),
        Some(Status::Failed),
        Some(Status::Passed),
    ];
    let expected = Status::aggregate(children.clone());
    for _ in 0..children.len() {
        children.rotate_left(1);
        assert_eq!(Status::aggregate(children.clone()), expected);
    }
    children.reverse();
    assert_eq!(Status::aggregate(children), Status::Failed);
}

#[test]
fn aggregate_of_no_children_is_passed() {
    assert_eq!(Status::aggregate(Vec::new()), Status::Passed);
    assert_eq!(StepTimer::start("empty").finish(Vec::new()).status, Some(Status::Passed));
}

#[test]
fn timer_fail_distinguishes_cancellation() {
    let canceled = StepTimer::start("gather data").fail(&Error::Canceled(CancelReason::DeadlineExceeded));
    assert_eq!(canceled.status, Some(Status::Canceled));

    let failed = StepTimer::start("gather data").fail(&Error::not_found("drpc", "app"));
    assert_eq!(failed.status, Some(Status::Failed));
    assert!(failed.duration >= 0.0);
}

#[test]
fn timer_finish_keeps_children_in_insertion_order() {
    let parent = StepTimer::start("validate application").finish(vec![
        step("inspect application", Status::Passed, 0.1),
        step("gather \"hub\"", Status::Passed, 1.0),
        step("gather \"dr1\"", Status::Failed, 2.0),
        step("gather \"dr2\"", Status::Passed, 1.5),
    ]);
    assert_eq!(parent.status, Some(Status::Failed));
    let names = parent.items.iter().map(|item| item.name.as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["inspect application", "gather \"hub\"", "gather \"dr1\"", "gather \"dr2\""]
    );
}

#[test]
fn add_step_tracks_status_and_duration() {
    let mut report = Report::new("validate-application", sample_config());
    assert!(report.status.is_none());

    assert!(report.add_step(step("validate config", Status::Passed, 0.5)));
    assert!(report.is_passed());
    assert!(!report.add_step(step("validate application", Status::Failed, 1.5)));
    assert_eq!(report.status, Some(Status::Failed));
    assert_eq!(report.duration, 2.0);
    assert_eq!(report.steps.len(), 2);
}

#[test]
fn failed_report_is_not_downgraded_by_later_canceled_step() {
    let mut report = Report::new("test-run", sample_config());
    report.add_step(step("validate config", Status::Failed, 0.1));
    report.add_step(step("tests", Status::Canceled, 0.1));
    report.add_step(step("cleanup", Status::Passed, 0.1));
    assert_eq!(report.status, Some(Status::Failed));
}

#[test]
fn canceled_report_becomes_failed_after_failure() {
    let mut report = Report::new("test-run", sample_config());
    report.add_step(step("tests", Status::Canceled, 0.1));
    assert_eq!(report.status, Some(Status::Canceled));
    report.add_step(step("gather data", Status::Failed, 0.1));
    assert_eq!(report.status, Some(Status::Failed));
}

#[test]
fn summary_counts_each_key() {
    let mut summary = Summary::default();
    summary.add(ValidationState::Ok);
    summary.add(ValidationState::Ok);
    summary.add(ValidationState::Problem);
    summary.add(Status::Passed);
    assert_eq!(summary.count(ValidationState::Ok), 2);
    assert_eq!(summary.count(ValidationState::Problem), 1);
    assert_eq!(summary.count(ValidationState::Stale), 0);
    assert_eq!(summary.count(Status::Passed), 1);
}

fn round_trip(report: &Report) {
    let yaml = serde_yaml::to_string(report).expect("serialize report");
    let parsed: Report = serde_yaml::from_str(&yaml).expect("parse report");
    assert_eq!(&parsed, report, "yaml:\n{yaml}");
}

#[test]
fn yaml_round_trip_without_steps() {
    round_trip(&Report::new("validate-clusters", sample_config()));
}

#[test]
fn yaml_round_trip_with_one_step() {
    let mut report = Report::new("gather-application", sample_config());
    report.add_step(step("validate config", Status::Passed, 0.123));
    round_trip(&report);
}

#[test]
fn yaml_round_trip_with_nested_steps_application_and_summary() {
    let mut report = Report::new("validate-application", sample_config());
    report.application = Some(Application {
        name: "busybox-drpc".to_string(),
        namespace: "busybox".to_string(),
    });
    report.namespaces = Some(vec!["busybox".to_string(), "ramen-system".to_string()]);
    report.add_step(step("validate config", Status::Passed, 0.1));
    report.add_step(Step {
        name: "validate application".to_string(),
        status: Some(Status::Canceled),
        duration: 0.2,
        items: vec![
            step("inspect application", Status::Passed, 0.05),
            step("gather \"hub\"", Status::Canceled, 0.15),
            Step {
                name: "validate data".to_string(),
                status: None,
                duration: 0.0,
                items: Vec::new(),
            },
        ],
    });
    let summary = report.summary_mut();
    summary.add(ValidationState::Ok);
    summary.add(ValidationState::Stale);
    round_trip(&report);
}

#[test]
fn write_creates_yaml_and_html() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut report = Report::new("validate-clusters", sample_config());
    report.add_step(step("validate config", Status::Passed, 0.1));

    let paths = report.write(dir.path()).expect("write report");
    assert_eq!(paths.len(), 2);
    let yaml = std::fs::read_to_string(&paths[0]).expect("read yaml");
    let parsed: Report = serde_yaml::from_str(&yaml).expect("parse yaml");
    assert_eq!(parsed, report);
    let html = std::fs::read_to_string(&paths[1]).expect("read html");
    assert!(html.contains("validate config"));
    assert!(html.contains("class=\"passed\""));
}
