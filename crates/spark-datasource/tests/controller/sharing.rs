use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use spark_datasource::{
    DataSource, EmptyController, Pipeline, SharedController, Stage, StageType,
};

use crate::support::inventory;

fn typed(upstream: Arc<dyn DataSource>, stage_type: &'static str) -> Stage {
    Stage::builder()
        .stage_type(stage_type)
        .upstream(upstream)
        .build()
}

/// 共享计数器，模拟同类型阶段之间协调的状态。
#[derive(Debug, Default)]
struct FilterState {
    revision: AtomicUsize,
}

#[test]
fn same_type_stages_share_one_controller_across_a_foreign_stage() {
    let a: Arc<dyn DataSource> = Arc::new(typed(inventory().into_shared(), "filter"));
    let b: Arc<dyn DataSource> = Arc::new(typed(Arc::clone(&a), "sorter"));
    let c = typed(Arc::clone(&b), "filter");

    let a_controller = a.get_controller("filter").expect("a is typed");
    let c_controller = c.get_controller("filter").expect("c is typed");
    assert!(a_controller.ptr_eq(&c_controller));

    let b_controller = b.stage().controller().expect("b is typed");
    assert!(!b_controller.ptr_eq(&a_controller));
    assert!(a_controller.downcast_ref::<EmptyController>().is_some());
}

#[test]
fn untyped_middle_stage_has_no_controller() {
    let a: Arc<dyn DataSource> = Arc::new(typed(inventory().into_shared(), "filter"));
    let b = Stage::wrapping(Arc::clone(&a));

    assert!(b.stage().controller().is_none());
    assert!(
        b.get_controller("filter")
            .is_some_and(|controller| controller.ptr_eq(&a.stage().controller().expect("typed")))
    );
}

#[test]
fn assignment_from_the_tail_reaches_upstream_stages() {
    let a: Arc<dyn DataSource> = Arc::new(typed(inventory().into_shared(), "filter"));
    let b: Arc<dyn DataSource> = Arc::new(Stage::wrapping(Arc::clone(&a)));
    let c = typed(Arc::clone(&b), "filter");

    let state = SharedController::new(FilterState::default());
    let assigned = c
        .set_controller("filter", Some(state.clone()))
        .expect("filter stages present");

    assert!(assigned.ptr_eq(&state));
    assert!(a.get_controller("filter").is_some_and(|got| got.ptr_eq(&state)));
    assert!(c.get_controller("filter").is_some_and(|got| got.ptr_eq(&state)));
}

#[test]
fn assignment_from_the_head_reaches_downstream_stages() {
    let a: Arc<dyn DataSource> = Arc::new(typed(inventory().into_shared(), "filter"));
    let c = typed(Arc::new(Stage::wrapping(Arc::clone(&a))), "filter");

    let state = SharedController::new(FilterState::default());
    a.set_controller("filter", Some(state.clone()));
    let seen = c.get_controller("filter").expect("c is typed");
    assert!(seen.ptr_eq(&state));

    seen.downcast_ref::<FilterState>()
        .expect("filter state")
        .revision
        .fetch_add(1, Ordering::SeqCst);
    let revision = a
        .get_controller("filter")
        .and_then(|controller| {
            controller
                .downcast_ref::<FilterState>()
                .map(|state| state.revision.load(Ordering::SeqCst))
        });
    assert_eq!(revision, Some(1));
}

#[test]
fn assignment_without_match_returns_none() {
    let c = typed(inventory().into_shared(), "filter");
    assert!(c.set_controller("grouping", None).is_none());
    assert!(c.get_controller("grouping").is_none());
}

#[test]
fn custom_factory_is_consulted_only_for_the_first_of_a_type() {
    let created = Arc::new(AtomicUsize::new(0));
    let factory = {
        let created = Arc::clone(&created);
        move |stage_type: &StageType| {
            created.fetch_add(1, Ordering::SeqCst);
            SharedController::new(format!("{stage_type}-controller"))
        }
    };

    let a: Arc<dyn DataSource> = Arc::new(
        Stage::builder()
            .stage_type("grouping")
            .controller_factory(factory.clone())
            .upstream(inventory().into_shared())
            .build(),
    );
    let b = Stage::builder()
        .stage_type("grouping")
        .controller_factory(factory)
        .upstream(Arc::clone(&a))
        .build();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    let controller = b.get_controller("grouping").expect("typed");
    assert_eq!(
        controller.downcast_ref::<String>().map(String::as_str),
        Some("grouping-controller")
    );

    let fresh = b.set_controller("grouping", None).expect("typed");
    assert_eq!(created.load(Ordering::SeqCst), 2, "None 触发工厂新建");
    assert!(a.get_controller("grouping").is_some_and(|got| got.ptr_eq(&fresh)));
}

#[test]
fn pipeline_assignment_covers_every_stage() {
    let pipeline = Pipeline::new(inventory().into_shared())
        .then(|upstream| typed(upstream, "filter"))
        .then(|upstream| typed(upstream, "sorter"))
        .then(|upstream| typed(upstream, "filter"))
        .then(Stage::wrapping);

    let assigned = pipeline
        .set_controller("filter", None)
        .expect("filter stages present");
    let filters: Vec<SharedController> = pipeline
        .iter()
        .filter(|stage| stage.stage().has_type("filter"))
        .filter_map(|stage| stage.stage().controller())
        .collect();
    assert_eq!(filters.len(), 2);
    assert!(filters.iter().all(|controller| controller.ptr_eq(&assigned)));
    assert!(
        pipeline
            .get_controller("sorter")
            .is_some_and(|sorter| !sorter.ptr_eq(&assigned))
    );
}
