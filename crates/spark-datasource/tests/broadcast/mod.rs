//! 发布/订阅集成测试：沿链路广播、回复顺序与总线隔离。

#[path = "../support/mod.rs"]
mod support;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::json;
use spark_datasource::{
    DataSource, LocalBus, LocalSource, MessageBus, Pipeline, Stage, Subscriber, Value,
};

fn reply(tag: &'static str) -> Subscriber {
    Arc::new(move |topic: &str, message: &Value| {
        Some(json!({ "from": tag, "topic": topic, "echo": message }))
    })
}

fn chain(bus: Arc<dyn MessageBus>) -> Pipeline {
    let head = LocalSource::from_builder(Stage::builder().label("head").bus(Arc::clone(&bus)));
    Pipeline::new(Arc::new(head))
        .then(|upstream| Stage::builder().label("middle").upstream(upstream).build())
        .then(|upstream| Stage::builder().label("tail").upstream(upstream).build())
}

#[test]
fn replies_are_ordered_from_downstream_to_upstream() {
    let pipeline = chain(Arc::new(LocalBus::new()));
    for (index, tag) in [(0, "head"), (1, "middle"), (2, "tail")] {
        let stage = pipeline.stage(index).expect("stage exists");
        stage.subscribe("refresh", reply(tag)).expect("bus inherited");
    }

    let replies = pipeline.tail().publish(&["refresh"], &json!(7));
    let order: Vec<&str> = replies
        .iter()
        .filter_map(|reply| reply["from"].as_str())
        .collect();
    assert_eq!(order, ["tail", "middle", "head"]);
    assert!(replies.iter().all(|reply| reply["echo"] == json!(7)));
}

#[test]
fn publish_from_the_middle_skips_downstream_subscribers() {
    let pipeline = chain(Arc::new(LocalBus::new()));
    pipeline
        .tail()
        .subscribe("refresh", reply("tail"))
        .expect("bus inherited");
    pipeline
        .head()
        .subscribe("refresh", reply("head"))
        .expect("bus set");

    let middle = pipeline.stage(1).expect("middle");
    let replies = middle.publish(&["refresh"], &Value::Null);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["from"], json!("head"));
}

#[test]
fn multiple_topics_are_delivered_in_one_publish() {
    let pipeline = chain(Arc::new(LocalBus::new()));
    let tail = pipeline.tail();
    tail.subscribe("select", reply("select")).expect("bus");
    tail.subscribe("sort", reply("sort")).expect("bus");
    tail.subscribe("ignored", reply("ignored")).expect("bus");

    let replies = tail.publish(&["select", "sort"], &json!({ "column": 1 }));
    let topics: Vec<&str> = replies
        .iter()
        .filter_map(|reply| reply["topic"].as_str())
        .collect();
    assert_eq!(topics, ["select", "sort"]);
}

#[test]
fn unsubscribed_handlers_stop_receiving() {
    let pipeline = chain(Arc::new(LocalBus::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter: Subscriber = {
        let calls = Arc::clone(&calls);
        Arc::new(move |_: &str, _: &Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            None::<Value>
        })
    };

    let tail = pipeline.tail();
    let id = tail.subscribe("refresh", counter).expect("bus");
    assert!(tail.publish(&["refresh"], &Value::Null).is_empty(), "无回复的订阅者不产生结果");
    assert!(tail.unsubscribe(id));
    tail.publish(&["refresh"], &Value::Null);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn separate_pipelines_do_not_hear_each_other() {
    let shared = Arc::new(LocalBus::new());
    let first = chain(Arc::clone(&shared) as Arc<dyn MessageBus>);
    let second = chain(Arc::clone(&shared) as Arc<dyn MessageBus>);
    let isolated = chain(Arc::new(LocalBus::new()));

    second.tail().subscribe("refresh", reply("second")).expect("bus");
    isolated.tail().subscribe("refresh", reply("isolated")).expect("bus");

    assert!(first.tail().publish(&["refresh"], &Value::Null).is_empty());
    assert_eq!(second.tail().publish(&["refresh"], &Value::Null).len(), 1);
    assert_eq!(shared.subscription_count(), 1);
}

#[test]
fn stages_without_a_bus_publish_nothing() {
    let tail = support::wrap(support::inventory().into_shared(), 2);
    assert!(tail.subscribe("refresh", reply("tail")).is_none());
    assert!(tail.publish(&["refresh"], &Value::Null).is_empty());
}
