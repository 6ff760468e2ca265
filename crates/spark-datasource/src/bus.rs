use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;

use crate::schema::Value;

/// 阶段在消息总线上的作用域标识，进程内唯一。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(u64);

impl StageId {
    /// 分配下一个标识。
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// 订阅句柄，用于退订。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 订阅者回调：收到 `(topic, message)`，可选地返回一个回复值。
pub type Subscriber = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// 发布/订阅传输契约。
///
/// # 契约说明（What）
/// - 订阅按 `(scope, topic)` 归档；`publish` 只投递给同一 `scope` 下订阅了任一 `topics` 的订阅者。
/// - `publish` 同步调用订阅者，按订阅顺序收集非 `None` 回复。
/// - 总线由调用方显式注入阶段，不存在进程级单例；不同 Pipeline 使用不同总线即可互不干扰。
pub trait MessageBus: Send + Sync {
    /// 在 `scope` 下订阅 `topic`。
    fn subscribe(&self, scope: StageId, topic: &str, subscriber: Subscriber) -> SubscriptionId;

    /// 退订；句柄不存在时返回 `false`。
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// 向 `scope` 下的订阅者发布消息，返回回复列表。
    fn publish(&self, scope: StageId, topics: &[&str], message: &Value) -> Vec<Value>;
}

struct Subscription {
    id: SubscriptionId,
    scope: StageId,
    topic: String,
    subscriber: Subscriber,
}

/// 进程内总线实现。
#[derive(Default)]
pub struct LocalBus {
    next_id: AtomicU64,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前订阅数量。
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl MessageBus for LocalBus {
    fn subscribe(&self, scope: StageId, topic: &str, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            scope,
            topic: topic.to_owned(),
            subscriber,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    fn publish(&self, scope: StageId, topics: &[&str], message: &Value) -> Vec<Value> {
        // 回调期间不持锁，订阅者可以在回调内再次订阅或退订。
        let targets: Vec<(String, Subscriber)> = self
            .subscriptions
            .read()
            .iter()
            .filter(|subscription| {
                subscription.scope == scope && topics.contains(&subscription.topic.as_str())
            })
            .map(|subscription| {
                (
                    subscription.topic.clone(),
                    Arc::clone(&subscription.subscriber),
                )
            })
            .collect();

        targets
            .into_iter()
            .filter_map(|(topic, subscriber)| subscriber(&topic, message))
            .collect()
    }
}
