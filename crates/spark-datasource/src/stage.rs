use std::{borrow::Cow, fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    bus::{MessageBus, StageId, Subscriber, SubscriptionId},
    config::DataSourceConfig,
    controller::{
        ControllerFactory, ControllerSlot, EmptyControllerFactory, SharedController, StageType,
    },
    properties::PropertyTable,
    schema::Value,
    source::DataSource,
};

/// Pipeline 中的一个节点：至多包装一个上游阶段。
///
/// # 设计背景（Why）
/// - 具体阶段（过滤、排序、分组、下钻）只覆写与自身变换相关的少数操作，其余查询一律原样转交上游。
/// - `Stage` 承载所有阶段共有的链路状态：上游引用、类型标签、共享控制器插槽、本地属性表与消息总线。
///
/// # 契约说明（What）
/// - `Stage` 自身实现 [`DataSource`]，全部操作均为默认转发；没有上游时即为“空对象”，查询返回 `None`。
/// - 上游引用在构造后不可变，因此链路无环，任何沿链遍历都以链路深度为界。
/// - 带类型标签的阶段在 [`StageBuilder::build`] 时完成控制器解析：沿上游查找第一个同类型阶段并共享其插槽，
///   找不到则由控制器工厂新建。
/// - 未显式指定总线时沿用上游阶段的总线。
pub struct Stage {
    id: StageId,
    label: Cow<'static, str>,
    upstream: Option<Arc<dyn DataSource>>,
    stage_type: Option<StageType>,
    controller: Option<ControllerSlot>,
    factory: Arc<dyn ControllerFactory>,
    properties: RwLock<PropertyTable>,
    bus: Option<Arc<dyn MessageBus>>,
}

impl Stage {
    /// 以默认配置开始构造。
    pub fn builder() -> StageBuilder {
        StageBuilder::new()
    }

    /// 不带上游、不带类型的空对象阶段。
    pub fn null() -> Self {
        StageBuilder::new().build()
    }

    /// 仅包装上游的纯转发阶段。
    pub fn wrapping(upstream: Arc<dyn DataSource>) -> Self {
        StageBuilder::new().upstream(upstream).build()
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// 上游阶段。
    pub fn upstream(&self) -> Option<&dyn DataSource> {
        self.upstream.as_deref()
    }

    /// 类型标签。
    pub fn stage_type(&self) -> Option<&StageType> {
        self.stage_type.as_ref()
    }

    /// 是否带有给定类型标签。
    pub fn has_type(&self, stage_type: &str) -> bool {
        self.stage_type
            .as_ref()
            .is_some_and(|own| own.as_str() == stage_type)
    }

    /// 当前控制器；无类型标签的阶段没有控制器。
    pub fn controller(&self) -> Option<SharedController> {
        self.controller.as_ref().map(ControllerSlot::load)
    }

    /// 共享控制器插槽。
    pub fn controller_slot(&self) -> Option<&ControllerSlot> {
        self.controller.as_ref()
    }

    /// 使用本阶段的工厂为给定类型制造新控制器。
    pub fn new_controller(&self, stage_type: &StageType) -> SharedController {
        self.factory.create(stage_type)
    }

    /// 消息总线。
    pub fn bus(&self) -> Option<&Arc<dyn MessageBus>> {
        self.bus.as_ref()
    }

    /// 从本阶段（含）开始向上游遍历。
    pub fn lineage(&self) -> Lineage<'_> {
        Lineage { next: Some(self) }
    }

    /// 本阶段到链头的节点数（含本阶段）。
    pub fn depth(&self) -> usize {
        self.lineage().count()
    }

    /// 本地属性查询，不询问上游。
    pub fn local_property(&self, name: &str) -> Option<Value> {
        self.properties.read().get(name).cloned()
    }

    /// 登记或覆盖本地属性，返回旧值。
    pub fn set_property(&self, name: impl Into<Cow<'static, str>>, value: Value) -> Option<Value> {
        self.properties.write().insert(name, value)
    }

    /// 移除本地属性；移除后同名查询重新落到上游。
    pub fn remove_property(&self, name: &str) -> Option<Value> {
        self.properties.write().remove(name)
    }

    /// 本地属性表快照。
    pub fn properties(&self) -> PropertyTable {
        self.properties.read().clone()
    }

    /// 从本阶段（含）向上游返回第一个同类型阶段的控制器。
    pub fn get_controller(&self, stage_type: &str) -> Option<SharedController> {
        self.lineage()
            .find(|stage| stage.has_type(stage_type))
            .and_then(Stage::controller)
    }

    /// 为所有同类型阶段设置控制器。
    ///
    /// # 契约说明（What）
    /// - `controller` 为 `None` 时，由本阶段的工厂制造一个新控制器。
    /// - 从本阶段（含）向上游遍历，对每个类型匹配的阶段写入其插槽；同类型阶段共享插槽，所以下游的同类型
    ///   阶段同样可见新值。
    /// - 返回写入的控制器；链路中没有匹配类型时返回 `None`。
    pub fn set_controller(
        &self,
        stage_type: &str,
        controller: Option<SharedController>,
    ) -> Option<SharedController> {
        let controller = controller.unwrap_or_else(|| {
            self.new_controller(&StageType::from(stage_type.to_owned()))
        });

        let mut assigned = None;
        for stage in self.lineage().filter(|stage| stage.has_type(stage_type)) {
            if let Some(slot) = stage.controller_slot() {
                slot.store(controller.clone());
                assigned = Some(controller.clone());
            }
        }

        debug!(
            stage = %self.id,
            stage_type,
            matched = assigned.is_some(),
            "controller assigned"
        );
        assigned
    }

    /// 在本阶段的总线作用域内订阅；没有总线时返回 `None`。
    pub fn subscribe(&self, topic: &str, subscriber: Subscriber) -> Option<SubscriptionId> {
        self.bus
            .as_ref()
            .map(|bus| bus.subscribe(self.id, topic, subscriber))
    }

    /// 退订。
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.as_ref().is_some_and(|bus| bus.unsubscribe(id))
    }

    /// 沿链路逐跳发布，回复按“下游到上游”的顺序拼接。
    pub fn publish(&self, topics: &[&str], message: &Value) -> Vec<Value> {
        self.lineage()
            .filter_map(|stage| {
                stage
                    .bus()
                    .map(|bus| bus.publish(stage.id(), topics, message))
            })
            .flatten()
            .collect()
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("stage_type", &self.stage_type)
            .field("has_upstream", &self.upstream.is_some())
            .field("controller", &self.controller())
            .field("has_bus", &self.bus.is_some())
            .finish()
    }
}

impl DataSource for Stage {
    fn stage(&self) -> &Stage {
        self
    }
}

/// 从某一阶段向链头方向的遍历器。
#[derive(Clone)]
pub struct Lineage<'a> {
    next: Option<&'a Stage>,
}

impl<'a> Lineage<'a> {
    /// 从任意（可能缺失的）起点开始遍历。
    pub fn starting_at(stage: Option<&'a Stage>) -> Self {
        Self { next: stage }
    }
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a Stage;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.upstream().map(|upstream| upstream.stage());
        Some(current)
    }
}

/// [`Stage`] 的构造器，`build` 即完成初始化。
pub struct StageBuilder {
    label: Cow<'static, str>,
    upstream: Option<Arc<dyn DataSource>>,
    stage_type: Option<StageType>,
    factory: Arc<dyn ControllerFactory>,
    properties: PropertyTable,
    bus: Option<Arc<dyn MessageBus>>,
}

impl Default for StageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StageBuilder {
    /// 默认标签 `stage`，本地属性取自 [`DataSourceConfig::default`]。
    pub fn new() -> Self {
        Self {
            label: Cow::Borrowed("stage"),
            upstream: None,
            stage_type: None,
            factory: Arc::new(EmptyControllerFactory),
            properties: DataSourceConfig::default().default_properties(),
            bus: None,
        }
    }

    /// 以配置重置默认属性；之前通过 [`property`](Self::property) 登记的同名属性会被覆盖。
    pub fn config(mut self, config: &DataSourceConfig) -> Self {
        self.properties.extend(config.default_properties());
        self
    }

    /// 日志与调试用标签。
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    pub fn upstream(mut self, upstream: Arc<dyn DataSource>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// 清除已登记的上游，用于构造链头。
    pub fn detached(mut self) -> Self {
        self.upstream = None;
        self
    }

    /// 类型标签；同一链路中同类型阶段共享控制器。
    pub fn stage_type(mut self, stage_type: impl Into<StageType>) -> Self {
        self.stage_type = Some(stage_type.into());
        self
    }

    /// 覆盖默认的空控制器工厂。
    pub fn controller_factory(mut self, factory: impl ControllerFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// 登记本地属性。
    pub fn property(mut self, name: impl Into<Cow<'static, str>>, value: Value) -> Self {
        self.properties.insert(name, value);
        self
    }

    pub fn bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// 完成初始化：挂接上游并解析控制器。
    pub fn build(self) -> Stage {
        let id = StageId::next();
        let upstream_stage = self.upstream.as_deref().map(|upstream| upstream.stage());

        let controller = self.stage_type.as_ref().map(|stage_type| {
            resolve_controller(id, upstream_stage, stage_type, self.factory.as_ref())
        });
        let bus = self
            .bus
            .or_else(|| upstream_stage.and_then(|stage| stage.bus().cloned()));

        Stage {
            id,
            label: self.label,
            upstream: self.upstream,
            stage_type: self.stage_type,
            controller,
            factory: self.factory,
            properties: RwLock::new(self.properties),
            bus,
        }
    }
}

/// 在上游链路中查找同类型阶段并共享其插槽，找不到则新建。
fn resolve_controller(
    id: StageId,
    upstream: Option<&Stage>,
    stage_type: &StageType,
    factory: &dyn ControllerFactory,
) -> ControllerSlot {
    let inherited = Lineage::starting_at(upstream)
        .find(|stage| stage.stage_type() == Some(stage_type))
        .and_then(|stage| stage.controller_slot().map(|slot| (stage.id(), slot.clone())));

    match inherited {
        Some((owner, slot)) => {
            debug!(stage = %id, %stage_type, %owner, "controller adopted from upstream");
            slot
        }
        None => {
            debug!(stage = %id, %stage_type, "controller created");
            ControllerSlot::new(factory.create(stage_type))
        }
    }
}
