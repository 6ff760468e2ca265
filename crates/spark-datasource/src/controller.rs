//! 数据控制接口（DCI）：同类型阶段共享的协调对象。
//!
//! ## 模块说明（What）
//! - [`Controller`]：任意 `Any + Send + Sync + Debug` 类型都可以充当控制器，本层不关心其内容。
//! - [`SharedController`]：控制器的共享引用，克隆只增加引用计数，身份比较使用 [`SharedController::ptr_eq`]。
//! - [`ControllerSlot`]：同类型阶段共同持有的控制器插槽；替换插槽内容对所有持有者立即可见。
//! - [`ControllerFactory`]：初始化阶段在上游链路中找不到同类型阶段时用于制造新控制器的扩展点。
//! - [`StageType`]：类型标签。

use std::{any::Any, borrow::Cow, fmt, sync::Arc};

use parking_lot::RwLock;

/// 控制器契约。
///
/// 通过 blanket 实现，任何满足约束的类型自动成为控制器；下转型经由 [`SharedController::downcast_ref`] 完成。
pub trait Controller: Any + Send + Sync + fmt::Debug {
    /// 以 `Any` 暴露自身，便于下转型。
    fn as_any(&self) -> &dyn Any;
}

impl<T> Controller for T
where
    T: Any + Send + Sync + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 默认控制器：不含任何字段的协调对象。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmptyController;

/// 控制器的共享引用。
#[derive(Clone)]
pub struct SharedController(Arc<dyn Controller>);

impl SharedController {
    /// 包装具体控制器。
    pub fn new<C: Controller>(controller: C) -> Self {
        Self(Arc::new(controller))
    }

    /// 复用已有的 `Arc`，调用方可保留强类型句柄。
    pub fn from_arc(controller: Arc<dyn Controller>) -> Self {
        Self(controller)
    }

    /// 默认的空控制器。
    pub fn empty() -> Self {
        Self::new(EmptyController)
    }

    /// 尝试以具体类型读取控制器。
    pub fn downcast_ref<C: Controller>(&self) -> Option<&C> {
        self.0.as_ref().as_any().downcast_ref::<C>()
    }

    /// 判断两个引用是否指向同一实例。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedController").field(&self.0).finish()
    }
}

/// 同类型阶段共享的控制器插槽。
///
/// # 契约说明（What）
/// - 初始化时，阶段要么沿用上游同类型阶段的插槽（克隆 `Arc`），要么新建插槽；因此同一链路中同类型阶段
///   持有的是同一个插槽。
/// - [`store`](Self::store) 替换插槽内容，所有持有者随后 [`load`](Self::load) 得到同一实例。
/// - 插槽只保证“共享同一引用”，控制器内部状态的并发一致性由控制器自身负责。
#[derive(Clone, Debug)]
pub struct ControllerSlot(Arc<RwLock<SharedController>>);

impl ControllerSlot {
    /// 以初始控制器创建新插槽。
    pub fn new(controller: SharedController) -> Self {
        Self(Arc::new(RwLock::new(controller)))
    }

    /// 读取当前控制器。
    pub fn load(&self) -> SharedController {
        self.0.read().clone()
    }

    /// 替换当前控制器。
    pub fn store(&self, controller: SharedController) {
        *self.0.write() = controller;
    }

    /// 判断两个插槽是否为同一实例。
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// 阶段类型标签。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageType(Cow<'static, str>);

impl StageType {
    /// 构造类型标签。
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    /// 标签文本。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for StageType {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for StageType {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

impl PartialEq<str> for StageType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for StageType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// 控制器工厂：为尚无控制器的类型制造新实例。
///
/// 闭包 `Fn(&StageType) -> SharedController` 自动实现该 Trait。
pub trait ControllerFactory: Send + Sync {
    /// 为给定类型制造新控制器。
    fn create(&self, stage_type: &StageType) -> SharedController;
}

impl<F> ControllerFactory for F
where
    F: Fn(&StageType) -> SharedController + Send + Sync,
{
    fn create(&self, stage_type: &StageType) -> SharedController {
        self(stage_type)
    }
}

/// 默认工厂，总是返回 [`EmptyController`]。
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyControllerFactory;

impl ControllerFactory for EmptyControllerFactory {
    fn create(&self, _stage_type: &StageType) -> SharedController {
        SharedController::empty()
    }
}
