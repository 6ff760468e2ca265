use std::sync::Arc;

use tracing::debug;

use crate::{controller::SharedController, dump::DumpTable, source::DataSource};

/// 一条数据源链路的全部阶段，按上游到下游排列，下标 0 为链头。
///
/// # 设计背景（Why）
/// - 阶段只持有指向上游的引用，自下游向上游的遍历天然可得；反方向的访问由本容器提供。
/// - 链路自上而下搭建：每次 [`then`](Self::then) 都把当前尾部交给闭包作为上游，新阶段成为新的尾部。
///
/// # 契约说明（What）
/// - 面向整条链路的操作（控制器设置、转储）一律从尾部发起，从而覆盖所有阶段。
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn DataSource>>,
}

impl Pipeline {
    /// 以链头开始一条链路。
    pub fn new(head: Arc<dyn DataSource>) -> Self {
        Self { stages: vec![head] }
    }

    /// 以当前尾部为上游追加一个阶段。
    pub fn then<S, F>(mut self, build: F) -> Self
    where
        S: DataSource + 'static,
        F: FnOnce(Arc<dyn DataSource>) -> S,
    {
        let stage = build(self.tail());
        debug!(
            stage = %stage.stage().id(),
            label = stage.stage().label(),
            depth = self.stages.len() + 1,
            "stage appended"
        );
        self.stages.push(Arc::new(stage));
        self
    }

    /// 链头。
    pub fn head(&self) -> Arc<dyn DataSource> {
        Arc::clone(&self.stages[0])
    }

    /// 最下游的阶段。
    pub fn tail(&self) -> Arc<dyn DataSource> {
        Arc::clone(self.last())
    }

    fn last(&self) -> &Arc<dyn DataSource> {
        &self.stages[self.stages.len() - 1]
    }

    /// 第 `index` 个阶段，0 为链头。
    pub fn stage(&self, index: usize) -> Option<Arc<dyn DataSource>> {
        self.stages.get(index).cloned()
    }

    /// 阶段数量，至少为 1。
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DataSource>> {
        self.stages.iter()
    }

    /// 为整条链路中所有同类型阶段设置控制器。
    pub fn set_controller(
        &self,
        stage_type: &str,
        controller: Option<SharedController>,
    ) -> Option<SharedController> {
        self.last().set_controller(stage_type, controller)
    }

    /// 链路中该类型阶段当前的控制器。
    pub fn get_controller(&self, stage_type: &str) -> Option<SharedController> {
        self.last().get_controller(stage_type)
    }

    /// 以尾部视角转储。
    pub fn dump(&self, max: Option<usize>) -> DumpTable {
        self.last().dump(max)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.stage()))
            .finish()
    }
}
