use tracing::trace;

use crate::{
    bus::{Subscriber, SubscriptionId},
    controller::SharedController,
    dump::{self, DumpTable},
    error::DataSourceError,
    schema::{ColumnInfo, ColumnRef, FoundRow, Row, Schema, Value},
    stage::Stage,
};

/// 数据源转发契约：Pipeline 中每个阶段对外暴露的统一查询/变更接口。
///
/// # 设计背景（Why）
/// - 阶段之间只通过该 Trait 交互，任何实现者都可以充当上游，阶段顺序可以任意编排。
/// - 默认实现即“透明转发”：存在上游时以相同参数调用上游的同名操作并原样返回；没有上游时返回 `None`。
///   具体阶段只覆写与自身变换相关的方法。
///
/// # 契约说明（What）
/// - 唯一必需的方法是 [`stage`](Self::stage)，返回承载链路状态的 [`Stage`]。
/// - 例外一：[`get_property`](Self::get_property) 先查本阶段的本地属性表，未命中才逐个询问上游阶段的属性表。
/// - 例外二：[`get_column_info`](Self::get_column_info) 不转发，而是基于 [`schema`](Self::schema) 在本地计算。
/// - 例外三：[`apply`](Self::apply) 默认总是返回 [`DataSourceError::NothingToApply`]。
/// - 上游返回的值与错误原样透传，本层不缓存、不包装。
///
/// # 风险提示（Trade-offs）
/// - `get_grand_totals` 只有一个返回值，顶部与底部合计共用同一份结果。
pub trait DataSource: Send + Sync {
    /// 承载链路状态的节点。
    fn stage(&self) -> &Stage;

    /// 上游阶段。
    fn upstream(&self) -> Option<&dyn DataSource> {
        self.stage().upstream()
    }

    /// 没有上游、也不承载数据的阶段为空对象。
    fn is_null_object(&self) -> bool {
        self.upstream().is_none()
    }

    // schema 读写

    /// 读取 schema 属性。
    fn schema(&self) -> Option<Schema> {
        self.upstream()?.schema()
    }

    /// 写入 schema 属性。
    fn store_schema(&self, schema: Schema) -> Option<()> {
        self.upstream()?.store_schema(schema)
    }

    fn get_schema(&self) -> Option<Schema> {
        self.upstream()?.get_schema()
    }

    fn set_schema(&self, schema: Schema) -> Option<()> {
        self.upstream()?.set_schema(schema)
    }

    // 数据变更

    /// 替换全部数据；`schema` 为 `None` 时由数据承载阶段自行决定是否推断。
    fn set_data(&self, rows: Vec<Row>, schema: Option<Schema>) -> Option<()> {
        self.upstream()?.set_data(rows, schema)
    }

    fn set_value(&self, x: usize, y: usize, value: Value) -> Option<()> {
        self.upstream()?.set_value(x, y, value)
    }

    // 形状查询

    fn get_row_count(&self) -> Option<usize> {
        self.upstream()?.get_row_count()
    }

    fn get_column_count(&self) -> Option<usize> {
        self.upstream()?.get_column_count()
    }

    fn get_fields(&self) -> Option<Vec<String>> {
        self.upstream()?.get_fields()
    }

    fn get_headers(&self) -> Option<Vec<String>> {
        self.upstream()?.get_headers()
    }

    // 行/值查询

    fn get_row(&self, y: usize) -> Option<Row> {
        self.upstream()?.get_row(y)
    }

    fn find_row(&self, column: &str, value: &Value) -> Option<FoundRow> {
        self.upstream()?.find_row(column, value)
    }

    fn reveal_row(&self, y: usize) -> Option<bool> {
        self.upstream()?.reveal_row(y)
    }

    fn get_value(&self, x: usize, y: usize) -> Option<Value> {
        self.upstream()?.get_value(x, y)
    }

    fn get_data_index(&self, y: usize) -> Option<usize> {
        self.upstream()?.get_data_index(y)
    }

    fn click(&self, y: usize) -> Option<bool> {
        self.upstream()?.click(y)
    }

    /// 合计行；顶部与底部合计共用此结果。
    fn get_grand_totals(&self) -> Option<Vec<Row>> {
        self.upstream()?.get_grand_totals()
    }

    // 下钻判定

    fn is_drill_down(&self, column: Option<usize>) -> Option<bool> {
        self.upstream()?.is_drill_down(column)
    }

    fn is_drill_down_col(&self, column: usize) -> Option<bool> {
        self.upstream()?.is_drill_down_col(column)
    }

    fn is_leaf_node(&self, y: usize) -> Option<bool> {
        self.upstream()?.is_leaf_node(y)
    }

    fn view_makes_sense(&self) -> Option<bool> {
        self.upstream()?.view_makes_sense()
    }

    // 其他

    /// 属性查询：本地属性表优先，其次按链路顺序查询各上游阶段的属性表。
    fn get_property(&self, name: &str) -> Option<Value> {
        self.stage()
            .lineage()
            .find_map(|stage| stage.local_property(name))
    }

    /// 由列序号或列名求出 `{name, index}`，基于本阶段可见的 schema 计算。
    fn get_column_info(&self, column: ColumnRef<'_>) -> Option<ColumnInfo> {
        self.schema()?.column_info(column)
    }

    /// 执行本阶段的变换。默认没有任何变换可执行。
    fn apply(&self) -> Result<(), DataSourceError> {
        trace!(stage = %self.stage().id(), "nothing to apply");
        Err(DataSourceError::nothing_to_apply())
    }

    // 控制器

    fn get_controller(&self, stage_type: &str) -> Option<SharedController> {
        self.stage().get_controller(stage_type)
    }

    fn set_controller(
        &self,
        stage_type: &str,
        controller: Option<SharedController>,
    ) -> Option<SharedController> {
        self.stage().set_controller(stage_type, controller)
    }

    // 发布/订阅

    fn subscribe(&self, topic: &str, subscriber: Subscriber) -> Option<SubscriptionId> {
        self.stage().subscribe(topic, subscriber)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.stage().unsubscribe(id)
    }

    /// 沿整条上游链路广播，回复按“下游到上游”的顺序拼接。
    fn publish(&self, topics: &[&str], message: &Value) -> Vec<Value> {
        self.stage().publish(topics, message)
    }

    /// 调试转储，最多物化 `max` 行；`None` 或 `0` 表示全部行。
    fn dump(&self, max: Option<usize>) -> DumpTable {
        dump::dump_table(self, max)
    }
}
