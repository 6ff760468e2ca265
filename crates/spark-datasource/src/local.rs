use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    config::DataSourceConfig,
    schema::{FoundRow, Row, Schema, Value},
    source::DataSource,
    stage::{Stage, StageBuilder},
};

/// 链头：真正持有行数据与 schema 的阶段。
///
/// # 契约说明（What）
/// - 没有上游，但承载数据，因此不是空对象。
/// - 单元格按 `rows[y][schema[x].name]` 定位；列不存在或行越界时返回 `None`。
/// - 本阶段没有层级结构：下钻判定一律为假，每一行都是叶子。
/// - 未给出 schema 且当前 schema 为空时，按首行键的插入顺序推断列。
pub struct LocalSource {
    stage: Stage,
    schema: RwLock<Schema>,
    rows: RwLock<Vec<Row>>,
}

impl LocalSource {
    /// 默认配置下的空数据源。
    pub fn new() -> Self {
        Self::from_stage(Stage::builder().label("local").build())
    }

    /// 以给定配置构造空数据源。
    pub fn with_config(config: &DataSourceConfig) -> Self {
        Self::from_stage(Stage::builder().label("local").config(config).build())
    }

    /// 在自定义的链路节点上承载数据，可携带总线或类型标签。
    ///
    /// 传入的 builder 上的上游会被忽略。
    pub fn from_builder(builder: StageBuilder) -> Self {
        Self::from_stage(builder.detached().build())
    }

    fn from_stage(stage: Stage) -> Self {
        Self {
            stage,
            schema: RwLock::new(Schema::default()),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// 以初始数据构造。
    pub fn with_data(rows: Vec<Row>, schema: Option<Schema>) -> Self {
        let source = Self::new();
        source.replace(rows, schema);
        source
    }

    /// 包装为可作为上游的共享引用。
    pub fn into_shared(self) -> Arc<dyn DataSource> {
        Arc::new(self)
    }

    fn replace(&self, rows: Vec<Row>, schema: Option<Schema>) {
        let mut current = self.schema.write();
        match schema {
            Some(schema) => *current = schema,
            None if current.is_empty() => {
                if let Some(first) = rows.first() {
                    *current = Schema::from_names(first.keys().cloned());
                }
            }
            None => {}
        }

        debug!(
            stage = %self.stage.id(),
            rows = rows.len(),
            columns = current.len(),
            "data replaced"
        );
        *self.rows.write() = rows;
    }

    fn column_name(&self, x: usize) -> Option<String> {
        self.schema.read().get(x).map(|column| column.name.clone())
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSource")
            .field("stage", &self.stage)
            .field("columns", &self.schema.read().len())
            .field("rows", &self.rows.read().len())
            .finish()
    }
}

impl DataSource for LocalSource {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn is_null_object(&self) -> bool {
        false
    }

    fn schema(&self) -> Option<Schema> {
        Some(self.schema.read().clone())
    }

    fn store_schema(&self, schema: Schema) -> Option<()> {
        *self.schema.write() = schema;
        Some(())
    }

    fn get_schema(&self) -> Option<Schema> {
        self.schema()
    }

    fn set_schema(&self, schema: Schema) -> Option<()> {
        self.store_schema(schema)
    }

    fn set_data(&self, rows: Vec<Row>, schema: Option<Schema>) -> Option<()> {
        self.replace(rows, schema);
        Some(())
    }

    fn set_value(&self, x: usize, y: usize, value: Value) -> Option<()> {
        let name = self.column_name(x)?;
        let mut rows = self.rows.write();
        rows.get_mut(y)?.insert(name, value);
        Some(())
    }

    fn get_row_count(&self) -> Option<usize> {
        Some(self.rows.read().len())
    }

    fn get_column_count(&self) -> Option<usize> {
        Some(self.schema.read().len())
    }

    fn get_fields(&self) -> Option<Vec<String>> {
        Some(self.schema.read().names())
    }

    fn get_headers(&self) -> Option<Vec<String>> {
        Some(self.schema.read().headers())
    }

    fn get_row(&self, y: usize) -> Option<Row> {
        self.rows.read().get(y).cloned()
    }

    fn find_row(&self, column: &str, value: &Value) -> Option<FoundRow> {
        self.rows
            .read()
            .iter()
            .enumerate()
            .find(|(_, row)| row.get(column) == Some(value))
            .map(|(index, row)| FoundRow {
                index,
                row: row.clone(),
            })
    }

    fn reveal_row(&self, _y: usize) -> Option<bool> {
        Some(false)
    }

    fn get_value(&self, x: usize, y: usize) -> Option<Value> {
        let name = self.column_name(x)?;
        self.rows.read().get(y)?.get(&name).cloned()
    }

    fn get_data_index(&self, y: usize) -> Option<usize> {
        (y < self.rows.read().len()).then_some(y)
    }

    fn click(&self, _y: usize) -> Option<bool> {
        Some(false)
    }

    fn get_grand_totals(&self) -> Option<Vec<Row>> {
        Some(Vec::new())
    }

    fn is_drill_down(&self, _column: Option<usize>) -> Option<bool> {
        Some(false)
    }

    fn is_drill_down_col(&self, _column: usize) -> Option<bool> {
        Some(false)
    }

    fn is_leaf_node(&self, _y: usize) -> Option<bool> {
        Some(true)
    }

    fn view_makes_sense(&self) -> Option<bool> {
        Some(false)
    }
}
