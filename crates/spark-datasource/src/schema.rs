use std::{ops::Deref, sync::Arc};

use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// 单行数据：列名到单元格值的映射。
pub type Row = serde_json::Map<String, Value>;

/// 单列的结构描述。
///
/// `header` 为空时，展示层使用 `name` 作为表头。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

impl ColumnSchema {
    /// 仅以列名构造。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: None,
        }
    }

    /// 附带展示用表头。
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// 展示用表头，缺省回退到列名。
    pub fn header_or_name(&self) -> &str {
        self.header.as_deref().unwrap_or(&self.name)
    }
}

/// 有序列集合，克隆只增加引用计数。
///
/// # 契约说明（What）
/// - 只有链头（数据承载阶段）真正持有 `Schema`；其余阶段通过转发读取同一份快照。
/// - 解引用为 `[ColumnSchema]`，下标即列序号。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema(Arc<Vec<ColumnSchema>>);

impl Schema {
    /// 由列描述构造。
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self(Arc::new(columns))
    }

    /// 由列名列表构造，表头留空。
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(ColumnSchema::new).collect()
    }

    /// 全部列名，按列序号排列。
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|column| column.name.clone()).collect()
    }

    /// 全部表头，缺省使用列名。
    pub fn headers(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|column| column.header_or_name().to_owned())
            .collect()
    }

    /// 线性扫描返回第一个同名列的序号。
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|column| column.name == name)
    }

    /// 由列序号或列名求出 `{name, index}`。
    ///
    /// # 契约说明（What）
    /// - 输入为序号：取 `schema[index].name`；序号越界时返回 `None`。
    /// - 输入为列名：线性扫描取第一个匹配项的序号；未命中返回 `None`。
    /// - 最终列名为空字符串时返回 `None`。
    pub fn column_info<'a>(&self, column: impl Into<ColumnRef<'a>>) -> Option<ColumnInfo> {
        let (name, index) = match column.into() {
            ColumnRef::Index(index) => (self.0.get(index)?.name.clone(), index),
            ColumnRef::Name(name) => (name.to_owned(), self.position(name)?),
        };

        if name.is_empty() {
            return None;
        }
        Some(ColumnInfo { name, index })
    }
}

impl Deref for Schema {
    type Target = [ColumnSchema];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<ColumnSchema>> for Schema {
    fn from(columns: Vec<ColumnSchema>) -> Self {
        Self::new(columns)
    }
}

impl FromIterator<ColumnSchema> for Schema {
    fn from_iter<T: IntoIterator<Item = ColumnSchema>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// `get_column_info` 的输入：列序号或列名。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ColumnRef<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

/// 列名与列序号的组合。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnInfo {
    pub name: String,
    pub index: usize,
}

/// `find_row` 命中的行及其序号。
#[derive(Clone, Debug, PartialEq)]
pub struct FoundRow {
    pub index: usize,
    pub row: Row,
}
