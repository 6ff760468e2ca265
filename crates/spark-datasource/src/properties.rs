use std::{borrow::Cow, collections::BTreeMap};

use crate::schema::Value;

/// `replaceIndent` 属性名：转储时替换行首空白的字符。
pub const REPLACE_INDENT: &str = "replaceIndent";

/// `drillDownCharMap` 属性名：展开/折叠/叶子节点的标记字符表。
pub const DRILL_DOWN_CHAR_MAP: &str = "drillDownCharMap";

/// 阶段的本地属性表。
///
/// # 契约说明（What）
/// - `get_property` 先查本地表，命中即返回，不再询问上游；因此任意阶段只需登记一个同名属性即可覆盖上游取值。
/// - 表内容为显式登记的键值，不做任何反射式探测。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyTable {
    entries: BTreeMap<Cow<'static, str>, Value>,
}

impl PropertyTable {
    /// 空表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记属性，返回被覆盖的旧值。
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    /// Builder 风格的登记。
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// 本地查询。
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// 是否本地拥有该属性。
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 移除属性。
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 以另一张表的条目覆盖本表同名条目。
    pub fn extend(&mut self, other: PropertyTable) {
        self.entries.extend(other.entries);
    }
}
