use std::fmt;

use tracing::debug;

use crate::{
    config::DEFAULT_REPLACE_INDENT,
    properties::REPLACE_INDENT,
    schema::{Row, Value},
    source::DataSource,
};

/// 调试转储的结果：按列名组织的行记录。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DumpTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl DumpTable {
    /// 列名，按列序号排列。
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for DumpTable {
    /// 渲染为等宽文本表，首列为行序号。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("(index)".to_owned());
        header.extend(self.columns.iter().cloned());

        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let mut cells = Vec::with_capacity(header.len());
                cells.push(index.to_string());
                cells.extend(
                    self.columns
                        .iter()
                        .map(|column| row.get(column).map(render_cell).unwrap_or_default()),
                );
                cells
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|column| {
                std::iter::once(&header)
                    .chain(body.iter())
                    .map(|line| line[column].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_line(f, &header, &widths)?;
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        write_line(f, &rule, &widths)?;
        for line in &body {
            write_line(f, line, &widths)?;
        }
        Ok(())
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    for (index, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if index > 0 {
            f.write_str(" | ")?;
        }
        write!(f, "{cell:<width$}")?;
    }
    writeln!(f)
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 将行首空白替换为同等数量的 `indent`，便于在表格中观察层级缩进。
///
/// 全空白字符串原样返回。
pub fn fix_indent_for_table_display(text: &str, indent: &str) -> String {
    let content = text.trim_start();
    if content.is_empty() {
        return text.to_owned();
    }
    let count = text.chars().count() - content.chars().count();
    let mut fixed = indent.repeat(count);
    fixed.push_str(content);
    fixed
}

/// 物化至多 `max` 行数据。
///
/// # 契约说明（What）
/// - 行数上限为 `min(行数, max)`；`max` 为 `None` 或 `0` 时取全部行。
/// - 列名优先取 schema，缺失时取 `get_headers`；列数不足时以列序号补位。
/// - `view_makes_sense` 为真时，首列字符串按 `replaceIndent` 属性重写缩进。
///   只看判定结果本身；阶段未声明层级视图（返回 `None` 或 `Some(false)`）时不重写。
/// - 结果同时以 DEBUG 级别写入日志。
pub fn dump_table<S>(source: &S, max: Option<usize>) -> DumpTable
where
    S: DataSource + ?Sized,
{
    let row_count = source.get_row_count().unwrap_or(0);
    let limit = match max {
        Some(max) if max > 0 => max.min(row_count),
        _ => row_count,
    };

    let fields = source
        .schema()
        .map(|schema| schema.names())
        .or_else(|| source.get_headers())
        .unwrap_or_default();
    let column_count = source.get_column_count().unwrap_or(0);
    let columns: Vec<String> = (0..column_count)
        .map(|index| {
            fields
                .get(index)
                .cloned()
                .unwrap_or_else(|| index.to_string())
        })
        .collect();

    let reindent = source.view_makes_sense() == Some(true);
    let indent = source
        .get_property(REPLACE_INDENT)
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_else(|| DEFAULT_REPLACE_INDENT.to_owned());

    let rows = (0..limit)
        .map(|y| {
            columns
                .iter()
                .enumerate()
                .map(|(x, column)| {
                    let value = match source.get_value(x, y) {
                        Some(Value::String(text)) if x == 0 && reindent => {
                            Value::String(fix_indent_for_table_display(&text, &indent))
                        }
                        Some(value) => value,
                        None => Value::Null,
                    };
                    (column.clone(), value)
                })
                .collect::<Row>()
        })
        .collect();

    let table = DumpTable { columns, rows };
    debug!(stage = %source.stage().id(), rows = table.len(), "data source dump\n{table}");
    table
}
