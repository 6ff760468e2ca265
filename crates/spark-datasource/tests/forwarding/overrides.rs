use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde_json::json;
use spark_datasource::{DataSource, DataSourceError, Stage, Value};

use crate::support::{inventory, wrap};

/// 将字符串单元格转为大写的阶段；`apply` 只在启用后成功。
struct Uppercase {
    stage: Stage,
    enabled: AtomicBool,
}

impl Uppercase {
    fn over(upstream: Arc<dyn DataSource>) -> Self {
        Self {
            stage: Stage::builder()
                .label("uppercase")
                .upstream(upstream)
                .build(),
            enabled: AtomicBool::new(false),
        }
    }
}

impl DataSource for Uppercase {
    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn get_value(&self, x: usize, y: usize) -> Option<Value> {
        match self.upstream()?.get_value(x, y)? {
            Value::String(text) => Some(Value::String(text.to_uppercase())),
            other => Some(other),
        }
    }

    fn apply(&self) -> Result<(), DataSourceError> {
        if self.enabled.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DataSourceError::nothing_to_apply_with("uppercase is disabled"))
        }
    }
}

#[test]
fn override_affects_only_its_operation() {
    let head = inventory().into_shared();
    let upper: Arc<dyn DataSource> = Arc::new(Uppercase::over(Arc::clone(&head)));
    let tail = wrap(Arc::clone(&upper), 2);

    assert_eq!(tail.get_value(0, 0), Some(json!("APPLE")));
    assert_eq!(tail.get_value(2, 0), Some(json!(3)));
    assert_eq!(head.get_value(0, 0), Some(json!("apple")), "上游不受影响");
    assert_eq!(tail.get_row(0), head.get_row(0), "未覆写的操作照常转发");
}

#[test]
fn overridden_apply_surfaces_its_own_error() {
    let upper = Uppercase::over(inventory().into_shared());
    let err = upper.apply().expect_err("disabled");
    assert_eq!(err.message(), "uppercase is disabled");
    assert_eq!(err.name(), "DataSourceError");

    upper.enabled.store(true, Ordering::SeqCst);
    assert_eq!(upper.apply(), Ok(()));
}

#[test]
fn downstream_default_apply_ignores_upstream_override() {
    let upper: Arc<dyn DataSource> = Arc::new(Uppercase::over(inventory().into_shared()));
    let tail = wrap(upper, 1);
    assert_eq!(tail.apply(), Err(DataSourceError::nothing_to_apply()));
}
