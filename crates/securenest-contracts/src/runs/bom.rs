use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::plan::{Priority, SecurityPlan};

/// Flattened bill-of-materials row as written by [`write_bom`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub item: u64,
    pub name: String,
    pub category: String,
    pub priority: Priority,
    pub estimated_cost_usd: f64,
}

pub fn bom_lines(plan: &SecurityPlan) -> Vec<BomLine> {
    plan.recommendations
        .iter()
        .enumerate()
        .map(|(idx, device)| BomLine {
            item: idx as u64 + 1,
            name: device.name.clone(),
            category: device.category.clone(),
            priority: device.priority,
            estimated_cost_usd: device.estimated_cost,
        })
        .collect()
}

pub fn write_bom(
    path: &Path,
    plan: &SecurityPlan,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = Map::new();
    payload.insert(
        "items".to_string(),
        serde_json::to_value(bom_lines(plan))?,
    );
    payload.insert(
        "total_estimated_cost_min_usd".to_string(),
        Value::from(plan.total_estimated_cost_min),
    );
    payload.insert(
        "total_estimated_cost_max_usd".to_string(),
        Value::from(plan.total_estimated_cost_max),
    );
    payload.insert(
        "listed_device_cost_usd".to_string(),
        Value::from(plan.listed_device_cost()),
    );
    payload.insert("exported_at".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
