//! Parameter values and the auto-parameter registry.
//!
//! Every literal in a builder lambda is lifted into a named auto-parameter
//! (`__p1, __p2, …`). The registry keeps each value together with its
//! provenance (which column and table it was compared against) so dialect
//! back-ends can coerce values (SQLite stores booleans as integers).
//!
//! At statement-assembly time auto-parameters are merged with caller
//! parameters (the caller wins on name collision), array parameters gain
//! indexed companions for SQLite, and nested object parameters are flattened
//! one property level for dialects without property-path placeholders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sql::dialect::{Dialect, SqlDialect};

/// A parameter value crossing the driver boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ParamValue>),
    Object(BTreeMap<String, ParamValue>),
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Int(n as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.into())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Named parameters, ordered for deterministic output.
pub type Params = BTreeMap<String, ParamValue>;

/// Build a `Params` map from pairs.
pub fn params_from<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Provenance of one auto-parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoParamInfo {
    pub value: ParamValue,
    /// Column the literal was compared against, when known.
    pub field_name: Option<String>,
    /// Join alias or table qualifying that column.
    pub table_name: Option<String>,
    /// The table the enclosing lambda row ranged over.
    pub source_table: Option<String>,
}

/// Accumulates auto-parameters during one lowering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoParamRegistry {
    values: BTreeMap<String, ParamValue>,
    infos: BTreeMap<String, AutoParamInfo>,
    counter: u32,
}

impl AutoParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a literal and return its parameter name. Names are assigned
    /// monotonically in source order, which keeps compilation deterministic
    /// and cached plans reusable.
    pub fn add(&mut self, value: ParamValue, info: AutoParamInfo) -> String {
        self.counter += 1;
        let name = format!("__p{}", self.counter);
        self.values.insert(name.clone(), value);
        self.infos.insert(name.clone(), info);
        name
    }

    /// Attach field context to an already-registered parameter. Comparisons
    /// lower their operands in source order, so the column side may only be
    /// known after the literal side was registered.
    pub fn set_field_context(
        &mut self,
        name: &str,
        field_name: Option<String>,
        table_name: Option<String>,
        source_table: Option<String>,
    ) {
        if let Some(info) = self.infos.get_mut(name) {
            info.field_name = field_name;
            info.table_name = table_name;
            info.source_table = source_table;
        }
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }

    pub fn infos(&self) -> &BTreeMap<String, AutoParamInfo> {
        &self.infos
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Merging and expansion
// =============================================================================

/// Merge auto-parameters with caller parameters into the final parameter map.
///
/// Auto-parameters are dialect-coerced first; caller values then overwrite
/// any colliding name. Finally the dialect's expansion rules run: SQLite
/// arrays gain `name_0, name_1, …` companions and nested objects gain
/// `name_property` companions.
pub fn merge_params(
    auto: &BTreeMap<String, ParamValue>,
    infos: &BTreeMap<String, AutoParamInfo>,
    caller: &Params,
    dialect: Dialect,
) -> Params {
    let mut merged: Params = BTreeMap::new();

    for (name, value) in auto {
        let coerced = dialect.coerce_auto_param(value.clone(), infos.get(name));
        merged.insert(name.clone(), coerced);
    }

    for (name, value) in caller {
        merged.insert(name.clone(), value.clone());
    }

    if dialect.expands_parameters() {
        let companions: Vec<(String, ParamValue)> = merged
            .iter()
            .flat_map(|(name, value)| expand_value(name, value))
            .collect();
        merged.extend(companions);
    }

    merged
}

fn expand_value(name: &str, value: &ParamValue) -> Vec<(String, ParamValue)> {
    match value {
        ParamValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (format!("{}_{}", name, i), item.clone()))
            .collect(),
        ParamValue::Object(fields) => fields
            .iter()
            .map(|(prop, item)| (format!("{}_{}", name, prop), item.clone()))
            .collect(),
        _ => Vec::new(),
    }
}
