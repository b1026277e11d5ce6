use serde_json::{Map, Value};

/// Synthetic identity of a row, its position in the backend's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    cells: Map<String, Value>,
}

impl Row {
    pub fn id(&self) -> RowId {
        self.id
    }

    // Missing keys render blank, same as null.
    pub fn text(&self, column: &str) -> String {
        self.cells.get(column).map(value_to_text).unwrap_or_default()
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(boolean) => boolean.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Rows of the latest successful search together with the keyword that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    keyword: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn empty() -> Self {
        ResultSet::default()
    }

    pub fn new(keyword: impl Into<String>, records: Vec<Map<String, Value>>) -> Self {
        // The header is derived from the first row only
        let columns = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| Row {
                id: RowId(idx),
                cells,
            })
            .collect();
        ResultSet {
            keyword: keyword.into(),
            columns,
            rows,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

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

#[cfg(test)]
pub(crate) fn records(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
