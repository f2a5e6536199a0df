//! Tabular frame built from request rows.

use crate::error::InferenceError;
use ndarray::{Array1, Array2, Axis};
use serde_json::{Map, Value};

/// Rows × named columns. Every row holds one cell per column; cells absent
/// from the source record are `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Builds a frame from JSON records.
    ///
    /// With a feature order, each row is reduced to exactly those names in that
    /// order, with null for missing keys. Without one, the columns are the
    /// union of the records' keys in first-seen order.
    pub fn from_records(
        records: &[Value],
        feature_order: Option<&[String]>,
    ) -> Result<Self, InferenceError> {
        let objects = records
            .iter()
            .enumerate()
            .map(|(i, record)| record.as_object().ok_or(InferenceError::InvalidRow(i)))
            .collect::<Result<Vec<&Map<String, Value>>, _>>()?;

        let columns = match feature_order {
            Some(order) => dedup(order.iter()),
            None => dedup(objects.iter().flat_map(|object| object.keys())),
        };

        let rows = objects
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|name| object.get(name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Coerces every cell to `f32`; see [`coerce_cell`].
    pub fn to_matrix(&self) -> Result<Array2<f32>, InferenceError> {
        let mut data = Vec::with_capacity(self.rows.len() * self.columns.len());
        for (i, row) in self.rows.iter().enumerate() {
            for (column, cell) in self.columns.iter().zip(row) {
                data.push(coerce_cell(cell, i, column)?);
            }
        }
        Ok(Array2::from_shape_vec(
            (self.rows.len(), self.columns.len()),
            data,
        )?)
    }

    /// Column `index` as an `[N, 1]` array, each cell passed through `coerce`.
    pub fn column_array<T>(
        &self,
        index: usize,
        coerce: impl Fn(&Value, usize, &str) -> Result<T, InferenceError>,
    ) -> Result<Array2<T>, InferenceError> {
        let column = &self.columns[index];
        let data = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| coerce(&row[index], i, column))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Array1::from_vec(data).insert_axis(Axis(1)))
    }

    #[cfg(test)]
    pub(crate) fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Row `i` as a JSON object keyed by column name.
    #[cfg(test)]
    pub(crate) fn record(&self, i: usize) -> Option<Map<String, Value>> {
        let row = self.rows.get(i)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }
}

/// Numbers pass through, null and blank strings become NaN, booleans become
/// 1/0 and numeric strings are parsed. Anything else is rejected.
pub fn coerce_cell(cell: &Value, row: usize, column: &str) -> Result<f32, InferenceError> {
    let invalid = || InferenceError::InvalidValue {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    };

    match cell {
        Value::Null => Ok(f32::NAN),
        Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64().map(|n| n as f32).ok_or_else(invalid),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(f32::NAN)
            } else {
                text.parse::<f64>().map(|n| n as f32).map_err(|_| invalid())
            }
        }
        Value::Array(_) | Value::Object(_) => Err(invalid()),
    }
}

/// Cells for int64 inputs: integers, integral floats, booleans and integer
/// text. There is no missing-value marker, so null is rejected.
pub fn coerce_int_cell(cell: &Value, row: usize, column: &str) -> Result<i64, InferenceError> {
    let invalid = || InferenceError::InvalidValue {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    };

    match cell {
        Value::Bool(flag) => Ok(i64::from(*flag)),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.fract() == 0.0).map(|n| n as i64))
            .ok_or_else(invalid),
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| invalid()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(invalid()),
    }
}

/// Cells for string inputs (categorical encoders). Text is trimmed, scalars
/// are written out as JSON and null becomes the empty string.
pub fn coerce_text_cell(cell: &Value, row: usize, column: &str) -> Result<String, InferenceError> {
    match cell {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Bool(_) | Value::Number(_) => Ok(cell.to_string()),
        Value::Array(_) | Value::Object(_) => Err(InferenceError::InvalidValue {
            row,
            column: column.to_string(),
            value: cell.to_string(),
        }),
    }
}

fn dedup<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in names {
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
    columns
}
