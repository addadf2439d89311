//! Write payloads: create rows and update assignments.

use std::fmt::Write;

use crate::filter::FilterValue;
use crate::sql::quote_identifier;
use crate::traits::Model;

/// Data for inserting one row of `Self::Model`.
pub trait CreateData: Send {
    /// The model the row belongs to.
    type Model: Model;

    /// Column/value pairs to insert. Every input of a model yields the same
    /// columns in the same order, so rows can share one `INSERT`.
    fn into_values(self) -> Vec<(&'static str, FilterValue)>;
}

/// Data for updating rows of `Self::Model`.
pub trait UpdateData: Send {
    /// The model being updated.
    type Model: Model;

    /// Only the assignments that were set.
    fn into_assignments(self) -> Vec<Assignment>;
}

/// How a column is changed by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// `col = value`
    Set,
    /// `col = col + value`
    Increment,
    /// `col = col - value`
    Decrement,
    /// `col = col * value`
    Multiply,
    /// `col = col / value`
    Divide,
}

impl UpdateOp {
    fn operator(&self) -> Option<&'static str> {
        match self {
            Self::Set => None,
            Self::Increment => Some("+"),
            Self::Decrement => Some("-"),
            Self::Multiply => Some("*"),
            Self::Divide => Some("/"),
        }
    }
}

/// A typed update to one field. Plain values convert into `Set`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate<T> {
    /// Replace the value.
    Set(T),
    /// Add to the current value.
    Increment(T),
    /// Subtract from the current value.
    Decrement(T),
    /// Multiply the current value.
    Multiply(T),
    /// Divide the current value.
    Divide(T),
}

impl<T> From<T> for FieldUpdate<T> {
    fn from(value: T) -> Self {
        Self::Set(value)
    }
}

impl<T: Into<FilterValue>> FieldUpdate<T> {
    /// Bind to a column.
    pub fn into_assignment(self, column: &'static str) -> Assignment {
        let (op, value) = match self {
            Self::Set(v) => (UpdateOp::Set, v),
            Self::Increment(v) => (UpdateOp::Increment, v),
            Self::Decrement(v) => (UpdateOp::Decrement, v),
            Self::Multiply(v) => (UpdateOp::Multiply, v),
            Self::Divide(v) => (UpdateOp::Divide, v),
        };
        Assignment::new(column, op, value.into())
    }
}

/// One entry of a SET list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target column.
    pub column: String,
    /// Operation.
    pub op: UpdateOp,
    /// Operand. `None` stands for the current timestamp.
    pub value: Option<FilterValue>,
}

impl Assignment {
    /// Any operation.
    pub fn new(column: impl Into<String>, op: UpdateOp, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            op,
            value: Some(value),
        }
    }

    /// `col = value`
    pub fn set(column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(column, UpdateOp::Set, value.into())
    }

    /// `col = CURRENT_TIMESTAMP`
    pub fn now(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: UpdateOp::Set,
            value: None,
        }
    }

    /// Append `col = ...` to `sql`, binding the operand into `params`.
    /// `qualifier` prefixes the column on the right-hand side, which an
    /// upsert needs to refer to the existing row.
    pub fn write_sql(
        &self,
        sql: &mut String,
        params: &mut Vec<FilterValue>,
        qualifier: Option<&str>,
    ) {
        let column = quote_identifier(&self.column);
        let value = match &self.value {
            None => {
                let _ = write!(sql, "{} = CURRENT_TIMESTAMP", column);
                return;
            }
            Some(value) => value.clone(),
        };
        params.push(value);
        let idx = params.len();
        match self.op.operator() {
            None => {
                let _ = write!(sql, "{} = ${}", column, idx);
            }
            Some(op) => {
                let current = match qualifier {
                    Some(q) => format!("{}.{}", q, column),
                    None => column.clone(),
                };
                let _ = write!(sql, "{} = {} {} ${}", column, current, op, idx);
            }
        }
    }
}

/// Render a SET list, appending the model's auto-updated timestamp unless
/// the caller already assigns it.
pub(crate) fn write_set_list<M: Model>(
    assignments: &[Assignment],
    sql: &mut String,
    params: &mut Vec<FilterValue>,
    qualifier: Option<&str>,
) {
    let mut first = true;
    for assignment in assignments {
        if !first {
            sql.push_str(", ");
        }
        assignment.write_sql(sql, params, qualifier);
        first = false;
    }
    if let Some(updated_at) = M::UPDATED_AT {
        if !assignments.iter().any(|a| a.column == updated_at) {
            if !first {
                sql.push_str(", ");
            }
            Assignment::now(updated_at).write_sql(sql, params, qualifier);
        }
    }
}
