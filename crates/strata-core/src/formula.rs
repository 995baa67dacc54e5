//! Calculated attribute expressions.
//!
//! A [`Formula`] derives an attribute from sibling attributes on the same
//! object, e.g. `total = qty * price` or `coalesce(primary, fallback)`.
//! Evaluation never fails loudly: a missing or null operand yields `None`,
//! which callers treat as "not resolvable yet".

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Operators supported in calculated fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaOperator {
    /// Numeric sum of all operands.
    Add,
    /// First operand minus the rest.
    Subtract,
    /// Numeric product of all operands.
    Multiply,
    /// First operand divided by the rest.
    Divide,
    /// First non-null operand.
    Coalesce,
    /// String concatenation of all operands.
    Concat,
}

/// An expression over sibling attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    /// Operator applied to the operands.
    pub operator: FormulaOperator,
    /// Names of the sibling attributes used as operands, in order.
    pub operands: Vec<String>,
}

impl Formula {
    /// Create a formula.
    pub fn new<I, S>(operator: FormulaOperator, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operator,
            operands: operands.into_iter().map(Into::into).collect(),
        }
    }

    /// Evaluate using `lookup` to fetch each operand's raw value.
    pub fn evaluate<F>(&self, lookup: F) -> Option<Value>
    where
        F: Fn(&str) -> Option<Value>,
    {
        let values: Vec<Option<Value>> = self
            .operands
            .iter()
            .map(|name| lookup(name).filter(|v| !v.is_null()))
            .collect();

        if self.operator == FormulaOperator::Coalesce {
            return values.into_iter().flatten().next();
        }

        let values: Vec<Value> = values.into_iter().collect::<Option<_>>()?;
        if values.is_empty() {
            return None;
        }

        match self.operator {
            FormulaOperator::Concat => Some(Value::String(
                values.iter().map(display_raw).collect::<String>(),
            )),
            FormulaOperator::Coalesce => None,
            op => arithmetic(op, &values),
        }
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn arithmetic(op: FormulaOperator, values: &[Value]) -> Option<Value> {
    let ints: Option<Vec<i64>> = values.iter().map(Value::as_i64).collect();
    if let Some(ints) = ints
        && op != FormulaOperator::Divide
    {
        let (first, rest) = ints.split_first()?;
        let result = rest.iter().try_fold(*first, |acc, &n| match op {
            FormulaOperator::Add => acc.checked_add(n),
            FormulaOperator::Subtract => acc.checked_sub(n),
            FormulaOperator::Multiply => acc.checked_mul(n),
            _ => None,
        })?;
        return Some(Value::Number(result.into()));
    }

    let floats: Vec<f64> = values
        .iter()
        .map(|v| v.as_f64().or_else(|| v.as_str()?.parse().ok()))
        .collect::<Option<_>>()?;
    let (first, rest) = floats.split_first()?;
    let result = rest.iter().try_fold(*first, |acc, &n| match op {
        FormulaOperator::Add => Some(acc + n),
        FormulaOperator::Subtract => Some(acc - n),
        FormulaOperator::Multiply => Some(acc * n),
        FormulaOperator::Divide if n != 0.0 => Some(acc / n),
        _ => None,
    })?;
    Number::from_f64(result).map(Value::Number)
}

// ============================================================================
// Tests
// ============================================================================
