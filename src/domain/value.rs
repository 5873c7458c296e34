// Value model shared by the evaluator and the formula functions
use super::series::{Sample, Series};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    Scalar { value: f64 },
    Series(Series),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("misaligned series: left operand has {left} samples, right operand has {right}")]
pub struct MisalignedSeries {
    pub left: usize,
    pub right: usize,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    /// IEEE arithmetic: division by zero yields Inf/NaN.
    pub fn eval(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Value {
    pub fn scalar(value: f64) -> Self {
        Value::Scalar { value }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar { .. } => "scalar",
            Value::Series(_) => "series",
        }
    }

    /// Apply `op` with `self` on the left. Operand order is preserved for
    /// the non-commutative operators.
    pub fn apply(&self, op: BinaryOp, rhs: &Value) -> Result<Value, MisalignedSeries> {
        self.combine(rhs, |l, r| op.eval(l, r))
    }

    /// Combine two values sample by sample. Scalars broadcast across a series;
    /// two series are paired by position and must have equal lengths.
    pub fn combine(
        &self,
        rhs: &Value,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, MisalignedSeries> {
        match (self, rhs) {
            (Value::Scalar { value: l }, Value::Scalar { value: r }) => Ok(Value::scalar(f(*l, *r))),
            (Value::Series(l), Value::Scalar { value: r }) => {
                Ok(Value::Series(l.map_values(|v| f(v, *r))))
            }
            (Value::Scalar { value: l }, Value::Series(r)) => {
                Ok(Value::Series(r.map_values(|v| f(*l, v))))
            }
            (Value::Series(l), Value::Series(r)) => {
                if l.len() != r.len() {
                    return Err(MisalignedSeries {
                        left: l.len(),
                        right: r.len(),
                    });
                }
                // Timestamps follow the left operand.
                let samples = l
                    .samples
                    .iter()
                    .zip(&r.samples)
                    .map(|(a, b)| Sample::new(a.time, f(a.value, b.value)))
                    .collect();
                Ok(Value::Series(Series::from_ordered(l.range, samples)))
            }
        }
    }
}

#[cfg(test)]
impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar { value } => Some(*value),
            Value::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Value::Series(series) => Some(series),
            Value::Scalar { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::fixtures::{at, series};

    #[test]
    fn test_scalar_scalar() {
        let v = Value::scalar(10.0).apply(BinaryOp::Sub, &Value::scalar(4.0)).unwrap();
        assert_eq!(v, Value::scalar(6.0));
    }

    #[test]
    fn test_scalar_division_by_zero_is_infinite() {
        let v = Value::scalar(5.0).apply(BinaryOp::Div, &Value::scalar(0.0)).unwrap();
        assert_eq!(v.as_scalar(), Some(f64::INFINITY));

        let v = Value::scalar(0.0).apply(BinaryOp::Div, &Value::scalar(0.0)).unwrap();
        assert!(v.as_scalar().unwrap().is_nan());
    }

    #[test]
    fn test_series_scalar_broadcast_keeps_timestamps() {
        let s = series(&[(1, 10.0), (2, 20.0)]);
        let v = Value::Series(s.clone()).apply(BinaryOp::Mul, &Value::scalar(2.0)).unwrap();
        let out = v.as_series().unwrap();
        assert_eq!(out.values().collect::<Vec<_>>(), vec![20.0, 40.0]);
        assert_eq!(out.samples[0].time, at(1));
        assert_eq!(out.samples[1].time, at(2));
        assert_eq!(out.range, s.range);
    }

    #[test]
    fn test_scalar_series_preserves_operand_order() {
        let s = Value::Series(series(&[(1, 4.0), (2, 8.0)]));
        let v = Value::scalar(1.0).apply(BinaryOp::Sub, &s).unwrap();
        assert_eq!(v.as_series().unwrap().values().collect::<Vec<_>>(), vec![-3.0, -7.0]);

        let v = Value::scalar(16.0).apply(BinaryOp::Div, &s).unwrap();
        assert_eq!(v.as_series().unwrap().values().collect::<Vec<_>>(), vec![4.0, 2.0]);
    }

    #[test]
    fn test_series_series_aligns_by_position() {
        let l = Value::Series(series(&[(1, 10.0), (2, 20.0)]));
        // Different timestamps; alignment is positional.
        let r = Value::Series(series(&[(5, 1.0), (9, 0.0)]));
        let v = l.apply(BinaryOp::Div, &r).unwrap();
        let out = v.as_series().unwrap();
        assert_eq!(out.samples[0], Sample::new(at(1), 10.0));
        assert_eq!(out.samples[1].time, at(2));
        assert_eq!(out.samples[1].value, f64::INFINITY);
    }

    #[test]
    fn test_series_series_length_mismatch_fails() {
        let l = Value::Series(series(&[(1, 1.0), (2, 2.0), (3, 3.0)]));
        let r = Value::Series(series(&[(1, 1.0)]));
        assert_eq!(l.apply(BinaryOp::Add, &r), Err(MisalignedSeries { left: 3, right: 1 }));
    }

    #[test]
    fn test_value_serializes_with_kind() {
        let json = serde_json::to_value(Value::scalar(1.5)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "scalar", "value": 1.5}));
    }
}
