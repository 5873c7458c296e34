// Built-in formula functions
//
// Aggregates reduce a single argument to a scalar and combine two or more
// arguments elementwise under the binary-operator alignment rules.
use crate::domain::series::{Sample, Series};
use crate::domain::value::{BinaryOp, MisalignedSeries, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("function '{function}' expects a {expected} argument, got a {found}")]
    ArgumentType {
        function: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Misaligned(#[from] MisalignedSeries),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Derivative,
    Aggregate(Aggregate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Avg,
    Sum,
    Min,
    Max,
}

impl Function {
    pub fn lookup(name: &str) -> Result<Self, FunctionError> {
        match name {
            "derivative" => Ok(Function::Derivative),
            "avg" => Ok(Function::Aggregate(Aggregate::Avg)),
            "sum" => Ok(Function::Aggregate(Aggregate::Sum)),
            "min" => Ok(Function::Aggregate(Aggregate::Min)),
            "max" => Ok(Function::Aggregate(Aggregate::Max)),
            _ => Err(FunctionError::UnknownFunction(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Derivative => "derivative",
            Function::Aggregate(agg) => agg.name(),
        }
    }

    /// Apply the function to already-evaluated arguments.
    pub fn call(self, args: Vec<Value>) -> Result<Value, FunctionError> {
        match self {
            Function::Derivative => {
                let [arg] = <[Value; 1]>::try_from(args).map_err(|args| FunctionError::Arity {
                    function: self.name(),
                    expected: 1,
                    found: args.len(),
                })?;
                match arg {
                    Value::Series(series) => Ok(Value::Series(derivative(&series))),
                    other => Err(FunctionError::ArgumentType {
                        function: self.name(),
                        expected: "series",
                        found: other.kind(),
                    }),
                }
            }
            Function::Aggregate(agg) => agg.call(args),
        }
    }
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Avg => "avg",
            Aggregate::Sum => "sum",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }

    fn call(self, args: Vec<Value>) -> Result<Value, FunctionError> {
        let count = args.len();
        let mut args = args.into_iter();
        let Some(first) = args.next() else {
            return Err(FunctionError::Arity {
                function: self.name(),
                expected: 1,
                found: 0,
            });
        };

        if count == 1 {
            return Ok(match first {
                Value::Series(series) => Value::scalar(self.reduce(series.values())),
                scalar => scalar,
            });
        }

        let combined = match self {
            Aggregate::Sum => args.try_fold(first, |acc, v| acc.apply(BinaryOp::Add, &v))?,
            Aggregate::Avg => args
                .try_fold(first, |acc, v| acc.apply(BinaryOp::Add, &v))?
                .apply(BinaryOp::Div, &Value::scalar(count as f64))?,
            Aggregate::Min => args.try_fold(first, |acc, v| acc.combine(&v, nan_aware(f64::min)))?,
            Aggregate::Max => args.try_fold(first, |acc, v| acc.combine(&v, nan_aware(f64::max)))?,
        };
        Ok(combined)
    }

    fn reduce(self, values: impl Iterator<Item = f64>) -> f64 {
        match self {
            Aggregate::Sum => values.sum(),
            Aggregate::Avg => {
                let (total, n) = values.fold((0.0, 0usize), |(t, n), v| (t + v, n + 1));
                total / n as f64
            }
            Aggregate::Min => values.reduce(nan_aware(f64::min)).unwrap_or(f64::NAN),
            Aggregate::Max => values.reduce(nan_aware(f64::max)).unwrap_or(f64::NAN),
        }
    }
}

/// `f64::min`/`f64::max` ignore NaN; aggregates propagate it like `sum` does.
fn nan_aware(f: fn(f64, f64) -> f64) -> impl Fn(f64, f64) -> f64 {
    move |a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { f(a, b) }
}

/// Backward difference per second; the first sample has no predecessor and is dropped.
fn derivative(series: &Series) -> Series {
    let samples = series
        .samples
        .windows(2)
        .map(|pair| {
            let dt = (pair[1].time - pair[0].time).num_milliseconds() as f64 / 1000.0;
            Sample::new(pair[1].time, (pair[1].value - pair[0].value) / dt)
        })
        .collect();
    Series::from_ordered(series.range, samples)
}
