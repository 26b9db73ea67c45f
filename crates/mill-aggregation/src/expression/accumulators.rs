//! Accumulator and window-function constructors.
//!
//! Most accumulators are ordinary single-operand operators. `$push` and
//! `$addToSet` additionally accept a field-built sub-document, so they
//! return [`AccumulatorExpr`] and make the two forms mutually exclusive.

use bson::{Bson, Document};

use super::ops::named;
use super::{AccumulatorExpr, Expression};

fn acc(name: &'static str, e: Expression) -> Expression {
    Expression::Operator {
        name,
        operands: vec![e],
    }
}

pub fn avg(e: Expression) -> Expression {
    acc("$avg", e)
}

pub fn sum(e: Expression) -> Expression {
    acc("$sum", e)
}

pub fn min(e: Expression) -> Expression {
    acc("$min", e)
}

pub fn max(e: Expression) -> Expression {
    acc("$max", e)
}

/// `{ "$count": {} }` — counts documents in the group.
pub fn count_all() -> Expression {
    Expression::Operator {
        name: "$count",
        operands: Vec::new(),
    }
}

pub fn std_dev_pop(e: Expression) -> Expression {
    acc("$stdDevPop", e)
}

pub fn std_dev_samp(e: Expression) -> Expression {
    acc("$stdDevSamp", e)
}

pub fn merge_objects(e: Expression) -> Expression {
    acc("$mergeObjects", e)
}

/// `$push` in either its expression or document form.
pub fn push() -> AccumulatorExpr {
    AccumulatorExpr {
        name: "$push",
        source: None,
        fields: Vec::new(),
    }
}

/// `$addToSet` in either its expression or document form.
pub fn add_to_set() -> AccumulatorExpr {
    AccumulatorExpr {
        name: "$addToSet",
        source: None,
        fields: Vec::new(),
    }
}

/// `$top` — the output of the group's first document under `sort_by`.
pub fn top(output: Expression, sort_by: Document) -> Expression {
    named(
        "$top",
        vec![
            ("output", Some(output)),
            ("sortBy", Some(Expression::Literal(Bson::Document(sort_by)))),
        ],
    )
}

/// `$bottom` — the output of the group's last document under `sort_by`.
pub fn bottom(output: Expression, sort_by: Document) -> Expression {
    named(
        "$bottom",
        vec![
            ("output", Some(output)),
            ("sortBy", Some(Expression::Literal(Bson::Document(sort_by)))),
        ],
    )
}

// ── Window functions ────────────────────────────────────────────

pub fn rank() -> Expression {
    Expression::Operator {
        name: "$rank",
        operands: Vec::new(),
    }
}

pub fn dense_rank() -> Expression {
    Expression::Operator {
        name: "$denseRank",
        operands: Vec::new(),
    }
}

pub fn document_number() -> Expression {
    Expression::Operator {
        name: "$documentNumber",
        operands: Vec::new(),
    }
}

/// `$shift` over a sorted window.
#[derive(Debug, Clone)]
pub struct Shift {
    output: Expression,
    by: i64,
    default: Option<Expression>,
}

pub fn shift(output: Expression, by: i64) -> Shift {
    Shift {
        output,
        by,
        default: None,
    }
}

impl Shift {
    pub fn default_(mut self, default: Expression) -> Self {
        self.default = Some(default);
        self
    }
}

impl From<Shift> for Expression {
    fn from(s: Shift) -> Self {
        named(
            "$shift",
            vec![
                ("output", Some(s.output)),
                ("by", Some(Expression::Literal(Bson::Int64(s.by)))),
                ("default", s.default),
            ],
        )
    }
}

/// `$derivative` / `$integral` over a time window.
#[derive(Debug, Clone)]
pub struct WindowRate {
    name: &'static str,
    input: Expression,
    unit: Option<String>,
}

pub fn derivative(input: Expression) -> WindowRate {
    WindowRate {
        name: "$derivative",
        input,
        unit: None,
    }
}

pub fn integral(input: Expression) -> WindowRate {
    WindowRate {
        name: "$integral",
        input,
        unit: None,
    }
}

impl WindowRate {
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

impl From<WindowRate> for Expression {
    fn from(r: WindowRate) -> Self {
        named(
            r.name,
            vec![
                ("input", Some(r.input)),
                (
                    "unit",
                    r.unit.map(|u| Expression::Literal(Bson::String(u))),
                ),
            ],
        )
    }
}

pub fn covariance_pop(a: Expression, b: Expression) -> Expression {
    Expression::Operator {
        name: "$covariancePop",
        operands: vec![a, b],
    }
}

pub fn covariance_samp(a: Expression, b: Expression) -> Expression {
    Expression::Operator {
        name: "$covarianceSamp",
        operands: vec![a, b],
    }
}

/// `$expMovingAvg` keyed by a document count.
pub fn exp_moving_avg(input: Expression, n: i32) -> Expression {
    named(
        "$expMovingAvg",
        vec![
            ("input", Some(input)),
            ("N", Some(Expression::Literal(Bson::Int32(n)))),
        ],
    )
}

/// `$expMovingAvg` keyed by a weighting factor.
pub fn exp_moving_avg_alpha(input: Expression, alpha: f64) -> Expression {
    named(
        "$expMovingAvg",
        vec![
            ("input", Some(input)),
            ("alpha", Some(Expression::Literal(Bson::Double(alpha)))),
        ],
    )
}

pub fn linear_fill(e: Expression) -> Expression {
    acc("$linearFill", e)
}

pub fn locf(e: Expression) -> Expression {
    acc("$locf", e)
}
