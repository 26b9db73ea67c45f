pub mod accumulators;
pub mod ops;

use bson::Bson;
use mill_codec::{DocumentWriter, EncodeContext, EncodeError, EncodeValue};

/// A value-producing node in MongoDB's aggregation expression language.
///
/// Expressions are pure values: built once, immutable, freely shareable,
/// and encoded by a single traversal. They never own pipeline-level
/// structure. Encode-only: there is no decode surface.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Opaque value, encoded through the context's value codec.
    Literal(Bson),
    /// Dotted field path, encoded as `"$path"`.
    Field(String),
    /// Array of sub-expressions.
    Array(Vec<Expression>),
    /// Ordered name/expression pairs, encoded as a nested document.
    Document(Vec<(String, Expression)>),
    /// `{ "$op": operand }` for one operand, `{ "$op": [ … ] }` for more.
    Operator {
        name: &'static str,
        operands: Vec<Expression>,
    },
    /// `{ "$op": { field: expr, … } }` — operators with named arguments.
    NamedOperator {
        name: &'static str,
        fields: Vec<(String, Expression)>,
    },
    /// `$indexOfBytes`-style operator with trailing positional optionals.
    IndexOf(IndexOf),
    /// `$push`/`$addToSet` dual-form accumulator.
    Accumulator(AccumulatorExpr),
}

/// `{ "$op": [haystack, needle, start?, end?] }`.
///
/// The positional tail stops at the last present value; nulls are never
/// emitted as placeholders.
#[derive(Debug, Clone)]
pub struct IndexOf {
    pub(crate) name: &'static str,
    pub(crate) haystack: Box<Expression>,
    pub(crate) needle: Box<Expression>,
    pub(crate) start: Option<Box<Expression>>,
    pub(crate) end: Option<Box<Expression>>,
}

impl IndexOf {
    pub fn start(mut self, start: Expression) -> Self {
        self.start = Some(Box::new(start));
        self
    }

    /// Set the exclusive end index. An end without a start is positional
    /// nonsense on the wire, so a start of `0` is filled in when absent.
    pub fn end(mut self, end: Expression) -> Self {
        if self.start.is_none() {
            self.start = Some(Box::new(Expression::Literal(Bson::Int32(0))));
        }
        self.end = Some(Box::new(end));
        self
    }
}

impl From<IndexOf> for Expression {
    fn from(op: IndexOf) -> Self {
        Expression::IndexOf(op)
    }
}

/// `$push`/`$addToSet`: either a single source expression or a field-built
/// sub-document, never both.
#[derive(Debug, Clone)]
pub struct AccumulatorExpr {
    pub(crate) name: &'static str,
    pub(crate) source: Option<Box<Expression>>,
    pub(crate) fields: Vec<(String, Expression)>,
}

impl AccumulatorExpr {
    /// Use the single-expression form. Conflicts with
    /// [`field`](AccumulatorExpr::field).
    pub fn value(mut self, source: Expression) -> Result<Self, EncodeError> {
        if !self.fields.is_empty() {
            return Err(EncodeError::ConflictingModes(self.name));
        }
        self.source = Some(Box::new(source));
        Ok(self)
    }

    /// Add a field to the document form. Conflicts with
    /// [`value`](AccumulatorExpr::value).
    pub fn field(mut self, name: &str, expression: Expression) -> Result<Self, EncodeError> {
        if self.source.is_some() {
            return Err(EncodeError::ConflictingModes(self.name));
        }
        self.fields.push((name.to_string(), expression));
        Ok(self)
    }
}

impl From<AccumulatorExpr> for Expression {
    fn from(acc: AccumulatorExpr) -> Self {
        Expression::Accumulator(acc)
    }
}

/// Ordered document of named expressions.
#[derive(Debug, Clone, Default)]
pub struct DocumentExpression {
    fields: Vec<(String, Expression)>,
}

impl DocumentExpression {
    pub fn field(mut self, name: &str, expression: Expression) -> Self {
        self.fields.push((name.to_string(), expression));
        self
    }
}

impl From<DocumentExpression> for Expression {
    fn from(doc: DocumentExpression) -> Self {
        Expression::Document(doc.fields)
    }
}

// ── Core constructors ───────────────────────────────────────────

/// A literal value, encoded through the value codec.
pub fn value(v: impl Into<Bson>) -> Expression {
    Expression::Literal(v.into())
}

/// A field reference, encoded as `"$path"`.
pub fn field(path: &str) -> Expression {
    Expression::Field(path.to_string())
}

/// An array of sub-expressions.
pub fn array(items: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Array(items.into_iter().collect())
}

/// An ordered document of named expressions.
pub fn document() -> DocumentExpression {
    DocumentExpression::default()
}

// ── Encoding ────────────────────────────────────────────────────

impl Expression {
    /// Encode this expression at the writer's current value position.
    pub fn encode(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        match self {
            Expression::Literal(v) => cx.codec.encode_value(w, v),
            Expression::Field(path) => {
                w.write_value(format!("${path}"))?;
                Ok(())
            }
            Expression::Array(items) => w.array(|w| {
                for item in items {
                    item.encode(w, cx)?;
                }
                Ok(())
            }),
            Expression::Document(fields) => w.document(|w| {
                for (name, expression) in fields {
                    w.write_name(name)?;
                    expression.encode(w, cx)?;
                }
                Ok(())
            }),
            Expression::Operator { .. }
            | Expression::NamedOperator { .. }
            | Expression::IndexOf(_)
            | Expression::Accumulator(_) => w.document(|w| self.encode_entry(w, cx)),
        }
    }

    /// Write this expression's `"$op": payload` pair into an already-open
    /// document. Only operator-shaped variants have an entry form; window
    /// output encoding relies on this to merge a `window` key alongside.
    pub(crate) fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        match self {
            Expression::Operator { name, operands } => {
                w.write_name(name)?;
                match operands.as_slice() {
                    // zero-operand operators take an empty document
                    [] => w.document(|_| Ok(())),
                    // single operand: no array wrapper
                    [operand] => operand.encode(w, cx),
                    many => w.array(|w| {
                        for operand in many {
                            operand.encode(w, cx)?;
                        }
                        Ok(())
                    }),
                }
            }
            Expression::NamedOperator { name, fields } => {
                w.write_name(name)?;
                w.document(|w| {
                    for (field, expression) in fields {
                        w.write_name(field)?;
                        expression.encode(w, cx)?;
                    }
                    Ok(())
                })
            }
            Expression::IndexOf(op) => {
                w.write_name(op.name)?;
                w.array(|w| {
                    op.haystack.encode(w, cx)?;
                    op.needle.encode(w, cx)?;
                    if let Some(start) = &op.start {
                        start.encode(w, cx)?;
                        if let Some(end) = &op.end {
                            end.encode(w, cx)?;
                        }
                    }
                    Ok(())
                })
            }
            Expression::Accumulator(acc) => {
                w.write_name(acc.name)?;
                match &acc.source {
                    Some(source) => source.encode(w, cx),
                    None if acc.fields.is_empty() => Err(EncodeError::InvalidArgument(format!(
                        "{} requires a source expression or fields",
                        acc.name
                    ))),
                    None => w.document(|w| {
                        for (field, expression) in &acc.fields {
                            w.write_name(field)?;
                            expression.encode(w, cx)?;
                        }
                        Ok(())
                    }),
                }
            }
            Expression::Literal(_)
            | Expression::Field(_)
            | Expression::Array(_)
            | Expression::Document(_) => Err(EncodeError::InvalidArgument(
                "expected an operator expression".into(),
            )),
        }
    }
}

impl EncodeValue for Expression {
    fn encode_value_into(
        &self,
        writer: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        self.encode(writer, cx)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use mill_codec::{BsonCodec, PassthroughResolver};

    use super::ops::*;
    use super::*;

    fn encode(expression: &Expression) -> Bson {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        let mut w = DocumentWriter::new();
        expression.encode(&mut w, &cx).unwrap();
        w.into_bson().unwrap()
    }

    #[test]
    fn literal_passes_through_codec() {
        assert_eq!(encode(&value(5_i32)), Bson::Int32(5));
    }

    #[test]
    fn field_reference_gets_dollar_prefix() {
        assert_eq!(encode(&field("author.name")), Bson::String("$author.name".into()));
    }

    #[test]
    fn single_operand_has_no_array_wrapper() {
        assert_eq!(
            encode(&abs(value(-3_i32))),
            Bson::Document(doc! { "$abs": -3 })
        );
    }

    #[test]
    fn two_operands_always_wrap_in_array() {
        assert_eq!(
            encode(&add([value(1_i32), value(2_i32)])),
            Bson::Document(doc! { "$add": [1, 2] })
        );
    }

    #[test]
    fn zero_operand_operator_takes_empty_document() {
        assert_eq!(encode(&rand()), Bson::Document(doc! { "$rand": {} }));
    }

    #[test]
    fn document_expression_preserves_order() {
        let e: Expression = document()
            .field("day", day_of_year(field("date")))
            .field("score", field("score"))
            .into();
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "day": { "$dayOfYear": "$date" }, "score": "$score" })
        );
    }

    #[test]
    fn index_of_stops_at_last_present_argument() {
        let base = index_of_bytes(field("item"), value("foo"));
        assert_eq!(
            encode(&base.clone().into()),
            Bson::Document(doc! { "$indexOfBytes": ["$item", "foo"] })
        );
        assert_eq!(
            encode(&base.clone().start(value(2_i32)).into()),
            Bson::Document(doc! { "$indexOfBytes": ["$item", "foo", 2] })
        );
        assert_eq!(
            encode(&base.start(value(2_i32)).end(value(9_i32)).into()),
            Bson::Document(doc! { "$indexOfBytes": ["$item", "foo", 2, 9] })
        );
    }

    #[test]
    fn index_of_end_without_start_fills_zero() {
        let e: Expression = index_of_array(field("xs"), value(7_i32))
            .end(value(4_i32))
            .into();
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$indexOfArray": ["$xs", 7, 0, 4] })
        );
    }

    #[test]
    fn push_single_form() {
        let e: Expression = push().value(field("qty")).unwrap().into();
        assert_eq!(encode(&e), Bson::Document(doc! { "$push": "$qty" }));
    }

    #[test]
    fn push_document_form() {
        let e: Expression = push()
            .field("item", field("item"))
            .unwrap()
            .field("qty", field("qty"))
            .unwrap()
            .into();
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$push": { "item": "$item", "qty": "$qty" } })
        );
    }

    #[test]
    fn push_conflicting_modes_fail_fast() {
        let err = push().value(field("a")).unwrap().field("b", field("b")).unwrap_err();
        assert_eq!(err, EncodeError::ConflictingModes("$push"));
        let err = add_to_set().field("a", field("a")).unwrap().value(field("b")).unwrap_err();
        assert_eq!(err, EncodeError::ConflictingModes("$addToSet"));
    }

    #[test]
    fn bare_push_is_rejected_at_encode() {
        let e: Expression = push().into();
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        let mut w = DocumentWriter::new();
        assert!(matches!(
            e.encode(&mut w, &cx),
            Err(EncodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn cond_uses_array_form() {
        let e = cond(eq(field("qty"), value(0_i32)), value("none"), value("some"));
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$cond": [{ "$eq": ["$qty", 0] }, "none", "some"] })
        );
    }

    #[test]
    fn switch_builds_named_branches() {
        let e: Expression = switch()
            .branch(gt(field("score"), value(90_i32)), value("a"))
            .branch(gt(field("score"), value(80_i32)), value("b"))
            .default_(value("f"))
            .into();
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$switch": {
                "branches": [
                    { "case": { "$gt": ["$score", 90] }, "then": "a" },
                    { "case": { "$gt": ["$score", 80] }, "then": "b" }
                ],
                "default": "f"
            } })
        );
    }

    #[test]
    fn filter_with_named_arguments() {
        let e: Expression = filter_(field("items"), gte(field("$item.price"), value(100_i32)))
            .as_name("item")
            .limit(value(5_i32))
            .into();
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$filter": {
                "input": "$items",
                "cond": { "$gte": ["$$item.price", 100] },
                "as": "item",
                "limit": 5
            } })
        );
    }

    #[test]
    fn date_to_string_omits_absent_options() {
        let e: Expression = date_to_string(field("date")).format("%Y-%m-%d").into();
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$dateToString": { "date": "$date", "format": "%Y-%m-%d" } })
        );
    }

    #[test]
    fn let_binds_variables() {
        let e: Expression = let_()
            .var("total", add([field("price"), field("tax")]))
            .in_(multiply([field("$total"), value(0.9_f64)]));
        assert_eq!(
            encode(&e),
            Bson::Document(doc! { "$let": {
                "vars": { "total": { "$add": ["$price", "$tax"] } },
                "in": { "$multiply": ["$$total", 0.9] }
            } })
        );
    }

    #[test]
    fn repeated_encode_is_identical() {
        let e = add([field("a"), value(1_i32)]);
        assert_eq!(encode(&e), encode(&e));
    }

    #[test]
    fn entry_position_rejects_non_operators() {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        let mut w = DocumentWriter::new();
        w.start_document().unwrap();
        assert!(matches!(
            field("a").encode_entry(&mut w, &cx),
            Err(EncodeError::InvalidArgument(_))
        ));
    }
}
