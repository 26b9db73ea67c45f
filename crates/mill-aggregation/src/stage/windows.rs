//! `$setWindowFields`, `$densify`, and `$fill`.

use bson::Bson;
use mill_codec::{DocumentWriter, EncodeContext, EncodeError};

use crate::expression::Expression;

use super::Stage;

/// One `$setWindowFields` output field: a window function plus an
/// optional `window` bounds document merged alongside it.
#[derive(Debug, Clone)]
pub struct WindowField {
    name: String,
    function: Expression,
    window: Option<Window>,
}

pub fn window_field(name: &str, function: impl Into<Expression>) -> WindowField {
    WindowField {
        name: name.to_string(),
        function: function.into(),
        window: None,
    }
}

impl WindowField {
    pub fn documents_window(mut self, lower: impl Into<Bson>, upper: impl Into<Bson>) -> Self {
        self.window_mut().documents = Some((lower.into(), upper.into()));
        self
    }

    pub fn range_window(mut self, lower: impl Into<Bson>, upper: impl Into<Bson>) -> Self {
        self.window_mut().range = Some((lower.into(), upper.into()));
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.window_mut().unit = Some(unit.to_string());
        self
    }

    fn window_mut(&mut self) -> &mut Window {
        self.window.get_or_insert_with(Window::default)
    }

    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document_named(&self.name, |w| {
            self.function.encode_entry(w, cx)?;
            if let Some(window) = &self.window {
                window.encode_entry(w)?;
            }
            Ok(())
        })
    }
}

/// Window bounds. Bounds are raw BSON so `"unbounded"`, `"current"`, and
/// numeric offsets all pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct Window {
    documents: Option<(Bson, Bson)>,
    range: Option<(Bson, Bson)>,
    unit: Option<String>,
}

impl Window {
    fn encode_entry(&self, w: &mut DocumentWriter) -> Result<(), EncodeError> {
        w.document_named("window", |w| {
            if let Some((lower, upper)) = &self.documents {
                w.array_named("documents", |w| {
                    w.write_value(lower.clone())?;
                    w.write_value(upper.clone())?;
                    Ok(())
                })?;
            }
            if let Some((lower, upper)) = &self.range {
                w.array_named("range", |w| {
                    w.write_value(lower.clone())?;
                    w.write_value(upper.clone())?;
                    Ok(())
                })?;
            }
            if let Some(unit) = &self.unit {
                w.write("unit", unit.as_str())?;
            }
            Ok(())
        })
    }
}

/// `$setWindowFields`.
#[derive(Debug, Clone, Default)]
pub struct SetWindowFields {
    partition_by: Option<Expression>,
    sort_by: Vec<(String, i32)>,
    output: Vec<WindowField>,
}

pub fn set_window_fields() -> SetWindowFields {
    SetWindowFields::default()
}

impl SetWindowFields {
    pub fn partition_by(mut self, expression: impl Into<Expression>) -> Self {
        self.partition_by = Some(expression.into());
        self
    }

    pub fn sort_ascending(mut self, field: &str) -> Self {
        self.sort_by.push((field.to_string(), 1));
        self
    }

    pub fn sort_descending(mut self, field: &str) -> Self {
        self.sort_by.push((field.to_string(), -1));
        self
    }

    pub fn output(mut self, field: WindowField) -> Self {
        self.output.push(field);
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            if let Some(partition_by) = &self.partition_by {
                w.write_name("partitionBy")?;
                partition_by.encode(w, cx)?;
            }
            if !self.sort_by.is_empty() {
                w.document_named("sortBy", |w| {
                    for (field, direction) in &self.sort_by {
                        w.write(field, *direction)?;
                    }
                    Ok(())
                })?;
            }
            w.document_named("output", |w| {
                for field in &self.output {
                    field.encode_entry(w, cx)?;
                }
                Ok(())
            })
        })
    }
}

impl From<SetWindowFields> for Stage {
    fn from(s: SetWindowFields) -> Self {
        Stage::SetWindowFields(s)
    }
}

// ── $densify ────────────────────────────────────────────────────

/// The `bounds` of a densify range.
#[derive(Debug, Clone)]
pub enum DensifyBounds {
    Full,
    Partition,
    Interval(Bson, Bson),
}

/// A densify `range`: step, optional unit, and bounds.
#[derive(Debug, Clone)]
pub struct DensifyRange {
    step: Bson,
    unit: Option<String>,
    bounds: DensifyBounds,
}

impl DensifyRange {
    pub fn full(step: impl Into<Bson>) -> Self {
        DensifyRange {
            step: step.into(),
            unit: None,
            bounds: DensifyBounds::Full,
        }
    }

    pub fn partition(step: impl Into<Bson>) -> Self {
        DensifyRange {
            step: step.into(),
            unit: None,
            bounds: DensifyBounds::Partition,
        }
    }

    pub fn interval(step: impl Into<Bson>, lower: impl Into<Bson>, upper: impl Into<Bson>) -> Self {
        DensifyRange {
            step: step.into(),
            unit: None,
            bounds: DensifyBounds::Interval(lower.into(), upper.into()),
        }
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// `$densify`.
#[derive(Debug, Clone)]
pub struct Densify {
    field: String,
    partition_by_fields: Vec<String>,
    range: DensifyRange,
}

pub fn densify(field: &str, range: DensifyRange) -> Densify {
    Densify {
        field: field.to_string(),
        partition_by_fields: Vec::new(),
        range,
    }
}

impl Densify {
    pub fn partition_by_field(mut self, field: &str) -> Self {
        self.partition_by_fields.push(field.to_string());
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write("field", self.field.as_str())?;
            if !self.partition_by_fields.is_empty() {
                w.array_named("partitionByFields", |w| {
                    for field in &self.partition_by_fields {
                        w.write_value(field.as_str())?;
                    }
                    Ok(())
                })?;
            }
            w.document_named("range", |w| {
                w.write_name("step")?;
                cx.codec.encode_value(w, &self.range.step)?;
                if let Some(unit) = &self.range.unit {
                    w.write("unit", unit.as_str())?;
                }
                match &self.range.bounds {
                    DensifyBounds::Full => w.write("bounds", "full")?,
                    DensifyBounds::Partition => w.write("bounds", "partition")?,
                    DensifyBounds::Interval(lower, upper) => {
                        w.array_named("bounds", |w| {
                            cx.codec.encode_value(w, lower)?;
                            cx.codec.encode_value(w, upper)?;
                            Ok(())
                        })?;
                    }
                }
                Ok(())
            })
        })
    }
}

impl From<Densify> for Stage {
    fn from(s: Densify) -> Self {
        Stage::Densify(s)
    }
}

// ── $fill ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum FillRule {
    Value(Expression),
    Method(String),
}

/// `$fill`.
#[derive(Debug, Clone, Default)]
pub struct Fill {
    partition_by: Option<Expression>,
    partition_by_fields: Vec<String>,
    sort_by: Vec<(String, i32)>,
    output: Vec<(String, FillRule)>,
}

pub fn fill() -> Fill {
    Fill::default()
}

impl Fill {
    pub fn partition_by(mut self, expression: impl Into<Expression>) -> Self {
        self.partition_by = Some(expression.into());
        self
    }

    pub fn partition_by_field(mut self, field: &str) -> Self {
        self.partition_by_fields.push(field.to_string());
        self
    }

    pub fn sort_ascending(mut self, field: &str) -> Self {
        self.sort_by.push((field.to_string(), 1));
        self
    }

    pub fn sort_descending(mut self, field: &str) -> Self {
        self.sort_by.push((field.to_string(), -1));
        self
    }

    /// Fill the field with a constant or computed value.
    pub fn output_value(mut self, field: &str, value: impl Into<Expression>) -> Self {
        self.output
            .push((field.to_string(), FillRule::Value(value.into())));
        self
    }

    /// Fill the field by method, `"linear"` or `"locf"`.
    pub fn output_method(mut self, field: &str, method: &str) -> Self {
        self.output
            .push((field.to_string(), FillRule::Method(method.to_string())));
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            if let Some(partition_by) = &self.partition_by {
                w.write_name("partitionBy")?;
                partition_by.encode(w, cx)?;
            }
            if !self.partition_by_fields.is_empty() {
                w.array_named("partitionByFields", |w| {
                    for field in &self.partition_by_fields {
                        w.write_value(field.as_str())?;
                    }
                    Ok(())
                })?;
            }
            if !self.sort_by.is_empty() {
                w.document_named("sortBy", |w| {
                    for (field, direction) in &self.sort_by {
                        w.write(field, *direction)?;
                    }
                    Ok(())
                })?;
            }
            w.document_named("output", |w| {
                for (field, rule) in &self.output {
                    w.document_named(field, |w| match rule {
                        FillRule::Value(value) => {
                            w.write_name("value")?;
                            value.encode(w, cx)
                        }
                        FillRule::Method(method) => {
                            w.write("method", method.as_str())?;
                            Ok(())
                        }
                    })?;
                }
                Ok(())
            })
        })
    }
}

impl From<Fill> for Stage {
    fn from(s: Fill) -> Self {
        Stage::Fill(s)
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, Document};
    use mill_codec::{BsonCodec, PassthroughResolver};

    use crate::expression::ops::{dense_rank, shift, sum};
    use crate::expression::{field, value};

    use super::*;

    fn encode(stage: &Stage) -> Document {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        stage.to_document(&cx).unwrap()
    }

    #[test]
    fn window_function_merges_window_bounds() {
        let stage: Stage = set_window_fields()
            .partition_by(field("state"))
            .sort_ascending("date")
            .output(
                window_field("running", sum(field("qty")))
                    .documents_window("unbounded", "current"),
            )
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$setWindowFields": {
                "partitionBy": "$state",
                "sortBy": { "date": 1 },
                "output": {
                    "running": {
                        "$sum": "$qty",
                        "window": { "documents": ["unbounded", "current"] }
                    }
                }
            } }
        );
    }

    #[test]
    fn rank_style_functions_take_empty_documents() {
        let stage: Stage = set_window_fields()
            .sort_descending("score")
            .output(window_field("place", dense_rank()))
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$setWindowFields": {
                "sortBy": { "score": -1 },
                "output": { "place": { "$denseRank": {} } }
            } }
        );
    }

    #[test]
    fn shift_inside_window_output() {
        let stage: Stage = set_window_fields()
            .sort_ascending("date")
            .output(window_field(
                "previous",
                shift(field("qty"), -1).default_(value(0_i32)),
            ))
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$setWindowFields": {
                "sortBy": { "date": 1 },
                "output": {
                    "previous": { "$shift": { "output": "$qty", "by": -1_i64, "default": 0 } }
                }
            } }
        );
    }

    #[test]
    fn range_window_with_unit() {
        let stage: Stage = set_window_fields()
            .sort_ascending("ts")
            .output(
                window_field("avg", sum(field("qty")))
                    .range_window(-1, 0)
                    .unit("hour"),
            )
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$setWindowFields": {
                "sortBy": { "ts": 1 },
                "output": {
                    "avg": {
                        "$sum": "$qty",
                        "window": { "range": [-1, 0], "unit": "hour" }
                    }
                }
            } }
        );
    }

    #[test]
    fn densify_full_range() {
        let stage: Stage = densify("ts", DensifyRange::full(1).unit("hour")).into();
        assert_eq!(
            encode(&stage),
            doc! { "$densify": {
                "field": "ts",
                "range": { "step": 1, "unit": "hour", "bounds": "full" }
            } }
        );
    }

    #[test]
    fn densify_interval_bounds_are_an_array() {
        let stage: Stage = densify("altitude", DensifyRange::interval(200, 0, 9000))
            .partition_by_field("variety")
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$densify": {
                "field": "altitude",
                "partitionByFields": ["variety"],
                "range": { "step": 200, "bounds": [0, 9000] }
            } }
        );
    }

    #[test]
    fn fill_mixes_value_and_method_rules() {
        let stage: Stage = fill()
            .sort_ascending("date")
            .output_value("label", value("n/a"))
            .output_method("score", "locf")
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$fill": {
                "sortBy": { "date": 1 },
                "output": {
                    "label": { "value": "n/a" },
                    "score": { "method": "locf" }
                }
            } }
        );
    }
}
