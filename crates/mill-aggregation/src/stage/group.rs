//! `$group`, `$bucket`, and `$bucketAuto`.

use bson::Bson;
use mill_codec::{DocumentWriter, EncodeContext, EncodeError};

use crate::expression::Expression;

use super::Stage;

/// The `_id` of a `$group`. `None` groups every document into a single
/// bucket and encodes as `"_id": null`.
#[derive(Debug, Clone)]
pub struct GroupId(Option<Expression>);

pub fn id(expression: impl Into<Expression>) -> GroupId {
    GroupId(Some(expression.into()))
}

/// `$group` with accumulator output fields.
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    fields: Vec<(String, Expression)>,
}

pub fn group(id: GroupId) -> Group {
    Group {
        id,
        fields: Vec::new(),
    }
}

pub fn group_without_id() -> Group {
    Group {
        id: GroupId(None),
        fields: Vec::new(),
    }
}

impl Group {
    pub fn field(mut self, name: &str, accumulator: impl Into<Expression>) -> Self {
        self.fields.push((name.to_string(), accumulator.into()));
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write_name("_id")?;
            match &self.id.0 {
                Some(expression) => expression.encode(w, cx)?,
                None => w.write_value(Bson::Null)?,
            }
            for (name, accumulator) in &self.fields {
                w.write_name(name)?;
                accumulator.encode(w, cx)?;
            }
            Ok(())
        })
    }
}

impl From<Group> for Stage {
    fn from(s: Group) -> Self {
        Stage::Group(s)
    }
}

/// `$bucket` over explicit boundaries.
#[derive(Debug, Clone)]
pub struct Bucket {
    group_by: Expression,
    boundaries: Vec<Bson>,
    default: Option<Bson>,
    output: Vec<(String, Expression)>,
}

pub fn bucket(group_by: impl Into<Expression>) -> Bucket {
    Bucket {
        group_by: group_by.into(),
        boundaries: Vec::new(),
        default: None,
        output: Vec::new(),
    }
}

impl Bucket {
    pub fn boundaries(mut self, boundaries: impl IntoIterator<Item = Bson>) -> Self {
        self.boundaries.extend(boundaries);
        self
    }

    pub fn default_bucket(mut self, default: impl Into<Bson>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn output(mut self, name: &str, accumulator: impl Into<Expression>) -> Self {
        self.output.push((name.to_string(), accumulator.into()));
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write_name("groupBy")?;
            self.group_by.encode(w, cx)?;
            w.array_named("boundaries", |w| {
                for boundary in &self.boundaries {
                    cx.codec.encode_value(w, boundary)?;
                }
                Ok(())
            })?;
            if let Some(default) = &self.default {
                w.write_name("default")?;
                cx.codec.encode_value(w, default)?;
            }
            encode_output(w, cx, &self.output)
        })
    }
}

impl From<Bucket> for Stage {
    fn from(s: Bucket) -> Self {
        Stage::Bucket(s)
    }
}

/// `$bucketAuto` with a target bucket count.
#[derive(Debug, Clone)]
pub struct BucketAuto {
    group_by: Expression,
    buckets: i32,
    granularity: Option<String>,
    output: Vec<(String, Expression)>,
}

pub fn bucket_auto(group_by: impl Into<Expression>, buckets: i32) -> BucketAuto {
    BucketAuto {
        group_by: group_by.into(),
        buckets,
        granularity: None,
        output: Vec::new(),
    }
}

impl BucketAuto {
    pub fn granularity(mut self, granularity: &str) -> Self {
        self.granularity = Some(granularity.to_string());
        self
    }

    pub fn output(mut self, name: &str, accumulator: impl Into<Expression>) -> Self {
        self.output.push((name.to_string(), accumulator.into()));
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write_name("groupBy")?;
            self.group_by.encode(w, cx)?;
            w.write("buckets", self.buckets)?;
            if let Some(granularity) = &self.granularity {
                w.write("granularity", granularity.as_str())?;
            }
            encode_output(w, cx, &self.output)
        })
    }
}

impl From<BucketAuto> for Stage {
    fn from(s: BucketAuto) -> Self {
        Stage::BucketAuto(s)
    }
}

fn encode_output(
    w: &mut DocumentWriter,
    cx: &EncodeContext<'_>,
    output: &[(String, Expression)],
) -> Result<(), EncodeError> {
    if output.is_empty() {
        return Ok(());
    }
    w.document_named("output", |w| {
        for (name, accumulator) in output {
            w.write_name(name)?;
            accumulator.encode(w, cx)?;
        }
        Ok(())
    })
}
