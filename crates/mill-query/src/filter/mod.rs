pub(crate) mod encode;
pub mod geo;

use std::sync::{Arc, OnceLock};

use bson::{Bson, Document};
use mill_codec::{EncodeContext, EncodeError, EncodeValue};
use regex::Regex;

use geo::{GeoIntersectsFilter, GeoShape, GeoWithinFilter, NearFilter};

/// Entity context attached to a filter node.
///
/// Once set on a logical filter it is propagated to every descendant so
/// path resolution is consistent across the whole predicate tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilterContext {
    pub(crate) entity: Option<String>,
    pub(crate) validate: bool,
}

/// A logical field name with its lazily resolved storage path.
///
/// Resolution happens once, at first encode, through the context's
/// [`EntityResolver`](mill_codec::EntityResolver); the result is memoized in
/// a synchronized cell so repeated encodes of the same filter are
/// byte-identical. Only the path is memoized: values go through the
/// context's [`ValueCodec`](mill_codec::ValueCodec) on every encode, so
/// byte-identity additionally requires the codec to be deterministic
/// (as [`BsonCodec`](mill_codec::BsonCodec) is). Cloning resets the cell;
/// re-contextualizing a filter clears it.
#[derive(Debug)]
pub(crate) struct FieldName {
    name: String,
    resolved: OnceLock<String>,
}

impl Clone for FieldName {
    fn clone(&self) -> Self {
        FieldName {
            name: self.name.clone(),
            resolved: OnceLock::new(),
        }
    }
}

impl FieldName {
    fn new(name: impl Into<String>) -> Self {
        FieldName {
            name: name.into(),
            resolved: OnceLock::new(),
        }
    }

    pub(crate) fn resolve<'a>(
        &'a self,
        ctx: &FilterContext,
        cx: &EncodeContext<'_>,
    ) -> Result<&'a str, EncodeError> {
        if let Some(path) = self.resolved.get() {
            return Ok(path);
        }
        let path = match &ctx.entity {
            Some(entity) => cx.resolver.resolve_path(entity, &self.name, ctx.validate)?,
            None => self.name.clone(),
        };
        Ok(self.resolved.get_or_init(|| path))
    }

    fn reset(&mut self) {
        self.resolved = OnceLock::new();
    }
}

/// A query-predicate node.
///
/// Filters are built by the free constructor functions (`eq`, `and`,
/// `exists`, …), optionally re-contextualized with
/// [`with_entity_type`](Filter::with_entity_type) /
/// [`with_validation`](Filter::with_validation), and encoded into a BSON
/// predicate document. Encode-only: there is no decode surface.
#[derive(Debug, Clone)]
pub enum Filter {
    Simple(SimpleFilter),
    Logical(LogicalFilter),
    Regex(RegexFilter),
    Text(TextFilter),
    ElemMatch(ElemMatchFilter),
    Bits(BitsFilter),
    Near(NearFilter),
    GeoWithin(GeoWithinFilter),
    GeoIntersects(GeoIntersectsFilter),
    JsonSchema(JsonSchemaFilter),
    Expr(ExprFilter),
}

/// `{ field: { "$op": value } }`, or bare `{ field: value }` for a
/// non-negated `$eq`. Fieldless operators (`$where`, `$comment`) write
/// `{ "$op": value }` at the top level.
#[derive(Debug, Clone)]
pub struct SimpleFilter {
    pub(crate) op: &'static str,
    pub(crate) field: Option<FieldName>,
    pub(crate) value: Bson,
    pub(crate) not: bool,
    pub(crate) ctx: FilterContext,
}

/// `{ "$and"/"$or"/"$nor": [ {child}, … ] }`.
#[derive(Debug, Clone)]
pub struct LogicalFilter {
    pub(crate) op: &'static str,
    pub(crate) children: Vec<Filter>,
    pub(crate) not: bool,
    pub(crate) ctx: FilterContext,
}

/// `{ field: { "$regex": pattern, "$options": flags } }`.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    pub(crate) field: FieldName,
    pub(crate) pattern: String,
    pub(crate) options: String,
    pub(crate) not: bool,
    pub(crate) ctx: FilterContext,
}

/// `{ "$text": { "$search": …, … } }` — fieldless.
#[derive(Debug, Clone)]
pub struct TextFilter {
    pub(crate) search: String,
    pub(crate) language: Option<String>,
    pub(crate) case_sensitive: bool,
    pub(crate) diacritic_sensitive: bool,
}

/// `{ field: { "$elemMatch": { …child entries… } } }`.
#[derive(Debug, Clone)]
pub struct ElemMatchFilter {
    pub(crate) field: FieldName,
    pub(crate) children: Vec<Filter>,
    pub(crate) not: bool,
    pub(crate) ctx: FilterContext,
}

/// `{ field: { "$bitsAllSet": mask } }` and friends.
#[derive(Debug, Clone)]
pub struct BitsFilter {
    pub(crate) op: &'static str,
    pub(crate) field: FieldName,
    pub(crate) value: Bson,
    pub(crate) not: bool,
    pub(crate) ctx: FilterContext,
}

/// `{ "$jsonSchema": { … } }` — fieldless.
#[derive(Debug, Clone)]
pub struct JsonSchemaFilter {
    pub(crate) schema: Document,
}

/// `{ "$expr": <aggregation expression> }` — fieldless.
///
/// The payload is anything that implements [`EncodeValue`]; the aggregation
/// crate's `Expression` does.
#[derive(Debug, Clone)]
pub struct ExprFilter {
    pub(crate) value: Arc<dyn EncodeValue>,
}

// ── Comparison ──────────────────────────────────────────────────

fn simple(op: &'static str, field: &str, value: impl Into<Bson>) -> Filter {
    Filter::Simple(SimpleFilter {
        op,
        field: Some(FieldName::new(field)),
        value: value.into(),
        not: false,
        ctx: FilterContext::default(),
    })
}

pub fn eq(field: &str, value: impl Into<Bson>) -> Filter {
    simple("$eq", field, value)
}

pub fn ne(field: &str, value: impl Into<Bson>) -> Filter {
    simple("$ne", field, value)
}

pub fn gt(field: &str, value: impl Into<Bson>) -> Filter {
    simple("$gt", field, value)
}

pub fn gte(field: &str, value: impl Into<Bson>) -> Filter {
    simple("$gte", field, value)
}

pub fn lt(field: &str, value: impl Into<Bson>) -> Filter {
    simple("$lt", field, value)
}

pub fn lte(field: &str, value: impl Into<Bson>) -> Filter {
    simple("$lte", field, value)
}

fn array_value(values: impl IntoIterator<Item = impl Into<Bson>>) -> Bson {
    Bson::Array(values.into_iter().map(Into::into).collect())
}

pub fn in_(field: &str, values: impl IntoIterator<Item = impl Into<Bson>>) -> Filter {
    simple("$in", field, array_value(values))
}

pub fn nin(field: &str, values: impl IntoIterator<Item = impl Into<Bson>>) -> Filter {
    simple("$nin", field, array_value(values))
}

// ── Element / evaluation ────────────────────────────────────────

pub fn all(field: &str, values: impl IntoIterator<Item = impl Into<Bson>>) -> Filter {
    simple("$all", field, array_value(values))
}

pub fn size(field: &str, count: i64) -> Filter {
    simple("$size", field, count)
}

pub fn exists(field: &str) -> Filter {
    simple("$exists", field, true)
}

/// `$type` — accepts a single alias string or an array of aliases.
pub fn type_of(field: &str, types: impl Into<Bson>) -> Filter {
    simple("$type", field, types)
}

/// `$mod` — the divisor must be non-zero (fail fast).
pub fn mod_(field: &str, divisor: i64, remainder: i64) -> Result<Filter, EncodeError> {
    if divisor == 0 {
        return Err(EncodeError::InvalidArgument(
            "$mod divisor must be non-zero".into(),
        ));
    }
    Ok(simple("$mod", field, vec![divisor, remainder]))
}

pub fn where_(code: &str) -> Filter {
    Filter::Simple(SimpleFilter {
        op: "$where",
        field: None,
        value: Bson::String(code.to_string()),
        not: false,
        ctx: FilterContext::default(),
    })
}

pub fn comment(text: &str) -> Filter {
    Filter::Simple(SimpleFilter {
        op: "$comment",
        field: None,
        value: Bson::String(text.to_string()),
        not: false,
        ctx: FilterContext::default(),
    })
}

/// `$regex` — the pattern is validated here, flags when they are added,
/// so a malformed predicate never reaches encode time.
pub fn regex(field: &str, pattern: &str) -> Result<RegexFilter, EncodeError> {
    Regex::new(pattern)
        .map_err(|e| EncodeError::InvalidArgument(format!("invalid regex pattern: {e}")))?;
    Ok(RegexFilter {
        field: FieldName::new(field),
        pattern: pattern.to_string(),
        options: String::new(),
        not: false,
        ctx: FilterContext::default(),
    })
}

impl RegexFilter {
    /// Add regex flags. Only `i`, `m`, `s`, `x` are legal; anything else is
    /// an [`EncodeError::InvalidArgument`] here and now.
    pub fn options(mut self, flags: &str) -> Result<Self, EncodeError> {
        for c in flags.chars() {
            if !matches!(c, 'i' | 'm' | 's' | 'x') {
                return Err(EncodeError::InvalidArgument(format!(
                    "invalid regex flag: {c}"
                )));
            }
        }
        self.options = flags.to_string();
        Ok(self)
    }

    pub fn not(mut self) -> Self {
        self.not = !self.not;
        self
    }
}

impl From<RegexFilter> for Filter {
    fn from(f: RegexFilter) -> Self {
        Filter::Regex(f)
    }
}

// ── Text / schema / expression ──────────────────────────────────

pub fn text(search: &str) -> TextFilter {
    TextFilter {
        search: search.to_string(),
        language: None,
        case_sensitive: false,
        diacritic_sensitive: false,
    }
}

impl TextFilter {
    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn diacritic_sensitive(mut self) -> Self {
        self.diacritic_sensitive = true;
        self
    }
}

impl From<TextFilter> for Filter {
    fn from(f: TextFilter) -> Self {
        Filter::Text(f)
    }
}

pub fn json_schema(schema: Document) -> Filter {
    Filter::JsonSchema(JsonSchemaFilter { schema })
}

pub fn expr(value: impl EncodeValue + 'static) -> Filter {
    Filter::Expr(ExprFilter {
        value: Arc::new(value),
    })
}

// ── Logical composition ─────────────────────────────────────────

fn logical(op: &'static str, children: impl IntoIterator<Item = Filter>) -> Filter {
    Filter::Logical(LogicalFilter {
        op,
        children: children.into_iter().collect(),
        not: false,
        ctx: FilterContext::default(),
    })
}

pub fn and(children: impl IntoIterator<Item = Filter>) -> Filter {
    logical("$and", children)
}

pub fn or(children: impl IntoIterator<Item = Filter>) -> Filter {
    logical("$or", children)
}

pub fn nor(children: impl IntoIterator<Item = Filter>) -> Filter {
    logical("$nor", children)
}

pub fn elem_match(field: &str, children: impl IntoIterator<Item = Filter>) -> Filter {
    Filter::ElemMatch(ElemMatchFilter {
        field: FieldName::new(field),
        children: children.into_iter().collect(),
        not: false,
        ctx: FilterContext::default(),
    })
}

// ── Bitwise ─────────────────────────────────────────────────────

fn bits(op: &'static str, field: &str, mask: impl Into<Bson>) -> Filter {
    Filter::Bits(BitsFilter {
        op,
        field: FieldName::new(field),
        value: mask.into(),
        not: false,
        ctx: FilterContext::default(),
    })
}

pub fn bits_all_clear(field: &str, mask: impl Into<Bson>) -> Filter {
    bits("$bitsAllClear", field, mask)
}

pub fn bits_all_set(field: &str, mask: impl Into<Bson>) -> Filter {
    bits("$bitsAllSet", field, mask)
}

pub fn bits_any_clear(field: &str, mask: impl Into<Bson>) -> Filter {
    bits("$bitsAnyClear", field, mask)
}

pub fn bits_any_set(field: &str, mask: impl Into<Bson>) -> Filter {
    bits("$bitsAnySet", field, mask)
}

// ── Geospatial constructors ─────────────────────────────────────

pub fn near(field: &str, x: f64, y: f64) -> NearFilter {
    NearFilter::new(FieldName::new(field), x, y, false)
}

pub fn near_sphere(field: &str, x: f64, y: f64) -> NearFilter {
    NearFilter::new(FieldName::new(field), x, y, true)
}

pub fn geo_within_box(field: &str, bottom_left: (f64, f64), top_right: (f64, f64)) -> Filter {
    Filter::GeoWithin(GeoWithinFilter::new(
        FieldName::new(field),
        GeoShape::Box {
            bottom_left,
            top_right,
        },
    ))
}

/// `$geoWithin`/`$polygon` — at least three vertices (fail fast).
pub fn geo_within_polygon(field: &str, points: Vec<(f64, f64)>) -> Result<Filter, EncodeError> {
    if points.len() < 3 {
        return Err(EncodeError::InvalidArgument(format!(
            "$polygon requires at least 3 points, got {}",
            points.len()
        )));
    }
    Ok(Filter::GeoWithin(GeoWithinFilter::new(
        FieldName::new(field),
        GeoShape::Polygon(points),
    )))
}

pub fn geo_within_center(field: &str, center: (f64, f64), radius: f64) -> Filter {
    Filter::GeoWithin(GeoWithinFilter::new(
        FieldName::new(field),
        GeoShape::Center { center, radius },
    ))
}

pub fn geo_within_center_sphere(field: &str, center: (f64, f64), radius: f64) -> Filter {
    Filter::GeoWithin(GeoWithinFilter::new(
        FieldName::new(field),
        GeoShape::CenterSphere { center, radius },
    ))
}

/// `$geoWithin`/`$geometry` with a caller-supplied GeoJSON document.
pub fn geo_within(field: &str, geometry: Document) -> Filter {
    Filter::GeoWithin(GeoWithinFilter::new(
        FieldName::new(field),
        GeoShape::Geometry(geometry),
    ))
}

pub fn geo_intersects(field: &str, geometry: Document) -> Filter {
    Filter::GeoIntersects(GeoIntersectsFilter::new(FieldName::new(field), geometry))
}

// ── Node-level operations ───────────────────────────────────────

impl Filter {
    /// Negate this filter.
    ///
    /// Field-bearing filters toggle their `$not` wrapper. Kinds MongoDB
    /// cannot wrap in `$not` (logical composites, `$text`, geo queries, …)
    /// are wrapped in a single-element `$nor` instead, which is the
    /// wire-legal equivalent negation.
    pub fn not(self) -> Filter {
        match self {
            Filter::Simple(mut f) if f.field.is_some() => {
                f.not = !f.not;
                Filter::Simple(f)
            }
            Filter::Regex(f) => Filter::Regex(f.not()),
            Filter::Bits(mut f) => {
                f.not = !f.not;
                Filter::Bits(f)
            }
            Filter::ElemMatch(mut f) => {
                f.not = !f.not;
                Filter::ElemMatch(f)
            }
            Filter::Logical(mut f) => {
                f.not = !f.not;
                Filter::Logical(f)
            }
            other => nor([other]),
        }
    }

    /// Attach an entity type for field-path resolution. Propagates to every
    /// descendant and clears any memoized resolution.
    pub fn with_entity_type(mut self, entity: &str) -> Filter {
        self.set_context(Some(entity), None);
        self
    }

    /// Toggle resolver validation. Propagates to every descendant and
    /// clears any memoized resolution.
    pub fn with_validation(mut self, validate: bool) -> Filter {
        self.set_context(None, Some(validate));
        self
    }

    fn set_context(&mut self, entity: Option<&str>, validate: Option<bool>) {
        let apply = |ctx: &mut FilterContext| {
            if let Some(entity) = entity {
                ctx.entity = Some(entity.to_string());
            }
            if let Some(validate) = validate {
                ctx.validate = validate;
            }
        };
        match self {
            Filter::Simple(f) => {
                apply(&mut f.ctx);
                if let Some(field) = &mut f.field {
                    field.reset();
                }
            }
            Filter::Logical(f) => {
                apply(&mut f.ctx);
                for child in &mut f.children {
                    child.set_context(entity, validate);
                }
            }
            Filter::Regex(f) => {
                apply(&mut f.ctx);
                f.field.reset();
            }
            Filter::ElemMatch(f) => {
                apply(&mut f.ctx);
                f.field.reset();
                for child in &mut f.children {
                    child.set_context(entity, validate);
                }
            }
            Filter::Bits(f) => {
                apply(&mut f.ctx);
                f.field.reset();
            }
            Filter::Near(f) => {
                apply(&mut f.ctx);
                f.field.reset();
            }
            Filter::GeoWithin(f) => {
                apply(&mut f.ctx);
                f.field.reset();
            }
            Filter::GeoIntersects(f) => {
                apply(&mut f.ctx);
                f.field.reset();
            }
            // fieldless kinds carry no resolution context
            Filter::Text(_) | Filter::JsonSchema(_) | Filter::Expr(_) => {}
        }
    }
}
