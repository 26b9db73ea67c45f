//! Pipeline stage model.
//!
//! Every stage encodes to exactly one single-key `{ "$stage": payload }`
//! document. The envelope lives here; each variant supplies its payload
//! encoder. Adding an operator means adding a variant, and the exhaustive
//! match below refuses to compile until its payload shape is written.

pub mod admin;
pub mod geo;
pub mod group;
pub mod lookup;
pub mod merge;
pub mod windows;

use bson::Document;
use mill_codec::{DocumentWriter, EncodeContext, EncodeError};
use mill_query::Filter;

use crate::expression::Expression;

pub use admin::{change_stream, coll_stats, current_op, ChangeStream, CollStats, CurrentOp};
pub use geo::{geo_near, GeoNear};
pub use group::{
    bucket, bucket_auto, group, group_without_id, id, Bucket, BucketAuto, Group, GroupId,
};
pub use lookup::{
    facet, graph_lookup, graph_lookup_entity, lookup, lookup_entity, union_with,
    union_with_entity, Facet, GraphLookup, Lookup, UnionWith,
};
pub use merge::{
    merge, merge_entity, out, out_entity, Merge, Out, WhenMatched, WhenNotMatched,
};
pub use windows::{
    densify, fill, set_window_fields, window_field, Densify, DensifyBounds, DensifyRange, Fill,
    SetWindowFields, Window, WindowField,
};

/// One aggregation pipeline stage.
#[derive(Debug, Clone)]
pub enum Stage {
    AddFields(FieldsStage),
    Bucket(Bucket),
    BucketAuto(BucketAuto),
    ChangeStream(ChangeStream),
    CollStats(CollStats),
    Count(String),
    CurrentOp(CurrentOp),
    Densify(Densify),
    Documents(Vec<Expression>),
    Facet(Facet),
    Fill(Fill),
    GeoNear(GeoNear),
    GraphLookup(GraphLookup),
    Group(Group),
    IndexStats,
    Limit(i64),
    Lookup(Lookup),
    Match(MatchStage),
    Merge(Merge),
    Out(Out),
    PlanCacheStats,
    Project(Projection),
    Redact(Expression),
    ReplaceRoot(Expression),
    ReplaceWith(Expression),
    Sample(i64),
    Set(FieldsStage),
    SetWindowFields(SetWindowFields),
    Skip(i64),
    Sort(SortStage),
    SortByCount(Expression),
    UnionWith(UnionWith),
    Unset(Vec<String>),
    Unwind(Unwind),
}

impl Stage {
    pub fn operator_name(&self) -> &'static str {
        match self {
            Stage::AddFields(_) => "$addFields",
            Stage::Bucket(_) => "$bucket",
            Stage::BucketAuto(_) => "$bucketAuto",
            Stage::ChangeStream(_) => "$changeStream",
            Stage::CollStats(_) => "$collStats",
            Stage::Count(_) => "$count",
            Stage::CurrentOp(_) => "$currentOp",
            Stage::Densify(_) => "$densify",
            Stage::Documents(_) => "$documents",
            Stage::Facet(_) => "$facet",
            Stage::Fill(_) => "$fill",
            Stage::GeoNear(_) => "$geoNear",
            Stage::GraphLookup(_) => "$graphLookup",
            Stage::Group(_) => "$group",
            Stage::IndexStats => "$indexStats",
            Stage::Limit(_) => "$limit",
            Stage::Lookup(_) => "$lookup",
            Stage::Match(_) => "$match",
            Stage::Merge(_) => "$merge",
            Stage::Out(_) => "$out",
            Stage::PlanCacheStats => "$planCacheStats",
            Stage::Project(_) => "$project",
            Stage::Redact(_) => "$redact",
            Stage::ReplaceRoot(_) => "$replaceRoot",
            Stage::ReplaceWith(_) => "$replaceWith",
            Stage::Sample(_) => "$sample",
            Stage::Set(_) => "$set",
            Stage::SetWindowFields(_) => "$setWindowFields",
            Stage::Skip(_) => "$skip",
            Stage::Sort(_) => "$sort",
            Stage::SortByCount(_) => "$sortByCount",
            Stage::UnionWith(_) => "$unionWith",
            Stage::Unset(_) => "$unset",
            Stage::Unwind(_) => "$unwind",
        }
    }

    /// Encode the full `{ "$stage": payload }` document at the writer's
    /// current value position.
    pub fn encode(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write_name(self.operator_name())?;
            self.encode_payload(w, cx)
        })
    }

    /// Encode into an owned [`Document`].
    pub fn to_document(&self, cx: &EncodeContext<'_>) -> Result<Document, EncodeError> {
        let mut w = DocumentWriter::new();
        self.encode(&mut w, cx)?;
        w.into_document().map_err(EncodeError::from)
    }

    fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        match self {
            Stage::AddFields(s) | Stage::Set(s) => s.encode_payload(w, cx),
            Stage::Bucket(s) => s.encode_payload(w, cx),
            Stage::BucketAuto(s) => s.encode_payload(w, cx),
            Stage::ChangeStream(s) => s.encode_payload(w),
            Stage::CollStats(s) => s.encode_payload(w),
            Stage::Count(field) => {
                w.write_value(field.as_str())?;
                Ok(())
            }
            Stage::CurrentOp(s) => s.encode_payload(w),
            Stage::Densify(s) => s.encode_payload(w, cx),
            Stage::Documents(items) => w.array(|w| {
                for item in items {
                    item.encode(w, cx)?;
                }
                Ok(())
            }),
            Stage::Facet(s) => s.encode_payload(w, cx),
            Stage::Fill(s) => s.encode_payload(w, cx),
            Stage::GeoNear(s) => s.encode_payload(w, cx),
            Stage::GraphLookup(s) => s.encode_payload(w, cx),
            Stage::Group(s) => s.encode_payload(w, cx),
            Stage::IndexStats | Stage::PlanCacheStats => w.document(|_| Ok(())),
            // scalar payloads, not documents
            Stage::Limit(n) | Stage::Skip(n) => {
                w.write_value(*n)?;
                Ok(())
            }
            Stage::Lookup(s) => s.encode_payload(w, cx),
            Stage::Match(s) => w.document(|w| s.filter.encode_into(w, cx)),
            Stage::Merge(s) => s.encode_payload(w, cx),
            Stage::Out(s) => s.encode_payload(w, cx),
            Stage::Project(s) => s.encode_payload(w, cx),
            Stage::Redact(e) | Stage::ReplaceWith(e) | Stage::SortByCount(e) => e.encode(w, cx),
            Stage::ReplaceRoot(e) => w.document(|w| {
                w.write_name("newRoot")?;
                e.encode(w, cx)
            }),
            Stage::Sample(n) => w.document(|w| {
                w.write("size", *n)?;
                Ok(())
            }),
            Stage::SetWindowFields(s) => s.encode_payload(w, cx),
            Stage::Sort(s) => s.encode_payload(w),
            Stage::UnionWith(s) => s.encode_payload(w, cx),
            // always the array form, even for a single field
            Stage::Unset(fields) => w.array(|w| {
                for field in fields {
                    w.write_value(field.as_str())?;
                }
                Ok(())
            }),
            Stage::Unwind(s) => s.encode_payload(w),
        }
    }
}

// ── Collection targets ──────────────────────────────────────────

/// Where a collection-addressing stage points: an explicit collection
/// name, or an entity type resolved through the context's resolver at
/// encode time. Separate constructors keep the two modes from ever being
/// set together.
#[derive(Debug, Clone)]
pub enum StageTarget {
    Collection(String),
    Entity(String),
}

impl StageTarget {
    pub(crate) fn resolve(&self, cx: &EncodeContext<'_>) -> Result<String, EncodeError> {
        match self {
            StageTarget::Collection(name) => Ok(name.clone()),
            StageTarget::Entity(entity) => Ok(cx.resolver.collection_name(entity)?),
        }
    }
}

// ── Simple stages ───────────────────────────────────────────────

/// `$addFields` / `$set`: an ordered document of computed fields.
#[derive(Debug, Clone)]
pub struct FieldsStage {
    op: FieldsOp,
    fields: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, Copy)]
enum FieldsOp {
    AddFields,
    Set,
}

pub fn add_fields() -> FieldsStage {
    FieldsStage {
        op: FieldsOp::AddFields,
        fields: Vec::new(),
    }
}

pub fn set() -> FieldsStage {
    FieldsStage {
        op: FieldsOp::Set,
        fields: Vec::new(),
    }
}

impl FieldsStage {
    pub fn field(mut self, name: &str, expression: impl Into<Expression>) -> Self {
        self.fields.push((name.to_string(), expression.into()));
        self
    }

    fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            for (name, expression) in &self.fields {
                w.write_name(name)?;
                expression.encode(w, cx)?;
            }
            Ok(())
        })
    }
}

impl From<FieldsStage> for Stage {
    fn from(s: FieldsStage) -> Self {
        match s.op {
            FieldsOp::AddFields => Stage::AddFields(s),
            FieldsOp::Set => Stage::Set(s),
        }
    }
}

/// `$match` around a query predicate.
#[derive(Debug, Clone)]
pub struct MatchStage {
    pub(crate) filter: Filter,
}

pub fn match_(filter: Filter) -> MatchStage {
    MatchStage { filter }
}

impl From<MatchStage> for Stage {
    fn from(s: MatchStage) -> Self {
        Stage::Match(s)
    }
}

/// `$sort`: ordered field/direction pairs.
#[derive(Debug, Clone, Default)]
pub struct SortStage {
    fields: Vec<(String, i32)>,
}

pub fn sort() -> SortStage {
    SortStage::default()
}

impl SortStage {
    pub fn ascending(mut self, field: &str) -> Self {
        self.fields.push((field.to_string(), 1));
        self
    }

    pub fn descending(mut self, field: &str) -> Self {
        self.fields.push((field.to_string(), -1));
        self
    }

    fn encode_payload(&self, w: &mut DocumentWriter) -> Result<(), EncodeError> {
        w.document(|w| {
            for (field, direction) in &self.fields {
                w.write(field, *direction)?;
            }
            Ok(())
        })
    }
}

impl From<SortStage> for Stage {
    fn from(s: SortStage) -> Self {
        Stage::Sort(s)
    }
}

/// `$project`: included, excluded, and computed fields in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    fields: Vec<(String, ProjectionValue)>,
}

#[derive(Debug, Clone)]
enum ProjectionValue {
    Include,
    Exclude,
    Computed(Expression),
}

pub fn project() -> Projection {
    Projection::default()
}

impl Projection {
    pub fn include(mut self, field: &str) -> Self {
        self.fields.push((field.to_string(), ProjectionValue::Include));
        self
    }

    pub fn exclude(mut self, field: &str) -> Self {
        self.fields.push((field.to_string(), ProjectionValue::Exclude));
        self
    }

    pub fn exclude_id(self) -> Self {
        self.exclude("_id")
    }

    pub fn computed(mut self, field: &str, expression: impl Into<Expression>) -> Self {
        self.fields
            .push((field.to_string(), ProjectionValue::Computed(expression.into())));
        self
    }

    fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            for (field, value) in &self.fields {
                match value {
                    ProjectionValue::Include => w.write(field, 1)?,
                    ProjectionValue::Exclude => w.write(field, 0)?,
                    ProjectionValue::Computed(e) => {
                        w.write_name(field)?;
                        e.encode(w, cx)?;
                    }
                }
            }
            Ok(())
        })
    }
}

impl From<Projection> for Stage {
    fn from(s: Projection) -> Self {
        Stage::Project(s)
    }
}

/// `$unwind`: always the document form.
#[derive(Debug, Clone)]
pub struct Unwind {
    path: String,
    include_array_index: Option<String>,
    preserve_null_and_empty_arrays: bool,
}

pub fn unwind(path: &str) -> Unwind {
    Unwind {
        path: path.to_string(),
        include_array_index: None,
        preserve_null_and_empty_arrays: false,
    }
}

impl Unwind {
    pub fn include_array_index(mut self, field: &str) -> Self {
        self.include_array_index = Some(field.to_string());
        self
    }

    pub fn preserve_null_and_empty_arrays(mut self) -> Self {
        self.preserve_null_and_empty_arrays = true;
        self
    }

    fn encode_payload(&self, w: &mut DocumentWriter) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write("path", format!("${}", self.path))?;
            if let Some(index) = &self.include_array_index {
                w.write("includeArrayIndex", index.as_str())?;
            }
            if self.preserve_null_and_empty_arrays {
                w.write("preserveNullAndEmptyArrays", true)?;
            }
            Ok(())
        })
    }
}

impl From<Unwind> for Stage {
    fn from(s: Unwind) -> Self {
        Stage::Unwind(s)
    }
}

// ── Scalar-payload constructors ─────────────────────────────────

pub fn count(field: &str) -> Stage {
    Stage::Count(field.to_string())
}

pub fn limit(n: i64) -> Stage {
    Stage::Limit(n)
}

pub fn skip(n: i64) -> Stage {
    Stage::Skip(n)
}

pub fn sample(size: i64) -> Stage {
    Stage::Sample(size)
}

pub fn documents(items: impl IntoIterator<Item = Expression>) -> Stage {
    Stage::Documents(items.into_iter().collect())
}

pub fn redact(expression: impl Into<Expression>) -> Stage {
    Stage::Redact(expression.into())
}

pub fn replace_root(expression: impl Into<Expression>) -> Stage {
    Stage::ReplaceRoot(expression.into())
}

pub fn replace_with(expression: impl Into<Expression>) -> Stage {
    Stage::ReplaceWith(expression.into())
}

pub fn sort_by_count(expression: impl Into<Expression>) -> Stage {
    Stage::SortByCount(expression.into())
}

pub fn unset(fields: impl IntoIterator<Item = String>) -> Stage {
    Stage::Unset(fields.into_iter().collect())
}

pub fn index_stats() -> Stage {
    Stage::IndexStats
}

pub fn plan_cache_stats() -> Stage {
    Stage::PlanCacheStats
}

#[cfg(test)]
mod tests {
    use bson::{doc, Bson};
    use mill_codec::{BsonCodec, PassthroughResolver, StaticResolver};

    use crate::expression::ops::{add, sum};
    use crate::expression::{field, value};
    use mill_query::eq;

    use super::*;

    fn encode(stage: &Stage) -> Document {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        stage.to_document(&cx).unwrap()
    }

    #[test]
    fn limit_is_a_scalar_payload() {
        assert_eq!(encode(&limit(5)), doc! { "$limit": 5_i64 });
    }

    #[test]
    fn skip_is_a_scalar_payload() {
        assert_eq!(encode(&skip(20)), doc! { "$skip": 20_i64 });
    }

    #[test]
    fn sample_wraps_size() {
        assert_eq!(encode(&sample(100)), doc! { "$sample": { "size": 100_i64 } });
    }

    #[test]
    fn count_names_the_output_field() {
        assert_eq!(encode(&count("total")), doc! { "$count": "total" });
    }

    #[test]
    fn add_fields_preserves_order() {
        let stage: Stage = add_fields()
            .field("total", add([field("price"), field("tax")]))
            .field("flat", value(1_i32))
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$addFields": { "total": { "$add": ["$price", "$tax"] }, "flat": 1 } }
        );
    }

    #[test]
    fn set_shares_the_fields_payload() {
        let stage: Stage = set().field("qty", value(0_i32)).into();
        assert_eq!(encode(&stage), doc! { "$set": { "qty": 0 } });
    }

    #[test]
    fn match_wraps_the_filter() {
        let stage: Stage = match_(eq("status", "active")).into();
        assert_eq!(encode(&stage), doc! { "$match": { "status": "active" } });
    }

    #[test]
    fn match_resolves_fields_through_the_resolver() {
        let resolver = StaticResolver::new()
            .entity("Book", "books")
            .field("Book", "author", "author_id");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let stage: Stage = match_(eq("author", "tolkien").with_entity_type("Book")).into();
        assert_eq!(
            stage.to_document(&cx).unwrap(),
            doc! { "$match": { "author_id": "tolkien" } }
        );
    }

    #[test]
    fn sort_writes_directions_in_order() {
        let stage: Stage = sort().ascending("_id").descending("score").into();
        assert_eq!(encode(&stage), doc! { "$sort": { "_id": 1, "score": -1 } });
    }

    #[test]
    fn project_mixes_includes_and_computed() {
        let stage: Stage = project()
            .exclude_id()
            .include("title")
            .computed("year", field("published.year"))
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$project": { "_id": 0, "title": 1, "year": "$published.year" } }
        );
    }

    #[test]
    fn unwind_always_takes_document_form() {
        assert_eq!(
            encode(&unwind("sizes").into()),
            doc! { "$unwind": { "path": "$sizes" } }
        );
        assert_eq!(
            encode(
                &unwind("sizes")
                    .include_array_index("idx")
                    .preserve_null_and_empty_arrays()
                    .into()
            ),
            doc! { "$unwind": {
                "path": "$sizes",
                "includeArrayIndex": "idx",
                "preserveNullAndEmptyArrays": true
            } }
        );
    }

    #[test]
    fn unset_is_always_an_array() {
        assert_eq!(
            encode(&unset(["draft".to_string()])),
            doc! { "$unset": ["draft"] }
        );
    }

    #[test]
    fn replace_root_nests_new_root() {
        assert_eq!(
            encode(&replace_root(field("detail"))),
            doc! { "$replaceRoot": { "newRoot": "$detail" } }
        );
    }

    #[test]
    fn replace_with_takes_the_expression_directly() {
        assert_eq!(
            encode(&replace_with(field("detail"))),
            doc! { "$replaceWith": "$detail" }
        );
    }

    #[test]
    fn documents_encodes_expression_array() {
        let stage = documents([value(doc! { "a": 1 }), value(doc! { "a": 2 })]);
        assert_eq!(
            encode(&stage),
            doc! { "$documents": [{ "a": 1 }, { "a": 2 }] }
        );
    }

    #[test]
    fn diagnostic_stages_take_empty_documents() {
        assert_eq!(encode(&index_stats()), doc! { "$indexStats": {} });
        assert_eq!(encode(&plan_cache_stats()), doc! { "$planCacheStats": {} });
    }

    #[test]
    fn sort_by_count_takes_an_expression() {
        assert_eq!(
            encode(&sort_by_count(field("tags"))),
            doc! { "$sortByCount": "$tags" }
        );
    }

    #[test]
    fn repeated_encode_is_identical() {
        let stage: Stage = group(id(field("author")))
            .field("count", sum(value(1_i32)))
            .into();
        let a = encode(&stage);
        let b = encode(&stage);
        assert_eq!(Bson::Document(a), Bson::Document(b));
    }
}
