//! `$lookup`, `$graphLookup`, `$unionWith`, and `$facet`.
//!
//! Sub-pipelines recurse through [`Stage::encode`], so a lookup pipeline
//! can hold any stage, including further lookups.

use mill_codec::{DocumentWriter, EncodeContext, EncodeError};
use mill_query::Filter;

use crate::expression::Expression;

use super::{Stage, StageTarget};

/// `$lookup` in either its equality-join or pipeline form.
#[derive(Debug, Clone)]
pub struct Lookup {
    from: StageTarget,
    local_field: Option<String>,
    foreign_field: Option<String>,
    let_vars: Vec<(String, Expression)>,
    pipeline: Vec<Stage>,
    as_field: Option<String>,
}

pub fn lookup(collection: &str) -> Lookup {
    Lookup::new(StageTarget::Collection(collection.to_string()))
}

pub fn lookup_entity(entity: &str) -> Lookup {
    Lookup::new(StageTarget::Entity(entity.to_string()))
}

impl Lookup {
    fn new(from: StageTarget) -> Self {
        Lookup {
            from,
            local_field: None,
            foreign_field: None,
            let_vars: Vec::new(),
            pipeline: Vec::new(),
            as_field: None,
        }
    }

    pub fn local_field(mut self, field: &str) -> Self {
        self.local_field = Some(field.to_string());
        self
    }

    pub fn foreign_field(mut self, field: &str) -> Self {
        self.foreign_field = Some(field.to_string());
        self
    }

    pub fn let_var(mut self, name: &str, expression: impl Into<Expression>) -> Self {
        self.let_vars.push((name.to_string(), expression.into()));
        self
    }

    pub fn pipeline(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.pipeline.extend(stages);
        self
    }

    pub fn as_field(mut self, field: &str) -> Self {
        self.as_field = Some(field.to_string());
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let as_field = self.as_field.as_deref().ok_or_else(|| {
            EncodeError::InvalidArgument("$lookup requires an output field".into())
        })?;
        w.document(|w| {
            w.write("from", self.from.resolve(cx)?)?;
            if let Some(local) = &self.local_field {
                w.write("localField", local.as_str())?;
            }
            if let Some(foreign) = &self.foreign_field {
                w.write("foreignField", foreign.as_str())?;
            }
            if !self.let_vars.is_empty() {
                w.document_named("let", |w| {
                    for (name, expression) in &self.let_vars {
                        w.write_name(name)?;
                        expression.encode(w, cx)?;
                    }
                    Ok(())
                })?;
            }
            if !self.pipeline.is_empty() {
                encode_pipeline(w, cx, "pipeline", &self.pipeline)?;
            }
            w.write("as", as_field)?;
            Ok(())
        })
    }
}

impl From<Lookup> for Stage {
    fn from(s: Lookup) -> Self {
        Stage::Lookup(s)
    }
}

/// `$graphLookup` recursive traversal.
#[derive(Debug, Clone)]
pub struct GraphLookup {
    from: StageTarget,
    start_with: Expression,
    connect_from_field: String,
    connect_to_field: String,
    as_field: String,
    max_depth: Option<i64>,
    depth_field: Option<String>,
    restrict_search_with_match: Option<Filter>,
}

pub fn graph_lookup(
    collection: &str,
    start_with: impl Into<Expression>,
    connect_from_field: &str,
    connect_to_field: &str,
    as_field: &str,
) -> GraphLookup {
    GraphLookup::new(
        StageTarget::Collection(collection.to_string()),
        start_with.into(),
        connect_from_field,
        connect_to_field,
        as_field,
    )
}

pub fn graph_lookup_entity(
    entity: &str,
    start_with: impl Into<Expression>,
    connect_from_field: &str,
    connect_to_field: &str,
    as_field: &str,
) -> GraphLookup {
    GraphLookup::new(
        StageTarget::Entity(entity.to_string()),
        start_with.into(),
        connect_from_field,
        connect_to_field,
        as_field,
    )
}

impl GraphLookup {
    fn new(
        from: StageTarget,
        start_with: Expression,
        connect_from_field: &str,
        connect_to_field: &str,
        as_field: &str,
    ) -> Self {
        GraphLookup {
            from,
            start_with,
            connect_from_field: connect_from_field.to_string(),
            connect_to_field: connect_to_field.to_string(),
            as_field: as_field.to_string(),
            max_depth: None,
            depth_field: None,
            restrict_search_with_match: None,
        }
    }

    pub fn max_depth(mut self, depth: i64) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn depth_field(mut self, field: &str) -> Self {
        self.depth_field = Some(field.to_string());
        self
    }

    pub fn restrict_search_with_match(mut self, filter: Filter) -> Self {
        self.restrict_search_with_match = Some(filter);
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write("from", self.from.resolve(cx)?)?;
            w.write_name("startWith")?;
            self.start_with.encode(w, cx)?;
            w.write("connectFromField", self.connect_from_field.as_str())?;
            w.write("connectToField", self.connect_to_field.as_str())?;
            w.write("as", self.as_field.as_str())?;
            if let Some(depth) = self.max_depth {
                w.write("maxDepth", depth)?;
            }
            if let Some(field) = &self.depth_field {
                w.write("depthField", field.as_str())?;
            }
            if let Some(filter) = &self.restrict_search_with_match {
                w.write_name("restrictSearchWithMatch")?;
                filter.encode(w, cx)?;
            }
            Ok(())
        })
    }
}

impl From<GraphLookup> for Stage {
    fn from(s: GraphLookup) -> Self {
        Stage::GraphLookup(s)
    }
}

/// `$unionWith`. The pipeline key is omitted when empty; the payload is
/// always the document form.
#[derive(Debug, Clone)]
pub struct UnionWith {
    coll: StageTarget,
    pipeline: Vec<Stage>,
}

pub fn union_with(collection: &str) -> UnionWith {
    UnionWith {
        coll: StageTarget::Collection(collection.to_string()),
        pipeline: Vec::new(),
    }
}

pub fn union_with_entity(entity: &str) -> UnionWith {
    UnionWith {
        coll: StageTarget::Entity(entity.to_string()),
        pipeline: Vec::new(),
    }
}

impl UnionWith {
    pub fn pipeline(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.pipeline.extend(stages);
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.write("coll", self.coll.resolve(cx)?)?;
            if !self.pipeline.is_empty() {
                encode_pipeline(w, cx, "pipeline", &self.pipeline)?;
            }
            Ok(())
        })
    }
}

impl From<UnionWith> for Stage {
    fn from(s: UnionWith) -> Self {
        Stage::UnionWith(s)
    }
}

/// `$facet`: named sub-pipelines over the same input.
#[derive(Debug, Clone, Default)]
pub struct Facet {
    branches: Vec<(String, Vec<Stage>)>,
}

pub fn facet() -> Facet {
    Facet::default()
}

impl Facet {
    pub fn branch(mut self, name: &str, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.branches
            .push((name.to_string(), stages.into_iter().collect()));
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            for (name, stages) in &self.branches {
                encode_pipeline(w, cx, name, stages)?;
            }
            Ok(())
        })
    }
}

impl From<Facet> for Stage {
    fn from(s: Facet) -> Self {
        Stage::Facet(s)
    }
}

pub(crate) fn encode_pipeline(
    w: &mut DocumentWriter,
    cx: &EncodeContext<'_>,
    name: &str,
    stages: &[Stage],
) -> Result<(), EncodeError> {
    w.array_named(name, |w| {
        for stage in stages {
            stage.encode(w, cx)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use bson::{doc, Document};
    use mill_codec::{BsonCodec, PassthroughResolver, StaticResolver};

    use crate::expression::ops::{eq, sum};
    use crate::expression::{field, value};
    use crate::stage::{count, group, group_without_id, id, limit, match_, sort};

    use super::*;

    fn encode(stage: &Stage) -> Document {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        stage.to_document(&cx).unwrap()
    }

    #[test]
    fn lookup_equality_join() {
        let stage: Stage = lookup("inventory")
            .local_field("item")
            .foreign_field("sku")
            .as_field("stock")
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$lookup": {
                "from": "inventory",
                "localField": "item",
                "foreignField": "sku",
                "as": "stock"
            } }
        );
    }

    #[test]
    fn lookup_pipeline_form_recurses() {
        let stage: Stage = lookup("orders")
            .let_var("order_qty", field("qty"))
            .pipeline([
                match_(mill_query::expr(eq(field("qty"), field("$order_qty")))).into(),
                limit(1),
            ])
            .as_field("matched")
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$lookup": {
                "from": "orders",
                "let": { "order_qty": "$qty" },
                "pipeline": [
                    { "$match": { "$expr": { "$eq": ["$qty", "$$order_qty"] } } },
                    { "$limit": 1_i64 }
                ],
                "as": "matched"
            } }
        );
    }

    #[test]
    fn lookup_entity_resolves_collection_name() {
        let resolver = StaticResolver::new().entity("Order", "orders");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let stage: Stage = lookup_entity("Order")
            .local_field("order_id")
            .foreign_field("_id")
            .as_field("order")
            .into();
        let doc = stage.to_document(&cx).unwrap();
        assert_eq!(doc.get_document("$lookup").unwrap().get_str("from").unwrap(), "orders");
    }

    #[test]
    fn lookup_without_output_field_fails() {
        let stage: Stage = lookup("inventory").local_field("item").into();
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        assert!(matches!(
            stage.to_document(&cx),
            Err(EncodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn graph_lookup_orders_required_keys_first() {
        let stage: Stage = graph_lookup("employees", field("reportsTo"), "reportsTo", "name", "chain")
            .max_depth(3)
            .depth_field("level")
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$graphLookup": {
                "from": "employees",
                "startWith": "$reportsTo",
                "connectFromField": "reportsTo",
                "connectToField": "name",
                "as": "chain",
                "maxDepth": 3_i64,
                "depthField": "level"
            } }
        );
    }

    #[test]
    fn union_with_omits_empty_pipeline() {
        let stage: Stage = union_with("archive").into();
        assert_eq!(encode(&stage), doc! { "$unionWith": { "coll": "archive" } });
        let stage: Stage = union_with("archive").pipeline([limit(10)]).into();
        assert_eq!(
            encode(&stage),
            doc! { "$unionWith": { "coll": "archive", "pipeline": [{ "$limit": 10_i64 }] } }
        );
    }

    #[test]
    fn facet_runs_named_branches() {
        let stage: Stage = facet()
            .branch("by_author", [
                group(id(field("author"))).field("count", sum(value(1_i32))).into(),
                sort().descending("count").into(),
            ])
            .branch("total", [count("n")])
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$facet": {
                "by_author": [
                    { "$group": { "_id": "$author", "count": { "$sum": 1 } } },
                    { "$sort": { "count": -1 } }
                ],
                "total": [{ "$count": "n" }]
            } }
        );
    }

    #[test]
    fn graph_lookup_restricts_search_with_match() {
        let stage: Stage = graph_lookup("airports", field("nearestAirport"), "connects", "airport", "destinations")
            .restrict_search_with_match(mill_query::eq("country", "NZ"))
            .into();
        let doc = encode(&stage);
        let payload = doc.get_document("$graphLookup").unwrap();
        assert_eq!(
            payload.get_document("restrictSearchWithMatch").unwrap(),
            &doc! { "country": "NZ" }
        );
    }

    #[test]
    fn facet_branch_accepts_group_without_id() {
        let stage: Stage = facet()
            .branch("totals", [
                group_without_id().field("qty", sum(field("qty"))).into(),
            ])
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$facet": {
                "totals": [{ "$group": { "_id": null, "qty": { "$sum": "$qty" } } }]
            } }
        );
    }
}
