//! `$merge` and `$out`.
//!
//! Both collapse to a bare collection-name string when no option needs
//! the document form. For `$merge` that is the documented MongoDB
//! shorthand: any option present forces the full document with `into`.

use mill_codec::{DocumentWriter, EncodeContext, EncodeError};

use crate::expression::Expression;

use super::lookup::encode_pipeline;
use super::{Stage, StageTarget};

/// Behavior when a merge candidate matches an existing document.
#[derive(Debug, Clone)]
pub enum WhenMatched {
    Replace,
    KeepExisting,
    Merge,
    Fail,
    Pipeline(Vec<Stage>),
}

/// Behavior when a merge candidate matches nothing.
#[derive(Debug, Clone, Copy)]
pub enum WhenNotMatched {
    Insert,
    Discard,
    Fail,
}

impl WhenNotMatched {
    fn keyword(&self) -> &'static str {
        match self {
            WhenNotMatched::Insert => "insert",
            WhenNotMatched::Discard => "discard",
            WhenNotMatched::Fail => "fail",
        }
    }
}

/// `$merge` into a target collection.
#[derive(Debug, Clone)]
pub struct Merge {
    into: StageTarget,
    database: Option<String>,
    on: Vec<String>,
    let_vars: Vec<(String, Expression)>,
    when_matched: Option<WhenMatched>,
    when_not_matched: Option<WhenNotMatched>,
}

pub fn merge(collection: &str) -> Merge {
    Merge::new(StageTarget::Collection(collection.to_string()))
}

pub fn merge_entity(entity: &str) -> Merge {
    Merge::new(StageTarget::Entity(entity.to_string()))
}

impl Merge {
    fn new(into: StageTarget) -> Self {
        Merge {
            into,
            database: None,
            on: Vec::new(),
            let_vars: Vec::new(),
            when_matched: None,
            when_not_matched: None,
        }
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    pub fn on(mut self, field: &str) -> Self {
        self.on.push(field.to_string());
        self
    }

    pub fn let_var(mut self, name: &str, expression: impl Into<Expression>) -> Self {
        self.let_vars.push((name.to_string(), expression.into()));
        self
    }

    pub fn when_matched(mut self, behavior: WhenMatched) -> Self {
        self.when_matched = Some(behavior);
        self
    }

    pub fn when_not_matched(mut self, behavior: WhenNotMatched) -> Self {
        self.when_not_matched = Some(behavior);
        self
    }

    fn all_defaults(&self) -> bool {
        self.database.is_none()
            && self.on.is_empty()
            && self.let_vars.is_empty()
            && self.when_matched.is_none()
            && self.when_not_matched.is_none()
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let collection = self.into.resolve(cx)?;
        if self.all_defaults() {
            w.write_value(collection)?;
            return Ok(());
        }
        w.document(|w| {
            match &self.database {
                Some(database) => w.document_named("into", |w| {
                    w.write("db", database.as_str())?;
                    w.write("coll", collection.as_str())?;
                    Ok(())
                })?,
                None => w.write("into", collection.as_str())?,
            }
            if !self.on.is_empty() {
                // always the array form, even for a single key
                w.array_named("on", |w| {
                    for field in &self.on {
                        w.write_value(field.as_str())?;
                    }
                    Ok(())
                })?;
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
            if let Some(when_matched) = &self.when_matched {
                match when_matched {
                    WhenMatched::Replace => w.write("whenMatched", "replace")?,
                    WhenMatched::KeepExisting => w.write("whenMatched", "keepExisting")?,
                    WhenMatched::Merge => w.write("whenMatched", "merge")?,
                    WhenMatched::Fail => w.write("whenMatched", "fail")?,
                    WhenMatched::Pipeline(stages) => {
                        encode_pipeline(w, cx, "whenMatched", stages)?
                    }
                }
            }
            if let Some(when_not_matched) = &self.when_not_matched {
                w.write("whenNotMatched", when_not_matched.keyword())?;
            }
            Ok(())
        })
    }
}

impl From<Merge> for Stage {
    fn from(s: Merge) -> Self {
        Stage::Merge(s)
    }
}

/// `$out`: a bare collection name, or `{ db, coll }` when a database is
/// given.
#[derive(Debug, Clone)]
pub struct Out {
    target: StageTarget,
    database: Option<String>,
}

pub fn out(collection: &str) -> Out {
    Out {
        target: StageTarget::Collection(collection.to_string()),
        database: None,
    }
}

pub fn out_entity(entity: &str) -> Out {
    Out {
        target: StageTarget::Entity(entity.to_string()),
        database: None,
    }
}

impl Out {
    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let collection = self.target.resolve(cx)?;
        match &self.database {
            Some(database) => w.document(|w| {
                w.write("db", database.as_str())?;
                w.write("coll", collection.as_str())?;
                Ok(())
            }),
            None => {
                w.write_value(collection)?;
                Ok(())
            }
        }
    }
}

impl From<Out> for Stage {
    fn from(s: Out) -> Self {
        Stage::Out(s)
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, Document};
    use mill_codec::{BsonCodec, PassthroughResolver, StaticResolver};

    use crate::expression::field;
    use crate::stage::set;

    use super::*;

    fn encode(stage: &Stage) -> Document {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        stage.to_document(&cx).unwrap()
    }

    #[test]
    fn merge_all_defaults_collapses_to_bare_string() {
        assert_eq!(encode(&merge("reports").into()), doc! { "$merge": "reports" });
    }

    #[test]
    fn merge_entity_resolves_then_collapses() {
        let resolver = StaticResolver::new().entity("Report", "reports");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let stage: Stage = merge_entity("Report").into();
        assert_eq!(stage.to_document(&cx).unwrap(), doc! { "$merge": "reports" });
    }

    #[test]
    fn merge_with_any_option_takes_document_form() {
        let stage: Stage = merge("reports")
            .on("date")
            .when_matched(WhenMatched::Replace)
            .when_not_matched(WhenNotMatched::Insert)
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$merge": {
                "into": "reports",
                "on": ["date"],
                "whenMatched": "replace",
                "whenNotMatched": "insert"
            } }
        );
    }

    #[test]
    fn merge_with_database_nests_into() {
        let stage: Stage = merge("reports").database("analytics").into();
        assert_eq!(
            encode(&stage),
            doc! { "$merge": { "into": { "db": "analytics", "coll": "reports" } } }
        );
    }

    #[test]
    fn merge_when_matched_pipeline_recurses() {
        let stage: Stage = merge("totals")
            .let_var("new", field("$ROOT"))
            .when_matched(WhenMatched::Pipeline(vec![
                set().field("qty", field("$new.qty")).into(),
            ]))
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$merge": {
                "into": "totals",
                "let": { "new": "$$ROOT" },
                "whenMatched": [{ "$set": { "qty": "$$new.qty" } }]
            } }
        );
    }

    #[test]
    fn out_is_a_bare_string_without_database() {
        assert_eq!(encode(&out("archive").into()), doc! { "$out": "archive" });
    }

    #[test]
    fn out_with_database_takes_document_form() {
        let stage: Stage = out("archive").database("cold").into();
        assert_eq!(
            encode(&stage),
            doc! { "$out": { "db": "cold", "coll": "archive" } }
        );
    }

    #[test]
    fn unknown_entity_surfaces_mapping_error() {
        let resolver = StaticResolver::new();
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let stage: Stage = merge_entity("Nope").into();
        assert!(matches!(
            stage.to_document(&cx),
            Err(EncodeError::Mapping(_))
        ));
    }
}
