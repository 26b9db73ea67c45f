use mill_codec::{DocumentWriter, EncodeContext, EncodeError};

use super::{
    BitsFilter, ElemMatchFilter, ExprFilter, Filter, JsonSchemaFilter, LogicalFilter,
    RegexFilter, SimpleFilter, TextFilter,
};

impl Filter {
    /// Encode this filter as a complete predicate document at the writer's
    /// current value position.
    pub fn encode(
        &self,
        writer: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        writer.document(|w| self.encode_into(w, cx))
    }

    /// Write this filter's entry into an already-open document scope.
    ///
    /// This is the caller-controlled flattening hook: `$match` and
    /// `$elemMatch` write several filters into one document through it.
    pub fn encode_into(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        match self {
            Filter::Simple(f) => f.encode_entry(w, cx),
            Filter::Logical(f) => f.encode_entry(w, cx),
            Filter::Regex(f) => f.encode_entry(w, cx),
            Filter::Text(f) => f.encode_entry(w, cx),
            Filter::ElemMatch(f) => f.encode_entry(w, cx),
            Filter::Bits(f) => f.encode_entry(w, cx),
            Filter::Near(f) => f.encode_entry(w, cx),
            Filter::GeoWithin(f) => f.encode_entry(w, cx),
            Filter::GeoIntersects(f) => f.encode_entry(w, cx),
            Filter::JsonSchema(f) => f.encode_entry(w, cx),
            Filter::Expr(f) => f.encode_entry(w, cx),
        }
    }

    /// Convenience: encode into an owned document.
    pub fn to_document(&self, cx: &EncodeContext<'_>) -> Result<bson::Document, EncodeError> {
        let mut writer = DocumentWriter::new();
        self.encode(&mut writer, cx)?;
        Ok(writer.into_document()?)
    }
}

impl SimpleFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let Some(field) = &self.field else {
            // global operators ($where, $comment) have no field
            w.write_name(self.op)?;
            return cx.codec.encode_value(w, &self.value);
        };
        let path = field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        if self.op == "$eq" && !self.not {
            // bare equality: { field: value }, no operator key
            return cx.codec.encode_value(w, &self.value);
        }
        w.document(|w| {
            if self.not {
                w.document_named("$not", |w| {
                    w.write_name(self.op)?;
                    cx.codec.encode_value(w, &self.value)
                })
            } else {
                w.write_name(self.op)?;
                cx.codec.encode_value(w, &self.value)
            }
        })
    }
}

impl LogicalFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        if self.not {
            // MongoDB has no top-level $not; a negated composite becomes a
            // single-element $nor
            w.write_name("$nor")?;
            return w.array(|w| w.document(|w| self.encode_children(w, cx)));
        }
        self.encode_children(w, cx)
    }

    fn encode_children(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.write_name(self.op)?;
        w.array(|w| {
            for child in &self.children {
                w.document(|w| child.encode_into(w, cx))?;
            }
            Ok(())
        })
    }
}

impl RegexFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let path = self.field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        let write_inner = |w: &mut DocumentWriter| -> Result<(), EncodeError> {
            w.write("$regex", self.pattern.as_str())?;
            if !self.options.is_empty() {
                w.write("$options", self.options.as_str())?;
            }
            Ok(())
        };
        if self.not {
            w.document(|w| w.document_named("$not", write_inner))
        } else {
            w.document(write_inner)
        }
    }
}

impl TextFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        _cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document_named("$text", |w| {
            w.write("$search", self.search.as_str())?;
            if let Some(language) = &self.language {
                w.write("$language", language.as_str())?;
            }
            if self.case_sensitive {
                w.write("$caseSensitive", true)?;
            }
            if self.diacritic_sensitive {
                w.write("$diacriticSensitive", true)?;
            }
            Ok(())
        })
    }
}

impl ElemMatchFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let path = self.field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        let write_inner = |w: &mut DocumentWriter| -> Result<(), EncodeError> {
            w.document_named("$elemMatch", |w| {
                for child in &self.children {
                    child.encode_into(w, cx)?;
                }
                Ok(())
            })
        };
        if self.not {
            w.document(|w| w.document_named("$not", write_inner))
        } else {
            w.document(write_inner)
        }
    }
}

impl BitsFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let path = self.field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        w.document(|w| {
            if self.not {
                w.document_named("$not", |w| {
                    w.write_name(self.op)?;
                    cx.codec.encode_value(w, &self.value)
                })
            } else {
                w.write_name(self.op)?;
                cx.codec.encode_value(w, &self.value)
            }
        })
    }
}

impl JsonSchemaFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.write_name("$jsonSchema")?;
        cx.codec.encode_value(w, &self.schema.clone().into())
    }
}

impl ExprFilter {
    fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.write_name("$expr")?;
        self.value.encode_value_into(w, cx)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use mill_codec::{BsonCodec, EncodeContext, EncodeError, MappingError, PassthroughResolver, StaticResolver};

    use crate::filter::*;

    fn encode(filter: &Filter) -> bson::Document {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        filter.to_document(&cx).unwrap()
    }

    // ── Simple filters ──────────────────────────────────────────

    #[test]
    fn bare_eq_has_no_operator_key() {
        assert_eq!(encode(&eq("qty", 20_i32)), doc! { "qty": 20 });
    }

    #[test]
    fn other_operators_write_operator_document() {
        assert_eq!(encode(&gt("qty", 20_i32)), doc! { "qty": { "$gt": 20 } });
        assert_eq!(encode(&lte("qty", 20_i32)), doc! { "qty": { "$lte": 20 } });
        assert_eq!(encode(&ne("qty", 20_i32)), doc! { "qty": { "$ne": 20 } });
    }

    #[test]
    fn negated_exists_wraps_in_not() {
        assert_eq!(
            encode(&exists("x").not()),
            doc! { "x": { "$not": { "$exists": true } } }
        );
    }

    #[test]
    fn negated_eq_loses_bare_form() {
        assert_eq!(
            encode(&eq("qty", 20_i32).not()),
            doc! { "qty": { "$not": { "$eq": 20 } } }
        );
    }

    #[test]
    fn double_negation_cancels() {
        assert_eq!(encode(&eq("qty", 20_i32).not().not()), doc! { "qty": 20 });
    }

    #[test]
    fn in_writes_value_array() {
        assert_eq!(
            encode(&in_("status", ["a", "b"])),
            doc! { "status": { "$in": ["a", "b"] } }
        );
    }

    #[test]
    fn mod_rejects_zero_divisor() {
        assert!(matches!(
            mod_("qty", 0, 1),
            Err(EncodeError::InvalidArgument(_))
        ));
        assert_eq!(
            encode(&mod_("qty", 4, 0).unwrap()),
            doc! { "qty": { "$mod": [4_i64, 0_i64] } }
        );
    }

    #[test]
    fn fieldless_operators_write_at_top_level() {
        assert_eq!(
            encode(&where_("this.a > 1")),
            doc! { "$where": "this.a > 1" }
        );
        assert_eq!(encode(&comment("why")), doc! { "$comment": "why" });
    }

    // ── Logical composition ─────────────────────────────────────

    #[test]
    fn and_writes_child_documents() {
        assert_eq!(
            encode(&and([eq("a", 1_i32), eq("b", 2_i32)])),
            doc! { "$and": [{ "a": 1 }, { "b": 2 }] }
        );
    }

    #[test]
    fn nested_logical_composition() {
        assert_eq!(
            encode(&or([eq("status", "active"), and([gt("score", 90_i32), eq("verified", true)])])),
            doc! { "$or": [
                { "status": "active" },
                { "$and": [{ "score": { "$gt": 90 } }, { "verified": true }] }
            ] }
        );
    }

    #[test]
    fn negated_logical_becomes_nor() {
        assert_eq!(
            encode(&and([eq("a", 1_i32)]).not()),
            doc! { "$nor": [{ "$and": [{ "a": 1 }] }] }
        );
    }

    #[test]
    fn negated_text_becomes_nor() {
        assert_eq!(
            encode(&Filter::from(text("coffee")).not()),
            doc! { "$nor": [{ "$text": { "$search": "coffee" } }] }
        );
    }

    // ── Regex ───────────────────────────────────────────────────

    #[test]
    fn regex_with_options() {
        let filter: Filter = regex("name", "^john")
            .unwrap()
            .options("i")
            .unwrap()
            .into();
        assert_eq!(
            encode(&filter),
            doc! { "name": { "$regex": "^john", "$options": "i" } }
        );
    }

    #[test]
    fn regex_without_options_omits_key() {
        let filter: Filter = regex("name", "^john").unwrap().into();
        assert_eq!(encode(&filter), doc! { "name": { "$regex": "^john" } });
    }

    #[test]
    fn invalid_regex_flag_fails_at_construction() {
        let err = regex("name", "^john").unwrap().options("iz").unwrap_err();
        assert!(matches!(err, EncodeError::InvalidArgument(_)));
    }

    #[test]
    fn invalid_regex_pattern_fails_at_construction() {
        let err = regex("name", "(").unwrap_err();
        assert!(matches!(err, EncodeError::InvalidArgument(_)));
    }

    #[test]
    fn negated_regex_wraps_in_not() {
        let filter: Filter = regex("name", "^john").unwrap().not().into();
        assert_eq!(
            encode(&filter),
            doc! { "name": { "$not": { "$regex": "^john" } } }
        );
    }

    // ── Element / bitwise ───────────────────────────────────────

    #[test]
    fn elem_match_flattens_children() {
        assert_eq!(
            encode(&elem_match("results", [eq("product", "xyz"), gte("score", 8_i32)])),
            doc! { "results": { "$elemMatch": { "product": "xyz", "score": { "$gte": 8 } } } }
        );
    }

    #[test]
    fn negated_elem_match_wraps_in_not() {
        assert_eq!(
            encode(&elem_match("results", [eq("product", "xyz")]).not()),
            doc! { "results": { "$not": { "$elemMatch": { "product": "xyz" } } } }
        );
    }

    #[test]
    fn bits_all_set_mask() {
        assert_eq!(
            encode(&bits_all_set("flags", 50_i32)),
            doc! { "flags": { "$bitsAllSet": 50 } }
        );
    }

    #[test]
    fn bits_positions_array() {
        assert_eq!(
            encode(&bits_any_clear("flags", vec![1_i32, 5])),
            doc! { "flags": { "$bitsAnyClear": [1, 5] } }
        );
    }

    // ── Text / schema ───────────────────────────────────────────

    #[test]
    fn text_with_all_options() {
        let filter: Filter = text("coffee")
            .language("es")
            .case_sensitive()
            .diacritic_sensitive()
            .into();
        assert_eq!(
            encode(&filter),
            doc! { "$text": {
                "$search": "coffee",
                "$language": "es",
                "$caseSensitive": true,
                "$diacriticSensitive": true
            } }
        );
    }

    #[test]
    fn text_defaults_omit_toggles() {
        let filter: Filter = text("coffee").into();
        assert_eq!(encode(&filter), doc! { "$text": { "$search": "coffee" } });
    }

    #[test]
    fn json_schema_passthrough() {
        let filter = json_schema(doc! { "required": ["name"] });
        assert_eq!(
            encode(&filter),
            doc! { "$jsonSchema": { "required": ["name"] } }
        );
    }

    // ── Geospatial ──────────────────────────────────────────────

    #[test]
    fn geo_within_box_nests_two_levels() {
        assert_eq!(
            encode(&geo_within_box("loc", (0.0, 0.0), (100.0, 100.0))),
            doc! { "loc": { "$geoWithin": { "$box": [[0.0, 0.0], [100.0, 100.0]] } } }
        );
    }

    #[test]
    fn geo_within_polygon_requires_three_points() {
        assert!(matches!(
            geo_within_polygon("loc", vec![(0.0, 0.0), (1.0, 1.0)]),
            Err(EncodeError::InvalidArgument(_))
        ));
        let filter = geo_within_polygon("loc", vec![(0.0, 0.0), (3.0, 6.0), (6.0, 0.0)]).unwrap();
        assert_eq!(
            encode(&filter),
            doc! { "loc": { "$geoWithin": { "$polygon": [[0.0, 0.0], [3.0, 6.0], [6.0, 0.0]] } } }
        );
    }

    #[test]
    fn geo_within_center_sphere_appends_radius() {
        assert_eq!(
            encode(&geo_within_center_sphere("loc", (-88.0, 30.0), 0.1)),
            doc! { "loc": { "$geoWithin": { "$centerSphere": [[-88.0, 30.0], 0.1] } } }
        );
    }

    #[test]
    fn near_with_distances() {
        let filter: Filter = near("loc", -73.9667, 40.78)
            .max_distance(5000.0)
            .min_distance(1000.0)
            .into();
        assert_eq!(
            encode(&filter),
            doc! { "loc": { "$near": {
                "$geometry": { "type": "Point", "coordinates": [-73.9667, 40.78] },
                "$maxDistance": 5000.0,
                "$minDistance": 1000.0
            } } }
        );
    }

    #[test]
    fn near_sphere_without_distances() {
        let filter: Filter = near_sphere("loc", 1.0, 2.0).into();
        assert_eq!(
            encode(&filter),
            doc! { "loc": { "$nearSphere": {
                "$geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
            } } }
        );
    }

    #[test]
    fn geo_intersects_geometry() {
        let geometry = doc! { "type": "Polygon", "coordinates": [[[0, 0], [3, 6], [6, 1], [0, 0]]] };
        assert_eq!(
            encode(&geo_intersects("loc", geometry.clone())),
            doc! { "loc": { "$geoIntersects": { "$geometry": geometry } } }
        );
    }

    // ── Context propagation and resolution ──────────────────────

    #[test]
    fn entity_type_resolves_field_paths() {
        let resolver = StaticResolver::new()
            .entity("Book", "books")
            .field("Book", "author", "author_id");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let filter = eq("author", "melville").with_entity_type("Book");
        assert_eq!(
            filter.to_document(&cx).unwrap(),
            doc! { "author_id": "melville" }
        );
    }

    #[test]
    fn entity_type_propagates_to_logical_children() {
        let resolver = StaticResolver::new()
            .entity("Book", "books")
            .field("Book", "a", "stored_a")
            .field("Book", "b", "stored_b");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let filter = and([eq("a", 1_i32), eq("b", 2_i32)]).with_entity_type("Book");
        assert_eq!(
            filter.to_document(&cx).unwrap(),
            doc! { "$and": [{ "stored_a": 1 }, { "stored_b": 2 }] }
        );
    }

    #[test]
    fn validation_failure_surfaces_mapping_error() {
        let resolver = StaticResolver::new().entity("Book", "books");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let filter = eq("ghost", 1_i32)
            .with_entity_type("Book")
            .with_validation(true);
        assert!(matches!(
            filter.to_document(&cx),
            Err(EncodeError::Mapping(MappingError::UnknownField { .. }))
        ));
    }

    #[test]
    fn unvalidated_unknown_field_passes_through() {
        let resolver = StaticResolver::new().entity("Book", "books");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let filter = eq("ghost", 1_i32).with_entity_type("Book");
        assert_eq!(filter.to_document(&cx).unwrap(), doc! { "ghost": 1 });
    }

    #[test]
    fn repeated_encode_is_identical() {
        let resolver = StaticResolver::new()
            .entity("Book", "books")
            .field("Book", "author", "author_id");
        let cx = EncodeContext::new(&resolver, &BsonCodec);
        let filter = and([eq("author", "m"), gt("pages", 100_i32)]).with_entity_type("Book");
        let first = filter.to_document(&cx).unwrap();
        let second = filter.to_document(&cx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn clone_resets_resolution_cache() {
        let mapped = StaticResolver::new()
            .entity("Book", "books")
            .field("Book", "author", "author_id");
        let cx = EncodeContext::new(&mapped, &BsonCodec);
        let filter = eq("author", "m").with_entity_type("Book");
        assert_eq!(filter.to_document(&cx).unwrap(), doc! { "author_id": "m" });

        // the clone resolves independently against a different table
        let remapped = StaticResolver::new()
            .entity("Book", "books")
            .field("Book", "author", "writer");
        let cx2 = EncodeContext::new(&remapped, &BsonCodec);
        let clone = filter.clone();
        assert_eq!(clone.to_document(&cx2).unwrap(), doc! { "writer": "m" });
    }
}
