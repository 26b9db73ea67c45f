//! `$geoNear`.

use mill_codec::{DocumentWriter, EncodeContext, EncodeError};
use mill_query::Filter;

use super::Stage;

/// `$geoNear` from a GeoJSON point. Optional keys are written only when
/// set; `spherical` is never written as `false`.
#[derive(Debug, Clone)]
pub struct GeoNear {
    x: f64,
    y: f64,
    distance_field: Option<String>,
    spherical: bool,
    max_distance: Option<f64>,
    min_distance: Option<f64>,
    query: Option<Filter>,
    distance_multiplier: Option<f64>,
    include_locs: Option<String>,
    key: Option<String>,
}

pub fn geo_near(x: f64, y: f64) -> GeoNear {
    GeoNear {
        x,
        y,
        distance_field: None,
        spherical: false,
        max_distance: None,
        min_distance: None,
        query: None,
        distance_multiplier: None,
        include_locs: None,
        key: None,
    }
}

impl GeoNear {
    pub fn distance_field(mut self, field: &str) -> Self {
        self.distance_field = Some(field.to_string());
        self
    }

    pub fn spherical(mut self) -> Self {
        self.spherical = true;
        self
    }

    pub fn max_distance(mut self, meters: f64) -> Self {
        self.max_distance = Some(meters);
        self
    }

    pub fn min_distance(mut self, meters: f64) -> Self {
        self.min_distance = Some(meters);
        self
    }

    pub fn query(mut self, filter: Filter) -> Self {
        self.query = Some(filter);
        self
    }

    pub fn distance_multiplier(mut self, factor: f64) -> Self {
        self.distance_multiplier = Some(factor);
        self
    }

    pub fn include_locs(mut self, field: &str) -> Self {
        self.include_locs = Some(field.to_string());
        self
    }

    pub fn key(mut self, index: &str) -> Self {
        self.key = Some(index.to_string());
        self
    }

    pub(crate) fn encode_payload(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        w.document(|w| {
            w.document_named("near", |w| {
                w.write("type", "Point")?;
                w.array_named("coordinates", |w| {
                    w.write_value(self.x)?;
                    w.write_value(self.y)?;
                    Ok(())
                })
            })?;
            if let Some(field) = &self.distance_field {
                w.write("distanceField", field.as_str())?;
            }
            if self.spherical {
                w.write("spherical", true)?;
            }
            if let Some(meters) = self.max_distance {
                w.write("maxDistance", meters)?;
            }
            if let Some(meters) = self.min_distance {
                w.write("minDistance", meters)?;
            }
            if let Some(filter) = &self.query {
                w.write_name("query")?;
                filter.encode(w, cx)?;
            }
            if let Some(factor) = self.distance_multiplier {
                w.write("distanceMultiplier", factor)?;
            }
            if let Some(field) = &self.include_locs {
                w.write("includeLocs", field.as_str())?;
            }
            if let Some(index) = &self.key {
                w.write("key", index.as_str())?;
            }
            Ok(())
        })
    }
}

impl From<GeoNear> for Stage {
    fn from(s: GeoNear) -> Self {
        Stage::GeoNear(s)
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, Document};
    use mill_codec::{BsonCodec, PassthroughResolver};

    use super::*;

    fn encode(stage: &Stage) -> Document {
        let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
        stage.to_document(&cx).unwrap()
    }

    #[test]
    fn minimal_geo_near_writes_only_the_point() {
        assert_eq!(
            encode(&geo_near(-73.99, 40.71).into()),
            doc! { "$geoNear": {
                "near": { "type": "Point", "coordinates": [-73.99, 40.71] }
            } }
        );
    }

    #[test]
    fn options_are_written_only_when_set() {
        let stage: Stage = geo_near(-73.99, 40.71)
            .distance_field("dist")
            .spherical()
            .max_distance(2000.0)
            .query(mill_query::eq("category", "cafe"))
            .into();
        assert_eq!(
            encode(&stage),
            doc! { "$geoNear": {
                "near": { "type": "Point", "coordinates": [-73.99, 40.71] },
                "distanceField": "dist",
                "spherical": true,
                "maxDistance": 2000.0,
                "query": { "category": "cafe" }
            } }
        );
    }
}
