//! Geospatial filters.
//!
//! These bypass the generic `{ field: { "$op": value } }` shape: the wire
//! form nests two operator levels deep (`$geoWithin`/`$box`,
//! `$near`/`$geometry`) with hand-rolled coordinate arrays.

use bson::Document;
use mill_codec::{DocumentWriter, EncodeContext, EncodeError};

use super::{FieldName, Filter, FilterContext};

/// `$near` / `$nearSphere` against a GeoJSON point.
#[derive(Debug, Clone)]
pub struct NearFilter {
    pub(crate) field: FieldName,
    x: f64,
    y: f64,
    sphere: bool,
    max_distance: Option<f64>,
    min_distance: Option<f64>,
    pub(crate) ctx: FilterContext,
}

impl NearFilter {
    pub(crate) fn new(field: FieldName, x: f64, y: f64, sphere: bool) -> Self {
        NearFilter {
            field,
            x,
            y,
            sphere,
            max_distance: None,
            min_distance: None,
            ctx: FilterContext::default(),
        }
    }

    pub fn max_distance(mut self, meters: f64) -> Self {
        self.max_distance = Some(meters);
        self
    }

    pub fn min_distance(mut self, meters: f64) -> Self {
        self.min_distance = Some(meters);
        self
    }

    pub(crate) fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let path = self.field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        w.document(|w| {
            let op = if self.sphere { "$nearSphere" } else { "$near" };
            w.document_named(op, |w| {
                w.document_named("$geometry", |w| {
                    w.write("type", "Point")?;
                    w.array_named("coordinates", |w| {
                        w.write_value(self.x)?;
                        w.write_value(self.y)?;
                        Ok(())
                    })
                })?;
                if let Some(max) = self.max_distance {
                    w.write("$maxDistance", max)?;
                }
                if let Some(min) = self.min_distance {
                    w.write("$minDistance", min)?;
                }
                Ok(())
            })
        })
    }
}

impl From<NearFilter> for Filter {
    fn from(f: NearFilter) -> Self {
        Filter::Near(f)
    }
}

/// Shape argument of a `$geoWithin` query.
#[derive(Debug, Clone)]
pub enum GeoShape {
    Box {
        bottom_left: (f64, f64),
        top_right: (f64, f64),
    },
    Polygon(Vec<(f64, f64)>),
    Center {
        center: (f64, f64),
        radius: f64,
    },
    CenterSphere {
        center: (f64, f64),
        radius: f64,
    },
    /// Caller-supplied GeoJSON geometry document.
    Geometry(Document),
}

#[derive(Debug, Clone)]
pub struct GeoWithinFilter {
    pub(crate) field: FieldName,
    shape: GeoShape,
    pub(crate) ctx: FilterContext,
}

impl GeoWithinFilter {
    pub(crate) fn new(field: FieldName, shape: GeoShape) -> Self {
        GeoWithinFilter {
            field,
            shape,
            ctx: FilterContext::default(),
        }
    }

    pub(crate) fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let path = self.field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        w.document(|w| {
            w.document_named("$geoWithin", |w| match &self.shape {
                GeoShape::Box {
                    bottom_left,
                    top_right,
                } => w.array_named("$box", |w| {
                    write_point(w, *bottom_left)?;
                    write_point(w, *top_right)
                }),
                GeoShape::Polygon(points) => w.array_named("$polygon", |w| {
                    for point in points {
                        write_point(w, *point)?;
                    }
                    Ok(())
                }),
                GeoShape::Center { center, radius } => w.array_named("$center", |w| {
                    write_point(w, *center)?;
                    w.write_value(*radius)?;
                    Ok(())
                }),
                GeoShape::CenterSphere { center, radius } => {
                    w.array_named("$centerSphere", |w| {
                        write_point(w, *center)?;
                        w.write_value(*radius)?;
                        Ok(())
                    })
                }
                GeoShape::Geometry(geometry) => {
                    w.write_name("$geometry")?;
                    cx.codec.encode_value(w, &geometry.clone().into())
                }
            })
        })
    }
}

/// `{ field: { "$geoIntersects": { "$geometry": … } } }`.
#[derive(Debug, Clone)]
pub struct GeoIntersectsFilter {
    pub(crate) field: FieldName,
    geometry: Document,
    pub(crate) ctx: FilterContext,
}

impl GeoIntersectsFilter {
    pub(crate) fn new(field: FieldName, geometry: Document) -> Self {
        GeoIntersectsFilter {
            field,
            geometry,
            ctx: FilterContext::default(),
        }
    }

    pub(crate) fn encode_entry(
        &self,
        w: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        let path = self.field.resolve(&self.ctx, cx)?;
        w.write_name(path)?;
        w.document(|w| {
            w.document_named("$geoIntersects", |w| {
                w.write_name("$geometry")?;
                cx.codec.encode_value(w, &self.geometry.clone().into())
            })
        })
    }
}

fn write_point(w: &mut DocumentWriter, (x, y): (f64, f64)) -> Result<(), EncodeError> {
    w.array(|w| {
        w.write_value(x)?;
        w.write_value(y)?;
        Ok(())
    })
}
