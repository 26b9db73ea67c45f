mod filter;

pub use filter::geo::{GeoIntersectsFilter, GeoShape, GeoWithinFilter, NearFilter};
pub use filter::{
    Filter, RegexFilter, TextFilter, all, and, bits_all_clear, bits_all_set, bits_any_clear,
    bits_any_set, comment, elem_match, eq, exists, expr, geo_intersects, geo_within,
    geo_within_box, geo_within_center, geo_within_center_sphere, geo_within_polygon, gt, gte,
    in_, json_schema, lt, lte, mod_, ne, near, near_sphere, nin, nor, or, regex, size, text,
    type_of, where_,
};
