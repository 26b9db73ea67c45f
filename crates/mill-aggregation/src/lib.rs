//! MongoDB aggregation pipelines as typed, encode-only values.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s; stages carry
//! [`Expression`]s and `mill_query` filters. Everything encodes through
//! `mill_codec`'s scope-checked writer into the wire shape the
//! `aggregate` command expects, parameterized by an entity resolver and
//! a value codec so nothing here touches a driver or a network.
//!
//! ```
//! use mill_aggregation::expression::ops::sum;
//! use mill_aggregation::expression::{field, value};
//! use mill_aggregation::stage::{group, id, sort};
//! use mill_aggregation::pipeline;
//! use mill_codec::{BsonCodec, EncodeContext, PassthroughResolver};
//!
//! let pipeline = pipeline()
//!     .stage(group(id(field("author"))).field("count", sum(value(1_i32))))
//!     .stage(sort().ascending("_id"));
//! let cx = EncodeContext::new(&PassthroughResolver, &BsonCodec);
//! let documents = pipeline.encode(&cx).unwrap();
//! assert_eq!(documents.len(), 2);
//! ```

pub mod expression;
pub mod pipeline;
pub mod stage;

pub use expression::{array, document, field, ops, value, DocumentExpression, Expression};
pub use pipeline::{pipeline, Pipeline};
pub use stage::Stage;
