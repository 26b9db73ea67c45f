mod context;
mod error;
mod mapping;
mod value;
mod writer;

pub use bson::{Bson, Document};
pub use context::EncodeContext;
pub use error::{EncodeError, WriterError};
pub use mapping::{EntityResolver, MappingError, PassthroughResolver, StaticResolver};
pub use value::{BsonCodec, EncodeValue, ValueCodec};
pub use writer::DocumentWriter;
