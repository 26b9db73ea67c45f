use std::fmt;

use bson::Bson;

use crate::context::EncodeContext;
use crate::error::EncodeError;
use crate::writer::DocumentWriter;

/// Encodes an opaque runtime value at the writer's current value position.
///
/// The default implementation, [`BsonCodec`], writes the value as-is,
/// walking arrays and documents recursively through the writer so a custom
/// codec can interpose on every leaf (date normalization, enum mapping,
/// user-type substitution, …).
pub trait ValueCodec {
    fn encode_value(&self, writer: &mut DocumentWriter, value: &Bson) -> Result<(), EncodeError>;
}

/// Default value bridge: structural pass-through of `Bson`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonCodec;

impl ValueCodec for BsonCodec {
    fn encode_value(&self, writer: &mut DocumentWriter, value: &Bson) -> Result<(), EncodeError> {
        match value {
            Bson::Document(doc) => writer.document(|w| {
                for (name, value) in doc {
                    w.write_name(name)?;
                    self.encode_value(w, value)?;
                }
                Ok(())
            }),
            Bson::Array(items) => writer.array(|w| {
                for value in items {
                    self.encode_value(w, value)?;
                }
                Ok(())
            }),
            scalar => {
                writer.write_value(scalar.clone())?;
                Ok(())
            }
        }
    }
}

/// A value that knows how to encode itself at a value position.
///
/// This is the seam that lets the filter layer embed an aggregation
/// expression (`$expr`) without a dependency on the expression crate.
pub trait EncodeValue: fmt::Debug + Send + Sync {
    fn encode_value_into(
        &self,
        writer: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError>;
}

impl EncodeValue for Bson {
    fn encode_value_into(
        &self,
        writer: &mut DocumentWriter,
        cx: &EncodeContext<'_>,
    ) -> Result<(), EncodeError> {
        cx.codec.encode_value(writer, self)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn scalar_roundtrips_through_codec() {
        let mut w = DocumentWriter::new();
        w.start_document().unwrap();
        w.write_name("n").unwrap();
        BsonCodec.encode_value(&mut w, &Bson::Int32(7)).unwrap();
        w.end_document().unwrap();
        assert_eq!(w.into_document().unwrap(), doc! { "n": 7 });
    }

    #[test]
    fn nested_values_walk_recursively() {
        let value = Bson::Document(doc! {
            "tags": ["a", "b"],
            "meta": { "depth": 2_i32 }
        });
        let mut w = DocumentWriter::new();
        w.start_document().unwrap();
        w.write_name("v").unwrap();
        BsonCodec.encode_value(&mut w, &value).unwrap();
        w.end_document().unwrap();
        assert_eq!(
            w.into_document().unwrap(),
            doc! { "v": { "tags": ["a", "b"], "meta": { "depth": 2 } } }
        );
    }
}
