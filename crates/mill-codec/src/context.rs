use crate::mapping::EntityResolver;
use crate::value::ValueCodec;

/// Collaborators every encode is parameterized by.
///
/// There is no global state: the resolver and codec are passed explicitly
/// into each `encode` call by the caller.
#[derive(Clone, Copy)]
pub struct EncodeContext<'a> {
    pub resolver: &'a dyn EntityResolver,
    pub codec: &'a dyn ValueCodec,
}

impl<'a> EncodeContext<'a> {
    pub fn new(resolver: &'a dyn EntityResolver, codec: &'a dyn ValueCodec) -> Self {
        Self { resolver, codec }
    }
}
