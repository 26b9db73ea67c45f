//! Pipeline assembly: an ordered list of stages encoding to an array of
//! single-key stage documents.

use bson::{Bson, Document};
use mill_codec::{EncodeContext, EncodeError};

use crate::stage::Stage;

/// An aggregation pipeline. Encoding is all-or-nothing: the first stage
/// error propagates and no partial array is returned.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

pub fn pipeline() -> Pipeline {
    Pipeline::default()
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Encode every stage in order into one document each.
    pub fn encode(&self, cx: &EncodeContext<'_>) -> Result<Vec<Document>, EncodeError> {
        let mut documents = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            documents.push(stage.to_document(cx)?);
        }
        Ok(documents)
    }

    /// Encode to a BSON array, the shape an `aggregate` command embeds.
    pub fn encode_bson(&self, cx: &EncodeContext<'_>) -> Result<Bson, EncodeError> {
        let documents = self.encode(cx)?;
        Ok(Bson::Array(documents.into_iter().map(Bson::Document).collect()))
    }
}

impl FromIterator<Stage> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Pipeline {
            stages: iter.into_iter().collect(),
        }
    }
}

impl Extend<Stage> for Pipeline {
    fn extend<I: IntoIterator<Item = Stage>>(&mut self, iter: I) {
        self.stages.extend(iter);
    }
}
