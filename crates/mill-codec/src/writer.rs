use bson::{Bson, Document};

use crate::error::{EncodeError, WriterError};

#[derive(Debug)]
enum Frame {
    Document {
        /// Key in the parent document, `None` for root or array elements.
        name: Option<String>,
        doc: Document,
        /// Name written but not yet paired with a value.
        pending: Option<String>,
    },
    Array {
        name: Option<String>,
        items: Vec<Bson>,
    },
}

/// Forward-only, scope-checked BSON writer.
///
/// Every `start_*` must be matched by exactly one `end_*`; the closure
/// helpers ([`document`](DocumentWriter::document),
/// [`array`](DocumentWriter::array), …) guarantee the matching close on all
/// exit paths and are what the encoders use. Writes are sequential with no
/// backtracking; a writer that has produced its root value rejects further
/// writes.
#[derive(Debug, Default)]
pub struct DocumentWriter {
    stack: Vec<Frame>,
    root: Option<Bson>,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_pending(&mut self) -> Result<Option<String>, WriterError> {
        if self.root.is_some() && self.stack.is_empty() {
            return Err(WriterError::Finished);
        }
        match self.stack.last_mut() {
            Some(Frame::Document { pending, .. }) => match pending.take() {
                Some(name) => Ok(Some(name)),
                None => Err(WriterError::MissingName),
            },
            Some(Frame::Array { .. }) | None => Ok(None),
        }
    }

    fn attach(&mut self, value: Bson, name: Option<String>) {
        match self.stack.last_mut() {
            Some(Frame::Document { doc, .. }) => {
                // `name` is always present here: the frame was opened with
                // the pending name taken from this document.
                if let Some(name) = name {
                    doc.insert(name, value);
                }
            }
            Some(Frame::Array { items, .. }) => items.push(value),
            None => self.root = Some(value),
        }
    }

    // ── Scopes ──────────────────────────────────────────────────

    pub fn start_document(&mut self) -> Result<(), WriterError> {
        let name = self.take_pending()?;
        self.stack.push(Frame::Document {
            name,
            doc: Document::new(),
            pending: None,
        });
        Ok(())
    }

    pub fn start_document_named(&mut self, name: &str) -> Result<(), WriterError> {
        self.write_name(name)?;
        self.start_document()
    }

    pub fn end_document(&mut self) -> Result<(), WriterError> {
        match self.stack.pop() {
            Some(Frame::Document { pending: Some(_), .. }) => Err(WriterError::PendingName),
            Some(Frame::Document { name, doc, .. }) => {
                self.attach(Bson::Document(doc), name);
                Ok(())
            }
            Some(frame @ Frame::Array { .. }) => {
                self.stack.push(frame);
                Err(WriterError::ScopeMismatch)
            }
            None => Err(WriterError::ScopeMismatch),
        }
    }

    pub fn start_array(&mut self) -> Result<(), WriterError> {
        let name = self.take_pending()?;
        self.stack.push(Frame::Array {
            name,
            items: Vec::new(),
        });
        Ok(())
    }

    pub fn start_array_named(&mut self, name: &str) -> Result<(), WriterError> {
        self.write_name(name)?;
        self.start_array()
    }

    pub fn end_array(&mut self) -> Result<(), WriterError> {
        match self.stack.pop() {
            Some(Frame::Array { name, items }) => {
                self.attach(Bson::Array(items), name);
                Ok(())
            }
            Some(frame @ Frame::Document { .. }) => {
                self.stack.push(frame);
                Err(WriterError::ScopeMismatch)
            }
            None => Err(WriterError::ScopeMismatch),
        }
    }

    // ── Names and values ────────────────────────────────────────

    pub fn write_name(&mut self, name: &str) -> Result<(), WriterError> {
        match self.stack.last_mut() {
            Some(Frame::Document { pending: Some(_), .. }) => Err(WriterError::PendingName),
            Some(Frame::Document { pending, .. }) => {
                *pending = Some(name.to_string());
                Ok(())
            }
            Some(Frame::Array { .. }) | None => Err(WriterError::NameOutsideDocument),
        }
    }

    /// Write a scalar at the current value position: under the pending name
    /// inside a document, or as the next element of an array.
    pub fn write_value(&mut self, value: impl Into<Bson>) -> Result<(), WriterError> {
        let name = self.take_pending()?;
        self.attach(value.into(), name);
        Ok(())
    }

    pub fn write(&mut self, name: &str, value: impl Into<Bson>) -> Result<(), WriterError> {
        self.write_name(name)?;
        self.write_value(value)
    }

    // ── Scoped helpers ──────────────────────────────────────────
    //
    // Open a scope, run the callback, and close the scope on every exit
    // path. On a callback error any scopes it left open are unwound so the
    // writer stays balanced (the partial output is invalid either way and
    // must be discarded by the caller).

    pub fn document<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<T, EncodeError> {
        self.start_document()?;
        self.run_scoped(f)
    }

    pub fn document_named<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<T, EncodeError> {
        self.start_document_named(name)?;
        self.run_scoped(f)
    }

    pub fn array<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<T, EncodeError> {
        self.start_array()?;
        self.run_scoped_array(f)
    }

    pub fn array_named<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<T, EncodeError> {
        self.start_array_named(name)?;
        self.run_scoped_array(f)
    }

    fn run_scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<T, EncodeError> {
        let depth = self.stack.len();
        match f(self) {
            Ok(value) => {
                if self.stack.len() != depth {
                    self.unwind_to(depth.saturating_sub(1));
                    return Err(WriterError::ScopeMismatch.into());
                }
                self.end_document()?;
                Ok(value)
            }
            Err(e) => {
                self.unwind_to(depth.saturating_sub(1));
                Err(e)
            }
        }
    }

    fn run_scoped_array<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<T, EncodeError> {
        let depth = self.stack.len();
        match f(self) {
            Ok(value) => {
                if self.stack.len() != depth {
                    self.unwind_to(depth.saturating_sub(1));
                    return Err(WriterError::ScopeMismatch.into());
                }
                self.end_array()?;
                Ok(value)
            }
            Err(e) => {
                self.unwind_to(depth.saturating_sub(1));
                Err(e)
            }
        }
    }

    fn unwind_to(&mut self, depth: usize) {
        while self.stack.len() > depth {
            self.stack.pop();
        }
    }

    // ── Finish ──────────────────────────────────────────────────

    pub fn into_bson(self) -> Result<Bson, WriterError> {
        if !self.stack.is_empty() {
            return Err(WriterError::Unfinished);
        }
        self.root.ok_or(WriterError::Empty)
    }

    pub fn into_document(self) -> Result<Document, WriterError> {
        match self.into_bson()? {
            Bson::Document(doc) => Ok(doc),
            _ => Err(WriterError::NotADocument),
        }
    }
}
