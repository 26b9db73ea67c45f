//! Diagnostic stages with optional-toggle payloads: `$changeStream`,
//! `$collStats`, `$currentOp`.
//!
//! A toggle key is written only when it differs from the omit-default;
//! booleans are never written as `false` and absent options never as
//! null.

use bson::Document;
use mill_codec::{DocumentWriter, EncodeError};

use super::Stage;

/// `$changeStream`.
#[derive(Debug, Clone, Default)]
pub struct ChangeStream {
    all_changes_for_cluster: bool,
    full_document: Option<String>,
    full_document_before_change: Option<String>,
    resume_after: Option<Document>,
    show_expanded_events: bool,
    start_after: Option<Document>,
}

pub fn change_stream() -> ChangeStream {
    ChangeStream::default()
}

impl ChangeStream {
    pub fn all_changes_for_cluster(mut self) -> Self {
        self.all_changes_for_cluster = true;
        self
    }

    /// e.g. `"updateLookup"` or `"whenAvailable"`.
    pub fn full_document(mut self, mode: &str) -> Self {
        self.full_document = Some(mode.to_string());
        self
    }

    pub fn full_document_before_change(mut self, mode: &str) -> Self {
        self.full_document_before_change = Some(mode.to_string());
        self
    }

    pub fn resume_after(mut self, token: Document) -> Self {
        self.resume_after = Some(token);
        self
    }

    pub fn show_expanded_events(mut self) -> Self {
        self.show_expanded_events = true;
        self
    }

    pub fn start_after(mut self, token: Document) -> Self {
        self.start_after = Some(token);
        self
    }

    pub(crate) fn encode_payload(&self, w: &mut DocumentWriter) -> Result<(), EncodeError> {
        w.document(|w| {
            if self.all_changes_for_cluster {
                w.write("allChangesForCluster", true)?;
            }
            if let Some(mode) = &self.full_document {
                w.write("fullDocument", mode.as_str())?;
            }
            if let Some(mode) = &self.full_document_before_change {
                w.write("fullDocumentBeforeChange", mode.as_str())?;
            }
            if let Some(token) = &self.resume_after {
                w.write("resumeAfter", token.clone())?;
            }
            if self.show_expanded_events {
                w.write("showExpandedEvents", true)?;
            }
            if let Some(token) = &self.start_after {
                w.write("startAfter", token.clone())?;
            }
            Ok(())
        })
    }
}

impl From<ChangeStream> for Stage {
    fn from(s: ChangeStream) -> Self {
        Stage::ChangeStream(s)
    }
}

/// `$collStats`.
#[derive(Debug, Clone, Default)]
pub struct CollStats {
    latency_stats: bool,
    latency_histograms: bool,
    storage_stats: bool,
    storage_scale: Option<i32>,
    count: bool,
    query_exec_stats: bool,
}

pub fn coll_stats() -> CollStats {
    CollStats::default()
}

impl CollStats {
    pub fn latency_stats(mut self) -> Self {
        self.latency_stats = true;
        self
    }

    pub fn latency_histograms(mut self) -> Self {
        self.latency_stats = true;
        self.latency_histograms = true;
        self
    }

    pub fn storage_stats(mut self) -> Self {
        self.storage_stats = true;
        self
    }

    pub fn storage_scale(mut self, scale: i32) -> Self {
        self.storage_stats = true;
        self.storage_scale = Some(scale);
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn query_exec_stats(mut self) -> Self {
        self.query_exec_stats = true;
        self
    }

    pub(crate) fn encode_payload(&self, w: &mut DocumentWriter) -> Result<(), EncodeError> {
        w.document(|w| {
            if self.latency_stats {
                w.document_named("latencyStats", |w| {
                    if self.latency_histograms {
                        w.write("histograms", true)?;
                    }
                    Ok(())
                })?;
            }
            if self.storage_stats {
                w.document_named("storageStats", |w| {
                    if let Some(scale) = self.storage_scale {
                        w.write("scale", scale)?;
                    }
                    Ok(())
                })?;
            }
            if self.count {
                w.document_named("count", |_| Ok(()))?;
            }
            if self.query_exec_stats {
                w.document_named("queryExecStats", |_| Ok(()))?;
            }
            Ok(())
        })
    }
}

impl From<CollStats> for Stage {
    fn from(s: CollStats) -> Self {
        Stage::CollStats(s)
    }
}

/// `$currentOp`.
#[derive(Debug, Clone, Default)]
pub struct CurrentOp {
    all_users: bool,
    idle_connections: bool,
    idle_cursors: bool,
    local_ops: bool,
}

pub fn current_op() -> CurrentOp {
    CurrentOp::default()
}

impl CurrentOp {
    pub fn all_users(mut self) -> Self {
        self.all_users = true;
        self
    }

    pub fn idle_connections(mut self) -> Self {
        self.idle_connections = true;
        self
    }

    pub fn idle_cursors(mut self) -> Self {
        self.idle_cursors = true;
        self
    }

    pub fn local_ops(mut self) -> Self {
        self.local_ops = true;
        self
    }

    pub(crate) fn encode_payload(&self, w: &mut DocumentWriter) -> Result<(), EncodeError> {
        w.document(|w| {
            if self.all_users {
                w.write("allUsers", true)?;
            }
            if self.idle_connections {
                w.write("idleConnections", true)?;
            }
            if self.idle_cursors {
                w.write("idleCursors", true)?;
            }
            if self.local_ops {
                w.write("localOps", true)?;
            }
            Ok(())
        })
    }
}

impl From<CurrentOp> for Stage {
    fn from(s: CurrentOp) -> Self {
        Stage::CurrentOp(s)
    }
}
