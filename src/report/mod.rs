//! Report Generation
//!
//! Turns synthesized [`Findings`](crate::types::Findings) into the final
//! markdown document in two steps:
//!
//! 1. [`ParallelSectionGenerator`] fans out one model call per
//!    [`SectionKind`](crate::types::SectionKind), bounded by a worker count,
//!    and joins them into a [`Report`](crate::types::Report)
//! 2. [`ReportAssembler`] renders the report into a [`Document`], adding the
//!    findings diagram, literature review and source list
//!
//! Diagrams are embedded as fenced `mermaid` blocks and passed through
//! untouched; [`Document::segments`] splits them out for rendering.

/// Document rendering and diagram segmentation.
pub mod assembler;
/// Mermaid diagram builders.
pub mod diagram;
/// Bounded concurrent section drafting.
pub mod generator;
/// Per-section prompt templates.
pub mod prompts;

pub use assembler::{Document, ReportAssembler, Segment};
pub use generator::{DEFAULT_MAX_WORKERS, ParallelSectionGenerator};
