//! Pipeline stages for auditing a roadmap deck.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the network-facing stage can be swapped out.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ llm ──▶ extract
//! (gate)    (render/       (vision   (fence strip,
//!            encode)        model)    JSON recovery)
//! ```
//!
//! 1. [`input`]     — read a local file or download a URL, applying the
//!    upload gate (extension, 20 MiB ceiling)
//! 2. [`normalize`] — PDFs go through [`render`] (pdfium, `spawn_blocking`)
//!    and [`encode`] (PNG → base64); presentations are base64-wrapped whole
//! 3. [`llm`]       — one round trip to the vision model behind the
//!    [`llm::Analyst`] trait; the only stage with network I/O
//! 4. [`extract`]   — pull a validated [`crate::EvaluationRecord`] out of the
//!    reply text
//!
//! [`engine`] locates, downloads or binds the pdfium shared library.

pub mod encode;
pub mod engine;
pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod render;
