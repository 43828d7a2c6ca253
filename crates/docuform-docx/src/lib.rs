//! Docuform DOCX: template scanning, rendering, and conversion.
//!
//! # Modules
//!
//! - [`package`]: Reading and writing DOCX zip packages
//! - [`lexer`]: Tag delimiters and tag scanning
//! - [`fields`]: Field discovery
//! - [`render`]: Rendering with JSON values
//! - [`html`]: HTML to DOCX conversion
//! - [`pdf`]: PDF conversion
//!
//! # Example
//!
//! ```rust,no_run
//! use docuform_docx::{RenderOptions, Template};
//! use serde_json::json;
//!
//! # fn main() -> docuform_docx::Result<()> {
//! let bytes = std::fs::read("letter.docx")?;
//! let template = Template::from_bytes(&bytes)?;
//! for field in template.fields() {
//!     println!("{} ({:?})", field.label, field.kind);
//! }
//! let rendered = template.render(&json!({"student_name": "Ana"}), &RenderOptions::default())?;
//! std::fs::write("letter-ana.docx", rendered.to_bytes()?)?;
//! # Ok(())
//! # }
//! ```

#![doc = include_str!("../README.md")]

pub mod error;
pub mod fields;
pub mod html;
pub mod lexer;
pub mod package;
pub mod pdf;
pub mod render;
pub mod template;
mod xml;

#[cfg(test)]
mod test_support;

pub use error::{Result, TemplateError};
pub use fields::{FieldKind, TemplateField, discover_fields};
pub use html::html_to_docx;
pub use lexer::{Delimiters, Tag, TagKind};
pub use package::{DOCUMENT_PART, DOCX_CONTENT_TYPE, DocxPackage, MAX_UNPACKED_BYTES};
pub use pdf::{PDF_CONTENT_TYPE, PdfConverter, SofficeConverter};
pub use render::{RenderOptions, render, render_bytes};
pub use template::Template;
pub use xml::{escape_text, unescape_text};
