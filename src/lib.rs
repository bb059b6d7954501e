//! CRF Schema Resolver
//!
//! Runtime resolution of annotated case-report-form (CRF) schemas against
//! live data records.
//!
//! A CRF schema is a JSON-Schema-style document carrying `crf:*` presentation
//! annotations. Resolution dereferences every internal `$ref`, applies
//! `if`/`then`/`else` and conditional `allOf` branches against the data
//! record, and synthesizes read-only schema nodes for data the schema never
//! declared, so the output always covers the whole record. A resolved schema
//! can then be turned into a toolkit-agnostic presentation hint tree or a
//! flat leaf-field listing.
//!
//! # Example
//!
//! ```
//! use crf_schema::{resolve, ResolveOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "stage": { "type": "string", "enum": ["I", "II"] },
//!         "detail": { "type": "string" }
//!     },
//!     "if": { "properties": { "stage": { "const": "II" } } },
//!     "then": { "required": ["detail"] }
//! });
//! let data = json!({ "stage": "II" });
//!
//! let resolution = resolve(&schema, &data, &ResolveOptions::default());
//!
//! // The matched then-branch folded its requirement into the schema,
//! // and no conditional keywords survive resolution.
//! assert_eq!(resolution.schema["required"], json!(["detail"]));
//! assert!(resolution.schema.get("if").is_none());
//! ```
//!
//! # Annotation vocabulary
//!
//! | Annotation | Value | Effect |
//! |------------|-------|--------|
//! | `crf:required` | array of registry names | highlight when unfilled |
//! | `crf:ui:textarea` | bool or row count | multi-line text widget |
//! | `crf:ui:listtype` | `list`, `combo`, `suggestlist`, `suggestcombo`, `buttons` | choice widget flavor |
//! | `crf:ui:subschemastyle` | `inline`, `column` | nested-object layout |
//! | `crf:ui:visibleWhen` | object | conditional-visibility marker |
//! | `crf:ui:hidden` | bool | suppress rendering |
//! | `crf:undeclared` | bool | set by the engine on synthesized nodes |
//!
//! Annotations are presentation metadata only; [`strip_annotations`] removes
//! them before standard JSON Schema validation.

mod conditions;
mod error;
mod flatten;
mod hints;
mod linter;
mod loader;
mod merge;
mod refs;
mod resolver;
mod synth;
mod types;
mod validator;

pub use conditions::Condition;
pub use error::{ResolveError, SchemaError, ValidateError};
pub use flatten::{flatten, FlatField};
pub use hints::{derive_hints, HintBag, HintNode, HintTree, LabelTemplate};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_schema, load_schema_str};
pub use refs::resolve_refs;
pub use resolver::{resolve, strip_annotations, DataPatch, Resolution};
pub use types::{
    ResolveOptions, SchemaType, ANN_HIDDEN, ANN_LISTTYPE, ANN_REQUIRED, ANN_SUBSCHEMA_STYLE,
    ANN_TEXTAREA, ANN_UNDECLARED, ANN_VISIBLE_WHEN,
};
pub use validator::{validate, validate_against_schema};
