//! The Niac template engine.
//!
//! Views are `.niac.php` files under one or more view roots. A view is
//! scanned ([`lexer`]), parsed into a [`Node`] tree ([`parser`]), and the
//! tree is cached as JSON ([`cache`]). Rendering walks the tree with a
//! small expression evaluator ([`expr`]) over `serde_json` data.
//!
//! ```text
//! @extends('layouts.app')
//!
//! @section('content')
//!     @forelse($posts as $post)
//!         <h2>{{ $post->title }}</h2>
//!     @empty
//!         <p>No posts yet.</p>
//!     @endforelse
//! @endsection
//! ```

pub mod ast;
pub mod cache;
pub mod compiler;
mod engine;
pub mod escape;
pub mod expr;
mod helpers;
pub mod lexer;
pub mod parser;

use std::ops::Range;
use std::path::PathBuf;

pub use ast::Node;
pub use cache::ViewCache;
pub use compiler::CompiledView;
pub use engine::{Metadata, NiacEngine, VIEW_EXTENSION};
pub use escape::escape;
pub use helpers::{DefaultHelpers, ViewHelpers};

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("View [{name}] not found")]
    NotFound { name: String },

    #[error("Layout [{layout}] extended by view [{view}] not found")]
    LayoutNotFound { view: String, layout: String },

    #[error("Mismatched @{directive} in view [{view}]")]
    MismatchedSection {
        view: String,
        path: PathBuf,
        directive: String,
        span: Range<usize>,
    },

    #[error("Syntax error in view [{view}]: {message}")]
    Syntax {
        view: String,
        path: PathBuf,
        span: Range<usize>,
        message: String,
    },

    #[error("Failed to compile view [{view}]: {message}")]
    Compile { view: String, message: String },

    #[error("Error rendering view [{view}]: {message}")]
    Render { view: String, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ViewError {
    /// Whether this is a missing view or layout.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ViewError::NotFound { .. } | ViewError::LayoutNotFound { .. })
    }
}

pub type ViewResult<T> = Result<T, ViewError>;
