//! Bare import specifier resolution and rewriting for modserve.
//!
//! Browsers can only load ES module specifiers that are relative,
//! root-absolute, or full URLs. This crate turns the remaining form,
//! bare package references like `import {x} from 'foo'`, into
//! browser-resolvable relative URLs by walking node_modules directories
//! the way Node.js does and splicing the resolved path into the served
//! source without disturbing any other byte.
//!
//! The crate is filesystem-synchronous and has no server dependencies;
//! the modserve CLI drives it per request and caches results in the
//! shared [`ResolutionCache`].

pub mod cache;
pub mod error;
pub mod package;
pub mod rewrite;
pub mod scan;

pub use cache::ResolutionCache;
pub use error::{ResolveError, Result};
pub use package::{resolve_bare, BrowserField, PackageDescriptor};
pub use rewrite::{is_bare, rewrite_module, RewriteOutcome};
pub use scan::{ImportKind, ImportSpan, ModuleRecord};
