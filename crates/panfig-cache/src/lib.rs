//! Content-addressed figure cache for panfig.
//!
//! Generated figures are stored as one file per request, named by the SHA-1
//! digest of the request's canonical form. Two traits/types form the API:
//!
//! - [`Fingerprint`]: anything that can describe itself canonically
//! - [`FigureCache`]: maps fingerprints to paths under a cache root
//!
//! There is no index and no eviction. A figure is cached if and only if its
//! file exists, and any change to a request changes its file name, so the
//! cache never needs invalidating.
//!
//! # Example
//!
//! ```
//! use panfig_cache::{FigureCache, Fingerprint};
//!
//! struct Request(&'static str);
//!
//! impl Fingerprint for Request {
//!     fn canonical_form(&self) -> String {
//!         self.0.to_owned()
//!     }
//! }
//!
//! let cache = FigureCache::new("/tmp/figures");
//! let path = cache.path_for(&Request("digraph { a -> b }"));
//! assert_eq!(path, cache.path_for(&Request("digraph { a -> b }")));
//! assert_ne!(path, cache.path_for(&Request("digraph { b -> a }")));
//! ```

mod file;
pub use file::FigureCache;

use sha1::{Digest, Sha1};

/// A cacheable request with a stable canonical form.
///
/// Implementors must make `canonical_form` injective over everything that
/// affects the produced artifact: two requests with equal canonical forms are
/// treated as the same artifact.
pub trait Fingerprint {
    /// Deterministic textual form of the request.
    fn canonical_form(&self) -> String;

    /// Lowercase hex SHA-1 digest of [`canonical_form`](Self::canonical_form).
    fn fingerprint(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.canonical_form().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Fingerprint for str {
    fn canonical_form(&self) -> String {
        self.to_owned()
    }
}
