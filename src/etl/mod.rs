//! Core extract/load abstractions
//!
//! Every extraction category is an [`Extractor`] producing typed rows and
//! every output file is a [`Loader`] consuming them.

mod extract;
mod load;

pub use extract::Extractor;
pub use load::Loader;
