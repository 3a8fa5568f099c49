//! Loader trait for loading rows to destinations

use eyre::Result;
use std::future::Future;

/// Loader trait for loading items to a destination
///
/// Loaders take `&mut self`: each output is owned by exactly one writer and
/// items are appended batch by batch.
///
/// # Example
/// ```no_run
/// use migrate_extractor::etl::Loader;
/// use eyre::Result;
///
/// struct CountingLoader {
///     seen: usize,
/// }
///
/// impl Loader for CountingLoader {
///     type Item = String;
///
///     async fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
///         self.seen += items.len();
///         Ok(items.len())
///     }
/// }
/// ```
pub trait Loader {
    /// The type of items to load
    type Item;

    /// Append items to the destination
    ///
    /// Returns the number of items written
    ///
    /// # Errors
    /// Returns an error if loading fails (I/O, serialization, etc.)
    fn load(&mut self, items: Vec<Self::Item>) -> impl Future<Output = Result<usize>>;
}
