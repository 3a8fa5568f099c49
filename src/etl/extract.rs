//! Extractor trait for data extraction from the management API

use eyre::Result;
use std::future::Future;

/// Extractor trait for extracting rows from a source
///
/// Implementors cover one unit of work, such as a single SQL site or a
/// single appliance's dependency export.
///
/// # Example
/// ```no_run
/// use migrate_extractor::etl::Extractor;
/// use eyre::Result;
///
/// struct StaticExtractor {
///     rows: Vec<String>,
/// }
///
/// impl Extractor for StaticExtractor {
///     type Item = String;
///
///     async fn extract(&self) -> Result<Vec<Self::Item>> {
///         Ok(self.rows.clone())
///     }
/// }
/// ```
pub trait Extractor {
    /// The type of items extracted
    type Item;

    /// Extract items from the source
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, parsing, etc.)
    fn extract(&self) -> impl Future<Output = Result<Vec<Self::Item>>>;
}
