/// A record type that can be moved between stores.
///
/// The migration engine is entity-agnostic: the router, validator and fixer
/// are written once against this trait and instantiated per business record
/// type. Implementations must keep `id` immutable once assigned and make
/// `content_eq` reflexive and symmetric.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Stable 64-bit identity of the record.
    fn id(&self) -> i64;

    /// Last-modified instant in epoch milliseconds.
    ///
    /// Incremental validation orders and filters rows by this value, so it
    /// must move forward on every business mutation.
    fn modified_at(&self) -> i64;

    /// Semantic equality against another instance of the same record.
    ///
    /// Store-local housekeeping fields (revision counters, cached
    /// timestamps) must be ignored: two rows that agree on business content
    /// are equal even if the stores annotated them differently.
    fn content_eq(&self, other: &Self) -> bool;
}
