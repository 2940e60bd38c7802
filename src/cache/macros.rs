/// Memoizes an async computation in the in-memory cache.
///
/// Returns the cached value when a live entry exists for the key. Otherwise it
/// awaits the block, stores its `Ok` value and returns it. Errors are returned
/// unchanged and never stored.
///
/// # Arguments
/// * `$cache`: The [`Cache`](crate::cache::Cache) to read from and write to.
/// * `$key`: The [`CacheKey`](crate::cache::CacheKey) identifying the call.
/// * `$ttl`: Optional time-to-live; the cache's configured TTL when omitted.
/// * `$block`: The future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let movie = cached!(self.cache, CacheKey::MovieDetails(id), async move {
///     self.fetch_details_uncached(id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        let ttl = $cache.default_ttl();
        $crate::cached!($cache, $key, ttl, $block)
    }};
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        $cache.get_or_compute(&$key, $ttl, || $block).await
    }};
}
