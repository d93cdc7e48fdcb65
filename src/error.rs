use std::fmt::Debug;

use thiserror::Error;

/// Errors returned synchronously by [`crate::ConcurrentSet`] operations.
///
/// No tree mutation happens before this is returned: construction and
/// argument validation both run before the first CAS of an attempt.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub(crate) fn require_ordered_sentinels<K: Ord + Debug>(
    sentinel1: &K,
    sentinel2: &K,
) -> Result<(), Error> {
    if sentinel1 >= sentinel2 {
        return Err(Error::InvalidArgument(format!(
            "sentinel1 ({sentinel1:?}) must be strictly less than sentinel2 ({sentinel2:?})"
        )));
    }
    Ok(())
}

pub(crate) fn require_user_key<K: Ord + Debug>(key: &K, sentinel1: &K) -> Result<(), Error> {
    if key >= sentinel1 {
        return Err(Error::InvalidArgument(format!(
            "key ({key:?}) must be strictly less than sentinel1 ({sentinel1:?})"
        )));
    }
    Ok(())
}
