pub(crate) mod cache;
pub(crate) mod migrate;
pub(crate) mod serve;
