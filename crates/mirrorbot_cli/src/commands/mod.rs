pub(crate) mod cycle;
pub(crate) mod inspect;
pub(crate) mod migrate;
pub(crate) mod notify;
pub(crate) mod shared;
