pub(crate) mod expiry_sweep;
pub(crate) mod scheduler;
