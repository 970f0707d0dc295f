mod eviction;
mod expiry;
