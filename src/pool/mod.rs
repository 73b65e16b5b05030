mod manager;

pub use manager::PoolManager;
