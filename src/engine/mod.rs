pub mod model;
pub mod placement;
pub mod pool;
pub mod spatial;
