pub mod fs_atomic;
pub mod ids;

pub use ids::RunId;
