pub mod block;
pub mod conversion;
pub mod ids;
pub mod model;

pub use block::*;
pub use conversion::*;
pub use model::*;
