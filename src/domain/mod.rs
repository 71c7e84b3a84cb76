pub mod category;
pub mod observation;

pub use category::*;
pub use observation::*;
