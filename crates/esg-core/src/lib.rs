pub mod error;
pub mod normalize;
pub mod random;
pub mod reference;
pub mod traits;
pub mod types;

pub use error::*;
pub use random::*;
pub use reference::*;
pub use traits::*;
pub use types::*;
