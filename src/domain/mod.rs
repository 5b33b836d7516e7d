mod account;
mod money;
mod posting;
mod utr;

pub use account::*;
pub use money::*;
pub use posting::*;
pub use utr::*;
