mod abis;
mod contracts;
mod headers;
mod logs;
mod providers;

pub use abis::*;
pub use contracts::*;
pub use headers::*;
pub use logs::*;
pub use providers::*;
