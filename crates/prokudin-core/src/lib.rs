pub mod align;
pub mod color;
pub mod consts;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod session;
pub mod worker;
