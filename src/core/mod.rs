pub mod cancel;
pub mod destroyer;
pub mod runtime;
pub mod selection;
pub mod session;
