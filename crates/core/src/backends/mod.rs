#[cfg(feature = "cil-backend")]
pub mod cil;

#[cfg(feature = "cil-backend")]
pub use cil::CilSource;
