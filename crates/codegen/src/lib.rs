//! Cubefold code generation library.
//!
//! This crate holds a small SSA intermediate representation of integer arithmetic and
//! the passes that run over it. The interesting one is [`cube_fold`], which recognises the
//! expanded binomial cube `a³ + 3a²b + 3ab² + b³` and rewrites it as `(a + b)³`.
#![deny(missing_docs)]

pub use crate::context::Context;
pub use crate::passes::{PassInfo, Pipeline};
pub use crate::result::{CodegenError, CodegenResult};
pub use crate::verifier::verify_function;
pub use crate::write::write_function;

pub use cranelift_entity as entity;

pub mod cube_fold;
pub mod cursor;
pub mod dce;
pub mod ir;
pub mod passes;
pub mod settings;
pub mod timing;
pub mod verifier;
pub mod write;

mod context;
mod result;

/// Even when trace logging is disabled, the trace macro has a significant performance cost so we
/// disable it by default.
#[macro_export]
macro_rules! trace {
    ($($tt:tt)*) => {
        if cfg!(any(feature = "trace-log", debug_assertions)) {
            ::log::trace!($($tt)*);
        }
    };
}
