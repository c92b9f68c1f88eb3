//! The module for the Cubefold CLI commands.

mod cat;
mod interpret;
mod pass;
mod test;

pub use self::{cat::*, interpret::*, pass::*, test::*};
