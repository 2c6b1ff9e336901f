pub(crate) mod error;
pub(crate) mod target;
pub(crate) mod target_group;

pub use error::TargetError;
pub use target::Target;
pub use target_group::TargetGroup;

pub use real_expressions;

#[cfg(test)]
mod tests;
