//! The boundary to the externally supplied, pre-trained potential.
pub mod deployed;
pub mod metadata;
pub mod record;
