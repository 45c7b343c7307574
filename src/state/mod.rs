pub mod collection;
pub mod measurement;
pub mod memo;
