pub mod correlation;
pub mod outliers;
pub mod resample;
pub mod statistics;
