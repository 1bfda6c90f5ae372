pub mod assert_emit;
pub mod cgen;
pub mod compile;
pub mod coverage;
pub mod driver_emit;
pub mod resolve;
pub mod unit_emit;
