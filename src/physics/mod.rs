pub mod operator;
pub mod scaling;
