pub mod element;
pub mod math;
pub mod sort;
