mod beacon;

pub use beacon::*;
