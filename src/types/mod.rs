pub mod emissions;
pub mod pollutant;
pub mod reading;
pub mod region;
pub mod satellite;
pub mod station;
