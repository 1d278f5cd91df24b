pub mod run;
pub mod workers;
