pub mod errors;
pub mod response;
pub mod state;
pub mod routes;
pub mod startup;

pub use startup::run;
