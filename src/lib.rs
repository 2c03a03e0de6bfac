pub mod config;
pub mod constants;
pub mod detection;
pub mod extractors;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod signals;
pub mod state;
pub mod validation;
pub mod vision;
