// Library exports for Glazor
// This allows integration tests and external code to use Glazor modules

pub mod config;
pub mod db;
pub mod error;
pub mod password;
pub mod routes;
pub mod state;
pub mod upload;
