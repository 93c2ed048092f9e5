pub mod pipeline;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{Port, Server, ServerConfig, ServerError, serve};
