pub mod dns;
pub mod repositories;
pub mod server;

pub use server::FakeDns;
