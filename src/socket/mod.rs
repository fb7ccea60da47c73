pub mod client;
pub mod protocol;
pub mod server;

pub use protocol::Request;
pub use server::{ControlMessage, SocketServer};
