pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;

pub use connection::ObserverConnection;
pub use handler::websocket_handler;
pub use hub::BroadcastHub;
pub use messages::WsMessage;
