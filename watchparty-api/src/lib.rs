pub mod heartbeat;
pub mod http;
pub mod ws;

pub use http::{create_router, AppState};
pub use ws::dispatcher::Dispatcher;
pub use ws::hub::ConnectionHub;
