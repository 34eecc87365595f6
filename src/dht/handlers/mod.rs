//! Routing event loop and message handlers.

mod client;
mod dispatch;
mod peers;
mod route;
mod rx_loop;
mod timeout;
mod trail;
mod walk;
