//! WebSocket Push
//!
//! Pushes notification stack changes to dashboard clients via WebSocket.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/ws`, receive the current stack, and get these topics:
//! - `notifications` - Shown, dismissed and restacked notifications (subscribed on connect)
//! - `system` - Do-not-disturb changes
//!
//! Clicking a notification away is sent back as `{"type": "dismiss", "id": ...}`.
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8086/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topics: ['system']}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   console.log('Received:', msg);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent, TOPIC_NOTIFICATIONS, TOPIC_SYSTEM};
