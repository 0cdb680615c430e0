//! 实时房间传输层：房间接入端口、数据通道解码与适配器。

mod adapter;
mod codec;

pub mod error;
pub mod traits;
pub mod types;

pub use adapter::TransportAdapter;
pub use codec::decode_data_event;
pub use error::{DecodeError, TransportError};
pub use traits::{RoomConnector, RoomSession};
pub use types::{DataEvent, RoomEvent};

#[cfg(test)]
pub(crate) mod testing;
