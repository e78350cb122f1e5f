//! Port abstraction layer for serial communication.
//!
//! Provides the POSIX serial backend, a mock backend, the async dispatcher
//! and the `SerialPort` facade that ties them together.

pub mod async_port;
pub mod handle;
pub mod mock;
pub mod observer;
pub mod serial_port;
pub mod sync_port;
pub mod traits;

mod sys;

pub use async_port::{Dispatcher, PendingIo, DEFAULT_QUEUE_CAPACITY};
pub use handle::{FdHandle, FdPolicy, HandlePolicy, UniqueHandle};
pub use mock::{MockCall, MockSerialPort};
pub use observer::{hex_dump, NullObserver, TracingObserver, TransportEvent, TransportObserver};
pub use serial_port::SerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
