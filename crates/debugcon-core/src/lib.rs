pub mod bus;
pub mod channel;
pub mod context;
pub mod dispatch;

pub use bus::{EventBus, Outcome, EVENT_LOG_ENTRY, EVENT_OUTPUT_BEGIN, EVENT_OUTPUT_END, EVENT_OUTPUT_ENTRY};
pub use channel::{Channel, ChannelConfig, ChannelInfo};
pub use context::{ContextOptions, DebugContext};
pub use dispatch::{channel_visible, Dispatcher, OutputState, RenderCtx, Sink};
