pub mod broker;
pub mod chromelogger;
pub mod chunk;
pub mod firephp;
pub mod html;
pub mod render;
pub mod substitution;
pub mod table;
pub mod text;

pub use broker::{Broker, BrokerMessage, BrokerSink};
pub use chromelogger::ChromeLoggerSink;
pub use chunk::{chunk_payload, BudgetStatus, MessageBudget};
pub use firephp::FirephpSink;
pub use html::HtmlSink;
pub use text::{ColorPolicy, TextSink};
