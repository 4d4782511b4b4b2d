pub mod calendar;
mod config;
pub mod events;
mod generators;
pub mod instrument;
pub mod ledger;
pub mod money;
pub mod order;
pub mod user;

pub use calendar::MarketSchedule;
pub use config::SimConfig;
pub use events::MarketEvent;
pub use generators::{apply_fluctuation, PriceWalk};
pub use instrument::{Instrument, InstrumentDraft, PricePoint};
pub use ledger::{Holding, LedgerError, PortfolioPosition};
pub use order::{NewOrder, Order, OrderSide, OrderStatus, MAX_ORDER_QUANTITY};
pub use user::{NewUser, UserProfile, UserRole};
