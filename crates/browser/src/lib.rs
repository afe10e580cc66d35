//! Headless browser management: a bounded pool of browser processes and
//! the session store mapping session ids to live pages.

pub mod pool;
pub mod session;

pub use pool::{BrowserHandle, BrowserPool, PoolError};
pub use session::{
    ActionRecord, AuxState, ConsoleLogEntry, NetworkLogEntry, Session, SessionError,
    SessionHandle, SessionPhase, SessionStore,
};
