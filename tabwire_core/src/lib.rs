//! Tabwire - per-tab network capture and retrieval engine
//!
//! Captures finished network exchanges for an inspected tab, filters out
//! static-asset noise, normalizes what remains into immutable records, and
//! persists them per tab with bounded retention. Display surfaces read the
//! store through a request/response handle and stay current through change
//! notifications backed by a polling sweep.
//!
//! Capture and display run in separate tasks that share nothing but the
//! storage substrate and the command channel; the substrate is the only
//! shared mutable resource, with one writer per tab-scoped key during an
//! active session.

pub mod backend;
pub mod body;
pub mod event;
pub mod filter;
pub mod har;
pub mod normalize;
pub mod record;
pub mod search;
pub mod session;
pub mod store;
pub mod view;

pub use backend::{FileStore, KeyChange, KeyValueStore, MemoryStore, StorageError};
pub use body::{format_body, FormattedBody};
pub use event::{
    BodyUnavailable, CaptureEvent, FetchBody, RawExchange, RawRequest, RawResponse, ResponseBody,
};
pub use har::{parse_har, read_har_file, HarError};
pub use record::{PageInfo, Record, TabInfo, BODY_UNAVAILABLE};
pub use session::{
    CaptureSession, ClearReply, InspectedPage, PanelHandle, RequestsReply, StaticPage, TabIdReply,
};
pub use store::{TabStore, DEFAULT_NAMESPACE, MAX_REQUESTS_PER_TAB, TAB_MAX_AGE_HOURS};
pub use view::{LiveView, ViewOptions, DEFAULT_POLL_INTERVAL};
