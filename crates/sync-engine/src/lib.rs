//! View synchronization primitives for the admin console.
//!
//! Every view owns a [`ViewContext`]; the countdown ticker, the polling loop
//! and the filter debouncer all run on child tokens of that context, so a
//! single [`ViewContext::teardown`] stops every timer the view started.

pub mod clock;
pub mod countdown;
pub mod debounce;
pub mod filters;
pub mod notify;
pub mod pagination;
pub mod polling;
pub mod view;

pub use clock::{Clock, SystemClock, TokioClock};
pub use countdown::{CountdownEngine, TimedEntity, TimerState, Urgency};
pub use debounce::Debouncer;
pub use filters::{FilterSet, QueryParams, ALL};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use pagination::PaginationState;
pub use polling::{FetchFn, Poller};
pub use view::{Collection, Page, QueryState, ViewContext, ViewOptions, ViewRuntime, ViewSource};
