pub mod coordinator;
pub mod session;

pub use coordinator::{
    Applied, PendingRequest, Phase, RequestToken, SearchCoordinator, SearchResult, SearchStatus,
};
pub use session::{SearchSession, SessionEvent};
