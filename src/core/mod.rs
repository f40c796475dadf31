// Domain-layer modules and shared errors/models
pub mod processor {
    pub use crate::processor::*;
}

pub mod poller {
    pub use crate::poller::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
