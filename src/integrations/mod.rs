//! External service integrations.

pub mod omnidim {
    pub use crate::dispatcher::*;
}

pub mod google_sheets {
    pub use crate::sheets::*;
}
