//! Application state for Axum handlers.

use courier_core::OrderService;

/// State shared by every handler.
///
/// `OrderService` holds its collaborators behind `Arc`s, so cloning the state
/// per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Order lifecycle operations.
    pub orders: OrderService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(orders: OrderService) -> Self {
        Self { orders }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
