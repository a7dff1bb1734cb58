use isdash_core::search::SearchToken;

/// Control fields of a controller, guarded by the controller's mutex.
///
/// The result set and loading flag live in observables next to it, but are
/// only written while this state is locked.
#[derive(Debug, Default)]
pub(crate) struct SearchControl {
    /// Last token handed out; the next invocation gets `last_token.next()`
    pub last_token: SearchToken,
    pub current_token: Option<SearchToken>,
    pub page_index: u32,
    pub is_halted: bool,
}

impl SearchControl {
    /// Retires the current invocation and hands out a fresh token.
    pub fn mint(&mut self) -> SearchToken {
        let token = self.last_token.next();
        self.last_token = token;
        self.current_token = Some(token);
        self.page_index = 0;
        self.is_halted = false;
        token
    }

    pub fn is_current(&self, token: SearchToken) -> bool {
        self.current_token == Some(token)
    }

    pub fn halt(&mut self) {
        self.is_halted = true;
        self.page_index = 0;
    }
}

/// Snapshot of a controller's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState<R> {
    pub current_token: Option<SearchToken>,
    pub page_index: u32,
    pub is_halted: bool,
    pub is_loading: bool,
    pub accumulated_results: Vec<R>,
}
