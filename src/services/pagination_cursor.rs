/// Where the backward pagination currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing fetched since the last reset
    Fresh,
    HasMore,
    Exhausted,
}

/// Tracks the opaque server token for the next (older) page
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    next_page_token: Option<String>,
    has_more: bool,
    pages_loaded: usize,
}

impl PaginationCursor {
    pub fn new() -> Self {
        Self {
            next_page_token: None,
            has_more: true,
            pages_loaded: 0,
        }
    }

    /// Back to the first page; used on refresh
    pub fn reset(&mut self) {
        self.next_page_token = None;
        self.has_more = true;
        self.pages_loaded = 0;
    }

    /// Record a successfully fetched page. A page claiming more data but
    /// carrying no token is treated as the last one, since there is no way
    /// to ask for what follows it.
    pub fn advance(&mut self, new_token: Option<String>, more: bool) {
        self.pages_loaded += 1;
        self.has_more = more && new_token.is_some();
        if more && new_token.is_none() {
            tracing::warn!("Server reported more pages without a cursor token, stopping pagination");
        }
        self.next_page_token = if self.has_more { new_token } else { None };
    }

    pub fn state(&self) -> CursorState {
        if self.pages_loaded == 0 {
            CursorState::Fresh
        } else if self.has_more {
            CursorState::HasMore
        } else {
            CursorState::Exhausted
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new()
    }
}
