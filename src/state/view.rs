/// Lifecycle of one asynchronous operation as seen by the UI
///
/// Every logical field of the view state (auth, feed, detail, add story, map)
/// holds exactly one of these. Transitions are `Idle -> Loading -> Success | Error`
/// and a new invocation moves a terminal state back to `Loading`.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

// `Idle` for any `T`, with no `T: Default` bound
impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Idle
    }
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    /// The payload, if this is `Success`
    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            ViewState::Idle => ViewState::Idle,
            ViewState::Loading => ViewState::Loading,
            ViewState::Success(data) => ViewState::Success(f(data)),
            ViewState::Error(message) => ViewState::Error(message),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ViewState<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => ViewState::Success(data),
            Err(e) => ViewState::Error(e.to_string()),
        }
    }
}
