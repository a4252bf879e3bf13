use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("no source material: {0}")] EmptySource(String),
    #[error("request already in flight: {0}")] ConcurrentRequest(String),
    #[error("transport error: {0}")] Transport(String),
    #[error("no content: {0}")] EmptyContent(String),
    #[error("missing instruction: {0}")] MissingInstruction(String),
    #[error("malformed response: {0}")] MalformedResponse(String),
    #[error("config error: {0}")] Config(String),
    #[error("io error: {0}")] Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeskError>;

impl DeskError {
    /// Message shown to the person at the keyboard; the display form above is for logs.
    pub fn user_message(&self) -> String {
        match self {
            DeskError::EmptySource(_) => "Please paste source material first".into(),
            DeskError::ConcurrentRequest(_) => {
                "Please wait for the current operation to complete".into()
            }
            DeskError::Transport(msg) => format!("Request failed: {msg}"),
            DeskError::EmptyContent(what) => format!("No content to {what}"),
            DeskError::MissingInstruction(_) => "Need both output and revision instructions".into(),
            DeskError::MalformedResponse(_) => "No content received from API. Please try again.".into(),
            DeskError::Config(msg) => format!("Configuration problem: {msg}"),
            DeskError::Io(e) => format!("File error: {e}"),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, DeskError::ConcurrentRequest(_))
    }
}

impl From<reqwest::Error> for DeskError {
    fn from(e: reqwest::Error) -> Self {
        DeskError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::MalformedResponse(e.to_string())
    }
}
