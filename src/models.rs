use crate::errors::{AppError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    First,
    Last,
    Id(i64),
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.eq_ignore_ascii_case("first") {
            return Ok(Self::First);
        }
        if raw.eq_ignore_ascii_case("last") {
            return Ok(Self::Last);
        }
        raw.parse::<i64>()
            .map(Self::Id)
            .map_err(|_| AppError::InvalidSelector(format!("invalid ID format: {}", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Add {
        text: String,
        #[serde(default)]
        pinned: bool,
    },
    List,
    Remove {
        selector: String,
    },
    Clear,
    Pin {
        selector: String,
    },
    Unpin {
        selector: String,
    },
    Show {
        selector: String,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::List => "list",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
            Self::Pin { .. } => "pin",
            Self::Unpin { .. } => "unpin",
            Self::Show { .. } => "show",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteReply {
    pub note: Note,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListReply {
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Note(NoteReply),
    Notes(ListReply),
    Message(MessageReply),
    Error(ErrorReply),
}

impl Response {
    pub fn from_error(error: &AppError) -> Self {
        Self::Error(ErrorReply {
            kind: error.kind(),
            message: error.detail(),
        })
    }

    pub fn into_result(self) -> Result<Self, AppError> {
        match self {
            Self::Error(reply) => Err(AppError::from_wire(reply.kind, reply.message)),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, Response, Selector};
    use crate::errors::AppError;

    #[test]
    fn selector_keywords_ignore_case() {
        assert_eq!(Selector::parse("FIRST").expect("first"), Selector::First);
        assert_eq!(Selector::parse("Last").expect("last"), Selector::Last);
        assert_eq!(Selector::parse("42").expect("id"), Selector::Id(42));
    }

    #[test]
    fn selector_rejects_garbage() {
        assert!(matches!(Selector::parse("abc"), Err(AppError::InvalidSelector(_))));
        assert!(matches!(Selector::parse(" 1"), Err(AppError::InvalidSelector(_))));
        assert!(matches!(Selector::parse(""), Err(AppError::InvalidSelector(_))));
    }

    #[test]
    fn signed_integers_are_ids() {
        assert_eq!(Selector::parse("-1").expect("negative"), Selector::Id(-1));
        assert_eq!(Selector::parse("+3").expect("plus"), Selector::Id(3));
    }

    #[test]
    fn add_request_defaults_pinned_to_false() {
        let request: Request =
            serde_json::from_str(r#"{"op":"add","text":"Buy milk"}"#).expect("decode add");
        assert_eq!(
            request,
            Request::Add {
                text: "Buy milk".to_string(),
                pinned: false
            }
        );
    }

    #[test]
    fn unit_requests_are_tagged() {
        let json = serde_json::to_string(&Request::Clear).expect("encode");
        assert_eq!(json, r#"{"op":"clear"}"#);
    }

    #[test]
    fn error_response_converts_back_into_error() {
        let response = Response::from_error(&AppError::EmptyStore);
        assert!(matches!(response.into_result(), Err(AppError::EmptyStore)));
    }
}
