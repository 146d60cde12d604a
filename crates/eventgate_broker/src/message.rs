//! Message definitions for the broker
//!
//! `Message` is what publishers hand to the broker. It is decoded from the
//! publish endpoint's JSON body, whose field names are capitalised:
//!
//! - `Content`: payload written to the `data:` line(s) of the stream
//! - `User`: optional target subject; when set only that subject's clients
//!   receive the message
//! - `Type`: optional category; when set (and no `User`) only clients
//!   subscribed to exactly that category receive it
//!
//! A message with neither goes to every connected client. Empty strings count
//! as unset.

use eventgate_client::{Client, Frame};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "User", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Which clients a message is for. First match wins: subject, then category,
/// then everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Subject(&'a str),
    Category(&'a str),
    All,
}

impl Route<'_> {
    pub fn accepts(&self, client: &Client) -> bool {
        match self {
            Route::Subject(subject) => client.subject == *subject,
            Route::Category(category) => client.category.as_str() == *category,
            Route::All => true,
        }
    }
}

impl Message {
    pub fn broadcast(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            user: None,
            category: None,
        }
    }

    pub fn to_subject(content: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            user: Some(subject.into()),
            ..Self::broadcast(content)
        }
    }

    pub fn to_category(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::broadcast(content)
        }
    }

    pub fn route(&self) -> Route<'_> {
        if let Some(subject) = non_empty(&self.user) {
            Route::Subject(subject)
        } else if let Some(category) = non_empty(&self.category) {
            Route::Category(category)
        } else {
            Route::All
        }
    }

    /// Wire shape of this message. The category names the event even when a
    /// subject did the routing.
    pub fn frame(&self) -> Frame {
        Frame::new(self.category.clone(), self.content.clone())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
