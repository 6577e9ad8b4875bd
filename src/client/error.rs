// This file is part of the terraform-provider-ibm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde_json::Value;

/// Status codes worth retrying
pub const RETRYABLE_STATUS: [u16; 8] = [408, 429, 500, 502, 503, 504, 520, 599];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {url} returned status {status}: {message}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: String,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unable to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unable to obtain an IAM token: {0}")]
    Token(#[source] Box<ApiError>),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => RETRYABLE_STATUS.contains(status),
            ApiError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }
}

/// Map a 404 to `None`
pub trait OrNotFound<T> {
    fn or_not_found(self) -> Result<Option<T>, ApiError>;
}

impl<T> OrNotFound<T> for Result<T, ApiError> {
    fn or_not_found(self) -> Result<Option<T>, ApiError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Extract a human readable message from an IBM Cloud error body
///
/// The services do not agree on a format, so the usual shapes are tried in turn:
/// `{"errors": [{"message": ..}]}`, `{"message": ..}`, `{"errorMessage": ..}`
/// and `{"error": ..}`. Anything else is returned as is.
pub fn extract_message(body: &str) -> String {
    let body = body.trim();
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|error| error.get("message").and_then(Value::as_str))
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    for key in ["message", "errorMessage", "error_description", "error"] {
        match value.get(key) {
            Some(Value::String(message)) => return message.clone(),
            Some(Value::Array(errors)) => {
                if let Some(message) = errors
                    .iter()
                    .find_map(|error| error.get("message").and_then(Value::as_str))
                {
                    return message.to_owned();
                }
            }
            _ => (),
        }
    }

    body.to_owned()
}
