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

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("the IAM token is not a JWT")]
    Malformed,
    #[error("unable to decode the IAM token payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unable to parse the IAM token claims: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the IAM token has no `{0}` claim")]
    MissingClaim(&'static str),
}

/// Account and user information carried by the IAM access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConfig {
    pub user_id: String,
    pub user_email: Option<String>,
    pub iam_id: Option<String>,
    pub account_id: String,
    pub cloud_name: String,
    pub cloud_type: String,
    pub generation: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Claims {
    id: Option<String>,
    iam_id: Option<String>,
    email: Option<String>,
    iss: Option<String>,
    exp: Option<i64>,
    account: Option<Account>,
}

#[derive(Debug, Default, Deserialize)]
struct Account {
    bss: Option<String>,
}

fn decode(token: &str) -> Result<Claims, ClaimsError> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ClaimsError::Malformed);
    };
    let payload = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Extract the user details from an access token
///
/// The signature is not checked: the token comes straight from IAM.
pub fn user_details(token: &str, generation: i64) -> Result<UserConfig, ClaimsError> {
    let claims = decode(token)?;

    let user_id = claims
        .id
        .or_else(|| claims.iam_id.clone())
        .ok_or(ClaimsError::MissingClaim("id"))?;
    let account_id = claims
        .account
        .and_then(|account| account.bss)
        .ok_or(ClaimsError::MissingClaim("account.bss"))?;
    let cloud_name = match &claims.iss {
        Some(iss) if iss.contains("https://iam.cloud.ibm.com") => "bluemix",
        _ => "staging",
    };

    Ok(UserConfig {
        user_id,
        user_email: claims.email,
        iam_id: claims.iam_id,
        account_id,
        cloud_name: cloud_name.to_owned(),
        cloud_type: String::from("public"),
        generation,
    })
}

/// Expiration timestamp of a token, if it can be read
pub fn expiration(token: &str) -> Option<i64> {
    decode(token).ok()?.exp
}
