//! Directory lookup models

use serde::Deserialize;

/// Response from `/cgi-bin/user/getuserid`
#[derive(Debug, Deserialize)]
pub struct UserIdResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    pub userid: Option<String>,
}
