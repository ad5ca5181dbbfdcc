//! Directory lookups: mobile → userid plus raw pass-through queries

use super::client::WeComClient;
use crate::auth::TokenCache;
use crate::error::{Error, Result};
use crate::models::{ApiStatus, UserIdResponse};

impl<C: TokenCache> WeComClient<C> {
    /// Resolve a mobile number to the member's userid.
    pub async fn get_userid(&self, mobile: &str) -> Result<String> {
        let body = serde_json::json!({ "mobile": mobile });
        let resp: UserIdResponse = self.post_json("user/getuserid", &body).await?;

        if resp.errcode != 0 {
            let status = ApiStatus {
                errcode: resp.errcode,
                errmsg: resp.errmsg.clone(),
            };
            self.note_status(&status).await;
            return Err(Error::Lookup {
                mobile: mobile.to_string(),
                message: format!("errcode {}: {}", resp.errcode, resp.errmsg),
            });
        }

        resp.userid
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Lookup {
                mobile: mobile.to_string(),
                message: "response missing 'userid'".to_string(),
            })
    }

    /// Member details (`/cgi-bin/user/get`).
    pub async fn get_user_info(&self, userid: &str) -> Result<serde_json::Value> {
        self.passthrough("user/get", &[("userid", userid)]).await
    }

    /// Department tree below `id`; `None` lists every visible department.
    pub async fn list_departments(&self, id: Option<u64>) -> Result<serde_json::Value> {
        let id = id.map(|i| i.to_string());
        let query: Vec<(&str, &str)> = id.iter().map(|i| ("id", i.as_str())).collect();
        self.passthrough("department/simplelist", &query).await
    }

    /// Members of one department (`/cgi-bin/user/simplelist`).
    pub async fn list_department_users(&self, department_id: u64) -> Result<serde_json::Value> {
        let department_id = department_id.to_string();
        self.passthrough("user/simplelist", &[("department_id", department_id.as_str())])
            .await
    }

    async fn passthrough(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let body: serde_json::Value = self.get(path, query).await?;
        let status = ApiStatus::of(&body);
        if !status.is_ok() {
            self.note_status(&status).await;
            return Err(Error::Api {
                code: status.errcode,
                message: status.errmsg,
            });
        }
        Ok(body)
    }
}
