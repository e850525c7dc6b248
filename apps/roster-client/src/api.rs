use async_trait::async_trait;
use reqwest::{Client, Response, multipart};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    error::{ClientError, ClientResult},
    model::{AvatarFile, CreateEmployee, Employee, EmployeeStatus},
};

/// Operations the roster view needs from the service.
#[async_trait]
pub trait RosterBackend: Send + Sync {
    async fn list(&self) -> ClientResult<Vec<Employee>>;
    async fn create(&self, input: &CreateEmployee) -> ClientResult<Employee>;
    async fn update_status(&self, id: i32, status: EmployeeStatus) -> ClientResult<Employee>;
    async fn upload_avatar(&self, id: i32, file: AvatarFile) -> ClientResult<Employee>;
    async fn delete(&self, id: i32) -> ClientResult<()>;
}

#[derive(Clone, Debug)]
pub struct HttpRoster {
    client: Client,
    base: Url,
}

impl HttpRoster {
    pub fn new(base: &str) -> ClientResult<Self> {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: &str) -> ClientResult<Self> {
        let mut base = Url::parse(base).map_err(|source| ClientError::InvalidBase {
            base: base.to_string(),
            source,
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|source| ClientError::InvalidBase {
                base: self.base.to_string(),
                source,
            })
    }
}

#[async_trait]
impl RosterBackend for HttpRoster {
    #[instrument(skip(self))]
    async fn list(&self) -> ClientResult<Vec<Employee>> {
        let resp = self.client.get(self.url("employees")?).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create(&self, input: &CreateEmployee) -> ClientResult<Employee> {
        let resp = self
            .client
            .post(self.url("employees")?)
            .json(input)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: i32, status: EmployeeStatus) -> ClientResult<Employee> {
        let resp = self
            .client
            .patch(self.url(&format!("employees/{id}/status"))?)
            .json(&json!({ "status": status.as_str() }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    #[instrument(skip(self, file), fields(file = %file.file_name, bytes = file.bytes.len()))]
    async fn upload_avatar(&self, id: i32, file: AvatarFile) -> ClientResult<Employee> {
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(self.url(&format!("employees/{id}/avatar"))?)
            .multipart(form)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> ClientResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("employees/{id}"))?)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turns a non-2xx response into `ClientError::Status`, keeping the server's text.
async fn check(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %text, "request rejected");
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gains_trailing_slash() {
        let api = HttpRoster::new("http://localhost:3000/api").unwrap();
        assert_eq!(api.base().as_str(), "http://localhost:3000/api/");
        assert_eq!(
            api.url("employees/4/status").unwrap().as_str(),
            "http://localhost:3000/api/employees/4/status"
        );
    }

    #[test]
    fn rejects_unparseable_base() {
        let err = HttpRoster::new("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidBase { .. }));
    }
}
