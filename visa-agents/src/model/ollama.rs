use super::{GenerationOptions, ModelError, TextGenerator};
use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use serde::{Deserialize, Serialize};
use shared_types::VisaRecord;
use std::time::Duration;

/// Seed used for deterministic decoding.
const DETERMINISTIC_SEED: u64 = 0;

/// HTTP client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    structured_output: bool,
}

/// Request body for /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: RequestOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Response body from /api/generate
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Response body from /api/tags
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
}

impl OllamaClient {
    /// Build the client and confirm the server is reachable and serves `model`.
    ///
    /// This is the one-time initialization of the model handle; an error here
    /// means no message should be processed.
    pub async fn connect(
        base_url: &str,
        model: &str,
        request_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        let client = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            structured_output: false,
        };

        let available = client.list_models().await?;
        if !is_model_available(&available, model) {
            return Err(ModelError::ModelNotFound {
                model: model.to_string(),
                available,
            });
        }

        tracing::info!(model = %client.model, base_url = %client.base_url, "Model ready");
        Ok(client)
    }

    /// Ask the server to constrain output to the visa record JSON schema.
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response.json().await.map_err(ModelError::from_body)?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn request_body<'a>(
        &'a self,
        prompt: &'a str,
        options: &GenerationOptions,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: RequestOptions {
                temperature: options.effective_temperature(),
                num_predict: options.max_output_tokens,
                seed: options.deterministic.then_some(DETERMINISTIC_SEED),
            },
            format: self.structured_output.then(visa_record_schema),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ModelError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.request_body(prompt, options);

        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(ModelError::from_body)?;
        if parsed.response.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }

        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// "llama2" is served as "llama2:latest"; an explicit tag must match exactly.
fn is_model_available(available: &[String], model: &str) -> bool {
    available.iter().any(|name| {
        name == model || (!model.contains(':') && name.as_str() == format!("{model}:latest"))
    })
}

/// JSON schema of [`VisaRecord`] with enum definitions inlined, for the `format` field.
pub fn visa_record_schema() -> serde_json::Value {
    let schema = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<VisaRecord>();
    serde_json::to_value(schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(structured_output: bool) -> OllamaClient {
        OllamaClient {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            base_url: "http://localhost:11434".to_string(),
            model: "llama2:7b-chat".to_string(),
            structured_output,
        }
    }

    #[test]
    fn test_deterministic_request_body() {
        let client = client(false);
        let options = GenerationOptions {
            max_output_tokens: 256,
            temperature: 0.7,
            deterministic: true,
        };

        let body = serde_json::to_value(client.request_body("hello", &options)).unwrap();
        assert_eq!(body["model"], "llama2:7b-chat");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["options"]["num_predict"], 256);
        assert_eq!(body["options"]["seed"], 0);
        assert!(body.get("format").is_none());
    }

    #[test]
    fn test_sampling_request_body_has_no_seed() {
        let client = client(false);
        let options = GenerationOptions {
            max_output_tokens: 512,
            temperature: 0.5,
            deterministic: false,
        };

        let body = serde_json::to_value(client.request_body("hello", &options)).unwrap();
        assert_eq!(body["options"]["temperature"], 0.5);
        assert!(body["options"].get("seed").is_none());
    }

    #[test]
    fn test_structured_output_sends_schema() {
        let client = client(true);
        let body =
            serde_json::to_value(client.request_body("hello", &GenerationOptions::default()))
                .unwrap();

        let properties = &body["format"]["properties"];
        for field in ["country", "visaRequirement", "duration", "notes"] {
            assert!(properties.get(field).is_some(), "schema missing {field}");
        }
    }

    #[test]
    fn test_schema_lists_requirement_values() {
        let schema = visa_record_schema().to_string();
        for label in ["Visa required", "Visa not required", "E-Visa", "Does not recognize RTD"] {
            assert!(schema.contains(label), "schema missing {label}");
        }
    }

    /// Serves one canned HTTP response on a local port and returns its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_list_models() {
        let base_url =
            serve_once("200 OK", r#"{"models":[{"name":"llama2:latest"},{"name":"mistral:7b"}]}"#)
                .await;
        let mut client = client(false);
        client.base_url = base_url;

        assert_eq!(
            client.list_models().await.unwrap(),
            vec!["llama2:latest".to_string(), "mistral:7b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let base_url = serve_once("200 OK", "<html>not json</html>").await;
        let mut client = client(false);
        client.base_url = base_url;

        assert!(matches!(
            client.list_models().await,
            Err(ModelError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let base_url = serve_once("500 Internal Server Error", "boom").await;
        let mut client = client(false);
        client.base_url = base_url;

        match client.list_models().await {
            Err(ModelError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_model_availability_matching() {
        let available = vec!["llama2:latest".to_string(), "mistral:7b".to_string()];
        assert!(is_model_available(&available, "llama2"));
        assert!(is_model_available(&available, "llama2:latest"));
        assert!(is_model_available(&available, "mistral:7b"));
        assert!(!is_model_available(&available, "mistral"));
        assert!(!is_model_available(&available, "llama2:13b"));
    }
}
