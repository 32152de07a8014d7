//! The sample-sender capability and the reference HTTP implementation.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use crate::sample::Sample;
use crate::trace::Tags;

/// Accepts one finished batch and reports success. Implementations never
/// propagate faults to the caller; failures go to the diagnostic channel
/// and surface as `false`.
pub trait SampleSender: Send + Sync {
    fn send_sample(&self, sample: &Sample) -> impl Future<Output = bool> + Send;
}

/// Transport-level timeouts owned by this collaborator.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Reference sender: POSTs each sample to `<server>/ingest` in the folded
/// stack format, one `"<traceKey> <value>"` line per metric.
pub struct IngestSender {
    client: reqwest::Client,
    server: String,
    app_name: String,
    rate_hz: u32,
    static_tags: Tags,
    auth_token: String,
}

impl IngestSender {
    pub fn new(
        server: String,
        app_name: String,
        rate_hz: u32,
        static_tags: Tags,
        auth_token: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(TRANSFER_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            app_name,
            rate_hz,
            static_tags,
            auth_token,
        })
    }

    /// Renders `app{k=v,...}` from the static tags merged with the sample's
    /// tags; the sample wins on key collision.
    fn tagged_app_name(&self, sample_tags: &Tags) -> String {
        let mut merged = self.static_tags.clone();
        for (name, value) in sample_tags {
            merged.insert(name.clone(), value.clone());
        }

        let rendered: Vec<String> = merged
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        format!("{}{{{}}}", self.app_name, rendered.join(","))
    }

    fn ingest_url(&self, sample: &Sample) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &format!("{}/ingest", self.server),
            &[
                ("name", self.tagged_app_name(&sample.tags)),
                ("from", sample.from_ts.to_string()),
                ("until", sample.to_ts.to_string()),
                ("sampleRate", self.rate_hz.to_string()),
                ("format", "folded".to_string()),
            ],
        )
        .context("building ingest URL")
    }

    fn folded_body(samples: &HashMap<String, u64>) -> String {
        let mut body = String::with_capacity(samples.len() * 64);
        for (key, value) in samples {
            let _ = writeln!(body, "{key} {value}");
        }
        body
    }
}

impl SampleSender for IngestSender {
    async fn send_sample(&self, sample: &Sample) -> bool {
        let url = match self.ingest_url(sample) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "skipping sample with unbuildable ingest URL");
                return false;
            }
        };

        let mut request = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(Self::folded_body(&sample.samples));

        if !self.auth_token.is_empty() {
            request = request.bearer_auth(&self.auth_token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    true
                } else {
                    warn!(url = %url, status = %status, "ingest request rejected");
                    false
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "ingest request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(static_tags: &[(&str, &str)]) -> IngestSender {
        let tags = static_tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestSender::new(
            "http://pyroscope.local:4040/".to_string(),
            "app".to_string(),
            100,
            tags,
            String::new(),
        )
        .expect("client builds")
    }

    fn sample(tags: &[(&str, &str)]) -> Sample {
        Sample {
            from_ts: 100,
            to_ts: 110,
            samples: HashMap::from([("<main> (<internal>);usleep".to_string(), 3u64)]),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_ingest_url_carries_window_and_format() {
        let url = sender(&[]).ingest_url(&sample(&[])).expect("valid URL");
        assert_eq!(url.path(), "/ingest");

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("name".to_string(), "app{}".to_string())));
        assert!(query.contains(&("from".to_string(), "100".to_string())));
        assert!(query.contains(&("until".to_string(), "110".to_string())));
        assert!(query.contains(&("sampleRate".to_string(), "100".to_string())));
        assert!(query.contains(&("format".to_string(), "folded".to_string())));
    }

    #[test]
    fn test_trailing_slash_on_server_is_tolerated() {
        let url = sender(&[]).ingest_url(&sample(&[])).expect("valid URL");
        assert!(url.as_str().starts_with("http://pyroscope.local:4040/ingest?"));
    }

    #[test]
    fn test_sample_tags_merge_over_static_tags() {
        let name = sender(&[("host", "static"), ("role", "cli")])
            .tagged_app_name(&sample(&[("host", "fromSample")]).tags);
        assert_eq!(name, "app{host=fromSample,role=cli}");
    }

    #[test]
    fn test_folded_body_one_line_per_metric() {
        let body = IngestSender::folded_body(&HashMap::from([
            ("<main> (<internal>);usleep".to_string(), 3u64),
        ]));
        assert_eq!(body, "<main> (<internal>);usleep 3\n");
    }
}
