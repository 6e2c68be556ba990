use super::{flexible_timestamp, string_or_number};
use crate::error::Result;
use crate::models::{AlertSource, InboundDeploy};
use crate::processing::normalize::extract_service_name;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// Jenkins notification plugin build event
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JenkinsBuildWebhook {
    #[serde(default)]
    pub name: Option<String>,

    #[validate(nested)]
    pub build: Build,

    #[validate(nested)]
    pub job: Job,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Build {
    #[serde(deserialize_with = "string_or_number")]
    #[validate(length(min = 1, max = 64))]
    pub number: String,

    /// Absent while the build is still running
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub phase: Option<String>,

    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub url: Option<String>,

    /// Version of the artifact produced by the build, if reported
    #[serde(default)]
    pub artifact: Option<String>,

    #[serde(default)]
    pub scm: Option<Scm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scm {
    #[serde(default)]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Job {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl JenkinsBuildWebhook {
    /// Identity is `<job>-<number>`, which is also the webhook id.
    ///
    /// The build timestamp is not part of the identity. It is optional in the
    /// payload, and build numbers only repeat across jobs, so job plus number
    /// is stable across redeliveries of the same build.
    pub fn into_deploy(self) -> Result<InboundDeploy> {
        let external_id = format!("{}-{}", self.job.name, self.build.number);
        let version = self
            .build
            .artifact
            .clone()
            .unwrap_or_else(|| format!("build-{}", self.build.number));

        Ok(InboundDeploy {
            source: AlertSource::Jenkins,
            webhook_id: external_id.clone(),
            external_id,
            service_name: extract_service_name(&self.job.name),
            version: Some(version),
            commit_sha: self.build.scm.and_then(|scm| scm.commit),
            status: self.build.status.unwrap_or_default(),
            started_at: self.build.timestamp,
        })
    }
}
