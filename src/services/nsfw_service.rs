//! NSFW pre-check
//!
//! Images are classified by an external detection service. Every check is
//! kept in a bounded in-process log that backs the admin stats and audit views.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::NsfwConfig,
    constants::{NSFW_CHECK_LOG_CAPACITY, NSFW_FLAGGED_CATEGORIES},
    error::{AppError, AppResult},
    utils::sha256_hex,
};

/// Detector verdict for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_nsfw: bool,
    pub category: String,
    pub confidence: f64,
}

/// Image classifier seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NsfwDetector: Send + Sync {
    async fn classify(&self, image: Vec<u8>, file_name: String) -> AppResult<Classification>;
}

#[derive(Debug, Deserialize)]
struct DetectorResponse {
    category: String,
    confidence: f64,
    #[serde(default, alias = "isNSFW", alias = "isNsfw")]
    is_nsfw: Option<bool>,
}

/// Detector that posts the image to an HTTP classification endpoint
#[derive(Clone)]
pub struct HttpNsfwDetector {
    client: reqwest::Client,
    endpoint: String,
    threshold: f64,
}

impl HttpNsfwDetector {
    pub fn new(config: &NsfwConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.detector_url.clone(),
            threshold: config.threshold,
        })
    }
}

/// Flagged category at or above the threshold
pub fn is_flagged(category: &str, confidence: f64, threshold: f64) -> bool {
    NSFW_FLAGGED_CATEGORIES.contains(&category) && confidence >= threshold
}

#[async_trait]
impl NsfwDetector for HttpNsfwDetector {
    async fn classify(&self, image: Vec<u8>, file_name: String) -> AppResult<Classification> {
        let part = reqwest::multipart::Part::bytes(image).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Detection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Detection(format!(
                "Detector responded with status {}",
                response.status()
            )));
        }

        let body: DetectorResponse = response
            .json()
            .await
            .map_err(|e| AppError::Detection(format!("Malformed detector response: {}", e)))?;

        let is_nsfw = body
            .is_nsfw
            .unwrap_or_else(|| is_flagged(&body.category, body.confidence, self.threshold));

        Ok(Classification {
            is_nsfw,
            category: body.category,
            confidence: body.confidence,
        })
    }
}

/// One completed check, as shown in the admin audit view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NsfwCheckRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub file_name: String,
    pub file_hash: String,
    pub file_size: usize,
    pub category: String,
    pub confidence: f64,
    pub is_nsfw: bool,
}

/// Aggregate view over the retained checks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NsfwStats {
    pub total_checks: usize,
    pub approved: usize,
    pub rejected: usize,
    pub rejection_rate: f64,
    pub categories: BTreeMap<String, usize>,
}

/// Bounded log of recent checks, oldest evicted first
pub struct NsfwCheckLog {
    capacity: usize,
    records: Mutex<VecDeque<NsfwCheckRecord>>,
}

impl Default for NsfwCheckLog {
    fn default() -> Self {
        Self::with_capacity(NSFW_CHECK_LOG_CAPACITY)
    }
}

impl NsfwCheckLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, record: NsfwCheckRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent `limit` records, newest first
    pub fn recent(&self, limit: usize) -> Vec<NsfwCheckRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().rev().take(limit).cloned().collect()
    }

    pub fn stats(&self) -> NsfwStats {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());

        let total_checks = records.len();
        let rejected = records.iter().filter(|r| r.is_nsfw).count();
        let mut categories = BTreeMap::new();
        for record in records.iter() {
            *categories.entry(record.category.clone()).or_insert(0) += 1;
        }

        NsfwStats {
            total_checks,
            approved: total_checks - rejected,
            rejected,
            rejection_rate: if total_checks == 0 {
                0.0
            } else {
                round_confidence(rejected as f64 / total_checks as f64)
            },
            categories,
        }
    }
}

/// Round to two decimal places
pub fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// NSFW check service
pub struct NsfwService;

impl NsfwService {
    /// Classify an image and record the outcome
    ///
    /// The returned confidence is rounded to two decimals.
    pub async fn check<D: NsfwDetector + ?Sized>(
        detector: &D,
        log: &NsfwCheckLog,
        image: Vec<u8>,
        file_name: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Classification> {
        let file_hash = sha256_hex(&image);
        let file_size = image.len();

        let result = detector.classify(image, file_name.to_string()).await?;

        log.push(NsfwCheckRecord {
            timestamp: now,
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            file_hash,
            file_size,
            category: result.category.clone(),
            confidence: result.confidence,
            is_nsfw: result.is_nsfw,
        });

        if result.is_nsfw {
            tracing::warn!(
                user_id = %user_id,
                file_name = %file_name,
                category = %result.category,
                confidence = result.confidence,
                "Image rejected by NSFW check"
            );
        } else {
            tracing::debug!(user_id = %user_id, file_name = %file_name, "Image approved by NSFW check");
        }

        Ok(Classification {
            confidence: round_confidence(result.confidence),
            ..result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: &str, is_nsfw: bool) -> NsfwCheckRecord {
        NsfwCheckRecord {
            timestamp: Utc::now(),
            user_id: "anonymous".to_string(),
            file_name: "a.png".to_string(),
            file_hash: String::new(),
            file_size: 10,
            category: category.to_string(),
            confidence: 0.5,
            is_nsfw,
        }
    }

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(0.98765), 0.99);
        assert_eq!(round_confidence(0.1234), 0.12);
    }

    #[test]
    fn test_is_flagged() {
        assert!(is_flagged("porn", 0.7, 0.7));
        assert!(!is_flagged("porn", 0.69, 0.7));
        assert!(!is_flagged("neutral", 0.99, 0.7));
    }

    #[test]
    fn test_log_evicts_oldest() {
        let log = NsfwCheckLog::with_capacity(2);
        log.push(record("neutral", false));
        log.push(record("drawing", false));
        log.push(record("porn", true));

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].category, "porn");
        assert_eq!(recent[1].category, "drawing");

        let stats = log.stats();
        assert_eq!(stats.total_checks, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.rejection_rate, 0.5);
        assert_eq!(stats.categories.get("porn"), Some(&1));
    }

    #[tokio::test]
    async fn test_check_rounds_and_records() {
        let mut detector = MockNsfwDetector::new();
        detector
            .expect_classify()
            .withf(|image, name| image.len() == 3 && name == "cat.png")
            .returning(|_, _| {
                Ok(Classification {
                    is_nsfw: false,
                    category: "neutral".to_string(),
                    confidence: 0.91234,
                })
            });
        let log = NsfwCheckLog::default();

        let result = NsfwService::check(&detector, &log, vec![1, 2, 3], "cat.png", "user-1", Utc::now())
            .await
            .unwrap();
        assert_eq!(result.confidence, 0.91);
        assert!(!result.is_nsfw);

        let recent = log.recent(1);
        assert_eq!(recent[0].user_id, "user-1");
        assert_eq!(recent[0].file_hash, sha256_hex(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn test_check_propagates_detector_failure() {
        let mut detector = MockNsfwDetector::new();
        detector
            .expect_classify()
            .returning(|_, _| Err(AppError::Detection("unreachable".to_string())));
        let log = NsfwCheckLog::default();

        let err = NsfwService::check(&detector, &log, vec![0], "x.png", "anonymous", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Detection(_)));
        assert!(log.recent(10).is_empty());
    }
}
