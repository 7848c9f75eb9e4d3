//! Common test utilities for the md-translator test suite

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use md_translator::{ChangeCache, JobScheduler, Result, TranslationError, TranslationPort};

/// How the mock answers a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Prefix every text with the target language
    Working,
    /// Fail any batch that contains the given marker, translate the rest
    FailOn(&'static str),
    /// Answer with one text less than requested
    Short,
}

/// Translator double that records every call
#[derive(Debug)]
pub struct MockTranslator {
    behavior: MockBehavior,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn working() -> Arc<Self> {
        Self::new(MockBehavior::Working)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    /// Every text sent so far, flattened
    pub fn sent_texts(&self) -> Vec<String> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl TranslationPort for MockTranslator {
    async fn translate(&self, texts: &[String], target_lang: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.to_vec());

        let translate = |t: &String| format!("[{}] {}", target_lang, t);
        match self.behavior {
            MockBehavior::Working => Ok(texts.iter().map(translate).collect()),
            MockBehavior::FailOn(marker) => {
                if texts.iter().any(|t| t.contains(marker)) {
                    Err(TranslationError::QuotaExceededError {
                        message: "Quota exceeded".to_string(),
                    })
                } else {
                    Ok(texts.iter().map(translate).collect())
                }
            }
            MockBehavior::Short => {
                let keep = texts.len().saturating_sub(1);
                Ok(texts.iter().take(keep).map(translate).collect())
            }
        }
    }
}

/// Write a file, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Scheduler over a mock with a cache stored in `root`
pub fn scheduler(root: &Path, translator: Arc<MockTranslator>) -> JobScheduler {
    let cache = ChangeCache::open(root).unwrap();
    JobScheduler::new(translator, cache).with_parallel(2)
}

pub const GUIDE: &str = "# Guide\n\nRead this first.\n\n```sh\ncargo run --release\n```\n\nThen continue.\n";
