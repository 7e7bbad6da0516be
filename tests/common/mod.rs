//! Hand-rolled collaborator doubles shared by the integration tests. Each
//! mock records its calls into a shared log so tests can assert on call
//! counts and cross-collaborator ordering.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::str::FromStr;

use agritrust_core::db::models::Batch;
use agritrust_core::ipfs::UploadError;
use agritrust_core::ledger::LedgerError;
use agritrust_core::ports::{
    BatchRepository, EventLog, ImageStore, RepositoryError, RepositoryResult, TokenMinter,
};
use agritrust_core::services::listings::ListingCache;
use agritrust_core::services::registration::RegistrationService;

pub const TOPIC_ID: &str = "0.0.123";
pub const TOKEN_ID: &str = "0.0.456";
pub const FARMER: &str = "0.0.5768282";

#[derive(Default)]
pub struct CallLog {
    entries: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn record(&self, name: &str) {
        self.entries.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries().iter().filter(|entry| *entry == name).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries().iter().position(|entry| entry == name)
    }
}

pub struct MockEventLog {
    pub log: Arc<CallLog>,
    pub sequence: Option<&'static str>,
    pub fail: bool,
}

#[async_trait]
impl EventLog for MockEventLog {
    async fn submit_message(
        &self,
        _topic_id: &str,
        _message: &[u8],
    ) -> Result<Option<BigDecimal>, LedgerError> {
        self.log.record("submit");
        if self.fail {
            return Err(LedgerError::Gateway {
                status: "INSUFFICIENT_TX_FEE".to_string(),
                message: "operator balance too low".to_string(),
            });
        }
        Ok(self
            .sequence
            .map(|raw| BigDecimal::from_str(raw).expect("valid decimal")))
    }
}

pub struct MockMinter {
    pub log: Arc<CallLog>,
    pub serial: &'static str,
    pub fail: bool,
}

#[async_trait]
impl TokenMinter for MockMinter {
    async fn mint(&self, _token_id: &str, _metadata: &[u8]) -> Result<String, LedgerError> {
        self.log.record("mint");
        if self.fail {
            return Err(LedgerError::Gateway {
                status: "INVALID_SIGNATURE".to_string(),
                message: "supply key mismatch".to_string(),
            });
        }
        Ok(self.serial.to_string())
    }
}

pub struct MockImageStore {
    pub log: Arc<CallLog>,
    pub fail: bool,
    /// Last document handed to `pin_json`, for shape assertions.
    pub pinned_json: Mutex<Option<serde_json::Value>>,
}

impl MockImageStore {
    pub fn new(log: Arc<CallLog>, fail: bool) -> Self {
        Self {
            log,
            fail,
            pinned_json: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn pin_file(&self, _filename: &str, _bytes: Vec<u8>) -> Result<String, UploadError> {
        self.log.record("pin_file");
        if self.fail {
            return Err(UploadError::Service {
                status: 500,
                message: "pinning backend down".to_string(),
            });
        }
        Ok("bafybeimockimagecid".to_string())
    }

    async fn pin_json(
        &self,
        _name: &str,
        document: &serde_json::Value,
    ) -> Result<String, UploadError> {
        self.log.record("pin_json");
        *self.pinned_json.lock().unwrap() = Some(document.clone());
        if self.fail {
            return Err(UploadError::Service {
                status: 500,
                message: "pinning backend down".to_string(),
            });
        }
        Ok("bafkreimockmetadatacid".to_string())
    }
}

pub struct MockRepository {
    pub log: Arc<CallLog>,
    pub batches: Mutex<Vec<Batch>>,
    pub conflict: bool,
}

impl MockRepository {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            batches: Mutex::new(Vec::new()),
            conflict: false,
        }
    }

    pub fn with_conflict(log: Arc<CallLog>) -> Self {
        Self {
            log,
            batches: Mutex::new(Vec::new()),
            conflict: true,
        }
    }

    pub fn seed(&self, batch: Batch) {
        self.batches.lock().unwrap().push(batch);
    }

    pub fn stored(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchRepository for MockRepository {
    async fn insert(&self, batch: &Batch) -> RepositoryResult<Batch> {
        self.log.record("insert");
        if self.conflict {
            return Err(RepositoryError::Conflict("batches_nft_id_key".to_string()));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(batch.clone())
    }

    async fn find_for_farmer(
        &self,
        batch_id: &str,
        farmer_account_id: &str,
    ) -> RepositoryResult<Option<Batch>> {
        self.log.record("find");
        Ok(self
            .batches
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == batch_id && b.farmer_account_id == farmer_account_id)
            .cloned())
    }

    async fn list_for_farmer(&self, farmer_account_id: &str) -> RepositoryResult<Vec<Batch>> {
        self.log.record("list");
        let mut listed: Vec<Batch> = self
            .batches
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.farmer_account_id == farmer_account_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));
        Ok(listed)
    }
}

pub struct Harness {
    pub log: Arc<CallLog>,
    pub repository: Arc<MockRepository>,
    pub images: Option<Arc<MockImageStore>>,
    pub listings: Arc<ListingCache>,
    pub service: Arc<RegistrationService>,
}

pub struct HarnessOptions {
    pub sequence: Option<&'static str>,
    pub fail_submit: bool,
    pub fail_mint: bool,
    pub image_store: ImageStoreMode,
    pub conflict: bool,
}

pub enum ImageStoreMode {
    NotConfigured,
    Working,
    Failing,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            sequence: Some("42"),
            fail_submit: false,
            fail_mint: false,
            image_store: ImageStoreMode::NotConfigured,
            conflict: false,
        }
    }
}

pub fn build_harness(options: HarnessOptions) -> Harness {
    let log = Arc::new(CallLog::default());

    let events = Arc::new(MockEventLog {
        log: log.clone(),
        sequence: options.sequence,
        fail: options.fail_submit,
    });
    let minter = Arc::new(MockMinter {
        log: log.clone(),
        serial: "7",
        fail: options.fail_mint,
    });
    let repository = Arc::new(if options.conflict {
        MockRepository::with_conflict(log.clone())
    } else {
        MockRepository::new(log.clone())
    });
    let images = match options.image_store {
        ImageStoreMode::NotConfigured => None,
        ImageStoreMode::Working => Some(Arc::new(MockImageStore::new(log.clone(), false))),
        ImageStoreMode::Failing => Some(Arc::new(MockImageStore::new(log.clone(), true))),
    };
    let listings = Arc::new(ListingCache::new());

    let service = Arc::new(RegistrationService::new(
        events,
        minter,
        images
            .clone()
            .map(|store| store as Arc<dyn agritrust_core::ports::ImageStore>),
        repository.clone(),
        listings.clone(),
        TOPIC_ID.to_string(),
        TOKEN_ID.to_string(),
    ));

    Harness {
        log,
        repository,
        images,
        listings,
        service,
    }
}
