use crate::config::StoreConfig;
use crate::engine::{restore_series, to_raw_table};
use crate::error::Result;
use crate::ingestion::{read_csv_table, write_csv_table};
use crate::model::{train_model, TrainedModel};
use crate::schema::ModelMetadata;
use crate::UsageSeries;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct LiveModel {
    /// Hash of the dataset the model was trained on. `None` for a model
    /// loaded from disk, whose training data is unknown.
    dataset_hash: Option<String>,
    model: TrainedModel,
    metadata: ModelMetadata,
}

/// Owns the persisted dataset, model and metadata.
///
/// Every write happens under one lock, so concurrent uploads and retrains are
/// applied one at a time. The live model is cached against a SHA-256 of the
/// dataset it was trained on and only refitted when the data changes.
#[derive(Debug)]
pub struct ModelStore {
    config: StoreConfig,
    live: Mutex<Option<LiveModel>>,
}

impl ModelStore {
    /// Creates the store directories and loads any previously persisted model.
    pub fn open(config: StoreConfig) -> Result<Self> {
        for dir in [&config.data_dir, &config.upload_dir, &config.model_dir] {
            fs::create_dir_all(dir)?;
        }

        let live = load_persisted_model(&config);
        if let Some(live) = &live {
            info!("Loaded persisted {} model", live.model.kind());
        }

        Ok(Self {
            config,
            live: Mutex::new(live),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Option<LiveModel>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads the canonical dataset. A missing file is an empty dataset.
    pub fn load_dataset(&self) -> Result<UsageSeries> {
        let path = self.config.dataset_path();
        if !path.exists() {
            return Ok(UsageSeries::new());
        }
        let table = read_csv_table(fs::File::open(&path)?)?;
        let series = restore_series(&table)?;
        debug!("Loaded {} months from {}", series.len(), path.display());
        Ok(series)
    }

    /// Keeps a copy of an uploaded file. Only the final path component of
    /// `file_name` is used.
    pub fn archive_upload(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("upload.csv");
        let path = self.config.upload_dir.join(base);
        fs::write(&path, bytes)?;
        debug!("Archived upload to {}", path.display());
        Ok(path)
    }

    /// Replaces the canonical dataset and retrains on it.
    pub fn replace_dataset(&self, series: &UsageSeries) -> Result<(TrainedModel, ModelMetadata)> {
        let mut live = self.lock();
        let encoded = encode_dataset(series)?;
        write_atomically(&self.config.dataset_path(), &encoded)?;
        info!("Persisted dataset with {} months", series.len());

        let fresh = self.train_and_persist(series, dataset_hash(&encoded))?;
        let result = (fresh.model.clone(), fresh.metadata.clone());
        *live = Some(fresh);
        Ok(result)
    }

    /// Reads the dataset and the model trained on it as one consistent view.
    ///
    /// The read and any retrain happen under the writer lock, so an upload
    /// can never land between them. The live model is reused when the
    /// SHA-256 of the dataset matches the one it was trained on.
    pub fn trained_snapshot(&self) -> Result<(UsageSeries, TrainedModel, ModelMetadata)> {
        let mut live = self.lock();
        let series = self.load_dataset()?;
        let hash = dataset_hash(&encode_dataset(&series)?);

        if let Some(current) = live.as_ref() {
            if current.dataset_hash.as_deref() == Some(hash.as_str()) {
                debug!("Model cache hit for dataset {}", &hash[..12]);
                return Ok((series, current.model.clone(), current.metadata.clone()));
            }
        }

        let fresh = self.train_and_persist(&series, hash)?;
        let result = (series, fresh.model.clone(), fresh.metadata.clone());
        *live = Some(fresh);
        Ok(result)
    }

    /// Metadata of the live model, if any has been trained or loaded.
    pub fn current_metadata(&self) -> Option<ModelMetadata> {
        self.lock().as_ref().map(|live| live.metadata.clone())
    }

    fn train_and_persist(&self, series: &UsageSeries, hash: String) -> Result<LiveModel> {
        let (model, metadata) = train_model(series);

        write_atomically(&self.config.model_path(), &serde_json::to_vec_pretty(&model)?)?;
        write_atomically(
            &self.config.metadata_path(),
            &serde_json::to_vec_pretty(&metadata)?,
        )?;

        Ok(LiveModel {
            dataset_hash: Some(hash),
            model,
            metadata,
        })
    }
}

/// Canonical CSV bytes of a series. Also the input to [`dataset_hash`].
pub fn encode_dataset(series: &UsageSeries) -> Result<Vec<u8>> {
    write_csv_table(&to_raw_table(series), Vec::new())
}

pub fn dataset_hash(encoded: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(encoded);
    format!("{:x}", hasher.finalize())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn load_persisted_model(config: &StoreConfig) -> Option<LiveModel> {
    let model_path = config.model_path();
    let metadata_path = config.metadata_path();
    if !model_path.exists() || !metadata_path.exists() {
        return None;
    }

    let read = || -> Result<LiveModel> {
        let model: TrainedModel = serde_json::from_slice(&fs::read(&model_path)?)?;
        let metadata: ModelMetadata = serde_json::from_slice(&fs::read(&metadata_path)?)?;
        Ok(LiveModel {
            dataset_hash: None,
            model,
            metadata,
        })
    };

    match read() {
        Ok(live) => Some(live),
        Err(e) => {
            warn!("Ignoring unreadable persisted model: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataOrigin, UsagePoint};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_series() -> UsageSeries {
        [(1, 100.0, 20.0), (2, 120.5, 24.1), (3, 90.0, 18.0)]
            .into_iter()
            .map(|(m, consumption, bill_amount)| {
                (
                    NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
                    UsagePoint {
                        consumption,
                        bill_amount,
                        origin: DataOrigin::Interpolated,
                    },
                )
            })
            .collect()
    }

    fn series_at_rate(rate: f64) -> UsageSeries {
        sample_series()
            .into_iter()
            .map(|(month, point)| {
                let bill_amount = point.consumption * rate;
                (month, UsagePoint { bill_amount, ..point })
            })
            .collect()
    }

    fn open_temp() -> (TempDir, ModelStore) {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::open(StoreConfig::rooted_at(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_directories() {
        let (dir, store) = open_temp();
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("models").is_dir());
        assert!(store.load_dataset().unwrap().is_empty());
        assert!(store.current_metadata().is_none());
    }

    #[test]
    fn test_dataset_round_trips_through_disk() {
        let (_dir, store) = open_temp();
        let series = sample_series();
        store.replace_dataset(&series).unwrap();

        let loaded = store.load_dataset().unwrap();
        assert_eq!(loaded.len(), 3);
        for ((m1, p1), (m2, p2)) in series.iter().zip(loaded.iter()) {
            assert_eq!(m1, m2);
            assert_eq!(p1.consumption, p2.consumption);
            assert_eq!(p1.bill_amount, p2.bill_amount);
            assert_eq!(p2.origin, DataOrigin::Observed);
        }
    }

    #[test]
    fn test_cache_hit_skips_retraining() {
        let (_dir, store) = open_temp();
        let series = sample_series();
        let (_, first) = store.replace_dataset(&series).unwrap();

        // The reloaded dataset encodes identically, so the cached model is reused.
        let (reloaded, _, second) = store.trained_snapshot().unwrap();
        assert_eq!(first.last_training_date, second.last_training_date);

        let mut changed = reloaded.clone();
        if let Some(point) = changed.values_mut().next() {
            point.consumption += 1.0;
        }
        assert_ne!(
            dataset_hash(&encode_dataset(&changed).unwrap()),
            dataset_hash(&encode_dataset(&reloaded).unwrap())
        );
    }

    #[test]
    fn test_snapshot_after_interleaved_upload_sees_newest_dataset() {
        let (_dir, store) = open_temp();
        store.replace_dataset(&series_at_rate(0.1)).unwrap();
        let stale = store.load_dataset().unwrap();
        store.replace_dataset(&series_at_rate(0.5)).unwrap();

        let (series, _, metadata) = store.trained_snapshot().unwrap();
        let first_bill = |s: &UsageSeries| s.values().next().map(|p| p.bill_amount);
        assert_ne!(first_bill(&series), first_bill(&stale));
        assert!((metadata.avg_rate_per_kwh - 0.5).abs() < 1e-12);

        let persisted: ModelMetadata =
            serde_json::from_slice(&fs::read(store.config().metadata_path()).unwrap()).unwrap();
        assert_eq!(persisted, metadata);
    }

    #[test]
    fn test_snapshot_retrains_when_file_changes_underneath() {
        let (_dir, store) = open_temp();
        store.replace_dataset(&series_at_rate(0.1)).unwrap();

        let encoded = encode_dataset(&series_at_rate(0.3)).unwrap();
        write_atomically(&store.config().dataset_path(), &encoded).unwrap();

        let (_, _, metadata) = store.trained_snapshot().unwrap();
        assert!((metadata.avg_rate_per_kwh - 0.3).abs() < 1e-12);
        assert_eq!(store.current_metadata(), Some(metadata));
    }

    #[test]
    fn test_persisted_model_is_loaded_on_open() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::rooted_at(dir.path());
        let (model, metadata) = {
            let store = ModelStore::open(config.clone()).unwrap();
            store.replace_dataset(&sample_series()).unwrap()
        };

        let reopened = ModelStore::open(config.clone()).unwrap();
        assert_eq!(reopened.current_metadata(), Some(metadata));

        let on_disk: TrainedModel =
            serde_json::from_slice(&fs::read(config.model_path()).unwrap()).unwrap();
        assert_eq!(on_disk, model);
    }

    #[test]
    fn test_archive_strips_directories() {
        let (dir, store) = open_temp();
        let path = store.archive_upload("../../etc/usage.csv", b"Month\n").unwrap();
        assert_eq!(path, dir.path().join("uploads").join("usage.csv"));
        assert_eq!(fs::read(&path).unwrap(), b"Month\n");
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = dataset_hash(b"abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
