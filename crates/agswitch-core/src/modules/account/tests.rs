use super::*;
use crate::error::AppError;
use crate::modules::device::generate_profile;
use agswitch_types::error::{ProfileError, SwitchFailure, SwitchFailureReason};
use agswitch_types::models::{
    AccountBackupData, AccountIndex, AccountInfo, DeviceProfile, SwitchScope,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::oneshot;

struct FakeProcess {
    stops: AtomicUsize,
    starts: AtomicUsize,
}

#[async_trait]
impl ProcessController for FakeProcess {
    async fn is_running(&self) -> bool {
        false
    }

    async fn stop(&self, _timeout: Duration) -> AppResult<bool> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn start(&self) -> AppResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FakeBackups {
    fail_restore: AtomicBool,
    restored: Mutex<Vec<String>>,
    /// When set, `restore` parks on it until released
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    restore_entered: AtomicBool,
}

impl FakeBackups {
    fn hold_restore(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock() = Some(rx);
        tx
    }
}

#[async_trait]
impl BackupStore for FakeBackups {
    async fn backup(&self, account: &Account) -> AppResult<AccountBackupData> {
        let mut data = serde_json::Map::new();
        let status = serde_json::json!({ "email": account.email }).to_string();
        let _ = data.insert("antigravityAuthStatus".to_string(), status.into());
        Ok(AccountBackupData::new(account.clone(), data))
    }

    async fn restore(&self, backup: &AccountBackupData) -> AppResult<()> {
        self.restore_entered.store(true, Ordering::SeqCst);
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(AppError::Storage("database is locked".to_string()));
        }
        self.restored.lock().push(backup.account.email.clone());
        Ok(())
    }
}

/// JSON index whose saves can be switched off mid-test.
struct FlakyIndex {
    inner: JsonAccountIndex,
    fail_saves: Arc<AtomicBool>,
}

impl AccountIndexStore for FlakyIndex {
    fn load(&self) -> AppResult<AccountIndex> {
        self.inner.load()
    }

    fn save(&self, index: &AccountIndex) -> AppResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Storage("disk full".to_string()));
        }
        self.inner.save(index)
    }
}

struct FakeIdentity(Mutex<AccountInfo>);

#[async_trait]
impl IdentityProbe for FakeIdentity {
    async fn current_identity(&self) -> AppResult<AccountInfo> {
        Ok(self.0.lock().clone())
    }
}

fn write_storage(path: &Path, profile: &DeviceProfile) {
    let json = serde_json::json!({
        "telemetry": {
            "machineId": profile.machine_id,
            "macMachineId": profile.mac_machine_id,
            "devDeviceId": profile.dev_device_id,
            "sqmId": profile.sqm_id,
        }
    });
    std::fs::write(path, serde_json::to_vec_pretty(&json).unwrap()).unwrap();
}

struct Fixture {
    _dir: TempDir,
    original: DeviceProfile,
    process: Arc<FakeProcess>,
    backups: Arc<FakeBackups>,
    identity: Arc<FakeIdentity>,
    fail_index_saves: Arc<AtomicBool>,
    service: AccountService,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage_dir = dir.path().join("globalStorage");
        std::fs::create_dir_all(&storage_dir).unwrap();
        let storage = storage_dir.join("storage.json");
        let original = generate_profile();
        write_storage(&storage, &original);

        let paths = DataPaths::new(dir.path().join("data"));
        paths.ensure_dirs().unwrap();
        let process = Arc::new(FakeProcess { stops: AtomicUsize::new(0), starts: AtomicUsize::new(0) });
        let backups = Arc::new(FakeBackups::default());
        let identity = Arc::new(FakeIdentity(Mutex::new(AccountInfo {
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            is_authenticated: true,
        })));

        let fail_index_saves = Arc::new(AtomicBool::new(false));
        let index = FlakyIndex {
            inner: JsonAccountIndex::new(paths.accounts_file()),
            fail_saves: Arc::clone(&fail_index_saves),
        };

        let service = AccountService::from_parts(AccountServiceParts {
            index: Box::new(index),
            profiles: DeviceProfileManager::new(storage, paths.baseline_file()),
            paths,
            config: AppConfig::new(),
            backups: Arc::clone(&backups) as Arc<dyn BackupStore>,
            identity: Arc::clone(&identity) as Arc<dyn IdentityProbe>,
            process: Arc::clone(&process) as Arc<dyn ProcessController>,
        });
        Self { _dir: dir, original, process, backups, identity, fail_index_saves, service }
    }

    fn sign_in(&self, email: &str) {
        *self.identity.0.lock() = AccountInfo {
            email: email.to_string(),
            name: None,
            is_authenticated: true,
        };
    }

    fn account(&self, id: &str) -> Account {
        self.service.load_account(id).unwrap()
    }

    fn on_disk(&self) -> DeviceProfile {
        self.service.profiles.capture().unwrap()
    }
}

fn switch_failure(err: AppError) -> SwitchFailure {
    match err {
        AppError::Switch(failure) => failure,
        other => panic!("expected switch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_switch_account_without_profile_generates_and_binds_one() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    assert!(account.device_profile.is_none());

    let report = fx.service.switch_account(&account.id).await.unwrap();
    assert!(report.fingerprint_applied);
    assert!(report.process_started);

    let stored = fx.account(&account.id);
    let bound = stored.device_profile.clone().unwrap();
    assert_eq!(fx.on_disk(), bound);
    assert_ne!(bound, fx.original);
    assert_eq!(stored.device_history.len(), 1);
    assert_eq!(stored.device_history[0].label, "auto_generated");
    assert!(stored.device_history[0].is_current);

    assert_eq!(fx.service.profiles.load_baseline(), Some(fx.original.clone()));
    assert_eq!(*fx.backups.restored.lock(), vec!["alice@example.com".to_string()]);
    assert_eq!(fx.process.stops.load(Ordering::SeqCst), 1);
    assert_eq!(fx.process.starts.load(Ordering::SeqCst), 1);
    assert_eq!(fx.service.switch_metrics().local.switch_success, 1);
}

#[tokio::test]
async fn test_switch_with_bound_profile_keeps_history() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    let bound = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();
    fx.service.restore_identity_profile_revision(&account.id, "baseline").await.unwrap();
    fx.service.restore_identity_profile_revision(&account.id, "current").await.unwrap();
    assert_eq!(fx.on_disk(), fx.original);

    fx.service.switch_account(&account.id).await.unwrap();

    let stored = fx.account(&account.id);
    assert_eq!(stored.device_profile.as_ref(), Some(&fx.original));
    assert_eq!(stored.device_history.len(), 1);
    assert_eq!(stored.device_history[0].profile, bound);
}

#[tokio::test]
async fn test_switch_unknown_account_never_starts_flow() {
    let fx = Fixture::new();

    let err = fx.service.switch_account("missing").await.unwrap_err();
    assert!(matches!(err, AppError::Account(AccountError::NotFound { .. })));
    assert_eq!(fx.process.stops.load(Ordering::SeqCst), 0);
    assert_eq!(fx.service.switch_metrics().local.switch_failure, 0);
}

#[tokio::test]
async fn test_switch_without_backup_file_is_not_found() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    std::fs::remove_file(fx.service.backup_path(&account)).unwrap();

    let err = fx.service.switch_account(&account.id).await.unwrap_err();
    assert!(matches!(err, AppError::Account(AccountError::BackupNotFound { .. })));
    assert_eq!(fx.on_disk(), fx.original);
}

#[tokio::test]
async fn test_failed_restore_rolls_back_and_binds_nothing() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    fx.backups.fail_restore.store(true, Ordering::SeqCst);

    let failure = switch_failure(fx.service.switch_account(&account.id).await.unwrap_err());
    assert_eq!(failure.reason, SwitchFailureReason::PerformSwitchFailed);
    assert_eq!(failure.rollback_succeeded, Some(true));
    assert!(failure.message.contains("database is locked"));

    assert_eq!(fx.on_disk(), fx.original);
    let stored = fx.account(&account.id);
    assert!(stored.device_profile.is_none());
    assert!(stored.device_history.is_empty());
    assert_eq!(stored.last_used, account.last_used);

    let metrics = fx.service.switch_metrics();
    assert_eq!(metrics.local.switch_failure, 1);
    assert_eq!(metrics.local.rollback_success, 1);
}

#[tokio::test]
async fn test_unsaved_switch_record_leaves_store_untouched() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    fx.fail_index_saves.store(true, Ordering::SeqCst);

    let failure = switch_failure(fx.service.switch_account(&account.id).await.unwrap_err());
    assert_eq!(failure.reason, SwitchFailureReason::PerformSwitchFailed);
    assert_eq!(failure.rollback_succeeded, Some(true));
    assert!(failure.message.contains("disk full"));

    assert!(fx.backups.restored.lock().is_empty());
    assert!(!fx.backups.restore_entered.load(Ordering::SeqCst));
    assert_eq!(fx.on_disk(), fx.original);
    assert!(fx.account(&account.id).device_profile.is_none());
}

#[tokio::test]
async fn test_identity_write_waits_for_switch_in_flight() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    fx.backups.fail_restore.store(true, Ordering::SeqCst);
    let release = fx.backups.hold_restore();

    let switching = {
        let service = fx.service.clone();
        let id = account.id.clone();
        tokio::spawn(async move { service.switch_account(&id).await })
    };
    while !fx.backups.restore_entered.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }
    assert_ne!(fx.on_disk(), fx.original);

    let binding = {
        let service = fx.service.clone();
        let id = account.id.clone();
        tokio::spawn(async move { service.bind_identity_profile(&id, BindMode::Generate).await })
    };
    while fx.service.switch_guard_snapshot().pending_count < 1 {
        tokio::task::yield_now().await;
    }

    release.send(()).unwrap();
    let failure = switch_failure(switching.await.unwrap().unwrap_err());
    assert_eq!(failure.rollback_succeeded, Some(true));
    let bound = binding.await.unwrap().unwrap();

    assert_eq!(fx.on_disk(), bound);
    assert_eq!(fx.account(&account.id).device_profile, Some(bound));
}

#[tokio::test]
async fn test_cloud_switch_without_profile_is_missing_bound_profile() {
    let fx = Fixture::new();
    let account = Account::new("cloud-1".into(), "Cloud".into(), "cloud@example.com".into());
    let backup = fx.backups.backup(&account).await.unwrap();

    let failure = switch_failure(fx.service.switch_cloud_account(backup, None).await.unwrap_err());
    assert_eq!(failure.scope, SwitchScope::Cloud);
    assert_eq!(failure.reason, SwitchFailureReason::MissingBoundProfile);
    assert!(fx.backups.restored.lock().is_empty());
    assert_eq!(fx.service.switch_metrics().cloud.switch_failure, 1);
}

#[tokio::test]
async fn test_cloud_switch_applies_supplied_profile() {
    let fx = Fixture::new();
    let account = Account::new("cloud-1".into(), "Cloud".into(), "cloud@example.com".into());
    let backup = fx.backups.backup(&account).await.unwrap();
    let profile = generate_profile();

    let report = fx.service.switch_cloud_account(backup, Some(profile.clone())).await.unwrap();
    assert_eq!(report.scope, SwitchScope::Cloud);
    assert_eq!(fx.on_disk(), profile);
    assert_eq!(*fx.backups.restored.lock(), vec!["cloud@example.com".to_string()]);
    assert!(fx.service.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_switches_run_one_at_a_time() {
    let fx = Fixture::new();
    let first = fx.service.add_account_snapshot().await.unwrap();
    fx.sign_in("bob@example.com");
    let second = fx.service.add_account_snapshot().await.unwrap();

    let (a, b) = tokio::join!(
        fx.service.switch_account(&first.id),
        fx.service.switch_account(&second.id)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(
        *fx.backups.restored.lock(),
        vec!["alice@example.com".to_string(), "bob@example.com".to_string()]
    );
    assert_eq!(fx.service.switch_guard_snapshot().pending_count, 0);
    assert_eq!(fx.service.switch_metrics().local.switch_success, 2);
}

#[tokio::test]
async fn test_add_snapshot_refreshes_existing_account() {
    let fx = Fixture::new();
    let created = fx.service.add_account_snapshot().await.unwrap();
    assert_eq!(created.name, "Alice");
    assert!(fx.service.backup_path(&created).exists());

    let _bound = fx.service.bind_identity_profile(&created.id, BindMode::Generate).await.unwrap();
    let refreshed = fx.service.add_account_snapshot().await.unwrap();

    assert_eq!(refreshed.id, created.id);
    assert!(refreshed.device_profile.is_some());
    assert_eq!(refreshed.device_history.len(), 1);
    assert_eq!(fx.service.list_accounts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_snapshot_requires_signed_in_identity() {
    let fx = Fixture::new();
    *fx.identity.0.lock() = AccountInfo::default();

    let err = fx.service.add_account_snapshot().await.unwrap_err();
    assert!(matches!(err, AppError::Account(AccountError::NotAuthenticated)));
    assert!(fx.service.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_account_removes_backup_and_entry() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    let backup = fx.service.backup_path(&account);

    fx.service.delete_account(&account.id).await.unwrap();
    assert!(!backup.exists());
    assert!(fx.service.list_accounts().await.unwrap().is_empty());

    let err = fx.service.delete_account(&account.id).await.unwrap_err();
    assert!(matches!(err, AppError::Account(AccountError::NotFound { .. })));
}

#[tokio::test]
async fn test_list_accounts_most_recent_first() {
    let fx = Fixture::new();
    let first = fx.service.add_account_snapshot().await.unwrap();
    fx.sign_in("bob@example.com");
    let second = fx.service.add_account_snapshot().await.unwrap();
    fx.service
        .index
        .update(|index| {
            index.get_mut(&first.id).unwrap().last_used = 10;
            index.get_mut(&second.id).unwrap().last_used = 20;
            Ok(())
        })
        .unwrap();

    let ids: Vec<String> =
        fx.service.list_accounts().await.unwrap().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_bind_capture_and_generate_keep_one_current_version() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();

    let generated = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();
    assert_eq!(fx.on_disk(), generated);
    assert_eq!(fx.service.profiles.load_baseline(), Some(fx.original.clone()));

    let captured = fx.service.bind_identity_profile(&account.id, BindMode::Capture).await.unwrap();
    assert_eq!(captured, generated);

    let stored = fx.account(&account.id);
    assert_eq!(stored.device_history.len(), 2);
    assert_eq!(stored.device_history.iter().filter(|v| v.is_current).count(), 1);
    assert_eq!(stored.current_version().map(|v| v.label.as_str()), Some("capture"));
}

#[tokio::test]
async fn test_bind_with_payload_labels_generated() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    let profile = fx.service.preview_generate_identity_profile();

    fx.service.bind_identity_profile_with_payload(&account.id, profile.clone()).await.unwrap();

    let snapshot = fx.service.get_identity_profiles(&account.id).await.unwrap();
    assert_eq!(snapshot.current_storage, Some(profile.clone()));
    assert_eq!(snapshot.bound_profile, Some(profile));
    assert_eq!(snapshot.history[0].label, "generated");
    assert_eq!(snapshot.baseline, Some(fx.original.clone()));
}

#[tokio::test]
async fn test_restore_and_delete_revisions() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    let first = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();
    let _second = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();
    let history = fx.account(&account.id).device_history;
    let (old, current) = (history[0].id.clone(), history[1].id.clone());

    let restored = fx.service.restore_identity_profile_revision(&account.id, &old).await.unwrap();
    assert_eq!(restored, first);
    assert_eq!(fx.on_disk(), first);

    let err = fx.service.delete_identity_profile_revision(&account.id, &old).await.unwrap_err();
    assert!(matches!(err, AppError::Profile(ProfileError::CurrentNotDeletable { .. })));
    fx.service.delete_identity_profile_revision(&account.id, &current).await.unwrap();

    let err =
        fx.service.delete_identity_profile_revision(&account.id, "baseline").await.unwrap_err();
    assert!(matches!(err, AppError::Profile(ProfileError::BaselineNotDeletable)));
    let err = fx.service.restore_identity_profile_revision(&account.id, "nope").await.unwrap_err();
    assert!(matches!(err, AppError::Profile(ProfileError::VersionNotFound { .. })));

    let stored = fx.account(&account.id);
    assert_eq!(stored.device_history.len(), 1);
    assert!(stored.device_history[0].is_current);
}

#[tokio::test]
async fn test_unsaved_revision_restore_keeps_disk_profile() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();
    let bound = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();

    let err = fx.service.restore_identity_profile_revision(&account.id, "nope").await.unwrap_err();
    assert!(matches!(err, AppError::Profile(ProfileError::VersionNotFound { .. })));
    assert_eq!(fx.on_disk(), bound);

    fx.fail_index_saves.store(true, Ordering::SeqCst);
    let err =
        fx.service.restore_identity_profile_revision(&account.id, "baseline").await.unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert_eq!(fx.on_disk(), bound);
    assert_eq!(fx.account(&account.id).device_profile, Some(bound));
}

#[tokio::test]
async fn test_apply_bound_profile_requires_binding() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();

    let err = fx.service.apply_bound_identity_profile(&account.id).await.unwrap_err();
    assert!(matches!(err, AppError::Profile(ProfileError::NoBoundProfile)));

    let bound = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();
    write_storage(fx.service.profiles.storage_path(), &fx.original);
    assert_eq!(fx.service.apply_bound_identity_profile(&account.id).await.unwrap(), bound);
    assert_eq!(fx.on_disk(), bound);
}

#[tokio::test]
async fn test_restore_baseline_profile_rebinds_without_writing() {
    let fx = Fixture::new();
    let account = fx.service.add_account_snapshot().await.unwrap();

    let err = fx.service.restore_baseline_profile(&account.id).await.unwrap_err();
    assert!(matches!(err, AppError::Profile(ProfileError::BaselineNotFound)));

    let bound = fx.service.bind_identity_profile(&account.id, BindMode::Generate).await.unwrap();
    let baseline = fx.service.restore_baseline_profile(&account.id).await.unwrap();

    assert_eq!(baseline, fx.original);
    assert_eq!(fx.on_disk(), bound);
    let stored = fx.account(&account.id);
    assert_eq!(stored.device_profile, Some(fx.original.clone()));
    assert!(stored.current_version().is_none());
}

#[tokio::test]
async fn test_concurrent_binds_on_different_accounts_are_not_lost() {
    let fx = Fixture::new();
    let first = fx.service.add_account_snapshot().await.unwrap();
    fx.sign_in("bob@example.com");
    let second = fx.service.add_account_snapshot().await.unwrap();

    let (a, b) = tokio::join!(
        fx.service.bind_identity_profile(&first.id, BindMode::Generate),
        fx.service.bind_identity_profile(&second.id, BindMode::Generate)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(fx.account(&first.id).device_profile, Some(a));
    assert_eq!(fx.account(&second.id).device_profile, Some(b));
}
